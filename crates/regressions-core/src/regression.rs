use crate::config::RegressionSettings;
use crate::domain::{DataDirectory, RegressionResult, TestIdentity};
use crate::fixtures::data::DataRegression;
use crate::fixtures::file::FileRegression;
use crate::fixtures::image::ImageRegression;
use crate::fixtures::ndarrays::NdArraysRegression;
use crate::fixtures::table::TableRegression;
use crate::protocol::{CheckOutcome, SnapshotStrategy, SnapshotTarget, perform_check};
use tracing::debug;

/// Per-fixture switches layered on top of [`RegressionSettings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Switches {
    pub force_regen: bool,
    pub with_test_class_names: bool,
}

/// Entry point handed to a test: knows who is asking and where snapshots live.
#[derive(Debug, Clone)]
pub struct Regression {
    identity: TestIdentity,
    data_dir: DataDirectory,
    settings: RegressionSettings,
}

impl Regression {
    pub fn new(identity: TestIdentity, data_dir: DataDirectory) -> Self {
        Self {
            identity,
            data_dir,
            settings: RegressionSettings::from_env(),
        }
    }

    pub fn with_settings(mut self, settings: RegressionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn identity(&self) -> &TestIdentity {
        &self.identity
    }

    pub fn data_dir(&self) -> &DataDirectory {
        &self.data_dir
    }

    pub fn settings(&self) -> RegressionSettings {
        self.settings
    }

    pub fn data(&self) -> DataRegression<'_> {
        DataRegression::new(self)
    }

    pub fn file(&self) -> FileRegression<'_> {
        FileRegression::new(self)
    }

    pub fn table(&self) -> TableRegression<'_> {
        TableRegression::new(self)
    }

    pub fn ndarrays(&self) -> NdArraysRegression<'_> {
        NdArraysRegression::new(self)
    }

    pub fn image(&self) -> ImageRegression<'_> {
        ImageRegression::new(self)
    }

    pub(crate) fn run(
        &self,
        target: &SnapshotTarget,
        extension: &str,
        switches: Switches,
        strategy: &dyn SnapshotStrategy,
    ) -> RegressionResult<CheckOutcome> {
        let paths = target.resolve(
            &self.identity,
            &self.data_dir,
            extension,
            switches.with_test_class_names || self.settings.with_test_class_names,
        )?;
        debug!(test = self.identity.name(), expected = %paths.expected.display(), "running check");
        perform_check(
            &paths,
            strategy,
            switches.force_regen || self.settings.force_regen,
            self.settings.regen_all,
        )
    }
}

/// Turns a failed check into a test failure carrying the full report.
pub trait CheckResultExt {
    fn or_fail(self) -> CheckOutcome;
}

impl CheckResultExt for RegressionResult<CheckOutcome> {
    #[track_caller]
    fn or_fail(self) -> CheckOutcome {
        match self {
            Ok(outcome) => outcome,
            Err(error) => panic!("{error}"),
        }
    }
}
