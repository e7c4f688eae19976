use crate::domain::{DataDirectory, RegressionError, RegressionResult, TestIdentity};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Per-kind behaviour plugged into [`perform_check`].
pub trait SnapshotStrategy {
    /// Serializes the obtained value to `path`.
    fn dump(&self, path: &Path) -> RegressionResult<()>;

    /// Compares two serialized files. Mismatches are reported as
    /// [`RegressionError::Mismatch`]; any other error aborts the check.
    fn compare(&self, obtained: &Path, expected: &Path) -> RegressionResult<()>;

    /// Writes companion artifacts derived from the file at `path`.
    fn dump_auxiliary(&self, _path: &Path) -> RegressionResult<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Matched,
    Regenerated { path: PathBuf, auxiliary: Vec<PathBuf> },
}

/// Where a check reads, writes and drops its artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPaths {
    /// Baseline looked up and compared against.
    pub expected: PathBuf,
    /// Location new or regenerated baselines are written to.
    pub expected_source: PathBuf,
    pub obtained: PathBuf,
}

/// Naming options shared by every fixture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotTarget {
    pub basename: Option<String>,
    pub fullpath: Option<PathBuf>,
    pub obtained_filename: Option<PathBuf>,
}

impl SnapshotTarget {
    pub fn resolve(
        &self,
        identity: &TestIdentity,
        dirs: &DataDirectory,
        extension: &str,
        with_test_class_names: bool,
    ) -> RegressionResult<SnapshotPaths> {
        if self.basename.is_some() && self.fullpath.is_some() {
            return Err(RegressionError::Configuration(
                "basename and fullpath are mutually exclusive".to_string(),
            ));
        }
        if !extension.starts_with('.') {
            return Err(RegressionError::Configuration(format!(
                "extension '{extension}' must start with '.'"
            )));
        }

        let basename = match &self.basename {
            Some(basename) => basename.clone(),
            None => identity.basename(with_test_class_names),
        };
        let obtained = match &self.obtained_filename {
            Some(obtained) => obtained.clone(),
            None => dirs
                .working()
                .join(format!("{basename}.obtained{extension}")),
        };

        let paths = match &self.fullpath {
            Some(fullpath) => SnapshotPaths {
                expected: fullpath.clone(),
                expected_source: fullpath.clone(),
                obtained,
            },
            None => {
                let filename = format!("{basename}{extension}");
                SnapshotPaths {
                    expected: dirs.working().join(&filename),
                    expected_source: dirs.original().join(&filename),
                    obtained,
                }
            }
        };
        Ok(paths)
    }
}

pub fn perform_check(
    paths: &SnapshotPaths,
    strategy: &dyn SnapshotStrategy,
    force_regen: bool,
    regen_all: bool,
) -> RegressionResult<CheckOutcome> {
    if regen_all {
        let auxiliary = write_baseline(&paths.expected_source, strategy)?;
        info!(path = %paths.expected_source.display(), "regenerated baseline");
        return Ok(CheckOutcome::Regenerated {
            path: paths.expected_source.clone(),
            auxiliary,
        });
    }

    if !paths.expected.is_file() {
        let auxiliary = write_baseline(&paths.expected_source, strategy)?;
        info!(path = %paths.expected_source.display(), "created missing baseline");
        return Err(RegressionError::BaselineCreated {
            path: paths.expected_source.clone(),
            auxiliary,
        });
    }

    ensure_parent(&paths.obtained)?;
    strategy.dump(&paths.obtained)?;
    debug!(
        obtained = %paths.obtained.display(),
        expected = %paths.expected.display(),
        "comparing snapshot"
    );

    match strategy.compare(&paths.obtained, &paths.expected) {
        Ok(()) => Ok(CheckOutcome::Matched),
        Err(error) if error.is_mismatch() => {
            if force_regen {
                let auxiliary = write_baseline(&paths.expected_source, strategy)?;
                info!(path = %paths.expected_source.display(), "force-regenerated baseline");
                Err(RegressionError::BaselineRegenerated {
                    path: paths.expected_source.clone(),
                    auxiliary,
                })
            } else {
                strategy.dump_auxiliary(&paths.obtained)?;
                Err(error)
            }
        }
        Err(error) => Err(error),
    }
}

fn write_baseline(path: &Path, strategy: &dyn SnapshotStrategy) -> RegressionResult<Vec<PathBuf>> {
    ensure_parent(path)?;
    strategy.dump(path)?;
    debug!(path = %path.display(), "dumped baseline");
    strategy.dump_auxiliary(path)
}

pub(crate) fn ensure_parent(path: &Path) -> RegressionResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|source| RegressionError::io("create directory", parent, source)),
        _ => Ok(()),
    }
}
