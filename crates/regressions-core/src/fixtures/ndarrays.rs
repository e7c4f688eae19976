use super::switch_setters;
use crate::arrays::NdArray;
use crate::arrays::archive::{ARCHIVE_EXTENSION, read_archive, write_archive};
use crate::capability::Backend;
use crate::comparator::{compare_named_arrays, ensure_supported};
use crate::domain::{RegressionError, RegressionResult};
use crate::numerics::ToleranceSpec;
use crate::protocol::{CheckOutcome, SnapshotStrategy, SnapshotTarget};
use crate::regression::{Regression, Switches};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const FIXTURE: &str = "ndarrays";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NdArraysCheck {
    pub basename: Option<String>,
    pub fullpath: Option<PathBuf>,
    pub tolerances: ToleranceSpec,
}

pub struct NdArraysRegression<'a> {
    regression: &'a Regression,
    switches: Switches,
}

impl<'a> NdArraysRegression<'a> {
    pub(crate) fn new(regression: &'a Regression) -> Self {
        Self {
            regression,
            switches: Switches::default(),
        }
    }

    switch_setters!();

    pub fn check<I, K, V>(&self, arrays: I) -> RegressionResult<CheckOutcome>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<NdArray>,
    {
        self.check_with(arrays, NdArraysCheck::default())
    }

    pub fn check_with<I, K, V>(&self, arrays: I, options: NdArraysCheck) -> RegressionResult<CheckOutcome>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<NdArray>,
    {
        Backend::Zstd.require(FIXTURE)?;
        let mut named = BTreeMap::new();
        for (key, value) in arrays {
            let key: String = key.into();
            let array: NdArray = value.into();
            ensure_supported(&key, &array, FIXTURE).map_err(RegressionError::InvalidInput)?;
            if named.insert(key.clone(), array).is_some() {
                return Err(RegressionError::InvalidInput(format!(
                    "array '{key}' was given more than once"
                )));
            }
        }

        let target = SnapshotTarget {
            basename: options.basename,
            fullpath: options.fullpath,
            obtained_filename: None,
        };
        let snapshot = NdArraysSnapshot {
            arrays: named,
            tolerances: options.tolerances,
        };
        self.regression
            .run(&target, ARCHIVE_EXTENSION, self.switches, &snapshot)
    }
}

struct NdArraysSnapshot {
    arrays: BTreeMap<String, NdArray>,
    tolerances: ToleranceSpec,
}

impl SnapshotStrategy for NdArraysSnapshot {
    fn dump(&self, path: &Path) -> RegressionResult<()> {
        write_archive(path, &self.arrays)
    }

    fn compare(&self, obtained: &Path, expected: &Path) -> RegressionResult<()> {
        compare_archives(obtained, expected, &self.tolerances)
    }
}

/// Compares two array archives key by key.
pub fn compare_archives(
    obtained: &Path,
    expected: &Path,
    tolerances: &ToleranceSpec,
) -> RegressionResult<()> {
    let obtained_arrays = read_archive(obtained)?;
    let expected_arrays = read_archive(expected)?;
    compare_named_arrays(
        &named_arrays(&obtained_arrays),
        &named_arrays(&expected_arrays),
        tolerances,
        None,
    )?;
    Ok(())
}

fn named_arrays(arrays: &BTreeMap<String, NdArray>) -> Vec<(&str, &NdArray)> {
    arrays
        .iter()
        .map(|(key, array)| (key.as_str(), array))
        .collect()
}

#[cfg(all(test, feature = "ndarrays"))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn archive(dir: &Path, name: &str, arrays: Vec<(&str, NdArray)>) -> PathBuf {
        let path = dir.join(name);
        let arrays = arrays
            .into_iter()
            .map(|(key, array)| (key.to_string(), array))
            .collect();
        write_archive(&path, &arrays).expect("archive should be written");
        path
    }

    #[test]
    fn archives_with_same_values_match() {
        let temp = TempDir::new().expect("tempdir should be created");
        let arrays = || vec![("a", NdArray::from(vec![1.0, 2.0])), ("b", NdArray::from(3_i64))];
        let obtained = archive(temp.path(), "o.ndz", arrays());
        let expected = archive(temp.path(), "e.ndz", arrays());
        compare_archives(&obtained, &expected, &ToleranceSpec::new())
            .expect("identical archives should match");
    }

    #[test]
    fn differing_key_sets_are_listed() {
        let temp = TempDir::new().expect("tempdir should be created");
        let obtained = archive(
            temp.path(),
            "o.ndz",
            vec![("ar1", NdArray::from(vec![1.0])), ("ar3", NdArray::from(vec![1.0]))],
        );
        let expected = archive(
            temp.path(),
            "e.ndz",
            vec![("ar1", NdArray::from(vec![1.0])), ("ar2", NdArray::from(vec![1.0]))],
        );
        let message = compare_archives(&obtained, &expected, &ToleranceSpec::new())
            .expect_err("key sets should differ")
            .to_string();
        assert!(message.contains("Matching keys: ['ar1']"));
        assert!(message.contains("New in obtained: ['ar3']"));
        assert!(message.contains("Missing from obtained: ['ar2']"));
    }

    #[test]
    fn corrupt_archive_names_the_file() {
        let temp = TempDir::new().expect("tempdir should be created");
        let good = archive(temp.path(), "good.ndz", vec![("a", NdArray::from(vec![1.0]))]);
        let broken = temp.path().join("broken.ndz");
        std::fs::write(&broken, b"not an archive").expect("broken file should be written");

        let error = compare_archives(&good, &broken, &ToleranceSpec::new())
            .expect_err("broken archive should fail");
        assert!(!error.is_mismatch());
        assert!(error.to_string().contains("broken.ndz"));
    }
}
