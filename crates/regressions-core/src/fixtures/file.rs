use super::switch_setters;
use crate::comparator::MismatchError;
use crate::domain::{RegressionError, RegressionResult};
use crate::protocol::{CheckOutcome, SnapshotStrategy, SnapshotTarget};
use crate::regression::{Regression, Switches};
use crate::text_diff::{Encoding, TextCompareOptions, compare_text};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FILE_EXTENSION: &str = ".txt";

pub type FileComparator<'a> = &'a dyn Fn(&Path, &Path) -> RegressionResult<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contents<'a> {
    Text(&'a str),
    Binary(&'a [u8]),
}

pub struct FileCheck<'a> {
    pub basename: Option<String>,
    pub fullpath: Option<PathBuf>,
    pub obtained_filename: Option<PathBuf>,
    pub extension: String,
    /// Text only; combining it with binary contents is rejected.
    pub encoding: Option<Encoding>,
    /// Replaces every `\n` when writing text.
    pub newline: Option<String>,
    /// Replaces the default text or byte comparison.
    pub check_fn: Option<FileComparator<'a>>,
}

impl Default for FileCheck<'_> {
    fn default() -> Self {
        Self {
            basename: None,
            fullpath: None,
            obtained_filename: None,
            extension: DEFAULT_FILE_EXTENSION.to_string(),
            encoding: None,
            newline: None,
            check_fn: None,
        }
    }
}

pub struct FileRegression<'a> {
    regression: &'a Regression,
    switches: Switches,
}

impl<'a> FileRegression<'a> {
    pub(crate) fn new(regression: &'a Regression) -> Self {
        Self {
            regression,
            switches: Switches::default(),
        }
    }

    switch_setters!();

    pub fn check(&self, contents: Contents<'_>) -> RegressionResult<CheckOutcome> {
        self.check_with(contents, FileCheck::default())
    }

    pub fn check_with(
        &self,
        contents: Contents<'_>,
        options: FileCheck<'_>,
    ) -> RegressionResult<CheckOutcome> {
        let bytes = match contents {
            Contents::Binary(_) if options.encoding.is_some() => {
                return Err(RegressionError::Configuration(
                    "encoding can only be used with text contents".to_string(),
                ));
            }
            Contents::Binary(bytes) => bytes.to_vec(),
            Contents::Text(text) => {
                let text = match &options.newline {
                    Some(newline) => text.replace('\n', newline),
                    None => text.to_string(),
                };
                options.encoding.unwrap_or_default().encode(&text)?
            }
        };

        let target = SnapshotTarget {
            basename: options.basename,
            fullpath: options.fullpath,
            obtained_filename: options.obtained_filename,
        };
        let snapshot = FileSnapshot {
            bytes,
            binary: matches!(contents, Contents::Binary(_)),
            encoding: options.encoding.unwrap_or_default(),
            check_fn: options.check_fn,
        };
        self.regression
            .run(&target, &options.extension, self.switches, &snapshot)
    }
}

struct FileSnapshot<'a> {
    bytes: Vec<u8>,
    binary: bool,
    encoding: Encoding,
    check_fn: Option<FileComparator<'a>>,
}

impl SnapshotStrategy for FileSnapshot<'_> {
    fn dump(&self, path: &Path) -> RegressionResult<()> {
        fs::write(path, &self.bytes).map_err(|source| RegressionError::io("write", path, source))
    }

    fn compare(&self, obtained: &Path, expected: &Path) -> RegressionResult<()> {
        if let Some(check_fn) = self.check_fn {
            return check_fn(obtained, expected);
        }
        if self.binary {
            compare_binary(obtained, expected)
        } else {
            compare_text(
                obtained,
                expected,
                &TextCompareOptions {
                    fix_callback: None,
                    encoding: self.encoding,
                },
            )
        }
    }
}

pub fn compare_binary(obtained: &Path, expected: &Path) -> RegressionResult<()> {
    let obtained_bytes =
        fs::read(obtained).map_err(|source| RegressionError::io("read", obtained, source))?;
    let expected_bytes =
        fs::read(expected).map_err(|source| RegressionError::io("read", expected, source))?;
    if obtained_bytes == expected_bytes {
        return Ok(());
    }
    Err(MismatchError::Binary {
        obtained: obtained.to_path_buf(),
        expected: expected.to_path_buf(),
    }
    .into())
}
