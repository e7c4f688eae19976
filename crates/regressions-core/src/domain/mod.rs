mod errors;

pub use errors::{RegressionError, RegressionErrorCategory, RegressionResult};

use std::path::{Path, PathBuf};

/// Identity of the test requesting a check.
///
/// `class_name` is the enclosing grouping of the test, which for Rust tests is
/// the module that holds the `#[test]` function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestIdentity {
    name: String,
    class_name: Option<String>,
}

impl TestIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_name: None,
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Builds an identity from a function path such as
    /// `my_crate::tests::geometry::test_area`.
    pub fn from_function_path(path: &str) -> Self {
        let path = path.trim_end_matches("::{{closure}}");
        let mut segments = path.rsplit("::");
        let name = segments.next().unwrap_or(path).to_string();
        let class_name = segments
            .next()
            .filter(|segment| !segment.is_empty())
            .map(str::to_string);
        Self { name, class_name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// File-system safe basename for this test.
    pub fn basename(&self, with_class_name: bool) -> String {
        let name = sanitize_basename(&self.name);
        match (&self.class_name, with_class_name) {
            (Some(class_name), true) => format!("{}_{name}", sanitize_basename(class_name)),
            _ => name,
        }
    }
}

/// Captures the [`TestIdentity`] of the enclosing function.
#[macro_export]
macro_rules! test_identity {
    () => {{
        fn __here() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let path = __type_name_of(__here);
        $crate::domain::TestIdentity::from_function_path(
            path.strip_suffix("::__here").unwrap_or(path),
        )
    }};
}

pub fn sanitize_basename(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_alphanumeric() || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// Directory pair used by a check.
///
/// Expected files are read from and obtained files written to `working`.
/// New or regenerated baselines are written to `original`, which lets a test
/// run against a scratch copy of its data while baselines land in the source
/// tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDirectory {
    working: PathBuf,
    original: PathBuf,
}

impl DataDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            working: dir.clone(),
            original: dir,
        }
    }

    pub fn with_working_copy(original: impl Into<PathBuf>, working: impl Into<PathBuf>) -> Self {
        Self {
            working: working.into(),
            original: original.into(),
        }
    }

    pub fn working(&self) -> &Path {
        &self.working
    }

    pub fn original(&self) -> &Path {
        &self.original
    }
}
