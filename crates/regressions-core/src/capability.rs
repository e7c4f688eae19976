use crate::domain::{RegressionError, RegressionResult};

/// Serialization backends that can be compiled out through cargo features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Csv,
    Zstd,
    Image,
}

impl Backend {
    pub const fn library(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Zstd => "zstd",
            Self::Image => "image",
        }
    }

    pub const fn feature(self) -> &'static str {
        match self {
            Self::Csv => "table",
            Self::Zstd => "ndarrays",
            Self::Image => "image",
        }
    }

    pub const fn is_available(self) -> bool {
        match self {
            Self::Csv => cfg!(feature = "table"),
            Self::Zstd => cfg!(feature = "ndarrays"),
            Self::Image => cfg!(feature = "image"),
        }
    }

    pub fn unavailable(self, fixture: &'static str) -> RegressionError {
        RegressionError::MissingDependency {
            library: self.library(),
            feature: self.feature(),
            fixture,
        }
    }

    /// Fails when the backend was compiled out.
    pub fn require(self, fixture: &'static str) -> RegressionResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(self.unavailable(fixture))
        }
    }
}
