use crate::comparator::MismatchError;
use std::path::{Path, PathBuf};

pub type RegressionResult<T> = Result<T, RegressionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegressionErrorCategory {
    Mismatch,
    MissingBaseline,
    Configuration,
    InvalidInput,
    IoSystem,
    MissingDependency,
    Internal,
}

impl RegressionErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Mismatch | Self::MissingBaseline => 1,
            Self::Configuration | Self::InvalidInput => 2,
            Self::IoSystem => 3,
            Self::MissingDependency => 4,
            Self::Internal => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mismatch => "Mismatch",
            Self::MissingBaseline => "MissingBaseline",
            Self::Configuration => "Configuration",
            Self::InvalidInput => "InvalidInput",
            Self::IoSystem => "IoSystem",
            Self::MissingDependency => "MissingDependency",
            Self::Internal => "Internal",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegressionError {
    #[error("invalid check configuration: {0}")]
    Configuration(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error(
        "{}",
        render_written_files("File not found in data directory, created:", .path, .auxiliary)
    )]
    BaselineCreated {
        path: PathBuf,
        auxiliary: Vec<PathBuf>,
    },
    #[error(
        "{}",
        render_written_files(
            "Files differ and --force-regen set, regenerating file at:",
            .path,
            .auxiliary
        )
    )]
    BaselineRegenerated {
        path: PathBuf,
        auxiliary: Vec<PathBuf>,
    },
    #[error(transparent)]
    Mismatch(#[from] MismatchError),
    #[error(
        "'{library}' library is an optional dependency and must be installed explicitly when the {fixture} fixture is used (enable the '{feature}' feature)"
    )]
    MissingDependency {
        library: &'static str,
        feature: &'static str,
        fixture: &'static str,
    },
    #[error("failed to {action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read snapshot '{}': {reason}", path.display())]
    CorruptArchive { path: PathBuf, reason: String },
    #[error("failed to serialize snapshot data: {0}")]
    Serialization(String),
}

impl RegressionError {
    pub fn io(action: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn corrupt(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        Self::CorruptArchive {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub const fn category(&self) -> RegressionErrorCategory {
        match self {
            Self::Configuration(_) => RegressionErrorCategory::Configuration,
            Self::InvalidInput(_) => RegressionErrorCategory::InvalidInput,
            Self::BaselineCreated { .. } => RegressionErrorCategory::MissingBaseline,
            Self::BaselineRegenerated { .. } | Self::Mismatch(_) => {
                RegressionErrorCategory::Mismatch
            }
            Self::MissingDependency { .. } => RegressionErrorCategory::MissingDependency,
            Self::Io { .. } | Self::CorruptArchive { .. } => RegressionErrorCategory::IoSystem,
            Self::Serialization(_) => RegressionErrorCategory::Internal,
        }
    }

    pub const fn placeholder(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIG.CHECK_OPTIONS",
            Self::InvalidInput(_) => "INPUT.UNSUPPORTED_DATA",
            Self::BaselineCreated { .. } => "BASELINE.CREATED",
            Self::BaselineRegenerated { .. } => "BASELINE.REGENERATED",
            Self::Mismatch(_) => "RUN.SNAPSHOT_MISMATCH",
            Self::MissingDependency { .. } => "SYS.OPTIONAL_BACKEND",
            Self::Io { .. } => "IO.SNAPSHOT_ACCESS",
            Self::CorruptArchive { .. } => "IO.SNAPSHOT_DECODE",
            Self::Serialization(_) => "SYS.SERIALIZE",
        }
    }

    pub const fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatch(_))
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder(), self)
    }
}

fn render_written_files(heading: &str, path: &Path, auxiliary: &[PathBuf]) -> String {
    let mut message = format!("{heading}\n- {}", path.display());
    if !auxiliary.is_empty() {
        message.push_str("\nAuxiliary:");
        for file in auxiliary {
            message.push_str(&format!("\n- {}", file.display()));
        }
    }
    message
}
