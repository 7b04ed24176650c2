//! Error types for sigma-core operations

use sigma_kernel::KernelError;
use std::path::PathBuf;

/// Result type for sigma-core operations
pub type Result<T> = std::result::Result<T, SigmaError>;

/// Failures reading from or writing to a [`crate::DataBlock`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlockError {
    #[error("section `{section}` not found")]
    SectionNotFound { section: String },

    #[error("value `{name}` not found in section `{section}`")]
    NameNotFound { section: String, name: String },

    #[error("`{section}.{name}`: expected {expected}, found {found}")]
    WrongType {
        section: String,
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("`{section}.{name}`: cannot parse {raw:?} as {expected}")]
    Parse {
        section: String,
        name: String,
        raw: String,
        expected: &'static str,
    },

    #[error("matrix of shape {rows}x{cols} cannot hold {len} values")]
    BadMatrix { rows: usize, cols: usize, len: usize },

    #[error("ini line {line}: {message}")]
    Ini { line: usize, message: String },
}

impl BlockError {
    /// True when the value is simply absent, as opposed to present but unusable.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::SectionNotFound { .. } | Self::NameNotFound { .. })
    }
}

/// Errors that can occur while setting up or executing the module
#[derive(Debug, thiserror::Error)]
pub enum SigmaError {
    /// Neither an explicit value nor a complete fallback was configured.
    #[error("missing configuration `{name}` in section `{section}`")]
    MissingConfiguration { section: String, name: String },

    /// An option is present but unusable.
    #[error("invalid option `{name}`: {reason}")]
    InvalidOption { name: String, reason: String },

    /// A per-sample input from the data block is out of range.
    #[error("invalid input `{section}.{name}`: {reason}")]
    InvalidInput {
        section: String,
        name: String,
        reason: String,
    },

    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("failed to load native library {path}: {source}")]
    NativeLibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("symbol `{symbol}` not found in {path}")]
    SymbolNotFound {
        symbol: String,
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("native sigma routine failed with status {status}")]
    NativeCallFailure { status: i32 },

    #[error(transparent)]
    Block(#[from] BlockError),
}

impl SigmaError {
    /// Non-zero status for hosts that expect an integer return.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::MissingConfiguration { .. } => 1,
            Self::InvalidOption { .. } => 2,
            Self::InvalidInput { .. } => 3,
            Self::ShapeMismatch { .. } => 4,
            Self::NativeLibraryLoad { .. } => 5,
            Self::SymbolNotFound { .. } => 6,
            // A native status of 0 would read as success, keep it distinct.
            Self::NativeCallFailure { status } if *status != 0 => *status,
            Self::NativeCallFailure { .. } => 7,
            Self::Block(_) => 8,
        }
    }
}

impl From<KernelError> for SigmaError {
    fn from(err: KernelError) -> Self {
        match err {
            KernelError::LibraryLoad { path, source } => Self::NativeLibraryLoad { path, source },
            KernelError::SymbolNotFound { symbol, path, source } => Self::SymbolNotFound { symbol, path, source },
            KernelError::ShapeMismatch {
                what,
                expected,
                actual,
            } => Self::ShapeMismatch {
                what: what.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            },
            KernelError::EmptyGrid(what) => Self::ShapeMismatch {
                what: what.to_string(),
                expected: "at least one value".to_string(),
                actual: "0".to_string(),
            },
            KernelError::CallFailed { status } => Self::NativeCallFailure { status },
        }
    }
}
