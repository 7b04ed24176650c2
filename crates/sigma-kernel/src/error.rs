//! Error types for the native boundary

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KernelError>;

#[derive(Debug, Error)]
pub enum KernelError {
    /// The shared object, or one of the libraries it needs, failed to load.
    #[error("failed to load native library {path}: {source}")]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("symbol `{symbol}` not found in {path}: {source}")]
    SymbolNotFound {
        symbol: String,
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// A buffer does not agree with the lengths advertised to the routine.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{0} grid is empty")]
    EmptyGrid(&'static str),

    #[error("native sigma routine returned status {status}")]
    CallFailed { status: i32 },
}
