//! Binding to the native sigma² routine.
//!
//! The variance integral itself lives in a precompiled shared library that
//! exports one C function (see [`abi`]). This crate owns the boundary:
//! validating the buffers handed across it ([`KernelCall`]), loading the
//! library and its numerical dependencies ([`NativeKernel`]), and turning a
//! non-zero status into a typed error ([`compute_sigma`]).

pub mod abi;
pub mod call;
pub mod error;
pub mod loader;

pub use abi::{IntConfig, SigmaExecuteFn, DEFAULT_ENTRY_POINT, PROCESS_COUNT};
pub use call::{compute_sigma, KernelArgs, KernelCall};
pub use error::{KernelError, Result};
pub use loader::{LibrarySpec, NativeKernel, DEFAULT_DEPENDENCIES, DEFAULT_LIBRARY};

/// Anything that can evaluate a validated [`KernelCall`] in place.
///
/// [`NativeKernel`] is the production implementation. Closures implement the
/// trait too, boxed `dyn Fn` ones included, which is how tests stand in for
/// the compiled library.
pub trait SigmaKernel {
    /// Fill `call.output_mut()` and return the routine's status (0 = success).
    fn launch(&self, call: &mut KernelCall<'_>) -> i32;
}

impl<F> SigmaKernel for F
where
    F: Fn(&mut KernelCall<'_>) -> i32,
{
    fn launch(&self, call: &mut KernelCall<'_>) -> i32 {
        self(call)
    }
}
