//! # sigma-core
//!
//! A pipeline module computing σ²(M or R, z), the variance of the linear
//! matter field smoothed on mass or radius scales.
//!
//! The module reads a matter power spectrum and Ω_m from a shared
//! [`DataBlock`], hands them to a compiled routine through
//! [`sigma_kernel`], and publishes `R`, `m`, `z` and `sigma2` to the
//! `sigma_r` section.
//!
//! ```no_run
//! use sigma_core::{MemoryBlock, SigmaModule};
//!
//! let options = MemoryBlock::from_ini_str(
//!     "[module_options]\nmatter_power = matter_power_lin\nz = 0.0 0.5\nr = 1.0 8.0\n",
//! )?;
//! let module = SigmaModule::setup(&options)?;
//!
//! let mut block = MemoryBlock::new();
//! // ... earlier modules fill cosmological_parameters and matter_power_lin ...
//! let output = module.execute(&mut block)?;
//! println!("sigma2 shape: {:?}", output.sigma2.shape());
//! module.cleanup();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod block;
pub mod config;
pub mod constants;
pub mod error;
pub mod grid;
mod ini;
pub mod module;

pub use block::{DataBlock, Matrix, MemoryBlock, Value};
pub use config::{ScaleAxis, Scales, SigmaConfig};
pub use constants::{COSMOLOGICAL_PARAMETERS_SECTION, OPTION_SECTION, RHO_CRIT_H2, SIGMA_R_SECTION};
pub use error::{BlockError, Result, SigmaError};
pub use grid::{arange, range_len, GridKeys, GridSpec};
pub use module::{SigmaModule, SigmaOutput};

pub use sigma_kernel::{KernelCall, LibrarySpec, NativeKernel, SigmaKernel};
