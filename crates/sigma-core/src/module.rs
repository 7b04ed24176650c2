//! Module lifecycle: setup once, execute per sample, cleanup.

use crate::block::{DataBlock, Matrix};
use crate::config::{Scales, SigmaConfig};
use crate::constants::{COSMOLOGICAL_PARAMETERS_SECTION, SIGMA_R_SECTION};
use crate::error::{Result, SigmaError};
use sigma_kernel::{compute_sigma, KernelArgs, NativeKernel, SigmaKernel};
use sigma_tracing::timed_block;
use tracing::{debug, error, info, info_span};

/// Everything one execute call publishes to `sigma_r`.
#[derive(Debug, Clone, PartialEq)]
pub struct SigmaOutput {
    pub r: Vec<f64>,
    pub log_m: Vec<f64>,
    pub z: Vec<f64>,
    /// `len(z)` rows of `len(m)` values.
    pub sigma2: Matrix,
}

impl SigmaOutput {
    /// Write `R`, `m`, `z` and `sigma2` into the output section.
    pub fn write_to<D: DataBlock + ?Sized>(&self, block: &mut D) {
        block.put_double_array(SIGMA_R_SECTION, "R", self.r.clone());
        block.put_double_array(SIGMA_R_SECTION, "m", self.log_m.clone());
        block.put_double_array(SIGMA_R_SECTION, "z", self.z.clone());
        block.put_double_matrix(SIGMA_R_SECTION, "sigma2", self.sigma2.clone());
    }
}

/// A configured module bound to its kernel.
///
/// `setup` builds it, `execute` may run any number of times, and `cleanup`
/// consumes it. The configuration is never modified after setup.
#[derive(Debug)]
pub struct SigmaModule<K = NativeKernel> {
    config: SigmaConfig,
    kernel: K,
}

impl SigmaModule<NativeKernel> {
    /// Validate the options and bind the native routine.
    ///
    /// Option errors are reported before any library is opened.
    pub fn setup<D: DataBlock + ?Sized>(options: &D) -> Result<Self> {
        let config = SigmaConfig::from_options(options)?;
        Self::from_config(config)
    }

    pub fn from_config(config: SigmaConfig) -> Result<Self> {
        let kernel = NativeKernel::load(&config.library)?;
        Ok(Self::with_kernel(config, kernel))
    }
}

impl<K: SigmaKernel> SigmaModule<K> {
    pub fn with_kernel(config: SigmaConfig, kernel: K) -> Self {
        info!(
            axis = if config.axis.uses_mass() { "mass" } else { "radius" },
            n_scales = config.axis.len(),
            n_z = config.z.len(),
            matter_power = %config.matter_power_section,
            "sigma module configured"
        );
        debug!(z = ?config.z, axis = ?config.axis, "sigma grids");
        Self { config, kernel }
    }

    pub fn config(&self) -> &SigmaConfig {
        &self.config
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Scales passed to the routine for a given Ω_m.
    pub fn scales(&self, omega_m: f64) -> Scales {
        self.config.axis.derive(omega_m, self.config.log_rho_c_4pi_3)
    }

    /// Evaluate one sample and publish the result to `block`.
    pub fn execute<D: DataBlock + ?Sized>(&self, block: &mut D) -> Result<SigmaOutput> {
        let _span = info_span!("sigma_execute").entered();
        let (result, duration_us) = timed_block!("sigma_execute", { self.evaluate(block) });
        if result.is_ok() {
            info!(duration_us, "sample evaluated");
        }
        result
    }

    fn evaluate<D: DataBlock + ?Sized>(&self, block: &mut D) -> Result<SigmaOutput> {
        let omega_m = block.get_double(COSMOLOGICAL_PARAMETERS_SECTION, "omega_m")?;
        if !(omega_m.is_finite() && omega_m > 0.0) {
            return Err(SigmaError::InvalidInput {
                section: COSMOLOGICAL_PARAMETERS_SECTION.to_string(),
                name: "omega_m".to_string(),
                reason: format!("must be finite and positive, got {omega_m}"),
            });
        }

        let section = self.config.matter_power_section.as_str();
        let pk_z = block.get_double_array(section, "z")?;
        let k_h = block.get_double_array(section, "k_h")?;
        let pk = block.get_double_matrix(section, "p_k")?;
        if pk.shape() != (pk_z.len(), k_h.len()) {
            return Err(SigmaError::ShapeMismatch {
                what: format!("{section}.p_k"),
                expected: format!("{}x{}", pk_z.len(), k_h.len()),
                actual: format!("{}x{}", pk.rows(), pk.cols()),
            });
        }

        let scales = self.scales(omega_m);
        debug!(omega_m, log_m = ?scales.log_m, "derived scales");

        let flat = compute_sigma(
            &self.kernel,
            KernelArgs {
                omega_m,
                k_h: &k_h,
                pk_z: &pk_z,
                pk: pk.as_slice(),
                z: &self.config.z,
                log_m: &scales.log_m,
                r: &scales.r,
            },
        )?;
        let sigma2 = Matrix::new(self.config.z.len(), scales.log_m.len(), flat)?;

        let output = SigmaOutput {
            r: scales.r,
            log_m: scales.log_m,
            z: self.config.z.clone(),
            sigma2,
        };
        output.write_to(block);
        Ok(output)
    }

    /// [`execute`](Self::execute) for hosts that expect an integer status.
    pub fn execute_status<D: DataBlock + ?Sized>(&self, block: &mut D) -> i32 {
        match self.execute(block) {
            Ok(_) => 0,
            Err(err) => {
                error!(error = %err, "sigma execute failed");
                err.status_code()
            }
        }
    }

    pub fn cleanup(self) {
        debug!("sigma module cleaned up");
    }
}
