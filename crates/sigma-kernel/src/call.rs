//! Buffer assembly and the checked call into a [`SigmaKernel`].

use crate::abi::{IntConfig, PROCESS_COUNT};
use crate::error::{KernelError, Result};
use crate::SigmaKernel;
use sigma_tracing::perf_span;
use sigma_tracing::performance::record_kernel_call;
use tracing::{debug, warn};

/// Inputs of one evaluation, borrowed from the caller.
#[derive(Debug, Clone, Copy)]
pub struct KernelArgs<'a> {
    pub omega_m: f64,
    /// Wavenumbers of the power spectrum table.
    pub k_h: &'a [f64],
    /// Redshifts of the power spectrum table.
    pub pk_z: &'a [f64],
    /// P(k,z) flattened row-major, `pk_z.len()` rows of `k_h.len()` values.
    pub pk: &'a [f64],
    /// Output redshift grid.
    pub z: &'a [f64],
    pub log_m: &'a [f64],
    pub r: &'a [f64],
}

/// A call whose buffers have been checked against its [`IntConfig`].
///
/// Only [`KernelCall::new`] builds one, so a kernel receiving it can trust
/// every pointer to cover the advertised length.
#[derive(Debug)]
pub struct KernelCall<'a> {
    args: KernelArgs<'a>,
    int_config: [i32; 5],
    output: Vec<f64>,
}

fn to_c_len(what: &'static str, len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| KernelError::ShapeMismatch {
        what,
        expected: i32::MAX as usize,
        actual: len,
    })
}

impl<'a> KernelCall<'a> {
    pub fn new(args: KernelArgs<'a>) -> Result<Self> {
        if args.k_h.is_empty() {
            return Err(KernelError::EmptyGrid("k_h"));
        }
        if args.pk_z.is_empty() {
            return Err(KernelError::EmptyGrid("power spectrum z"));
        }

        let expected_pk = args.k_h.len() * args.pk_z.len();
        if args.pk.len() != expected_pk {
            return Err(KernelError::ShapeMismatch {
                what: "p_k",
                expected: expected_pk,
                actual: args.pk.len(),
            });
        }
        if args.r.len() != args.log_m.len() {
            return Err(KernelError::ShapeMismatch {
                what: "radius grid",
                expected: args.log_m.len(),
                actual: args.r.len(),
            });
        }

        let config = IntConfig {
            process_count: PROCESS_COUNT,
            n_k: to_c_len("k_h", args.k_h.len())?,
            n_m: to_c_len("mass grid", args.log_m.len())?,
            n_z: to_c_len("z grid", args.z.len())?,
            n_zk: to_c_len("power spectrum z", args.pk_z.len())?,
        };
        let output_len = args.log_m.len() * args.z.len();
        to_c_len("sigma2", output_len)?;

        Ok(Self {
            args,
            int_config: config.to_array(),
            output: vec![0.0; output_len],
        })
    }

    pub fn args(&self) -> &KernelArgs<'a> {
        &self.args
    }

    pub fn int_config(&self) -> &[i32; 5] {
        &self.int_config
    }

    pub fn n_m(&self) -> usize {
        self.args.log_m.len()
    }

    pub fn n_z(&self) -> usize {
        self.args.z.len()
    }

    /// Output buffer, `n_z` rows of `n_m` values (z outermost).
    pub fn output_mut(&mut self) -> &mut [f64] {
        &mut self.output
    }

    pub fn into_output(self) -> Vec<f64> {
        self.output
    }
}

/// Validate `args`, run `kernel` once, and return the flat σ² buffer.
///
/// The call blocks until the kernel returns. A non-zero status is reported
/// as [`KernelError::CallFailed`]; a crash inside native code is not caught.
pub fn compute_sigma<K: SigmaKernel + ?Sized>(kernel: &K, args: KernelArgs<'_>) -> Result<Vec<f64>> {
    let mut call = KernelCall::new(args)?;
    let (n_m, n_z) = (call.n_m(), call.n_z());
    debug!(int_config = ?call.int_config(), "launching sigma kernel");

    let span = perf_span!("sigma_kernel", n_m = n_m, n_z = n_z);
    let status = {
        let _entered = span.enter();
        let status = kernel.launch(&mut call);
        record_kernel_call(n_m, n_z, status, span.elapsed_us());
        status
    };
    drop(span);

    if status != 0 {
        warn!(status, "sigma kernel reported failure");
        return Err(KernelError::CallFailed { status });
    }
    Ok(call.into_output())
}
