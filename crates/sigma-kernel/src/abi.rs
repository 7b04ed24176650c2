//! C ABI of the native routine.
use std::os::raw::{c_double, c_int};

/// Symbol exported by the compiled sigma library.
pub const DEFAULT_ENTRY_POINT: &str = "executemain";

/// The routine runs in-process on a single worker.
pub const PROCESS_COUNT: i32 = 1;

/// Entry point signature.
///
/// Arguments in order: Ω_m, the five-element integer config, k grid,
/// P(k,z) redshift grid, flattened P(k,z), output redshift grid, log-mass
/// grid, radius grid, and the `n_m * n_z` output buffer written in place.
pub type SigmaExecuteFn = unsafe extern "C" fn(
    omega_m: c_double,
    int_config: *const c_int,
    pk_k: *const c_double,
    pk_z: *const c_double,
    pk: *const c_double,
    z: *const c_double,
    log_m: *const c_double,
    r: *const c_double,
    sigma2: *mut c_double,
) -> c_int;

/// Integer configuration vector `[proc_count, n_k, n_m, n_z, n_zk]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntConfig {
    pub process_count: i32,
    pub n_k: i32,
    pub n_m: i32,
    pub n_z: i32,
    pub n_zk: i32,
}

impl IntConfig {
    pub fn to_array(self) -> [c_int; 5] {
        [self.process_count, self.n_k, self.n_m, self.n_z, self.n_zk]
    }

    /// Length of the output buffer the routine writes.
    pub fn output_len(&self) -> usize {
        self.n_m as usize * self.n_z as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_layout_matches_native_order() {
        let cfg = IntConfig {
            process_count: PROCESS_COUNT,
            n_k: 200,
            n_m: 30,
            n_z: 4,
            n_zk: 50,
        };
        assert_eq!(cfg.to_array(), [1, 200, 30, 4, 50]);
        assert_eq!(cfg.output_len(), 120);
    }
}
