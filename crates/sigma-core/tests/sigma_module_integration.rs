//! End-to-end runs of the module against an in-memory data block.
//!
//! A stub kernel stands in for the compiled routine: it writes each output
//! cell's flat index, which makes the reshaping visible.

use sigma_core::{
    DataBlock, KernelCall, Matrix, MemoryBlock, ScaleAxis, SigmaConfig, SigmaError, SigmaModule,
    COSMOLOGICAL_PARAMETERS_SECTION, SIGMA_R_SECTION,
};
use std::cell::RefCell;

const OPTIONS: &str = "
[module_options]
matter_power = matter_power_lin
z = 0.0 0.5
use_m = F
r = 1.0 2.0
library = /nonexistent/sigma.so
library_dependencies =
";

fn index_kernel(call: &mut KernelCall<'_>) -> i32 {
    for (i, v) in call.output_mut().iter_mut().enumerate() {
        *v = i as f64;
    }
    0
}

fn sample_block(omega_m: f64) -> MemoryBlock {
    let mut block = MemoryBlock::new();
    block.put_double(COSMOLOGICAL_PARAMETERS_SECTION, "omega_m", omega_m);
    block.put_double_array("matter_power_lin", "z", vec![0.0, 0.5, 1.0]);
    block.put_double_array("matter_power_lin", "k_h", vec![0.001, 0.01, 0.1, 1.0]);
    block.put_double_matrix(
        "matter_power_lin",
        "p_k",
        Matrix::from_rows(vec![
            vec![1.0e3, 1.0e4, 5.0e3, 1.0e2],
            vec![0.8e3, 0.8e4, 4.0e3, 0.8e2],
            vec![0.6e3, 0.6e4, 3.0e3, 0.6e2],
        ])
        .unwrap(),
    );
    block
}

fn log_sphere_mass(omega_m: f64, r: f64) -> f64 {
    (2.775e11 * 4.0 * std::f64::consts::PI / 3.0 * omega_m * r.powi(3)).log10()
}

#[test]
fn radius_round_trip_reshapes_and_derives_mass() {
    let options = MemoryBlock::from_ini_str(OPTIONS).unwrap();
    let config = SigmaConfig::from_options(&options).unwrap();
    let module = SigmaModule::with_kernel(config, index_kernel);

    let mut block = sample_block(0.3);
    let out = module.execute(&mut block).unwrap();

    assert_eq!(out.sigma2.to_rows(), vec![vec![0.0, 1.0], vec![2.0, 3.0]]);
    assert_eq!(out.r, vec![1.0, 2.0]);
    assert_eq!(out.z, vec![0.0, 0.5]);
    assert!((out.log_m[0] - log_sphere_mass(0.3, 1.0)).abs() < 1e-12);
    assert!((out.log_m[1] - log_sphere_mass(0.3, 2.0)).abs() < 1e-12);

    assert_eq!(block.get_double_array(SIGMA_R_SECTION, "R").unwrap(), vec![1.0, 2.0]);
    assert_eq!(block.get_double_array(SIGMA_R_SECTION, "z").unwrap(), vec![0.0, 0.5]);
    assert_eq!(block.get_double_array(SIGMA_R_SECTION, "m").unwrap(), out.log_m);
    assert_eq!(block.get_double_matrix(SIGMA_R_SECTION, "sigma2").unwrap(), out.sigma2);
}

#[test]
fn kernel_receives_marshalled_buffers() {
    let seen = RefCell::new(None);
    let recording = |call: &mut KernelCall<'_>| {
        let args = call.args();
        *seen.borrow_mut() = Some((
            args.omega_m,
            *call.int_config(),
            args.pk.to_vec(),
            args.pk_z.to_vec(),
            args.k_h.len(),
            args.r.to_vec(),
        ));
        0
    };

    let options = MemoryBlock::from_ini_str(OPTIONS).unwrap();
    let module = SigmaModule::with_kernel(SigmaConfig::from_options(&options).unwrap(), recording);
    let mut block = sample_block(0.25);
    module.execute(&mut block).unwrap();

    let (omega_m, int_config, pk, pk_z, n_k, r) = seen.borrow_mut().take().unwrap();
    assert_eq!(omega_m, 0.25);
    assert_eq!(int_config, [1, 4, 2, 2, 3]);
    assert_eq!(pk.len(), 12);
    assert_eq!(&pk[4..8], &[0.8e3, 0.8e4, 4.0e3, 0.8e2]);
    assert_eq!(pk_z, vec![0.0, 0.5, 1.0]);
    assert_eq!(n_k, 4);
    assert_eq!(r, vec![1.0, 2.0]);
}

#[test]
fn mass_axis_passes_zero_radii_and_keeps_masses() {
    let options = MemoryBlock::from_ini_str(
        "[module_options]\nmatter_power = matter_power_lin\nzmin = 0\nzmax = 1.5\ndz = 0.5\nuse_m = T\nlogm = 12 13 14 15\n",
    )
    .unwrap();
    let config = SigmaConfig::from_options(&options).unwrap();
    assert_eq!(config.axis, ScaleAxis::Mass(vec![12.0, 13.0, 14.0, 15.0]));

    let module = SigmaModule::with_kernel(config, index_kernel);
    let mut block = sample_block(0.3);
    let out = module.execute(&mut block).unwrap();

    assert_eq!(out.sigma2.shape(), (3, 4));
    assert_eq!(out.sigma2.get(2, 3), Some(11.0));
    assert_eq!(out.log_m, vec![12.0, 13.0, 14.0, 15.0]);
    assert_eq!(out.r, vec![0.0; 4]);
}

#[test]
fn derived_masses_track_each_sample() {
    let options = MemoryBlock::from_ini_str(OPTIONS).unwrap();
    let module = SigmaModule::with_kernel(SigmaConfig::from_options(&options).unwrap(), index_kernel);

    let low = module.execute(&mut sample_block(0.1)).unwrap();
    let high = module.execute(&mut sample_block(1.0)).unwrap();
    assert!((high.log_m[0] - low.log_m[0] - 1.0).abs() < 1e-12);
    assert_eq!(module.config().axis, ScaleAxis::Radius(vec![1.0, 2.0]));
}

#[test]
fn setup_without_grid_fails_before_binding() {
    // The library path does not exist: reaching the loader would surface
    // NativeLibraryLoad instead.
    let options = MemoryBlock::from_ini_str(
        "[module_options]\nmatter_power = matter_power_lin\nz = 0.0\nrmin = 1\ndr = 1\nlibrary = /nonexistent/sigma.so\n",
    )
    .unwrap();
    let err = SigmaModule::setup(&options).unwrap_err();
    match err {
        SigmaError::MissingConfiguration { section, name } => {
            assert_eq!(section, "module_options");
            assert_eq!(name, "rmax");
        }
        other => panic!("expected MissingConfiguration, got {other:?}"),
    }
}

#[test]
fn setup_reports_unloadable_library() {
    let options = MemoryBlock::from_ini_str(OPTIONS).unwrap();
    let err = SigmaModule::setup(&options).unwrap_err();
    assert!(matches!(err, SigmaError::NativeLibraryLoad { .. }), "{err:?}");
    assert_ne!(err.status_code(), 0);
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
#[test]
fn setup_reports_missing_entry_point() {
    let options = MemoryBlock::from_ini_str(
        "[module_options]\nmatter_power = mp\nz = 0\nr = 1\nlibrary = libc.so.6\nlibrary_dependencies =\nentry_point = not_a_sigma_routine\n",
    )
    .unwrap();
    let err = SigmaModule::setup(&options).unwrap_err();
    assert!(
        matches!(err, SigmaError::SymbolNotFound { ref symbol, .. } if symbol == "not_a_sigma_routine"),
        "{err:?}"
    );
}

#[test]
fn block_round_trips_through_json_after_execute() {
    let options = MemoryBlock::from_ini_str(OPTIONS).unwrap();
    let module = SigmaModule::with_kernel(SigmaConfig::from_options(&options).unwrap(), index_kernel);
    let mut block = sample_block(0.3);
    module.execute(&mut block).unwrap();

    let restored = MemoryBlock::from_json(&block.to_json().unwrap()).unwrap();
    assert_eq!(
        restored.get_double_matrix(SIGMA_R_SECTION, "sigma2").unwrap().shape(),
        (2, 2)
    );
}
