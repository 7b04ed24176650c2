//! Events the module emits under the kernel tracing profile.

use sigma_core::{DataBlock, KernelCall, Matrix, MemoryBlock, SigmaConfig, SigmaModule, COSMOLOGICAL_PARAMETERS_SECTION};
use sigma_tracing::{adapter_directives, build_subscriber_with_writer, TracingConfig, TracingProfile};
use tracing::Level;
use std::io;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

fn module() -> SigmaModule<fn(&mut KernelCall<'_>) -> i32> {
    fn ones(call: &mut KernelCall<'_>) -> i32 {
        call.output_mut().fill(1.0);
        0
    }
    let options = MemoryBlock::from_ini_str(
        "[module_options]\nmatter_power = matter_power_lin\nz = 0.0 0.5\nr = 1.0 2.0\n",
    )
    .unwrap();
    SigmaModule::with_kernel(SigmaConfig::from_options(&options).unwrap(), ones as fn(&mut KernelCall<'_>) -> i32)
}

fn sample() -> MemoryBlock {
    let mut block = MemoryBlock::new();
    block.put_double(COSMOLOGICAL_PARAMETERS_SECTION, "omega_m", 0.3);
    block.put_double_array("matter_power_lin", "z", vec![0.0, 1.0]);
    block.put_double_array("matter_power_lin", "k_h", vec![0.01, 0.1, 1.0]);
    block.put_double_matrix("matter_power_lin", "p_k", Matrix::zeros(2, 3));
    block
}

#[test]
fn kernel_profile_captures_native_call_with_grid_sizes() {
    let config = TracingConfig::for_performance();
    config.kernel_timing.install();
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = build_subscriber_with_writer(&config, move || writer.clone()).unwrap();

    tracing::subscriber::with_default(subscriber, || {
        module().execute(&mut sample()).unwrap();
    });

    let text = capture.text();
    let call_line = text
        .lines()
        .find(|line| line.contains("sigma_kernel_call"))
        .unwrap_or_else(|| panic!("no kernel call event in:\n{text}"));
    assert!(call_line.contains("\"n_m\":2"), "{call_line}");
    assert!(call_line.contains("\"n_z\":2"), "{call_line}");
    assert!(call_line.contains("\"status\":0"), "{call_line}");
    assert!(text.contains("sigma module configured"));
    assert!(text.contains("sample evaluated"));
}

#[test]
fn batch_profile_keeps_debug_events_out() {
    // Pinned directives so RUST_LOG in the environment does not leak in.
    let config = TracingConfig {
        directives: Some(adapter_directives(Level::INFO, Level::WARN)),
        ..TracingConfig::for_profile(TracingProfile::Batch)
    };
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = build_subscriber_with_writer(&config, move || writer.clone()).unwrap();

    tracing::subscriber::with_default(subscriber, || {
        module().execute(&mut sample()).unwrap();
    });

    let text = capture.text();
    assert!(text.contains("sample evaluated"), "{text}");
    assert!(!text.contains("sigma_kernel_call"), "{text}");
}
