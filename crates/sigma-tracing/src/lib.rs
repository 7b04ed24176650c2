//! Tracing setup shared by the sigma adapter crates and their hosts.
//!
//! Library code only emits `tracing` events. Whoever drives the pipeline
//! (a host binary, an integration test, a bench) decides how those events
//! are collected by installing a subscriber built from a [`TracingConfig`].
//!
//! The formatter writes to stderr by default: a pipeline host may own
//! stdout for its own reporting.

pub mod performance;

#[macro_use]
pub mod macros;

use std::env;
use std::io;
use thiserror::Error;
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter, Registry};

#[doc(hidden)]
pub use tracing as __tracing;

/// Crates whose events the profiles raise above the base level.
pub const ADAPTER_TARGETS: &[&str] = &["sigma_core", "sigma_kernel", "sigma_tracing"];

/// Filter directive giving the adapter crates `adapter` and everything else
/// `rest`, e.g. `sigma_core=debug,sigma_kernel=debug,sigma_tracing=debug,warn`.
pub fn adapter_directives(adapter: Level, rest: Level) -> String {
    let adapter = adapter.as_str().to_ascii_lowercase();
    let mut directives: Vec<String> = ADAPTER_TARGETS.iter().map(|t| format!("{t}={adapter}")).collect();
    directives.push(rest.as_str().to_ascii_lowercase());
    directives.join(",")
}

/// Named starting points for a [`TracingConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingProfile {
    /// A person running one chain by hand: pretty, coloured, info.
    Interactive,
    /// Sampler jobs on a cluster: JSON lines, adapter at info, rest at warn.
    Batch,
    /// Kernel timing: JSON, adapter crates at debug, span close events and
    /// every native call recorded.
    Kernel,
}

impl TracingProfile {
    /// Accepts the profile names and the older `local`/`ci`/`performance`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "interactive" | "local" => Some(Self::Interactive),
            "batch" | "ci" => Some(Self::Batch),
            "kernel" | "performance" => Some(Self::Kernel),
            _ => None,
        }
    }
}

/// Which native calls are timed, see [`performance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelTiming {
    pub enabled: bool,
    /// Calls faster than this are not logged. `None` logs every call.
    pub threshold_us: Option<u64>,
}

impl KernelTiming {
    /// Apply process-wide. Done by [`init_global_tracing`]; call directly
    /// when installing a scoped subscriber.
    pub fn install(&self) {
        performance::set_enabled(self.enabled);
        performance::set_default_threshold_us(self.threshold_us);
    }
}

#[derive(Clone, Debug)]
pub struct TracingConfig {
    pub profile: TracingProfile,
    /// Filter directives. When absent the filter falls back to `RUST_LOG`
    /// and then to the profile's own directives.
    pub directives: Option<String>,
    pub output: TracingOutput,
    /// Forced off for JSON output.
    pub ansi: bool,
    pub kernel_timing: KernelTiming,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::for_profile(TracingProfile::Interactive)
    }
}

impl TracingConfig {
    pub fn for_profile(profile: TracingProfile) -> Self {
        match profile {
            TracingProfile::Interactive => Self {
                profile,
                directives: None,
                output: TracingOutput::Pretty,
                ansi: true,
                kernel_timing: KernelTiming {
                    enabled: cfg!(debug_assertions),
                    threshold_us: None,
                },
            },
            TracingProfile::Batch => Self {
                profile,
                directives: None,
                output: TracingOutput::Json,
                ansi: false,
                kernel_timing: KernelTiming {
                    enabled: false,
                    threshold_us: None,
                },
            },
            TracingProfile::Kernel => Self {
                profile,
                directives: Some(adapter_directives(Level::DEBUG, Level::INFO)),
                output: TracingOutput::Json,
                ansi: false,
                kernel_timing: KernelTiming {
                    enabled: true,
                    threshold_us: None,
                },
            },
        }
    }

    pub fn for_performance() -> Self {
        Self::for_profile(TracingProfile::Kernel)
    }

    /// Build a configuration from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `SIGMA_TRACING_PROFILE` - `interactive` (default), `batch`, or `kernel`
    /// - `SIGMA_TRACING_DIRECTIVES` - overrides filter directives
    /// - `SIGMA_TRACING_FORMAT` - `pretty`, `compact`, or `json`
    /// - `SIGMA_PERF_TRACING` - `true`/`1`/`yes` to time native calls
    /// - `SIGMA_PERF_THRESHOLD_US` - minimum call duration to log
    pub fn from_env() -> Self {
        let profile = env::var("SIGMA_TRACING_PROFILE")
            .ok()
            .and_then(|p| TracingProfile::parse(&p))
            .unwrap_or(TracingProfile::Interactive);
        let mut config = Self::for_profile(profile);

        if let Ok(directives) = env::var("SIGMA_TRACING_DIRECTIVES") {
            if !directives.trim().is_empty() {
                config.directives = Some(directives);
            }
        }
        if let Some(output) = env::var("SIGMA_TRACING_FORMAT").ok().and_then(|f| TracingOutput::parse(&f)) {
            config.output = output;
        }
        if let Ok(flag) = env::var("SIGMA_PERF_TRACING") {
            config.kernel_timing.enabled = matches!(flag.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes");
        }
        if let Some(threshold_us) = env::var("SIGMA_PERF_THRESHOLD_US").ok().and_then(|t| t.trim().parse().ok()) {
            config.kernel_timing.threshold_us = Some(threshold_us);
        }

        if config.output == TracingOutput::Json {
            config.ansi = false;
        }
        config
    }

    fn profile_directives(&self) -> String {
        match self.profile {
            TracingProfile::Interactive => "info".to_string(),
            TracingProfile::Batch => adapter_directives(Level::INFO, Level::WARN),
            TracingProfile::Kernel => adapter_directives(Level::DEBUG, Level::INFO),
        }
    }

    fn resolve_filter(&self) -> Result<EnvFilter, TracingSetupError> {
        match &self.directives {
            Some(directives) => EnvFilter::try_new(directives).map_err(|err| TracingSetupError::InvalidFilter {
                directives: directives.clone(),
                reason: err.to_string(),
            }),
            None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.profile_directives()))),
        }
    }

    fn span_events(&self) -> FmtSpan {
        match self.profile {
            TracingProfile::Kernel => FmtSpan::CLOSE,
            _ => FmtSpan::NONE,
        }
    }
}

#[derive(Debug, Error)]
pub enum TracingSetupError {
    #[error("invalid tracing directives {directives:?}: {reason}")]
    InvalidFilter { directives: String, reason: String },

    #[error("failed to install global tracing subscriber: {0}")]
    SubscriberInit(#[from] tracing_subscriber::util::TryInitError),
}

/// Subscriber writing to stderr.
pub fn build_subscriber(config: &TracingConfig) -> Result<impl Subscriber + Send + Sync, TracingSetupError> {
    build_subscriber_with_writer(config, io::stderr)
}

/// Subscriber writing to `writer`, for hosts that route logs themselves and
/// for tests that capture them.
pub fn build_subscriber_with_writer<W>(
    config: &TracingConfig,
    writer: W,
) -> Result<impl Subscriber + Send + Sync, TracingSetupError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = config.resolve_filter()?;
    Ok(Registry::default().with(format_layer(config, writer)).with(filter))
}

fn format_layer<W>(config: &TracingConfig, writer: W) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_span_events(config.span_events());
    match config.output {
        TracingOutput::Compact => Box::new(layer.compact().with_ansi(config.ansi)),
        TracingOutput::Pretty => Box::new(layer.pretty().with_ansi(config.ansi)),
        TracingOutput::Json => Box::new(layer.json().with_ansi(false)),
    }
}

/// Install the configured subscriber as the process-wide default and apply
/// its kernel timing settings.
pub fn init_global_tracing(config: &TracingConfig) -> Result<(), TracingSetupError> {
    config.kernel_timing.install();
    build_subscriber(config)?.try_init()?;
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingOutput {
    Compact,
    Pretty,
    Json,
}

impl TracingOutput {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}
