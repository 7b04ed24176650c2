//! Grid options: an explicit vector, or a `{min, max, step}` range.

use crate::block::DataBlock;
use crate::error::{BlockError, Result, SigmaError};
use tracing::debug;

/// Option names describing one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridKeys {
    pub explicit: &'static str,
    pub min: &'static str,
    pub max: &'static str,
    pub step: &'static str,
}

pub const REDSHIFT_KEYS: GridKeys = GridKeys {
    explicit: "z",
    min: "zmin",
    max: "zmax",
    step: "dz",
};

pub const LOG_MASS_KEYS: GridKeys = GridKeys {
    explicit: "logm",
    min: "logmmin",
    max: "logmmax",
    step: "dlogm",
};

pub const RADIUS_KEYS: GridKeys = GridKeys {
    explicit: "r",
    min: "rmin",
    max: "rmax",
    step: "dr",
};

#[derive(Debug, Clone, PartialEq)]
pub enum GridSpec {
    Explicit(Vec<f64>),
    /// Half-open `[min, max)`.
    Range { min: f64, max: f64, step: f64 },
}

fn required_double<D: DataBlock + ?Sized>(options: &D, section: &str, name: &str) -> Result<f64> {
    let value = options.get_double(section, name).map_err(|err| missing_or_block(err, section, name))?;
    if !value.is_finite() {
        return Err(SigmaError::InvalidOption {
            name: name.to_string(),
            reason: format!("{value} is not finite"),
        });
    }
    Ok(value)
}

pub(crate) fn missing_or_block(err: BlockError, section: &str, name: &str) -> SigmaError {
    if err.is_missing() {
        SigmaError::MissingConfiguration {
            section: section.to_string(),
            name: name.to_string(),
        }
    } else {
        SigmaError::Block(err)
    }
}

impl GridSpec {
    /// Read one axis. The explicit vector wins whenever it is present;
    /// otherwise all three range options are required.
    pub fn from_options<D: DataBlock + ?Sized>(options: &D, section: &str, keys: GridKeys) -> Result<Self> {
        if options.has_value(section, keys.explicit) {
            if [keys.min, keys.max, keys.step]
                .iter()
                .any(|k| options.has_value(section, k))
            {
                debug!(option = keys.explicit, "explicit grid given, ignoring range options");
            }
            let values = options.get_double_array(section, keys.explicit)?;
            return Ok(Self::Explicit(values));
        }

        let min = required_double(options, section, keys.min)?;
        let max = required_double(options, section, keys.max)?;
        let step = required_double(options, section, keys.step)?;
        if step <= 0.0 {
            return Err(SigmaError::InvalidOption {
                name: keys.step.to_string(),
                reason: format!("step must be positive, got {step}"),
            });
        }
        if range_len(min, max, step).is_none() {
            return Err(SigmaError::InvalidOption {
                name: keys.step.to_string(),
                reason: format!("range [{min}, {max}) with step {step} has more than {} points", i32::MAX),
            });
        }
        Ok(Self::Range { min, max, step })
    }

    pub fn values(&self) -> Vec<f64> {
        match self {
            Self::Explicit(values) => values.clone(),
            Self::Range { min, max, step } => arange(*min, *max, *step),
        }
    }
}

/// Number of points in `[min, max)` at `step`.
///
/// `None` when the count is not finite or exceeds `i32::MAX`, the largest
/// length the native routine accepts.
pub fn range_len(min: f64, max: f64, step: f64) -> Option<usize> {
    if step.is_nan() || step <= 0.0 || min.is_nan() || max.is_nan() {
        return None;
    }
    if min >= max {
        return Some(0);
    }
    let n = ((max - min) / step).ceil();
    if n.is_finite() && n <= i32::MAX as f64 {
        Some(n as usize)
    } else {
        None
    }
}

/// `min, min + step, ...` strictly below `max`; empty when `min >= max`.
///
/// The element count is `ceil((max - min) / step)` and each element is
/// computed as `min + i * step`, so rounding does not accumulate. Ranges
/// rejected by [`range_len`] also yield an empty grid; [`GridSpec`] reports
/// them as errors instead.
pub fn arange(min: f64, max: f64, step: f64) -> Vec<f64> {
    let n = range_len(min, max, step).unwrap_or(0);
    (0..n).map(|i| min + i as f64 * step).collect()
}
