//! Typed module configuration, validated once at setup.

use crate::block::DataBlock;
use crate::constants::{log_rho_c_4pi_3, OPTION_SECTION};
use crate::error::{Result, SigmaError};
use crate::grid::{missing_or_block, GridKeys, GridSpec, LOG_MASS_KEYS, RADIUS_KEYS, REDSHIFT_KEYS};
use sigma_kernel::{LibrarySpec, DEFAULT_ENTRY_POINT, DEFAULT_LIBRARY};
use std::path::PathBuf;

/// Which scale the user gridded. The other is derived on every execute.
#[derive(Debug, Clone, PartialEq)]
pub enum ScaleAxis {
    /// log10 of mass, in h⁻¹ M☉.
    Mass(Vec<f64>),
    /// Comoving radius, in h⁻¹ Mpc.
    Radius(Vec<f64>),
}

/// Both scale vectors for one sample, as passed to the native routine.
#[derive(Debug, Clone, PartialEq)]
pub struct Scales {
    pub log_m: Vec<f64>,
    pub r: Vec<f64>,
}

impl ScaleAxis {
    pub fn len(&self) -> usize {
        match self {
            Self::Mass(v) | Self::Radius(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn uses_mass(&self) -> bool {
        matches!(self, Self::Mass(_))
    }

    /// Fill in the complementary axis.
    ///
    /// From radius, the mass enclosed by a sphere at mean matter density:
    /// `log10 m = log_rho_c_4pi_3 + log10 Ω_m + 3 log10 r`. From mass, the
    /// radius vector is a zero placeholder of matching length; the routine
    /// works from the masses in that mode.
    pub fn derive(&self, omega_m: f64, log_rho_c_4pi_3: f64) -> Scales {
        match self {
            Self::Radius(r) => {
                let offset = log_rho_c_4pi_3 + omega_m.log10();
                Scales {
                    log_m: r.iter().map(|r| offset + 3.0 * r.log10()).collect(),
                    r: r.clone(),
                }
            }
            Self::Mass(log_m) => Scales {
                log_m: log_m.clone(),
                r: vec![0.0; log_m.len()],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SigmaConfig {
    /// Section holding `z`, `k_h` and `p_k`.
    pub matter_power_section: String,
    pub z: Vec<f64>,
    pub axis: ScaleAxis,
    pub log_rho_c_4pi_3: f64,
    pub library: LibrarySpec,
}

fn read_grid<D: DataBlock + ?Sized>(options: &D, section: &str, keys: GridKeys) -> Result<Vec<f64>> {
    let values = GridSpec::from_options(options, section, keys)?.values();
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(SigmaError::InvalidOption {
            name: keys.explicit.to_string(),
            reason: format!("grid contains non-finite value {bad}"),
        });
    }
    Ok(values)
}

fn read_library<D: DataBlock + ?Sized>(options: &D, section: &str) -> Result<LibrarySpec> {
    let mut path = PathBuf::from(options.get_string_or(section, "library", DEFAULT_LIBRARY)?);
    if path.is_relative() && options.has_value(section, "library_dir") {
        path = PathBuf::from(options.get_string(section, "library_dir")?).join(path);
    }

    let dependencies = if options.has_value(section, "library_dependencies") {
        options
            .get_string(section, "library_dependencies")?
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect()
    } else {
        LibrarySpec::default().dependencies
    };

    let entry_point = options.get_string_or(section, "entry_point", DEFAULT_ENTRY_POINT)?;
    if entry_point.trim().is_empty() {
        return Err(SigmaError::InvalidOption {
            name: "entry_point".to_string(),
            reason: "must not be empty".to_string(),
        });
    }

    Ok(LibrarySpec {
        path,
        dependencies,
        entry_point: entry_point.trim().to_string(),
    })
}

impl SigmaConfig {
    /// Load from the host's `module_options` section.
    pub fn from_options<D: DataBlock + ?Sized>(options: &D) -> Result<Self> {
        Self::from_section(options, OPTION_SECTION)
    }

    /// Load from an arbitrary section, e.g. one read straight from an ini file.
    ///
    /// Every grid is resolved and checked here so that nothing is left to
    /// fail on the first sample.
    pub fn from_section<D: DataBlock + ?Sized>(options: &D, section: &str) -> Result<Self> {
        let matter_power_section = options
            .get_string(section, "matter_power")
            .map_err(|err| missing_or_block(err, section, "matter_power"))?;

        let z = read_grid(options, section, REDSHIFT_KEYS)?;

        let axis = if options.get_bool_or(section, "use_m", false)? {
            ScaleAxis::Mass(read_grid(options, section, LOG_MASS_KEYS)?)
        } else {
            let r = read_grid(options, section, RADIUS_KEYS)?;
            if let Some(bad) = r.iter().find(|r| **r <= 0.0) {
                return Err(SigmaError::InvalidOption {
                    name: RADIUS_KEYS.explicit.to_string(),
                    reason: format!("radii must be positive, got {bad}"),
                });
            }
            ScaleAxis::Radius(r)
        };

        Ok(Self {
            matter_power_section,
            z,
            axis,
            log_rho_c_4pi_3: log_rho_c_4pi_3(),
            library: read_library(options, section)?,
        })
    }
}
