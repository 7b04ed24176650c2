//! Physical constants and data block section names.

/// Critical density in units of h² M☉ Mpc⁻³.
pub const RHO_CRIT_H2: f64 = 2.775e11;

/// Section the host fills with this module's ini options.
pub const OPTION_SECTION: &str = "module_options";

pub const COSMOLOGICAL_PARAMETERS_SECTION: &str = "cosmological_parameters";

/// Output section.
pub const SIGMA_R_SECTION: &str = "sigma_r";

/// `log10(ρ_crit · 4π/3)`, the mass of a unit sphere per unit Ω_m.
pub fn log_rho_c_4pi_3() -> f64 {
    (RHO_CRIT_H2 * 4.0 * std::f64::consts::PI / 3.0).log10()
}
