use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name,
            reason: reason.into(),
        }
    }
}

pub const DEFAULT_BOUNDARY_FRACTION: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DarcySolverConfig {
    /// Largest number of unknowns solved by dense LU; larger systems use conjugate gradients.
    pub direct_solve_limit: usize,
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Allowed relative mismatch between inlet and outlet flow.
    pub conservation_tolerance: f64,
}

impl Default for DarcySolverConfig {
    fn default() -> Self {
        Self {
            direct_solve_limit: 256,
            tolerance: 1e-12,
            max_iterations: 10_000,
            conservation_tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct LatticeSolverConfig {
    /// BGK relaxation time; must exceed 0.5.
    pub relaxation_time: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub check_interval: usize,
}

impl Default for LatticeSolverConfig {
    fn default() -> Self {
        Self {
            relaxation_time: 1.0,
            tolerance: 1e-10,
            max_iterations: 200_000,
            check_interval: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct InertialSolverConfig {
    /// Fluid density in kg/m³.
    pub fluid_density: f64,
    /// Dimensionless form-loss coefficient of a throat.
    pub loss_coefficient: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for InertialSolverConfig {
    fn default() -> Self {
        Self {
            fluid_density: 1000.0,
            loss_coefficient: 1.0,
            tolerance: 1e-9,
            max_iterations: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    pub boundary_fraction: f64,
    pub darcy: DarcySolverConfig,
    pub lattice: LatticeSolverConfig,
    pub inertial: InertialSolverConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            boundary_fraction: DEFAULT_BOUNDARY_FRACTION,
            darcy: DarcySolverConfig::default(),
            lattice: LatticeSolverConfig::default(),
            inertial: InertialSolverConfig::default(),
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = self.boundary_fraction;
        if !(f > 0.0 && f < 0.5) {
            return Err(ConfigError::invalid(
                "boundary_fraction",
                format!("{} is outside (0, 0.5)", f),
            ));
        }
        positive("darcy.tolerance", self.darcy.tolerance)?;
        positive("darcy.conservation_tolerance", self.darcy.conservation_tolerance)?;
        nonzero("darcy.max_iterations", self.darcy.max_iterations)?;

        let tau = self.lattice.relaxation_time;
        if !(tau.is_finite() && tau > 0.5) {
            return Err(ConfigError::invalid(
                "lattice.relaxation_time",
                format!("{} must be greater than 0.5", tau),
            ));
        }
        positive("lattice.tolerance", self.lattice.tolerance)?;
        nonzero("lattice.max_iterations", self.lattice.max_iterations)?;
        nonzero("lattice.check_interval", self.lattice.check_interval)?;

        positive("inertial.fluid_density", self.inertial.fluid_density)?;
        if !(self.inertial.loss_coefficient.is_finite() && self.inertial.loss_coefficient >= 0.0) {
            return Err(ConfigError::invalid(
                "inertial.loss_coefficient",
                "must be finite and non-negative",
            ));
        }
        positive("inertial.tolerance", self.inertial.tolerance)?;
        nonzero("inertial.max_iterations", self.inertial.max_iterations)?;
        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, format!("{} must be positive", value)))
    }
}

fn nonzero(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, "must be at least 1"))
    }
}

#[derive(Default)]
pub struct SolverConfigBuilder {
    boundary_fraction: Option<f64>,
    darcy: Option<DarcySolverConfig>,
    lattice: Option<LatticeSolverConfig>,
    inertial: Option<InertialSolverConfig>,
}

impl SolverConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boundary_fraction(mut self, fraction: f64) -> Self {
        self.boundary_fraction = Some(fraction);
        self
    }
    pub fn darcy(mut self, config: DarcySolverConfig) -> Self {
        self.darcy = Some(config);
        self
    }
    pub fn lattice(mut self, config: LatticeSolverConfig) -> Self {
        self.lattice = Some(config);
        self
    }
    pub fn inertial(mut self, config: InertialSolverConfig) -> Self {
        self.inertial = Some(config);
        self
    }

    pub fn build(self) -> Result<SolverConfig, ConfigError> {
        let config = SolverConfig {
            boundary_fraction: self.boundary_fraction.unwrap_or(DEFAULT_BOUNDARY_FRACTION),
            darcy: self.darcy.unwrap_or_default(),
            lattice: self.lattice.unwrap_or_default(),
            inertial: self.inertial.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}
