use super::axis::FlowAxis;
use super::ids::{PoreId, ThroatId};
use super::method::Method;
use crate::core::physics::{tortuosity, units};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub type PressureField = BTreeMap<PoreId, f64>;
pub type ThroatFlowMap = BTreeMap<ThroatId, f64>;

/// Raw and tortuosity-corrected permeability of one method, in Darcy and milli-Darcy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Permeability {
    pub raw_darcy: f64,
    pub raw_millidarcy: f64,
    pub corrected_darcy: f64,
    pub corrected_millidarcy: f64,
}

impl Permeability {
    /// Builds the value block from a raw Darcy value and applies the tortuosity correction.
    pub fn from_raw_darcy(raw_darcy: f64, tortuosity_factor: f64) -> Self {
        let corrected_darcy = tortuosity::correct(raw_darcy, tortuosity_factor);
        Self {
            raw_darcy,
            raw_millidarcy: units::darcy_to_millidarcy(raw_darcy),
            corrected_darcy,
            corrected_millidarcy: units::darcy_to_millidarcy(corrected_darcy),
        }
    }
}

/// The snapshot record produced once per simulation run.
///
/// Method blocks and per-method pressure fields whose `used_*` flag is `false` are left at
/// their defaults. The shared `pressure_field`, `throat_flow_rates` and `total_flow_rate`
/// come from the first method that completed, in the order Darcy, lattice, Navier–Stokes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PermeabilitySimulationResult {
    pub flow_axis: FlowAxis,
    pub viscosity: f64,
    pub input_pressure: f64,
    pub output_pressure: f64,
    pub tortuosity: f64,
    pub model_length: f64,
    pub model_area: f64,

    pub used_darcy: bool,
    pub used_lattice_boltzmann: bool,
    pub used_navier_stokes: bool,

    pub darcy: Permeability,
    pub lattice_boltzmann: Permeability,
    pub navier_stokes: Permeability,
    pub kozeny_carman: Permeability,

    pub pressure_field: PressureField,
    pub darcy_pressures: PressureField,
    pub lattice_boltzmann_pressures: PressureField,
    pub navier_stokes_pressures: PressureField,

    pub throat_flow_rates: ThroatFlowMap,
    pub total_flow_rate: f64,

    pub inlet_pores: BTreeSet<PoreId>,
    pub outlet_pores: BTreeSet<PoreId>,

    /// Human-readable creation time, absent in records migrated from older formats.
    pub timestamp: Option<String>,
}

impl PermeabilitySimulationResult {
    pub fn pressure_drop(&self) -> f64 {
        self.input_pressure - self.output_pressure
    }

    pub fn is_used(&self, method: Method) -> bool {
        match method {
            Method::Darcy => self.used_darcy,
            Method::LatticeBoltzmann => self.used_lattice_boltzmann,
            Method::NavierStokes => self.used_navier_stokes,
        }
    }

    pub fn set_used(&mut self, method: Method, used: bool) {
        match method {
            Method::Darcy => self.used_darcy = used,
            Method::LatticeBoltzmann => self.used_lattice_boltzmann = used,
            Method::NavierStokes => self.used_navier_stokes = used,
        }
    }

    pub fn permeability(&self, method: Method) -> &Permeability {
        match method {
            Method::Darcy => &self.darcy,
            Method::LatticeBoltzmann => &self.lattice_boltzmann,
            Method::NavierStokes => &self.navier_stokes,
        }
    }

    pub fn permeability_mut(&mut self, method: Method) -> &mut Permeability {
        match method {
            Method::Darcy => &mut self.darcy,
            Method::LatticeBoltzmann => &mut self.lattice_boltzmann,
            Method::NavierStokes => &mut self.navier_stokes,
        }
    }

    pub fn pressures(&self, method: Method) -> &PressureField {
        match method {
            Method::Darcy => &self.darcy_pressures,
            Method::LatticeBoltzmann => &self.lattice_boltzmann_pressures,
            Method::NavierStokes => &self.navier_stokes_pressures,
        }
    }

    pub fn pressures_mut(&mut self, method: Method) -> &mut PressureField {
        match method {
            Method::Darcy => &mut self.darcy_pressures,
            Method::LatticeBoltzmann => &mut self.lattice_boltzmann_pressures,
            Method::NavierStokes => &mut self.navier_stokes_pressures,
        }
    }

    pub fn used_methods(&self) -> impl Iterator<Item = Method> + '_ {
        Method::ALL.into_iter().filter(|m| self.is_used(*m))
    }

    /// Whether a Kozeny–Carman reference value is present.
    pub fn has_kozeny_carman(&self) -> bool {
        self.kozeny_carman.raw_darcy > 0.0
    }

    /// Multi-line human-readable summary of every method that ran.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PermeabilitySimulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Permeability along {} (ΔP = {:.4} Pa, μ = {:.4e} Pa·s, τ = {:.4})",
            self.flow_axis,
            self.pressure_drop(),
            self.viscosity,
            self.tortuosity
        )?;
        let mut any = false;
        for method in self.used_methods() {
            any = true;
            let k = self.permeability(method);
            writeln!(
                f,
                "  {:<18} raw {:.6e} D ({:.4} mD), corrected {:.6e} D ({:.4} mD)",
                method.display_name(),
                k.raw_darcy,
                k.raw_millidarcy,
                k.corrected_darcy,
                k.corrected_millidarcy
            )?;
        }
        if !any {
            writeln!(f, "  no flow method completed")?;
        }
        if self.has_kozeny_carman() {
            let k = &self.kozeny_carman;
            writeln!(
                f,
                "  {:<18} raw {:.6e} D ({:.4} mD), corrected {:.6e} D ({:.4} mD)",
                "Kozeny-Carman",
                k.raw_darcy,
                k.raw_millidarcy,
                k.corrected_darcy,
                k.corrected_millidarcy
            )?;
        }
        write!(
            f,
            "  total flow {:.6e} m³/s through {} inlet / {} outlet pores",
            self.total_flow_rate,
            self.inlet_pores.len(),
            self.outlet_pores.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_darcy_applies_tortuosity_and_units() {
        let k = Permeability::from_raw_darcy(2.0, 2.0);
        assert_eq!(k.raw_darcy, 2.0);
        assert_eq!(k.raw_millidarcy, 2000.0);
        assert_eq!(k.corrected_darcy, 0.5);
        assert_eq!(k.corrected_millidarcy, 500.0);
    }

    #[test]
    fn used_flags_follow_setters() {
        let mut result = PermeabilitySimulationResult::default();
        result.set_used(Method::LatticeBoltzmann, true);
        assert!(result.is_used(Method::LatticeBoltzmann));
        assert!(!result.is_used(Method::Darcy));
        let used: Vec<_> = result.used_methods().collect();
        assert_eq!(used, vec![Method::LatticeBoltzmann]);
    }

    #[test]
    fn summary_lists_only_used_methods() {
        let mut result = PermeabilitySimulationResult {
            tortuosity: 1.5,
            used_darcy: true,
            darcy: Permeability::from_raw_darcy(1.0, 1.5),
            ..Default::default()
        };
        result.navier_stokes = Permeability::from_raw_darcy(9.0, 1.5);

        let summary = result.summary();
        assert!(summary.contains("Darcy"));
        assert!(!summary.contains("Navier-Stokes"));
        assert!(summary.contains("1.5000"));
    }

    #[test]
    fn summary_reports_when_nothing_ran() {
        let result = PermeabilitySimulationResult::default();
        assert!(result.summary().contains("no flow method completed"));
    }
}
