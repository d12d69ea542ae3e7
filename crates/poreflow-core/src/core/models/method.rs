use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A graph-based flow formulation that can be selected for a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// Linear Hagen–Poiseuille network solve.
    Darcy,
    /// Mesoscopic link-population relaxation on the pore graph.
    LatticeBoltzmann,
    /// Network solve with an inertial (non-Darcy) throat resistance.
    NavierStokes,
}

impl Method {
    /// Every method in the canonical order used for aggregation and persistence.
    pub const ALL: [Method; 3] = [Method::Darcy, Method::LatticeBoltzmann, Method::NavierStokes];

    pub fn display_name(self) -> &'static str {
        match self {
            Method::Darcy => "Darcy",
            Method::LatticeBoltzmann => "Lattice Boltzmann",
            Method::NavierStokes => "Navier-Stokes",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "darcy" => Ok(Method::Darcy),
            "lattice" | "lbm" | "lattice-boltzmann" => Ok(Method::LatticeBoltzmann),
            "navier-stokes" | "ns" | "inertial" => Ok(Method::NavierStokes),
            other => Err(format!("unknown method '{}'", other)),
        }
    }
}

/// Independent per-method selection flags; any combination may be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct MethodSelection {
    pub darcy: bool,
    pub lattice_boltzmann: bool,
    pub navier_stokes: bool,
}

impl MethodSelection {
    pub fn all() -> Self {
        Self {
            darcy: true,
            lattice_boltzmann: true,
            navier_stokes: true,
        }
    }

    pub fn only(method: Method) -> Self {
        let mut selection = Self::default();
        selection.set(method, true);
        selection
    }

    pub fn contains(&self, method: Method) -> bool {
        match method {
            Method::Darcy => self.darcy,
            Method::LatticeBoltzmann => self.lattice_boltzmann,
            Method::NavierStokes => self.navier_stokes,
        }
    }

    pub fn set(&mut self, method: Method, enabled: bool) {
        match method {
            Method::Darcy => self.darcy = enabled,
            Method::LatticeBoltzmann => self.lattice_boltzmann = enabled,
            Method::NavierStokes => self.navier_stokes = enabled,
        }
    }

    /// Selected methods in canonical order.
    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        Method::ALL.into_iter().filter(|m| self.contains(*m))
    }

    pub fn is_empty(&self) -> bool {
        self.methods().next().is_none()
    }

    pub fn len(&self) -> usize {
        self.methods().count()
    }
}
