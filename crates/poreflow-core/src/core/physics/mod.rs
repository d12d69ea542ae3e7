//! Physical laws shared by every flow formulation.
//!
//! - [`units`] - SI/Darcy conversions and Darcy's law
//! - [`hydraulics`] - Hagen–Poiseuille conductance, Reynolds number and the inertial
//!   (Forchheimer) throat resistance
//! - [`kozeny_carman`] - Empirical permeability from aggregate geometry
//! - [`tortuosity`] - The correction law applied uniformly to every raw permeability

pub mod hydraulics;
pub mod kozeny_carman;
pub mod tortuosity;
pub mod units;
