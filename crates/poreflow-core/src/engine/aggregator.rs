use super::boundary::Boundary;
use super::error::NumericalError;
use super::solvers::FlowSolution;
use crate::core::models::axis::FlowAxis;
use crate::core::models::method::Method;
use crate::core::models::network::PoreNetworkModel;
use crate::core::models::result::{Permeability, PermeabilitySimulationResult};
use crate::core::physics::kozeny_carman;
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current UTC time in the format stored with results.
pub fn timestamp_now() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Collects per-method outcomes of one run into a [`PermeabilitySimulationResult`].
///
/// A method's `used_*` flag is set only when its solver completed. The same tortuosity
/// correction is applied to every raw value, Kozeny–Carman included.
#[derive(Debug)]
pub struct ResultAggregator {
    result: PermeabilitySimulationResult,
    solutions: BTreeMap<Method, FlowSolution>,
}

impl ResultAggregator {
    pub fn new(
        network: &PoreNetworkModel,
        boundary: &Boundary,
        axis: FlowAxis,
        viscosity: f64,
        input_pressure: f64,
        output_pressure: f64,
    ) -> Self {
        let result = PermeabilitySimulationResult {
            flow_axis: axis,
            viscosity,
            input_pressure,
            output_pressure,
            tortuosity: network.tortuosity(),
            model_length: boundary.model_length,
            model_area: boundary.model_area,
            inlet_pores: boundary.inlet.clone(),
            outlet_pores: boundary.outlet.clone(),
            ..Default::default()
        };
        Self {
            result,
            solutions: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, method: Method, outcome: Result<FlowSolution, NumericalError>) {
        match outcome {
            Ok(solution) => {
                let tortuosity = self.result.tortuosity;
                *self.result.permeability_mut(method) =
                    Permeability::from_raw_darcy(solution.raw_darcy, tortuosity);
                *self.result.pressures_mut(method) = solution.pressures.clone();
                self.result.set_used(method, true);
                self.solutions.insert(method, solution);
            }
            Err(error) => {
                warn!(method = %method, error = %error, "Method failed; excluding it from the result.");
                self.result.set_used(method, false);
                *self.result.permeability_mut(method) = Permeability::default();
                self.result.pressures_mut(method).clear();
                self.solutions.remove(&method);
            }
        }
    }

    pub fn completed(&self) -> usize {
        self.solutions.len()
    }

    /// Finalises the record, taking the shared fields from the first completed method.
    pub fn finish(
        mut self,
        network: &PoreNetworkModel,
        timestamp: Option<String>,
    ) -> PermeabilitySimulationResult {
        if let Some((method, primary)) = Method::ALL
            .into_iter()
            .find_map(|m| self.solutions.remove(&m).map(|s| (m, s)))
        {
            info!(method = %method, "Primary flow field taken from first completed method.");
            self.result.pressure_field = primary.pressures;
            self.result.throat_flow_rates = primary.throat_flows;
            self.result.total_flow_rate = primary.total_flow;
        }

        if let Some(raw) = kozeny_carman::estimate_darcy(network) {
            self.result.kozeny_carman = Permeability::from_raw_darcy(raw, self.result.tortuosity);
        }
        self.result.timestamp = timestamp;
        self.result
    }
}
