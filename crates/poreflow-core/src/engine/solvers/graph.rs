use super::{FlowProblem, FlowSolution};
use crate::core::models::ids::{PoreId, ThroatId};
use crate::core::physics::hydraulics::hagen_poiseuille_conductance;
use crate::core::physics::units::{darcy_law_permeability, square_meters_to_darcy};
use crate::engine::error::NumericalError;
use std::collections::VecDeque;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Inlet,
    Outlet,
    Interior,
}

/// A conductive throat between two active pores, oriented from `pore1` (`a`) to `pore2` (`b`).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Edge {
    pub throat: ThroatId,
    pub a: usize,
    pub b: usize,
    pub radius: f64,
    /// Hagen–Poiseuille conductance in m³/(Pa·s).
    pub conductance: f64,
}

impl Edge {
    #[inline]
    pub fn other(&self, node: usize) -> usize {
        if node == self.a { self.b } else { self.a }
    }
}

/// The part of the network a solver works on: pores connected to a boundary pore and the
/// conductive throats between them, indexed densely.
#[derive(Debug, Clone)]
pub(crate) struct FlowGraph {
    pub ids: Vec<PoreId>,
    pub kinds: Vec<NodeKind>,
    /// Pore-centre coordinate along the flow axis.
    pub positions: Vec<f64>,
    pub edges: Vec<Edge>,
    /// Edge indices incident to each node.
    pub incident: Vec<Vec<usize>>,
}

impl FlowGraph {
    pub fn build(problem: &FlowProblem<'_>) -> Result<Self, NumericalError> {
        let network = problem.network;
        let boundary = problem.boundary;
        let pores = network.pores();

        let kinds: Vec<NodeKind> = pores
            .iter()
            .map(|p| {
                if boundary.is_inlet(p.id) {
                    NodeKind::Inlet
                } else if boundary.is_outlet(p.id) {
                    NodeKind::Outlet
                } else {
                    NodeKind::Interior
                }
            })
            .collect();

        let mut ignored = 0usize;
        let mut edges = Vec::new();
        for throat in network.throats() {
            let (Some(a), Some(b)) = (
                network.pore_position(throat.pore1),
                network.pore_position(throat.pore2),
            ) else {
                continue;
            };
            if a == b {
                continue;
            }
            if !throat.is_conductive() {
                ignored += 1;
                continue;
            }
            let conductance =
                hagen_poiseuille_conductance(throat.radius, throat.length, problem.viscosity);
            if !(conductance.is_finite() && conductance > 0.0) {
                ignored += 1;
                continue;
            }
            edges.push(Edge {
                throat: throat.id,
                a,
                b,
                radius: throat.radius,
                conductance,
            });
        }
        if ignored > 0 {
            warn!(
                count = ignored,
                "Ignoring throats with non-positive or non-finite geometry."
            );
        }

        let incident = incidence(pores.len(), &edges);

        let from_boundary = reachable(
            &incident,
            &edges,
            (0..pores.len()).filter(|&i| kinds[i] != NodeKind::Interior),
        );
        let from_inlet = reachable(
            &incident,
            &edges,
            (0..pores.len()).filter(|&i| kinds[i] == NodeKind::Inlet),
        );
        let connected = (0..pores.len()).any(|i| from_inlet[i] && kinds[i] == NodeKind::Outlet);
        if !connected {
            return Err(NumericalError::Disconnected);
        }

        let mut local = vec![usize::MAX; pores.len()];
        let mut ids = Vec::new();
        let mut active_kinds = Vec::new();
        let mut positions = Vec::new();
        for (i, pore) in pores.iter().enumerate() {
            if from_boundary[i] {
                local[i] = ids.len();
                ids.push(pore.id);
                active_kinds.push(kinds[i]);
                positions.push(boundary.axis.coordinate(&pore.center));
            }
        }
        let excluded = pores.len() - ids.len();
        if excluded > 0 {
            debug!(
                count = excluded,
                "Excluding pores not connected to any boundary pore."
            );
        }

        let edges: Vec<Edge> = edges
            .into_iter()
            .filter(|e| from_boundary[e.a])
            .map(|e| Edge {
                a: local[e.a],
                b: local[e.b],
                ..e
            })
            .collect();
        let incident = incidence(ids.len(), &edges);

        Ok(Self {
            ids,
            kinds: active_kinds,
            positions,
            edges,
            incident,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// The imposed pressure of a boundary node, `None` for interior nodes.
    #[inline]
    pub fn fixed_pressure(&self, node: usize, problem: &FlowProblem<'_>) -> Option<f64> {
        match self.kinds[node] {
            NodeKind::Inlet => Some(problem.input_pressure),
            NodeKind::Outlet => Some(problem.output_pressure),
            NodeKind::Interior => None,
        }
    }

    pub fn conductances(&self) -> Vec<f64> {
        self.edges.iter().map(|e| e.conductance).collect()
    }

    /// Per-edge flow `g (p_a − p_b)` for the given conductances.
    pub fn edge_flows(&self, pressures: &[f64], conductances: &[f64]) -> Vec<f64> {
        self.edges
            .iter()
            .zip(conductances)
            .map(|(e, g)| g * (pressures[e.a] - pressures[e.b]))
            .collect()
    }

    /// Net flow leaving the inlet set and net flow entering the outlet set.
    pub fn boundary_flows(&self, flows: &[f64]) -> (f64, f64) {
        let mut inlet = 0.0;
        let mut outlet = 0.0;
        for (e, q) in self.edges.iter().zip(flows) {
            let (ka, kb) = (self.kinds[e.a], self.kinds[e.b]);
            if ka == NodeKind::Inlet && kb != NodeKind::Inlet {
                inlet += q;
            } else if kb == NodeKind::Inlet && ka != NodeKind::Inlet {
                inlet -= q;
            }
            if kb == NodeKind::Outlet && ka != NodeKind::Outlet {
                outlet += q;
            } else if ka == NodeKind::Outlet && kb != NodeKind::Outlet {
                outlet -= q;
            }
        }
        (inlet, outlet)
    }

    /// Assembles the solver-independent solution, checking flow conservation.
    pub fn finish(
        &self,
        problem: &FlowProblem<'_>,
        pressures: &[f64],
        flows: &[f64],
        iterations: usize,
        conservation_tolerance: f64,
    ) -> Result<FlowSolution, NumericalError> {
        if pressures.iter().chain(flows).any(|v| !v.is_finite()) {
            return Err(NumericalError::NonFinite);
        }
        let (inlet_flow, outlet_flow) = self.boundary_flows(flows);
        let scale = inlet_flow.abs().max(outlet_flow.abs());
        if (inlet_flow - outlet_flow).abs() > conservation_tolerance * scale {
            return Err(NumericalError::ConservationViolated {
                inlet: inlet_flow,
                outlet: outlet_flow,
            });
        }

        let boundary = problem.boundary;
        let k_m2 = darcy_law_permeability(
            inlet_flow,
            problem.viscosity,
            boundary.model_length,
            boundary.model_area,
            problem.pressure_drop(),
        );

        Ok(FlowSolution {
            pressures: self.ids.iter().copied().zip(pressures.iter().copied()).collect(),
            throat_flows: self
                .edges
                .iter()
                .map(|e| e.throat)
                .zip(flows.iter().copied())
                .collect(),
            inlet_flow,
            outlet_flow,
            total_flow: inlet_flow,
            raw_darcy: square_meters_to_darcy(k_m2),
            iterations,
        })
    }
}

fn incidence(nodes: usize, edges: &[Edge]) -> Vec<Vec<usize>> {
    let mut incident = vec![Vec::new(); nodes];
    for (k, e) in edges.iter().enumerate() {
        incident[e.a].push(k);
        incident[e.b].push(k);
    }
    incident
}

fn reachable(
    incident: &[Vec<usize>],
    edges: &[Edge],
    sources: impl Iterator<Item = usize>,
) -> Vec<bool> {
    let mut seen = vec![false; incident.len()];
    let mut queue = VecDeque::new();
    for s in sources {
        if !seen[s] {
            seen[s] = true;
            queue.push_back(s);
        }
    }
    while let Some(node) = queue.pop_front() {
        for &k in &incident[node] {
            let next = edges[k].other(node);
            if !seen[next] {
                seen[next] = true;
                queue.push_back(next);
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::network::PoreNetworkModelBuilder;
    use crate::core::models::pore::{Pore, Throat};
    use crate::engine::boundary;
    use crate::engine::solvers::test_networks;
    use crate::core::models::axis::FlowAxis;
    use nalgebra::Point3;

    #[test]
    fn disconnected_chain_is_rejected() {
        let network = test_networks::split_chain();
        let boundary = boundary::select(&network, FlowAxis::X, 0.1).unwrap();
        let problem = FlowProblem {
            network: &network,
            boundary: &boundary,
            viscosity: 1e-3,
            input_pressure: 1.0,
            output_pressure: 0.0,
        };
        assert_eq!(
            FlowGraph::build(&problem).unwrap_err(),
            NumericalError::Disconnected
        );
    }

    #[test]
    fn dead_pores_and_degenerate_throats_are_excluded() {
        let mut builder = PoreNetworkModelBuilder::new();
        for (i, x) in [0.0, 1e-5, 2e-5, 1e-5].into_iter().enumerate() {
            let y = if i == 3 { 1e-5 } else { 0.0 };
            builder
                .add_pore(Pore::new(PoreId(i as i32), Point3::new(x, y, 0.0), 1e-6, 1.0, 1.0))
                .unwrap();
        }
        let throat = |id, a, b, r| Throat::new(ThroatId(id), PoreId(a), PoreId(b), r, 1e-5, 0.0);
        builder.add_throat(throat(0, 0, 1, 1e-6)).unwrap();
        builder.add_throat(throat(1, 1, 2, 1e-6)).unwrap();
        builder.add_throat(throat(2, 1, 3, 0.0)).unwrap();
        let network = builder.build().unwrap();
        let boundary = boundary::select(&network, FlowAxis::X, 0.1).unwrap();
        let problem = FlowProblem {
            network: &network,
            boundary: &boundary,
            viscosity: 1e-3,
            input_pressure: 1.0,
            output_pressure: 0.0,
        };

        let graph = FlowGraph::build(&problem).unwrap();
        assert_eq!(graph.ids, vec![PoreId(0), PoreId(1), PoreId(2)]);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.kinds[1], NodeKind::Interior);
    }

    #[test]
    fn boundary_flows_follow_throat_orientation() {
        let network = test_networks::two_pores(1e-6, 1e-5);
        let boundary = boundary::select(&network, FlowAxis::X, 0.1).unwrap();
        let problem = FlowProblem {
            network: &network,
            boundary: &boundary,
            viscosity: 1e-3,
            input_pressure: 1.0,
            output_pressure: 0.0,
        };
        let graph = FlowGraph::build(&problem).unwrap();
        assert_eq!(graph.boundary_flows(&[2.0]), (2.0, 2.0));
    }
}
