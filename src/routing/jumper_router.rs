use indexmap::{IndexMap, IndexSet};

use crate::error::RouterError;
use crate::footprint::JumperFootprint;
use crate::geometry::{BoundingBox, Point};
use crate::solver::{Solver, SolverState};
use crate::types::{
    HighDensityIntraNodeRouteWithJumpers, JumperOrientation, NodeWithPortPoints, Obstacle, PortPoint, SrjJumper,
};

use super::grid::{JumperGridGenerator, JumperGridParams, JumperX4GridGenerator};
use super::overlap::add_midpoints_for_collinear_overlaps;
use super::path_solver::{GraphPathSolver, JumperGraphSolver};
use super::postprocess::solved_routes_to_traces;
use super::types::{HyperGraphRouterConfig, JumperGraph, PathSolverConfig, XyConnection};

fn pad_key(point: &Point) -> String {
    format!("{:.3},{:.3}", point.x, point.y)
}

/// Routes every connection of one node through a tiled grid of 1206x4
/// jumper arrays.
///
/// The first step generates the grid, checks it fits the node and builds
/// the path solver; later steps advance the path solver until it finishes.
pub struct HyperGraphJumperRouter<P = JumperGraphSolver, G = JumperX4GridGenerator> {
    node: NodeWithPortPoints,
    config: HyperGraphRouterConfig,
    generator: G,
    jumper_graph: Option<JumperGraph>,
    path_solver: Option<P>,
    solved_routes: Vec<HighDensityIntraNodeRouteWithJumpers>,
    state: SolverState,
}

impl HyperGraphJumperRouter<JumperGraphSolver, JumperX4GridGenerator> {
    pub fn new(node: NodeWithPortPoints, config: HyperGraphRouterConfig) -> Self {
        HyperGraphJumperRouter::with_generator(node, config, JumperX4GridGenerator)
    }
}

impl<P: GraphPathSolver, G: JumperGridGenerator> HyperGraphJumperRouter<P, G> {
    pub fn with_generator(node: NodeWithPortPoints, config: HyperGraphRouterConfig, generator: G) -> Self {
        HyperGraphJumperRouter {
            state: SolverState::new(config.max_iterations),
            node,
            config,
            generator,
            jumper_graph: None,
            path_solver: None,
            solved_routes: Vec::new(),
        }
    }

    pub fn node(&self) -> &NodeWithPortPoints {
        &self.node
    }

    pub fn path_solver(&self) -> Option<&P> {
        self.path_solver.as_ref()
    }

    /// Routed traces, available once solved.
    pub fn output(&self) -> &[HighDensityIntraNodeRouteWithJumpers] {
        &self.solved_routes
    }

    /// Connections with at least two port points, first two points as ends.
    fn xy_connections(&self) -> Vec<XyConnection> {
        let mut grouped: IndexMap<&str, Vec<&PortPoint>> = IndexMap::new();
        for pp in &self.node.port_points {
            grouped.entry(pp.connection_name.as_str()).or_default().push(pp);
        }
        grouped
            .into_iter()
            .filter_map(|(name, points)| match points.as_slice() {
                [start, end, ..] => Some(XyConnection {
                    connection_id: name.to_string(),
                    start: Point::new(start.x, start.y),
                    end: Point::new(end.x, end.y),
                }),
                _ => None,
            })
            .collect()
    }

    #[tracing::instrument(skip_all, fields(node = %self.node.node_id))]
    fn initialize(&mut self) {
        let node_bounds = self.node.bounds();
        let params = JumperGridParams::for_pattern(self.config.pattern, self.config.orientation, node_bounds, &self.config);
        let generated = self.generator.generate(&params);

        if let Some(graph_bounds) = generated.graph.bounds() {
            if !graph_bounds.is_within(&node_bounds, self.config.bounds_tolerance) {
                let err = RouterError::BoundsViolation {
                    graph: graph_bounds,
                    node: node_bounds,
                };
                tracing::warn!(%err, "jumper grid does not fit node");
                self.state.fail(err);
                return;
            }
        }

        let connections = self.xy_connections();
        if connections.is_empty() {
            tracing::info!("no connections to route");
            self.jumper_graph = Some(generated);
            self.state.succeed();
            return;
        }

        let path_config = PathSolverConfig {
            max_iterations: self.config.path_solver.max_iterations * self.config.path_solver_budget_multiplier,
            ..self.config.path_solver
        };
        tracing::debug!(
            connections = connections.len(),
            regions = generated.graph.regions.len(),
            "starting hypergraph path solve"
        );
        match P::from_xy_connections(&generated.graph, &connections, path_config) {
            Ok(path_solver) => self.path_solver = Some(path_solver),
            Err(err) => {
                self.state.fail(err);
                return;
            }
        }
        self.jumper_graph = Some(generated);
    }

    /// Every jumper location of the grid as a physical jumper, pads tagged
    /// with the connections routed through them. Jumpers no route uses are
    /// dropped.
    pub fn output_jumpers(&self) -> Vec<SrjJumper> {
        let Some(jumper_graph) = &self.jumper_graph else {
            return Vec::new();
        };

        let mut pad_usage: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for route in &self.solved_routes {
            for jumper in &route.jumpers {
                for position in [jumper.start, jumper.end] {
                    let connected = pad_usage.entry(pad_key(&position)).or_default();
                    if let Some(root) = &route.root_connection_name {
                        connected.insert(root.clone());
                    }
                    connected.insert(route.connection_name.clone());
                }
            }
        }

        let dims = JumperFootprint::F1206x4Pair.dimensions();
        let graph = &jumper_graph.graph;
        jumper_graph
            .jumper_locations
            .iter()
            .enumerate()
            .filter_map(|(index, location)| {
                let pads: Vec<Obstacle> = location
                    .pad_regions
                    .iter()
                    .map(|region| {
                        let region = &graph.regions[*region];
                        Obstacle {
                            obstacle_id: Some(region.region_id.clone()),
                            center: region.center,
                            width: region.bounds.width(),
                            height: region.bounds.height(),
                            layers: vec!["top".to_string()],
                            connected_to: pad_usage
                                .get(&pad_key(&region.center))
                                .map(|names| names.iter().cloned().collect())
                                .unwrap_or_default(),
                            off_board_connects_to: Vec::new(),
                        }
                    })
                    .collect();
                if pads.iter().all(|pad| pad.connected_to.is_empty()) {
                    return None;
                }
                let (width, height) = match location.orientation {
                    JumperOrientation::Horizontal => (dims.length, dims.width),
                    JumperOrientation::Vertical => (dims.width, dims.length),
                };
                Some(SrjJumper {
                    jumper_id: format!("{}_jumper_{index}", self.node.node_id),
                    center: location.center,
                    orientation: location.orientation,
                    width,
                    height,
                    pads,
                })
            })
            .collect()
    }
}

impl<P: GraphPathSolver, G: JumperGridGenerator> Solver for HyperGraphJumperRouter<P, G> {
    fn state(&self) -> &SolverState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SolverState {
        &mut self.state
    }

    fn step_once(&mut self) {
        if self.path_solver.is_none() {
            self.initialize();
            if self.state.is_finished() {
                return;
            }
        }
        let Some(path_solver) = self.path_solver.as_mut() else {
            self.state
                .fail(RouterError::Uninitialized("hypergraph path solver was not built".to_string()));
            return;
        };

        path_solver.step();

        if path_solver.state().solved() {
            let mut routes = solved_routes_to_traces(
                path_solver.graph(),
                path_solver.solved_routes(),
                &self.node,
                self.config.trace_width,
                self.config.region_offset,
            );
            add_midpoints_for_collinear_overlaps(&mut routes, self.config.overlap_offset);
            tracing::info!(node = %self.node.node_id, routes = routes.len(), "hypergraph jumper routing finished");
            self.solved_routes = routes;
            self.state.succeed();
        } else if let Some(err) = path_solver.state().error() {
            let err = err.clone();
            tracing::warn!(node = %self.node.node_id, %err, "hypergraph jumper routing failed");
            self.state.fail(err);
        }
    }
}
