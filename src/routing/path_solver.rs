use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;

use crate::error::{Result, RouterError};
use crate::geometry::Point;
use crate::solver::{Solver, SolverState};

use super::ripup::{order_connections_by_difficulty, requeue_failed_first, routing_seed};
use super::route_single::{route_single_connection, RouteOccupancy};
use super::trace::RoutingTrace;
use super::types::{GraphConnection, HyperGraph, PathSolverConfig, RegionId, SolvedRoute, XyConnection};

/// Routes connections through a region graph.
pub trait GraphPathSolver: Solver {
    fn from_graph(graph: HyperGraph, connections: Vec<GraphConnection>, config: PathSolverConfig) -> Self
    where
        Self: Sized;

    /// Injects the connection endpoints into a copy of `base` and builds a
    /// solver over the result.
    fn from_xy_connections(base: &HyperGraph, connections: &[XyConnection], config: PathSolverConfig) -> Result<Self>
    where
        Self: Sized,
    {
        let (graph, connections) = create_graph_with_connections(base, connections)?;
        Ok(Self::from_graph(graph, connections, config))
    }

    fn graph(&self) -> &HyperGraph;

    /// Routes in connection order; complete once the solver is solved.
    fn solved_routes(&self) -> &[SolvedRoute];
}

type RegionEnvelope = GeomWithData<Rectangle<Point>, RegionId>;

fn region_tree(graph: &HyperGraph) -> RTree<RegionEnvelope> {
    let envelopes = graph
        .regions
        .iter()
        .enumerate()
        .filter(|(_, region)| !region.is_through_jumper())
        .map(|(id, region)| {
            let corner_min = Point::new(region.bounds.min_x, region.bounds.min_y);
            let corner_max = Point::new(region.bounds.max_x, region.bounds.max_y);
            GeomWithData::new(Rectangle::from_corners(corner_min, corner_max), id)
        })
        .collect();
    RTree::bulk_load(envelopes)
}

/// The smallest region containing `point`, or the nearest one.
fn terminal_region(graph: &HyperGraph, tree: &RTree<RegionEnvelope>, point: &Point) -> Option<RegionId> {
    tree.locate_all_at_point(point)
        .map(|envelope| envelope.data)
        .min_by(|a, b| {
            graph.regions[*a]
                .bounds
                .area()
                .total_cmp(&graph.regions[*b].bounds.area())
                .then(a.cmp(b))
        })
        .or_else(|| tree.nearest_neighbor(point).map(|envelope| envelope.data))
}

/// Copies `base` and injects every connection's endpoints as terminal ports.
pub fn create_graph_with_connections(
    base: &HyperGraph,
    connections: &[XyConnection],
) -> Result<(HyperGraph, Vec<GraphConnection>)> {
    let mut graph = base.clone();
    let tree = region_tree(base);
    let mut graph_connections = Vec::with_capacity(connections.len());

    for connection in connections {
        let mut terminal = |suffix: &str, point: Point| -> Result<usize> {
            let region = terminal_region(base, &tree, &point).ok_or_else(|| {
                RouterError::Uninitialized(format!(
                    "no region for terminal of connection \"{}\"",
                    connection.connection_id
                ))
            })?;
            Ok(graph.add_named_port(format!("{}_{suffix}", connection.connection_id), point, region, None))
        };
        let start_port = terminal("start", connection.start)?;
        let end_port = terminal("end", connection.end)?;
        graph_connections.push(GraphConnection {
            connection_id: connection.connection_id.clone(),
            start_port,
            end_port,
        });
    }

    Ok((graph, graph_connections))
}

/// Routes one connection per step. A connection that cannot be routed rips
/// up every route and is retried first, up to `max_rip_ups` times.
pub struct JumperGraphSolver {
    graph: HyperGraph,
    connections: Vec<GraphConnection>,
    config: PathSolverConfig,
    occupancy: RouteOccupancy,
    routes: Vec<Option<SolvedRoute>>,
    solved_routes: Vec<SolvedRoute>,
    order: Vec<usize>,
    queue: VecDeque<usize>,
    rip_ups: usize,
    rng: StdRng,
    trace: Option<RoutingTrace>,
    state: SolverState,
}

impl JumperGraphSolver {
    pub fn new(graph: HyperGraph, connections: Vec<GraphConnection>, config: PathSolverConfig) -> Self {
        let seed = config.seed.unwrap_or_else(|| routing_seed(&graph, &connections));
        let mut rng = StdRng::seed_from_u64(seed);
        let order = order_connections_by_difficulty(&graph, &connections, &mut rng);
        let trace = RoutingTrace::from_env(&graph);

        JumperGraphSolver {
            occupancy: RouteOccupancy::new(&graph),
            routes: vec![None; connections.len()],
            solved_routes: Vec::new(),
            queue: order.iter().copied().collect(),
            order,
            rip_ups: 0,
            rng,
            trace,
            state: SolverState::new(config.max_iterations),
            graph,
            connections,
            config,
        }
    }

    pub fn rip_ups(&self) -> usize {
        self.rip_ups
    }

    fn connection_names(&self, indices: impl IntoIterator<Item = usize>) -> Vec<String> {
        indices
            .into_iter()
            .map(|index| self.connections[index].connection_id.clone())
            .collect()
    }

    fn finish(&mut self) {
        self.solved_routes = self.routes.iter().flatten().cloned().collect();
        self.state.succeed();
        tracing::info!(
            routes = self.solved_routes.len(),
            rip_ups = self.rip_ups,
            "hypergraph path solve finished"
        );
        if let Some(trace) = &self.trace {
            trace.write("solved");
        }
    }
}

impl Solver for JumperGraphSolver {
    fn state(&self) -> &SolverState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SolverState {
        &mut self.state
    }

    fn step_once(&mut self) {
        let Some(index) = self.queue.pop_front() else {
            self.finish();
            return;
        };

        let (route, trace_entry) = route_single_connection(
            &self.graph,
            &self.occupancy,
            index,
            &self.connections[index],
            &self.config,
            &mut self.rng,
            self.trace.is_some(),
        );

        let mut ripped_up = Vec::new();
        match route {
            Some(route) => {
                tracing::debug!(connection = %route.connection.connection_id, ports = route.path.len(), "routed connection");
                self.occupancy.claim(&self.graph, index, &route.path);
                self.routes[index] = Some(route);
            }
            None if self.rip_ups < self.config.max_rip_ups && self.routes.iter().any(Option::is_some) => {
                self.rip_ups += 1;
                let routed: Vec<usize> = (0..self.routes.len()).filter(|i| self.routes[*i].is_some()).collect();
                ripped_up = self.connection_names(routed);
                tracing::warn!(
                    connection = %self.connections[index].connection_id,
                    rip_ups = self.rip_ups,
                    "connection blocked, ripping up all routes"
                );
                self.routes.iter_mut().for_each(|route| *route = None);
                self.occupancy.clear();
                self.order = requeue_failed_first(&self.order, index);
                self.queue = self.order.iter().copied().collect();
            }
            None => {
                let connection = self.connections[index].connection_id.clone();
                tracing::warn!(%connection, rip_ups = self.rip_ups, "giving up on connection");
                self.state.fail(RouterError::Unroutable { connection });
            }
        }

        if let Some(trace) = &mut self.trace {
            let queued: Vec<String> = self
                .queue
                .iter()
                .map(|index| self.connections[*index].connection_id.clone())
                .collect();
            trace.record_iteration(self.state.iterations, trace_entry, &ripped_up, &queued);
            if self.state.error().is_some() {
                trace.write("failed");
            }
        }

        if !self.state.is_finished() && self.queue.is_empty() {
            self.finish();
        }
    }
}

impl GraphPathSolver for JumperGraphSolver {
    fn from_graph(graph: HyperGraph, connections: Vec<GraphConnection>, config: PathSolverConfig) -> Self {
        JumperGraphSolver::new(graph, connections, config)
    }

    fn graph(&self) -> &HyperGraph {
        &self.graph
    }

    fn solved_routes(&self) -> &[SolvedRoute] {
        &self.solved_routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Bounds;
    use crate::routing::types::RegionKind;

    fn square() -> HyperGraph {
        let mut graph = HyperGraph::default();
        graph.add_region(
            "r".into(),
            RegionKind::Channel,
            Bounds::new(0.0, 0.0, 2.0, 2.0),
            Point::new(1.0, 1.0),
        );
        graph
    }

    fn connection(id: &str, start: (f64, f64), end: (f64, f64)) -> XyConnection {
        XyConnection {
            connection_id: id.into(),
            start: Point::new(start.0, start.1),
            end: Point::new(end.0, end.1),
        }
    }

    #[test]
    fn terminals_go_into_the_smallest_containing_region() {
        let mut base = square();
        let inner = base.add_region(
            "inner".into(),
            RegionKind::Channel,
            Bounds::new(0.5, 0.5, 1.0, 1.0),
            Point::new(0.75, 0.75),
        );
        let (graph, connections) =
            create_graph_with_connections(&base, &[connection("a", (0.7, 0.7), (5.0, 1.0))]).unwrap();
        let start = &graph.ports[connections[0].start_port];
        assert_eq!(start.region1, inner);
        assert_eq!(start.region2, None);
        assert_eq!(start.port_id, "a_start");
        // Outside every region, the nearest one is used.
        assert_eq!(graph.ports[connections[0].end_port].region1, 0);
    }

    #[test]
    fn nested_connections_both_route() {
        let connections = [
            connection("a", (0.0, 1.0), (1.0, 2.0)),
            connection("b", (2.0, 1.0), (1.0, 0.0)),
        ];
        let mut solver = JumperGraphSolver::from_xy_connections(&square(), &connections, PathSolverConfig::default()).unwrap();
        solver.solve().unwrap();
        let routes = solver.solved_routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].connection.connection_id, "a");
        assert_eq!(solver.rip_ups(), 0);
    }

    #[test]
    fn forced_crossing_in_one_region_is_unroutable() {
        let connections = [
            connection("a", (0.0, 1.0), (2.0, 1.0)),
            connection("b", (1.0, 0.0), (1.0, 2.0)),
        ];
        let config = PathSolverConfig {
            max_rip_ups: 3,
            ..PathSolverConfig::default()
        };
        let mut solver = JumperGraphSolver::from_xy_connections(&square(), &connections, config).unwrap();
        let err = solver.solve().unwrap_err();
        assert!(matches!(err, RouterError::Unroutable { .. }));
        assert_eq!(solver.rip_ups(), 3);
    }

    #[test]
    fn empty_graph_cannot_take_terminals() {
        let err = create_graph_with_connections(&HyperGraph::default(), &[connection("a", (0.0, 0.0), (1.0, 1.0))])
            .unwrap_err();
        assert!(matches!(err, RouterError::Uninitialized(_)));
    }
}
