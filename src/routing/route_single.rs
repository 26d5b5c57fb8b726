use rand::Rng;
use serde_json::json;

use crate::analysis::{chords_cross, perimeter_t};

use super::astar::{fixed_cost, route_hypergraph_astar};
use super::types::{GraphConnection, HyperGraph, PathSolverConfig, PathStep, PortId, RegionId, SolvedRoute};

/// Which connection holds each port and exclusive region, and the chords
/// already drawn through every region.
#[derive(Clone, Debug)]
pub(crate) struct RouteOccupancy {
    port_owner: Vec<Option<usize>>,
    region_owner: Vec<Option<usize>>,
    region_chords: Vec<Vec<(f64, f64)>>,
}

impl RouteOccupancy {
    pub fn new(graph: &HyperGraph) -> Self {
        RouteOccupancy {
            port_owner: vec![None; graph.ports.len()],
            region_owner: vec![None; graph.regions.len()],
            region_chords: vec![Vec::new(); graph.regions.len()],
        }
    }

    pub fn clear(&mut self) {
        self.port_owner.iter_mut().for_each(|owner| *owner = None);
        self.region_owner.iter_mut().for_each(|owner| *owner = None);
        self.region_chords.iter_mut().for_each(Vec::clear);
    }

    fn chord(graph: &HyperGraph, region: RegionId, from: PortId, to: PortId) -> (f64, f64) {
        let bounds = &graph.regions[region].bounds;
        let a = perimeter_t(&graph.ports[from].position, bounds);
        let b = perimeter_t(&graph.ports[to].position, bounds);
        (a.min(b), a.max(b))
    }

    pub fn can_traverse(&self, graph: &HyperGraph, owner: usize, region: RegionId, from: PortId, to: PortId) -> bool {
        if self.port_owner[to].is_some_and(|other| other != owner) {
            return false;
        }
        if graph.regions[region].is_exclusive() {
            return self.region_owner[region].map_or(true, |other| other == owner);
        }
        let chord = Self::chord(graph, region, from, to);
        !self.region_chords[region]
            .iter()
            .any(|existing| chords_cross(*existing, chord))
    }

    pub fn claim(&mut self, graph: &HyperGraph, owner: usize, path: &[PathStep]) {
        for step in path {
            self.port_owner[step.port] = Some(owner);
        }
        for pair in path.windows(2) {
            let Some(region) = pair[1].last_region else {
                continue;
            };
            if graph.regions[region].is_exclusive() {
                self.region_owner[region] = Some(owner);
            } else {
                let chord = Self::chord(graph, region, pair[0].port, pair[1].port);
                self.region_chords[region].push(chord);
            }
        }
    }
}

/// Routes one connection against the current occupancy. Returns the solved
/// route, plus a trace entry when tracing is on.
pub(crate) fn route_single_connection<R: Rng + ?Sized>(
    graph: &HyperGraph,
    occupancy: &RouteOccupancy,
    owner: usize,
    connection: &GraphConnection,
    config: &PathSolverConfig,
    rng: &mut R,
    trace_enabled: bool,
) -> (Option<SolvedRoute>, Option<serde_json::Value>) {
    let jumper_cost = fixed_cost(config.jumper_cost);
    let path = route_hypergraph_astar(
        graph,
        connection.start_port,
        connection.end_port,
        rng,
        |region, from, to| occupancy.can_traverse(graph, owner, region, from, to),
        |region, from, to| {
            let length = fixed_cost(graph.ports[from].position.distance(&graph.ports[to].position));
            if graph.regions[region].is_through_jumper() {
                length + jumper_cost
            } else {
                length
            }
        },
    );

    let trace_entry = trace_enabled.then(|| {
        let ports: Vec<serde_json::Value> = path
            .iter()
            .flatten()
            .map(|step| {
                let port = &graph.ports[step.port];
                json!({
                    "port_id": port.port_id,
                    "x": port.position.x,
                    "y": port.position.y,
                    "via": step.last_region.map(|region| graph.regions[region].region_id.clone()),
                })
            })
            .collect();
        json!({
            "connection_id": connection.connection_id,
            "routed": path.is_some(),
            "path": ports,
        })
    });

    let route = path.map(|path| SolvedRoute {
        connection: connection.clone(),
        path,
    });
    (route, trace_entry)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::geometry::{Bounds, Point};
    use crate::routing::types::RegionKind;

    /// One square region with terminals on all four sides.
    fn square() -> (HyperGraph, [PortId; 4]) {
        let mut graph = HyperGraph::default();
        let region = graph.add_region(
            "r".into(),
            RegionKind::Channel,
            Bounds::new(0.0, 0.0, 2.0, 2.0),
            Point::new(1.0, 1.0),
        );
        let west = graph.add_port(Point::new(0.0, 1.0), region, None);
        let east = graph.add_port(Point::new(2.0, 1.0), region, None);
        let south = graph.add_port(Point::new(1.0, 0.0), region, None);
        let north = graph.add_port(Point::new(1.0, 2.0), region, None);
        (graph, [west, east, south, north])
    }

    #[test]
    fn crossing_chord_in_a_region_is_rejected() {
        let (graph, [west, east, south, north]) = square();
        let mut occupancy = RouteOccupancy::new(&graph);
        let first = GraphConnection {
            connection_id: "a".into(),
            start_port: west,
            end_port: east,
        };
        let second = GraphConnection {
            connection_id: "b".into(),
            start_port: south,
            end_port: north,
        };
        let mut rng = StdRng::seed_from_u64(0);
        let config = PathSolverConfig::default();

        let (route, _) = route_single_connection(&graph, &occupancy, 0, &first, &config, &mut rng, false);
        occupancy.claim(&graph, 0, &route.unwrap().path);

        let (route, trace) = route_single_connection(&graph, &occupancy, 1, &second, &config, &mut rng, true);
        assert!(route.is_none());
        assert_eq!(trace.unwrap()["routed"], false);

        occupancy.clear();
        let (route, _) = route_single_connection(&graph, &occupancy, 1, &second, &config, &mut rng, false);
        assert!(route.is_some());
    }

    #[test]
    fn claimed_ports_belong_to_one_connection() {
        let (graph, [west, east, ..]) = square();
        let mut occupancy = RouteOccupancy::new(&graph);
        occupancy.claim(
            &graph,
            0,
            &[
                PathStep {
                    port: west,
                    last_region: None,
                },
                PathStep {
                    port: east,
                    last_region: Some(0),
                },
            ],
        );
        assert!(!occupancy.can_traverse(&graph, 1, 0, west, east));
        assert!(occupancy.can_traverse(&graph, 0, 0, west, east));
    }
}
