use hashbrown::HashSet;

use crate::footprint::JumperFootprint;
use crate::geometry::Point;
use crate::types::{HighDensityIntraNodeRouteWithJumpers, Jumper, NodeWithPortPoints, RoutePoint};

use super::types::{HyperGraph, Port, RegionId, SolvedRoute};

fn offset_towards(base: Point, target: Point, distance: f64) -> Point {
    match (target - base).normalized() {
        Some(direction) => base + direction * distance,
        None => base,
    }
}

/// Route points for one crossed port: the port itself for a terminal,
/// otherwise one point pushed into each adjacent region, the region the
/// route came from first.
fn region_offset_points(graph: &HyperGraph, port: &Port, came_from: Option<RegionId>, distance: f64) -> Vec<RoutePoint> {
    let region1 = &graph.regions[port.region1];
    let Some(region2_id) = port.region2 else {
        let mut point = RoutePoint::new(port.position.x, port.position.y, 0);
        point.inside_jumper_pad = region1.is_pad();
        return vec![point];
    };
    let region2 = &graph.regions[region2_id];
    let inside_jumper_pad = region1.is_pad() || region2.is_pad();

    let toward_1 = offset_towards(port.position, region1.center, distance);
    let toward_2 = offset_towards(port.position, region2.center, distance);
    let ordered = if came_from == Some(port.region1) {
        [toward_1, toward_2]
    } else {
        [toward_2, toward_1]
    };
    ordered
        .into_iter()
        .map(|point| RoutePoint {
            x: point.x,
            y: point.y,
            z: 0,
            inside_jumper_pad,
        })
        .collect()
}

fn through_jumper(graph: &HyperGraph, region: RegionId) -> Jumper {
    let region = &graph.regions[region];
    let bounds = region.bounds;
    let (start, end) = if bounds.width() > bounds.height() {
        (
            Point::new(bounds.min_x, region.center.y),
            Point::new(bounds.max_x, region.center.y),
        )
    } else {
        (
            Point::new(region.center.x, bounds.min_y),
            Point::new(region.center.x, bounds.max_y),
        )
    };
    Jumper {
        start,
        end,
        footprint: JumperFootprint::F1206x4Pair,
    }
}

/// Turns graph routes into trace polylines. Each physical jumper is emitted
/// once, on the first route that crosses it.
pub(crate) fn solved_routes_to_traces(
    graph: &HyperGraph,
    solved_routes: &[SolvedRoute],
    node: &NodeWithPortPoints,
    trace_width: f64,
    region_offset: f64,
) -> Vec<HighDensityIntraNodeRouteWithJumpers> {
    let mut used_through_jumpers: HashSet<RegionId> = HashSet::new();

    solved_routes
        .iter()
        .map(|solved| {
            let connection_name = solved.connection.connection_id.clone();
            let mut route = Vec::new();
            let mut jumpers = Vec::new();

            for step in &solved.path {
                let port = &graph.ports[step.port];
                route.extend(region_offset_points(graph, port, step.last_region, region_offset));

                if let Some(region) = step.last_region {
                    if graph.regions[region].is_through_jumper() && used_through_jumpers.insert(region) {
                        jumpers.push(through_jumper(graph, region));
                    }
                }
            }

            let root_connection_name = node
                .port_points
                .iter()
                .find(|pp| pp.connection_name == connection_name)
                .and_then(|pp| pp.root_connection_name.clone());

            HighDensityIntraNodeRouteWithJumpers {
                connection_name,
                root_connection_name,
                trace_thickness: trace_width,
                route,
                jumpers,
            }
        })
        .collect()
}
