use indexmap::{IndexMap, IndexSet};

use crate::connectivity::ConnectivityMap;
use crate::geometry::{segments_intersect, Point};
use crate::graph::CapacityMeshNode;
use crate::types::{ConnectionPathResult, NodeId, NodeWithPortPoints, Obstacle, PrepatternJumper};

#[derive(Clone, Copy, Debug)]
pub struct JumperUsageInput<'a> {
    pub connection_results: &'a [ConnectionPathResult],
    /// Mesh nodes; pad nodes carry `off_board_connection_id`.
    pub mesh_nodes: &'a [CapacityMeshNode],
    pub prepattern_jumpers: &'a [PrepatternJumper],
    pub obstacles: &'a [Obstacle],
}

/// Which jumper nets carry a route, and which of those another route crosses.
#[derive(Clone, Debug, Default)]
pub struct JumperUsage {
    pub off_board_conn_map: Option<ConnectivityMap>,
    /// Net id to the connections routed through the jumper.
    pub used_by: IndexMap<String, IndexSet<String>>,
    pub necessary: IndexSet<String>,
}

impl JumperUsage {
    pub fn is_used(&self, net: &str) -> bool {
        self.used_by.contains_key(net)
    }

    pub fn is_necessary(&self, net: &str) -> bool {
        self.necessary.contains(net)
    }

    pub fn used(&self) -> impl Iterator<Item = &String> {
        self.used_by.keys()
    }
}

/// Connectivity over pad obstacles and the off-board ids they bridge to.
/// `None` when no obstacle connects off-board.
pub fn off_board_connectivity(obstacles: &[Obstacle]) -> Option<ConnectivityMap> {
    let groups: Vec<Vec<String>> = obstacles
        .iter()
        .enumerate()
        .filter(|(_, obstacle)| !obstacle.off_board_connects_to.is_empty())
        .map(|(i, obstacle)| {
            let mut group = vec![obstacle.obstacle_id.clone().unwrap_or_else(|| format!("__obs{i}"))];
            group.extend(obstacle.off_board_connects_to.iter().cloned());
            group
        })
        .collect();
    if groups.is_empty() {
        return None;
    }
    Some(ConnectivityMap::from_groups(groups))
}

fn route_intersects(route: &[Point], start: &Point, end: &Point) -> bool {
    route
        .windows(2)
        .any(|segment| segments_intersect(&segment[0], &segment[1], start, end))
}

pub fn classify_jumper_usage(input: JumperUsageInput<'_>) -> JumperUsage {
    let off_board_conn_map = off_board_connectivity(input.obstacles);

    let mut jumper_geometry: IndexMap<String, (Point, Point)> = IndexMap::new();
    if let Some(conn_map) = &off_board_conn_map {
        for jumper in input.prepattern_jumpers {
            if let Some(net) = conn_map.net_connected_to_id(&jumper.off_board_connection_id) {
                jumper_geometry.insert(net.to_string(), (jumper.start, jumper.end));
            }
        }
    }

    let pad_net: IndexMap<&str, &str> = input
        .mesh_nodes
        .iter()
        .filter_map(|node| Some((node.id.as_str(), node.off_board_connection_id.as_deref()?)))
        .collect();

    let mut used_by: IndexMap<String, IndexSet<String>> = IndexMap::new();
    let mut routes: IndexMap<&str, Vec<Point>> = IndexMap::new();

    for result in input.connection_results {
        let Some(path) = &result.path else {
            continue;
        };
        let mut route = Vec::with_capacity(path.len());
        for candidate in path {
            route.push(candidate.point);

            if candidate.last_move_was_off_board {
                if let Some(net) = candidate
                    .through_node_id
                    .as_deref()
                    .and_then(|id| pad_net.get(id))
                {
                    used_by
                        .entry(net.to_string())
                        .or_default()
                        .insert(result.connection_name.clone());
                }
            }
            // Pads visited as plain waypoints still hold the route together.
            if let Some(net) = pad_net.get(candidate.current_node_id.as_str()) {
                used_by
                    .entry(net.to_string())
                    .or_default()
                    .insert(result.connection_name.clone());
            }
        }
        routes.insert(result.connection_name.as_str(), route);
    }

    let mut necessary = IndexSet::new();
    for (net, users) in &used_by {
        let Some((start, end)) = jumper_geometry.get(net) else {
            continue;
        };
        let crossed = routes
            .iter()
            .filter(|(name, _)| !users.contains(**name))
            .any(|(_, route)| route_intersects(route, start, end));
        if crossed {
            necessary.insert(net.clone());
        }
    }

    tracing::debug!(used = used_by.len(), necessary = necessary.len(), "classified jumper usage");

    JumperUsage {
        off_board_conn_map,
        used_by,
        necessary,
    }
}

/// Moves synthetic port points on jumper pads: necessary jumpers keep one
/// point per pad center, used but unnecessary jumpers collapse both pads onto
/// their midpoint. Real port points and unused jumpers are left alone.
pub fn apply_jumper_pad_port_points(
    usage: &JumperUsage,
    mesh_nodes: &[CapacityMeshNode],
    nodes: &[NodeWithPortPoints],
) -> Vec<NodeWithPortPoints> {
    let mut pads_by_net: IndexMap<&str, Vec<&CapacityMeshNode>> = IndexMap::new();
    for node in mesh_nodes {
        if let Some(net) = node.off_board_connection_id.as_deref() {
            pads_by_net.entry(net).or_default().push(node);
        }
    }

    let mut targets: IndexMap<&NodeId, Point> = IndexMap::new();
    for (net, pads) in &pads_by_net {
        if usage.is_necessary(net) {
            for pad in pads {
                targets.insert(&pad.id, pad.center);
            }
        } else if usage.is_used(net) {
            if let [first, second] = pads.as_slice() {
                let midpoint = first.center.midpoint(&second.center);
                targets.insert(&first.id, midpoint);
                targets.insert(&second.id, midpoint);
            }
        }
    }

    nodes
        .iter()
        .map(|node| {
            let mut node = node.clone();
            if let Some(target) = targets.get(&node.node_id) {
                for pp in node.port_points.iter_mut().filter(|pp| pp.is_synthetic()) {
                    pp.x = target.x;
                    pp.y = target.y;
                }
            }
            node
        })
        .collect()
}
