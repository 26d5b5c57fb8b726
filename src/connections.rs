//! Resolves each connection's endpoints to terminal mesh nodes.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};
use crate::geometry::Point;
use crate::graph::CapacityMeshNode;
use crate::types::{ConnectionPathResult, NodeId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub name: String,
    #[serde(default)]
    pub root_connection_name: Option<String>,
    pub points_to_connect: Vec<Point>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionWithNodes {
    pub result: ConnectionPathResult,
    /// One goal node per connection point, in point order.
    pub goal_node_ids: Vec<NodeId>,
    pub straight_line_distance: f64,
}

fn closest_target<'a>(nodes: &'a [CapacityMeshNode], point: &Point) -> Option<&'a CapacityMeshNode> {
    nodes
        .iter()
        .filter(|node| node.contains_target)
        .min_by(|a, b| a.center.distance_sq(point).total_cmp(&b.center.distance_sq(point)))
        .or_else(|| nodes.first())
}

/// Maps every connection point to the nearest target-bearing node. The
/// first and last of those become the connection's terminal nodes.
pub fn connections_with_nodes(
    connections: &[Connection],
    nodes: &[CapacityMeshNode],
) -> Result<Vec<ConnectionWithNodes>> {
    connections
        .iter()
        .map(|connection| {
            let goals: Vec<&CapacityMeshNode> = connection
                .points_to_connect
                .iter()
                .filter_map(|point| closest_target(nodes, point))
                .collect();

            let (first, last) = match goals.as_slice() {
                [first, .., last] => (*first, *last),
                _ => {
                    return Err(RouterError::InsufficientEndpoints {
                        connection: connection.name.clone(),
                        found: goals.len(),
                    })
                }
            };

            Ok(ConnectionWithNodes {
                result: ConnectionPathResult {
                    connection_name: connection.name.clone(),
                    root_connection_name: connection.root_connection_name.clone(),
                    node_ids: [first.id.clone(), last.id.clone()],
                    path: None,
                },
                goal_node_ids: goals.iter().map(|node| node.id.clone()).collect(),
                straight_line_distance: first.center.distance(&last.center),
            })
        })
        .collect()
}

/// Reproducible reordering of connections for a given seed.
pub fn shuffle_connections<T>(items: &mut [T], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
}
