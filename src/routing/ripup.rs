use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::Rng;

use super::types::{GraphConnection, HyperGraph};

/// Seed derived from the routing problem so reruns on the same input agree.
pub(crate) fn routing_seed(graph: &HyperGraph, connections: &[GraphConnection]) -> u64 {
    let mut hasher = DefaultHasher::new();
    graph.regions.len().hash(&mut hasher);
    graph.ports.len().hash(&mut hasher);
    connections.len().hash(&mut hasher);
    for connection in connections {
        connection.connection_id.hash(&mut hasher);
        for port in [connection.start_port, connection.end_port] {
            let position = graph.ports[port].position;
            position.x.to_bits().hash(&mut hasher);
            position.y.to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}

/// Connection indices, longest span first, with a little seeded noise so
/// similar connections do not always route in the same order.
pub(crate) fn order_connections_by_difficulty<R: Rng + ?Sized>(
    graph: &HyperGraph,
    connections: &[GraphConnection],
    rng: &mut R,
) -> Vec<usize> {
    let mut scored: Vec<(i64, usize)> = connections
        .iter()
        .enumerate()
        .map(|(index, connection)| {
            let start = graph.ports[connection.start_port].position;
            let end = graph.ports[connection.end_port].position;
            let span = ((start.x - end.x).abs() + (start.y - end.y).abs()) * 10.0;
            let noise: i64 = rng.gen_range(0..=10);
            (-(span.round() as i64) + noise, index)
        })
        .collect();
    scored.sort_by_key(|(score, _)| *score);
    scored.into_iter().map(|(_, index)| index).collect()
}

/// Queue after a failed connection: it goes first, the rest keep their order.
pub(crate) fn requeue_failed_first(order: &[usize], failed: usize) -> Vec<usize> {
    std::iter::once(failed)
        .chain(order.iter().copied().filter(|index| *index != failed))
        .collect()
}
