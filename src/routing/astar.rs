use std::cmp::Reverse;

use hashbrown::HashMap;
use priority_queue::PriorityQueue;
use rand::seq::SliceRandom;
use rand::Rng;

use super::types::{HyperGraph, PathStep, PortId, RegionId};

/// Costs are searched in fixed point, thousandths of a millimetre.
const COST_SCALE: f64 = 1000.0;

pub(crate) fn fixed_cost(distance: f64) -> i64 {
    (distance * COST_SCALE).round() as i64
}

/// Standing on `port`, having crossed `via` to get there.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct SearchState {
    port: PortId,
    via: Option<RegionId>,
}

/// Cheapest port sequence from `start_port` to `end_port`.
///
/// `can_traverse(region, from, to)` rejects moves through a region and
/// `cost_fn(region, from, to)` prices accepted ones. Neighbor order is
/// shuffled so equal-cost alternatives vary with the seed.
pub(crate) fn route_hypergraph_astar<R, Allowed, CostFn>(
    graph: &HyperGraph,
    start_port: PortId,
    end_port: PortId,
    rng: &mut R,
    mut can_traverse: Allowed,
    mut cost_fn: CostFn,
) -> Option<Vec<PathStep>>
where
    R: Rng + ?Sized,
    Allowed: FnMut(RegionId, PortId, PortId) -> bool,
    CostFn: FnMut(RegionId, PortId, PortId) -> i64,
{
    let goal = graph.ports.get(end_port)?.position;
    graph.ports.get(start_port)?;

    if start_port == end_port {
        return Some(vec![PathStep {
            port: start_port,
            last_region: None,
        }]);
    }

    let heuristic = |port: PortId| fixed_cost(graph.ports[port].position.distance(&goal));

    let start_state = SearchState {
        port: start_port,
        via: None,
    };
    let mut open_set: PriorityQueue<SearchState, Reverse<i64>> = PriorityQueue::new();
    let mut came_from: HashMap<SearchState, SearchState> = HashMap::new();
    let mut g_score: HashMap<SearchState, i64> = HashMap::new();

    g_score.insert(start_state, 0);
    open_set.push(start_state, Reverse(heuristic(start_port)));

    let mut neighbors_buf: Vec<(RegionId, PortId)> = Vec::new();

    while let Some((current, _)) = open_set.pop() {
        if current.port == end_port {
            let mut path = vec![PathStep {
                port: current.port,
                last_region: current.via,
            }];
            let mut cursor = current;
            while let Some(prev) = came_from.get(&cursor).copied() {
                path.push(PathStep {
                    port: prev.port,
                    last_region: prev.via,
                });
                cursor = prev;
            }
            path.reverse();
            return Some(path);
        }

        let current_g = g_score.get(&current).copied().unwrap_or(i64::MAX);
        let port = &graph.ports[current.port];

        neighbors_buf.clear();
        for region in std::iter::once(port.region1).chain(port.region2) {
            if Some(region) == current.via {
                continue;
            }
            for &next in &graph.regions[region].ports {
                if next != current.port {
                    neighbors_buf.push((region, next));
                }
            }
        }
        neighbors_buf.shuffle(rng);

        for &(region, next) in &neighbors_buf {
            if !can_traverse(region, current.port, next) {
                continue;
            }
            let step_cost = cost_fn(region, current.port, next);
            let Some(tentative_g) = current_g.checked_add(step_cost) else {
                continue;
            };

            let neighbor = SearchState {
                port: next,
                via: Some(region),
            };
            if tentative_g >= g_score.get(&neighbor).copied().unwrap_or(i64::MAX) {
                continue;
            }
            came_from.insert(neighbor, current);
            g_score.insert(neighbor, tentative_g);
            let f_score = tentative_g.saturating_add(heuristic(next));
            open_set.push_increase(neighbor, Reverse(f_score));
        }
    }

    None
}
