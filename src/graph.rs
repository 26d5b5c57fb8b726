use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, Bounds, Point};
use crate::types::NodeId;

/// A node of the capacity mesh, as produced by mesh generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapacityMeshNode {
    pub id: NodeId,
    pub center: Point,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub available_z: Vec<u32>,
    #[serde(default)]
    pub contains_target: bool,
    #[serde(default)]
    pub contains_obstacle: bool,
    /// Set on nodes that sit on a jumper pad; names the pad's off-board net.
    #[serde(default)]
    pub off_board_connection_id: Option<String>,
    #[serde(default)]
    pub off_board_connected_node_ids: Vec<NodeId>,
}

impl CapacityMeshNode {
    pub fn new(id: impl Into<NodeId>, center: Point, width: f64, height: f64) -> Self {
        CapacityMeshNode {
            id: id.into(),
            center,
            width,
            height,
            available_z: vec![0],
            contains_target: false,
            contains_obstacle: false,
            off_board_connection_id: None,
            off_board_connected_node_ids: Vec::new(),
        }
    }
}

impl BoundingBox for CapacityMeshNode {
    fn bounds(&self) -> Bounds {
        Bounds::from_center(self.center, self.width, self.height)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityMeshEdge {
    pub node_ids: [NodeId; 2],
}

impl CapacityMeshEdge {
    pub fn new(a: impl Into<NodeId>, b: impl Into<NodeId>) -> Self {
        CapacityMeshEdge {
            node_ids: [a.into(), b.into()],
        }
    }
}

/// Read-only adjacency over the capacity mesh. Built once and shared by
/// section expansion and the section optimizer.
#[derive(Clone, Debug, Default)]
pub struct AdjacencyIndex {
    graph: UnGraph<NodeId, ()>,
    indices: IndexMap<NodeId, NodeIndex>,
}

impl AdjacencyIndex {
    pub fn new<'a>(
        node_ids: impl IntoIterator<Item = &'a NodeId>,
        edges: impl IntoIterator<Item = &'a CapacityMeshEdge>,
    ) -> Self {
        let mut index = AdjacencyIndex::default();
        for node_id in node_ids {
            index.ensure_node(node_id);
        }
        for edge in edges {
            let [a, b] = &edge.node_ids;
            if a == b {
                continue;
            }
            let a = index.ensure_node(a);
            let b = index.ensure_node(b);
            index.graph.update_edge(a, b, ());
        }
        index
    }

    pub fn from_mesh(nodes: &[CapacityMeshNode], edges: &[CapacityMeshEdge]) -> Self {
        AdjacencyIndex::new(nodes.iter().map(|node| &node.id), edges)
    }

    fn ensure_node(&mut self, node_id: &NodeId) -> NodeIndex {
        if let Some(index) = self.indices.get(node_id) {
            return *index;
        }
        let index = self.graph.add_node(node_id.clone());
        self.indices.insert(node_id.clone(), index);
        index
    }

    /// Neighbors in a stable order (ascending by insertion).
    pub fn neighbors(&self, node_id: &str) -> Vec<&NodeId> {
        let Some(index) = self.indices.get(node_id) else {
            return Vec::new();
        };
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors(*index).collect();
        neighbors.sort_unstable();
        neighbors.into_iter().map(|n| &self.graph[n]).collect()
    }

    pub fn are_adjacent(&self, a: &str, b: &str) -> bool {
        match (self.indices.get(a), self.indices.get(b)) {
            (Some(a), Some(b)) => self.graph.contains_edge(*a, *b),
            _ => false,
        }
    }

    /// Every node reachable from `center` in fewer than `max_depth + 1` hops,
    /// in BFS order. The center is always included even when unknown.
    pub fn nodes_within(&self, center: &str, max_depth: usize) -> IndexSet<NodeId> {
        let mut visited: IndexSet<NodeId> = IndexSet::new();
        visited.insert(center.to_string());

        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
        queue.push_back((center, 0));

        while let Some((node_id, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for neighbor in self.neighbors(node_id) {
                if visited.insert(neighbor.clone()) {
                    queue.push_back((neighbor.as_str(), depth + 1));
                }
            }
        }

        visited
    }

    /// Hop distance between two nodes, `None` when disconnected.
    pub fn hop_distance(&self, from: &str, to: &str) -> Option<usize> {
        let (Some(start), Some(goal)) = (self.indices.get(from), self.indices.get(to)) else {
            return None;
        };
        let distances = petgraph::algo::dijkstra(&self.graph, *start, Some(*goal), |_| 1usize);
        distances.get(goal).copied()
    }
}
