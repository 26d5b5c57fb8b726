use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::analysis::{compute_section_score, node_probability_of_failure, FailureConfig};
use crate::graph::{AdjacencyIndex, CapacityMeshEdge, CapacityMeshNode};
use crate::solver::{input_seed, Solver, SolverState};
use crate::types::{ConnectionPathResult, NodeId, NodeWithPortPoints, PortPoint};

use super::create::{create_port_point_section, PortPointSection, SectionInput};

/// Scores must improve by more than this to commit a re-assignment.
const MIN_IMPROVEMENT: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    pub expansion_degrees: usize,
    pub max_iterations: usize,
    pub max_candidates_per_section: usize,
    pub seed: Option<u64>,
    pub failure: FailureConfig,
}

impl Default for SectionConfig {
    fn default() -> Self {
        SectionConfig {
            expansion_degrees: 3,
            max_iterations: 10_000,
            max_candidates_per_section: 64,
            seed: None,
            failure: FailureConfig::default(),
        }
    }
}

/// Two real port points on the same mesh edge and layer whose connections
/// trade places.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortPointSwap {
    pub first: String,
    pub second: String,
}

/// Visits congested nodes worst first and re-assigns port points inside the
/// section around each one while its log-probability score improves.
pub struct SectionOptimizer {
    state: SolverState,
    config: SectionConfig,
    nodes: Vec<NodeWithPortPoints>,
    mesh_nodes: IndexMap<NodeId, CapacityMeshNode>,
    mesh_edges: Vec<CapacityMeshEdge>,
    adjacency: AdjacencyIndex,
    connection_results: Vec<ConnectionPathResult>,
    queue: VecDeque<NodeId>,
    committed: Vec<PortPointSwap>,
}

impl SectionOptimizer {
    pub fn new(
        nodes: Vec<NodeWithPortPoints>,
        mesh_nodes: &[CapacityMeshNode],
        mesh_edges: &[CapacityMeshEdge],
        connection_results: Vec<ConnectionPathResult>,
        config: SectionConfig,
    ) -> Self {
        let adjacency = AdjacencyIndex::from_mesh(mesh_nodes, mesh_edges);
        let mesh_nodes: IndexMap<NodeId, CapacityMeshNode> =
            mesh_nodes.iter().map(|node| (node.id.clone(), node.clone())).collect();

        let seed = config.seed.unwrap_or_else(|| {
            let keys: Vec<&str> = nodes.iter().map(|node| node.node_id.as_str()).collect();
            input_seed(&keys)
        });
        let mut rng = StdRng::seed_from_u64(seed);

        let mut congested: Vec<(f64, NodeId)> = nodes
            .iter()
            .filter(|node| mesh_nodes.get(&node.node_id).is_some_and(|mesh| !mesh.contains_target))
            .map(|node| (node_probability_of_failure(node, &config.failure), node.node_id.clone()))
            .filter(|(pf, _)| *pf > 0.0)
            .collect();
        congested.shuffle(&mut rng);
        congested.sort_by(|a, b| b.0.total_cmp(&a.0));

        SectionOptimizer {
            state: SolverState::new(config.max_iterations),
            nodes,
            mesh_nodes,
            mesh_edges: mesh_edges.to_vec(),
            adjacency,
            connection_results,
            queue: congested.into_iter().map(|(_, id)| id).collect(),
            committed: Vec::new(),
            config,
        }
    }

    pub fn nodes(&self) -> &[NodeWithPortPoints] {
        &self.nodes
    }

    pub fn connection_results(&self) -> &[ConnectionPathResult] {
        &self.connection_results
    }

    pub fn committed_swaps(&self) -> &[PortPointSwap] {
        &self.committed
    }

    pub fn into_parts(self) -> (Vec<NodeWithPortPoints>, Vec<ConnectionPathResult>) {
        (self.nodes, self.connection_results)
    }

    /// Score of the whole assignment over every non-target node.
    pub fn total_score(&self) -> f64 {
        compute_section_score(&self.nodes, &self.mesh_nodes, &self.config.failure)
    }

    fn section(&self, center: &str) -> PortPointSection {
        let input = SectionInput {
            input_nodes: &self.nodes,
            mesh_nodes: &self.mesh_nodes,
            mesh_edges: &self.mesh_edges,
            adjacency: &self.adjacency,
            connection_results: &self.connection_results,
        };
        create_port_point_section(input, center, self.config.expansion_degrees)
    }

    fn best_swap(&self, section: &PortPointSection) -> Option<(PortPointSwap, f64)> {
        let current = compute_section_score(&section.input_nodes, &self.mesh_nodes, &self.config.failure);
        let mut best: Option<(PortPointSwap, f64)> = None;

        for swap in swap_candidates(section, self.config.max_candidates_per_section) {
            let mut candidate_nodes = section.input_nodes.clone();
            apply_swap(&mut candidate_nodes, &swap);
            let score = compute_section_score(&candidate_nodes, &self.mesh_nodes, &self.config.failure);
            let threshold = best.as_ref().map_or(current, |(_, best_score)| *best_score);
            if score > threshold + MIN_IMPROVEMENT {
                best = Some((swap, score));
            }
        }

        best
    }

    fn commit(&mut self, swap: PortPointSwap) {
        let positions: IndexMap<String, PortPoint> = self
            .nodes
            .iter()
            .flat_map(|node| node.port_points.iter())
            .filter_map(|pp| {
                let id = pp.id()?;
                (id == swap.first || id == swap.second).then(|| (id.to_string(), pp.clone()))
            })
            .collect();
        let (Some(first), Some(second)) = (positions.get(&swap.first), positions.get(&swap.second)) else {
            return;
        };

        for result in &mut self.connection_results {
            let Some(path) = result.path.as_mut() else {
                continue;
            };
            for candidate in path.iter_mut() {
                let Some(id) = candidate.port_point_id.as_deref() else {
                    continue;
                };
                let replacement = if id == swap.first && result.connection_name == first.connection_name {
                    second
                } else if id == swap.second && result.connection_name == second.connection_name {
                    first
                } else {
                    continue;
                };
                candidate.port_point_id = replacement.id().map(str::to_string);
                candidate.point.x = replacement.x;
                candidate.point.y = replacement.y;
            }
        }

        apply_swap(&mut self.nodes, &swap);
        self.committed.push(swap);
    }
}

/// Pairs of real port points on the same internal edge and layer owned by
/// different connections, where at least one of the two lies on a path cut
/// into the section.
pub fn swap_candidates(section: &PortPointSection, limit: usize) -> Vec<PortPointSwap> {
    let routed: IndexSet<&str> = section
        .section_paths
        .iter()
        .flat_map(|path| path.points.iter())
        .filter_map(|point| point.port_point_id.as_deref())
        .collect();

    let mut groups: IndexMap<(NodeId, NodeId, u32), IndexMap<String, String>> = IndexMap::new();
    for node in &section.input_nodes {
        for pp in &node.port_points {
            let (Some(id), Some([a, b])) = (pp.id(), pp.connection_node_ids.as_ref()) else {
                continue;
            };
            if !section.node_ids.contains(a) || !section.node_ids.contains(b) {
                continue;
            }
            let key = if a <= b {
                (a.clone(), b.clone(), pp.z)
            } else {
                (b.clone(), a.clone(), pp.z)
            };
            groups
                .entry(key)
                .or_default()
                .insert(id.to_string(), pp.connection_name.clone());
        }
    }

    let mut candidates = Vec::new();
    for members in groups.values() {
        let members: Vec<(&String, &String)> = members.iter().collect();
        for (i, (first, first_connection)) in members.iter().enumerate() {
            for (second, second_connection) in &members[i + 1..] {
                if first_connection == second_connection
                    || !(routed.contains(first.as_str()) || routed.contains(second.as_str()))
                {
                    continue;
                }
                if candidates.len() >= limit {
                    return candidates;
                }
                candidates.push(PortPointSwap {
                    first: (*first).clone(),
                    second: (*second).clone(),
                });
            }
        }
    }
    candidates
}

/// Exchanges the owning connections of the two port points everywhere they appear.
pub fn apply_swap(nodes: &mut [NodeWithPortPoints], swap: &PortPointSwap) {
    let owner = |id: &str| {
        nodes
            .iter()
            .flat_map(|node| node.port_points.iter())
            .find(|pp| pp.id() == Some(id))
            .map(|pp| (pp.connection_name.clone(), pp.root_connection_name.clone()))
    };
    let (Some(first_owner), Some(second_owner)) = (owner(&swap.first), owner(&swap.second)) else {
        return;
    };

    for node in nodes.iter_mut() {
        for pp in &mut node.port_points {
            let (name, root) = match pp.id() {
                Some(id) if id == swap.first => &second_owner,
                Some(id) if id == swap.second => &first_owner,
                _ => continue,
            };
            pp.connection_name = name.clone();
            pp.root_connection_name = root.clone();
        }
    }
}

impl Solver for SectionOptimizer {
    fn state(&self) -> &SolverState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SolverState {
        &mut self.state
    }

    fn step_once(&mut self) {
        let Some(center) = self.queue.pop_front() else {
            tracing::info!(swaps = self.committed.len(), "section optimization finished");
            self.state.succeed();
            return;
        };

        let section = self.section(&center);
        if let Some((swap, score)) = self.best_swap(&section) {
            tracing::debug!(center = %center, first = %swap.first, second = %swap.second, score, "committing swap");
            self.commit(swap);
            self.queue.push_back(center);
        }
    }
}
