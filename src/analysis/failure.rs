use serde::{Deserialize, Serialize};

use indexmap::IndexMap;

use crate::graph::CapacityMeshNode;
use crate::types::{NodeId, NodeWithPortPoints};

use super::crossings::intra_node_crossings;

/// Upper clamp on a node's probability of failure, keeps `ln(1 - pf)` finite.
pub const NODE_MAX_PF: f64 = 0.99999;

/// How crossings inside a node translate into a probability of failure.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum FailureModel {
    /// Crossings are resolved by jumpers, each absorbing `crossings_per_jumper`
    /// crossings; capacity is how many jumper footprints tile the node.
    CapacityBased {
        crossings_per_jumper: f64,
        jumper_width: f64,
        jumper_height: f64,
    },
    /// Crossings compete for area: `pf = k² / (w * h * density)`.
    AreaDensity { density: f64 },
}

impl Default for FailureModel {
    fn default() -> Self {
        FailureModel::CapacityBased {
            crossings_per_jumper: 7.0,
            jumper_width: 5.0,
            jumper_height: 5.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureConfig {
    pub model: FailureModel,
    pub node_max_pf: f64,
}

impl Default for FailureConfig {
    fn default() -> Self {
        FailureConfig {
            model: FailureModel::default(),
            node_max_pf: NODE_MAX_PF,
        }
    }
}

fn ratio_or_saturate(demand: f64, capacity: f64) -> f64 {
    if capacity <= 0.0 {
        return if demand > 0.0 { 1.0 } else { 0.0 };
    }
    (demand / capacity).min(1.0)
}

impl FailureModel {
    /// Unclamped probability of failure for a `width` x `height` node with `crossings` crossings.
    pub fn raw_probability(&self, width: f64, height: f64, crossings: usize) -> f64 {
        let k = crossings as f64;
        match *self {
            FailureModel::CapacityBased {
                crossings_per_jumper,
                jumper_width,
                jumper_height,
            } => {
                let jumpers_required = (k / crossings_per_jumper).ceil();
                let capacity = (width / jumper_width).floor() * (height / jumper_height).floor();
                ratio_or_saturate(jumpers_required, capacity)
            }
            FailureModel::AreaDensity { density } => ratio_or_saturate(k * k, width * height * density),
        }
    }
}

pub fn probability_of_failure(width: f64, height: f64, crossings: usize, config: &FailureConfig) -> f64 {
    config
        .model
        .raw_probability(width, height, crossings)
        .clamp(0.0, config.node_max_pf)
}

/// Probability of failure of a node given its current port point assignment.
pub fn node_probability_of_failure(node: &NodeWithPortPoints, config: &FailureConfig) -> f64 {
    let crossings = intra_node_crossings(node);
    probability_of_failure(node.width, node.height, crossings.num_same_layer_crossings, config)
}

/// Log-probability of success summed over scored nodes. Nodes containing a
/// routing target, or unknown to the mesh, are skipped. Higher is better.
pub fn compute_section_score(
    nodes: &[NodeWithPortPoints],
    mesh_nodes: &IndexMap<NodeId, CapacityMeshNode>,
    config: &FailureConfig,
) -> f64 {
    nodes
        .iter()
        .filter(|node| {
            mesh_nodes
                .get(&node.node_id)
                .is_some_and(|mesh_node| !mesh_node.contains_target)
        })
        .map(|node| (1.0 - node_probability_of_failure(node, config)).ln())
        .sum()
}
