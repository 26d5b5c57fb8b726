//! Ordered congestion-resolution stages over immutable snapshots.

use serde::{Deserialize, Serialize};

use crate::error::RouterError;
use crate::graph::{CapacityMeshEdge, CapacityMeshNode};
use crate::jumpers::{apply_jumper_pad_port_points, classify_jumper_usage, JumperUsage, JumperUsageInput};
use crate::routing::{HyperGraphJumperRouter, HyperGraphRouterConfig};
use crate::section::{SectionConfig, SectionOptimizer};
use crate::solver::Solver;
use crate::types::{
    ConnectionPathResult, HighDensityIntraNodeRouteWithJumpers, NodeId, NodeWithPortPoints, Obstacle,
    PrepatternJumper, SrjJumper,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub section: SectionConfig,
    pub router: HyperGraphRouterConfig,
}

/// Everything a stage reads and the snapshot it hands to the next one.
#[derive(Clone, Debug, Default)]
pub struct PipelineState {
    pub config: PipelineConfig,
    pub mesh_nodes: Vec<CapacityMeshNode>,
    pub mesh_edges: Vec<CapacityMeshEdge>,
    pub nodes: Vec<NodeWithPortPoints>,
    pub connection_results: Vec<ConnectionPathResult>,
    pub prepattern_jumpers: Vec<PrepatternJumper>,
    pub obstacles: Vec<Obstacle>,
    /// Nodes routed through a tiled jumper grid.
    pub jumper_node_ids: Vec<NodeId>,
    pub jumper_usage: Option<JumperUsage>,
    pub routes: Vec<HighDensityIntraNodeRouteWithJumpers>,
    pub jumpers: Vec<SrjJumper>,
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("stage \"{stage}\" failed: {source}")]
pub struct StageFailure {
    pub stage: &'static str,
    #[source]
    pub source: RouterError,
}

#[derive(Clone, Copy)]
pub struct StageDescriptor {
    pub name: &'static str,
    pub run: fn(&PipelineState) -> Result<PipelineState, StageFailure>,
}

pub const STAGES: [StageDescriptor; 3] = [
    StageDescriptor {
        name: "optimize_sections",
        run: optimize_sections,
    },
    StageDescriptor {
        name: "classify_jumpers",
        run: classify_jumpers,
    },
    StageDescriptor {
        name: "route_jumper_nodes",
        run: route_jumper_nodes,
    },
];

fn optimize_sections(state: &PipelineState) -> Result<PipelineState, StageFailure> {
    let mut optimizer = SectionOptimizer::new(
        state.nodes.clone(),
        &state.mesh_nodes,
        &state.mesh_edges,
        state.connection_results.clone(),
        state.config.section.clone(),
    );
    optimizer.solve().map_err(|source| StageFailure {
        stage: "optimize_sections",
        source,
    })?;
    let (nodes, connection_results) = optimizer.into_parts();
    Ok(PipelineState {
        nodes,
        connection_results,
        ..state.clone()
    })
}

fn classify_jumpers(state: &PipelineState) -> Result<PipelineState, StageFailure> {
    if state.prepattern_jumpers.is_empty() {
        return Ok(state.clone());
    }
    let usage = classify_jumper_usage(JumperUsageInput {
        connection_results: &state.connection_results,
        mesh_nodes: &state.mesh_nodes,
        prepattern_jumpers: &state.prepattern_jumpers,
        obstacles: &state.obstacles,
    });
    let nodes = apply_jumper_pad_port_points(&usage, &state.mesh_nodes, &state.nodes);
    Ok(PipelineState {
        nodes,
        jumper_usage: Some(usage),
        ..state.clone()
    })
}

fn route_jumper_nodes(state: &PipelineState) -> Result<PipelineState, StageFailure> {
    let mut routes = state.routes.clone();
    let mut jumpers = state.jumpers.clone();

    for node_id in &state.jumper_node_ids {
        let node = state
            .nodes
            .iter()
            .find(|node| &node.node_id == node_id)
            .ok_or_else(|| StageFailure {
                stage: "route_jumper_nodes",
                source: RouterError::Uninitialized(format!("unknown jumper node \"{node_id}\"")),
            })?;
        let mut router = HyperGraphJumperRouter::new(node.clone(), state.config.router);
        router.solve().map_err(|source| StageFailure {
            stage: "route_jumper_nodes",
            source,
        })?;
        routes.extend_from_slice(router.output());
        jumpers.extend(router.output_jumpers());
    }

    Ok(PipelineState {
        routes,
        jumpers,
        ..state.clone()
    })
}

/// Runs every stage in order, stopping at the first failure.
#[tracing::instrument(skip_all)]
pub fn run_pipeline(initial: PipelineState) -> Result<PipelineState, StageFailure> {
    STAGES.iter().try_fold(initial, |state, stage| {
        tracing::info!(stage = stage.name, "running stage");
        (stage.run)(&state)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_run_in_order() {
        let names: Vec<&str> = STAGES.iter().map(|stage| stage.name).collect();
        assert_eq!(names, ["optimize_sections", "classify_jumpers", "route_jumper_nodes"]);
    }

    #[test]
    fn empty_input_passes_through() {
        let result = run_pipeline(PipelineState::default()).unwrap();
        assert!(result.nodes.is_empty());
        assert!(result.routes.is_empty());
        assert!(result.jumper_usage.is_none());
    }

    #[test]
    fn unknown_jumper_node_fails_its_stage() {
        let state = PipelineState {
            jumper_node_ids: vec!["missing".into()],
            ..PipelineState::default()
        };
        let failure = run_pipeline(state).unwrap_err();
        assert_eq!(failure.stage, "route_jumper_nodes");
        assert!(failure.to_string().contains("missing"));
    }
}
