use std::fs;

use serde_json::json;

use super::types::HyperGraph;

/// Env var naming the file a routing trace is written to.
pub const TRACE_ENV_VAR: &str = "JUMPER_ROUTING_TRACE_JSON";

/// Per-iteration log of a path solve, written as JSON when the solve ends.
#[derive(Debug)]
pub(crate) struct RoutingTrace {
    path: String,
    layout: serde_json::Value,
    iterations: Vec<serde_json::Value>,
}

pub(crate) fn build_trace_layout_data(graph: &HyperGraph) -> serde_json::Value {
    let regions: Vec<serde_json::Value> = graph
        .regions
        .iter()
        .map(|region| {
            json!({
                "id": region.region_id,
                "kind": region.kind,
                "center": { "x": region.center.x, "y": region.center.y },
                "bounds": region.bounds,
            })
        })
        .collect();
    let ports: Vec<serde_json::Value> = graph
        .ports
        .iter()
        .map(|port| {
            json!({
                "id": port.port_id,
                "x": port.position.x,
                "y": port.position.y,
                "region1": graph.regions[port.region1].region_id,
                "region2": port.region2.map(|region| graph.regions[region].region_id.clone()),
            })
        })
        .collect();
    json!({ "regions": regions, "ports": ports })
}

impl RoutingTrace {
    pub fn from_env(graph: &HyperGraph) -> Option<Self> {
        let path = std::env::var(TRACE_ENV_VAR).ok()?;
        Some(RoutingTrace {
            path,
            layout: build_trace_layout_data(graph),
            iterations: Vec::new(),
        })
    }

    pub fn record_iteration(
        &mut self,
        iteration: usize,
        routed: Option<serde_json::Value>,
        ripped_up: &[String],
        queued: &[String],
    ) {
        self.iterations.push(json!({
            "iteration": iteration,
            "routed_connection": routed,
            "ripped_up": ripped_up,
            "queued_next": queued,
        }));
    }

    pub fn write(&self, outcome: &str) {
        let trace_json = json!({
            "layout": self.layout,
            "iterations": self.iterations,
            "outcome": outcome,
        });
        let result = serde_json::to_string_pretty(&trace_json)
            .map_err(|err| err.to_string())
            .and_then(|serialized| fs::write(&self.path, serialized).map_err(|err| err.to_string()));
        if let Err(err) = result {
            tracing::warn!(path = %self.path, %err, "failed to write routing trace");
        }
    }
}
