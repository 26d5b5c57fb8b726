use jumper_router_core::geometry::Point;
use jumper_router_core::graph::{CapacityMeshEdge, CapacityMeshNode};
use jumper_router_core::types::{NodeWithPortPoints, PortPoint};
use jumper_router_core::{run_pipeline, PipelineState, RouterError};
use rstest::{fixture, rstest};

fn jumper_node(size: f64) -> NodeWithPortPoints {
    let inset = (size / 2.0 - 1.0).min(4.0);
    NodeWithPortPoints::new("n_jump", Point::new(5.0, 5.0), size, size).with_port_points(vec![
        PortPoint::real("pp1", "conn1", 5.0 - inset, 5.0, 0).with_root("net1"),
        PortPoint::real("pp2", "conn1", 5.0 + inset, 5.0, 0).with_root("net1"),
    ])
}

fn state_for(node: NodeWithPortPoints) -> PipelineState {
    let mesh_nodes = vec![
        CapacityMeshNode::new("t1", Point::new(-2.0, 5.0), 2.0, 2.0),
        CapacityMeshNode::new("n_jump", node.center, node.width, node.height),
        CapacityMeshNode::new("t2", Point::new(12.0, 5.0), 2.0, 2.0),
    ];
    PipelineState {
        mesh_edges: vec![CapacityMeshEdge::new("t1", "n_jump"), CapacityMeshEdge::new("n_jump", "t2")],
        mesh_nodes,
        jumper_node_ids: vec![node.node_id.clone()],
        nodes: vec![node],
        ..PipelineState::default()
    }
}

#[fixture]
fn large_node_state() -> PipelineState {
    state_for(jumper_node(12.0))
}

#[rstest]
fn routes_every_jumper_node(large_node_state: PipelineState) {
    let result = run_pipeline(large_node_state.clone()).unwrap();

    assert_eq!(result.routes.len(), 1);
    let route = &result.routes[0];
    assert_eq!(route.connection_name, "conn1");
    let first = route.route.first().unwrap();
    let last = route.route.last().unwrap();
    assert_eq!((first.x, first.y), (1.0, 5.0));
    assert_eq!((last.x, last.y), (9.0, 5.0));

    // No prepattern jumpers, so classification leaves the nodes untouched.
    assert!(result.jumper_usage.is_none());
    assert_eq!(result.nodes, large_node_state.nodes);
}

#[rstest]
fn failing_stage_is_named(large_node_state: PipelineState) {
    let mut state = state_for(jumper_node(4.0));
    state.config = large_node_state.config;

    let failure = run_pipeline(state).unwrap_err();
    assert_eq!(failure.stage, "route_jumper_nodes");
    assert!(matches!(failure.source, RouterError::BoundsViolation { .. }));
    assert!(failure.to_string().starts_with("stage \"route_jumper_nodes\" failed"));
}

#[rstest]
fn snapshots_are_not_mutated(large_node_state: PipelineState) {
    let before = large_node_state.clone();
    run_pipeline(large_node_state.clone()).unwrap();
    assert_eq!(large_node_state.nodes, before.nodes);
    assert!(large_node_state.routes.is_empty());
}
