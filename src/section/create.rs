use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::graph::{AdjacencyIndex, CapacityMeshEdge, CapacityMeshNode};
use crate::types::{ConnectionPathResult, NodeId, NodeWithPortPoints};

/// Everything a section is cut from. Borrowed, never mutated.
#[derive(Clone, Copy, Debug)]
pub struct SectionInput<'a> {
    pub input_nodes: &'a [NodeWithPortPoints],
    pub mesh_nodes: &'a IndexMap<NodeId, CapacityMeshNode>,
    pub mesh_edges: &'a [CapacityMeshEdge],
    pub adjacency: &'a AdjacencyIndex,
    pub connection_results: &'a [ConnectionPathResult],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectionPathPoint {
    pub x: f64,
    pub y: f64,
    pub z: u32,
    pub node_id: NodeId,
    pub port_point_id: Option<String>,
}

/// The part of one connection's path that runs through a section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectionPath {
    pub connection_name: String,
    pub root_connection_name: Option<String>,
    pub points: Vec<SectionPathPoint>,
    pub original_start_index: usize,
    pub original_end_index: usize,
    pub has_entry_from_outside: bool,
    pub has_exit_to_outside: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PortPointSection {
    pub center_node_id: NodeId,
    pub expansion_degrees: usize,
    pub node_ids: IndexSet<NodeId>,
    pub input_nodes: Vec<NodeWithPortPoints>,
    pub capacity_mesh_nodes: Vec<CapacityMeshNode>,
    pub internal_edges: Vec<CapacityMeshEdge>,
    pub boundary_edges: Vec<CapacityMeshEdge>,
    pub section_paths: Vec<SectionPath>,
}

/// Cuts the neighborhood of `center_node_id` out of the full mesh.
pub fn create_port_point_section(
    input: SectionInput<'_>,
    center_node_id: &str,
    expansion_degrees: usize,
) -> PortPointSection {
    let node_ids = input.adjacency.nodes_within(center_node_id, expansion_degrees);

    let input_nodes: Vec<NodeWithPortPoints> = input
        .input_nodes
        .iter()
        .filter(|node| node_ids.contains(&node.node_id))
        .map(|node| {
            let port_points = node
                .port_points
                .iter()
                .filter(|pp| match &pp.connection_node_ids {
                    Some([a, b]) => node_ids.contains(a) || node_ids.contains(b),
                    None => true,
                })
                .cloned()
                .collect();
            NodeWithPortPoints {
                port_points,
                ..node.clone()
            }
        })
        .collect();

    let capacity_mesh_nodes = input
        .mesh_nodes
        .values()
        .filter(|node| node_ids.contains(&node.id))
        .cloned()
        .collect();

    let mut internal_edges = Vec::new();
    let mut boundary_edges = Vec::new();
    for edge in input.mesh_edges {
        let [a, b] = &edge.node_ids;
        match (node_ids.contains(a), node_ids.contains(b)) {
            (true, true) => internal_edges.push(edge.clone()),
            (true, false) | (false, true) => boundary_edges.push(edge.clone()),
            (false, false) => {}
        }
    }

    let section_paths = cut_paths_to_section(input.connection_results, &node_ids);

    PortPointSection {
        center_node_id: center_node_id.to_string(),
        expansion_degrees,
        node_ids,
        input_nodes,
        capacity_mesh_nodes,
        internal_edges,
        boundary_edges,
        section_paths,
    }
}

/// One merged path per connection, from its first to its last in-section
/// step. The range grows to the path ends when those are the connection's
/// own terminal nodes.
pub fn cut_paths_to_section(results: &[ConnectionPathResult], node_ids: &IndexSet<NodeId>) -> Vec<SectionPath> {
    let mut section_paths = Vec::new();

    for result in results {
        let Some(path) = result.path.as_deref() else {
            continue;
        };
        let mut in_section = path
            .iter()
            .enumerate()
            .filter(|(_, candidate)| node_ids.contains(&candidate.current_node_id))
            .map(|(index, _)| index);
        let Some(first) = in_section.next() else {
            continue;
        };
        let last = in_section.last().unwrap_or(first);
        let last_path_index = path.len() - 1;

        let has_entry_from_outside = first > 0;
        let has_exit_to_outside = last < last_path_index;

        let is_terminal = |node_id: &NodeId| result.node_ids.contains(node_id);
        let start = if has_entry_from_outside && is_terminal(&path[0].current_node_id) {
            0
        } else {
            first
        };
        let end = if has_exit_to_outside && is_terminal(&path[last_path_index].current_node_id) {
            last_path_index
        } else {
            last
        };

        section_paths.push(SectionPath {
            connection_name: result.connection_name.clone(),
            root_connection_name: result.root_connection_name.clone(),
            points: path[start..=end]
                .iter()
                .map(|candidate| SectionPathPoint {
                    x: candidate.point.x,
                    y: candidate.point.y,
                    z: candidate.z,
                    node_id: candidate.current_node_id.clone(),
                    port_point_id: candidate.port_point_id.clone(),
                })
                .collect(),
            original_start_index: start,
            original_end_index: end,
            has_entry_from_outside,
            has_exit_to_outside,
        });
    }

    section_paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::types::{PathCandidate, PortPoint};

    struct Fixture {
        input_nodes: Vec<NodeWithPortPoints>,
        mesh_nodes: IndexMap<NodeId, CapacityMeshNode>,
        edges: Vec<CapacityMeshEdge>,
        adjacency: AdjacencyIndex,
        results: Vec<ConnectionPathResult>,
    }

    impl Fixture {
        /// A row of five nodes n0..n4 and one connection running end to end.
        fn row() -> Self {
            let ids: Vec<String> = (0..5).map(|i| format!("n{i}")).collect();
            let mesh: Vec<CapacityMeshNode> = ids
                .iter()
                .enumerate()
                .map(|(i, id)| CapacityMeshNode::new(id.clone(), Point::new(i as f64 * 2.0, 0.0), 2.0, 2.0))
                .collect();
            let edges: Vec<CapacityMeshEdge> = ids.windows(2).map(|w| CapacityMeshEdge::new(&w[0], &w[1])).collect();
            let adjacency = AdjacencyIndex::from_mesh(&mesh, &edges);

            let input_nodes = mesh
                .iter()
                .enumerate()
                .map(|(i, node)| {
                    let mut points = Vec::new();
                    if i > 0 {
                        points.push(
                            PortPoint::real(format!("pp{}", i - 1), "net", i as f64 * 2.0 - 1.0, 0.0, 0)
                                .between(format!("n{}", i - 1), node.id.clone()),
                        );
                    }
                    if i < 4 {
                        points.push(
                            PortPoint::real(format!("pp{i}"), "net", i as f64 * 2.0 + 1.0, 0.0, 0)
                                .between(node.id.clone(), format!("n{}", i + 1)),
                        );
                    }
                    NodeWithPortPoints::new(node.id.clone(), node.center, 2.0, 2.0).with_port_points(points)
                })
                .collect();

            let path = (0..5)
                .map(|i| PathCandidate::new(format!("n{i}"), Point::new(i as f64 * 2.0, 0.0), 0))
                .collect();
            let results = vec![ConnectionPathResult {
                connection_name: "net".into(),
                root_connection_name: None,
                node_ids: ["n0".into(), "n4".into()],
                path: Some(path),
            }];

            Fixture {
                input_nodes,
                mesh_nodes: mesh.into_iter().map(|n| (n.id.clone(), n)).collect(),
                edges,
                adjacency,
                results,
            }
        }

        /// A branching mesh with a cycle around `c`:
        /// `c - a1 - a2 - a3`, `c - b1 - b2 - b3`, plus `b2 - a2` and `a1 - d1`.
        fn branching() -> Self {
            let edges: Vec<CapacityMeshEdge> = [
                ("c", "a1"),
                ("a1", "a2"),
                ("a2", "a3"),
                ("c", "b1"),
                ("b1", "b2"),
                ("b2", "b3"),
                ("b2", "a2"),
                ("a1", "d1"),
            ]
            .into_iter()
            .map(|(a, b)| CapacityMeshEdge::new(a, b))
            .collect();
            let mesh: Vec<CapacityMeshNode> = ["c", "a1", "a2", "a3", "b1", "b2", "b3", "d1"]
                .into_iter()
                .enumerate()
                .map(|(i, id)| CapacityMeshNode::new(id, Point::new(i as f64 * 2.0, 0.0), 2.0, 2.0))
                .collect();
            let adjacency = AdjacencyIndex::from_mesh(&mesh, &edges);
            let input_nodes = mesh
                .iter()
                .map(|node| NodeWithPortPoints::new(node.id.clone(), node.center, 2.0, 2.0))
                .collect();

            Fixture {
                input_nodes,
                mesh_nodes: mesh.into_iter().map(|n| (n.id.clone(), n)).collect(),
                edges,
                adjacency,
                results: Vec::new(),
            }
        }

        fn input(&self) -> SectionInput<'_> {
            SectionInput {
                input_nodes: &self.input_nodes,
                mesh_nodes: &self.mesh_nodes,
                mesh_edges: &self.edges,
                adjacency: &self.adjacency,
                connection_results: &self.results,
            }
        }
    }

    #[test]
    fn section_is_bounded_and_connected() {
        let fixture = Fixture::row();
        let section = create_port_point_section(fixture.input(), "n2", 1);
        let ids: Vec<&str> = section.node_ids.iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["n2", "n1", "n3"]);
        for id in &section.node_ids {
            let hops = fixture.adjacency.hop_distance("n2", id).unwrap();
            assert!(hops <= 1);
        }
        assert_eq!(section.internal_edges.len(), 2);
        assert_eq!(section.boundary_edges.len(), 2);
    }

    /// Nodes reachable from the center using only the section's own edges.
    fn reachable_inside(section: &PortPointSection) -> IndexSet<NodeId> {
        let mut reached: IndexSet<NodeId> = IndexSet::new();
        reached.insert(section.center_node_id.clone());
        let mut frontier = vec![section.center_node_id.clone()];
        while let Some(node_id) = frontier.pop() {
            for edge in &section.internal_edges {
                let [a, b] = &edge.node_ids;
                let other = if a == &node_id {
                    b
                } else if b == &node_id {
                    a
                } else {
                    continue;
                };
                if reached.insert(other.clone()) {
                    frontier.push(other.clone());
                }
            }
        }
        reached
    }

    #[test]
    fn branching_section_is_internally_connected() {
        let fixture = Fixture::branching();
        let section = create_port_point_section(fixture.input(), "c", 2);

        let mut ids: Vec<&str> = section.node_ids.iter().map(String::as_str).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["a1", "a2", "b1", "b2", "c", "d1"]);

        for excluded in ["a3", "b3"] {
            assert_eq!(fixture.adjacency.hop_distance("c", excluded), Some(3));
            assert!(!section.node_ids.contains(excluded));
        }

        for edge in &section.internal_edges {
            let [a, b] = &edge.node_ids;
            assert!(fixture.adjacency.are_adjacent(a, b));
            assert!(section.node_ids.contains(a) && section.node_ids.contains(b));
        }
        // The b2 - a2 chord closes the cycle and stays internal.
        assert_eq!(section.internal_edges.len(), 6);
        assert_eq!(section.boundary_edges.len(), 2);

        let reached = reachable_inside(&section);
        assert_eq!(reached.len(), section.node_ids.len());
        assert!(section.node_ids.iter().all(|id| reached.contains(id)));
    }

    #[test]
    fn path_is_extended_to_terminal_endpoints() {
        let fixture = Fixture::row();
        let section = create_port_point_section(fixture.input(), "n2", 1);
        let path = &section.section_paths[0];
        assert!(path.has_entry_from_outside);
        assert!(path.has_exit_to_outside);
        assert_eq!(path.original_start_index, 0);
        assert_eq!(path.original_end_index, 4);
    }

    #[test]
    fn path_stays_cut_when_ends_are_not_terminals() {
        let mut fixture = Fixture::row();
        fixture.results[0].node_ids = ["elsewhere_a".into(), "elsewhere_b".into()];
        let section = create_port_point_section(fixture.input(), "n2", 1);
        let path = &section.section_paths[0];
        assert_eq!((path.original_start_index, path.original_end_index), (1, 3));
        assert_eq!(path.points.len(), 3);
        assert_eq!(path.points[0].node_id, "n1");
    }

    #[test]
    fn whole_graph_section_reproduces_path() {
        let fixture = Fixture::row();
        let section = create_port_point_section(fixture.input(), "n0", 10);
        let path = &section.section_paths[0];
        let original = fixture.results[0].path.as_ref().unwrap();
        assert!(!path.has_entry_from_outside && !path.has_exit_to_outside);
        assert_eq!(path.points.len(), original.len());
        for (cut, full) in path.points.iter().zip(original) {
            assert_eq!(cut.node_id, full.current_node_id);
            assert_eq!((cut.x, cut.y), (full.point.x, full.point.y));
        }
    }

    #[test]
    fn port_points_outside_the_section_are_dropped() {
        let mut fixture = Fixture::row();
        fixture.input_nodes[2]
            .port_points
            .push(PortPoint::real("far", "other", 4.0, 1.0, 0).between("x1", "x2"));
        let section = create_port_point_section(fixture.input(), "n2", 0);
        assert_eq!(section.input_nodes.len(), 1);
        assert_eq!(section.input_nodes[0].port_points.len(), 2);
    }
}
