//! Data exchanged between the stages of the congestion-resolution layer.

use serde::{Deserialize, Serialize};

use crate::footprint::JumperFootprint;
use crate::geometry::{BoundingBox, Bounds, Point, PointLike};

pub type NodeId = String;

/// Whether a port point is a stable, addressable point on a mesh edge or one
/// created by a stage (for example on a jumper pad).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PortPointKind {
    Real { id: String },
    Synthetic,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortPoint {
    pub connection_name: String,
    #[serde(default)]
    pub root_connection_name: Option<String>,
    pub x: f64,
    pub y: f64,
    pub z: u32,
    pub kind: PortPointKind,
    /// The two mesh nodes sharing the edge this point sits on.
    #[serde(default)]
    pub connection_node_ids: Option<[NodeId; 2]>,
}

impl PortPoint {
    pub fn real(id: impl Into<String>, connection_name: impl Into<String>, x: f64, y: f64, z: u32) -> Self {
        PortPoint {
            connection_name: connection_name.into(),
            root_connection_name: None,
            x,
            y,
            z,
            kind: PortPointKind::Real { id: id.into() },
            connection_node_ids: None,
        }
    }

    pub fn synthetic(connection_name: impl Into<String>, x: f64, y: f64, z: u32) -> Self {
        PortPoint {
            connection_name: connection_name.into(),
            root_connection_name: None,
            x,
            y,
            z,
            kind: PortPointKind::Synthetic,
            connection_node_ids: None,
        }
    }

    pub fn with_root(mut self, root_connection_name: impl Into<String>) -> Self {
        self.root_connection_name = Some(root_connection_name.into());
        self
    }

    pub fn between(mut self, a: impl Into<NodeId>, b: impl Into<NodeId>) -> Self {
        self.connection_node_ids = Some([a.into(), b.into()]);
        self
    }

    pub fn id(&self) -> Option<&str> {
        match &self.kind {
            PortPointKind::Real { id } => Some(id),
            PortPointKind::Synthetic => None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.kind, PortPointKind::Synthetic)
    }

    pub fn root_name(&self) -> &str {
        self.root_connection_name.as_deref().unwrap_or(&self.connection_name)
    }
}

impl PointLike for PortPoint {
    fn x(&self) -> f64 {
        self.x
    }

    fn y(&self) -> f64 {
        self.y
    }
}

/// A rectangular routing node and the port points assigned to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeWithPortPoints {
    pub node_id: NodeId,
    pub center: Point,
    pub width: f64,
    pub height: f64,
    pub port_points: Vec<PortPoint>,
}

impl NodeWithPortPoints {
    pub fn new(node_id: impl Into<NodeId>, center: Point, width: f64, height: f64) -> Self {
        NodeWithPortPoints {
            node_id: node_id.into(),
            center,
            width,
            height,
            port_points: Vec::new(),
        }
    }

    pub fn with_port_points(mut self, port_points: Vec<PortPoint>) -> Self {
        self.port_points = port_points;
        self
    }
}

impl BoundingBox for NodeWithPortPoints {
    fn bounds(&self) -> Bounds {
        Bounds::from_center(self.center, self.width, self.height)
    }
}

/// One step of a connection's solved path through the capacity mesh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathCandidate {
    pub current_node_id: NodeId,
    /// Node hopped over when the move into `current_node_id` went off-board.
    #[serde(default)]
    pub through_node_id: Option<NodeId>,
    pub point: Point,
    pub z: u32,
    #[serde(default)]
    pub last_move_was_off_board: bool,
    #[serde(default)]
    pub port_point_id: Option<String>,
}

impl PathCandidate {
    pub fn new(current_node_id: impl Into<NodeId>, point: Point, z: u32) -> Self {
        PathCandidate {
            current_node_id: current_node_id.into(),
            through_node_id: None,
            point,
            z,
            last_move_was_off_board: false,
            port_point_id: None,
        }
    }

    pub fn with_port_point(mut self, port_point_id: impl Into<String>) -> Self {
        self.port_point_id = Some(port_point_id.into());
        self
    }

    pub fn off_board_through(mut self, through_node_id: impl Into<NodeId>) -> Self {
        self.through_node_id = Some(through_node_id.into());
        self.last_move_was_off_board = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPathResult {
    pub connection_name: String,
    #[serde(default)]
    pub root_connection_name: Option<String>,
    /// The connection's true terminal nodes.
    pub node_ids: [NodeId; 2],
    #[serde(default)]
    pub path: Option<Vec<PathCandidate>>,
}

impl ConnectionPathResult {
    pub fn root_name(&self) -> &str {
        self.root_connection_name.as_deref().unwrap_or(&self.connection_name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    #[serde(default)]
    pub obstacle_id: Option<String>,
    pub center: Point,
    pub width: f64,
    pub height: f64,
    pub layers: Vec<String>,
    #[serde(default)]
    pub connected_to: Vec<String>,
    #[serde(default)]
    pub off_board_connects_to: Vec<String>,
}

impl BoundingBox for Obstacle {
    fn bounds(&self) -> Bounds {
        Bounds::from_center(self.center, self.width, self.height)
    }
}

/// A candidate jumper placed before routing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrepatternJumper {
    pub jumper_id: String,
    pub start: Point,
    pub end: Point,
    pub footprint: JumperFootprint,
    pub off_board_connection_id: String,
}

/// A jumper used by a routed connection, start and end on the pad centers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Jumper {
    pub start: Point,
    pub end: Point,
    pub footprint: JumperFootprint,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub x: f64,
    pub y: f64,
    pub z: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub inside_jumper_pad: bool,
}

impl RoutePoint {
    pub fn new(x: f64, y: f64, z: u32) -> Self {
        RoutePoint {
            x,
            y,
            z,
            inside_jumper_pad: false,
        }
    }
}

impl PointLike for RoutePoint {
    fn x(&self) -> f64 {
        self.x
    }

    fn y(&self) -> f64 {
        self.y
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighDensityIntraNodeRouteWithJumpers {
    pub connection_name: String,
    pub root_connection_name: Option<String>,
    pub trace_thickness: f64,
    pub route: Vec<RoutePoint>,
    pub jumpers: Vec<Jumper>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JumperOrientation {
    Horizontal,
    Vertical,
}

/// A finalized physical jumper component with its pads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SrjJumper {
    pub jumper_id: String,
    pub center: Point,
    pub orientation: JumperOrientation,
    pub width: f64,
    pub height: f64,
    pub pads: Vec<Obstacle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_point_kind_serializes_tagged() {
        let pp = PortPoint::real("pp1", "net1", 1.0, 2.0, 0);
        let value = serde_json::to_value(&pp).unwrap();
        assert_eq!(value["kind"]["kind"], "real");
        assert_eq!(value["kind"]["id"], "pp1");
        assert_eq!(pp.id(), Some("pp1"));
        assert!(PortPoint::synthetic("net1", 0.0, 0.0, 0).is_synthetic());
    }

    #[test]
    fn root_name_falls_back_to_connection_name() {
        let pp = PortPoint::real("pp1", "net1_a", 0.0, 0.0, 0);
        assert_eq!(pp.root_name(), "net1_a");
        assert_eq!(pp.with_root("net1").root_name(), "net1");
    }
}
