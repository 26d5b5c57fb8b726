use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, Point};
use crate::types::JumperOrientation;

pub type RegionId = usize;
pub type PortId = usize;

/// Tiling of 1206x4 jumper arrays placed inside a node, as columns × rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HyperGraphPattern {
    #[default]
    #[serde(rename = "single_1206x4")]
    Single,
    #[serde(rename = "1x2_1206x4")]
    Grid1x2,
    #[serde(rename = "2x2_1206x4")]
    Grid2x2,
    #[serde(rename = "3x1_1206x4")]
    Grid3x1,
    #[serde(rename = "3x2_1206x4")]
    Grid3x2,
    #[serde(rename = "3x3_1206x4")]
    Grid3x3,
    #[serde(rename = "4x4_1206x4")]
    Grid4x4,
    #[serde(rename = "6x4_1206x4")]
    Grid6x4,
    #[serde(rename = "8x4_1206x4")]
    Grid8x4,
}

impl HyperGraphPattern {
    /// `(cols, rows)` of the array tiling.
    pub const fn dimensions(self) -> (usize, usize) {
        match self {
            HyperGraphPattern::Single => (1, 1),
            HyperGraphPattern::Grid1x2 => (1, 2),
            HyperGraphPattern::Grid2x2 => (2, 2),
            HyperGraphPattern::Grid3x1 => (3, 1),
            HyperGraphPattern::Grid3x2 => (3, 2),
            HyperGraphPattern::Grid3x3 => (3, 3),
            HyperGraphPattern::Grid4x4 => (4, 4),
            HyperGraphPattern::Grid6x4 => (6, 4),
            HyperGraphPattern::Grid8x4 => (8, 4),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    Channel,
    Pad,
    /// Free copper-less area under a jumper body, including gaps between pads.
    UnderBody,
    /// Virtual region joining the two pads of one jumper pair.
    ThroughJumper,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub region_id: String,
    pub kind: RegionKind,
    pub bounds: Bounds,
    pub center: Point,
    pub ports: Vec<PortId>,
}

impl Region {
    /// Only one connection may occupy the region at a time.
    pub fn is_exclusive(&self) -> bool {
        matches!(self.kind, RegionKind::Pad | RegionKind::ThroughJumper)
    }

    pub fn is_pad(&self) -> bool {
        self.kind == RegionKind::Pad
    }

    pub fn is_through_jumper(&self) -> bool {
        self.kind == RegionKind::ThroughJumper
    }
}

/// A crossing point between two regions. Terminal ports sit inside a single
/// region and have no `region2`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub port_id: String,
    pub position: Point,
    pub region1: RegionId,
    pub region2: Option<RegionId>,
}

impl Port {
    /// The region on the other side of the port, seen from `region`.
    pub fn other_region(&self, region: RegionId) -> Option<RegionId> {
        if self.region1 == region {
            self.region2
        } else if self.region2 == Some(region) {
            Some(self.region1)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperGraph {
    pub regions: Vec<Region>,
    pub ports: Vec<Port>,
}

impl HyperGraph {
    pub fn add_region(&mut self, region_id: String, kind: RegionKind, bounds: Bounds, center: Point) -> RegionId {
        let id = self.regions.len();
        self.regions.push(Region {
            region_id,
            kind,
            bounds,
            center,
            ports: Vec::new(),
        });
        id
    }

    pub fn add_port(&mut self, position: Point, region1: RegionId, region2: Option<RegionId>) -> PortId {
        self.add_named_port(format!("port_{}", self.ports.len()), position, region1, region2)
    }

    pub fn add_named_port(
        &mut self,
        port_id: String,
        position: Point,
        region1: RegionId,
        region2: Option<RegionId>,
    ) -> PortId {
        let id = self.ports.len();
        self.ports.push(Port {
            port_id,
            position,
            region1,
            region2,
        });
        self.regions[region1].ports.push(id);
        if let Some(region2) = region2 {
            self.regions[region2].ports.push(id);
        }
        id
    }

    /// Bounding box of all regions.
    pub fn bounds(&self) -> Option<Bounds> {
        self.regions.iter().map(|region| region.bounds).reduce(|a, b| a.union(&b))
    }
}

/// One pad pair of a placed jumper array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JumperLocation {
    pub center: Point,
    pub orientation: JumperOrientation,
    pub pad_regions: Vec<RegionId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JumperGraph {
    pub graph: HyperGraph,
    pub jumper_locations: Vec<JumperLocation>,
}

/// A connection to route between two points inside the graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct XyConnection {
    pub connection_id: String,
    pub start: Point,
    pub end: Point,
}

/// A connection whose endpoints have been injected as terminal ports.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphConnection {
    pub connection_id: String,
    pub start_port: PortId,
    pub end_port: PortId,
}

/// One port crossed by a route and the region traversed to reach it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub port: PortId,
    pub last_region: Option<RegionId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolvedRoute {
    pub connection: GraphConnection,
    pub path: Vec<PathStep>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSolverConfig {
    pub max_iterations: usize,
    /// Extra cost for hopping through a jumper, in millimetres of trace.
    pub jumper_cost: f64,
    pub max_rip_ups: usize,
    pub seed: Option<u64>,
}

impl Default for PathSolverConfig {
    fn default() -> Self {
        PathSolverConfig {
            max_iterations: 10_000,
            jumper_cost: 1.0,
            max_rip_ups: 25,
            seed: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperGraphRouterConfig {
    pub pattern: HyperGraphPattern,
    pub orientation: JumperOrientation,
    pub trace_width: f64,
    /// How far the generated graph may stick out of the node.
    pub bounds_tolerance: f64,
    /// Distance route points are pushed from a port into its regions.
    pub region_offset: f64,
    /// Sideways push of the midpoint inserted on an overlapping segment.
    pub overlap_offset: f64,
    pub outer_padding: f64,
    pub parallel_traces_under_jumper_count: usize,
    pub channel_point_count: usize,
    pub regions_between_pads: bool,
    pub path_solver: PathSolverConfig,
    pub path_solver_budget_multiplier: usize,
    pub max_iterations: usize,
}

impl Default for HyperGraphRouterConfig {
    fn default() -> Self {
        HyperGraphRouterConfig {
            pattern: HyperGraphPattern::Single,
            orientation: JumperOrientation::Vertical,
            trace_width: 0.15,
            bounds_tolerance: 0.4,
            region_offset: 0.02,
            overlap_offset: 0.5,
            outer_padding: 0.4,
            parallel_traces_under_jumper_count: 3,
            channel_point_count: 3,
            regions_between_pads: true,
            path_solver: PathSolverConfig::default(),
            path_solver_budget_multiplier: 3,
            max_iterations: 1_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_names_round_trip_through_serde() {
        let parsed: HyperGraphPattern = serde_json::from_str("\"3x2_1206x4\"").unwrap();
        assert_eq!(parsed, HyperGraphPattern::Grid3x2);
        assert_eq!(parsed.dimensions(), (3, 2));
        assert_eq!(HyperGraphPattern::default().dimensions(), (1, 1));
    }

    #[test]
    fn ports_register_with_both_regions() {
        let mut graph = HyperGraph::default();
        let a = graph.add_region("a".into(), RegionKind::Channel, Bounds::new(0.0, 0.0, 1.0, 1.0), Point::new(0.5, 0.5));
        let b = graph.add_region("b".into(), RegionKind::Pad, Bounds::new(1.0, 0.0, 2.0, 1.0), Point::new(1.5, 0.5));
        let port = graph.add_port(Point::new(1.0, 0.5), a, Some(b));
        assert_eq!(graph.regions[a].ports, vec![port]);
        assert_eq!(graph.regions[b].ports, vec![port]);
        assert_eq!(graph.ports[port].other_region(a), Some(b));
        assert_eq!(graph.ports[port].other_region(b), Some(a));
        assert_eq!(graph.bounds(), Some(Bounds::new(0.0, 0.0, 2.0, 1.0)));
    }
}
