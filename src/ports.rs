//! Even re-spacing of the port points along a node's sides.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, Bounds};
use crate::types::{NodeWithPortPoints, PortPoint};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    /// The side nearest to `(x, y)`. Ties go top, right, bottom, left.
    pub fn nearest(x: f64, y: f64, bounds: &Bounds) -> Side {
        [
            (Side::Top, (bounds.max_y - y).abs()),
            (Side::Right, (bounds.max_x - x).abs()),
            (Side::Bottom, (y - bounds.min_y).abs()),
            (Side::Left, (x - bounds.min_x).abs()),
        ]
        .into_iter()
        .fold((Side::Top, f64::INFINITY), |best, (side, d)| if d < best.1 { (side, d) } else { best })
        .0
    }

    fn is_horizontal(self) -> bool {
        matches!(self, Side::Top | Side::Bottom)
    }
}

/// Spreads the points of one side evenly along it, per layer. Relative order
/// along the side is preserved so no new crossings appear.
pub fn redistribute_port_points_on_side(side: Side, port_points: &[PortPoint], bounds: &Bounds) -> Vec<PortPoint> {
    let mut by_layer: BTreeMap<u32, Vec<&PortPoint>> = BTreeMap::new();
    for pp in port_points {
        by_layer.entry(pp.z).or_default().push(pp);
    }

    let side_length = if side.is_horizontal() {
        bounds.width()
    } else {
        bounds.height()
    };

    let mut redistributed = Vec::with_capacity(port_points.len());
    for mut layer in by_layer.into_values() {
        if side.is_horizontal() {
            layer.sort_by(|a, b| a.x.total_cmp(&b.x));
        } else {
            layer.sort_by(|a, b| a.y.total_cmp(&b.y));
        }
        let count = layer.len() as f64;
        for (i, pp) in layer.into_iter().enumerate() {
            let offset = side_length * (2.0 * i as f64 + 1.0) / (2.0 * count);
            let (x, y) = match side {
                Side::Top => (bounds.min_x + offset, bounds.max_y),
                Side::Bottom => (bounds.min_x + offset, bounds.min_y),
                Side::Left => (bounds.min_x, bounds.min_y + offset),
                Side::Right => (bounds.max_x, bounds.min_y + offset),
            };
            redistributed.push(PortPoint { x, y, ..pp.clone() });
        }
    }
    redistributed
}

/// Assigns every port point to its nearest side and redistributes each side.
pub fn redistribute_node_port_points(node: &NodeWithPortPoints) -> NodeWithPortPoints {
    let bounds = node.bounds();
    let mut by_side: IndexMap<Side, Vec<PortPoint>> = IndexMap::new();
    for pp in &node.port_points {
        by_side
            .entry(Side::nearest(pp.x, pp.y, &bounds))
            .or_default()
            .push(pp.clone());
    }
    let port_points = by_side
        .iter()
        .flat_map(|(side, points)| redistribute_port_points_on_side(*side, points, &bounds))
        .collect();
    NodeWithPortPoints {
        port_points,
        ..node.clone()
    }
}
