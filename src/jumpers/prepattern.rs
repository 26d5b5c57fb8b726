use serde::{Deserialize, Serialize};

use crate::footprint::JumperFootprint;
use crate::geometry::{Bounds, Point};
use crate::types::{JumperOrientation, NodeWithPortPoints, Obstacle, PrepatternJumper};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlternatingGridConfig {
    pub footprint: JumperFootprint,
    /// Orientation of the jumper in the first grid cell.
    pub first_orientation: JumperOrientation,
    pub trace_width: f64,
    /// Keep-in distance from the node border.
    pub padding: f64,
    /// Spacing added to the jumper length to form a grid cell.
    pub margin: f64,
}

impl Default for AlternatingGridConfig {
    fn default() -> Self {
        AlternatingGridConfig {
            footprint: JumperFootprint::F0603,
            first_orientation: JumperOrientation::Horizontal,
            trace_width: 0.15,
            padding: 0.8,
            margin: 0.6,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PrepatternResult {
    pub prepattern_jumpers: Vec<PrepatternJumper>,
    pub jumper_pad_obstacles: Vec<Obstacle>,
}

fn pad_obstacles(jumper: &PrepatternJumper) -> [Obstacle; 2] {
    let dims = jumper.footprint.dimensions();
    let delta = jumper.end - jumper.start;
    let (width, height) = if delta.x.abs() > delta.y.abs() {
        (dims.pad_length, dims.pad_width)
    } else {
        (dims.pad_width, dims.pad_length)
    };
    let pad = |suffix: &str, center: Point| Obstacle {
        obstacle_id: Some(format!("{}_pad_{suffix}", jumper.jumper_id)),
        center,
        width,
        height,
        layers: vec!["top".to_string()],
        connected_to: Vec::new(),
        off_board_connects_to: vec![jumper.off_board_connection_id.clone()],
    };
    [pad("start", jumper.start), pad("end", jumper.end)]
}

/// Checkerboard of horizontal and vertical candidate jumpers filling the node.
///
/// Cells whose jumper would land on an existing port point are left empty.
/// Every jumper gets its own off-board connection id, shared by its two pads.
pub fn alternating_grid(node: &NodeWithPortPoints, config: &AlternatingGridConfig) -> PrepatternResult {
    let bounds = Bounds::from_center(
        node.center,
        node.width - 2.0 * config.padding,
        node.height - 2.0 * config.padding,
    );
    let dims = config.footprint.dimensions();
    let length = dims.length;
    let cell = length + config.margin;

    let cols = (bounds.width() / cell).floor().max(0.0) as usize;
    let rows = (bounds.height() / cell).floor().max(0.0) as usize;
    let offset_x = (bounds.width() - cols as f64 * cell) / 2.0;
    let offset_y = (bounds.height() - rows as f64 * cell) / 2.0;

    let clearance = dims.width / 2.0 + config.trace_width * 2.0;
    let near_port_point = |p: &Point| {
        node.port_points
            .iter()
            .any(|pp| Point::new(pp.x, pp.y).distance(p) < clearance)
    };
    let in_bounds = |p: &Point| p.x >= bounds.min_x && p.x <= bounds.max_x && p.y >= bounds.min_y && p.y <= bounds.max_y;

    let mut result = PrepatternResult::default();
    for row in 0..rows {
        for col in 0..cols {
            let center = Point::new(
                bounds.min_x + offset_x + cell / 2.0 + col as f64 * cell,
                bounds.min_y + offset_y + cell / 2.0 + row as f64 * cell,
            );
            let checker = (row + col) % 2 == 1;
            let vertical = match config.first_orientation {
                JumperOrientation::Horizontal => checker,
                JumperOrientation::Vertical => !checker,
            };
            let half = if vertical {
                Point::new(0.0, length / 2.0)
            } else {
                Point::new(length / 2.0, 0.0)
            };
            let (start, end) = (center - half, center + half);

            if !in_bounds(&start) || !in_bounds(&end) || near_port_point(&start) || near_port_point(&end) {
                continue;
            }

            let index = result.prepattern_jumpers.len();
            let jumper = PrepatternJumper {
                jumper_id: format!("jumper_{index}"),
                start,
                end,
                footprint: config.footprint,
                off_board_connection_id: format!("jumper_conn_{index}"),
            };
            result.jumper_pad_obstacles.extend(pad_obstacles(&jumper));
            result.prepattern_jumpers.push(jumper);
        }
    }

    tracing::debug!(
        node = %node.node_id,
        jumpers = result.prepattern_jumpers.len(),
        "placed alternating grid"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PortPoint;

    fn node() -> NodeWithPortPoints {
        NodeWithPortPoints::new("n", Point::new(0.0, 0.0), 12.0, 12.0)
    }

    #[test]
    fn fills_node_with_checkerboard() {
        let result = alternating_grid(&node(), &AlternatingGridConfig::default());
        assert_eq!(result.prepattern_jumpers.len(), 16);
        assert_eq!(result.jumper_pad_obstacles.len(), 32);

        let first = &result.prepattern_jumpers[0];
        assert_eq!(first.start.y, first.end.y);
        let second = &result.prepattern_jumpers[1];
        assert_eq!(second.start.x, second.end.x);
        assert!(second.start.y < second.end.y);
    }

    #[test]
    fn pads_share_the_jumper_connection() {
        let result = alternating_grid(&node(), &AlternatingGridConfig::default());
        let [start, end] = [&result.jumper_pad_obstacles[0], &result.jumper_pad_obstacles[1]];
        assert_eq!(start.obstacle_id.as_deref(), Some("jumper_0_pad_start"));
        assert_eq!(end.obstacle_id.as_deref(), Some("jumper_0_pad_end"));
        assert_eq!(start.off_board_connects_to, vec!["jumper_conn_0".to_string()]);
        assert_eq!((start.width, start.height), (0.8, 0.95));

        let vertical_pad = &result.jumper_pad_obstacles[2];
        assert_eq!((vertical_pad.width, vertical_pad.height), (0.95, 0.8));
    }

    #[test]
    fn vertical_first_flips_the_pattern() {
        let config = AlternatingGridConfig {
            first_orientation: JumperOrientation::Vertical,
            ..AlternatingGridConfig::default()
        };
        let result = alternating_grid(&node(), &config);
        let first = &result.prepattern_jumpers[0];
        assert_eq!(first.start.x, first.end.x);
    }

    #[test]
    fn skips_jumpers_on_port_points() {
        // Start pad of the first cell's horizontal jumper.
        let node = node().with_port_points(vec![PortPoint::real("pp", "net", -4.2, -3.375, 0)]);
        let result = alternating_grid(&node, &AlternatingGridConfig::default());
        assert_eq!(result.prepattern_jumpers.len(), 15);
        let first = &result.prepattern_jumpers[0];
        assert_eq!(first.jumper_id, "jumper_0");
        assert_eq!(first.start.x, first.end.x);
    }

    #[test]
    fn node_smaller_than_a_cell_gets_nothing() {
        let node = NodeWithPortPoints::new("tiny", Point::new(0.0, 0.0), 2.0, 2.0);
        let result = alternating_grid(&node, &AlternatingGridConfig::default());
        assert!(result.prepattern_jumpers.is_empty());
    }
}
