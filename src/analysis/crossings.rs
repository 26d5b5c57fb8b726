use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, Bounds, Point, EDGE_EPSILON};
use crate::types::NodeWithPortPoints;

/// Topologically forced crossings inside one node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntraNodeCrossings {
    pub num_same_layer_crossings: usize,
    pub num_entry_exit_layer_changes: usize,
    pub num_transition_pair_crossings: usize,
}

/// Maps a point to its clockwise distance along the rectangle boundary,
/// starting at the top-left corner. Points off the boundary snap to the
/// nearest edge.
pub fn perimeter_t(point: &Point, bounds: &Bounds) -> f64 {
    let w = bounds.width();
    let h = bounds.height();

    if (point.y - bounds.max_y).abs() < EDGE_EPSILON {
        return point.x - bounds.min_x;
    }
    if (point.x - bounds.max_x).abs() < EDGE_EPSILON {
        return w + (bounds.max_y - point.y);
    }
    if (point.y - bounds.min_y).abs() < EDGE_EPSILON {
        return w + h + (bounds.max_x - point.x);
    }
    if (point.x - bounds.min_x).abs() < EDGE_EPSILON {
        return 2.0 * w + h + (point.y - bounds.min_y);
    }

    let dist_top = (point.y - bounds.max_y).abs();
    let dist_right = (point.x - bounds.max_x).abs();
    let dist_bottom = (point.y - bounds.min_y).abs();
    let dist_left = (point.x - bounds.min_x).abs();
    let min_dist = dist_top.min(dist_right).min(dist_bottom).min(dist_left);

    if min_dist == dist_top {
        (point.x - bounds.min_x).clamp(0.0, w)
    } else if min_dist == dist_right {
        w + (bounds.max_y - point.y).clamp(0.0, h)
    } else if min_dist == dist_bottom {
        w + h + (bounds.max_x - point.x).clamp(0.0, w)
    } else {
        2.0 * w + h + (point.y - bounds.min_y).clamp(0.0, h)
    }
}

fn coincident(a: f64, b: f64) -> bool {
    (a - b).abs() < EDGE_EPSILON
}

fn normalize(chord: (f64, f64)) -> (f64, f64) {
    if chord.0 < chord.1 {
        chord
    } else {
        (chord.1, chord.0)
    }
}

/// Whether two perimeter chords interleave. Chords sharing an endpoint never cross.
pub fn chords_cross(first: (f64, f64), second: (f64, f64)) -> bool {
    let (a, b) = normalize(first);
    let (c, d) = normalize(second);
    if coincident(a, c) || coincident(a, d) || coincident(b, c) || coincident(b, d) {
        return false;
    }
    (a < c && c < b && b < d) || (c < a && a < d && d < b)
}

pub fn count_chord_crossings(chords: &[(f64, f64)]) -> usize {
    let mut crossings = 0;
    for (i, first) in chords.iter().enumerate() {
        for second in &chords[i + 1..] {
            if chords_cross(*first, *second) {
                crossings += 1;
            }
        }
    }
    crossings
}

pub fn intra_node_crossings(node: &NodeWithPortPoints) -> IntraNodeCrossings {
    let bounds = node.bounds();

    let mut points_by_connection: IndexMap<&str, Vec<(Point, u32)>> = IndexMap::new();
    for port_point in &node.port_points {
        let points = points_by_connection.entry(port_point.connection_name.as_str()).or_default();
        let point = Point::new(port_point.x, port_point.y);
        if !points.iter().any(|(p, z)| *p == point && *z == port_point.z) {
            points.push((point, port_point.z));
        }
    }

    let mut same_layer_chords: IndexMap<u32, Vec<(f64, f64)>> = IndexMap::new();
    let mut transition_chords: Vec<(f64, f64)> = Vec::new();

    for points in points_by_connection.values() {
        let [(p1, z1), (p2, z2), ..] = points.as_slice() else {
            continue;
        };
        let chord = (perimeter_t(p1, &bounds), perimeter_t(p2, &bounds));
        if z1 == z2 {
            same_layer_chords.entry(*z1).or_default().push(chord);
        } else {
            transition_chords.push(chord);
        }
    }

    IntraNodeCrossings {
        num_same_layer_crossings: same_layer_chords.values().map(|chords| count_chord_crossings(chords)).sum(),
        num_entry_exit_layer_changes: transition_chords.len(),
        num_transition_pair_crossings: count_chord_crossings(&transition_chords),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::types::PortPoint;

    fn unit_square() -> Bounds {
        Bounds::new(0.0, 0.0, 10.0, 10.0)
    }

    #[rstest]
    #[case::top(Point::new(3.0, 10.0), 3.0)]
    #[case::right(Point::new(10.0, 7.0), 13.0)]
    #[case::bottom(Point::new(4.0, 0.0), 26.0)]
    #[case::left(Point::new(0.0, 2.0), 32.0)]
    #[case::near_top(Point::new(3.0, 9.5), 3.0)]
    #[case::clamped(Point::new(-1.0, 9.9), 0.0)]
    fn perimeter_coordinates(#[case] point: Point, #[case] expected: f64) {
        assert!((perimeter_t(&point, &unit_square()) - expected).abs() < 1e-9);
    }

    #[test]
    fn crossing_count_ignores_orientation_and_order() {
        let chords = vec![(1.0, 5.0), (3.0, 8.0), (6.0, 9.0), (0.5, 7.0)];
        let expected = count_chord_crossings(&chords);

        let reversed: Vec<(f64, f64)> = chords.iter().map(|(a, b)| (*b, *a)).collect();
        assert_eq!(count_chord_crossings(&reversed), expected);

        let mut permuted = chords.clone();
        permuted.rotate_left(2);
        permuted.swap(0, 1);
        assert_eq!(count_chord_crossings(&permuted), expected);
    }

    #[test]
    fn shared_endpoint_never_crosses() {
        assert!(!chords_cross((1.0, 5.0), (5.0, 9.0)));
        assert!(!chords_cross((1.0, 5.0), (3.0, 1.0 + 1e-8)));
        assert!(chords_cross((1.0, 5.0), (3.0, 9.0)));
    }

    #[test]
    fn interleaving_connections_cross_once() {
        // a: left to right, b: top to bottom.
        let node = NodeWithPortPoints::new("n", Point::new(5.0, 5.0), 10.0, 10.0).with_port_points(vec![
            PortPoint::real("a1", "a", 0.0, 5.0, 0),
            PortPoint::real("a2", "a", 10.0, 5.0, 0),
            PortPoint::real("b1", "b", 5.0, 10.0, 0),
            PortPoint::real("b2", "b", 5.0, 0.0, 0),
        ]);
        let crossings = intra_node_crossings(&node);
        assert_eq!(crossings.num_same_layer_crossings, 1);
        assert_eq!(crossings.num_entry_exit_layer_changes, 0);
    }

    #[test]
    fn layer_changes_are_counted_separately() {
        let node = NodeWithPortPoints::new("n", Point::new(5.0, 5.0), 10.0, 10.0).with_port_points(vec![
            PortPoint::real("a1", "a", 0.0, 5.0, 0),
            PortPoint::real("a2", "a", 10.0, 5.0, 1),
            PortPoint::real("b1", "b", 5.0, 10.0, 1),
            PortPoint::real("b2", "b", 5.0, 0.0, 0),
            PortPoint::real("c1", "c", 5.0, 10.0, 0),
        ]);
        let crossings = intra_node_crossings(&node);
        assert_eq!(crossings.num_same_layer_crossings, 0);
        assert_eq!(crossings.num_entry_exit_layer_changes, 2);
        assert_eq!(crossings.num_transition_pair_crossings, 1);
    }

    #[test]
    fn duplicate_points_are_dropped() {
        let node = NodeWithPortPoints::new("n", Point::new(5.0, 5.0), 10.0, 10.0).with_port_points(vec![
            PortPoint::real("a1", "a", 0.0, 5.0, 0),
            PortPoint::real("a1", "a", 0.0, 5.0, 0),
            PortPoint::real("b1", "b", 5.0, 10.0, 0),
            PortPoint::real("b2", "b", 5.0, 0.0, 0),
        ]);
        assert_eq!(intra_node_crossings(&node).num_same_layer_crossings, 0);
    }
}
