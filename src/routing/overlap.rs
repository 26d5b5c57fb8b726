use std::collections::BTreeMap;

use crate::geometry::{direction, Point, PointLike, Segment};
use crate::types::{HighDensityIntraNodeRouteWithJumpers, RoutePoint};

const COLLINEAR_EPSILON: f64 = 1e-6;
const OVERLAP_EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug)]
struct RouteSegment {
    route: usize,
    index: usize,
    segment: Segment,
    inside_jumper_pad: bool,
}

impl RouteSegment {
    /// Same route and the same or a neighbouring segment.
    fn is_near(&self, route: usize, index: usize) -> bool {
        self.route == route && self.index.abs_diff(index) <= 1
    }
}

fn route_segments(routes: &[HighDensityIntraNodeRouteWithJumpers]) -> Vec<RouteSegment> {
    routes
        .iter()
        .enumerate()
        .flat_map(|(route, trace)| {
            trace.route.windows(2).enumerate().map(move |(index, pair)| RouteSegment {
                route,
                index,
                segment: Segment::new(pair[0].as_point(), pair[1].as_point()),
                inside_jumper_pad: pair[0].inside_jumper_pad && pair[1].inside_jumper_pad,
            })
        })
        .collect()
}

fn are_collinear(a: &Segment, b: &Segment) -> bool {
    let length = a.length();
    if length < COLLINEAR_EPSILON {
        return false;
    }
    direction(&a.start, &a.end, &b.start).abs() / length < COLLINEAR_EPSILON
        && direction(&a.start, &a.end, &b.end).abs() / length < COLLINEAR_EPSILON
}

/// For two collinear segments that share more than a point, the outer one:
/// the segment containing the other, else the longer.
fn outer_of_overlap<'a>(a: &'a RouteSegment, b: &'a RouteSegment) -> Option<&'a RouteSegment> {
    let length_a = a.segment.length();
    let axis = (a.segment.end - a.segment.start).normalized()?;
    let project = |point: Point| {
        let offset = point - a.segment.start;
        offset.x * axis.x + offset.y * axis.y
    };
    let t1 = project(b.segment.start);
    let t2 = project(b.segment.end);
    let (b_min, b_max) = (t1.min(t2), t1.max(t2));

    if b_max.min(length_a) - b_min.max(0.0) <= OVERLAP_EPSILON {
        return None;
    }

    let b_inside_a = b_min >= -OVERLAP_EPSILON && b_max <= length_a + OVERLAP_EPSILON;
    let a_inside_b = b_min <= OVERLAP_EPSILON && b_max >= length_a - OVERLAP_EPSILON;
    if b_inside_a {
        Some(a)
    } else if a_inside_b || b_max - b_min > length_a {
        Some(b)
    } else {
        Some(a)
    }
}

fn offset_midpoint(segment: &Segment, offset: f64) -> Option<Point> {
    let normal = (segment.end - segment.start).normalized()?.perpendicular();
    Some(segment.start.midpoint(&segment.end) + normal * offset)
}

/// Pushes a midpoint off every segment that collinearly overlaps another,
/// so downstream relaxation routes the outer trace around the inner one.
///
/// Covers overlaps between different routes and a route doubling back on
/// itself. A midpoint is only added when neither new half crosses an
/// existing segment or a half added earlier, and never inside jumper pads.
pub fn add_midpoints_for_collinear_overlaps(routes: &mut [HighDensityIntraNodeRouteWithJumpers], offset: f64) {
    let segments = route_segments(routes);
    let mut insertions: BTreeMap<(usize, usize), Point> = BTreeMap::new();
    let mut added: Vec<(usize, usize, Segment)> = Vec::new();

    for (i, first) in segments.iter().enumerate() {
        for second in &segments[i + 1..] {
            if first.is_near(second.route, second.index) {
                continue;
            }
            if !are_collinear(&first.segment, &second.segment) {
                continue;
            }
            let Some(outer) = outer_of_overlap(first, second) else {
                continue;
            };
            if outer.inside_jumper_pad || insertions.contains_key(&(outer.route, outer.index)) {
                continue;
            }
            let Some(midpoint) = offset_midpoint(&outer.segment, offset) else {
                continue;
            };

            let halves = [
                Segment::new(outer.segment.start, midpoint),
                Segment::new(midpoint, outer.segment.end),
            ];
            let crosses_existing = segments
                .iter()
                .filter(|other| !other.is_near(outer.route, outer.index))
                .any(|other| halves.iter().any(|half| half.intersects(&other.segment)));
            let crosses_added = added
                .iter()
                .filter(|(route, index, _)| !(*route == outer.route && index.abs_diff(outer.index) <= 1))
                .any(|(_, _, other)| halves.iter().any(|half| half.intersects(other)));
            if crosses_existing || crosses_added {
                tracing::debug!(route = outer.route, segment = outer.index, "skipping overlap midpoint, would cross");
                continue;
            }

            insertions.insert((outer.route, outer.index), midpoint);
            added.extend(halves.map(|half| (outer.route, outer.index, half)));
        }
    }

    for ((route, index), midpoint) in insertions.into_iter().rev() {
        routes[route].route.insert(index + 1, RoutePoint::new(midpoint.x, midpoint.y, 0));
    }
}
