use crate::geometry::{BoundingBox, Point, PointLike, Segment};

/// Edges of a rectangular obstacle: top, right, bottom, left.
pub fn obstacle_to_segments(obstacle: &impl BoundingBox) -> [Segment; 4] {
    let bounds = obstacle.bounds();
    let top_left = Point::new(bounds.min_x, bounds.max_y);
    let top_right = Point::new(bounds.max_x, bounds.max_y);
    let bottom_right = Point::new(bounds.max_x, bounds.min_y);
    let bottom_left = Point::new(bounds.min_x, bounds.min_y);
    [
        Segment::new(top_left, top_right),
        Segment::new(top_right, bottom_right),
        Segment::new(bottom_right, bottom_left),
        Segment::new(bottom_left, top_left),
    ]
}

/// Left and right edges of a trace segment of the given width. Empty for a
/// zero-length segment.
pub fn trace_segment_to_outline_segments(start: &Point, end: &Point, trace_width: f64) -> Vec<Segment> {
    let Some(direction) = (*end - *start).normalized() else {
        return Vec::new();
    };
    let offset = direction.perpendicular() * (trace_width / 2.0);
    vec![
        Segment::new(*start + offset, *end + offset),
        Segment::new(*start - offset, *end - offset),
    ]
}

pub fn route_to_outline_segments<P: PointLike>(route: &[P], trace_width: f64) -> Vec<Segment> {
    route
        .windows(2)
        .flat_map(|pair| trace_segment_to_outline_segments(&pair[0].as_point(), &pair[1].as_point(), trace_width))
        .collect()
}

/// Outline segments of only the route segments within `search_radius` (plus
/// the trace width) of `point`.
pub fn route_to_outline_segments_near_point<P: PointLike>(
    route: &[P],
    trace_width: f64,
    point: &Point,
    search_radius: f64,
) -> Vec<Segment> {
    route
        .windows(2)
        .map(|pair| Segment::new(pair[0].as_point(), pair[1].as_point()))
        .filter(|segment| segment.distance_to(point) <= search_radius + trace_width)
        .flat_map(|segment| trace_segment_to_outline_segments(&segment.start, &segment.end, trace_width))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Obstacle, RoutePoint};

    #[test]
    fn obstacle_edges_run_clockwise_from_top_left() {
        let obstacle = Obstacle {
            obstacle_id: None,
            center: Point::new(1.0, 1.0),
            width: 2.0,
            height: 4.0,
            layers: vec!["top".into()],
            connected_to: Vec::new(),
            off_board_connects_to: Vec::new(),
        };
        let [top, right, bottom, left] = obstacle_to_segments(&obstacle);
        assert_eq!(top, Segment::new(Point::new(0.0, 3.0), Point::new(2.0, 3.0)));
        assert_eq!(right.end, Point::new(2.0, -1.0));
        assert_eq!(bottom.end, Point::new(0.0, -1.0));
        assert_eq!(left.end, top.start);
    }

    #[test]
    fn trace_outline_is_offset_by_half_the_width() {
        let outline = trace_segment_to_outline_segments(&Point::new(0.0, 0.0), &Point::new(2.0, 0.0), 0.2);
        assert_eq!(outline.len(), 2);
        assert!(outline[0].start.approx_eq(&Point::new(0.0, 0.1), 1e-12));
        assert!(outline[1].end.approx_eq(&Point::new(2.0, -0.1), 1e-12));
        assert!(trace_segment_to_outline_segments(&Point::new(1.0, 1.0), &Point::new(1.0, 1.0), 0.2).is_empty());
    }

    #[test]
    fn only_nearby_route_segments_are_outlined() {
        let route = [
            RoutePoint::new(0.0, 0.0, 0),
            RoutePoint::new(1.0, 0.0, 0),
            RoutePoint::new(10.0, 0.0, 0),
            RoutePoint::new(10.0, 10.0, 0),
        ];
        assert_eq!(route_to_outline_segments(&route, 0.1).len(), 6);
        let near = route_to_outline_segments_near_point(&route, 0.1, &Point::new(0.5, 0.5), 1.0);
        assert_eq!(near.len(), 4);
    }
}
