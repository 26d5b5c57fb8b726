use crate::geometry::{segment_crossing_point, PointLike};
use crate::types::RoutePoint;

/// First crossing between two non-adjacent same-layer segments, as
/// `(first segment, second segment, crossing point)`.
fn first_self_crossing(route: &[RoutePoint]) -> Option<(usize, usize, RoutePoint)> {
    for i in 0..route.len().saturating_sub(1) {
        let (a1, a2) = (&route[i], &route[i + 1]);
        if a1.z != a2.z {
            continue;
        }
        for j in i + 2..route.len() - 1 {
            let (b1, b2) = (&route[j], &route[j + 1]);
            if b1.z != b2.z || b1.z != a1.z {
                continue;
            }
            if let Some(point) = segment_crossing_point(&a1.as_point(), &a2.as_point(), &b1.as_point(), &b2.as_point()) {
                return Some((i, j, RoutePoint::new(point.x, point.y, a1.z)));
            }
        }
    }
    None
}

/// Cuts every loop out of a route: where the route crosses itself, the part
/// between the two crossing segments is replaced by the crossing point.
pub fn remove_self_intersections(route: &[RoutePoint]) -> Vec<RoutePoint> {
    let mut result = route.to_vec();
    if result.len() < 4 {
        return result;
    }
    while let Some((i, j, crossing)) = first_self_crossing(&result) {
        result.splice(i + 1..=j, [crossing]);
    }
    result
}
