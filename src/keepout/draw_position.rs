use serde::{Deserialize, Serialize};

use crate::geometry::{segments_intersect, Point, Segment};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepoutConfig {
    /// Steps per side of the first pass, which stops at the keepout radius.
    pub first_pass_steps: usize,
    /// Second pass range, as a multiple of the keepout radius.
    pub search_range_factor: f64,
    /// Samples per side of the second pass.
    pub search_steps: usize,
    /// A cursor closer than this fraction of the radius to a segment is
    /// trapped and may escape across segments.
    pub trapped_fraction: f64,
    pub epsilon: f64,
}

impl Default for KeepoutConfig {
    fn default() -> Self {
        KeepoutConfig {
            first_pass_steps: 20,
            search_range_factor: 1.5,
            search_steps: 60,
            trapped_fraction: 0.15,
            epsilon: 1e-4,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DrawPositionInput<'a> {
    pub cursor: Point,
    pub last_cursor: Point,
    pub colliding_segments: &'a [Segment],
    pub keepout_radius: f64,
}

#[derive(Clone, Copy, Debug)]
struct Sample {
    position: Point,
    clearance: f64,
    path_clear: bool,
    index: i64,
}

fn min_clearance(position: &Point, segments: &[Segment]) -> f64 {
    segments
        .iter()
        .map(|segment| segment.distance_to(position))
        .fold(f64::INFINITY, f64::min)
}

fn is_path_clear(from: &Point, to: &Point, segments: &[Segment]) -> bool {
    !segments
        .iter()
        .any(|segment| segments_intersect(from, to, &segment.start, &segment.end))
}

/// First local maximum of clearance walking away from `center` in each
/// direction, as `(positive side, negative side)`.
fn nearest_local_maxima(samples: &[&Sample]) -> (Option<Sample>, Option<Sample>) {
    if samples.is_empty() {
        return (None, None);
    }
    let center = samples
        .iter()
        .position(|sample| sample.index == 0)
        .unwrap_or(samples.len() / 2);
    let is_peak = |i: usize| {
        samples[i].clearance >= samples[i - 1].clearance && samples[i].clearance >= samples[i + 1].clearance
    };

    let positive = (center + 1..samples.len().saturating_sub(1))
        .find(|i| is_peak(*i))
        .map(|i| *samples[i]);
    let negative = (1..center).rev().find(|i| is_peak(*i)).map(|i| *samples[i]);
    (positive, negative)
}

/// First sample with the highest clearance.
fn best_clearance<'a>(candidates: impl IntoIterator<Item = &'a Sample>) -> Option<&'a Sample> {
    candidates.into_iter().fold(None, |best: Option<&Sample>, sample| match best {
        Some(current) if sample.clearance <= current.clearance => Some(current),
        _ => Some(sample),
    })
}

/// Corrects a drawn point so it keeps `keepout_radius` from every colliding
/// segment.
///
/// The returned position lies on the barrier line, the line through the
/// cursor perpendicular to the drawing direction. `None` means the cursor
/// needs no correction or no meaningful move was found.
pub fn compute_draw_position(input: &DrawPositionInput<'_>, config: &KeepoutConfig) -> Option<Point> {
    let segments = input.colliding_segments;
    if segments.is_empty() {
        return None;
    }
    let cursor = input.cursor;
    let radius = input.keepout_radius;

    let trace_direction = (cursor - input.last_cursor)
        .normalized()
        .filter(|_| cursor.distance(&input.last_cursor) > config.epsilon)
        .unwrap_or(Point::new(1.0, 0.0));
    let barrier = trace_direction.perpendicular();

    let cursor_clearance = min_clearance(&cursor, segments);
    if cursor_clearance >= radius {
        return None;
    }

    let first_pass_steps = config.first_pass_steps.max(1);
    for i in 1..=first_pass_steps {
        let distance = i as f64 / first_pass_steps as f64 * radius;
        let plus = cursor + barrier * distance;
        let minus = cursor + barrier * -distance;
        let clearance_plus = min_clearance(&plus, segments);
        let clearance_minus = min_clearance(&minus, segments);
        let valid_plus = clearance_plus >= radius && is_path_clear(&cursor, &plus, segments);
        let valid_minus = clearance_minus >= radius && is_path_clear(&cursor, &minus, segments);

        match (valid_plus, valid_minus) {
            (true, true) if clearance_plus >= clearance_minus => return Some(plus),
            (true, true) => return Some(minus),
            (true, false) => return Some(plus),
            (false, true) => return Some(minus),
            (false, false) => {}
        }
    }

    let range = radius * config.search_range_factor;
    let steps = config.search_steps.max(1) as i64;
    let samples: Vec<Sample> = (-steps..=steps)
        .map(|index| {
            let position = cursor + barrier * (index as f64 / steps as f64 * range);
            Sample {
                position,
                clearance: min_clearance(&position, segments),
                path_clear: is_path_clear(&cursor, &position, segments),
                index,
            }
        })
        .collect();

    let all: Vec<&Sample> = samples.iter().collect();
    let reachable: Vec<&Sample> = samples.iter().filter(|sample| sample.path_clear).collect();
    let (positive_max, negative_max) = nearest_local_maxima(&all);
    let (reachable_positive, reachable_negative) = nearest_local_maxima(&reachable);
    let center = samples.iter().find(|sample| sample.index == 0).copied();

    let mut candidates: Vec<Sample> = Vec::new();
    for candidate in [positive_max, negative_max, reachable_positive, reachable_negative, center]
        .into_iter()
        .flatten()
    {
        if !candidates.iter().any(|existing| existing.index == candidate.index) {
            candidates.push(candidate);
        }
    }

    let moved = |sample: &Sample| {
        (sample.position.distance(&cursor) > config.epsilon).then_some(sample.position)
    };

    if candidates.is_empty() {
        return best_clearance(&samples).and_then(moved);
    }

    let trapped = cursor_clearance < radius * config.trapped_fraction;
    let chosen = if trapped {
        best_clearance(&candidates)
    } else {
        let reachable_candidates: Vec<&Sample> = candidates.iter().filter(|sample| sample.path_clear).collect();
        if reachable_candidates.is_empty() {
            best_clearance(&candidates)
        } else {
            best_clearance(reachable_candidates)
        }
    };
    tracing::trace!(trapped, candidates = candidates.len(), "keepout second pass");
    chosen.and_then(moved)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn seg(x1: f64, y1: f64, x2: f64, y2: f64) -> Segment {
        Segment::new(Point::new(x1, y1), Point::new(x2, y2))
    }

    fn horizontal_walls(ys: &[f64]) -> Vec<Segment> {
        ys.iter().map(|y| seg(-5.0, *y, 5.0, *y)).collect()
    }

    fn input(segments: &[Segment], radius: f64) -> DrawPositionInput<'_> {
        DrawPositionInput {
            cursor: Point::new(0.0, 0.0),
            last_cursor: Point::new(-1.0, 0.0),
            colliding_segments: segments,
            keepout_radius: radius,
        }
    }

    #[test]
    fn no_segments_or_enough_clearance_needs_no_move() {
        let config = KeepoutConfig::default();
        assert_eq!(compute_draw_position(&input(&[], 0.5), &config), None);
        let far = horizontal_walls(&[2.0]);
        assert_eq!(compute_draw_position(&input(&far, 0.5), &config), None);
    }

    #[test]
    fn first_pass_takes_the_smallest_valid_move() {
        let walls = horizontal_walls(&[0.21]);
        let result = compute_draw_position(&input(&walls, 0.5), &KeepoutConfig::default()).unwrap();
        // 0.3 below the cursor is the first step clearing 0.5 from y = 0.21.
        assert!(result.x.abs() < 1e-9);
        assert!((result.y + 0.3).abs() < 1e-9, "{result:?}");
    }

    #[rstest]
    #[case(0.15, 0.325)]
    #[case(0.05, -0.075)]
    fn trapped_cursor_may_escape_across_a_segment(#[case] trapped_fraction: f64, #[case] expected_y: f64) {
        let walls = horizontal_walls(&[0.05, 0.6, -0.2]);
        let config = KeepoutConfig {
            trapped_fraction,
            ..KeepoutConfig::default()
        };
        let result = compute_draw_position(&input(&walls, 0.5), &config).unwrap();
        assert!((result.y - expected_y).abs() < 1e-6, "{result:?}");
    }

    #[test]
    fn centers_in_the_corridor_below_the_board_edge() {
        let raw = [
            (-30.648119410807944, 19.365268037900005, -31.339441888641066, 19.365241937993876),
            (-30.6481250738466, 19.515268037793103, -31.339447551679722, 19.515241937886973),
            (-31.339233103390608, 19.3652422364854, -31.49226379520055, 19.36481044995758),
            (-31.33965633693018, 19.515241639395448, -31.49268702874012, 19.51480985286763),
            (-31.491633562420716, 19.364814876299196, -31.64724730458411, 19.36306805480202),
            (-31.493317261519955, 19.514805426526014, -31.648931003683348, 19.51305860502884),
            (-31.646443853093203, 19.363081378857284, -32.24057196914502, 19.35004464676708),
            (-31.649734455174254, 19.513045280973575, -32.243862571226074, 19.500008548883372),
            (-32.235675337789885, 19.350312455117635, -32.82960363918214, 19.29830839464428),
            (-32.24875920258121, 19.49974074053282, -32.842687503973465, 19.447736680059464),
            (-32.82674725593556, 19.298613722933897, -32.978576827928194, 19.279436663702736),
            (-32.845543887220046, 19.447431351769847, -32.99737345921268, 19.428254292538686),
            (-32.97867228823481, 19.279424668647792, -33.133105560200676, 19.26011998225321),
            (-32.997277998906064, 19.42826628759363, -33.15171127087193, 19.40896160119905),
            (-33.132343222593214, 19.26021924780367, -33.81738488591631, 19.167445656843363),
            (-33.15247360847939, 19.408862335648593, -33.83751527180249, 19.316088744688287),
            (38.0, 19.995, -38.0, 19.995),
            (38.0, 20.005, -38.0, 20.005),
        ];
        let segments: Vec<Segment> = raw.iter().map(|(x1, y1, x2, y2)| seg(*x1, *y1, *x2, *y2)).collect();
        let input = DrawPositionInput {
            cursor: Point::new(-32.044111946216205, 19.47856940245737),
            last_cursor: Point::new(-31.544120207807335, 19.475976194894795),
            colliding_segments: &segments,
            keepout_radius: 0.5,
        };

        let result = compute_draw_position(&input, &KeepoutConfig::default()).unwrap();
        assert!(result.y > 19.5 && result.y < 19.995, "{result:?}");
        assert!((result.y - (19.5 + 19.995) / 2.0).abs() < 0.15, "{result:?}");
    }

    #[test]
    fn stays_inside_a_gap_between_obstacles() {
        let mut segments = Vec::new();
        for (x0, x1) in [(29.19, 31.19), (31.73, 33.73)] {
            segments.extend([
                seg(x0, 3.54, x1, 3.54),
                seg(x1, 3.54, x1, 1.54),
                seg(x1, 1.54, x0, 1.54),
                seg(x0, 1.54, x0, 3.54),
            ]);
        }
        let cursor = Point::new(31.46, 3.159747470810159);
        let input = DrawPositionInput {
            cursor,
            last_cursor: Point::new(31.46, 2.659747470810159),
            colliding_segments: &segments,
            keepout_radius: 0.5,
        };

        if let Some(result) = compute_draw_position(&input, &KeepoutConfig::default()) {
            assert!(result.x > 31.19 && result.x < 31.73, "{result:?}");
            assert!(segments.iter().all(|segment| crate::geometry::segment_crossing_point(
                &cursor,
                &result,
                &segment.start,
                &segment.end
            )
            .is_none()));
        }
    }
}
