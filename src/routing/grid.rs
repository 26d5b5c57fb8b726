use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, Point};
use crate::types::JumperOrientation;

use super::types::{
    HyperGraph, HyperGraphPattern, HyperGraphRouterConfig, JumperGraph, JumperLocation, RegionId, RegionKind,
};

const PAIRS_PER_ARRAY: usize = 4;
const PAIR_PITCH: f64 = 0.8;
const PAD_LENGTH: f64 = 0.8;
const PAD_WIDTH: f64 = 0.5;
/// Distance from a pair's center to each of its pad centers.
const PAD_CENTER_OFFSET: f64 = 1.35;
const ARRAY_ALONG: f64 = 2.0 * (PAD_CENTER_OFFSET + PAD_LENGTH / 2.0);
const ARRAY_ACROSS: f64 = (PAIRS_PER_ARRAY - 1) as f64 * PAIR_PITCH + PAD_WIDTH;
/// Inner edge of the pad columns, measured from the array center.
const PAD_INNER_OFFSET: f64 = PAD_CENTER_OFFSET - PAD_LENGTH / 2.0;

const PARALLEL_TRACE_MIN_EDGE: f64 = 1.0;
const CHANNEL_PORT_PITCH: f64 = 0.2;
const LINE_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JumperGridParams {
    pub cols: usize,
    pub rows: usize,
    pub margin_x: f64,
    pub margin_y: f64,
    pub outer_padding_x: f64,
    pub outer_padding_y: f64,
    pub parallel_traces_under_jumper_count: usize,
    pub inner_col_channel_point_count: usize,
    pub inner_row_channel_point_count: usize,
    pub outer_channel_x_point_count: usize,
    pub outer_channel_y_point_count: usize,
    pub regions_between_pads: bool,
    pub orientation: JumperOrientation,
    pub bounds: Bounds,
}

impl JumperGridParams {
    pub fn for_pattern(
        pattern: HyperGraphPattern,
        orientation: JumperOrientation,
        bounds: Bounds,
        config: &HyperGraphRouterConfig,
    ) -> Self {
        let (cols, rows) = pattern.dimensions();
        JumperGridParams {
            cols,
            rows,
            margin_x: (cols as f64 * 0.3).max(1.2),
            margin_y: (rows as f64 * 0.3).max(1.2),
            outer_padding_x: config.outer_padding,
            outer_padding_y: config.outer_padding,
            parallel_traces_under_jumper_count: config.parallel_traces_under_jumper_count,
            inner_col_channel_point_count: config.channel_point_count,
            inner_row_channel_point_count: config.channel_point_count,
            outer_channel_x_point_count: config.channel_point_count,
            outer_channel_y_point_count: config.channel_point_count,
            regions_between_pads: config.regions_between_pads,
            orientation,
            bounds,
        }
    }

    /// `(width, height)` of one 1206x4 array.
    pub fn array_size(&self) -> (f64, f64) {
        match self.orientation {
            JumperOrientation::Horizontal => (ARRAY_ALONG, ARRAY_ACROSS),
            JumperOrientation::Vertical => (ARRAY_ACROSS, ARRAY_ALONG),
        }
    }

    /// Smallest `(width, height)` the pattern fits in.
    pub fn minimum_size(&self) -> (f64, f64) {
        let (array_w, array_h) = self.array_size();
        (
            2.0 * self.outer_padding_x + (self.cols + 1) as f64 * self.margin_x + self.cols as f64 * array_w,
            2.0 * self.outer_padding_y + (self.rows + 1) as f64 * self.margin_y + self.rows as f64 * array_h,
        )
    }
}

/// Builds the region graph for a tiling of jumper arrays.
pub trait JumperGridGenerator {
    fn generate(&self, params: &JumperGridParams) -> JumperGraph;
}

/// Rectilinear cell grid around `cols × rows` 1206x4 resistor arrays, each
/// pad pair usable as a jumper.
#[derive(Clone, Copy, Debug, Default)]
pub struct JumperX4GridGenerator;

#[derive(Clone, Copy, Debug)]
struct PadSpec {
    bounds: Bounds,
    center: Point,
}

struct ArrayLayout {
    bounds: Bounds,
    center: Point,
}

/// One axis of the layout: the start coordinate, effective outer padding and
/// the center of every array along it.
fn axis_layout(min: f64, max: f64, count: usize, outer: f64, margin: f64, array: f64) -> (f64, f64, Vec<f64>) {
    let minimum = 2.0 * outer + (count + 1) as f64 * margin + count as f64 * array;
    let total = (max - min).max(minimum);
    let start = (min + max) / 2.0 - total / 2.0;
    let outer = outer + (total - minimum) / 2.0;
    let centers = (0..count)
        .map(|i| start + outer + margin + array / 2.0 + i as f64 * (array + margin))
        .collect();
    (start, outer, centers)
}

fn along_lines(center: f64) -> [f64; 4] {
    [
        center - PAD_CENTER_OFFSET - PAD_LENGTH / 2.0,
        center - PAD_INNER_OFFSET,
        center + PAD_INNER_OFFSET,
        center + PAD_CENTER_OFFSET + PAD_LENGTH / 2.0,
    ]
}

fn pair_offsets() -> impl Iterator<Item = f64> {
    (0..PAIRS_PER_ARRAY).map(|k| (k as f64 - (PAIRS_PER_ARRAY - 1) as f64 / 2.0) * PAIR_PITCH)
}

fn across_lines(center: f64) -> Vec<f64> {
    pair_offsets()
        .flat_map(|offset| [center + offset - PAD_WIDTH / 2.0, center + offset + PAD_WIDTH / 2.0])
        .collect()
}

fn build_lines(mut coords: Vec<f64>) -> Vec<f64> {
    coords.sort_by(f64::total_cmp);
    coords.dedup_by(|a, b| (*a - *b).abs() < LINE_EPSILON);
    coords
}

impl JumperX4GridGenerator {
    fn port_count(
        &self,
        params: &JumperGridParams,
        kinds: (RegionKind, RegionKind),
        edge_length: f64,
        vertical_edge: bool,
        outer: bool,
    ) -> usize {
        match kinds {
            (RegionKind::Pad, _) | (_, RegionKind::Pad) => 1,
            (RegionKind::UnderBody, _) | (_, RegionKind::UnderBody) => {
                if edge_length >= PARALLEL_TRACE_MIN_EDGE {
                    params.parallel_traces_under_jumper_count.max(1)
                } else {
                    1
                }
            }
            _ => {
                let configured = match (vertical_edge, outer) {
                    (true, true) => params.outer_channel_y_point_count,
                    (true, false) => params.inner_row_channel_point_count,
                    (false, true) => params.outer_channel_x_point_count,
                    (false, false) => params.inner_col_channel_point_count,
                };
                let fit = ((edge_length / CHANNEL_PORT_PITCH).floor() as usize).max(1);
                configured.clamp(1, fit)
            }
        }
    }
}

impl JumperGridGenerator for JumperX4GridGenerator {
    fn generate(&self, params: &JumperGridParams) -> JumperGraph {
        let (array_w, array_h) = params.array_size();
        let bounds = params.bounds;
        let (start_x, outer_x, centers_x) = axis_layout(
            bounds.min_x,
            bounds.max_x,
            params.cols,
            params.outer_padding_x,
            params.margin_x,
            array_w,
        );
        let (start_y, outer_y, centers_y) = axis_layout(
            bounds.min_y,
            bounds.max_y,
            params.rows,
            params.outer_padding_y,
            params.margin_y,
            array_h,
        );
        let end_x = start_x + 2.0 * outer_x + (params.cols + 1) as f64 * params.margin_x + params.cols as f64 * array_w;
        let end_y = start_y + 2.0 * outer_y + (params.rows + 1) as f64 * params.margin_y + params.rows as f64 * array_h;
        let horizontal = params.orientation == JumperOrientation::Horizontal;

        let mut x_coords = vec![start_x, start_x + outer_x, end_x - outer_x, end_x];
        for &cx in &centers_x {
            x_coords.extend([cx - array_w / 2.0 - params.margin_x, cx + array_w / 2.0 + params.margin_x]);
            if horizontal {
                x_coords.extend(along_lines(cx));
            } else {
                x_coords.extend(across_lines(cx));
            }
        }
        let mut y_coords = vec![start_y, start_y + outer_y, end_y - outer_y, end_y];
        for &cy in &centers_y {
            y_coords.extend([cy - array_h / 2.0 - params.margin_y, cy + array_h / 2.0 + params.margin_y]);
            if horizontal {
                y_coords.extend(across_lines(cy));
            } else {
                y_coords.extend(along_lines(cy));
            }
        }
        let x_lines = build_lines(x_coords);
        let y_lines = build_lines(y_coords);

        let mut arrays = Vec::new();
        let mut pairs: Vec<[PadSpec; 2]> = Vec::new();
        for &cy in &centers_y {
            for &cx in &centers_x {
                let center = Point::new(cx, cy);
                arrays.push(ArrayLayout {
                    bounds: Bounds::from_center(center, array_w, array_h),
                    center,
                });
                for offset in pair_offsets() {
                    let (start, end, size) = if horizontal {
                        (
                            Point::new(cx - PAD_CENTER_OFFSET, cy + offset),
                            Point::new(cx + PAD_CENTER_OFFSET, cy + offset),
                            (PAD_LENGTH, PAD_WIDTH),
                        )
                    } else {
                        (
                            Point::new(cx + offset, cy - PAD_CENTER_OFFSET),
                            Point::new(cx + offset, cy + PAD_CENTER_OFFSET),
                            (PAD_WIDTH, PAD_LENGTH),
                        )
                    };
                    pairs.push([start, end].map(|center| PadSpec {
                        bounds: Bounds::from_center(center, size.0, size.1),
                        center,
                    }));
                }
            }
        }

        let nx = x_lines.len() - 1;
        let ny = y_lines.len() - 1;
        let mut graph = HyperGraph::default();
        let mut cells: Vec<Option<RegionId>> = vec![None; nx * ny];
        let mut pad_regions: Vec<[Option<RegionId>; 2]> = vec![[None, None]; pairs.len()];

        for j in 0..ny {
            for i in 0..nx {
                let cell = Bounds::new(x_lines[i], y_lines[j], x_lines[i + 1], y_lines[j + 1]);
                let center = cell.center();
                let array = arrays.iter().find(|array| array.bounds.contains(&center, -LINE_EPSILON));

                let pad = pairs.iter().enumerate().find_map(|(pair, pads)| {
                    pads.iter()
                        .position(|pad| pad.bounds.contains(&center, -LINE_EPSILON))
                        .map(|end| (pair, end))
                });

                let kind = match (array, pad) {
                    (Some(_), Some(_)) => RegionKind::Pad,
                    (Some(array), None) => {
                        let offset = if horizontal {
                            (center.x - array.center.x).abs()
                        } else {
                            (center.y - array.center.y).abs()
                        };
                        if !params.regions_between_pads && offset > PAD_INNER_OFFSET {
                            continue;
                        }
                        RegionKind::UnderBody
                    }
                    (None, _) => RegionKind::Channel,
                };

                let region = graph.add_region(format!("cell_{i}_{j}"), kind, cell, center);
                cells[j * nx + i] = Some(region);
                if let (RegionKind::Pad, Some((pair, end))) = (kind, pad) {
                    pad_regions[pair][end] = Some(region);
                }
            }
        }

        let is_outer = |i: usize, j: usize| i == 0 || j == 0 || i == nx - 1 || j == ny - 1;
        for j in 0..ny {
            for i in 0..nx {
                let Some(here) = cells[j * nx + i] else {
                    continue;
                };
                if i + 1 < nx {
                    if let Some(right) = cells[j * nx + i + 1] {
                        let (y0, y1) = (y_lines[j], y_lines[j + 1]);
                        let kinds = (graph.regions[here].kind, graph.regions[right].kind);
                        let count = self.port_count(params, kinds, y1 - y0, true, is_outer(i, j) || is_outer(i + 1, j));
                        for k in 0..count {
                            let y = y0 + (y1 - y0) * (2 * k + 1) as f64 / (2 * count) as f64;
                            graph.add_port(Point::new(x_lines[i + 1], y), here, Some(right));
                        }
                    }
                }
                if j + 1 < ny {
                    if let Some(up) = cells[(j + 1) * nx + i] {
                        let (x0, x1) = (x_lines[i], x_lines[i + 1]);
                        let kinds = (graph.regions[here].kind, graph.regions[up].kind);
                        let count = self.port_count(params, kinds, x1 - x0, false, is_outer(i, j) || is_outer(i, j + 1));
                        for k in 0..count {
                            let x = x0 + (x1 - x0) * (2 * k + 1) as f64 / (2 * count) as f64;
                            graph.add_port(Point::new(x, y_lines[j + 1]), here, Some(up));
                        }
                    }
                }
            }
        }

        let mut jumper_locations = Vec::with_capacity(pairs.len());
        for (index, (pads, regions)) in pairs.iter().zip(&pad_regions).enumerate() {
            let [Some(start_region), Some(end_region)] = *regions else {
                continue;
            };
            let center = pads[0].center.midpoint(&pads[1].center);
            let span = Bounds::new(
                pads[0].center.x.min(pads[1].center.x),
                pads[0].center.y.min(pads[1].center.y),
                pads[0].center.x.max(pads[1].center.x),
                pads[0].center.y.max(pads[1].center.y),
            );
            let through = graph.add_region(format!("through_jumper_{index}"), RegionKind::ThroughJumper, span, center);
            graph.add_port(pads[0].center, start_region, Some(through));
            graph.add_port(pads[1].center, end_region, Some(through));
            jumper_locations.push(JumperLocation {
                center,
                orientation: params.orientation,
                pad_regions: vec![start_region, end_region],
            });
        }

        tracing::debug!(
            regions = graph.regions.len(),
            ports = graph.ports.len(),
            jumpers = jumper_locations.len(),
            "generated jumper grid"
        );

        JumperGraph {
            graph,
            jumper_locations,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn params(pattern: HyperGraphPattern, orientation: JumperOrientation, bounds: Bounds) -> JumperGridParams {
        JumperGridParams::for_pattern(pattern, orientation, bounds, &HyperGraphRouterConfig::default())
    }

    fn count(graph: &HyperGraph, kind: RegionKind) -> usize {
        graph.regions.iter().filter(|region| region.kind == kind).count()
    }

    #[test]
    fn single_array_fills_a_large_node() {
        let bounds = Bounds::from_center(Point::new(5.0, 5.0), 12.0, 12.0);
        let generated = JumperX4GridGenerator.generate(&params(HyperGraphPattern::Single, JumperOrientation::Vertical, bounds));
        let graph = &generated.graph;

        assert_eq!(count(graph, RegionKind::Pad), 8);
        assert_eq!(count(graph, RegionKind::ThroughJumper), 4);
        assert_eq!(count(graph, RegionKind::UnderBody), 13);
        assert_eq!(count(graph, RegionKind::Channel), 56);
        assert_eq!(generated.jumper_locations.len(), 4);

        let graph_bounds = graph.bounds().unwrap();
        assert!(graph_bounds.is_within(&bounds, 1e-9));
        assert!(bounds.is_within(&graph_bounds, 1e-9));
    }

    #[test]
    fn through_jumpers_join_their_two_pads() {
        let bounds = Bounds::from_center(Point::new(0.0, 0.0), 8.0, 8.0);
        let generated =
            JumperX4GridGenerator.generate(&params(HyperGraphPattern::Single, JumperOrientation::Horizontal, bounds));
        let graph = &generated.graph;
        for location in &generated.jumper_locations {
            let through = graph
                .regions
                .iter()
                .find(|region| region.is_through_jumper() && region.center.approx_eq(&location.center, 1e-9))
                .unwrap();
            assert_eq!(through.ports.len(), 2);
            assert!((through.bounds.width() - 2.7).abs() < 1e-9);
            assert_eq!(through.bounds.height(), 0.0);
            for port in &through.ports {
                let pad = graph.ports[*port].region1;
                assert!(location.pad_regions.contains(&pad));
                assert!(graph.regions[pad].is_pad());
            }
        }
    }

    #[rstest]
    #[case(HyperGraphPattern::Single, JumperOrientation::Horizontal, (6.7, 6.1))]
    #[case(HyperGraphPattern::Single, JumperOrientation::Vertical, (6.1, 6.7))]
    #[case(HyperGraphPattern::Grid2x2, JumperOrientation::Horizontal, (2.0 * 0.4 + 3.0 * 1.2 + 7.0, 2.0 * 0.4 + 3.0 * 1.2 + 5.8))]
    fn minimum_size_of_patterns(
        #[case] pattern: HyperGraphPattern,
        #[case] orientation: JumperOrientation,
        #[case] expected: (f64, f64),
    ) {
        let p = params(pattern, orientation, Bounds::new(0.0, 0.0, 1.0, 1.0));
        let (w, h) = p.minimum_size();
        assert!((w - expected.0).abs() < 1e-9, "{w}");
        assert!((h - expected.1).abs() < 1e-9, "{h}");
    }

    #[test]
    fn small_node_gets_a_centered_minimum_pattern() {
        let bounds = Bounds::from_center(Point::new(0.0, 0.0), 3.0, 3.0);
        let generated = JumperX4GridGenerator.generate(&params(HyperGraphPattern::Single, JumperOrientation::Vertical, bounds));
        let graph_bounds = generated.graph.bounds().unwrap();
        assert!((graph_bounds.width() - 6.1).abs() < 1e-9);
        assert!(graph_bounds.center().approx_eq(&Point::new(0.0, 0.0), 1e-9));
    }

    #[test]
    fn without_between_pad_regions_gaps_are_not_routable() {
        let bounds = Bounds::from_center(Point::new(0.0, 0.0), 8.0, 8.0);
        let mut p = params(HyperGraphPattern::Single, JumperOrientation::Horizontal, bounds);
        let with_gaps = JumperX4GridGenerator.generate(&p);
        p.regions_between_pads = false;
        let without_gaps = JumperX4GridGenerator.generate(&p);
        assert_eq!(
            count(&with_gaps.graph, RegionKind::UnderBody) - count(&without_gaps.graph, RegionKind::UnderBody),
            6
        );
    }

    #[test]
    fn pad_edges_carry_one_port() {
        let bounds = Bounds::from_center(Point::new(0.0, 0.0), 8.0, 8.0);
        let generated =
            JumperX4GridGenerator.generate(&params(HyperGraphPattern::Single, JumperOrientation::Horizontal, bounds));
        let graph = &generated.graph;
        for (id, region) in graph.regions.iter().enumerate().filter(|(_, region)| region.is_pad()) {
            let mut neighbors: Vec<usize> = region
                .ports
                .iter()
                .filter_map(|port| graph.ports[*port].other_region(id))
                .collect();
            let before = neighbors.len();
            neighbors.sort_unstable();
            neighbors.dedup();
            assert_eq!(before, neighbors.len());
        }
    }
}
