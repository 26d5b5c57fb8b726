//! Clearance correction for interactively drawn traces.

mod draw_position;
mod segments;
mod self_intersections;

pub use draw_position::{compute_draw_position, DrawPositionInput, KeepoutConfig};
pub use segments::{
    obstacle_to_segments, route_to_outline_segments, route_to_outline_segments_near_point,
    trace_segment_to_outline_segments,
};
pub use self_intersections::remove_self_intersections;
