//! Candidate jumper placement and post-pathing usage classification.

mod necessity;
mod prepattern;

pub use necessity::{
    apply_jumper_pad_port_points, classify_jumper_usage, off_board_connectivity, JumperUsage, JumperUsageInput,
};
pub use prepattern::{alternating_grid, AlternatingGridConfig, PrepatternResult};
