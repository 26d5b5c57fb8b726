//! Local re-optimization of port point assignment inside bounded neighborhoods.

mod create;
mod optimizer;

pub use create::{
    create_port_point_section, cut_paths_to_section, PortPointSection, SectionInput, SectionPath, SectionPathPoint,
};
pub use optimizer::{apply_swap, swap_candidates, PortPointSwap, SectionConfig, SectionOptimizer};
