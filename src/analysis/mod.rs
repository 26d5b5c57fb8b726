//! Congestion scoring: forced crossings per node and the failure model built on them.

pub mod crossings;
pub mod failure;

pub use crossings::{chords_cross, count_chord_crossings, intra_node_crossings, perimeter_t, IntraNodeCrossings};
pub use failure::{
    compute_section_score, node_probability_of_failure, probability_of_failure, FailureConfig, FailureModel,
    NODE_MAX_PF,
};
