//! Congestion resolution for an autorouter: scores crossings per node,
//! re-optimizes port point assignment locally, decides which prepattern
//! jumpers a route needs, and routes dense nodes through tiled jumper grids.

pub mod analysis;
pub mod connections;
pub mod connectivity;
pub mod error;
pub mod footprint;
pub mod geometry;
pub mod graph;
pub mod jumpers;
pub mod keepout;
pub mod lib_tracing;
pub mod pipeline;
pub mod ports;
pub mod routing;
pub mod section;
pub mod solver;
pub mod types;

pub use error::{Result, RouterError};
pub use lib_tracing::{LibTracer, TracerError};
pub use pipeline::{run_pipeline, PipelineConfig, PipelineState, StageDescriptor, StageFailure, STAGES};
pub use solver::{Solver, SolverState, SolverStatus};
