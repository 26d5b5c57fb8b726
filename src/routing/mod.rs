mod astar;
mod grid;
mod jumper_router;
mod overlap;
mod path_solver;
mod postprocess;
mod ripup;
mod route_single;
mod trace;
mod types;

pub use grid::{JumperGridGenerator, JumperGridParams, JumperX4GridGenerator};
pub use jumper_router::HyperGraphJumperRouter;
pub use overlap::add_midpoints_for_collinear_overlaps;
pub use path_solver::{create_graph_with_connections, GraphPathSolver, JumperGraphSolver};
pub use trace::TRACE_ENV_VAR;
pub use types::{
    GraphConnection, HyperGraph, HyperGraphPattern, HyperGraphRouterConfig, JumperGraph, JumperLocation, PathSolverConfig,
    PathStep, Port, PortId, Region, RegionId, RegionKind, SolvedRoute, XyConnection,
};
