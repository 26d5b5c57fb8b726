use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use tracing_flame::{FlameLayer, FlushGuard};
use tracing_subscriber::{filter, prelude::*, util::TryInitError};

#[derive(Debug, thiserror::Error)]
pub enum TracerError {
    #[error("could not create debug log: {0}")]
    DebugLog(#[from] std::io::Error),
    #[error("could not create flame graph output: {0}")]
    Flame(#[from] tracing_flame::Error),
    #[error("a global subscriber is already installed: {0}")]
    Init(#[from] TryInitError),
}

/// Installs the global subscriber: pretty `INFO` output on stdout, every
/// event in a debug log file, and optionally folded flame graph samples.
///
/// Keep the tracer alive for as long as spans should be recorded; dropping
/// it flushes the flame graph output.
pub struct LibTracer {
    _flame_guard: Option<FlushGuard<BufWriter<File>>>,
}

impl LibTracer {
    pub fn init(debug_log_path: impl AsRef<Path>, flame_path: Option<&Path>) -> Result<Self, TracerError> {
        let stdout_log = tracing_subscriber::fmt::layer().pretty();

        // A layer that logs events to a file.
        let file = File::create(debug_log_path)?;
        let debug_log = tracing_subscriber::fmt::layer().with_writer(Arc::new(file));

        let (flame_layer, flame_guard) = match flame_path.map(FlameLayer::with_file).transpose()? {
            Some((layer, guard)) => (Some(layer), Some(guard)),
            None => (None, None),
        };

        tracing_subscriber::registry()
            .with(
                stdout_log
                    // Add an `INFO` filter to the stdout logging layer
                    .with_filter(filter::LevelFilter::INFO)
                    .and_then(debug_log),
            )
            .with(flame_layer)
            .try_init()?;

        Ok(LibTracer {
            _flame_guard: flame_guard,
        })
    }
}
