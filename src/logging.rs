use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::domain::DVError;

/// Send tracing output to `log_file`, the terminal belongs to the UI.
///
/// `level` is the default filter, `RUST_LOG` overrides it. Without a log file
/// only the error layer is installed so span traces still get captured.
pub fn init_tracing(log_file: Option<&Path>, level: &str) -> Result<(), DVError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| DVError::InvalidArgument(format!("log level {level}: {e}")))?;

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| DVError::LoadingFailed(format!("tracing already initialized: {e}")))
}
