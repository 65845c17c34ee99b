use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingSettings;

/// Install the global subscriber, writing to the configured log file.
///
/// `RUST_LOG` wins over `logging.level`. Returns the file in use.
pub fn init(settings: &LoggingSettings) -> io::Result<PathBuf> {
    let path = settings.file_path();
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    // A subscriber may already be installed (tests); keep that one.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .try_init();

    Ok(path)
}
