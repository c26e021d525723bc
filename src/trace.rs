use cap_std::fs_utf8::Dir;
use miette::{Context, IntoDiagnostic, Result};

/// log file created inside the overlay directory
pub const LOG_FILE_NAME: &str = "terramap.log";
/// environment variable that overrides the default `info` filter
pub const LOG_ENV_VAR: &str = "TERRAMAP_LOG";

pub fn install_tracing(overlay_dir: &Dir) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};
    // get the log level
    let filter_layer = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    // create log file in the overlay dir. This will also serve as a check that the directory is "writeable" by us
    let writer = std::io::BufWriter::new(
        overlay_dir
            .create(LOG_FILE_NAME)
            .into_diagnostic()
            .wrap_err("failed to create terramap.log file")?,
    );
    let (nb, guard) = tracing_appender::non_blocking(writer);
    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(nb);
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
    Ok(guard)
}
