//! Diagnostic logging setup.
//!
//! Events go to stderr so they never mix with SQL written to stdout.

use tracing::Level;

/// Map a `--log-level` value to a tracing level
pub fn parse_level(verbosity: &str) -> Result<Level, String> {
    match verbosity.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(format!(
            "Unknown log level: {}. Valid options: error, warn, info, debug, trace",
            verbosity
        )),
    }
}

/// Install the global fmt subscriber. Safe to call more than once.
pub fn init(verbosity: &str) -> Result<(), String> {
    let level = parse_level(verbosity)?;

    // Already installed (tests, repeated calls) is fine
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    Ok(())
}
