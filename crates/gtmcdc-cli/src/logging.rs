use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::warn;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Log destination that writes to stderr instead of a file.
pub const STDERR: &str = "stderr";

fn parse_level(level: &str) -> Option<LevelFilter> {
    level.trim().parse().ok()
}

/// Install the global subscriber. `RUST_LOG` directives refine `log_level`.
///
/// Never writes to stdout, which may carry the filter output.
pub fn init_logging(log_file: &str, log_level: &str) -> Result<()> {
    let level = parse_level(log_level);
    let filter = EnvFilter::builder()
        .with_default_directive(level.unwrap_or(LevelFilter::INFO).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if log_file.is_empty() || log_file.eq_ignore_ascii_case(STDERR) {
        builder.with_writer(std::io::stderr).init();
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("Failed to open log file: {}", log_file))?;
        builder.with_writer(Mutex::new(file)).with_ansi(false).init();
    }

    if level.is_none() {
        warn!(level = log_level, "Invalid log level, defaulting to info");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::DEBUG));
        assert_eq!(parse_level("INFO"), Some(LevelFilter::INFO));
        assert_eq!(parse_level(" warn "), Some(LevelFilter::WARN));
        assert_eq!(parse_level("off"), Some(LevelFilter::OFF));
        assert_eq!(parse_level("loud"), None);
    }
}
