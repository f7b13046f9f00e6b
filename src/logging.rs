//! Logging setup for binaries built on the crate

use tracing::Level;
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Install a global subscriber; `RUST_LOG` overrides `level` when set
pub fn init_logging(level: Level, json_output: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    if json_output {
        let fmt_layer = fmt::layer()
            .json()
            .with_timer(SystemTime)
            .with_target(true)
            .with_writer(std::io::stderr);

        Registry::default().with(env_filter).with(fmt_layer).init();
    } else {
        let fmt_layer = fmt::layer()
            .with_timer(SystemTime)
            .with_target(true)
            .with_writer(std::io::stderr);

        Registry::default().with(env_filter).with(fmt_layer).init();
    }
}

/// `level` for this crate's events, `warn` for everything else
fn default_directives(level: Level) -> String {
    format!("relopt={},warn", level.as_str().to_ascii_lowercase())
}
