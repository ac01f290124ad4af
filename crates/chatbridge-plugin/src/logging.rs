use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const LOG_FILE: &str = "chatbridge.log";

fn filter() -> EnvFilter {
    let filter = EnvFilter::from_default_env();
    match (
        "chatbridge_core=info".parse(),
        "chatbridge_plugin=info".parse(),
    ) {
        (Ok(core), Ok(plugin)) => filter.add_directive(core).add_directive(plugin),
        _ => filter,
    }
}

/// Install the global subscriber, appending to `<log_dir>/chatbridge.log`
/// or writing to stderr. A subscriber that is already installed is kept.
pub fn init(log_dir: Option<&Path>) {
    let file = log_dir.and_then(|dir| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(LOG_FILE))
            .ok()
    });

    let _ = match file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .try_init(),
    };
}
