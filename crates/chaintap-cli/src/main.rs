//! chaintap - terminal viewer for streamed token transfers

mod tui;

use anyhow::Result;
use chaintap_core::config::Config;
use tracing_subscriber::EnvFilter;

/// Route logs to a file; the TUI owns the terminal
fn init_tracing() {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("chaintap");
    if std::fs::create_dir_all(&log_dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::File::create(log_dir.join("chaintap.log")) else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::load();
    tui::run(config).await
}
