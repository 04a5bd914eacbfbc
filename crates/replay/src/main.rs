//! Proctoring session replay - Main Entry Point

use replay::{init_logging, run, ReplaySettings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut settings = ReplaySettings::load("proctor")?;
    if let Some(input) = std::env::args().nth(1) {
        settings.input = input.into();
    }
    init_logging(settings.log_json)?;

    info!("=== Proctor replay v{} ===", env!("CARGO_PKG_VERSION"));

    let report = run(&settings).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
