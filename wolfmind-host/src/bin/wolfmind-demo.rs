//! Headless demo: host one game in which the human never acts, and print
//! every update as a JSON line.
//!
//! ```text
//! wolfmind-demo [config.toml] [seed]
//! ```

use std::path::Path;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use wolfmind_core::WolfmindConfig;
use wolfmind_host::{GameRegistry, GameUpdate, Orchestrator, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => WolfmindConfig::from_file(Path::new(&path))?,
        None => WolfmindConfig::default(),
    };
    let seed = args.next().map(|s| s.parse::<u64>()).transpose()?;
    telemetry::init_tracing(&config.general);

    let registry = GameRegistry::new(config.clone());
    let session = registry.create_game(None, seed)?;
    let mut updates = session.subscribe();

    let printer = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    match serde_json::to_string(&update) {
                        Ok(line) => println!("{line}"),
                        Err(e) => warn!(error = %e, "Failed to encode update"),
                    }
                    if matches!(update, GameUpdate::GameOver { .. }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Printer fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let orchestrator = Arc::new(Orchestrator::from_config(&config));
    let winner = orchestrator.spawn(Arc::clone(&session)).await??;
    printer.await?;

    info!(game = %session.id(), winner = ?winner, "Demo finished");
    registry.close(session.id());
    Ok(())
}
