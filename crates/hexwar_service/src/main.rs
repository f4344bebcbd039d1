//! Hexwar - Game Service
//!
//! Reads one JSON request per line on stdin and writes one JSON response per
//! line on stdout. Usage: `hexwar-service [config.ron]`.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use hexwar_core::rules::RulesEngine;
use hexwar_service::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn run() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    let rules_path = config
        .rules_path
        .clone()
        .ok_or_else(|| ServiceError::InvalidRequest("config has no rules_path".into()))?;
    let rules = Arc::new(RulesEngine::load_ron_file(&rules_path)?);
    let storage = Arc::new(FileStorage::new(&config.storage_root)?);
    tracing::info!(
        root = %config.storage_root.display(),
        rules = %rules_path.display(),
        cache = config.cache_games,
        "Service ready"
    );
    let service = GamesService::new(storage, rules, config);

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| ServiceError::io("<stdin>", e))?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<ServiceRequest>(&line) {
            Ok(request) => service.handle(request),
            Err(e) => ServiceResponse::Error {
                message: format!("Invalid request: {e}"),
                retryable: false,
            },
        };
        let encoded = serde_json::to_string(&response)
            .map_err(|e| ServiceError::Serialization(e.to_string()))?;
        writeln!(stdout, "{encoded}").map_err(|e| ServiceError::io("<stdout>", e))?;
        stdout.flush().map_err(|e| ServiceError::io("<stdout>", e))?;
    }
    Ok(())
}

fn main() {
    // Initialize tracing; logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Hexwar game service");

    if let Err(e) = run() {
        tracing::error!("Service failed: {e}");
        std::process::exit(1);
    }
}
