//! Banquet - hall booking and event lifecycle service
//!
//! Opens the reservation database and runs the periodic expiry sweep
//! that retires lapsed hall reservations. Request-driven operations go
//! through the same `banquet-core` engine from the serving layer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use banquet_core::{sweep_expired_reservations, Database, SystemClock};

mod config;

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Banquet");

    let config = config::AppConfig::load_default();

    let db_path = match config.resolve_database_path() {
        Ok(path) => path,
        Err(e) => {
            tracing::error!("Failed to resolve database path: {}", e);
            std::process::exit(1);
        }
    };

    let db = match Database::open(&db_path) {
        Ok(db) => Arc::new(Mutex::new(db)),
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(path = %db_path.display(), "Database ready");

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");

    runtime.block_on(async {
        let sweep_db = db.clone();
        let interval_secs = config.sweep_interval_secs.max(1);

        let sweeper = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

            loop {
                interval.tick().await;

                let db = sweep_db.clone();
                let result = tokio::task::spawn_blocking(move || {
                    let db = db.lock().expect("database lock poisoned");
                    sweep_expired_reservations(&db, &SystemClock)
                })
                .await;

                // One failed cycle never stops the sweep
                match result {
                    Ok(Ok(summary)) if summary.reservations_removed > 0 => {
                        tracing::info!(
                            removed = summary.reservations_removed,
                            failed_halls = summary.halls_failed,
                            "Sweep cycle complete"
                        );
                    }
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => tracing::error!("Sweep cycle failed: {}", e),
                    Err(e) => tracing::error!("Sweep task panicked: {}", e),
                }
            }
        });

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
            }
            _ = sweeper => {}
        }
    });
}
