//! `GET /health` handler for the admin listener.
//!
//! Returns a [`HealthResponse`] JSON payload with the server version,
//! uptime, config source metadata, mapping/target counts, and cumulative
//! redirect counters.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub config: ConfigHealth,
    pub stats: StatsResponse,
}

#[derive(Serialize, Deserialize)]
pub struct ConfigHealth {
    pub source: String,
    pub version: String,
    pub loaded_ago_seconds: u64,
    pub mappings: usize,
    pub targets: usize,
    pub rotating_domains: usize,
}

#[derive(Serialize, Deserialize)]
pub struct StatsResponse {
    pub redirected: u64,
    pub unmatched: u64,
    pub failed: u64,
    pub config_reloads: u64,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (config, source_name, version, loaded_ago) = {
        let loaded = state.config.read().await;
        (
            Arc::clone(&loaded.config),
            loaded.source_name.clone(),
            loaded.version.short().to_string(),
            loaded.loaded_at.elapsed().as_secs(),
        )
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        config: ConfigHealth {
            source: source_name,
            version,
            loaded_ago_seconds: loaded_ago,
            mappings: config.mappings.len(),
            targets: config.total_targets(),
            rotating_domains: state.dispatcher.rotation().len(),
        },
        stats: StatsResponse {
            redirected: state.stats.redirected.load(Ordering::Relaxed),
            unmatched: state.stats.unmatched.load(Ordering::Relaxed),
            failed: state.stats.failed.load(Ordering::Relaxed),
            config_reloads: state.stats.config_reloads.load(Ordering::Relaxed),
        },
    })
}
