//! `/health` handler: dataset sizes as currently on disk.

use axum::{extract::State, Json};
use serde::Serialize;

use super::routes::ApiState;
use crate::types::{PoolStatSnapshot, RosterEntry};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Records in the pool-stat dataset.
    pub pool_stats: usize,
    /// Entries in the roster dataset.
    pub roster: usize,
}

pub async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let pool_stats: Vec<PoolStatSnapshot> = state.pool_stats.read().await;
    let roster: Vec<RosterEntry> = state.roster.read().await;
    Json(HealthResponse {
        status: "ok",
        pool_stats: pool_stats.len(),
        roster: roster.len(),
    })
}
