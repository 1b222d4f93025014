use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::health::get_health;
use crate::dataset::DatasetStore;
use crate::report::{pool_series, search_roster, PoolSeries};
use crate::types::{PoolStatSnapshot, RosterEntry};

/// Datasets served by the API. Files are re-read on every request so that
/// collector runs show up without a restart. Handlers only read.
#[derive(Clone)]
pub struct ApiState {
    pub pool_stats: DatasetStore,
    pub roster: DatasetStore,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/data/poolStats.json", get(get_pool_stats_file))
        .route("/data/teslaSnapshot.json", get(get_roster_file))
        .route("/stats/pool", get(get_pool_series))
        .route("/roster", get(get_roster))
        .route("/health", get(get_health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SeriesQuery {
    pub series: Option<String>,
}

#[derive(Deserialize)]
pub struct RosterQuery {
    pub q: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_pool_stats_file(State(state): State<ApiState>) -> Json<Vec<PoolStatSnapshot>> {
    Json(state.pool_stats.read().await)
}

async fn get_roster_file(State(state): State<ApiState>) -> Json<Vec<RosterEntry>> {
    Json(state.roster.read().await)
}

async fn get_pool_series(
    State(state): State<ApiState>,
    Query(params): Query<SeriesQuery>,
) -> Json<PoolSeries> {
    let records: Vec<PoolStatSnapshot> = state.pool_stats.read().await;
    let series = params.series.as_deref().unwrap_or("All");
    Json(pool_series(&records, series))
}

async fn get_roster(
    State(state): State<ApiState>,
    Query(params): Query<RosterQuery>,
) -> Json<Vec<RosterEntry>> {
    let entries: Vec<RosterEntry> = state.roster.read().await;
    Json(search_roster(&entries, params.q.as_deref().unwrap_or("")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChainId, PoolVersion};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state(dir: &tempfile::TempDir) -> ApiState {
        ApiState {
            pool_stats: DatasetStore::new(dir.path().join("poolStats.json")),
            roster: DatasetStore::new(dir.path().join("teslaSnapshot.json")),
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let res = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_datasets_serve_empty_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get_json(router(state(&dir)), "/data/poolStats.json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));

        let (_, body) = get_json(router(state(&dir)), "/health").await;
        assert_eq!(body, serde_json::json!({"status": "ok", "pool_stats": 0, "roster": 0}));
    }

    #[tokio::test]
    async fn pool_series_reflects_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(&dir);
        let rec = |chain, version, total| PoolStatSnapshot {
            snapshot_date: "20250101".parse().unwrap(),
            resolved_height: 9,
            chain,
            version,
            staker_count: 2,
            total_staked: total,
        };
        st.pool_stats
            .save(&[rec(ChainId::Core, PoolVersion::V1, 500), rec(ChainId::Espace, PoolVersion::V1, 200)])
            .await
            .unwrap();

        let (_, body) = get_json(router(st.clone()), "/stats/pool?series=v1%20core").await;
        assert_eq!(
            body,
            serde_json::json!({"dates": ["20250101"], "staker_numbers": [2], "pos_amounts": [30.0]})
        );

        let (_, body) = get_json(router(st), "/data/poolStats.json").await;
        assert_eq!(body[0]["epochNumber"], 9);
        assert_eq!(body[0]["chain"], "core");
    }

    #[tokio::test]
    async fn unreadable_dataset_is_served_empty_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("poolStats.json"), b"{broken").unwrap();

        let (status, body) = get_json(router(state(&dir)), "/data/poolStats.json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
        let (_, body) = get_json(router(state(&dir)), "/health").await;
        assert_eq!(body["pool_stats"], 0);

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["poolStats.json".to_string()]);
    }

    #[tokio::test]
    async fn roster_search_filters_and_ranks() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(&dir);
        let entry = |addr: &str, vote| RosterEntry {
            snapshot_date: "20250224".parse().unwrap(),
            holder_address: addr.to_string(),
            pos_amount: 1_000,
            token_amount: 188,
            voting_weight: vote,
        };
        st.roster
            .save(&[entry("0xAAAA01", 1), entry("0xBBBB02", 7), entry("0xaaaa03", 4)])
            .await
            .unwrap();

        let (_, body) = get_json(router(st), "/roster?q=aaaa").await;
        let addrs: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["espaceAddr"].as_str().unwrap())
            .collect();
        assert_eq!(addrs, vec!["0xaaaa03", "0xAAAA01"]);
    }
}
