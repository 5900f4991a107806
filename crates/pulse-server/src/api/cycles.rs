use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CyclesQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct CycleItem {
    cycle_id: String,
    status: String,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    reddit_outcome: String,
    news_outcome: String,
    fetched: i64,
    deduplicated: i64,
    inserted: i64,
    updated: i64,
    evicted: i64,
    error_message: Option<String>,
}

pub(super) async fn list_cycles(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CyclesQuery>,
) -> Result<Json<ApiResponse<Vec<CycleItem>>>, ApiError> {
    let rows = pulse_db::list_cycles(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| CycleItem {
            cycle_id: row.public_id,
            status: row.status,
            started_at: row.started_at,
            finished_at: row.finished_at,
            reddit_outcome: row.reddit_outcome,
            news_outcome: row.news_outcome,
            fetched: row.fetched,
            deduplicated: row.deduplicated,
            inserted: row.inserted,
            updated: row.updated,
            evicted: row.evicted,
            error_message: row.error_message,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
