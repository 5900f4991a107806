use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct TrendsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct TrendItem {
    keyword: String,
    reddit_mentions: i64,
    news_mentions: i64,
    mean_sentiment: f64,
    cross_platform: bool,
    momentum: f64,
    computed_at: DateTime<Utc>,
}

pub(super) async fn list_trends(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<ApiResponse<Vec<TrendItem>>>, ApiError> {
    let rows = pulse_db::list_trend_aggregates(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| TrendItem {
            keyword: row.keyword,
            reddit_mentions: row.reddit_mentions,
            news_mentions: row.news_mentions,
            mean_sentiment: row.mean_sentiment,
            cross_platform: row.cross_platform,
            momentum: row.momentum,
            computed_at: row.computed_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
