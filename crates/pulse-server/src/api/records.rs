use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use pulse_core::Source;
use pulse_db::RecordFilter;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct RecordsQuery {
    pub limit: Option<i64>,
    pub source: Option<String>,
    pub community: Option<String>,
    pub hours: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct RecordItem {
    id: i64,
    source: String,
    origin_id: String,
    collected_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    text: String,
    community: String,
    engagement: i64,
    sentiment_score: Option<f64>,
    keywords: Vec<String>,
}

pub(super) async fn list_records(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<ApiResponse<Vec<RecordItem>>>, ApiError> {
    let source = match query.source.as_deref() {
        Some(raw) => Some(raw.parse::<Source>().map_err(|_| {
            ApiError::new(
                req_id.0.clone(),
                "validation_error",
                format!("unknown source '{raw}', expected 'reddit' or 'news'"),
            )
        })?),
        None => None,
    };

    let since = query.hours.map(|h| Utc::now() - Duration::hours(h.max(1)));

    let filter = RecordFilter {
        source,
        community: query.community,
        since,
        until: None,
        limit: normalize_limit(query.limit),
    };

    let rows = pulse_db::query_window(&state.pool, &filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| RecordItem {
            id: row.id,
            source: row.source,
            origin_id: row.origin_id,
            collected_at: row.collected_at,
            published_at: row.published_at,
            text: row.text,
            community: row.community,
            engagement: row.engagement,
            sentiment_score: row.sentiment_score,
            keywords: row.keywords.0,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
