use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::{middleware::admin_key::AdminKey, services::stats::StatisticsService, AppState};

const RECENT_LIMIT: i64 = 5;

/// Today's aggregate counters plus the five most recent registrations.
pub async fn registration_stats(
    State(state): State<AppState>,
    _auth: AdminKey,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let today = Utc::now().date_naive();

    let stats = StatisticsService::for_date(&state.db, today)
        .await
        .map_err(stats_error)?;
    let recent = StatisticsService::recent_registrations(&state.db, RECENT_LIMIT)
        .await
        .map_err(stats_error)?;

    Ok(Json(json!({
        "success": true,
        "stats": {
            "total_registrations": stats.total_registrations,
            "registrations_by_event": stats.registrations_by_event,
            "registrations_by_age_group": stats.registrations_by_age_group,
            "registrations_by_city": stats.registrations_by_city,
            "date": stats.date,
        },
        "recent_registrations": recent,
    })))
}

/// Day-by-day aggregates for the admin listing, newest first.
pub async fn daily_stats(
    State(state): State<AppState>,
    _auth: AdminKey,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let days = StatisticsService::all(&state.db).await.map_err(stats_error)?;

    let entries: Vec<Value> = days
        .iter()
        .map(|day| {
            json!({
                "date": day.date,
                "total_registrations": day.total_registrations,
                "top_event": day.top_event(),
                "top_age_group": day.top_age_group(),
            })
        })
        .collect();

    Ok(Json(json!({ "success": true, "days": entries })))
}

fn stats_error(e: sqlx::Error) -> (StatusCode, Json<Value>) {
    tracing::error!("Stats error: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": e.to_string() })),
    )
}
