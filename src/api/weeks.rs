//! Week API endpoints.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
};
use serde::Deserialize;

use super::{parse_body, require_iso_week, require_team_id, success, ApiResult};
use crate::auth::actor_from_headers;
use crate::models::{AuditEvent, WeekDocument, WeekList, WeekPatch};
use crate::tracker::IsoWeek;
use crate::AppState;

/// Query parameters identifying one week of one team.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekQuery {
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub iso_week: Option<String>,
}

/// Query parameters identifying a team.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamQuery {
    #[serde(default)]
    pub team_id: Option<String>,
}

/// GET /api/week - Fetch a week document (default-filled if not stored yet).
pub async fn get_week(
    State(state): State<AppState>,
    Query(query): Query<WeekQuery>,
) -> ApiResult<WeekDocument> {
    let team_id = require_team_id(query.team_id.as_deref())?;
    let iso_week = require_iso_week(query.iso_week.as_deref())?;

    success(state.tracker.fetch_week(&team_id, &iso_week).await?)
}

/// PATCH /api/week - Merge a partial update into a week document.
pub async fn patch_week(
    State(state): State<AppState>,
    Query(query): Query<WeekQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WeekDocument> {
    let team_id = require_team_id(query.team_id.as_deref())?;
    let iso_week = require_iso_week(query.iso_week.as_deref())?;
    let patch: WeekPatch = parse_body(&body)?;
    let actor = actor_from_headers(&headers);

    success(
        state
            .tracker
            .patch_week(&team_id, &iso_week, patch, &actor)
            .await?,
    )
}

/// GET /api/weeks - List the weeks recorded for a team.
pub async fn list_weeks(
    State(state): State<AppState>,
    Query(query): Query<TeamQuery>,
) -> ApiResult<WeekList> {
    let team_id = require_team_id(query.team_id.as_deref())?;
    let weeks = state.tracker.list_weeks(&team_id).await?;

    success(WeekList { team_id, weeks })
}

/// GET /api/week/current - The current ISO week in the configured timezone.
pub async fn current_week(State(state): State<AppState>) -> ApiResult<String> {
    let today = chrono::Utc::now()
        .with_timezone(&state.config.week_offset)
        .date_naive();

    success(IsoWeek::from_date(today).to_string())
}

/// GET /api/audit - Audit events recorded for a week.
pub async fn get_audit_log(
    State(state): State<AppState>,
    Query(query): Query<WeekQuery>,
) -> ApiResult<Vec<AuditEvent>> {
    let team_id = require_team_id(query.team_id.as_deref())?;
    let iso_week = require_iso_week(query.iso_week.as_deref())?;

    success(state.tracker.audit_log(&team_id, &iso_week).await?)
}
