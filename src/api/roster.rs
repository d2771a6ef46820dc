//! Roster API endpoints.

use axum::{
    body::Bytes,
    extract::{Query, State},
};

use super::{parse_body, require_team_id, success, ApiResult, TeamQuery};
use crate::models::{Roster, SaveRosterRequest};
use crate::AppState;

/// GET /api/roster - Get a team's roster.
pub async fn get_roster(
    State(state): State<AppState>,
    Query(query): Query<TeamQuery>,
) -> ApiResult<Roster> {
    let team_id = require_team_id(query.team_id.as_deref())?;

    success(state.tracker.get_roster(&team_id).await?)
}

/// PUT /api/roster - Replace a team's roster.
pub async fn save_roster(
    State(state): State<AppState>,
    Query(query): Query<TeamQuery>,
    body: Bytes,
) -> ApiResult<Roster> {
    let team_id = require_team_id(query.team_id.as_deref())?;
    let request: SaveRosterRequest = parse_body(&body)?;

    success(state.tracker.save_roster(&team_id, request).await?)
}
