//! History export endpoint.

use axum::extract::{Query, State};
use serde::Deserialize;

use super::{require_team_id, success, ApiResult};
use crate::errors::AppError;
use crate::models::{HistoryExport, HistoryScope};
use crate::AppState;

/// Export query: either a team id or `allTeams=1`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub all_teams: Option<String>,
}

impl HistoryQuery {
    fn scope(&self) -> Result<HistoryScope, AppError> {
        // A blank teamId counts as absent
        let team_id = self.team_id.as_deref().filter(|t| !t.trim().is_empty());
        if team_id.is_some() {
            return Ok(HistoryScope::Team(require_team_id(team_id)?));
        }
        match self.all_teams.as_deref() {
            Some("1") | Some("true") => Ok(HistoryScope::AllTeams),
            _ => Err(AppError::Validation(
                "teamId or allTeams=1 required".to_string(),
            )),
        }
    }
}

/// GET /api/history - Export week history for one team or all configured teams.
pub async fn export_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<HistoryExport> {
    let scope = query.scope()?;

    success(state.tracker.export_history(&scope).await?)
}
