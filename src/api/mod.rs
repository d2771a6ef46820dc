//! REST API module.
//!
//! Thin handlers: validate identifiers, call the tracker, wrap the result.

mod history;
mod roster;
mod weeks;

pub use history::*;
pub use roster::*;
pub use weeks::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::tracker::IsoWeek;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Fallback for unknown API routes.
pub async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

/// Team ids become part of storage keys, so only a safe alphabet is accepted.
pub fn require_team_id(team_id: Option<&str>) -> Result<String, AppError> {
    let team_id = team_id.map(str::trim).unwrap_or_default();
    if team_id.is_empty() {
        return Err(AppError::Validation("teamId is required".to_string()));
    }
    if team_id.len() > 64
        || !team_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(format!("Invalid teamId '{}'", team_id)));
    }
    Ok(team_id.to_string())
}

pub fn require_iso_week(iso_week: Option<&str>) -> Result<IsoWeek, AppError> {
    let iso_week = iso_week.map(str::trim).unwrap_or_default();
    if iso_week.is_empty() {
        return Err(AppError::Validation("isoWeek is required".to_string()));
    }
    iso_week
        .parse()
        .map_err(|e: crate::tracker::IsoWeekParseError| AppError::Validation(e.to_string()))
}

/// Parse a JSON request body; an empty body reads as `{}`.
pub fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_str("{}")?);
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeekPatch;

    #[test]
    fn test_require_team_id() {
        assert_eq!(require_team_id(Some(" braxton ")).unwrap(), "braxton");
        assert!(matches!(require_team_id(None), Err(AppError::Validation(_))));
        assert!(matches!(require_team_id(Some("")), Err(AppError::Validation(_))));
        assert!(matches!(
            require_team_id(Some("../roster")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_require_iso_week() {
        assert_eq!(
            require_iso_week(Some("2024-W07")).unwrap().to_string(),
            "2024-W07"
        );
        assert!(matches!(require_iso_week(None), Err(AppError::Validation(_))));
        assert!(matches!(
            require_iso_week(Some("2024-07")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_body_empty_is_empty_object() {
        let patch: WeekPatch = parse_body(b"").unwrap();
        assert_eq!(patch, WeekPatch::default());
        let patch: WeekPatch = parse_body(b"  \n").unwrap();
        assert_eq!(patch, WeekPatch::default());
    }

    #[test]
    fn test_parse_body_malformed_is_bad_request() {
        let result: Result<WeekPatch, _> = parse_body(b"{\"members\": [");
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let result: Result<WeekPatch, _> = parse_body(b"{\"members\": {\"a\": {\"counters\": {\"firstMeetings\": \"five\"}}}}");
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
