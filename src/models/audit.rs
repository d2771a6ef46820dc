//! Audit log model: an append-only event list per (team, ISO week).

use serde::{Deserialize, Serialize};

/// Schema version stamped on stored audit logs.
pub const AUDIT_SCHEMA_VERSION: i32 = 1;

/// Action recorded for week patches.
pub const ACTION_WEEK_PATCH: &str = "week-patch";

/// Summary used when a patch does not provide one.
pub const DEFAULT_PATCH_SUMMARY: &str = "Updated week data";

/// A single recorded write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: String,
    pub timestamp: String,
    pub actor: String,
    pub action: String,
    pub summary: String,
}

impl AuditEvent {
    /// Build the event recorded after a week patch.
    pub fn week_patch(actor: &str, summary: Option<&str>, timestamp: &str) -> Self {
        let summary = summary
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_PATCH_SUMMARY);

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: timestamp.to_string(),
            actor: actor.to_string(),
            action: ACTION_WEEK_PATCH.to_string(),
            summary: summary.to_string(),
        }
    }
}

/// Stored form of the audit list in the document backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub schema_version: i32,
    pub team_id: String,
    pub iso_week: String,
    #[serde(default)]
    pub events: Vec<AuditEvent>,
}

impl AuditLog {
    pub fn new(team_id: &str, iso_week: &str) -> Self {
        Self {
            schema_version: AUDIT_SCHEMA_VERSION,
            team_id: team_id.to_string(),
            iso_week: iso_week.to_string(),
            events: Vec::new(),
        }
    }
}
