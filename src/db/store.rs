//! Storage seam between the tracker core and its persistence backends.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{AuditEvent, Roster, WeekDocument};

/// Persistence operations the tracker needs. Each call is an independent
/// read or write; nothing here spans several calls.
#[async_trait]
pub trait TrackerStore: Send + Sync {
    async fn load_roster(&self, team_id: &str) -> Result<Option<Roster>, AppError>;

    async fn save_roster(&self, roster: &Roster) -> Result<(), AppError>;

    async fn load_week(
        &self,
        team_id: &str,
        iso_week: &str,
    ) -> Result<Option<WeekDocument>, AppError>;

    async fn save_week(&self, week: &WeekDocument) -> Result<(), AppError>;

    /// Weeks recorded in the team's index, ascending.
    async fn list_weeks(&self, team_id: &str) -> Result<Vec<String>, AppError>;

    /// Idempotently add a week to the team's index.
    async fn ensure_week_indexed(&self, team_id: &str, iso_week: &str) -> Result<(), AppError>;

    async fn append_audit_event(
        &self,
        team_id: &str,
        iso_week: &str,
        event: &AuditEvent,
    ) -> Result<(), AppError>;

    /// Audit events in append order.
    async fn load_audit_events(
        &self,
        team_id: &str,
        iso_week: &str,
    ) -> Result<Vec<AuditEvent>, AppError>;
}
