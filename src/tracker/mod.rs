//! Week tracking core: roster management, week resolution and patching,
//! audit recording and history export.
//!
//! Request handlers call into [`Tracker`]; the merge rules themselves live in
//! [`merge`] and never touch storage.

mod iso_week;
mod merge;

pub use iso_week::*;
pub use merge::*;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::db::TrackerStore;
use crate::errors::AppError;
use crate::models::{
    AuditEvent, HistoryExport, HistoryScope, Member, Roster, SaveRosterRequest, TeamWeekEntry,
    WeekDocument, WeekPatch, ROSTER_SCHEMA_VERSION,
};

/// Entry point for every tracker operation. Holds an explicit storage handle.
pub struct Tracker {
    store: Arc<dyn TrackerStore>,
    teams: Vec<String>,
    persist_on_read: bool,
}

impl Tracker {
    pub fn new(store: Arc<dyn TrackerStore>, teams: Vec<String>, persist_on_read: bool) -> Self {
        Self {
            store,
            teams,
            persist_on_read,
        }
    }

    // ==================== ROSTER ====================

    /// The team's roster, or an empty one if it was never saved.
    pub async fn get_roster(&self, team_id: &str) -> Result<Roster, AppError> {
        if let Some(roster) = self.store.load_roster(team_id).await? {
            return Ok(roster);
        }

        let roster = Roster::empty(team_id, &now());
        if self.persist_on_read {
            self.store.save_roster(&roster).await?;
            tracing::debug!("Stored default roster for team {}", team_id);
        }
        Ok(roster)
    }

    /// Replace the team's roster.
    pub async fn save_roster(
        &self,
        team_id: &str,
        request: SaveRosterRequest,
    ) -> Result<Roster, AppError> {
        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(request.members.len());

        for input in request.members {
            let name = input.name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::Validation("Member name is required".to_string()));
            }

            let id = match input.id.as_deref().map(str::trim) {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => uuid::Uuid::new_v4().to_string(),
            };
            if !seen.insert(id.clone()) {
                return Err(AppError::Validation(format!(
                    "Duplicate member id {}",
                    id
                )));
            }

            let (email, phone) = input.contact();
            members.push(Member {
                id,
                name,
                active: input.active,
                email,
                phone,
                team_id: team_id.to_string(),
            });
        }

        let roster = Roster {
            schema_version: ROSTER_SCHEMA_VERSION,
            team_id: team_id.to_string(),
            updated_at: now(),
            members,
        };
        self.store.save_roster(&roster).await?;

        tracing::info!(
            "Saved roster for team {} ({} members)",
            team_id,
            roster.members.len()
        );
        Ok(roster)
    }

    // ==================== WEEKS ====================

    /// Fetch a week, deriving the default document when none is stored.
    ///
    /// The default is only written back when persistence on read is enabled;
    /// otherwise each call builds a fresh one with a new `updatedAt`.
    pub async fn fetch_week(
        &self,
        team_id: &str,
        iso_week: &IsoWeek,
    ) -> Result<WeekDocument, AppError> {
        let iso_week = iso_week.to_string();
        let roster = self.roster_or_empty(team_id).await?;

        let week = match self.store.load_week(team_id, &iso_week).await? {
            Some(mut week) => {
                backfill_roster(&mut week, &roster);
                week
            }
            None => {
                let week = default_week(team_id, &iso_week, &roster, &now());
                if self.persist_on_read {
                    self.store.save_week(&week).await?;
                    tracing::debug!("Stored default week {} for team {}", iso_week, team_id);
                }
                week
            }
        };

        if self.persist_on_read {
            self.store.ensure_week_indexed(team_id, &iso_week).await?;
        }

        Ok(week)
    }

    /// Merge a partial update into a week, persist it and record an audit event.
    pub async fn patch_week(
        &self,
        team_id: &str,
        iso_week: &IsoWeek,
        patch: WeekPatch,
        actor: &str,
    ) -> Result<WeekDocument, AppError> {
        let iso_week = iso_week.to_string();
        let roster = self.roster_or_empty(team_id).await?;
        let now = now();

        // Read-modify-write with no version check: concurrent patches to the
        // same week are last-write-wins.
        let current = match self.store.load_week(team_id, &iso_week).await? {
            Some(week) => week,
            None => default_week(team_id, &iso_week, &roster, &now),
        };

        let mut next = apply_week_patch(current, &patch, &now);
        backfill_roster(&mut next, &roster);

        self.store.save_week(&next).await?;
        self.store.ensure_week_indexed(team_id, &iso_week).await?;

        let event = AuditEvent::week_patch(actor, patch.summary.as_deref(), &now);
        self.store
            .append_audit_event(team_id, &iso_week, &event)
            .await?;

        tracing::info!(
            "Patched week {} for team {} by {} ({} member updates)",
            iso_week,
            team_id,
            actor,
            patch.members.len()
        );
        Ok(next)
    }

    /// Weeks recorded for a team, ascending.
    pub async fn list_weeks(&self, team_id: &str) -> Result<Vec<String>, AppError> {
        self.store.list_weeks(team_id).await
    }

    /// Audit events for a week in the order they were recorded.
    pub async fn audit_log(
        &self,
        team_id: &str,
        iso_week: &IsoWeek,
    ) -> Result<Vec<AuditEvent>, AppError> {
        self.store
            .load_audit_events(team_id, &iso_week.to_string())
            .await
    }

    // ==================== HISTORY ====================

    /// Export stored weeks for one team, or for every configured team.
    pub async fn export_history(&self, scope: &HistoryScope) -> Result<HistoryExport, AppError> {
        let export = match scope {
            HistoryScope::Team(team_id) => HistoryExport::Team(self.team_history(team_id).await?),
            HistoryScope::AllTeams => {
                let mut entries = Vec::new();
                for team_id in &self.teams {
                    for week in self.team_history(team_id).await? {
                        entries.push(TeamWeekEntry {
                            team_id: team_id.clone(),
                            iso_week: week.iso_week.clone(),
                            data: week,
                        });
                    }
                }
                // Global chronological order; stable, so ties keep team order
                entries.sort_by(|a, b| a.iso_week.cmp(&b.iso_week));
                HistoryExport::AllTeams(entries)
            }
        };

        tracing::info!("Exported {} weeks ({:?})", export.len(), scope);
        Ok(export)
    }

    async fn team_history(&self, team_id: &str) -> Result<Vec<WeekDocument>, AppError> {
        let mut weeks = self.store.list_weeks(team_id).await?;
        weeks.sort();
        weeks.dedup();

        let mut documents = Vec::with_capacity(weeks.len());
        for iso_week in &weeks {
            match self.store.load_week(team_id, iso_week).await? {
                Some(week) => documents.push(week),
                None => tracing::warn!(
                    "Week index for team {} lists {} but no document exists, skipping",
                    team_id,
                    iso_week
                ),
            }
        }
        Ok(documents)
    }

    async fn roster_or_empty(&self, team_id: &str) -> Result<Roster, AppError> {
        Ok(self
            .store
            .load_roster(team_id)
            .await?
            .unwrap_or_else(|| Roster::empty(team_id, &now())))
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}
