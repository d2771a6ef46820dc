//! Relational backend over normalized SQLite tables.
//!
//! A roster save and a week save are each one transaction covering every row
//! they touch (member rows; week, state, roleplay, task and attendance rows).

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use super::TrackerStore;
use crate::errors::AppError;
use crate::models::{
    Attendance, AuditEvent, Checklist, Counters, CustomTask, Member, MemberWeekState,
    RoleplayEntry, Roster, WeekDocument, WeeklyTask, ROSTER_SCHEMA_VERSION,
};

/// Tracker storage in the `teams`/`members`/`weeks`/... tables.
#[derive(Clone)]
pub struct RelationalRepository {
    pool: SqlitePool,
}

impl RelationalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

async fn upsert_team(tx: &mut Transaction<'_, Sqlite>, team_id: &str) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();
    sqlx::query("INSERT INTO teams (id, created_at) VALUES (?, ?) ON CONFLICT(id) DO NOTHING")
        .bind(team_id)
        .bind(&now)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Insert the week row if needed and return its id.
async fn upsert_week(
    tx: &mut Transaction<'_, Sqlite>,
    team_id: &str,
    iso_week: &str,
    schema_version: i32,
    updated_at: &str,
) -> Result<i64, AppError> {
    sqlx::query(
        "INSERT INTO weeks (team_id, iso_week, schema_version, updated_at) VALUES (?, ?, ?, ?)
         ON CONFLICT(team_id, iso_week) DO UPDATE SET
            schema_version = excluded.schema_version,
            updated_at = excluded.updated_at",
    )
    .bind(team_id)
    .bind(iso_week)
    .bind(schema_version)
    .bind(updated_at)
    .execute(&mut **tx)
    .await?;

    let row = sqlx::query("SELECT id FROM weeks WHERE team_id = ? AND iso_week = ?")
        .bind(team_id)
        .bind(iso_week)
        .fetch_one(&mut **tx)
        .await?;
    Ok(row.get("id"))
}

async fn write_member_state(
    tx: &mut Transaction<'_, Sqlite>,
    week_id: i64,
    member_id: &str,
    state: &MemberWeekState,
    updated_at: &str,
) -> Result<(), AppError> {
    let tasks_json = serde_json::to_string(&state.custom_tasks)
        .map_err(|e| AppError::Internal(format!("Failed to encode custom tasks: {}", e)))?;

    sqlx::query(
        r#"INSERT INTO member_week_state (
            week_id, member_id, weekly_focus_set, roleplay_done,
            first_meetings, signed_recruits, goals, notes, custom_tasks, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(week_id, member_id) DO UPDATE SET
            weekly_focus_set = excluded.weekly_focus_set,
            roleplay_done = excluded.roleplay_done,
            first_meetings = excluded.first_meetings,
            signed_recruits = excluded.signed_recruits,
            goals = excluded.goals,
            notes = excluded.notes,
            custom_tasks = excluded.custom_tasks,
            updated_at = excluded.updated_at"#,
    )
    .bind(week_id)
    .bind(member_id)
    .bind(state.checklist.weekly_focus_set as i32)
    .bind(state.checklist.roleplay_done as i32)
    .bind(i64::from(state.counters.first_meetings))
    .bind(i64::from(state.counters.signed_recruits))
    .bind(&state.goals)
    .bind(&state.notes)
    .bind(&tasks_json)
    .bind(updated_at)
    .execute(&mut **tx)
    .await?;

    // Roleplays are replaced as a whole; a repeated id within the list upserts
    sqlx::query("DELETE FROM roleplays WHERE week_id = ? AND member_id = ?")
        .bind(week_id)
        .bind(member_id)
        .execute(&mut **tx)
        .await?;

    for (position, entry) in state.roleplays.iter().enumerate() {
        sqlx::query(
            "INSERT INTO roleplays (id, week_id, member_id, type, note, timestamp, position)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(week_id, member_id, id) DO UPDATE SET
                type = excluded.type,
                note = excluded.note,
                timestamp = excluded.timestamp,
                position = excluded.position",
        )
        .bind(&entry.id)
        .bind(week_id)
        .bind(member_id)
        .bind(&entry.kind)
        .bind(&entry.note)
        .bind(&entry.timestamp)
        .bind(position as i64)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

async fn write_weekly_tasks(
    tx: &mut Transaction<'_, Sqlite>,
    week_id: i64,
    tasks: &[WeeklyTask],
    attendance: &Attendance,
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM task_attendance WHERE week_id = ?")
        .bind(week_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM weekly_tasks WHERE week_id = ?")
        .bind(week_id)
        .execute(&mut **tx)
        .await?;

    for (position, task) in tasks.iter().enumerate() {
        sqlx::query(
            "INSERT INTO weekly_tasks (id, week_id, label, position) VALUES (?, ?, ?, ?)
             ON CONFLICT(week_id, id) DO UPDATE SET label = excluded.label, position = excluded.position",
        )
        .bind(&task.id)
        .bind(week_id)
        .bind(&task.label)
        .bind(position as i64)
        .execute(&mut **tx)
        .await?;
    }

    for (task_id, members) in attendance {
        for (member_id, attended) in members {
            sqlx::query(
                "INSERT INTO task_attendance (week_id, task_id, member_id, attended) VALUES (?, ?, ?, ?)
                 ON CONFLICT(week_id, task_id, member_id) DO UPDATE SET attended = excluded.attended",
            )
            .bind(week_id)
            .bind(task_id)
            .bind(member_id)
            .bind(*attended as i32)
            .execute(&mut **tx)
            .await?;
        }
    }

    Ok(())
}

#[async_trait]
impl TrackerStore for RelationalRepository {
    async fn load_roster(&self, team_id: &str) -> Result<Option<Roster>, AppError> {
        let team = sqlx::query("SELECT roster_updated_at FROM teams WHERE id = ?")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;

        let updated_at: Option<String> = team.and_then(|row| row.get("roster_updated_at"));
        let Some(updated_at) = updated_at else {
            return Ok(None);
        };

        let rows = sqlx::query(
            "SELECT id, team_id, name, active, email, phone FROM members WHERE team_id = ? ORDER BY position",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Roster {
            schema_version: ROSTER_SCHEMA_VERSION,
            team_id: team_id.to_string(),
            updated_at,
            members: rows.iter().map(member_from_row).collect(),
        }))
    }

    async fn save_roster(&self, roster: &Roster) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        upsert_team(&mut tx, &roster.team_id).await?;
        sqlx::query("UPDATE teams SET roster_updated_at = ? WHERE id = ?")
            .bind(&roster.updated_at)
            .bind(&roster.team_id)
            .execute(&mut *tx)
            .await?;

        // Whole-roster replace, same as the document backend
        sqlx::query("DELETE FROM members WHERE team_id = ?")
            .bind(&roster.team_id)
            .execute(&mut *tx)
            .await?;

        for (position, member) in roster.members.iter().enumerate() {
            sqlx::query(
                "INSERT INTO members (id, team_id, name, active, email, phone, position, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&member.id)
            .bind(&roster.team_id)
            .bind(&member.name)
            .bind(member.active as i32)
            .bind(&member.email)
            .bind(&member.phone)
            .bind(position as i64)
            .bind(&roster.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load_week(
        &self,
        team_id: &str,
        iso_week: &str,
    ) -> Result<Option<WeekDocument>, AppError> {
        let week = sqlx::query(
            "SELECT id, schema_version, updated_at FROM weeks WHERE team_id = ? AND iso_week = ?",
        )
        .bind(team_id)
        .bind(iso_week)
        .fetch_optional(&self.pool)
        .await?;

        let Some(week) = week else {
            return Ok(None);
        };
        let week_id: i64 = week.get("id");

        let state_rows = sqlx::query(
            r#"SELECT member_id, weekly_focus_set, roleplay_done, first_meetings,
                      signed_recruits, goals, notes, custom_tasks
               FROM member_week_state WHERE week_id = ? ORDER BY member_id"#,
        )
        .bind(week_id)
        .fetch_all(&self.pool)
        .await?;

        let mut members = BTreeMap::new();
        for row in &state_rows {
            let member_id: String = row.get("member_id");
            let state = state_from_row(row).map_err(|e| {
                AppError::Internal(format!(
                    "Stored week {} member {} is malformed: {}",
                    iso_week, member_id, e
                ))
            })?;
            members.insert(member_id, state);
        }

        let roleplay_rows = sqlx::query(
            "SELECT id, member_id, type, note, timestamp FROM roleplays WHERE week_id = ? ORDER BY member_id, position",
        )
        .bind(week_id)
        .fetch_all(&self.pool)
        .await?;

        for row in &roleplay_rows {
            let member_id: String = row.get("member_id");
            if let Some(state) = members.get_mut(&member_id) {
                state.roleplays.push(RoleplayEntry {
                    id: row.get("id"),
                    kind: row.get("type"),
                    note: row.get("note"),
                    timestamp: row.get("timestamp"),
                });
            }
        }

        let task_rows =
            sqlx::query("SELECT id, label FROM weekly_tasks WHERE week_id = ? ORDER BY position")
                .bind(week_id)
                .fetch_all(&self.pool)
                .await?;
        let weekly_tasks = task_rows
            .iter()
            .map(|row| WeeklyTask {
                id: row.get("id"),
                label: row.get("label"),
            })
            .collect();

        let attendance_rows = sqlx::query(
            "SELECT task_id, member_id, attended FROM task_attendance WHERE week_id = ?",
        )
        .bind(week_id)
        .fetch_all(&self.pool)
        .await?;
        let mut attendance = Attendance::new();
        for row in &attendance_rows {
            let attended: i32 = row.get("attended");
            attendance
                .entry(row.get("task_id"))
                .or_default()
                .insert(row.get("member_id"), attended != 0);
        }

        Ok(Some(WeekDocument {
            schema_version: week.get("schema_version"),
            team_id: team_id.to_string(),
            iso_week: iso_week.to_string(),
            updated_at: week.get("updated_at"),
            members,
            weekly_tasks,
            attendance,
        }))
    }

    async fn save_week(&self, week: &WeekDocument) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        upsert_team(&mut tx, &week.team_id).await?;
        let week_id = upsert_week(
            &mut tx,
            &week.team_id,
            &week.iso_week,
            week.schema_version,
            &week.updated_at,
        )
        .await?;

        for (member_id, state) in &week.members {
            write_member_state(&mut tx, week_id, member_id, state, &week.updated_at).await?;
        }
        write_weekly_tasks(&mut tx, week_id, &week.weekly_tasks, &week.attendance).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_weeks(&self, team_id: &str) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("SELECT iso_week FROM weeks WHERE team_id = ? ORDER BY iso_week")
            .bind(team_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("iso_week")).collect())
    }

    async fn ensure_week_indexed(&self, team_id: &str, iso_week: &str) -> Result<(), AppError> {
        // The weeks table is the index; a row exists once the week has been saved
        let mut tx = self.pool.begin().await?;
        upsert_team(&mut tx, team_id).await?;
        sqlx::query(
            "INSERT INTO weeks (team_id, iso_week, schema_version, updated_at) VALUES (?, ?, 1, ?)
             ON CONFLICT(team_id, iso_week) DO NOTHING",
        )
        .bind(team_id)
        .bind(iso_week)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn append_audit_event(
        &self,
        team_id: &str,
        iso_week: &str,
        event: &AuditEvent,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO audit_events (id, team_id, iso_week, timestamp, actor, action, summary)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.id)
        .bind(team_id)
        .bind(iso_week)
        .bind(&event.timestamp)
        .bind(&event.actor)
        .bind(&event.action)
        .bind(&event.summary)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_audit_events(
        &self,
        team_id: &str,
        iso_week: &str,
    ) -> Result<Vec<AuditEvent>, AppError> {
        let rows = sqlx::query(
            "SELECT id, timestamp, actor, action, summary FROM audit_events
             WHERE team_id = ? AND iso_week = ? ORDER BY seq",
        )
        .bind(team_id)
        .bind(iso_week)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| AuditEvent {
                id: row.get("id"),
                timestamp: row.get("timestamp"),
                actor: row.get("actor"),
                action: row.get("action"),
                summary: row.get("summary"),
            })
            .collect())
    }
}

// Helper functions for row conversion

fn member_from_row(row: &sqlx::sqlite::SqliteRow) -> Member {
    let active: i32 = row.get("active");
    Member {
        id: row.get("id"),
        name: row.get("name"),
        active: active != 0,
        email: row.get("email"),
        phone: row.get("phone"),
        team_id: row.get("team_id"),
    }
}

fn state_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<MemberWeekState, String> {
    let weekly_focus_set: i32 = row.get("weekly_focus_set");
    let roleplay_done: i32 = row.get("roleplay_done");
    let first_meetings: i64 = row.get("first_meetings");
    let signed_recruits: i64 = row.get("signed_recruits");
    let tasks_str: String = row.get("custom_tasks");

    Ok(MemberWeekState {
        checklist: Checklist {
            weekly_focus_set: weekly_focus_set != 0,
            roleplay_done: roleplay_done != 0,
        },
        counters: Counters {
            first_meetings: parse_counter("first_meetings", first_meetings)?,
            signed_recruits: parse_counter("signed_recruits", signed_recruits)?,
        },
        goals: row.get("goals"),
        notes: row.get("notes"),
        custom_tasks: parse_tasks(&tasks_str)?,
        roleplays: Vec::new(),
    })
}

fn parse_counter(column: &str, value: i64) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("{} out of range: {}", column, value))
}

fn parse_tasks(s: &str) -> Result<Vec<CustomTask>, String> {
    serde_json::from_str(s).map_err(|e| format!("custom_tasks is not a task list: {}", e))
}
