//! JSON document backend.
//!
//! Every record is one JSON value under a string key:
//! - `roster/{team}`
//! - `weeks/{team}/{week}`
//! - `weeks-index/{team}` (sorted array of week ids)
//! - `audit/{team}/{week}`
//!
//! Each key is written independently; there is no transaction across keys.

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use super::TrackerStore;
use crate::errors::AppError;
use crate::models::{AuditEvent, AuditLog, Roster, WeekDocument};

/// Raw key/value access to JSON documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, AppError>;

    async fn put(&self, key: &str, value: &Value) -> Result<(), AppError>;
}

/// Document store kept in the SQLite `documents` table.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, AppError> {
        let row = sqlx::query("SELECT value FROM documents WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.get("value");
                let value = serde_json::from_str(&raw).map_err(|e| {
                    AppError::Internal(format!("Stored document {} is not valid JSON: {}", key, e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &Value) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO documents (key, value, content_type, updated_at) VALUES (?, ?, 'application/json', ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value.to_string())
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// Key scheme

fn roster_key(team_id: &str) -> String {
    format!("roster/{}", team_id)
}

fn week_key(team_id: &str, iso_week: &str) -> String {
    format!("weeks/{}/{}", team_id, iso_week)
}

fn week_index_key(team_id: &str) -> String {
    format!("weeks-index/{}", team_id)
}

fn audit_key(team_id: &str, iso_week: &str) -> String {
    format!("audit/{}/{}", team_id, iso_week)
}

/// Tracker storage laid out as JSON documents.
pub struct DocumentRepository<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> DocumentRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        match self.store.get(key).await? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                AppError::Internal(format!("Stored document {} is malformed: {}", key, e))
            }),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let value = serde_json::to_value(value)
            .map_err(|e| AppError::Internal(format!("Failed to encode {}: {}", key, e)))?;
        self.store.put(key, &value).await
    }
}

#[async_trait]
impl<S: DocumentStore> TrackerStore for DocumentRepository<S> {
    async fn load_roster(&self, team_id: &str) -> Result<Option<Roster>, AppError> {
        self.read(&roster_key(team_id)).await
    }

    async fn save_roster(&self, roster: &Roster) -> Result<(), AppError> {
        self.write(&roster_key(&roster.team_id), roster).await
    }

    async fn load_week(
        &self,
        team_id: &str,
        iso_week: &str,
    ) -> Result<Option<WeekDocument>, AppError> {
        self.read(&week_key(team_id, iso_week)).await
    }

    async fn save_week(&self, week: &WeekDocument) -> Result<(), AppError> {
        self.write(&week_key(&week.team_id, &week.iso_week), week)
            .await
    }

    async fn list_weeks(&self, team_id: &str) -> Result<Vec<String>, AppError> {
        let mut weeks: Vec<String> = self
            .read(&week_index_key(team_id))
            .await?
            .unwrap_or_default();
        weeks.sort();
        weeks.dedup();
        Ok(weeks)
    }

    async fn ensure_week_indexed(&self, team_id: &str, iso_week: &str) -> Result<(), AppError> {
        let key = week_index_key(team_id);
        let mut weeks: Vec<String> = self.read(&key).await?.unwrap_or_default();
        if weeks.iter().any(|w| w == iso_week) {
            return Ok(());
        }

        weeks.push(iso_week.to_string());
        weeks.sort();
        weeks.dedup();
        self.write(&key, &weeks).await
    }

    async fn append_audit_event(
        &self,
        team_id: &str,
        iso_week: &str,
        event: &AuditEvent,
    ) -> Result<(), AppError> {
        let key = audit_key(team_id, iso_week);
        let mut log: AuditLog = self
            .read(&key)
            .await?
            .unwrap_or_else(|| AuditLog::new(team_id, iso_week));
        log.events.push(event.clone());
        self.write(&key, &log).await
    }

    async fn load_audit_events(
        &self,
        team_id: &str,
        iso_week: &str,
    ) -> Result<Vec<AuditEvent>, AppError> {
        let log: Option<AuditLog> = self.read(&audit_key(team_id, iso_week)).await?;
        Ok(log.map(|l| l.events).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::models::{Member, MemberWeekState};
    use tempfile::TempDir;

    async fn repo() -> (DocumentRepository<SqliteDocumentStore>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("docs.sqlite"))
            .await
            .expect("Failed to init DB");
        (DocumentRepository::new(SqliteDocumentStore::new(pool)), temp_dir)
    }

    fn week(team: &str, iso_week: &str) -> WeekDocument {
        let mut roster = Roster::empty(team, "2024-01-01T00:00:00+00:00");
        roster.members.push(Member {
            id: "m-1".to_string(),
            name: "Dana".to_string(),
            active: true,
            email: None,
            phone: None,
            team_id: team.to_string(),
        });
        crate::tracker::default_week(team, iso_week, &roster, "2024-01-01T00:00:00+00:00")
    }

    #[tokio::test]
    async fn test_raw_store_get_put() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("raw.sqlite")).await.unwrap();
        let store = SqliteDocumentStore::new(pool);

        assert!(store.get("roster/braxton").await.unwrap().is_none());

        store
            .put("roster/braxton", &serde_json::json!({ "a": 1 }))
            .await
            .unwrap();
        store
            .put("roster/braxton", &serde_json::json!({ "a": 2 }))
            .await
            .unwrap();
        assert_eq!(
            store.get("roster/braxton").await.unwrap(),
            Some(serde_json::json!({ "a": 2 }))
        );
    }

    #[tokio::test]
    async fn test_week_round_trip_through_key() {
        let (repo, _dir) = repo().await;
        assert!(repo.load_week("braxton", "2024-W01").await.unwrap().is_none());

        let mut doc = week("braxton", "2024-W01");
        doc.members.get_mut("m-1").unwrap().notes = "kept".to_string();
        repo.save_week(&doc).await.unwrap();

        let loaded = repo.load_week("braxton", "2024-W01").await.unwrap().unwrap();
        assert_eq!(loaded, doc);
        assert!(repo.load_week("other", "2024-W01").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_week_index_is_sorted_and_unique() {
        let (repo, _dir) = repo().await;
        for w in ["2024-W05", "2024-W01", "2024-W03", "2024-W01"] {
            repo.ensure_week_indexed("braxton", w).await.unwrap();
        }
        assert_eq!(
            repo.list_weeks("braxton").await.unwrap(),
            vec!["2024-W01", "2024-W03", "2024-W05"]
        );
        assert!(repo.list_weeks("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_audit_events_append_in_order() {
        let (repo, _dir) = repo().await;
        let first = AuditEvent::week_patch("A", Some("one"), "2024-01-01T00:00:00+00:00");
        let second = AuditEvent::week_patch("B", Some("two"), "2024-01-01T00:01:00+00:00");
        repo.append_audit_event("braxton", "2024-W01", &first).await.unwrap();
        repo.append_audit_event("braxton", "2024-W01", &second).await.unwrap();

        let events = repo.load_audit_events("braxton", "2024-W01").await.unwrap();
        assert_eq!(events, vec![first, second]);
        assert!(repo
            .load_audit_events("braxton", "2024-W02")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_malformed_stored_week_is_internal_error() {
        let (repo, _dir) = repo().await;
        repo.store
            .put("weeks/braxton/2024-W01", &serde_json::json!({ "members": 3 }))
            .await
            .unwrap();

        let err = repo.load_week("braxton", "2024-W01").await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_documents_tolerate_missing_optional_fields() {
        let (repo, _dir) = repo().await;
        repo.store
            .put(
                "weeks/braxton/2024-W01",
                &serde_json::json!({
                    "schemaVersion": 1,
                    "teamId": "braxton",
                    "isoWeek": "2024-W01",
                    "updatedAt": "2024-01-01T00:00:00.000Z",
                    "members": { "m-1": { "checklist": { "weeklyFocusSet": true } } }
                }),
            )
            .await
            .unwrap();

        let loaded = repo.load_week("braxton", "2024-W01").await.unwrap().unwrap();
        let state = &loaded.members["m-1"];
        assert!(state.checklist.weekly_focus_set);
        assert_eq!(state.counters, MemberWeekState::default().counters);
    }
}
