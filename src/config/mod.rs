//! Configuration module for the Fit Hub backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::FixedOffset;

/// Which persistence layout backs the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// One JSON document per key (`weeks/{team}/{week}`, `roster/{team}`, ...)
    Documents,
    /// Normalized tables (teams, members, weeks, member_week_state, ...)
    Relational,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Documents => "documents",
            StorageBackend::Relational => "relational",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "documents" | "json" | "blobs" => Some(StorageBackend::Documents),
            "relational" | "sql" => Some(StorageBackend::Relational),
            _ => None,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Admin token required on every API call (auth disabled when absent)
    pub admin_token: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Persistence layout
    pub storage: StorageBackend,
    /// Teams walked by the all-teams history export, in this order
    pub teams: Vec<String>,
    /// Store default week documents and rosters the first time they are read
    pub persist_on_read: bool,
    /// UTC offset used to decide which ISO week "now" falls in
    pub week_offset: FixedOffset,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let admin_token = env::var("FITHUB_ADMIN_TOKEN")
            .ok()
            .filter(|token| !token.is_empty());

        let db_path = env::var("FITHUB_DB_PATH")
            .unwrap_or_else(|_| "./data/fithub.sqlite".to_string())
            .into();

        let bind_addr = env::var("FITHUB_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| format!("Invalid FITHUB_BIND_ADDR format: {}", e))?;

        let log_level = env::var("FITHUB_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let storage = match env::var("FITHUB_STORAGE") {
            Ok(value) => StorageBackend::parse(&value)
                .ok_or_else(|| format!("Invalid FITHUB_STORAGE value: {}", value))?,
            Err(_) => StorageBackend::Documents,
        };

        let teams = parse_team_list(
            &env::var("FITHUB_TEAMS").unwrap_or_else(|_| "braxton".to_string()),
        );

        let persist_on_read = env::var("FITHUB_PERSIST_ON_READ")
            .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
            .unwrap_or(false);

        let offset_minutes: i32 = match env::var("FITHUB_UTC_OFFSET_MINUTES") {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e| format!("Invalid FITHUB_UTC_OFFSET_MINUTES: {}", e))?,
            Err(_) => 0,
        };
        let week_offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| format!("FITHUB_UTC_OFFSET_MINUTES out of range: {}", offset_minutes))?;

        Ok(Self {
            admin_token,
            db_path,
            bind_addr,
            log_level,
            storage,
            teams,
            persist_on_read,
            week_offset,
        })
    }
}

fn parse_team_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|team| !team.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("FITHUB_ADMIN_TOKEN");
        env::remove_var("FITHUB_DB_PATH");
        env::remove_var("FITHUB_BIND_ADDR");
        env::remove_var("FITHUB_LOG_LEVEL");
        env::remove_var("FITHUB_STORAGE");
        env::remove_var("FITHUB_TEAMS");
        env::remove_var("FITHUB_PERSIST_ON_READ");
        env::remove_var("FITHUB_UTC_OFFSET_MINUTES");

        let config = Config::from_env().unwrap();

        assert!(config.admin_token.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/fithub.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.storage, StorageBackend::Documents);
        assert_eq!(config.teams, vec!["braxton".to_string()]);
        assert!(!config.persist_on_read);
        assert_eq!(config.week_offset.local_minus_utc(), 0);
    }

    #[test]
    fn test_team_list_parsing() {
        assert_eq!(
            parse_team_list(" braxton, west ,,east"),
            vec!["braxton", "west", "east"]
        );
        assert!(parse_team_list("").is_empty());
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!(
            StorageBackend::parse("Relational"),
            Some(StorageBackend::Relational)
        );
        assert_eq!(StorageBackend::parse("json"), Some(StorageBackend::Documents));
        assert_eq!(StorageBackend::parse("postgres"), None);
        assert_eq!(StorageBackend::Relational.as_str(), "relational");
    }
}
