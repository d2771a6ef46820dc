//! Roster member model matching the admin UI roster interface.

use serde::{Deserialize, Serialize};

/// Schema version stamped on stored rosters.
pub const ROSTER_SCHEMA_VERSION: i32 = 1;

/// A sales-team member tracked week by week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub team_id: String,
}

/// The full member list of one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    pub schema_version: i32,
    pub team_id: String,
    pub updated_at: String,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl Roster {
    /// An empty roster, used when a team has never saved one.
    pub fn empty(team_id: &str, now: &str) -> Self {
        Self {
            schema_version: ROSTER_SCHEMA_VERSION,
            team_id: team_id.to_string(),
            updated_at: now.to_string(),
            members: Vec::new(),
        }
    }
}

/// Contact details nested under `meta`, as older clients send them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberMeta {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// One member entry in a roster save request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInput {
    /// Missing ids are assigned on save
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub meta: Option<MemberMeta>,
}

impl MemberInput {
    /// Top-level contact fields win over the nested `meta` ones; blanks become `None`.
    pub fn contact(&self) -> (Option<String>, Option<String>) {
        let meta = self.meta.clone().unwrap_or_default();
        let email = non_blank(self.email.clone().or(meta.email));
        let phone = non_blank(self.phone.clone().or(meta.phone));
        (email, phone)
    }
}

/// Request body for replacing a team's roster.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRosterRequest {
    #[serde(default)]
    pub members: Vec<MemberInput>,
}

fn default_active() -> bool {
    true
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
