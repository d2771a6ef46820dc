//! Week document model: one document per (team, ISO week), keyed by member id.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Schema version stamped on stored week documents.
pub const WEEK_SCHEMA_VERSION: i32 = 1;

/// Weekly checklist flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    #[serde(default)]
    pub weekly_focus_set: bool,
    #[serde(default)]
    pub roleplay_done: bool,
}

/// Weekly activity counters. Unsigned, so they can never drop below zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    #[serde(default)]
    pub first_meetings: u32,
    #[serde(default)]
    pub signed_recruits: u32,
}

/// A member-scoped task with its own completion flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTask {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub done: bool,
}

/// One logged roleplay session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleplayEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub note: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

/// Everything tracked for one member in one week.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberWeekState {
    #[serde(default)]
    pub checklist: Checklist,
    #[serde(default)]
    pub counters: Counters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub custom_tasks: Vec<CustomTask>,
    #[serde(default)]
    pub roleplays: Vec<RoleplayEntry>,
}

/// A team-scoped task for the week; attendance is tracked separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTask {
    pub id: String,
    pub label: String,
}

/// `task id -> member id -> attended`
pub type Attendance = BTreeMap<String, BTreeMap<String, bool>>;

/// The stored state of one team for one ISO week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekDocument {
    pub schema_version: i32,
    pub team_id: String,
    pub iso_week: String,
    pub updated_at: String,
    #[serde(default)]
    pub members: BTreeMap<String, MemberWeekState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekly_tasks: Vec<WeeklyTask>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attendance: Attendance,
}

// ==================== PARTIAL UPDATES ====================

/// Checklist keys present in a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistPatch {
    #[serde(default)]
    pub weekly_focus_set: Option<bool>,
    #[serde(default)]
    pub roleplay_done: Option<bool>,
}

/// Counter keys present in a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountersPatch {
    #[serde(default)]
    pub first_meetings: Option<u32>,
    #[serde(default)]
    pub signed_recruits: Option<u32>,
}

/// Partial update for one member's week state. Absent fields leave state untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberWeekPatch {
    #[serde(default)]
    pub checklist: Option<ChecklistPatch>,
    #[serde(default)]
    pub counters: Option<CountersPatch>,
    #[serde(default)]
    pub custom_tasks: Option<Vec<CustomTask>>,
    #[serde(default)]
    pub roleplays: Option<Vec<RoleplayEntry>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub goals: Option<String>,
}

/// Request body for patching a week document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekPatch {
    #[serde(default, deserialize_with = "members_or_empty")]
    pub members: BTreeMap<String, MemberWeekPatch>,
    #[serde(default)]
    pub weekly_tasks: Option<Vec<WeeklyTask>>,
    #[serde(default)]
    pub attendance: Option<Attendance>,
    /// Free-text summary recorded in the audit log
    #[serde(default)]
    pub summary: Option<String>,
}

/// `null` for the whole map or for one member reads as an empty patch.
fn members_or_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, MemberWeekPatch>, D::Error>
where
    D: Deserializer<'de>,
{
    let members: Option<BTreeMap<String, Option<MemberWeekPatch>>> =
        Option::deserialize(deserializer)?;
    Ok(members
        .unwrap_or_default()
        .into_iter()
        .map(|(member_id, patch)| (member_id, patch.unwrap_or_default()))
        .collect())
}
