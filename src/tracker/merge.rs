//! Default-state construction and patch merging for week documents.
//!
//! Everything here is pure: no clock reads, no storage. Callers pass `now` in
//! and persist the result.
//!
//! Merge rules, field by field:
//! - checklist flags and counters merge key by key; only keys present in the patch overwrite
//! - `customTasks`, `roleplays` and `weeklyTasks` are replaced wholesale when supplied
//! - `notes` and `goals` are replaced when supplied
//! - attendance merges per task, then per member

use std::collections::BTreeMap;

use crate::models::{
    Attendance, Checklist, ChecklistPatch, Counters, CountersPatch, MemberWeekPatch,
    MemberWeekState, Roster, WeekDocument, WeekPatch, WEEK_SCHEMA_VERSION,
};

/// A fresh week document with one default state per roster member.
pub fn default_week(team_id: &str, iso_week: &str, roster: &Roster, now: &str) -> WeekDocument {
    let members = roster
        .members
        .iter()
        .map(|member| (member.id.clone(), MemberWeekState::default()))
        .collect();

    WeekDocument {
        schema_version: WEEK_SCHEMA_VERSION,
        team_id: team_id.to_string(),
        iso_week: iso_week.to_string(),
        updated_at: now.to_string(),
        members,
        weekly_tasks: Vec::new(),
        attendance: Attendance::new(),
    }
}

/// Add default states for roster members the document does not know yet.
/// Returns how many were added.
pub fn backfill_roster(week: &mut WeekDocument, roster: &Roster) -> usize {
    let mut added = 0;
    for member in &roster.members {
        if !week.members.contains_key(&member.id) {
            week.members
                .insert(member.id.clone(), MemberWeekState::default());
            added += 1;
        }
    }
    added
}

/// Merge one member's partial update into their current state.
pub fn merge_member(current: &MemberWeekState, patch: &MemberWeekPatch) -> MemberWeekState {
    let mut next = current.clone();

    if let Some(checklist) = &patch.checklist {
        next.checklist = merge_checklist(&current.checklist, checklist);
    }
    if let Some(counters) = &patch.counters {
        next.counters = merge_counters(&current.counters, counters);
    }
    if let Some(tasks) = &patch.custom_tasks {
        next.custom_tasks = tasks.clone();
    }
    if let Some(roleplays) = &patch.roleplays {
        next.roleplays = roleplays.clone();
    }
    if let Some(notes) = &patch.notes {
        next.notes = notes.clone();
    }
    if let Some(goals) = &patch.goals {
        next.goals = Some(goals.clone());
    }

    next
}

fn merge_checklist(current: &Checklist, patch: &ChecklistPatch) -> Checklist {
    Checklist {
        weekly_focus_set: patch.weekly_focus_set.unwrap_or(current.weekly_focus_set),
        roleplay_done: patch.roleplay_done.unwrap_or(current.roleplay_done),
    }
}

fn merge_counters(current: &Counters, patch: &CountersPatch) -> Counters {
    Counters {
        first_meetings: patch.first_meetings.unwrap_or(current.first_meetings),
        signed_recruits: patch.signed_recruits.unwrap_or(current.signed_recruits),
    }
}

/// Merge an attendance patch. Task entries merge member by member.
pub fn merge_attendance(current: &Attendance, patch: &Attendance) -> Attendance {
    let mut next = current.clone();
    for (task_id, members) in patch {
        let entry = next.entry(task_id.clone()).or_insert_with(BTreeMap::new);
        for (member_id, attended) in members {
            entry.insert(member_id.clone(), *attended);
        }
    }
    next
}

/// Apply a week-level patch and stamp `updated_at`.
///
/// Members missing from the patch keep their state; members in the patch but
/// not in the document start from the default state.
pub fn apply_week_patch(week: WeekDocument, patch: &WeekPatch, now: &str) -> WeekDocument {
    let mut next = week;

    for (member_id, member_patch) in &patch.members {
        let merged = match next.members.get(member_id) {
            Some(current) => merge_member(current, member_patch),
            None => merge_member(&MemberWeekState::default(), member_patch),
        };
        next.members.insert(member_id.clone(), merged);
    }

    if let Some(tasks) = &patch.weekly_tasks {
        next.weekly_tasks = tasks.clone();
    }
    if let Some(attendance) = &patch.attendance {
        next.attendance = merge_attendance(&next.attendance, attendance);
    }
    // Attendance only makes sense for tasks the week still has
    let task_ids: Vec<&str> = next.weekly_tasks.iter().map(|t| t.id.as_str()).collect();
    next.attendance
        .retain(|task_id, _| task_ids.contains(&task_id.as_str()));

    next.updated_at = now.to_string();
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomTask, Member, RoleplayEntry, WeeklyTask};
    use serde_json::json;

    const NOW: &str = "2024-01-08T12:00:00+00:00";
    const LATER: &str = "2024-01-09T08:00:00+00:00";

    fn roster(ids: &[&str]) -> Roster {
        let mut roster = Roster::empty("braxton", NOW);
        roster.members = ids
            .iter()
            .map(|id| Member {
                id: id.to_string(),
                name: format!("Member {}", id),
                active: true,
                email: None,
                phone: None,
                team_id: "braxton".to_string(),
            })
            .collect();
        roster
    }

    fn busy_state() -> MemberWeekState {
        MemberWeekState {
            checklist: Checklist {
                weekly_focus_set: true,
                roleplay_done: false,
            },
            counters: Counters {
                first_meetings: 3,
                signed_recruits: 1,
            },
            goals: Some("Book 5 meetings".to_string()),
            notes: "Strong start".to_string(),
            custom_tasks: vec![CustomTask {
                id: "t-1".to_string(),
                label: "Call back referrals".to_string(),
                done: false,
            }],
            roleplays: vec![RoleplayEntry {
                id: "rp-1".to_string(),
                kind: "pitch".to_string(),
                note: "Good opener".to_string(),
                timestamp: NOW.to_string(),
            }],
        }
    }

    fn patch(value: serde_json::Value) -> MemberWeekPatch {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_default_state_is_blank() {
        let state = MemberWeekState::default();
        assert!(!state.checklist.weekly_focus_set);
        assert!(!state.checklist.roleplay_done);
        assert_eq!(state.counters.first_meetings, 0);
        assert_eq!(state.counters.signed_recruits, 0);
        assert!(state.custom_tasks.is_empty());
        assert!(state.roleplays.is_empty());
        assert_eq!(state.notes, "");
        assert!(state.goals.is_none());
    }

    #[test]
    fn test_default_week_has_state_per_roster_member() {
        let week = default_week("braxton", "2024-W02", &roster(&["a", "b"]), NOW);
        assert_eq!(week.schema_version, WEEK_SCHEMA_VERSION);
        assert_eq!(week.team_id, "braxton");
        assert_eq!(week.iso_week, "2024-W02");
        assert_eq!(week.updated_at, NOW);
        assert_eq!(week.members.len(), 2);
        assert_eq!(week.members["a"], MemberWeekState::default());
        assert!(week.weekly_tasks.is_empty());
    }

    #[test]
    fn test_default_week_from_empty_roster() {
        let week = default_week("braxton", "2024-W02", &roster(&[]), NOW);
        assert!(week.members.is_empty());
    }

    #[test]
    fn test_empty_patch_is_identity() {
        let state = busy_state();
        assert_eq!(merge_member(&state, &MemberWeekPatch::default()), state);
        assert_eq!(merge_member(&state, &patch(json!({}))), state);
    }

    #[test]
    fn test_empty_checklist_and_counters_are_noops() {
        let state = busy_state();
        let merged = merge_member(&state, &patch(json!({ "checklist": {}, "counters": {} })));
        assert_eq!(merged, state);
    }

    #[test]
    fn test_counter_patch_touches_only_named_key() {
        let state = busy_state();
        let merged = merge_member(&state, &patch(json!({ "counters": { "firstMeetings": 5 } })));
        assert_eq!(merged.counters.first_meetings, 5);
        assert_eq!(merged.counters.signed_recruits, state.counters.signed_recruits);
        assert_eq!(merged.checklist, state.checklist);
    }

    #[test]
    fn test_checklist_patch_touches_only_named_key() {
        let state = busy_state();
        let merged = merge_member(&state, &patch(json!({ "checklist": { "roleplayDone": true } })));
        assert!(merged.checklist.roleplay_done);
        assert!(merged.checklist.weekly_focus_set);
    }

    #[test]
    fn test_empty_task_list_replaces_existing_tasks() {
        let state = busy_state();
        let merged = merge_member(&state, &patch(json!({ "customTasks": [] })));
        assert!(merged.custom_tasks.is_empty());
        assert_eq!(merged.roleplays, state.roleplays);
    }

    #[test]
    fn test_roleplays_replace_wholesale() {
        let state = busy_state();
        let merged = merge_member(
            &state,
            &patch(json!({
                "roleplays": [
                    { "id": "rp-2", "type": "close", "note": "", "timestamp": LATER }
                ]
            })),
        );
        assert_eq!(merged.roleplays.len(), 1);
        assert_eq!(merged.roleplays[0].id, "rp-2");
    }

    #[test]
    fn test_notes_and_goals_replace() {
        let state = busy_state();
        let merged = merge_member(&state, &patch(json!({ "notes": "", "goals": "Sign 2" })));
        assert_eq!(merged.notes, "");
        assert_eq!(merged.goals.as_deref(), Some("Sign 2"));

        let untouched = merge_member(&state, &patch(json!({ "counters": {} })));
        assert_eq!(untouched.notes, "Strong start");
        assert_eq!(untouched.goals.as_deref(), Some("Book 5 meetings"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let state = busy_state();
        let p = patch(json!({
            "checklist": { "roleplayDone": true },
            "counters": { "signedRecruits": 4 },
            "customTasks": [{ "id": "t-9", "label": "Prep deck", "done": true }],
            "notes": "Updated"
        }));
        let once = merge_member(&state, &p);
        let twice = merge_member(&once, &p);
        assert_eq!(once, twice);
        assert_eq!(twice.counters.signed_recruits, 4);
    }

    #[test]
    fn test_week_patch_leaves_unpatched_members_alone() {
        let mut week = default_week("braxton", "2024-W02", &roster(&["a", "b"]), NOW);
        week.members.insert("b".to_string(), busy_state());

        let week_patch: WeekPatch = serde_json::from_value(json!({
            "members": { "a": { "counters": { "firstMeetings": 2 } } }
        }))
        .unwrap();
        let next = apply_week_patch(week, &week_patch, LATER);

        assert_eq!(next.members["a"].counters.first_meetings, 2);
        assert_eq!(next.members["b"], busy_state());
        assert_eq!(next.updated_at, LATER);
    }

    #[test]
    fn test_week_patch_creates_unknown_member_from_default() {
        let week = default_week("braxton", "2024-W02", &roster(&[]), NOW);
        let week_patch: WeekPatch = serde_json::from_value(json!({
            "members": { "new": { "notes": "first week" } }
        }))
        .unwrap();
        let next = apply_week_patch(week, &week_patch, LATER);

        let state = &next.members["new"];
        assert_eq!(state.notes, "first week");
        assert_eq!(state.counters, Counters::default());
    }

    #[test]
    fn test_null_member_patch_keeps_or_creates_default_state() {
        let mut week = default_week("braxton", "2024-W02", &roster(&["a"]), NOW);
        week.members.insert("a".to_string(), busy_state());

        let week_patch: WeekPatch =
            serde_json::from_value(json!({ "members": { "a": null, "z": null } })).unwrap();
        let next = apply_week_patch(week, &week_patch, LATER);

        assert_eq!(next.members["a"], busy_state());
        assert_eq!(next.members["z"], MemberWeekState::default());
        assert_eq!(next.updated_at, LATER);
    }

    #[test]
    fn test_backfill_adds_only_missing_members() {
        let mut week = default_week("braxton", "2024-W02", &roster(&["a"]), NOW);
        week.members.insert("a".to_string(), busy_state());

        let added = backfill_roster(&mut week, &roster(&["a", "b", "c"]));
        assert_eq!(added, 2);
        assert_eq!(week.members["a"], busy_state());
        assert_eq!(week.members["c"], MemberWeekState::default());

        assert_eq!(backfill_roster(&mut week, &roster(&["a", "b", "c"])), 0);
    }

    #[test]
    fn test_attendance_merges_per_member() {
        let mut week = default_week("braxton", "2024-W02", &roster(&["a", "b"]), NOW);
        week.weekly_tasks = vec![WeeklyTask {
            id: "wt-1".to_string(),
            label: "Team huddle".to_string(),
        }];
        week.attendance
            .entry("wt-1".to_string())
            .or_default()
            .insert("a".to_string(), true);

        let week_patch: WeekPatch = serde_json::from_value(json!({
            "attendance": { "wt-1": { "b": true } }
        }))
        .unwrap();
        let next = apply_week_patch(week, &week_patch, LATER);

        assert_eq!(next.attendance["wt-1"].get("a"), Some(&true));
        assert_eq!(next.attendance["wt-1"].get("b"), Some(&true));
    }

    #[test]
    fn test_replacing_weekly_tasks_prunes_attendance() {
        let mut week = default_week("braxton", "2024-W02", &roster(&["a"]), NOW);
        week.weekly_tasks = vec![WeeklyTask {
            id: "wt-1".to_string(),
            label: "Team huddle".to_string(),
        }];
        week.attendance
            .entry("wt-1".to_string())
            .or_default()
            .insert("a".to_string(), true);

        let week_patch: WeekPatch = serde_json::from_value(json!({
            "weeklyTasks": [{ "id": "wt-2", "label": "Ride-along" }],
            "attendance": { "wt-2": { "a": false } }
        }))
        .unwrap();
        let next = apply_week_patch(week, &week_patch, LATER);

        assert_eq!(next.weekly_tasks.len(), 1);
        assert!(!next.attendance.contains_key("wt-1"));
        assert_eq!(next.attendance["wt-2"].get("a"), Some(&false));
    }

    #[test]
    fn test_week_patch_is_idempotent() {
        let week = default_week("braxton", "2024-W02", &roster(&["a"]), NOW);
        let week_patch: WeekPatch = serde_json::from_value(json!({
            "members": { "a": { "counters": { "firstMeetings": 1 }, "notes": "x" } },
            "weeklyTasks": [{ "id": "wt-1", "label": "Huddle" }],
            "attendance": { "wt-1": { "a": true } }
        }))
        .unwrap();
        let once = apply_week_patch(week, &week_patch, LATER);
        let twice = apply_week_patch(once.clone(), &week_patch, LATER);
        assert_eq!(once, twice);
    }
}
