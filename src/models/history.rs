//! History export shapes.

use serde::Serialize;

use super::WeekDocument;

/// Which history to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryScope {
    Team(String),
    AllTeams,
}

/// One week of one team in an all-teams export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamWeekEntry {
    pub team_id: String,
    pub iso_week: String,
    pub data: WeekDocument,
}

/// Export payload; a single team exports bare documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HistoryExport {
    Team(Vec<WeekDocument>),
    AllTeams(Vec<TeamWeekEntry>),
}

impl HistoryExport {
    /// `(team id, iso week)` pairs in export order.
    #[cfg(test)]
    pub fn keys(&self) -> Vec<(String, String)> {
        match self {
            HistoryExport::Team(weeks) => weeks
                .iter()
                .map(|w| (w.team_id.clone(), w.iso_week.clone()))
                .collect(),
            HistoryExport::AllTeams(entries) => entries
                .iter()
                .map(|e| (e.team_id.clone(), e.iso_week.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            HistoryExport::Team(weeks) => weeks.len(),
            HistoryExport::AllTeams(entries) => entries.len(),
        }
    }
}

/// Response body for the weeks listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekList {
    pub team_id: String,
    pub weeks: Vec<String>,
}
