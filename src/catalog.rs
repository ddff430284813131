//! Static content for the explore, records and history screens.
//!
//! Records and history are sample data; nothing here is persisted.

use chrono::NaiveDate;
use serde::Serialize;

pub const TRENDING_TOPICS: [&str; 4] = [
    "Healthy eating",
    "Mental health tips",
    "Sleep hygiene",
    "Managing stress",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: &'static str,
    pub title: &'static str,
    pub summary: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: &'static str,
    pub title: &'static str,
    pub date: NaiveDate,
}

pub fn trending_topics() -> &'static [&'static str] {
    &TRENDING_TOPICS
}

/// Look up a trending topic by 1-based position or case-insensitive name.
pub fn find_trending(query: &str) -> Option<&'static str> {
    let query = query.trim();
    if let Ok(index) = query.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| TRENDING_TOPICS.get(i)).copied();
    }
    TRENDING_TOPICS
        .iter()
        .find(|t| t.eq_ignore_ascii_case(query))
        .copied()
}

pub fn records() -> Vec<Record> {
    vec![
        Record {
            id: "r1",
            title: "Blood Test - Nov 2025",
            summary: "Cholesterol within normal range.",
        },
        Record {
            id: "r2",
            title: "MRI Scan - Oct 2025",
            summary: "No acute findings.",
        },
    ]
}

/// Past conversations, newest first.
pub fn history() -> Vec<HistoryEntry> {
    let entries = [
        ("h1", "Headache remedies", (2025, 11, 10)),
        ("h2", "Managing anxiety", (2025, 11, 9)),
        ("h3", "Nutrition advice", (2025, 11, 8)),
    ];
    let mut history: Vec<HistoryEntry> = entries
        .into_iter()
        .filter_map(|(id, title, (y, m, d))| {
            NaiveDate::from_ymd_opt(y, m, d).map(|date| HistoryEntry { id, title, date })
        })
        .collect();
    history.sort_by(|a, b| b.date.cmp(&a.date));
    history
}
