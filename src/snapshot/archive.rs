//! Archive aggregation
//!
//! Turns the append-only snapshot history into per-period buckets and a
//! recent-changes feed. Each snapshot is summarised against the snapshot of
//! the same division immediately before it; a division's first snapshot gets
//! the initial-save summary.

use crate::models::Snapshot;
use crate::schedule::label::period_label;
use crate::snapshot::diff::{diff, initial_summary, SnapshotDiff};
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::HashMap;

const NOTES_PREVIEW_CHARS: usize = 140;

/// One snapshot with its change summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub snapshot_id: i64,
    pub created_at: DateTime<Utc>,
    pub summary: String,
    /// `None` for the first snapshot of a division
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<SnapshotDiff>,
}

/// Role holders as last seen in a bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestRoles {
    pub dean: String,
    pub chair: String,
    pub pen: String,
    pub loc: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveBucket {
    pub period: String,
    pub division_name: String,
    pub change_count: usize,
    pub latest: LatestRoles,
    /// Oldest first
    pub entries: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentChange {
    pub snapshot_id: i64,
    pub division_name: String,
    pub created_at: DateTime<Utc>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_preview: Option<String>,
}

/// Start year of the academic period containing `at`
pub fn period_start_year(at: DateTime<Utc>, boundary_month: u32) -> i32 {
    if at.month() < boundary_month {
        at.year() - 1
    } else {
        at.year()
    }
}

fn chronological(snapshots: &[Snapshot]) -> Vec<&Snapshot> {
    let mut sorted: Vec<&Snapshot> = snapshots.iter().collect();
    sorted.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    sorted
}

/// Summary of every snapshot, keyed by snapshot id
pub fn summarize_history(snapshots: &[Snapshot]) -> HashMap<i64, HistoryEntry> {
    let mut previous: HashMap<String, &Snapshot> = HashMap::new();
    let mut out = HashMap::with_capacity(snapshots.len());

    for snapshot in chronological(snapshots) {
        let entry = match previous.insert(snapshot.entity_key(), snapshot) {
            Some(prev) => {
                let d = diff(prev, snapshot);
                HistoryEntry {
                    snapshot_id: snapshot.id,
                    created_at: snapshot.created_at,
                    summary: d.summary.clone(),
                    diff: Some(d),
                }
            }
            None => HistoryEntry {
                snapshot_id: snapshot.id,
                created_at: snapshot.created_at,
                summary: initial_summary(snapshot),
                diff: None,
            },
        };
        out.insert(snapshot.id, entry);
    }
    out
}

/// Bucket snapshots by (academic period, division name).
///
/// Buckets come out period descending, then name ascending.
pub fn group_by_period(snapshots: &[Snapshot], boundary_month: u32) -> Vec<ArchiveBucket> {
    let mut history = summarize_history(snapshots);
    let mut buckets: HashMap<(i32, String), ArchiveBucket> = HashMap::new();

    for snapshot in chronological(snapshots) {
        let start = period_start_year(snapshot.created_at, boundary_month);
        let name = snapshot.division.division_name.trim().to_string();
        let bucket = buckets
            .entry((start, name.to_lowercase()))
            .or_insert_with(|| ArchiveBucket {
                period: period_label(start),
                division_name: name.clone(),
                change_count: 0,
                latest: LatestRoles::default(),
                entries: Vec::new(),
            });

        let d = &snapshot.division;
        bucket.change_count += 1;
        bucket.division_name = name;
        bucket.latest = LatestRoles {
            dean: d.dean_name.clone(),
            chair: d.chair_name.clone(),
            pen: d.pen_contact.clone(),
            loc: d.loc_rep.clone(),
        };
        if let Some(entry) = history.remove(&snapshot.id) {
            bucket.entries.push(entry);
        }
    }

    let mut sorted: Vec<((i32, String), ArchiveBucket)> = buckets.into_iter().collect();
    sorted.sort_by(|(a, _), (b, _)| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    sorted.into_iter().map(|(_, bucket)| bucket).collect()
}

/// Newest `shown` snapshots with their summaries
pub fn recent_changes(snapshots: &[Snapshot], shown: usize) -> Vec<RecentChange> {
    let mut history = summarize_history(snapshots);
    let mut newest = chronological(snapshots);
    newest.reverse();

    newest
        .into_iter()
        .take(shown)
        .map(|s| {
            let summary = history
                .remove(&s.id)
                .map(|h| h.summary)
                .unwrap_or_else(|| initial_summary(s));
            let name = s.division.division_name.trim();
            RecentChange {
                snapshot_id: s.id,
                division_name: if name.is_empty() { "Unknown division".to_string() } else { name.to_string() },
                created_at: s.created_at,
                summary,
                notes_preview: notes_preview(&s.division.notes),
            }
        })
        .collect()
}

fn notes_preview(notes: &str) -> Option<String> {
    let notes = notes.trim();
    if notes.is_empty() {
        return None;
    }
    if notes.chars().count() <= NOTES_PREVIEW_CHARS {
        return Some(notes.to_string());
    }
    let cut: String = notes.chars().take(NOTES_PREVIEW_CHARS - 3).collect();
    Some(format!("{}…", cut))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Division;
    use crate::snapshot::diff::FALLBACK_SUMMARY;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    fn snap(id: i64, division_id: i64, name: &str, dean: &str, when: DateTime<Utc>) -> Snapshot {
        Snapshot {
            id,
            division_id: Some(division_id),
            created_at: when,
            division: Division {
                id: Some(division_id),
                division_name: name.to_string(),
                dean_name: dean.to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_period_boundary() {
        assert_eq!(period_start_year(at(2024, 6, 30), 7), 2023);
        assert_eq!(period_start_year(at(2024, 7, 1), 7), 2024);
        assert_eq!(period_start_year(at(2025, 1, 15), 7), 2024);
        assert_eq!(period_start_year(at(2025, 1, 15), 1), 2025);
    }

    #[test]
    fn test_history_chains_per_division() {
        let history = summarize_history(&[
            snap(3, 1, "Arts", "B", at(2024, 9, 3)),
            snap(1, 1, "Arts", "A", at(2024, 9, 1)),
            snap(2, 2, "Science", "X", at(2024, 9, 2)),
            snap(4, 1, "Arts", "B", at(2024, 9, 4)),
        ]);

        assert!(history[&1].summary.starts_with("Initial save"));
        assert!(history[&2].summary.starts_with("Initial save"));
        assert_eq!(history[&3].summary, "Fields changed: Dean: A → B");
        assert_eq!(history[&4].summary, FALLBACK_SUMMARY);
    }

    #[test]
    fn test_group_by_period_order_and_latest() {
        let buckets = group_by_period(
            &[
                snap(1, 1, "Arts", "A", at(2024, 3, 1)),
                snap(2, 2, "science", "X", at(2024, 8, 1)),
                snap(3, 1, "Arts", "B", at(2024, 9, 1)),
                snap(4, 1, "Arts", "C", at(2024, 10, 1)),
                snap(5, 3, "Business", "Q", at(2024, 8, 2)),
            ],
            7,
        );

        let shape: Vec<_> = buckets
            .iter()
            .map(|b| (b.period.as_str(), b.division_name.as_str(), b.change_count, b.latest.dean.as_str()))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("2024-2025", "Arts", 2, "C"),
                ("2024-2025", "Business", 1, "Q"),
                ("2024-2025", "science", 1, "X"),
                ("2023-2024", "Arts", 1, "A"),
            ]
        );

        // the first Arts snapshot of 2024-2025 still diffs against 2023-2024
        assert_eq!(buckets[0].entries[0].summary, "Fields changed: Dean: A → B");
        assert!(buckets[3].entries[0].diff.is_none());
    }

    #[test]
    fn test_recent_changes_newest_first() {
        let mut long = snap(2, 1, "Arts", "B", at(2024, 9, 2));
        long.division.notes = "x".repeat(200);
        let feed = recent_changes(
            &[snap(1, 1, "Arts", "A", at(2024, 9, 1)), long, snap(3, 2, "", "", at(2024, 9, 3))],
            2,
        );

        let ids: Vec<_> = feed.iter().map(|c| c.snapshot_id).collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(feed[0].division_name, "Unknown division");
        assert_eq!(feed[1].summary, "Fields changed: Dean: A → B · Notes updated");
        assert_eq!(feed[1].notes_preview.as_ref().map(|n| n.chars().count()), Some(138));
    }
}
