//! Snapshot diff
//!
//! Compares two time-adjacent snapshots of the same division and renders the
//! one-line summary shown in the change feed and the archive.

use crate::models::{RoleField, Snapshot};
use serde::Serialize;

/// Summary used when nothing the diff looks at changed
pub const FALLBACK_SUMMARY: &str = "Changes saved (program details updated)";

/// How many field changes are spelled out before "+N more"
const FIELDS_SHOWN: usize = 2;

/// Amounts closer to zero than this count as unchanged
const AMOUNT_EPSILON: f64 = 0.005;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub label: String,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDiff {
    pub field_changes: Vec<FieldChange>,
    pub program_delta: i64,
    pub payee_delta: i64,
    pub amount_delta: f64,
    pub notes_changed: bool,
    /// Human readable, never empty
    pub summary: String,
}

fn diff_label(field: RoleField) -> &'static str {
    match field {
        RoleField::Dean => "Dean",
        RoleField::Chair => "Chair",
        RoleField::PenContact => "Pen contact",
        RoleField::LocRep => "LOC rep",
    }
}

/// Whole dollars with thousands separators, e.g. `$12,000`
pub fn format_dollars(amount: f64) -> String {
    let rounded = amount.abs().round() as u64;
    let digits = rounded.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if amount < 0.0 && rounded > 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

fn plural(count: usize, noun: &str) -> String {
    format!("{} {}{}", count, noun, if count == 1 { "" } else { "s" })
}

fn signed(label: &str, delta: i64) -> Option<String> {
    match delta {
        0 => None,
        d if d > 0 => Some(format!("{}: +{}", label, d)),
        d => Some(format!("{}: {}", label, d)),
    }
}

pub fn diff(prev: &Snapshot, curr: &Snapshot) -> SnapshotDiff {
    let field_changes: Vec<FieldChange> = RoleField::ALL
        .iter()
        .filter_map(|&field| {
            let before = prev.division.role(field).trim();
            let after = curr.division.role(field).trim();
            (before != after).then(|| FieldChange {
                label: diff_label(field).to_string(),
                before: before.to_string(),
                after: after.to_string(),
            })
        })
        .collect();

    let program_delta = curr.program_count() as i64 - prev.program_count() as i64;
    let payee_delta = curr.payee_count() as i64 - prev.payee_count() as i64;
    let mut amount_delta = curr.total_amount() - prev.total_amount();
    if amount_delta.abs() < AMOUNT_EPSILON {
        amount_delta = 0.0;
    }
    let prev_notes = prev.division.notes.trim();
    let curr_notes = curr.division.notes.trim();
    let notes_changed = prev_notes != curr_notes;

    let mut pieces = Vec::new();

    if !field_changes.is_empty() {
        let mut bits: Vec<String> = field_changes
            .iter()
            .take(FIELDS_SHOWN)
            .map(|c| {
                format!(
                    "{}: {} → {}",
                    c.label,
                    if c.before.is_empty() { "—" } else { c.before.as_str() },
                    if c.after.is_empty() { "—" } else { c.after.as_str() }
                )
            })
            .collect();
        if field_changes.len() > FIELDS_SHOWN {
            let extra = field_changes.len() - FIELDS_SHOWN;
            bits.push(format!("+{} more field{}", extra, if extra == 1 { "" } else { "s" }));
        }
        pieces.push(format!("Fields changed: {}", bits.join(" · ")));
    }

    let mut counts: Vec<String> = [signed("Programs", program_delta), signed("Payees", payee_delta)]
        .into_iter()
        .flatten()
        .collect();
    if amount_delta > 0.0 {
        counts.push(format!("Funding: +{}", format_dollars(amount_delta)));
    } else if amount_delta < 0.0 {
        counts.push(format!("Funding: {}", format_dollars(amount_delta)));
    }
    if !counts.is_empty() {
        pieces.push(counts.join(" · "));
    }

    if notes_changed {
        let note = if curr_notes.is_empty() { "Notes cleared" } else { "Notes updated" };
        pieces.push(note.to_string());
    }

    let summary = if pieces.is_empty() {
        FALLBACK_SUMMARY.to_string()
    } else {
        pieces.join(" · ")
    };

    SnapshotDiff {
        field_changes,
        program_delta,
        payee_delta,
        amount_delta,
        notes_changed,
        summary,
    }
}

/// Summary for the first snapshot of a division
pub fn initial_summary(snapshot: &Snapshot) -> String {
    let mut parts = Vec::new();
    if snapshot.program_count() > 0 {
        parts.push(plural(snapshot.program_count(), "program"));
    }
    if snapshot.payee_count() > 0 {
        parts.push(plural(snapshot.payee_count(), "payee"));
    }
    let total = snapshot.total_amount();
    if total.is_finite() && total.abs() >= 0.5 {
        parts.push(format_dollars(total));
    }

    if !parts.is_empty() {
        format!("Initial save · {}", parts.join(" · "))
    } else if !snapshot.division.notes.trim().is_empty() {
        "Initial save · Notes added".to_string()
    } else {
        "Initial save for this division".to_string()
    }
}
