//! Division, program and payee records
//!
//! These mirror the JSON shapes the dashboard has always exchanged with the
//! system of record (`divisionName`, `programList`, `hasBeenPaid`, ...).

use serde::{Deserialize, Deserializer, Serialize};

/// A division with its role holders and programs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Division {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub division_name: String,
    pub dean_name: String,
    pub chair_name: String,
    pub pen_contact: String,
    pub loc_rep: String,
    pub notes: String,
    pub program_list: Vec<Program>,
}

impl Division {
    /// Blank division used when neither the id nor the name resolves
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            division_name: name.into(),
            ..Default::default()
        }
    }

    pub fn role(&self, field: RoleField) -> &str {
        match field {
            RoleField::Dean => &self.dean_name,
            RoleField::Chair => &self.chair_name,
            RoleField::PenContact => &self.pen_contact,
            RoleField::LocRep => &self.loc_rep,
        }
    }

    pub fn payee_count(&self) -> usize {
        self.program_list.iter().map(|p| p.payees.len()).sum()
    }

    /// Sum of every payee amount across all programs
    pub fn total_amount(&self) -> f64 {
        self.program_list
            .iter()
            .flat_map(|p| p.payees.iter())
            .map(|pe| pe.amount)
            .sum()
    }

    /// Find a program by id
    pub fn program(&self, program_id: i64) -> Option<&Program> {
        self.program_list.iter().find(|p| p.id == Some(program_id))
    }
}

/// A funded program inside a division
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Program {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub program_name: String,
    pub payees: Vec<Payee>,
    pub has_been_paid: bool,
    pub report_submitted: bool,
    pub notes: String,
}

/// One payee line of a program
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payee {
    pub name: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: f64,
}

impl Payee {
    pub fn new(name: impl Into<String>, amount: f64) -> Self {
        Self {
            name: name.into(),
            amount: finite_or_zero(amount),
        }
    }
}

/// Role attributes every division must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoleField {
    Dean,
    Chair,
    PenContact,
    LocRep,
}

impl RoleField {
    pub const ALL: [RoleField; 4] = [
        RoleField::Dean,
        RoleField::Chair,
        RoleField::PenContact,
        RoleField::LocRep,
    ];
}

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Accepts numbers, numeric strings and null; anything unusable becomes 0
fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let amount = match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(finite_or_zero(amount))
}
