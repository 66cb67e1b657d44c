//! The editable view of a division
//!
//! Payees are held the way an editor types them, one `Name - Amount` line
//! each, so malformed input survives until validation decides what to do
//! with it.

use crate::draft::overlay::DraftOverlay;
use crate::error::AppError;
use crate::models::{Division, Payee, Program};
use serde::{Deserialize, Serialize};

/// Name given to a freshly added program
pub const NEW_PROGRAM_NAME: &str = "New Program";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DivisionForm {
    pub id: Option<i64>,
    pub division_name: String,
    pub dean: String,
    pub chair: String,
    pub pen: String,
    pub loc: String,
    pub notes: String,
    pub programs: Vec<ProgramForm>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgramForm {
    /// Present only for programs the system of record already knows
    pub id: Option<i64>,
    pub program_name: String,
    pub payee_lines: String,
    pub has_been_paid: bool,
    pub report_submitted: bool,
    pub notes: String,
}

/// Split a `Name - Amount` line.
///
/// The last `" - "` separates name from amount when present so hyphenated
/// names survive; otherwise the first `-` does. `None` unless the name is
/// non-blank and the amount is a finite number.
pub fn parse_payee_line(line: &str) -> Option<(String, f64)> {
    let (name, amount) = line.rsplit_once(" - ").or_else(|| line.split_once('-'))?;
    let name = name.trim();
    let amount = amount.trim().parse::<f64>().ok().filter(|a| a.is_finite())?;
    (!name.is_empty()).then(|| (name.to_string(), amount))
}

/// Non-blank lines, trimmed
pub fn payee_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty())
}

pub fn format_payee_line(name: &str, amount: f64) -> String {
    format!("{} - {}", name, amount)
}

impl ProgramForm {
    pub fn from_program(program: &Program) -> Self {
        Self {
            id: program.id,
            program_name: program.program_name.clone(),
            payee_lines: program
                .payees
                .iter()
                .map(|p| format_payee_line(&p.name, p.amount))
                .collect::<Vec<_>>()
                .join("\n"),
            has_been_paid: program.has_been_paid,
            report_submitted: program.report_submitted,
            notes: program.notes.clone(),
        }
    }

    /// Lenient conversion: a nameless line becomes `TBD`, an unusable amount 0
    pub fn to_program(&self) -> Program {
        let payees = payee_lines(&self.payee_lines)
            .map(|line| match parse_payee_line(line) {
                Some((name, amount)) => Payee::new(name, amount),
                None => {
                    let (name, amount) = line.split_once('-').unwrap_or((line, ""));
                    let name = name.trim();
                    let amount = amount.trim().parse::<f64>().unwrap_or(0.0);
                    if name.is_empty() {
                        Payee::new("TBD", 0.0)
                    } else {
                        Payee::new(name, amount)
                    }
                }
            })
            .collect();

        Program {
            id: self.id,
            program_name: self.program_name.trim().to_string(),
            payees,
            has_been_paid: self.has_been_paid,
            report_submitted: self.report_submitted,
            notes: self.notes.clone(),
        }
    }
}

impl DivisionForm {
    pub fn from_division(division: &Division) -> Self {
        Self {
            id: division.id,
            division_name: division.division_name.clone(),
            dean: division.dean_name.clone(),
            chair: division.chair_name.clone(),
            pen: division.pen_contact.clone(),
            loc: division.loc_rep.clone(),
            notes: division.notes.clone(),
            programs: division.program_list.iter().map(ProgramForm::from_program).collect(),
        }
    }

    pub fn to_division(&self) -> Division {
        Division {
            id: self.id,
            division_name: self.division_name.trim().to_string(),
            dean_name: self.dean.trim().to_string(),
            chair_name: self.chair.trim().to_string(),
            pen_contact: self.pen.trim().to_string(),
            loc_rep: self.loc.trim().to_string(),
            notes: self.notes.clone(),
            program_list: self.programs.iter().map(ProgramForm::to_program).collect(),
        }
    }

    /// Full overlay of the form's current state
    pub fn to_overlay(&self) -> DraftOverlay {
        DraftOverlay::from_division(&self.to_division())
    }

    /// Trimmed name, the overlay name key
    pub fn name_key(&self) -> &str {
        self.division_name.trim()
    }

    fn program_mut(&mut self, index: usize) -> Result<&mut ProgramForm, AppError> {
        let count = self.programs.len();
        self.programs
            .get_mut(index)
            .ok_or_else(|| AppError::BadRequest(format!("Program {} out of range ({} programs)", index + 1, count)))
    }

    /// Apply one editor mutation
    pub fn apply(&mut self, edit: FormEdit) -> Result<(), AppError> {
        match edit {
            FormEdit::SetField { field, value } => *self.field_mut(field) = value,
            FormEdit::SetProgramName { index, value } => self.program_mut(index)?.program_name = value,
            FormEdit::SetPayees { index, lines } => self.program_mut(index)?.payee_lines = lines,
            FormEdit::SetPaid { index, value } => self.program_mut(index)?.has_been_paid = value,
            FormEdit::SetReportSubmitted { index, value } => {
                self.program_mut(index)?.report_submitted = value
            }
            FormEdit::SetProgramNotes { index, value } => self.program_mut(index)?.notes = value,
            FormEdit::AddProgram => self.programs.push(ProgramForm {
                program_name: NEW_PROGRAM_NAME.to_string(),
                ..Default::default()
            }),
            FormEdit::RemoveProgram { index } => {
                self.program_mut(index)?;
                self.programs.remove(index);
            }
        }
        Ok(())
    }

    fn field_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::DivisionName => &mut self.division_name,
            FormField::Dean => &mut self.dean,
            FormField::Chair => &mut self.chair,
            FormField::Pen => &mut self.pen,
            FormField::Loc => &mut self.loc,
            FormField::Notes => &mut self.notes,
        }
    }
}

/// Division-level text fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    DivisionName,
    Dean,
    Chair,
    Pen,
    Loc,
    Notes,
}

/// A single field mutation, as posted by the editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum FormEdit {
    SetField { field: FormField, value: String },
    SetProgramName { index: usize, value: String },
    SetPayees { index: usize, lines: String },
    SetPaid { index: usize, value: bool },
    SetReportSubmitted { index: usize, value: bool },
    SetProgramNotes { index: usize, value: String },
    AddProgram,
    RemoveProgram { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_payee_line() {
        assert_eq!(parse_payee_line("Jo - 100"), Some(("Jo".to_string(), 100.0)));
        assert_eq!(parse_payee_line("Mary-Jane - 50.5"), Some(("Mary-Jane".to_string(), 50.5)));
        assert_eq!(parse_payee_line("Al-20"), Some(("Al".to_string(), 20.0)));
        assert_eq!(parse_payee_line("Bo - -5"), Some(("Bo".to_string(), -5.0)));
        assert_eq!(parse_payee_line("Jo"), None);
        assert_eq!(parse_payee_line(" - 10"), None);
        assert_eq!(parse_payee_line("Jo - lots"), None);
        assert_eq!(parse_payee_line("Jo - inf"), None);
    }

    #[test]
    fn test_form_round_trips_division() {
        let division = Division {
            id: Some(2),
            division_name: "Arts".to_string(),
            dean_name: "A. Smith".to_string(),
            program_list: vec![Program {
                id: Some(4),
                program_name: "Music".to_string(),
                payees: vec![Payee::new("Jo", 100.0), Payee::new("Al", 2.5)],
                has_been_paid: true,
                ..Default::default()
            }],
            ..Default::default()
        };

        let form = DivisionForm::from_division(&division);
        assert_eq!(form.programs[0].payee_lines, "Jo - 100\nAl - 2.5");
        assert_eq!(form.to_division(), division);
    }

    #[test]
    fn test_lenient_conversion_of_bad_lines() {
        let form = ProgramForm {
            payee_lines: "Jo - 10\n\n - 5\nAl - many\n".to_string(),
            ..Default::default()
        };
        let payees = form.to_program().payees;
        assert_eq!(
            payees,
            vec![Payee::new("Jo", 10.0), Payee::new("TBD", 0.0), Payee::new("Al", 0.0)]
        );
    }

    #[test]
    fn test_apply_edits() {
        let mut form = DivisionForm::default();
        form.apply(FormEdit::AddProgram).unwrap();
        form.apply(FormEdit::SetField {
            field: FormField::Dean,
            value: "C. Lee".to_string(),
        })
        .unwrap();
        form.apply(FormEdit::SetPayees {
            index: 0,
            lines: "Jo - 1".to_string(),
        })
        .unwrap();

        assert_eq!(form.dean, "C. Lee");
        assert_eq!(form.programs[0].program_name, NEW_PROGRAM_NAME);
        assert_eq!(form.programs[0].payee_lines, "Jo - 1");

        let err = form.apply(FormEdit::RemoveProgram { index: 3 }).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        form.apply(FormEdit::RemoveProgram { index: 0 }).unwrap();
        assert!(form.programs.is_empty());
    }

    #[test]
    fn test_edit_json_shape() {
        let edit: FormEdit =
            serde_json::from_str(r#"{"op":"setPaid","index":1,"value":true}"#).unwrap();
        assert_eq!(edit, FormEdit::SetPaid { index: 1, value: true });
    }
}
