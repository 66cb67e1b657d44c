//! Required-field checks on the editable view
//!
//! `validate` is pure and recomputed on every call. It never changes the
//! form; the returned report knows how to fill every failing field with a
//! placeholder when the editor explicitly asks for it.

use crate::draft::form::{format_payee_line, parse_payee_line, payee_lines, DivisionForm, NEW_PROGRAM_NAME};

/// Placeholder written into blank required text fields
pub const PLACEHOLDER: &str = "TBD";
pub const PLACEHOLDER_PROGRAM: &str = "TBD Program";
pub const PLACEHOLDER_PAYEE_LINE: &str = "TBD - 0";

/// Division-level required fields, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderField {
    DivisionName,
    Dean,
    Chair,
    Pen,
    Loc,
}

impl HeaderField {
    const ALL: [HeaderField; 5] = [
        HeaderField::DivisionName,
        HeaderField::Dean,
        HeaderField::Chair,
        HeaderField::Pen,
        HeaderField::Loc,
    ];

    fn label(self) -> &'static str {
        match self {
            HeaderField::DivisionName => "Division Name",
            HeaderField::Dean => "Dean",
            HeaderField::Chair => "Chair",
            HeaderField::Pen => "PEN Contact",
            HeaderField::Loc => "LOC Rep",
        }
    }

    fn get(self, form: &DivisionForm) -> &str {
        match self {
            HeaderField::DivisionName => &form.division_name,
            HeaderField::Dean => &form.dean,
            HeaderField::Chair => &form.chair,
            HeaderField::Pen => &form.pen,
            HeaderField::Loc => &form.loc,
        }
    }

    fn get_mut(self, form: &mut DivisionForm) -> &mut String {
        match self {
            HeaderField::DivisionName => &mut form.division_name,
            HeaderField::Dean => &mut form.dean,
            HeaderField::Chair => &mut form.chair,
            HeaderField::Pen => &mut form.pen,
            HeaderField::Loc => &mut form.loc,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Fix {
    Header(HeaderField),
    ProgramName(usize),
    MissingPayees(usize),
    MalformedPayees(usize),
}

/// Ordered issue labels plus the fixes that clear them
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub issues: Vec<String>,
    fixes: Vec<Fix>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Write placeholders into every failing field of `form`
    pub fn remediate(&self, form: &mut DivisionForm) {
        for fix in &self.fixes {
            match *fix {
                Fix::Header(field) => *field.get_mut(form) = PLACEHOLDER.to_string(),
                Fix::ProgramName(i) => {
                    if let Some(p) = form.programs.get_mut(i) {
                        p.program_name = PLACEHOLDER_PROGRAM.to_string();
                    }
                }
                Fix::MissingPayees(i) => {
                    if let Some(p) = form.programs.get_mut(i) {
                        p.payee_lines = PLACEHOLDER_PAYEE_LINE.to_string();
                    }
                }
                Fix::MalformedPayees(i) => {
                    if let Some(p) = form.programs.get_mut(i) {
                        p.payee_lines = rewrite_payee_lines(&p.payee_lines);
                    }
                }
            }
        }
    }
}

/// Malformed lines become the placeholder line, valid ones are normalised
fn rewrite_payee_lines(text: &str) -> String {
    let fixed: Vec<String> = payee_lines(text)
        .map(|line| match parse_payee_line(line) {
            Some((name, amount)) => format_payee_line(&name, amount),
            None => PLACEHOLDER_PAYEE_LINE.to_string(),
        })
        .collect();
    if fixed.is_empty() {
        PLACEHOLDER_PAYEE_LINE.to_string()
    } else {
        fixed.join("\n")
    }
}

pub fn validate(form: &DivisionForm) -> ValidationReport {
    let mut issues = Vec::new();
    let mut fixes = Vec::new();

    for field in HeaderField::ALL {
        if field.get(form).trim().is_empty() {
            issues.push(field.label().to_string());
            fixes.push(Fix::Header(field));
        }
    }

    for (i, program) in form.programs.iter().enumerate() {
        let n = i + 1;
        let name = program.program_name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case(NEW_PROGRAM_NAME) {
            issues.push(format!("Program {} Name", n));
            fixes.push(Fix::ProgramName(i));
        }

        let mut lines = payee_lines(&program.payee_lines).peekable();
        if lines.peek().is_none() {
            issues.push(format!("Program {} Payees", n));
            fixes.push(Fix::MissingPayees(i));
        } else if lines.any(|line| parse_payee_line(line).is_none()) {
            issues.push(format!("Program {} Payees (fix Name - Amount)", n));
            fixes.push(Fix::MalformedPayees(i));
        }
    }

    ValidationReport { issues, fixes }
}
