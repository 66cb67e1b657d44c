//! Effective view of a division: base record plus local overlay

use crate::draft::overlay::{normalize_name, DraftOverlay, ProgramPatch};
use crate::models::{Division, Program};

/// Compute the effective division.
///
/// Overlay scalars win only when non-blank. Overlay programs are matched to
/// unconsumed base programs by normalised name and keep the base id; base
/// programs the overlay never mentions are appended afterwards in their
/// original order.
pub fn merge(base: &Division, overlay: Option<&DraftOverlay>) -> Division {
    let Some(overlay) = overlay else {
        return base.clone();
    };

    let mut merged = base.clone();
    overlay_scalar(&mut merged.division_name, &overlay.division_name);
    overlay_scalar(&mut merged.dean_name, &overlay.dean);
    overlay_scalar(&mut merged.chair_name, &overlay.chair);
    overlay_scalar(&mut merged.pen_contact, &overlay.pen);
    overlay_scalar(&mut merged.loc_rep, &overlay.loc);
    overlay_scalar(&mut merged.notes, &overlay.notes);

    if let Some(patches) = &overlay.programs_data {
        merged.program_list = merge_programs(&base.program_list, patches);
    }

    merged
}

fn overlay_scalar(target: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        if !value.trim().is_empty() {
            target.clone_from(value);
        }
    }
}

fn merge_programs(base: &[Program], patches: &[ProgramPatch]) -> Vec<Program> {
    let keys: Vec<String> = base.iter().map(|p| normalize_name(&p.program_name)).collect();
    let mut consumed = vec![false; base.len()];
    let mut out = Vec::with_capacity(base.len().max(patches.len()));

    for patch in patches {
        let key = patch.normalized_name();
        let matched = keys
            .iter()
            .enumerate()
            .position(|(i, k)| !consumed[i] && *k == key);

        match matched {
            Some(i) => {
                consumed[i] = true;
                out.push(apply_patch(&base[i], patch));
            }
            None => out.push(patch.to_program()),
        }
    }

    out.extend(
        base.iter()
            .zip(consumed)
            .filter(|(_, used)| !used)
            .map(|(p, _)| p.clone()),
    );
    out
}

/// Field-by-field overwrite; the id always stays the base id
fn apply_patch(base: &Program, patch: &ProgramPatch) -> Program {
    let mut program = base.clone();
    if let Some(name) = &patch.program_name {
        program.program_name.clone_from(name);
    }
    if let Some(payees) = &patch.payees {
        program.payees.clone_from(payees);
    }
    if let Some(paid) = patch.has_been_paid {
        program.has_been_paid = paid;
    }
    if let Some(submitted) = patch.report_submitted {
        program.report_submitted = submitted;
    }
    if let Some(notes) = &patch.notes {
        program.notes.clone_from(notes);
    }
    program.id = base.id;
    program
}
