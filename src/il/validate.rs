//! Well-formedness checks for three-address code.
//!
//! Code produced by the generator always passes these checks. Stages consuming code run them
//! first, so that code from elsewhere (such as the text form) can not take them by surprise.
use std::collections::HashSet;

use crate::{error::MalformedIr, listing::Position};

use super::tac::*;

/// Validates a whole program: every listing on its own, and the calls and array accesses
/// between them.
pub fn validate_program(program: &TacProgram) -> Result<(), MalformedIr> {
    let mut functions = HashSet::new();
    for function in &program.functions {
        if !functions.insert(function.name.as_str()) {
            return Err(MalformedIr::DuplicateFunction(function.name.clone()));
        }
    }

    validate_listing("main", &program.top_level, &[])?;
    for function in &program.functions {
        validate_listing(&function.name, &function.body, &function.params)?;
    }

    let mut labels = HashSet::new();
    for (_, listing) in program.listings() {
        for instr in listing.iter_instructions() {
            validate_references(program, &instr.kind)?;
            if let InstrKind::Label(lbl) = &instr.kind {
                if !labels.insert(lbl) {
                    return Err(MalformedIr::DuplicateLabel(lbl.to_string()));
                }
            }
        }
    }
    Ok(())
}

/// Checks that an instruction only refers to functions and arrays the program defines.
fn validate_references(program: &TacProgram, kind: &InstrKind) -> Result<(), MalformedIr> {
    match kind {
        InstrKind::Call(result, name, argcount) => {
            let function = program
                .function(name)
                .ok_or_else(|| MalformedIr::UnknownFunction(name.clone()))?;
            if function.params.len() != *argcount {
                return Err(MalformedIr::ParamCount {
                    name: name.clone(),
                    expected: function.params.len(),
                    found: *argcount,
                });
            }
            if result.is_some() && function.returns == crate::ast::TypeSpec::Void {
                return Err(MalformedIr::VoidResult(name.clone()));
            }
        }
        InstrKind::ArrayLoad(_, array, _) | InstrKind::ArrayStore(array, _, _) => {
            if program.array(array).is_none() {
                return Err(MalformedIr::UnknownArray(array.clone()));
            }
        }
        _ => (),
    }
    Ok(())
}

/// Validates a single listing: names are defined before they are read, labels are unique
/// and every jump target exists, and parameters directly precede the call they belong to.
pub fn validate_listing(
    listing_name: &str,
    listing: &TacListing,
    params: &[Name],
) -> Result<(), MalformedIr> {
    let mut defined: HashSet<&Name> = params.iter().collect();
    let mut labels = HashSet::new();
    let mut pending_params = 0;

    for (Position(line), instr) in listing.iter_lines() {
        let line = line + 1;
        let is_call_sequence = matches!(instr.kind, InstrKind::Param(_) | InstrKind::Call(..));
        if pending_params > 0 && !is_call_sequence {
            return Err(MalformedIr::DanglingParams {
                listing: listing_name.to_string(),
                count: pending_params,
                line,
            });
        }

        if let Some(name) = instr.reads().find(|name| !defined.contains(name)) {
            return Err(MalformedIr::UndefinedName {
                listing: listing_name.to_string(),
                name: name.to_string(),
                line,
            });
        }

        match &instr.kind {
            InstrKind::Param(_) => pending_params += 1,
            InstrKind::Call(_, name, argcount) => {
                if *argcount != pending_params {
                    return Err(MalformedIr::ParamCount {
                        name: name.clone(),
                        expected: *argcount,
                        found: pending_params,
                    });
                }
                pending_params = 0;
            }
            InstrKind::Label(lbl) => {
                if !labels.insert(lbl) {
                    return Err(MalformedIr::DuplicateLabel(lbl.to_string()));
                }
            }
            _ => (),
        }

        if let Some(result) = instr.result() {
            defined.insert(result);
        }
    }

    if pending_params > 0 {
        return Err(MalformedIr::DanglingParams {
            listing: listing_name.to_string(),
            count: pending_params,
            line: listing.len(),
        });
    }

    for instr in listing.iter_instructions() {
        if let Some(target) = instr.kind.jump_target() {
            if !labels.contains(target) {
                return Err(MalformedIr::UnknownLabel {
                    listing: listing_name.to_string(),
                    label: target.to_string(),
                });
            }
        }
    }
    Ok(())
}
