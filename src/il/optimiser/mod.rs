//! Machine-independent optimisation of three-address code.
//!
//! Every round runs the passes in a fixed order: constant folding, algebraic simplification,
//! copy propagation, preservation marking and dead-code elimination. Rounds repeat until one
//! of them changes nothing, which makes optimising optimised code a no-op.
mod elimination;
mod folding;
mod preservation;
mod propagation;
mod simplification;

use crate::{error::Diagnostic, error::MalformedIr, listing::Position, prelude::*};

use super::{
    tac::*,
    validate::{validate_listing, validate_program},
};

/// The number of rounds after which the optimiser gives up looking for a fixed point.
pub const MAX_ROUNDS: usize = 32;

/// Optimised code, along with the warnings raised while optimising it.
#[derive(Debug)]
pub struct Optimised<T> {
    pub code: T,
    pub diagnostics: Vec<Diagnostic>,
}

/// Optimises a single listing that does not belong to a program. Calls and array accesses
/// are not checked against their definitions.
pub fn optimise(listing: TacListing) -> Result<Optimised<TacListing>, MalformedIr> {
    validate_listing("main", &listing, &[])?;
    let mut optimiser = Optimiser::new(listing);
    optimiser.optimise();
    Ok(Optimised {
        code: optimiser.listing,
        diagnostics: optimiser.diagnostics,
    })
}

/// Optimises every listing of a program. Listings are optimised independently of each other.
pub fn optimise_program(mut program: TacProgram) -> Result<Optimised<TacProgram>, MalformedIr> {
    validate_program(&program)?;
    let mut diagnostics = vec![];

    let mut run = |listing: &mut TacListing, name: &str| {
        debug!("optimising {}", name);
        let mut optimiser = Optimiser::new(std::mem::take(listing));
        optimiser.optimise();
        *listing = optimiser.listing;
        diagnostics.extend(optimiser.diagnostics);
    };
    run(&mut program.top_level, "main");
    for function in &mut program.functions {
        run(&mut function.body, &function.name);
    }

    Ok(Optimised {
        code: program,
        diagnostics,
    })
}

struct Optimiser {
    listing: TacListing,
    diagnostics: Vec<Diagnostic>,
}
impl Optimiser {
    fn new(listing: TacListing) -> Self {
        Self {
            listing,
            diagnostics: vec![],
        }
    }

    fn optimise(&mut self) {
        let before = self.listing.len();
        for round in 1..=MAX_ROUNDS {
            if !self.round() {
                debug!(
                    "fixed point after {} round(s), {} of {} instruction(s) left",
                    round,
                    self.listing.len(),
                    before
                );
                return;
            }
        }
        warn!("no fixed point after {} optimisation rounds", MAX_ROUNDS);
    }

    /// Runs every pass once. Returns whether any of them changed the listing.
    fn round(&mut self) -> bool {
        let folded = self.fold_constants();
        let simplified = self.simplify();
        let propagated = self.propagate_copies();
        let marked = self.mark_preserved();
        let eliminated = self.eliminate_dead_code();
        trace!(
            "round: folded {}, simplified {}, propagated {}, marked {}, eliminated {}",
            folded,
            simplified,
            propagated,
            marked,
            eliminated
        );
        folded + simplified + propagated + marked + eliminated > 0
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        if !self.diagnostics.contains(&diagnostic) {
            warn!("{}", diagnostic.describe());
            self.diagnostics.push(diagnostic);
        }
    }

    /// The definitions of `name` that may provide its value at `position`.
    ///
    /// Within a block, only the nearest preceding definition reaches. Once a label is
    /// crossed, control may arrive from elsewhere, so every earlier definition may reach.
    /// When the listing jumps backwards, later definitions may reach as well.
    fn reaching_definitions(
        &self,
        position: Position,
        name: &Name,
        back_edges: bool,
    ) -> Vec<Position> {
        let mut definitions = vec![];
        let mut crossed_label = false;

        for line in (0..position.0).rev() {
            let Some(instr) = self.listing.get(Position(line)) else {
                continue;
            };
            if let InstrKind::Label(_) = instr.kind {
                crossed_label = true;
            } else if instr.defines(name) {
                definitions.push(Position(line));
                if !crossed_label {
                    return definitions;
                }
            }
        }

        if crossed_label && back_edges {
            definitions.extend(
                self.listing
                    .iter_lines()
                    .skip(position.0)
                    .filter(|(_, instr)| instr.defines(name))
                    .map(|(line, _)| line),
            );
        }
        definitions
    }

    /// Whether any jump targets a label defined before it.
    fn has_back_edges(&self) -> bool {
        self.listing.iter_lines().any(|(line, instr)| {
            instr.kind.jump_target().map_or(false, |target| {
                self.listing
                    .iter_lines()
                    .take(line.0)
                    .any(|(_, i)| matches!(&i.kind, InstrKind::Label(l) if l == target))
            })
        })
    }
}
