use std::collections::HashSet;

use crate::{il::tac::*, listing::Position};

use super::Optimiser;

impl Optimiser {
    /// Marks every instruction that contributes to a control-flow decision or an output as
    /// preserved, however indirectly. Returns the number of newly marked instructions.
    pub(super) fn mark_preserved(&mut self) -> usize {
        let back_edges = self.has_back_edges();
        let mut worklist: Vec<Position> = self
            .listing
            .iter_lines()
            .filter(|(_, instr)| {
                matches!(
                    instr.kind,
                    InstrKind::Label(_)
                        | InstrKind::IfFalse(..)
                        | InstrKind::Goto(_)
                        | InstrKind::Print(_)
                )
            })
            .map(|(line, _)| line)
            .collect();
        let mut feeders = HashSet::new();

        while let Some(line) = worklist.pop() {
            let Some(instr) = self.listing.get(line) else {
                continue;
            };
            for name in instr.reads() {
                for definition in self.reaching_definitions(line, name, back_edges) {
                    if feeders.insert(definition) {
                        worklist.push(definition);
                    }
                }
            }
        }

        let mut marked = 0;
        for (line, instr) in self.listing.iter_instructions_mut().enumerate() {
            if !instr.preserved && feeders.contains(&Position(line)) {
                instr.preserved = true;
                marked += 1;
            }
        }
        marked
    }
}
