use std::collections::HashSet;

use crate::{il::tac::*, listing::Position};

use super::Optimiser;

impl Optimiser {
    /// Removes every instruction whose result can not affect an anchor or a preserved
    /// instruction. Copies of a name onto itself are always removed.
    ///
    /// Returns the number of removed instructions.
    pub(super) fn eliminate_dead_code(&mut self) -> usize {
        let back_edges = self.has_back_edges();
        let mut worklist: Vec<Position> = self
            .listing
            .iter_lines()
            .filter(|(_, instr)| (instr.preserved || instr.is_anchor()) && !instr.is_self_copy())
            .map(|(line, _)| line)
            .collect();
        let mut live: HashSet<Position> = worklist.iter().copied().collect();

        while let Some(line) = worklist.pop() {
            let Some(instr) = self.listing.get(line) else {
                continue;
            };
            for name in instr.reads() {
                for definition in self.reaching_definitions(line, name, back_edges) {
                    if live.insert(definition) {
                        worklist.push(definition);
                    }
                }
            }
        }

        let dead: Vec<_> = self
            .listing
            .iter_lines()
            .map(|(line, _)| line)
            .filter(|line| !live.contains(line))
            .collect();
        let eliminated = dead.len();
        self.listing.remove_lines(dead);
        eliminated
    }
}
