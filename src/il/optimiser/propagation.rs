use crate::il::tac::*;

use super::Optimiser;

impl Optimiser {
    /// For every copy `r = s` between two names of the same kind, reads of `r` that follow
    /// are replaced by reads of `s`. Propagation stops at the first redefinition of either
    /// name, and at the first label, since another path may enter there.
    ///
    /// Returns the number of rewritten instructions.
    pub(super) fn propagate_copies(&mut self) -> usize {
        let mut propagated = 0;

        for line in 0..self.listing.len() {
            let copy = self.listing.iter_instructions().nth(line).and_then(|instr| {
                match &instr.kind {
                    InstrKind::Copy(r, Value::Name(s)) if r != s && r.kind() == s.kind() => {
                        Some((r.clone(), s.clone()))
                    }
                    _ => None,
                }
            });
            let Some((target, source)) = copy else {
                continue;
            };

            for instr in self.listing.iter_instructions_mut().skip(line + 1) {
                if let InstrKind::Label(_) = instr.kind {
                    break;
                }
                if instr.replace_operand(&target, &source) {
                    propagated += 1;
                }
                if instr.defines(&target) || instr.defines(&source) {
                    break;
                }
            }
        }
        propagated
    }
}
