use crate::{ast::BinOp, il::tac::*};

use super::{Diagnostic, Optimiser};

impl Optimiser {
    /// Replaces binary operations on two constants by a copy of their result.
    ///
    /// A division by a constant zero is preserved in place to fault at runtime, whatever its
    /// dividend. Float results that are not finite are never folded. Returns the number of
    /// folded operations.
    pub(super) fn fold_constants(&mut self) -> usize {
        let mut folded = 0;
        let mut deferred = vec![];

        for instr in self.listing.iter_instructions_mut() {
            let InstrKind::Bin(result, op, lhs, Value::Const(rhs)) = &instr.kind else {
                continue;
            };
            if *op == BinOp::Divide && rhs.is_zero() {
                if !instr.preserved {
                    deferred.push(instr.kind.to_string());
                    instr.preserved = true;
                }
                continue;
            }
            let Value::Const(lhs) = lhs else {
                continue;
            };
            match Constant::evaluate(*op, *lhs, *rhs) {
                Ok(value) if value.is_finite() => {
                    instr.kind = InstrKind::Copy(result.clone(), Value::Const(value));
                    folded += 1;
                }
                _ => (),
            }
        }

        for instr in deferred {
            self.report(Diagnostic::DivisionByZeroDeferred(instr));
        }
        folded
    }
}
