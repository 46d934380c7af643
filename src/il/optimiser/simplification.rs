use crate::{ast::BinOp, il::tac::*};

use super::Optimiser;

impl Optimiser {
    /// Replaces operations with an integer identity element by a copy of the other operand:
    /// `x + 0`, `0 + x`, `x - 0`, `x * 1`, `1 * x` and `x / 1`.
    pub(super) fn simplify(&mut self) -> usize {
        let mut simplified = 0;
        for instr in self.listing.iter_instructions_mut() {
            let InstrKind::Bin(result, op, lhs, rhs) = &instr.kind else {
                continue;
            };
            if let Some(operand) = identity_operand(*op, lhs, rhs) {
                instr.kind = InstrKind::Copy(result.clone(), operand.clone());
                simplified += 1;
            }
        }
        simplified
    }
}

/// The operand that `lhs op rhs` always equals, if there is one.
fn identity_operand<'a>(op: BinOp, lhs: &'a Value, rhs: &'a Value) -> Option<&'a Value> {
    let is = |value: &Value, identity: TargetInt| value.as_const() == Some(Constant::Int(identity));

    match op {
        BinOp::Add if is(rhs, 0) => Some(lhs),
        BinOp::Add if is(lhs, 0) => Some(rhs),
        BinOp::Subtract if is(rhs, 0) => Some(lhs),
        BinOp::Multiply if is(rhs, 1) => Some(lhs),
        BinOp::Multiply if is(lhs, 1) => Some(rhs),
        BinOp::Divide if is(rhs, 1) => Some(lhs),
        _ => None,
    }
}
