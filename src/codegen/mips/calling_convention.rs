//! The stack-based calling convention used between procedures.
//!
//! The caller pushes the arguments in order, so the first argument ends up deepest in the
//! stack, then jumps to the callee with `jal`. The callee saves `$ra` and `$fp` below the
//! arguments and points `$fp` at them. Results are returned in `$v0`, or `$f0` for floats.
use crate::il::NumericKind;

use super::isa::Register;

/// The size of every value on the stack, in bytes.
pub const WORD_SIZE: i32 = 4;

/// The bytes between the frame pointer and the last argument: the saved `$fp` and `$ra`.
pub const SAVED_REGISTERS_SIZE: i32 = 2 * WORD_SIZE;

/// The `$fp`-relative offset of parameter `index` out of `count`.
pub fn param_offset(index: usize, count: usize) -> i32 {
    SAVED_REGISTERS_SIZE + WORD_SIZE * (count - 1 - index) as i32
}

/// The register a value of the given kind is returned in.
pub fn return_register(kind: NumericKind) -> Register {
    match kind {
        NumericKind::Int => Register::V0,
        NumericKind::Float => Register::F0,
    }
}
