//! Conventions for entering and leaving a procedure.
use crate::il::NumericKind;

use super::{assembly::*, calling_convention::*, isa::*};

use Op::*;
use Operand::*;
use Register::*;

pub trait StackConvention {
    /// Whether leaving the procedure continues in a caller.
    const RETURNS_TO_CALLER: bool;

    fn add_prologue(block: &mut Block, frame_size: i32);
    fn add_epilogue(block: &mut Block);
    /// Leaves the procedure from the middle of its body. The returned value, if any, is
    /// already in place.
    fn add_return(block: &mut Block, has_value: bool);
    /// The register a returned value of the given kind is expected in.
    fn return_register(kind: NumericKind) -> Register;

    fn prologue(frame_size: i32) -> Block {
        let mut block = Block::new();
        Self::add_prologue(&mut block, frame_size);
        block
    }

    fn epilogue() -> Block {
        let mut block = Block::new();
        Self::add_epilogue(&mut block);
        block
    }
}

fn add_frame_setup(block: &mut Block, frame_size: i32) {
    block
        .push_cmt(
            Addiu,
            [Reg(Sp), Reg(Sp), Lit(-SAVED_REGISTERS_SIZE as i64)],
            "make room for $ra and $fp",
        )
        .push_cmt(Sw, [Reg(Ra), Mem(WORD_SIZE, Sp)], "store return address")
        .push_cmt(Sw, [Reg(Fp), Mem(0, Sp)], "store frame pointer")
        .push_cmt(Move, [Reg(Fp), Reg(Sp)], "move frame pointer down");
    if frame_size > 0 {
        block.push_cmt(
            Addiu,
            [Reg(Sp), Reg(Sp), Lit(-frame_size as i64)],
            "reserve stack slots",
        );
    }
}

/// A procedure called by another procedure, returning to its caller.
pub struct Callee;
impl StackConvention for Callee {
    const RETURNS_TO_CALLER: bool = true;

    fn add_prologue(block: &mut Block, frame_size: i32) {
        add_frame_setup(block, frame_size);
    }

    fn add_epilogue(block: &mut Block) {
        block
            .push_cmt(Move, [Reg(Sp), Reg(Fp)], "drop stack slots")
            .push_cmt(Lw, [Reg(Fp), Mem(0, Sp)], "restore frame pointer")
            .push_cmt(Lw, [Reg(Ra), Mem(WORD_SIZE, Sp)], "restore return address")
            .push(Addiu, [Reg(Sp), Reg(Sp), Lit(SAVED_REGISTERS_SIZE as i64)])
            .push_cmt(Jr, [Reg(Ra)], "return to caller");
    }

    fn add_return(block: &mut Block, _has_value: bool) {
        Self::add_epilogue(block);
    }

    fn return_register(kind: NumericKind) -> Register {
        return_register(kind)
    }
}

/// The entry point of the program, which ends the program when it returns.
pub struct Program;
impl StackConvention for Program {
    const RETURNS_TO_CALLER: bool = false;

    fn add_prologue(block: &mut Block, frame_size: i32) {
        add_frame_setup(block, frame_size);
    }

    fn add_epilogue(block: &mut Block) {
        block
            .push(Li, [Reg(V0), Lit(SyscallCode::Exit as i64)])
            .push_cmt(Op::Syscall, [], "exit");
    }

    fn add_return(block: &mut Block, has_value: bool) {
        if has_value {
            block
                .push(Li, [Reg(V0), Lit(SyscallCode::ExitWithCode as i64)])
                .push_cmt(Op::Syscall, [], "exit with code");
        } else {
            Self::add_epilogue(block);
        }
    }

    /// The exit code is passed to the exit syscall in `$a0`.
    fn return_register(_kind: NumericKind) -> Register {
        A0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statements(block: &Block) -> Vec<String> {
        block
            .statements()
            .map(|stmt| stmt.to_string().split_whitespace().collect::<Vec<_>>().join(" "))
            .collect()
    }

    #[test]
    fn prologue_saves_the_caller_state() {
        assert_eq!(
            vec![
                "addiu $sp, $sp, -8",
                "sw $ra, 4($sp)",
                "sw $fp, 0($sp)",
                "move $fp, $sp",
                "addiu $sp, $sp, -16"
            ],
            statements(&Callee::prologue(16))
        );
    }

    #[test]
    fn empty_frame_reserves_nothing() {
        assert_eq!(4, statements(&Program::prologue(0)).len());
    }

    #[test]
    fn callee_epilogue_returns_to_caller() {
        assert_eq!(
            vec![
                "move $sp, $fp",
                "lw $fp, 0($sp)",
                "lw $ra, 4($sp)",
                "addiu $sp, $sp, 8",
                "jr $ra"
            ],
            statements(&Callee::epilogue())
        );
    }

    #[test]
    fn program_exits_with_a_syscall() {
        assert_eq!(vec!["li $v0, 10", "syscall"], statements(&Program::epilogue()));
        let mut block = Block::new();
        Program::add_return(&mut block, true);
        assert_eq!(vec!["li $v0, 17", "syscall"], statements(&block));
    }
}
