//! The registers and operations of the MIPS target.
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Zero,
    V0,
    A0,
    T0,
    T1,
    T2,
    /// Scratch register for conversions.
    T8,
    Sp,
    Fp,
    Ra,
    F0,
    F2,
    /// Scratch register for conversions.
    F10,
    F12,
}
impl Display for Register {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Register::Zero => "$zero",
            Register::V0 => "$v0",
            Register::A0 => "$a0",
            Register::T0 => "$t0",
            Register::T1 => "$t1",
            Register::T2 => "$t2",
            Register::T8 => "$t8",
            Register::Sp => "$sp",
            Register::Fp => "$fp",
            Register::Ra => "$ra",
            Register::F0 => "$f0",
            Register::F2 => "$f2",
            Register::F10 => "$f10",
            Register::F12 => "$f12",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    // Memory and constants
    Li,
    La,
    Lw,
    Sw,
    Move,
    // Integer arithmetic
    Addiu,
    Addu,
    Subu,
    Mul,
    Div,
    Mflo,
    Sll,
    // Integer comparison
    Slt,
    Sle,
    Sgt,
    Sge,
    Seq,
    Sne,
    // Floating point
    LiS,
    LS,
    SS,
    AddS,
    SubS,
    MulS,
    DivS,
    CEqS,
    CLtS,
    CLeS,
    Movf,
    Movt,
    // Conversion between the register files
    Mtc1,
    Mfc1,
    CvtSW,
    CvtWS,
    // Control flow
    J,
    Jal,
    Jr,
    Beqz,
    Bc1t,
    Syscall,
}
impl Display for Op {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Op::Li => "li",
            Op::La => "la",
            Op::Lw => "lw",
            Op::Sw => "sw",
            Op::Move => "move",
            Op::Addiu => "addiu",
            Op::Addu => "addu",
            Op::Subu => "subu",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Mflo => "mflo",
            Op::Sll => "sll",
            Op::Slt => "slt",
            Op::Sle => "sle",
            Op::Sgt => "sgt",
            Op::Sge => "sge",
            Op::Seq => "seq",
            Op::Sne => "sne",
            Op::LiS => "li.s",
            Op::LS => "l.s",
            Op::SS => "s.s",
            Op::AddS => "add.s",
            Op::SubS => "sub.s",
            Op::MulS => "mul.s",
            Op::DivS => "div.s",
            Op::CEqS => "c.eq.s",
            Op::CLtS => "c.lt.s",
            Op::CLeS => "c.le.s",
            Op::Movf => "movf",
            Op::Movt => "movt",
            Op::Mtc1 => "mtc1",
            Op::Mfc1 => "mfc1",
            Op::CvtSW => "cvt.s.w",
            Op::CvtWS => "cvt.w.s",
            Op::J => "j",
            Op::Jal => "jal",
            Op::Jr => "jr",
            Op::Beqz => "beqz",
            Op::Bc1t => "bc1t",
            Op::Syscall => "syscall",
        })
    }
}

/// System calls understood by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallCode {
    PrintInt = 1,
    PrintFloat = 2,
    PrintString = 4,
    Exit = 10,
    ExitWithCode = 17,
}
