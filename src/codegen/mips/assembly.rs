//! General assembly definitions, in the dialect of the common MIPS simulators.

use std::fmt::{self, Display, Formatter};

use crate::{il::TargetFloat, listing::Listing};

use super::isa::{Op, Register};

/// A complete assembly file: a data section followed by a text section.
#[derive(Debug, Default)]
pub struct Assembly {
    pub data: Data,
    pub text: Text,
}
impl Display for Assembly {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.data)?;
        writeln!(f)?;
        write!(f, "{}", self.text)
    }
}

/// A section of assembly code, such as `.text` or `.data`.
pub trait Section {
    fn name(&self) -> &'static str;
}

/// A `.data` section, consisting only of directives.
#[derive(Debug, Default)]
pub struct Data {
    lines: Vec<Line<Directive>>,
}
impl Data {
    pub fn asciiz<S: Into<String>>(&mut self, name: S, content: &str) -> &mut Self {
        self.lines
            .push(Line::new(Directive::Asciiz(name.into(), escape(content))));
        self
    }

    pub fn space<S: Into<String>>(&mut self, name: S, bytes: usize) -> &mut Self {
        self.lines.push(Line::new(Directive::Space(name.into(), bytes)));
        self
    }

    pub fn align(&mut self, power: u32) -> &mut Self {
        self.lines.push(Line::new(Directive::Align(power)));
        self
    }
}
impl Section for Data {
    fn name(&self) -> &'static str {
        ".data"
    }
}
impl Display for Data {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(f, "    {}", self.name())?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// A `.text` section. Contains the main procedure, followed by any number of additional
/// procedures.
#[derive(Debug, Default)]
pub struct Text {
    pub procedures: Vec<Procedure>,
}
impl Section for Text {
    fn name(&self) -> &'static str {
        ".text"
    }
}
impl Display for Text {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(f, "    {}", self.name())?;
        writeln!(f, "    .globl main")?;
        for proc in &self.procedures {
            writeln!(f)?;
            write!(f, "{}", proc)?;
        }
        Ok(())
    }
}

/// An assembly procedure, marked by a label and surrounded by a prologue and epilogue.
#[derive(Debug)]
pub struct Procedure {
    pub name: String,
    pub prologue: Block,
    pub body: Block,
    pub epilogue: Block,
}
impl Display for Procedure {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(f, "{}:", self.name)?;
        write!(f, "{}", self.prologue)?;
        write!(f, "{}", self.body)?;
        write!(f, "{}", self.epilogue)
    }
}

/// A block of assembly code.
#[derive(Debug, Default)]
pub struct Block {
    lines: Listing<Line<Stmt>>,
}
impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<I>(&mut self, op: Op, operands: I) -> &mut Self
    where
        I: IntoIterator<Item = Operand>,
    {
        self.lines.push(Line::new(Stmt::Instr(Instr::new(op, operands))));
        self
    }

    pub fn push_cmt<I, S>(&mut self, op: Op, operands: I, comment: S) -> &mut Self
    where
        I: IntoIterator<Item = Operand>,
        S: Into<String>,
    {
        self.lines.push(Line::new_cmt(
            Stmt::Instr(Instr::new(op, operands)),
            comment.into(),
        ));
        self
    }

    pub fn label<S: Into<String>>(&mut self, name: S, comment: Option<String>) -> &mut Self {
        let stmt = Stmt::Label(name.into());
        self.lines.push(match comment {
            Some(comment) => Line::new_cmt(stmt, comment),
            None => Line::new(stmt),
        });
        self
    }

    pub fn comment<S: Into<String>>(&mut self, comment: S) -> &mut Self {
        self.lines.push(Line::comment_only(comment.into()));
        self
    }

    /// Iterates over the labels and instructions of this block, skipping comments.
    pub fn statements(&self) -> impl Iterator<Item = &Stmt> {
        self.lines
            .iter_instructions()
            .filter_map(|line| line.line.as_ref())
    }
}
impl Display for Block {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.lines)
    }
}

/// A line of assembly, consisting of an optional statement and optional comment.
#[derive(Debug)]
pub struct Line<T> {
    line: Option<T>,
    comment: Option<String>,
}
impl<T> Line<T> {
    pub fn new(line: T) -> Self {
        Self {
            line: Some(line),
            comment: None,
        }
    }

    pub fn new_cmt(line: T, comment: String) -> Self {
        Self {
            line: Some(line),
            comment: Some(comment),
        }
    }

    pub fn comment_only(comment: String) -> Self {
        Self {
            line: None,
            comment: Some(comment),
        }
    }
}
impl<T: Display> Display for Line<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match (&self.line, self.comment.as_ref()) {
            (None, None) => Ok(()),
            (None, Some(cmt)) => write!(f, "{:32}# {}", "", cmt),
            (Some(line), None) => write!(f, "{}", line),
            (Some(line), Some(cmt)) => write!(f, "{:32}# {}", line.to_string(), cmt),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Asciiz(String, String),
    Space(String, usize),
    Align(u32),
}
impl Display for Directive {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Directive::Asciiz(name, value) => write!(f, "{}: .asciiz \"{}\"", name, value),
            Directive::Space(name, bytes) => write!(f, "{}: .space {}", name, bytes),
            Directive::Align(power) => write!(f, "    .align {}", power),
        }
    }
}

fn escape(content: &str) -> String {
    content
        .chars()
        .map(|c| match c {
            '\n' => "\\n".to_string(),
            '"' => "\\\"".to_string(),
            '\\' => "\\\\".to_string(),
            c => c.to_string(),
        })
        .collect()
}

/// A label or an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Label(String),
    Instr(Instr),
}
impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Stmt::Label(name) => write!(f, "{}:", name),
            Stmt::Instr(instr) => write!(f, "{}", instr),
        }
    }
}

/// A single instruction, consisting of an operator and zero or more operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Instr {
    operator: Op,
    operands: Vec<Operand>,
}
impl Instr {
    pub fn new<I: IntoIterator<Item = Operand>>(operator: Op, operands: I) -> Instr {
        Self {
            operator,
            operands: operands.into_iter().collect(),
        }
    }
}
impl Display for Instr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let operator = self.operator.to_string();
        if self.operands.is_empty() {
            return write!(f, "    {}", operator);
        }
        write!(f, "    {:7} ", operator)?;
        let operands = self
            .operands
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&operands)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A register
    Reg(Register),
    /// An immediate integer
    Lit(i64),
    /// An immediate float, for `li.s`
    Float(TargetFloat),
    /// A memory location at an offset from a register
    Mem(i32, Register),
    /// A label or other identifier
    Id(String),
}
impl Display for Operand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Operand::Reg(reg) => write!(f, "{}", reg),
            Operand::Lit(lit) => write!(f, "{}", lit),
            Operand::Float(x) => write!(f, "{:?}", x),
            Operand::Mem(offset, reg) => write!(f, "{}({})", offset, reg),
            Operand::Id(id) => f.write_str(id),
        }
    }
}
