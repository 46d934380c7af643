//! Three-Address Code

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::{
    ast::{BinOp, TypeSpec},
    listing::Listing,
};

/// The integer type of the target machine.
pub type TargetInt = i32;
/// The floating point type of the target machine.
pub type TargetFloat = f32;

pub type TacListing = Listing<Instruction>;

/// A complete program: its arrays, its top-level code and its functions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TacProgram {
    /// Arrays, in declaration order. Arrays are global to the program.
    pub arrays: Vec<ArrayDecl>,
    /// The top-level (main) listing, containing all code not associated with a function.
    pub top_level: TacListing,
    /// User-defined functions, in declaration order.
    pub functions: Vec<TacFunction>,
}
impl TacProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(&self, name: &str) -> Option<&TacFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn array(&self, name: &str) -> Option<&ArrayDecl> {
        self.arrays.iter().find(|a| a.name == name)
    }

    /// Iterates over every listing in the program, the top level first.
    pub fn listings(&self) -> impl Iterator<Item = (&str, &TacListing)> {
        std::iter::once(("main", &self.top_level))
            .chain(self.functions.iter().map(|f| (f.name.as_str(), &f.body)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayDecl {
    pub name: String,
    pub elem: TypeSpec,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TacFunction {
    pub name: String,
    pub params: Vec<Name>,
    pub returns: TypeSpec,
    pub body: TacListing,
}
impl TacFunction {
    pub fn param_kinds(&self) -> impl Iterator<Item = NumericKind> + '_ {
        self.params.iter().map(Name::kind)
    }
}

/// The numeric class of a value. Decides between the integer and floating point
/// instructions and registers of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    Int,
    Float,
}
impl NumericKind {
    pub fn of(ty: TypeSpec) -> Self {
        if ty.is_float() {
            Self::Float
        } else {
            Self::Int
        }
    }

    /// The kind of the result of a binary operation.
    pub fn of_binary(op: BinOp, lhs: Self, rhs: Self) -> Self {
        if op.is_comparison() {
            Self::Int
        } else if lhs == Self::Float || rhs == Self::Float {
            Self::Float
        } else {
            Self::Int
        }
    }
}
impl Display for NumericKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            NumericKind::Int => "int",
            NumericKind::Float => "float",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(String);
impl Label {
    pub fn new(name: &str, subscript: usize) -> Self {
        Self(format!("{}_{}", name, subscript))
    }

    pub fn named<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl Display for Label {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single TAC instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub kind: InstrKind,
    /// Whether the optimiser must keep this instruction. Anchors are always preserved,
    /// other instructions become preserved when they feed a control-flow decision or an
    /// output. The flag is never cleared.
    pub preserved: bool,
}
impl Instruction {
    pub fn new(kind: InstrKind) -> Self {
        Self {
            preserved: kind.is_anchor(),
            kind,
        }
    }

    pub fn preserved(kind: InstrKind) -> Self {
        Self {
            kind,
            preserved: true,
        }
    }

    pub fn is_anchor(&self) -> bool {
        self.kind.is_anchor()
    }

    pub fn result(&self) -> Option<&Name> {
        self.kind.result()
    }

    pub fn operands(&self) -> Vec<&Value> {
        self.kind.operands()
    }

    /// The names read by this instruction, in operand order.
    pub fn reads(&self) -> impl Iterator<Item = &Name> {
        self.operands().into_iter().filter_map(Value::as_name)
    }

    /// Whether this instruction assigns a value to `name`. Self-copies never count as
    /// definitions, since they leave the value unchanged.
    pub fn defines(&self, name: &Name) -> bool {
        !self.is_self_copy() && self.result() == Some(name)
    }

    /// Whether this is a copy of a name onto itself, such as `x = x`.
    pub fn is_self_copy(&self) -> bool {
        matches!(&self.kind, InstrKind::Copy(r, Value::Name(s)) if r == s)
    }

    /// Replaces every operand reading `src` with `dest`. Results are never touched.
    /// Returns whether any operand was replaced.
    pub fn replace_operand(&mut self, src: &Name, dest: &Name) -> bool {
        let mut replaced = false;
        for operand in self.kind.operands_mut() {
            if operand.as_name() == Some(src) {
                *operand = Value::Name(dest.clone());
                replaced = true;
            }
        }
        replaced
    }
}
impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if self.preserved && !self.is_anchor() {
            f.write_str("; preserved")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstrKind {
    /// Copy a value into a name.
    Copy(Name, Value),
    /// Perform a binary operation.
    Bin(Name, BinOp, Value, Value),
    /// Write a value to the output.
    Print(Value),
    /// A label which can be jumped to.
    Label(Label),
    /// Jump if a value is zero.
    IfFalse(Value, Label),
    /// Jump to a label.
    Goto(Label),
    /// Pass a parameter to the next call.
    Param(Value),
    /// Call a function, passing it the `n` preceding parameters.
    Call(Option<Name>, String, usize),
    /// Return from the current function.
    Return(Option<Value>),
    /// Read an element of an array.
    ArrayLoad(Name, String, Value),
    /// Write an element of an array: `array[index] = value`.
    ArrayStore(String, Value, Value),
}
impl InstrKind {
    /// Anchors have an effect beyond the names they define, or alter control flow.
    pub fn is_anchor(&self) -> bool {
        !matches!(
            self,
            Self::Copy(..) | Self::Bin(..) | Self::ArrayLoad(..)
        )
    }

    pub fn result(&self) -> Option<&Name> {
        match self {
            Self::Copy(r, _) | Self::Bin(r, _, _, _) | Self::ArrayLoad(r, _, _) => Some(r),
            Self::Call(r, _, _) => r.as_ref(),
            _ => None,
        }
    }

    pub fn operands(&self) -> Vec<&Value> {
        match self {
            Self::Copy(_, v) | Self::Print(v) | Self::IfFalse(v, _) | Self::Param(v) => vec![v],
            Self::Bin(_, _, lhs, rhs) => vec![lhs, rhs],
            Self::Return(v) => v.iter().collect(),
            Self::ArrayLoad(_, _, index) => vec![index],
            Self::ArrayStore(_, index, value) => vec![index, value],
            Self::Label(_) | Self::Goto(_) | Self::Call(..) => vec![],
        }
    }

    fn operands_mut(&mut self) -> Vec<&mut Value> {
        match self {
            Self::Copy(_, v) | Self::Print(v) | Self::IfFalse(v, _) | Self::Param(v) => vec![v],
            Self::Bin(_, _, lhs, rhs) => vec![lhs, rhs],
            Self::Return(v) => v.iter_mut().collect(),
            Self::ArrayLoad(_, _, index) => vec![index],
            Self::ArrayStore(_, index, value) => vec![index, value],
            Self::Label(_) | Self::Goto(_) | Self::Call(..) => vec![],
        }
    }

    /// The label this instruction may jump to.
    pub fn jump_target(&self) -> Option<&Label> {
        match self {
            Self::IfFalse(_, lbl) | Self::Goto(lbl) => Some(lbl),
            _ => None,
        }
    }
}
impl Display for InstrKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Copy(target, value) => write!(f, "{} = {}", target, value),
            Self::Bin(target, op, lhs, rhs) => write!(f, "{} = {} {} {}", target, lhs, op, rhs),
            Self::Print(value) => write!(f, "print {}", value),
            Self::Label(lbl) => write!(f, "label {}:", lbl),
            Self::IfFalse(value, lbl) => write!(f, "ifFalse {} goto {}", value, lbl),
            Self::Goto(lbl) => write!(f, "j {}", lbl),
            Self::Param(value) => write!(f, "param {}", value),
            Self::Call(Some(target), name, n) => write!(f, "{} = call {}, {}", target, name, n),
            Self::Call(None, name, n) => write!(f, "call {}, {}", name, n),
            Self::Return(None) => f.write_str("return"),
            Self::Return(Some(value)) => write!(f, "return {}", value),
            Self::ArrayLoad(target, array, index) => {
                write!(f, "{} = {}[{}]", target, array, index)
            }
            Self::ArrayStore(array, index, value) => {
                write!(f, "{}[{}] = {}", array, index, value)
            }
        }
    }
}

/// A TAC name. Names are symbolic addresses and may represent variables in the original source
/// code, or intermediate values of complex computations that have been broken down.
///
/// Unlike source variables, temporaries are written with a kind prefix: `t0` holds an integer
/// and `f0` a float. A variable whose identifier would be mistaken for a temporary or a
/// declaration keyword is written with a leading underscore.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Name {
    Var(Variable),
    Temp(Temp),
}
impl Name {
    pub fn var(ident: &str, kind: NumericKind) -> Self {
        Self::Var(Variable {
            ident: ident.to_string(),
            kind,
        })
    }

    pub fn temp(index: usize, kind: NumericKind) -> Self {
        Self::Temp(Temp { index, kind })
    }

    pub fn kind(&self) -> NumericKind {
        match self {
            Self::Var(v) => v.kind,
            Self::Temp(t) => t.kind,
        }
    }
}
impl Display for Name {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Name::Var(var) => var.fmt(f),
            Name::Temp(temp) => temp.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct Variable {
    pub ident: String,
    pub kind: NumericKind,
}
impl Display for Variable {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if is_reserved_spelling(self.ident.trim_start_matches('_')) {
            f.write_str("_")?;
        }
        f.write_str(&self.ident)
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Temp {
    pub index: usize,
    pub kind: NumericKind,
}
impl Display for Temp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.kind {
            NumericKind::Int => write!(f, "t{}", self.index),
            NumericKind::Float => write!(f, "f{}", self.index),
        }
    }
}

/// Whether a variable must be escaped in the text form: it is spelled like a temporary, or
/// like a keyword that starts a declaration line.
pub(super) fn is_reserved_spelling(ident: &str) -> bool {
    is_temp_spelling(ident) || matches!(ident, "var" | "array" | "function")
}

/// Whether an identifier is spelled like a temporary (`t3`, `f12`).
pub(super) fn is_temp_spelling(ident: &str) -> bool {
    let mut chars = ident.chars();
    matches!(chars.next(), Some('t' | 'f'))
        && !chars.as_str().is_empty()
        && chars.all(|c| c.is_ascii_digit())
}

/// A TAC value. Values can be constants, or references to names that were
/// defined earlier.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Const(Constant),
    Name(Name),
}
impl Value {
    pub fn int(value: TargetInt) -> Self {
        Self::Const(Constant::Int(value))
    }

    pub fn float(value: TargetFloat) -> Self {
        Self::Const(Constant::Float(value))
    }

    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Value::Const(_) => None,
            Value::Name(n) => Some(n),
        }
    }

    pub fn as_const(&self) -> Option<Constant> {
        match self {
            Value::Const(c) => Some(*c),
            Value::Name(_) => None,
        }
    }

    pub fn kind(&self) -> NumericKind {
        match self {
            Value::Const(c) => c.kind(),
            Value::Name(n) => n.kind(),
        }
    }
}
impl From<Name> for Value {
    fn from(name: Name) -> Self {
        Self::Name(name)
    }
}
impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Value::Const(c) => c.fmt(f),
            Value::Name(name) => name.fmt(f),
        }
    }
}

/// A constant in the number formats of the target machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    Int(TargetInt),
    Float(TargetFloat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("division by zero")]
    DivisionByZero,
}

impl Constant {
    pub fn zero(kind: NumericKind) -> Self {
        match kind {
            NumericKind::Int => Self::Int(0),
            NumericKind::Float => Self::Float(0.0),
        }
    }

    pub fn kind(&self) -> NumericKind {
        match self {
            Self::Int(_) => NumericKind::Int,
            Self::Float(_) => NumericKind::Float,
        }
    }

    /// The constant as an integer. Floats are truncated towards zero.
    pub fn as_int(self) -> TargetInt {
        match self {
            Self::Int(i) => i,
            Self::Float(x) => x as TargetInt,
        }
    }

    pub fn as_float(self) -> TargetFloat {
        match self {
            Self::Int(i) => i as TargetFloat,
            Self::Float(x) => x,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Self::Int(i) => i == 0,
            Self::Float(x) => x == 0.0,
        }
    }

    /// Converts the constant to the given kind. Floats are truncated towards zero.
    pub fn convert(self, kind: NumericKind) -> Self {
        match kind {
            NumericKind::Int => Self::Int(self.as_int()),
            NumericKind::Float => Self::Float(self.as_float()),
        }
    }

    /// Evaluates a binary operation the way the target machine does: integers wrap on
    /// overflow and divide truncating towards zero, and any float operand makes the whole
    /// operation a float operation. Comparisons produce the integers `0` and `1`.
    pub fn evaluate(op: BinOp, lhs: Self, rhs: Self) -> Result<Self, ArithmeticError> {
        if op == BinOp::Divide && rhs.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }

        Ok(match (lhs, rhs) {
            (Self::Int(a), Self::Int(b)) => match op {
                BinOp::Add => Self::Int(a.wrapping_add(b)),
                BinOp::Subtract => Self::Int(a.wrapping_sub(b)),
                BinOp::Multiply => Self::Int(a.wrapping_mul(b)),
                BinOp::Divide => Self::Int(a.wrapping_div(b)),
                cmp => Self::Int(compare(cmp, a, b) as TargetInt),
            },
            (lhs, rhs) => {
                let (a, b) = (lhs.as_float(), rhs.as_float());
                match op {
                    BinOp::Add => Self::Float(a + b),
                    BinOp::Subtract => Self::Float(a - b),
                    BinOp::Multiply => Self::Float(a * b),
                    BinOp::Divide => Self::Float(a / b),
                    cmp => Self::Int(compare(cmp, a, b) as TargetInt),
                }
            }
        })
    }

    pub fn is_finite(self) -> bool {
        match self {
            Self::Int(_) => true,
            Self::Float(x) => x.is_finite(),
        }
    }
}

fn compare<T: PartialOrd>(op: BinOp, a: T, b: T) -> bool {
    match op {
        BinOp::LessThan => a < b,
        BinOp::LessThanEqual => a <= b,
        BinOp::GreaterThan => a > b,
        BinOp::GreaterThanEqual => a >= b,
        BinOp::Equal => a == b,
        BinOp::NotEqual => a != b,
        BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide => {
            unreachable!("'{}' is not a comparison", op)
        }
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Constant::Int(i) => write!(f, "{}", i),
            // Debug formatting always includes a decimal point or exponent.
            Constant::Float(x) => write!(f, "{:?}", x),
        }
    }
}
