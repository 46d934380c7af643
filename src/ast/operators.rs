//! Operators shared by the syntax tree and the three-address code.
use std::{
    fmt::{self, Display},
    str::FromStr,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Equal,
    NotEqual,
}
impl BinOp {
    /// Comparisons always produce an integer truth value, whatever their operand kinds.
    pub fn is_comparison(&self) -> bool {
        use BinOp::*;
        matches!(
            self,
            LessThan | LessThanEqual | GreaterThan | GreaterThanEqual | Equal | NotEqual
        )
    }
}
impl Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use BinOp::*;
        let ch = match self {
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide => "/",
            LessThan => "<",
            LessThanEqual => "<=",
            GreaterThan => ">",
            GreaterThanEqual => ">=",
            Equal => "==",
            NotEqual => "!=",
        };
        f.write_str(ch)
    }
}
impl FromStr for BinOp {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use BinOp::*;
        Ok(match s {
            "+" => Add,
            "-" => Subtract,
            "*" => Multiply,
            "/" => Divide,
            "<" => LessThan,
            "<=" => LessThanEqual,
            ">" => GreaterThan,
            ">=" => GreaterThanEqual,
            "==" => Equal,
            "!=" => NotEqual,
            _ => return Err(()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Negate,
    Not,
}
impl Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            UnOp::Negate => "-",
            UnOp::Not => "!",
        })
    }
}
