//! Source-level type specifications.
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// A source-level type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeSpec {
    Int,
    Float,
    Bool,
    Void,
}
impl TypeSpec {
    pub fn is_float(&self) -> bool {
        matches!(self, TypeSpec::Float)
    }
}
impl Display for TypeSpec {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            TypeSpec::Int => "int",
            TypeSpec::Float => "float",
            TypeSpec::Bool => "bool",
            TypeSpec::Void => "void",
        })
    }
}
impl FromStr for TypeSpec {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "int" => TypeSpec::Int,
            "float" => TypeSpec::Float,
            "bool" => TypeSpec::Bool,
            "void" => TypeSpec::Void,
            _ => return Err(()),
        })
    }
}
