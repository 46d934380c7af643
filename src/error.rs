//! Diagnostics reported while compiling, and the errors that abort a stage.
use std::fmt::{self, Display, Formatter};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}
impl Display for Severity {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// A problem found in the user's program. Diagnostics are collected rather than returned
/// early, so one compilation can report every independent problem at once.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("undefined identifier '{0}'")]
    UndefinedIdentifier(String),
    #[error("function '{name}' expects {expected} argument(s), but {found} were given")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("'{0}' is not a function")]
    NotCallable(String),
    #[error("'{0}' is not an array")]
    NotAnArray(String),
    #[error("'{0}' is already declared")]
    DuplicateDeclaration(String),
    #[error("variable '{0}' is used before it is initialised and defaults to zero")]
    UninitializedVariable(String),
    #[error("division by zero in '{0}' is left to fault at runtime")]
    DivisionByZeroDeferred(String),
}
impl Diagnostic {
    /// A stable, machine-readable name for the kind of this diagnostic.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UndefinedIdentifier(_) => "UndefinedIdentifier",
            Self::ArityMismatch { .. } => "ArityMismatch",
            Self::NotCallable(_) => "NotCallable",
            Self::NotAnArray(_) => "NotAnArray",
            Self::DuplicateDeclaration(_) => "DuplicateDeclaration",
            Self::UninitializedVariable(_) => "UninitializedVariableWarning",
            Self::DivisionByZeroDeferred(_) => "DivisionByZeroDeferred",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::UninitializedVariable(_) | Self::DivisionByZeroDeferred(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Error
    }

    /// Renders the diagnostic the way it is shown to the user.
    pub fn describe(&self) -> String {
        format!("{}[{}]: {}", self.severity(), self.code(), self)
    }
}

/// Marks a collection of diagnostics that may or may not contain fatal ones.
pub trait HasFatal {
    fn has_fatal(&self) -> bool;
}
impl HasFatal for [Diagnostic] {
    fn has_fatal(&self) -> bool {
        self.iter().any(Diagnostic::is_fatal)
    }
}

/// An internal consistency violation in three-address code. Stages that consume code
/// produced by an earlier stage abort with this error instead of guessing, because it always
/// points to a bug upstream rather than to a mistake in the user's program.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MalformedIr {
    #[error("'{name}' is read on line {line} of {listing} before it is defined")]
    UndefinedName {
        listing: String,
        name: String,
        line: usize,
    },
    #[error("jump to unknown label '{label}' in {listing}")]
    UnknownLabel { listing: String, label: String },
    #[error("label '{0}' is defined more than once")]
    DuplicateLabel(String),
    #[error("call to unknown function '{0}'")]
    UnknownFunction(String),
    #[error("access to unknown array '{0}'")]
    UnknownArray(String),
    #[error("call to '{name}' passes {found} parameter(s), but it declares {expected}")]
    ParamCount {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("{count} parameter(s) on line {line} of {listing} are not followed by a call")]
    DanglingParams {
        listing: String,
        count: usize,
        line: usize,
    },
    #[error("call to '{0}' expects a result, but the function returns nothing")]
    VoidResult(String),
    #[error("function '{0}' is defined more than once")]
    DuplicateFunction(String),
}
