//! Target code generation.
mod mips;

use std::io;

use thiserror::Error;

use crate::{error::MalformedIr, il::TacProgram};

pub use mips::{assembly::Assembly, generate};

#[derive(Debug, Error)]
pub enum EmitError {
    #[error(transparent)]
    Malformed(#[from] MalformedIr),
    #[error("failed to write the assembly")]
    Io(#[from] io::Error),
}

/// Generates assembly for a program and writes it to `sink`. Nothing is written unless
/// generation succeeds.
pub fn emit<W: io::Write>(program: &TacProgram, mut sink: W) -> Result<(), EmitError> {
    let assembly = generate(program)?;
    write!(sink, "{}", assembly)?;
    sink.flush()?;
    Ok(())
}
