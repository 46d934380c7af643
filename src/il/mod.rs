//! Intermediate code: generation, optimisation and a textual form of three-address code.

mod generator;
mod interpreter;
mod label_generator;
mod name_generator;
mod optimiser;
mod tac;
mod text;
mod validate;

pub use generator::{generate, GeneratorOptions, Lowering};
pub use interpreter::{
    interpret, interpret_with_fuel, InterpretError, DEFAULT_FUEL, MAX_CALL_DEPTH,
};
pub use name_generator::TempPolicy;
pub use optimiser::{optimise, optimise_program, Optimised, MAX_ROUNDS};
pub use tac::*;
pub use text::{parse_program, TextError};
pub use validate::{validate_listing, validate_program};
