//! A reference interpreter for three-address code.
//!
//! The interpreter gives optimised and unoptimised code a common yardstick: both must print
//! the same values. Every value is converted to the kind of the name it is stored in, the way
//! the target machine converts between its integer and float registers.
use std::collections::HashMap;

use thiserror::Error;

use crate::{
    ast::TypeSpec,
    error::MalformedIr,
    listing::Position,
    prelude::*,
};

use super::{tac::*, validate::validate_program};

/// The number of instructions a program may execute before it is considered to loop forever.
pub const DEFAULT_FUEL: usize = 1_000_000;
/// The deepest call nesting a program may reach.
pub const MAX_CALL_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretError {
    #[error("division by zero in '{0}'")]
    DivisionByZero(String),
    #[error("index {index} is out of bounds for array '{array}'")]
    IndexOutOfBounds { array: String, index: TargetInt },
    #[error("the program did not finish within {0} steps")]
    FuelExhausted(usize),
    #[error("calls are nested deeper than {0} levels")]
    CallDepthExceeded(usize),
    #[error("'{0}' is read before it holds a value")]
    UndefinedName(String),
    #[error(transparent)]
    Malformed(#[from] MalformedIr),
}

/// Runs a program, returning every value it prints.
pub fn interpret(program: &TacProgram) -> Result<Vec<Constant>, InterpretError> {
    interpret_with_fuel(program, DEFAULT_FUEL)
}

pub fn interpret_with_fuel(
    program: &TacProgram,
    fuel: usize,
) -> Result<Vec<Constant>, InterpretError> {
    validate_program(program)?;
    let mut interpreter = Interpreter::new(program, fuel);
    interpreter.execute(&program.top_level, HashMap::new(), 0)?;
    debug!(
        "program printed {} value(s) in {} step(s)",
        interpreter.output.len(),
        fuel - interpreter.fuel
    );
    Ok(interpreter.output)
}

type Frame = HashMap<Name, Constant>;

struct Interpreter<'a> {
    program: &'a TacProgram,
    initial_fuel: usize,
    fuel: usize,
    arrays: HashMap<&'a str, Vec<Constant>>,
    output: Vec<Constant>,
}
impl<'a> Interpreter<'a> {
    fn new(program: &'a TacProgram, fuel: usize) -> Self {
        let arrays = program
            .arrays
            .iter()
            .map(|a| {
                let zero = Constant::zero(NumericKind::of(a.elem));
                (a.name.as_str(), vec![zero; a.size])
            })
            .collect();
        Self {
            program,
            initial_fuel: fuel,
            fuel,
            arrays,
            output: vec![],
        }
    }

    /// Executes a listing until it returns or runs off its end.
    fn execute(
        &mut self,
        listing: &'a TacListing,
        mut frame: Frame,
        depth: usize,
    ) -> Result<Option<Constant>, InterpretError> {
        let labels: HashMap<&Label, usize> = listing
            .iter_lines()
            .filter_map(|(line, instr)| match &instr.kind {
                InstrKind::Label(lbl) => Some((lbl, line.0)),
                _ => None,
            })
            .collect();
        let jump = |lbl: &Label| {
            labels.get(lbl).copied().ok_or_else(|| {
                MalformedIr::UnknownLabel {
                    listing: "<interpreter>".to_string(),
                    label: lbl.to_string(),
                }
            })
        };

        let mut params = vec![];
        let mut pc = 0;
        while let Some(instr) = listing.get(Position(pc)) {
            if self.fuel == 0 {
                return Err(InterpretError::FuelExhausted(self.initial_fuel));
            }
            self.fuel -= 1;
            pc += 1;

            match &instr.kind {
                InstrKind::Copy(result, value) => {
                    let value = read(&frame, value)?;
                    write(&mut frame, result, value);
                }
                InstrKind::Bin(result, op, lhs, rhs) => {
                    let value = Constant::evaluate(*op, read(&frame, lhs)?, read(&frame, rhs)?)
                        .map_err(|_| InterpretError::DivisionByZero(instr.kind.to_string()))?;
                    write(&mut frame, result, value);
                }
                InstrKind::Print(value) => {
                    let value = read(&frame, value)?;
                    trace!("print {}", value);
                    self.output.push(value);
                }
                InstrKind::Label(_) => (),
                InstrKind::IfFalse(value, lbl) => {
                    if read(&frame, value)?.is_zero() {
                        pc = jump(lbl)?;
                    }
                }
                InstrKind::Goto(lbl) => pc = jump(lbl)?,
                InstrKind::Param(value) => params.push(read(&frame, value)?),
                InstrKind::Call(result, name, argcount) => {
                    let args = params.split_off(params.len().saturating_sub(*argcount));
                    let value = self.call(name, args, depth + 1)?;
                    if let Some(result) = result {
                        let value = value.unwrap_or_else(|| Constant::zero(result.kind()));
                        write(&mut frame, result, value);
                    }
                }
                InstrKind::Return(value) => {
                    return value.as_ref().map(|v| read(&frame, v)).transpose();
                }
                InstrKind::ArrayLoad(result, array, index) => {
                    let index = read(&frame, index)?;
                    let value = *self.element(array, index)?;
                    write(&mut frame, result, value);
                }
                InstrKind::ArrayStore(array, index, value) => {
                    let index = read(&frame, index)?;
                    let value = read(&frame, value)?;
                    let element = self.element(array, index)?;
                    *element = value.convert(element.kind());
                }
            }
        }
        Ok(None)
    }

    fn call(
        &mut self,
        name: &str,
        args: Vec<Constant>,
        depth: usize,
    ) -> Result<Option<Constant>, InterpretError> {
        if depth > MAX_CALL_DEPTH {
            return Err(InterpretError::CallDepthExceeded(MAX_CALL_DEPTH));
        }
        let function = self
            .program
            .function(name)
            .ok_or_else(|| MalformedIr::UnknownFunction(name.to_string()))?;

        let mut frame = Frame::new();
        for (param, arg) in function.params.iter().zip(args) {
            write(&mut frame, param, arg);
        }
        let value = self.execute(&function.body, frame, depth)?;

        Ok(match function.returns {
            TypeSpec::Void => None,
            returns => {
                let kind = NumericKind::of(returns);
                Some(value.map_or(Constant::zero(kind), |v| v.convert(kind)))
            }
        })
    }

    fn element(&mut self, array: &str, index: Constant) -> Result<&mut Constant, InterpretError> {
        let elements = self
            .arrays
            .get_mut(array)
            .ok_or_else(|| MalformedIr::UnknownArray(array.to_string()))?;
        let index = index.as_int();
        usize::try_from(index)
            .ok()
            .and_then(|i| elements.get_mut(i))
            .ok_or_else(|| InterpretError::IndexOutOfBounds {
                array: array.to_string(),
                index,
            })
    }
}

fn read(frame: &Frame, value: &Value) -> Result<Constant, InterpretError> {
    match value {
        Value::Const(c) => Ok(*c),
        Value::Name(name) => frame
            .get(name)
            .copied()
            .ok_or_else(|| InterpretError::UndefinedName(name.to_string())),
    }
}

fn write(frame: &mut Frame, name: &Name, value: Constant) {
    frame.insert(name.clone(), value.convert(name.kind()));
}
