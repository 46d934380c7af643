//! The line-oriented text form of three-address code.
//!
//! ```text
//! array a[10]: int
//! var x: float
//! x = 2.5
//! t0 = call square, 1
//!
//! function square(n: int) -> int:
//!     t0 = n * n
//!     return t0
//! ```
//!
//! Everything before the first function header belongs to the top level. Blank lines and
//! anything following a `#` are ignored. Variables are integers unless a `var` line in their
//! section says otherwise.
use std::{
    collections::HashMap,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use thiserror::Error;

use crate::ast::{BinOp, TypeSpec};

use super::tac::*;

const PRESERVED_SUFFIX: &str = "; preserved";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason}")]
pub struct TextError {
    pub line: usize,
    pub reason: String,
}
impl TextError {
    fn new<S: Into<String>>(line: usize, reason: S) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

impl Display for TacProgram {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for array in &self.arrays {
            writeln!(f, "array {}[{}]: {}", array.name, array.size, array.elem)?;
        }
        write_section(f, &self.top_level, &[], "")?;

        for function in &self.functions {
            let params = function
                .params
                .iter()
                .map(|p| format!("{}: {}", p, p.kind()))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f)?;
            writeln!(
                f,
                "function {}({}) -> {}:",
                function.name, params, function.returns
            )?;
            write_section(f, &function.body, &function.params, "    ")?;
        }
        Ok(())
    }
}

/// Writes a listing, preceded by the declarations of its float variables.
fn write_section(
    f: &mut Formatter,
    listing: &TacListing,
    params: &[Name],
    indent: &str,
) -> fmt::Result {
    let mut float_vars: Vec<&Name> = vec![];
    for instr in listing.iter_instructions() {
        let names = instr.result().into_iter().chain(instr.reads());
        for name in names {
            let is_float_var = matches!(name, Name::Var(v) if v.kind == NumericKind::Float);
            if is_float_var && !params.contains(name) && !float_vars.contains(&name) {
                float_vars.push(name);
            }
        }
    }

    for var in float_vars {
        writeln!(f, "{}var {}: float", indent, var)?;
    }
    for instr in listing.iter_instructions() {
        writeln!(f, "{}{}", indent, instr)?;
    }
    Ok(())
}

/// A function header or the top level, along with the numbered lines belonging to it.
struct Section<'a> {
    header: Option<(usize, &'a str)>,
    vars: Vec<(usize, &'a str)>,
    instructions: Vec<(usize, &'a str)>,
}
impl<'a> Section<'a> {
    fn new(header: Option<(usize, &'a str)>) -> Self {
        Self {
            header,
            vars: vec![],
            instructions: vec![],
        }
    }
}

/// Parses a program from its text form.
pub fn parse_program(text: &str) -> Result<TacProgram, TextError> {
    let mut program = TacProgram::new();
    let mut sections = vec![Section::new(None)];

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        if let Some(array) = line.strip_prefix("array ") {
            program.arrays.push(parse_array(line_no, array)?);
        } else if line.starts_with("function ") {
            sections.push(Section::new(Some((line_no, line))));
        } else if let Some(var) = line.strip_prefix("var ") {
            if let Some(section) = sections.last_mut() {
                section.vars.push((line_no, var));
            }
        } else if let Some(section) = sections.last_mut() {
            section.instructions.push((line_no, line));
        }
    }

    for section in sections {
        let (header, listing) = parse_section(&section)?;
        match header {
            None => program.top_level = listing,
            Some((name, params, returns)) => program.functions.push(TacFunction {
                name,
                params,
                returns,
                body: listing,
            }),
        }
    }
    Ok(program)
}

type Header = (String, Vec<Name>, TypeSpec);

fn parse_section(section: &Section) -> Result<(Option<Header>, TacListing), TextError> {
    let mut kinds = HashMap::new();

    let header = match section.header {
        Some((line_no, text)) => {
            let header = parse_header(line_no, text)?;
            for param in &header.1 {
                if let Name::Var(v) = param {
                    kinds.insert(v.ident.clone(), v.kind);
                }
            }
            Some(header)
        }
        None => None,
    };

    for (line_no, var) in &section.vars {
        let (ident, kind) = parse_typed(*line_no, var)?;
        kinds.insert(unescape(ident).to_string(), NumericKind::of(kind));
    }

    let listing = section
        .instructions
        .iter()
        .map(|(line_no, text)| parse_instruction(*line_no, text, &kinds))
        .collect::<Result<_, _>>()?;
    Ok((header, listing))
}

/// Parses `function name(a: int, b: float) -> type:`.
fn parse_header(line_no: usize, text: &str) -> Result<Header, TextError> {
    let malformed = || TextError::new(line_no, format!("malformed function header '{}'", text));

    let text = text
        .strip_prefix("function ")
        .and_then(|t| t.strip_suffix(':'))
        .ok_or_else(malformed)?;
    let (name, rest) = text.split_once('(').ok_or_else(malformed)?;
    let (params, returns) = rest.split_once(')').ok_or_else(malformed)?;
    let returns = returns
        .trim()
        .strip_prefix("->")
        .ok_or_else(malformed)?
        .trim();

    let params = params
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| -> Result<Name, TextError> {
            let (ident, ty) = parse_typed(line_no, p)?;
            Ok(Name::var(unescape(ident), NumericKind::of(ty)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((
        name.trim().to_string(),
        params,
        parse_type(line_no, returns)?,
    ))
}

/// Parses `a[10]: int`.
fn parse_array(line_no: usize, text: &str) -> Result<ArrayDecl, TextError> {
    let (decl, elem) = parse_typed(line_no, text)?;
    let (name, size) = decl
        .strip_suffix(']')
        .and_then(|d| d.split_once('['))
        .ok_or_else(|| TextError::new(line_no, format!("malformed array '{}'", text)))?;
    let size = size
        .parse()
        .map_err(|_| TextError::new(line_no, format!("invalid array size '{}'", size)))?;
    Ok(ArrayDecl {
        name: name.to_string(),
        elem,
        size,
    })
}

/// Parses `name: type`.
fn parse_typed(line_no: usize, text: &str) -> Result<(&str, TypeSpec), TextError> {
    let (name, ty) = text
        .split_once(':')
        .ok_or_else(|| TextError::new(line_no, format!("expected 'name: type', found '{}'", text)))?;
    Ok((name.trim(), parse_type(line_no, ty.trim())?))
}

fn parse_type(line_no: usize, text: &str) -> Result<TypeSpec, TextError> {
    TypeSpec::from_str(text)
        .map_err(|_| TextError::new(line_no, format!("unknown type '{}'", text)))
}

fn parse_instruction(
    line_no: usize,
    text: &str,
    kinds: &HashMap<String, NumericKind>,
) -> Result<Instruction, TextError> {
    let (body, preserved) = match text.strip_suffix(PRESERVED_SUFFIX) {
        Some(body) => (body.trim(), true),
        None => (text, false),
    };
    let parser = InstructionParser { line_no, kinds };
    let tokens: Vec<&str> = body.split_whitespace().collect();

    let kind = match tokens.as_slice() {
        [r, "=", "call", f, n] => InstrKind::Call(Some(parser.name(r)), parser.callee(f)?, parser.count(n)?),
        [r, "=", a, op, b] => InstrKind::Bin(
            parser.name(r),
            BinOp::from_str(op)
                .map_err(|_| TextError::new(line_no, format!("unknown operator '{}'", op)))?,
            parser.value(a)?,
            parser.value(b)?,
        ),
        [target, "=", v] if target.contains('[') => {
            let (array, index) = parser.element(target)?;
            InstrKind::ArrayStore(array, index, parser.value(v)?)
        }
        [r, "=", src] if src.contains('[') => {
            let (array, index) = parser.element(src)?;
            InstrKind::ArrayLoad(parser.name(r), array, index)
        }
        [r, "=", v] => InstrKind::Copy(parser.name(r), parser.value(v)?),
        ["label", l] => match l.strip_suffix(':') {
            Some(l) => InstrKind::Label(Label::named(l)),
            None => return Err(TextError::new(line_no, "a label must end with ':'")),
        },
        ["j", l] => InstrKind::Goto(Label::named(*l)),
        ["ifFalse", v, "goto", l] => InstrKind::IfFalse(parser.value(v)?, Label::named(*l)),
        ["print", v] => InstrKind::Print(parser.value(v)?),
        ["param", v] => InstrKind::Param(parser.value(v)?),
        ["call", f, n] => InstrKind::Call(None, parser.callee(f)?, parser.count(n)?),
        ["return"] => InstrKind::Return(None),
        ["return", v] => InstrKind::Return(Some(parser.value(v)?)),
        _ => {
            return Err(TextError::new(
                line_no,
                format!("unrecognised instruction '{}'", body),
            ))
        }
    };

    let mut instr = Instruction::new(kind);
    instr.preserved |= preserved;
    Ok(instr)
}

struct InstructionParser<'a> {
    line_no: usize,
    kinds: &'a HashMap<String, NumericKind>,
}
impl<'a> InstructionParser<'a> {
    fn name(&self, token: &str) -> Name {
        if is_temp_spelling(token) {
            let kind = match token.as_bytes()[0] {
                b'f' => NumericKind::Float,
                _ => NumericKind::Int,
            };
            // Spelling guarantees the digits.
            let index = token[1..].parse().unwrap_or_default();
            return Name::temp(index, kind);
        }
        let ident = unescape(token);
        let kind = self.kinds.get(ident).copied().unwrap_or(NumericKind::Int);
        Name::var(ident, kind)
    }

    fn value(&self, token: &str) -> Result<Value, TextError> {
        let mut chars = token.chars();
        let first = chars.next();
        let second = chars.next();
        let is_number = match (first, second) {
            (Some(c), _) if c.is_ascii_digit() => true,
            (Some('-'), Some(c)) => c.is_ascii_digit() || c == '.',
            _ => false,
        };
        if !is_number {
            return Ok(Value::Name(self.name(token)));
        }

        let invalid = || TextError::new(self.line_no, format!("invalid number '{}'", token));
        if token.contains(&['.', 'e', 'E'][..]) {
            token.parse().map(Value::float).map_err(|_| invalid())
        } else {
            token.parse().map(Value::int).map_err(|_| invalid())
        }
    }

    /// Parses `array[index]`.
    fn element(&self, token: &str) -> Result<(String, Value), TextError> {
        let (array, index) = token
            .strip_suffix(']')
            .and_then(|t| t.split_once('['))
            .ok_or_else(|| {
                TextError::new(self.line_no, format!("malformed array element '{}'", token))
            })?;
        Ok((array.to_string(), self.value(index)?))
    }

    fn callee(&self, token: &str) -> Result<String, TextError> {
        token
            .strip_suffix(',')
            .map(ToString::to_string)
            .ok_or_else(|| TextError::new(self.line_no, "expected ',' after the function name"))
    }

    fn count(&self, token: &str) -> Result<usize, TextError> {
        token.parse().map_err(|_| {
            TextError::new(self.line_no, format!("invalid argument count '{}'", token))
        })
    }
}

/// Removes the underscore that keeps a variable from being read as a temporary.
fn unescape(token: &str) -> &str {
    match token.strip_prefix('_') {
        Some(rest) if is_reserved_spelling(rest.trim_start_matches('_')) => rest,
        _ => token,
    }
}
