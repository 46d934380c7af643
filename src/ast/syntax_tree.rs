//! Syntax tree nodes, as handed over by the parser.
use std::{
    fmt::{self, Display},
    slice,
};

use super::{BinOp, TypeSpec, UnOp};

/// A node in the syntax tree. Every child is owned by exactly one parent.
///
/// A [`SyntaxNode::Program`] doubles as a statement block: the branches of an
/// if-statement and the body of a function are programs of their own.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxNode {
    Program(Vec<SyntaxNode>),
    Declaration(TypeSpec, String),
    Assignment(String, Box<SyntaxNode>),
    Write(Box<SyntaxNode>),
    If(Box<SyntaxNode>, Box<SyntaxNode>, Option<Box<SyntaxNode>>),
    Return(Option<Box<SyntaxNode>>),
    IntegerLiteral(i32),
    FloatLiteral(f32),
    BooleanLiteral(bool),
    Identifier(String),
    BinaryOp(BinOp, Box<SyntaxNode>, Box<SyntaxNode>),
    UnaryOp(UnOp, Box<SyntaxNode>),
    VariableDeclaration(String, TypeSpec),
    FunctionDeclaration {
        id: String,
        params: Box<SyntaxNode>,
        return_type: TypeSpec,
        body: Box<SyntaxNode>,
    },
    FunctionPrototype {
        id: String,
        params: Box<SyntaxNode>,
        return_type: TypeSpec,
    },
    Parameter(String, TypeSpec),
    ParameterList(Vec<SyntaxNode>),
    FunctionCall(String, Box<SyntaxNode>),
    ArgumentList(Vec<SyntaxNode>),
    ArrayDeclaration(String, TypeSpec, usize),
    ArrayAccess(String, Box<SyntaxNode>),
    ArrayAssignment(String, Box<SyntaxNode>, Box<SyntaxNode>),
}

impl SyntaxNode {
    pub fn program(statements: Vec<SyntaxNode>) -> Self {
        Self::Program(statements)
    }

    pub fn declaration(type_spec: TypeSpec, id: &str) -> Self {
        Self::Declaration(type_spec, id.to_string())
    }

    pub fn var_decl(id: &str, type_spec: TypeSpec) -> Self {
        Self::VariableDeclaration(id.to_string(), type_spec)
    }

    pub fn assign(id: &str, value: SyntaxNode) -> Self {
        Self::Assignment(id.to_string(), Box::new(value))
    }

    pub fn write(expr: SyntaxNode) -> Self {
        Self::Write(Box::new(expr))
    }

    pub fn if_then(condition: SyntaxNode, then: SyntaxNode) -> Self {
        Self::If(Box::new(condition), Box::new(then), None)
    }

    pub fn if_else(condition: SyntaxNode, then: SyntaxNode, otherwise: SyntaxNode) -> Self {
        Self::If(
            Box::new(condition),
            Box::new(then),
            Some(Box::new(otherwise)),
        )
    }

    pub fn ret(expr: Option<SyntaxNode>) -> Self {
        Self::Return(expr.map(Box::new))
    }

    pub fn int(value: i32) -> Self {
        Self::IntegerLiteral(value)
    }

    pub fn float(value: f32) -> Self {
        Self::FloatLiteral(value)
    }

    pub fn boolean(value: bool) -> Self {
        Self::BooleanLiteral(value)
    }

    pub fn ident(name: &str) -> Self {
        Self::Identifier(name.to_string())
    }

    pub fn binary(op: BinOp, lhs: SyntaxNode, rhs: SyntaxNode) -> Self {
        Self::BinaryOp(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn unary(op: UnOp, expr: SyntaxNode) -> Self {
        Self::UnaryOp(op, Box::new(expr))
    }

    pub fn function(
        id: &str,
        params: &[(&str, TypeSpec)],
        return_type: TypeSpec,
        body: Vec<SyntaxNode>,
    ) -> Self {
        Self::FunctionDeclaration {
            id: id.to_string(),
            params: Box::new(Self::parameter_list(params)),
            return_type,
            body: Box::new(Self::Program(body)),
        }
    }

    pub fn prototype(id: &str, params: &[(&str, TypeSpec)], return_type: TypeSpec) -> Self {
        Self::FunctionPrototype {
            id: id.to_string(),
            params: Box::new(Self::parameter_list(params)),
            return_type,
        }
    }

    pub fn call(id: &str, args: Vec<SyntaxNode>) -> Self {
        Self::FunctionCall(id.to_string(), Box::new(Self::ArgumentList(args)))
    }

    pub fn array_decl(id: &str, elem_type: TypeSpec, size: usize) -> Self {
        Self::ArrayDeclaration(id.to_string(), elem_type, size)
    }

    pub fn index(id: &str, index: SyntaxNode) -> Self {
        Self::ArrayAccess(id.to_string(), Box::new(index))
    }

    pub fn array_assign(id: &str, index: SyntaxNode, value: SyntaxNode) -> Self {
        Self::ArrayAssignment(id.to_string(), Box::new(index), Box::new(value))
    }

    fn parameter_list(params: &[(&str, TypeSpec)]) -> Self {
        Self::ParameterList(
            params
                .iter()
                .map(|(id, ty)| Self::Parameter(id.to_string(), *ty))
                .collect(),
        )
    }

    /// The items of a list-like node (programs, parameter lists and argument lists).
    /// Any other node is treated as a list containing only itself.
    pub fn items(&self) -> &[SyntaxNode] {
        match self {
            Self::Program(items) | Self::ParameterList(items) | Self::ArgumentList(items) => items,
            other => slice::from_ref(other),
        }
    }

    /// The name and type of every parameter in a parameter list.
    pub fn parameters(&self) -> Vec<(&str, TypeSpec)> {
        self.items()
            .iter()
            .filter_map(|item| match item {
                Self::Parameter(id, ty) => Some((id.as_str(), *ty)),
                _ => None,
            })
            .collect()
    }
}

impl Display for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use SyntaxNode::*;
        match self {
            Program(items) | ArgumentList(items) | ParameterList(items) => {
                let items: Vec<_> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", items.join(", "))
            }
            Declaration(ty, id) => write!(f, "{} {};", ty, id),
            VariableDeclaration(id, ty) => write!(f, "var {}: {};", id, ty),
            Assignment(id, value) => write!(f, "{} = {};", id, value),
            Write(expr) => write!(f, "write {};", expr),
            If(cond, then, None) => write!(f, "if ({}) {{ {} }}", cond, then),
            If(cond, then, Some(otherwise)) => {
                write!(f, "if ({}) {{ {} }} else {{ {} }}", cond, then, otherwise)
            }
            Return(None) => f.write_str("return;"),
            Return(Some(expr)) => write!(f, "return {};", expr),
            IntegerLiteral(i) => write!(f, "{}", i),
            FloatLiteral(x) => write!(f, "{:?}", x),
            BooleanLiteral(b) => write!(f, "{}", b),
            Identifier(id) => f.write_str(id),
            BinaryOp(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op, rhs),
            UnaryOp(op, expr) => write!(f, "({}{})", op, expr),
            FunctionDeclaration {
                id,
                params,
                return_type,
                ..
            } => write!(f, "func {}({}) -> {} {{ ... }}", id, params, return_type),
            FunctionPrototype {
                id,
                params,
                return_type,
            } => write!(f, "func {}({}) -> {};", id, params, return_type),
            Parameter(id, ty) => write!(f, "{}: {}", id, ty),
            FunctionCall(id, args) => write!(f, "{}({})", id, args),
            ArrayDeclaration(id, ty, size) => write!(f, "{} {}[{}];", ty, id, size),
            ArrayAccess(id, index) => write!(f, "{}[{}]", id, index),
            ArrayAssignment(id, index, value) => write!(f, "{}[{}] = {};", id, index, value),
        }
    }
}
