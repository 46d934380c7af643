//! The symbol table consulted while lowering a syntax tree.
//!
//! The table is flat: every declaration in the program, including the parameters and locals
//! of function bodies, shares one namespace. Redeclaring a name in the scope that already
//! declares it is a [`Diagnostic::DuplicateDeclaration`].
use std::collections::{hash_map::Entry, HashMap, HashSet};

use crate::{
    ast::{SyntaxNode, TypeSpec},
    error::Diagnostic,
    prelude::*,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Scalar { ty: TypeSpec },
    Array { ty: TypeSpec, size: usize },
    Function { params: Vec<TypeSpec>, returns: TypeSpec },
}
impl Declaration {
    /// The type of the value produced by reading this symbol.
    pub fn value_type(&self) -> TypeSpec {
        match self {
            Self::Scalar { ty } | Self::Array { ty, .. } => *ty,
            Self::Function { returns, .. } => *returns,
        }
    }
}

#[derive(Debug, Clone)]
struct Symbol {
    declaration: Declaration,
    initialized: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}
impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&Declaration> {
        self.symbols.get(name).map(|s| &s.declaration)
    }

    pub fn declare(&mut self, name: &str, declaration: Declaration) -> Result<(), Diagnostic> {
        match self.symbols.entry(name.to_string()) {
            Entry::Occupied(_) => Err(Diagnostic::DuplicateDeclaration(name.to_string())),
            Entry::Vacant(v) => {
                v.insert(Symbol {
                    declaration,
                    initialized: false,
                });
                Ok(())
            }
        }
    }

    /// Declares a function. A function may be declared any number of times (by prototypes
    /// and its definition), as long as every declaration has the same signature.
    pub fn declare_function(
        &mut self,
        name: &str,
        params: Vec<TypeSpec>,
        returns: TypeSpec,
    ) -> Result<(), Diagnostic> {
        let declaration = Declaration::Function { params, returns };
        match self.lookup(name) {
            Some(existing) if *existing == declaration => Ok(()),
            _ => self.declare(name, declaration),
        }
    }

    pub fn mark_initialized(&mut self, name: &str) {
        if let Some(symbol) = self.symbols.get_mut(name) {
            symbol.initialized = true;
        }
    }

    pub fn is_initialized(&self, name: &str) -> bool {
        self.symbols.get(name).map_or(false, |s| s.initialized)
    }

    /// Marks every symbol as holding no value yet, as on entry to a function body.
    pub fn forget_initialization(&mut self) {
        self.symbols.values_mut().for_each(|s| s.initialized = false);
    }
}

/// Collects every declaration in a syntax tree into a new symbol table.
pub fn collect(tree: &SyntaxNode) -> (SymbolTable, Vec<Diagnostic>) {
    let mut collector = Collector {
        table: SymbolTable::new(),
        diagnostics: vec![],
        scope: HashSet::new(),
        depth: 0,
    };
    collector.visit(tree);
    debug!(
        "collected {} symbol(s), {} diagnostic(s)",
        collector.table.symbols.len(),
        collector.diagnostics.len()
    );
    (collector.table, collector.diagnostics)
}

struct Collector {
    table: SymbolTable,
    diagnostics: Vec<Diagnostic>,
    /// Names declared by the scope currently being visited.
    scope: HashSet<String>,
    depth: usize,
}
impl Collector {
    fn visit(&mut self, node: &SyntaxNode) {
        match node {
            SyntaxNode::Program(items) => items.iter().for_each(|item| self.visit(item)),
            SyntaxNode::Declaration(ty, id) | SyntaxNode::VariableDeclaration(id, ty) => {
                self.declare(id, Declaration::Scalar { ty: *ty })
            }
            SyntaxNode::ArrayDeclaration(id, ty, size) => self.declare(
                id,
                Declaration::Array {
                    ty: *ty,
                    size: *size,
                },
            ),
            SyntaxNode::FunctionPrototype {
                id,
                params,
                return_type,
            } => self.declare_function(id, params, *return_type),
            SyntaxNode::FunctionDeclaration {
                id,
                params,
                return_type,
                body,
            } => {
                self.declare_function(id, params, *return_type);

                let outer = std::mem::take(&mut self.scope);
                self.depth += 1;
                for (param, ty) in params.parameters() {
                    self.declare(param, Declaration::Scalar { ty });
                }
                self.visit(body);
                self.depth -= 1;
                self.scope = outer;
            }
            SyntaxNode::If(_, then, otherwise) => {
                self.visit(then);
                if let Some(otherwise) = otherwise {
                    self.visit(otherwise);
                }
            }
            _ => (),
        }
    }

    fn declare(&mut self, id: &str, declaration: Declaration) {
        if !self.scope.insert(id.to_string()) {
            self.diagnostics
                .push(Diagnostic::DuplicateDeclaration(id.to_string()));
            return;
        }
        // Locals of different function bodies share the flat table. A local never replaces
        // an existing entry, a global always does.
        match self.table.lookup(id) {
            Some(existing) if *existing == declaration => (),
            Some(_) if self.depth > 0 => trace!("local '{}' shadows an earlier declaration", id),
            _ => {
                self.table.symbols.insert(
                    id.to_string(),
                    Symbol {
                        declaration,
                        initialized: false,
                    },
                );
            }
        }
    }

    fn declare_function(&mut self, id: &str, params: &SyntaxNode, returns: TypeSpec) {
        let params = params.parameters().into_iter().map(|(_, ty)| ty).collect();
        if let Err(e) = self.table.declare_function(id, params, returns) {
            self.diagnostics.push(e);
        }
        self.scope.insert(id.to_string());
    }
}
