use std::collections::{HashMap, HashSet};

use crate::{
    ast::{BinOp, SyntaxNode, TypeSpec, UnOp},
    error::{Diagnostic, HasFatal, Severity},
    listing::Position,
    prelude::*,
    symbols::{Declaration, SymbolTable},
};

use super::{label_generator::*, name_generator::*, tac::*};

#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratorOptions {
    pub temp_policy: TempPolicy,
}

/// The result of lowering a syntax tree: the program, along with every diagnostic that was
/// reported on the way.
#[derive(Debug)]
pub struct Lowering {
    pub program: TacProgram,
    pub diagnostics: Vec<Diagnostic>,
}
impl Lowering {
    /// A lowering is valid when none of its diagnostics are errors.
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.has_fatal()
    }
}

/// Lowers a syntax tree to three-address code.
///
/// Lowering never stops at the first problem. Every problem is reported as a diagnostic,
/// and a placeholder is used in place of the offending expression.
pub fn generate(
    tree: &SyntaxNode,
    symbols: &mut SymbolTable,
    options: GeneratorOptions,
) -> Lowering {
    TacGenerator::generate(tree, symbols, options)
}

/// The code being lowered for one listing, and the state only that listing can see.
struct Scope {
    listing: TacListing,
    /// The name currently holding the value of each identifier.
    bindings: HashMap<String, Name>,
    name_generator: NameGenerator,
}
impl Scope {
    fn new(policy: TempPolicy) -> Self {
        Self {
            listing: TacListing::new(),
            bindings: HashMap::new(),
            name_generator: NameGenerator::new(policy),
        }
    }
}

struct TacGenerator<'a> {
    symbols: &'a mut SymbolTable,
    options: GeneratorOptions,
    program: TacProgram,
    diagnostics: Vec<Diagnostic>,
    label_generator: LabelGenerator,
    scope: Scope,
    defined_functions: HashSet<String>,
}
impl<'a> TacGenerator<'a> {
    /// Generate a three-address code program for a syntax tree.
    fn generate(
        tree: &SyntaxNode,
        symbols: &'a mut SymbolTable,
        options: GeneratorOptions,
    ) -> Lowering {
        let mut tac = Self {
            symbols,
            options,
            program: TacProgram::new(),
            diagnostics: vec![],
            label_generator: LabelGenerator::new(),
            scope: Scope::new(options.temp_policy),
            defined_functions: HashSet::new(),
        };

        tac.declare_arrays(tree);
        tac.lower_stmt(tree);
        tac.program.top_level = tac.scope.listing;

        debug!(
            "lowered {} top-level instruction(s) and {} function(s), {} diagnostic(s)",
            tac.program.top_level.len(),
            tac.program.functions.len(),
            tac.diagnostics.len()
        );

        Lowering {
            program: tac.program,
            diagnostics: tac.diagnostics,
        }
    }

    /// Records every array in the tree, in declaration order. Arrays are global, so they
    /// are known before any code referring to them is lowered.
    fn declare_arrays(&mut self, node: &SyntaxNode) {
        match node {
            SyntaxNode::ArrayDeclaration(id, _, _) => {
                if self.program.array(id).is_some() {
                    return;
                }
                if let Some(Declaration::Array { ty, size }) = self.symbols.lookup(id) {
                    self.program.arrays.push(ArrayDecl {
                        name: id.clone(),
                        elem: *ty,
                        size: *size,
                    });
                }
            }
            SyntaxNode::Program(items) => items.iter().for_each(|i| self.declare_arrays(i)),
            SyntaxNode::If(_, then, otherwise) => {
                self.declare_arrays(then);
                if let Some(otherwise) = otherwise {
                    self.declare_arrays(otherwise);
                }
            }
            SyntaxNode::FunctionDeclaration { body, .. } => self.declare_arrays(body),
            _ => (),
        }
    }

    /// Lower a statement.
    fn lower_stmt(&mut self, node: &SyntaxNode) {
        match node {
            SyntaxNode::Program(statements) => {
                for stmt in statements {
                    self.lower_stmt(stmt);
                }
            }
            SyntaxNode::Declaration(..)
            | SyntaxNode::VariableDeclaration(..)
            | SyntaxNode::ArrayDeclaration(..) => (),
            SyntaxNode::Assignment(id, value) => self.lower_assign(id, value),
            SyntaxNode::Write(expr) => {
                let value = self.lower_expr(expr);
                self.consume(&value);
                self.emit(InstrKind::Print(value));
            }
            SyntaxNode::If(cond, then, otherwise) => {
                self.lower_if(cond, then, otherwise.as_deref())
            }
            SyntaxNode::Return(expr) => {
                let value = expr.as_ref().map(|e| self.lower_expr(e));
                if let Some(value) = &value {
                    self.consume(value);
                }
                self.emit(InstrKind::Return(value));
            }
            SyntaxNode::FunctionDeclaration {
                id,
                params,
                return_type,
                body,
            } => self.lower_function(id, params, *return_type, body),
            SyntaxNode::FunctionPrototype {
                id,
                params,
                return_type,
            } => {
                let param_types = params.parameters().into_iter().map(|(_, ty)| ty).collect();
                if let Err(e) = self.symbols.declare_function(id, param_types, *return_type) {
                    self.report(e);
                }
            }
            SyntaxNode::ArrayAssignment(id, index, value) => {
                self.lower_array_store(id, index, value)
            }
            // Any other node is an expression evaluated for its effects, such as a call.
            expr => {
                let value = self.lower_expr(expr);
                self.consume(&value);
            }
        }
    }

    /// Lower an assignment. The variable is bound to its own name, so an assignment always
    /// results in a copy into that name.
    fn lower_assign(&mut self, id: &str, value: &SyntaxNode) {
        let value = self.lower_expr(value);
        self.consume(&value);

        let target = if let Some(bound) = self.scope.bindings.get(id) {
            bound.clone()
        } else if let Some(decl) = self.symbols.lookup(id) {
            Name::var(id, NumericKind::of(decl.value_type()))
        } else {
            self.report(Diagnostic::UndefinedIdentifier(id.to_string()));
            Name::var(id, value.kind())
        };

        self.emit(InstrKind::Copy(target.clone(), value));
        self.symbols.mark_initialized(id);
        self.scope.bindings.insert(id.to_string(), target);
    }

    /// Lower an if-statement. Both labels are always emitted, even without an else-branch.
    /// A variable that only some branches assign is zeroed before the statement, so that it
    /// holds a value on every path leaving it.
    fn lower_if(&mut self, cond: &SyntaxNode, then: &SyntaxNode, otherwise: Option<&SyntaxNode>) {
        let start = Position(self.scope.listing.len());
        let cond = self.lower_expr(cond);
        self.consume(&cond);
        let bound_before = self.scope.bindings.clone();

        let else_lbl = self.label_generator.next_label("if_else");
        let end_lbl = self.label_generator.next_label("if_end");

        self.emit(InstrKind::IfFalse(cond, else_lbl.clone()));
        self.lower_stmt(then);
        let bound_then = std::mem::replace(&mut self.scope.bindings, bound_before.clone());

        self.emit(InstrKind::Goto(end_lbl.clone()));
        self.emit(InstrKind::Label(else_lbl));
        if let Some(otherwise) = otherwise {
            self.lower_stmt(otherwise);
        }
        self.emit(InstrKind::Label(end_lbl));

        let mut partial: Vec<_> = bound_then
            .iter()
            .chain(self.scope.bindings.iter())
            .filter(|(id, _)| !bound_before.contains_key(*id))
            .filter(|(id, _)| {
                !(bound_then.contains_key(*id) && self.scope.bindings.contains_key(*id))
            })
            .map(|(id, name)| (id.clone(), name.clone()))
            .collect();
        partial.sort_by(|a, b| a.0.cmp(&b.0));
        partial.dedup_by(|a, b| a.0 == b.0);

        for (id, name) in partial.into_iter().rev() {
            trace!("'{}' is assigned on some paths only, zeroing it first", id);
            let zero = Value::Const(Constant::zero(name.kind()));
            self.scope
                .listing
                .insert(start, Instruction::new(InstrKind::Copy(name.clone(), zero)));
            self.scope.bindings.insert(id, name);
        }
        for (id, name) in bound_then {
            self.scope.bindings.entry(id).or_insert(name);
        }
    }

    /// Lower a function declaration into a listing of its own. The body sees only its own
    /// variables, and its parameters are bound before the first statement. Initialisation
    /// state inside the body does not leak into the enclosing code.
    fn lower_function(
        &mut self,
        id: &str,
        params: &SyntaxNode,
        returns: TypeSpec,
        body: &SyntaxNode,
    ) {
        let params = params.parameters();
        let param_types = params.iter().map(|(_, ty)| *ty).collect();
        if let Err(e) = self.symbols.declare_function(id, param_types, returns) {
            self.report(e);
            return;
        }
        if !self.defined_functions.insert(id.to_string()) {
            self.report(Diagnostic::DuplicateDeclaration(id.to_string()));
            return;
        }

        let outer = std::mem::replace(&mut self.scope, Scope::new(self.options.temp_policy));
        let outer_symbols = self.symbols.clone();
        self.symbols.forget_initialization();
        let mut param_names = vec![];
        for (param, ty) in params {
            let name = Name::var(param, NumericKind::of(ty));
            self.scope.bindings.insert(param.to_string(), name.clone());
            self.symbols.mark_initialized(param);
            param_names.push(name);
        }

        self.lower_stmt(body);

        let scope = std::mem::replace(&mut self.scope, outer);
        *self.symbols = outer_symbols;
        debug!("lowered function '{}' ({} instructions)", id, scope.listing.len());
        self.program.functions.push(TacFunction {
            name: id.to_string(),
            params: param_names,
            returns,
            body: scope.listing,
        });
    }

    /// Lower an expression.
    fn lower_expr(&mut self, node: &SyntaxNode) -> Value {
        match node {
            SyntaxNode::IntegerLiteral(i) => Value::int(*i),
            SyntaxNode::FloatLiteral(x) => Value::float(*x),
            SyntaxNode::BooleanLiteral(b) => Value::int(*b as TargetInt),
            SyntaxNode::Identifier(id) => self.lower_identifier(id),
            SyntaxNode::BinaryOp(op, lhs, rhs) => self.lower_binary(*op, lhs, rhs),
            SyntaxNode::UnaryOp(op, expr) => self.lower_unary(*op, expr),
            SyntaxNode::FunctionCall(id, args) => self.lower_call(id, args),
            SyntaxNode::ArrayAccess(id, index) => self.lower_array_load(id, index),
            other => {
                warn!("'{}' is not an expression, using 0 in its place", other);
                Value::int(0)
            }
        }
    }

    /// Convert an identifier to a [`Value`]. A declared variable that holds no value yet is
    /// set to zero first.
    fn lower_identifier(&mut self, id: &str) -> Value {
        if let Some(name) = self.scope.bindings.get(id) {
            return name.clone().into();
        }

        match self.symbols.lookup(id) {
            Some(Declaration::Scalar { ty }) => {
                let name = Name::var(id, NumericKind::of(*ty));
                if !self.symbols.is_initialized(id) {
                    self.report(Diagnostic::UninitializedVariable(id.to_string()));
                }
                self.emit(InstrKind::Copy(
                    name.clone(),
                    Value::Const(Constant::zero(name.kind())),
                ));
                self.symbols.mark_initialized(id);
                self.scope.bindings.insert(id.to_string(), name.clone());
                name.into()
            }
            _ => {
                self.report(Diagnostic::UndefinedIdentifier(id.to_string()));
                Value::int(0)
            }
        }
    }

    /// Lower a binary expression. Constant operands are not folded here; that is left to
    /// the optimiser.
    fn lower_binary(&mut self, op: BinOp, lhs: &SyntaxNode, rhs: &SyntaxNode) -> Value {
        let lhs = self.lower_expr(lhs);
        let rhs = self.lower_expr(rhs);
        self.consume(&lhs);
        self.consume(&rhs);

        let kind = NumericKind::of_binary(op, lhs.kind(), rhs.kind());
        let result = self.scope.name_generator.next_temp(kind);
        self.emit(InstrKind::Bin(result.clone(), op, lhs, rhs));
        result.into()
    }

    /// Lower a unary expression: `-e` becomes `0 - e`, `!e` becomes `e == 0`.
    fn lower_unary(&mut self, op: UnOp, expr: &SyntaxNode) -> Value {
        let value = self.lower_expr(expr);
        self.consume(&value);

        let kind = match op {
            UnOp::Negate => value.kind(),
            UnOp::Not => NumericKind::Int,
        };
        let result = self.scope.name_generator.next_temp(kind);
        let instr = match op {
            UnOp::Negate => InstrKind::Bin(result.clone(), BinOp::Subtract, Value::int(0), value),
            UnOp::Not => InstrKind::Bin(result.clone(), BinOp::Equal, value, Value::int(0)),
        };
        self.emit(instr);
        result.into()
    }

    /// Lower a function call. Its arguments are passed as parameters, then the function is
    /// called. When the call itself is in error, no parameters are passed at all.
    fn lower_call(&mut self, id: &str, args: &SyntaxNode) -> Value {
        let values: Vec<_> = args.items().iter().map(|a| self.lower_expr(a)).collect();
        for value in &values {
            self.consume(value);
        }

        let (params, returns) = match self.symbols.lookup(id).cloned() {
            Some(Declaration::Function { params, returns }) => (params, returns),
            Some(_) => {
                self.report(Diagnostic::NotCallable(id.to_string()));
                return Value::int(0);
            }
            None => {
                self.report(Diagnostic::UndefinedIdentifier(id.to_string()));
                return Value::int(0);
            }
        };
        let placeholder = Value::Const(Constant::zero(NumericKind::of(returns)));
        if params.len() != values.len() {
            self.report(Diagnostic::ArityMismatch {
                name: id.to_string(),
                expected: params.len(),
                found: values.len(),
            });
            return placeholder;
        }

        let argcount = values.len();
        for value in values {
            self.emit(InstrKind::Param(value));
        }

        if returns == TypeSpec::Void {
            self.emit(InstrKind::Call(None, id.to_string(), argcount));
            return placeholder;
        }
        let result = self
            .scope
            .name_generator
            .next_temp(NumericKind::of(returns));
        self.emit(InstrKind::Call(Some(result.clone()), id.to_string(), argcount));
        result.into()
    }

    fn lower_array_load(&mut self, id: &str, index: &SyntaxNode) -> Value {
        let index = self.lower_expr(index);
        self.consume(&index);

        match self.array_type(id) {
            Some(elem) => {
                let result = self.scope.name_generator.next_temp(NumericKind::of(elem));
                self.emit(InstrKind::ArrayLoad(result.clone(), id.to_string(), index));
                result.into()
            }
            None => Value::int(0),
        }
    }

    fn lower_array_store(&mut self, id: &str, index: &SyntaxNode, value: &SyntaxNode) {
        let index = self.lower_expr(index);
        let value = self.lower_expr(value);
        self.consume(&index);
        self.consume(&value);

        if self.array_type(id).is_some() {
            self.emit(InstrKind::ArrayStore(id.to_string(), index, value));
        }
    }

    /// The element type of an array, or [`None`] after reporting why `id` is no array.
    fn array_type(&mut self, id: &str) -> Option<TypeSpec> {
        match self.symbols.lookup(id) {
            Some(Declaration::Array { ty, .. }) => Some(*ty),
            Some(_) => {
                self.report(Diagnostic::NotAnArray(id.to_string()));
                None
            }
            None => {
                self.report(Diagnostic::UndefinedIdentifier(id.to_string()));
                None
            }
        }
    }

    /// Marks a value as used up. Temporaries are read exactly once, so a consumed
    /// temporary may be handed out again.
    fn consume(&mut self, value: &Value) {
        if let Some(name) = value.as_name() {
            self.scope.name_generator.release(name);
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity() {
            Severity::Warning => warn!("{}", diagnostic.describe()),
            Severity::Error => debug!("{}", diagnostic.describe()),
        }
        self.diagnostics.push(diagnostic);
    }

    /// Emit an instruction, adding it to the listing.
    fn emit(&mut self, kind: InstrKind) {
        let instr = Instruction::new(kind);
        trace!("emit {}", instr);
        self.scope.listing.push(instr);
    }
}

#[cfg(test)]
mod tests {
    use crate::symbols::collect;

    use super::*;

    use SyntaxNode as N;

    fn lower(statements: Vec<SyntaxNode>, temp_policy: TempPolicy) -> Lowering {
        let tree = N::program(statements);
        let (mut symbols, _) = collect(&tree);
        generate(&tree, &mut symbols, GeneratorOptions { temp_policy })
    }

    fn lines(listing: &TacListing) -> Vec<String> {
        listing.iter_instructions().map(ToString::to_string).collect()
    }

    macro_rules! assert_generates {
        ($statements:expr, $il:expr) => {{
            let lowering = lower($statements, TempPolicy::Monotonic);
            assert_eq!(&$il[..], lines(&lowering.program.top_level))
        }};
    }

    #[test]
    fn assignment_of_binary_expression_generates_tac() {
        assert_generates!(
            vec![
                N::declaration(TypeSpec::Int, "x"),
                N::assign("x", N::binary(BinOp::Add, N::int(2), N::int(3))),
                N::write(N::ident("x")),
            ],
            ["t0 = 2 + 3", "x = t0", "print x"]
        )
    }

    #[test]
    fn reassignment_copies_into_the_same_name() {
        assert_generates!(
            vec![
                N::declaration(TypeSpec::Int, "a"),
                N::assign("a", N::int(10)),
                N::assign("a", N::binary(BinOp::Add, N::ident("a"), N::int(1))),
            ],
            ["a = 10", "t0 = a + 1", "a = t0"]
        )
    }

    #[test]
    fn unary_operators_are_rewritten_as_binary_operations() {
        assert_generates!(
            vec![
                N::declaration(TypeSpec::Int, "a"),
                N::assign("a", N::int(4)),
                N::write(N::unary(UnOp::Negate, N::ident("a"))),
                N::write(N::unary(UnOp::Not, N::ident("a"))),
            ],
            ["a = 4", "t0 = 0 - a", "print t0", "t1 = a == 0", "print t1"]
        )
    }

    #[test]
    fn booleans_are_integer_literals() {
        assert_generates!(vec![N::write(N::boolean(true))], ["print 1"])
    }

    #[test]
    fn float_operands_produce_float_temporaries() {
        assert_generates!(
            vec![
                N::declaration(TypeSpec::Float, "f"),
                N::assign("f", N::binary(BinOp::Multiply, N::float(1.5), N::int(2))),
                N::write(N::binary(BinOp::LessThan, N::ident("f"), N::int(3))),
            ],
            ["f0 = 1.5 * 2", "f = f0", "t0 = f < 3", "print t0"]
        )
    }

    #[test]
    fn if_else_stmt_generates_tac() {
        assert_generates!(
            vec![
                N::declaration(TypeSpec::Int, "a"),
                N::assign("a", N::int(1)),
                N::if_else(
                    N::binary(BinOp::LessThan, N::ident("a"), N::int(2)),
                    N::write(N::int(1)),
                    N::write(N::int(2)),
                ),
            ],
            [
                "a = 1",
                "t0 = a < 2",
                "ifFalse t0 goto if_else_1",
                "print 1",
                "j if_end_1",
                "label if_else_1:",
                "print 2",
                "label if_end_1:"
            ]
        )
    }

    #[test]
    fn variable_assigned_in_one_branch_is_zeroed_before_the_if() {
        assert_generates!(
            vec![
                N::declaration(TypeSpec::Int, "x"),
                N::declaration(TypeSpec::Int, "c"),
                N::assign("c", N::int(1)),
                N::if_then(N::ident("c"), N::assign("x", N::int(5))),
                N::write(N::ident("x")),
            ],
            [
                "c = 1",
                "x = 0",
                "ifFalse c goto if_else_1",
                "x = 5",
                "j if_end_1",
                "label if_else_1:",
                "label if_end_1:",
                "print x"
            ]
        )
    }

    #[test]
    fn nested_ifs_get_distinct_labels() {
        let lowering = lower(
            vec![N::if_then(
                N::int(1),
                N::if_then(N::int(0), N::write(N::int(3))),
            )],
            TempPolicy::Monotonic,
        );
        let lines = lines(&lowering.program.top_level);
        assert_eq!("ifFalse 1 goto if_else_1", lines[0]);
        assert_eq!("ifFalse 0 goto if_else_2", lines[1]);
        assert_eq!("label if_end_1:", lines[lines.len() - 1]);
    }

    #[test]
    fn uninitialised_variable_is_zeroed_with_a_warning() {
        let lowering = lower(
            vec![
                N::declaration(TypeSpec::Float, "y"),
                N::write(N::ident("y")),
                N::write(N::ident("y")),
            ],
            TempPolicy::Monotonic,
        );
        assert_eq!(
            vec!["y = 0.0", "print y", "print y"],
            lines(&lowering.program.top_level)
        );
        assert_eq!(
            vec![Diagnostic::UninitializedVariable("y".to_string())],
            lowering.diagnostics
        );
        assert!(lowering.is_valid());
    }

    #[test]
    fn variable_read_by_the_condition_is_zeroed_once() {
        let lowering = lower(
            vec![
                N::declaration(TypeSpec::Int, "z"),
                N::if_else(N::ident("z"), N::write(N::int(1)), N::write(N::ident("z"))),
            ],
            TempPolicy::Monotonic,
        );
        assert_eq!(
            vec![
                "z = 0",
                "ifFalse z goto if_else_1",
                "print 1",
                "j if_end_1",
                "label if_else_1:",
                "print z",
                "label if_end_1:"
            ],
            lines(&lowering.program.top_level)
        );
        assert_eq!(
            vec![Diagnostic::UninitializedVariable("z".to_string())],
            lowering.diagnostics
        );
    }

    #[test]
    fn initialisation_inside_a_function_stays_there() {
        let lowering = lower(
            vec![
                N::declaration(TypeSpec::Int, "x"),
                N::function(
                    "f",
                    &[],
                    TypeSpec::Int,
                    vec![
                        N::declaration(TypeSpec::Int, "x"),
                        N::assign("x", N::int(1)),
                        N::ret(Some(N::ident("x"))),
                    ],
                ),
                N::write(N::ident("x")),
            ],
            TempPolicy::Monotonic,
        );
        assert_eq!(vec!["x = 0", "print x"], lines(&lowering.program.top_level));
        assert_eq!(
            vec![Diagnostic::UninitializedVariable("x".to_string())],
            lowering.diagnostics
        );
    }

    #[test]
    fn undefined_identifier_is_replaced_by_zero() {
        let lowering = lower(vec![N::write(N::ident("z"))], TempPolicy::Monotonic);
        assert_eq!(vec!["print 0"], lines(&lowering.program.top_level));
        assert_eq!(
            vec![Diagnostic::UndefinedIdentifier("z".to_string())],
            lowering.diagnostics
        );
        assert!(!lowering.is_valid());
    }

    #[test]
    fn recycled_temporaries_are_reused_once_consumed() {
        let lowering = lower(
            vec![
                N::declaration(TypeSpec::Int, "x"),
                N::assign(
                    "x",
                    N::binary(
                        BinOp::Multiply,
                        N::binary(BinOp::Add, N::int(1), N::int(2)),
                        N::binary(BinOp::Add, N::int(3), N::int(4)),
                    ),
                ),
            ],
            TempPolicy::Recycle,
        );
        assert_eq!(
            vec!["t0 = 1 + 2", "t1 = 3 + 4", "t1 = t0 * t1", "x = t1"],
            lines(&lowering.program.top_level)
        );
    }

    #[test]
    fn monotonic_temporaries_are_never_reused() {
        assert_generates!(
            vec![
                N::declaration(TypeSpec::Int, "x"),
                N::assign(
                    "x",
                    N::binary(
                        BinOp::Multiply,
                        N::binary(BinOp::Add, N::int(1), N::int(2)),
                        N::binary(BinOp::Add, N::int(3), N::int(4)),
                    ),
                ),
            ],
            ["t0 = 1 + 2", "t1 = 3 + 4", "t2 = t0 * t1", "x = t2"]
        )
    }

    fn add_function() -> SyntaxNode {
        N::function(
            "add",
            &[("a", TypeSpec::Int), ("b", TypeSpec::Int)],
            TypeSpec::Int,
            vec![N::ret(Some(N::binary(BinOp::Add, N::ident("a"), N::ident("b"))))],
        )
    }

    #[test]
    fn function_bodies_are_lowered_into_their_own_listing() {
        let lowering = lower(
            vec![
                add_function(),
                N::declaration(TypeSpec::Int, "r"),
                N::assign("r", N::call("add", vec![N::int(1), N::int(2)])),
                N::write(N::ident("r")),
            ],
            TempPolicy::Monotonic,
        );

        assert!(lowering.diagnostics.is_empty());
        let add = &lowering.program.functions[0];
        assert_eq!("add", add.name);
        assert_eq!(
            vec![Name::var("a", NumericKind::Int), Name::var("b", NumericKind::Int)],
            add.params
        );
        assert_eq!(vec!["t0 = a + b", "return t0"], lines(&add.body));
        assert_eq!(
            vec!["param 1", "param 2", "t0 = call add, 2", "r = t0", "print r"],
            lines(&lowering.program.top_level)
        );
    }

    #[test]
    fn arity_mismatch_emits_no_call() {
        let lowering = lower(
            vec![
                add_function(),
                N::declaration(TypeSpec::Int, "r"),
                N::assign("r", N::call("add", vec![N::int(1)])),
            ],
            TempPolicy::Monotonic,
        );
        assert_eq!(vec!["r = 0"], lines(&lowering.program.top_level));
        assert_eq!(
            vec![Diagnostic::ArityMismatch {
                name: "add".to_string(),
                expected: 2,
                found: 1
            }],
            lowering.diagnostics
        );
    }

    #[test]
    fn calling_a_variable_is_not_callable() {
        let lowering = lower(
            vec![
                N::declaration(TypeSpec::Int, "x"),
                N::write(N::call("x", vec![])),
            ],
            TempPolicy::Monotonic,
        );
        assert_eq!(vec!["print 0"], lines(&lowering.program.top_level));
        assert_eq!(
            vec![Diagnostic::NotCallable("x".to_string())],
            lowering.diagnostics
        );
    }

    #[test]
    fn void_call_has_no_result() {
        assert_generates!(
            vec![
                N::function("hello", &[], TypeSpec::Void, vec![N::write(N::int(1))]),
                N::call("hello", vec![]),
            ],
            ["call hello, 0"]
        )
    }

    #[test]
    fn array_access_generates_loads_and_stores() {
        let lowering = lower(
            vec![
                N::array_decl("a", TypeSpec::Int, 10),
                N::array_assign("a", N::int(0), N::int(7)),
                N::write(N::index("a", N::int(0))),
            ],
            TempPolicy::Monotonic,
        );
        assert_eq!(
            vec!["a[0] = 7", "t0 = a[0]", "print t0"],
            lines(&lowering.program.top_level)
        );
        assert_eq!(
            vec![ArrayDecl {
                name: "a".to_string(),
                elem: TypeSpec::Int,
                size: 10
            }],
            lowering.program.arrays
        );
    }

    #[test]
    fn indexing_a_scalar_is_not_an_array() {
        let lowering = lower(
            vec![
                N::declaration(TypeSpec::Int, "x"),
                N::write(N::index("x", N::int(0))),
            ],
            TempPolicy::Monotonic,
        );
        assert_eq!(vec!["print 0"], lines(&lowering.program.top_level));
        assert_eq!(
            vec![Diagnostic::NotAnArray("x".to_string())],
            lowering.diagnostics
        );
    }

    #[test]
    fn a_second_definition_of_a_function_is_a_duplicate() {
        let lowering = lower(vec![add_function(), add_function()], TempPolicy::Monotonic);
        assert_eq!(1, lowering.program.functions.len());
        assert_eq!(
            vec![Diagnostic::DuplicateDeclaration("add".to_string())],
            lowering.diagnostics
        );
    }
}
