//! A compiler back end: lowers a syntax tree to three-address code, optimises it and
//! generates MIPS-like assembly from it.
pub mod ast;
pub mod codegen;
pub mod commandline;
pub mod error;
pub mod il;
pub mod listing;
mod prelude;
pub mod symbols;

use thiserror::Error;

use crate::{
    ast::SyntaxNode,
    codegen::Assembly,
    error::{Diagnostic, HasFatal, MalformedIr},
    il::{GeneratorOptions, Lowering, TacProgram, TempPolicy},
    prelude::*,
};

#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    pub temp_policy: TempPolicy,
    /// Run the optimiser between lowering and code generation.
    pub optimise: bool,
}
impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            temp_policy: TempPolicy::default(),
            optimise: true,
        }
    }
}

/// The products of a successful compilation.
#[derive(Debug)]
pub struct Compilation {
    pub program: TacProgram,
    pub assembly: Assembly,
    /// Warnings reported along the way.
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("the program has {} problem(s)", .0.len())]
    Diagnostics(Vec<Diagnostic>),
    #[error(transparent)]
    Malformed(#[from] MalformedIr),
}

/// Collects the declarations of a tree and lowers it to three-address code. Each problem is
/// reported once, even when both stages find it.
pub fn lower(tree: &SyntaxNode, options: GeneratorOptions) -> Lowering {
    let (mut symbols, mut diagnostics) = symbols::collect(tree);
    let lowering = il::generate(tree, &mut symbols, options);
    for diagnostic in lowering.diagnostics {
        if !diagnostics.contains(&diagnostic) {
            diagnostics.push(diagnostic);
        }
    }
    Lowering {
        program: lowering.program,
        diagnostics,
    }
}

/// Runs the whole pipeline. No assembly is produced when the tree has errors.
pub fn compile(tree: &SyntaxNode, options: CompileOptions) -> Result<Compilation, CompileError> {
    let Lowering {
        program,
        mut diagnostics,
    } = lower(
        tree,
        GeneratorOptions {
            temp_policy: options.temp_policy,
        },
    );
    if diagnostics.has_fatal() {
        debug!("lowering reported {} problem(s)", diagnostics.len());
        return Err(CompileError::Diagnostics(diagnostics));
    }

    let program = if options.optimise {
        let optimised = il::optimise_program(program)?;
        diagnostics.extend(optimised.diagnostics);
        optimised.code
    } else {
        program
    };

    let assembly = codegen::generate(&program)?;
    Ok(Compilation {
        program,
        assembly,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{BinOp, TypeSpec, UnOp},
        il::{
            interpret, optimise_program, parse_program, Constant, InstrKind, InterpretError,
            TacListing,
        },
    };

    use super::*;

    use SyntaxNode as N;

    fn lines(listing: &TacListing) -> Vec<String> {
        listing.iter_instructions().map(ToString::to_string).collect()
    }

    fn unoptimised(tree: &SyntaxNode) -> TacProgram {
        lower(tree, GeneratorOptions::default()).program
    }

    fn optimised(tree: &SyntaxNode) -> TacProgram {
        compile(tree, CompileOptions::default()).unwrap().program
    }

    fn if_else_tree() -> SyntaxNode {
        N::program(vec![
            N::declaration(TypeSpec::Int, "x"),
            N::assign("x", N::int(4)),
            N::if_else(
                N::binary(BinOp::LessThan, N::ident("x"), N::int(3)),
                N::program(vec![N::write(N::int(1))]),
                N::program(vec![N::write(N::int(2))]),
            ),
        ])
    }

    fn function_tree() -> SyntaxNode {
        N::program(vec![
            N::function(
                "scale",
                &[("a", TypeSpec::Int), ("b", TypeSpec::Int)],
                TypeSpec::Int,
                vec![
                    N::declaration(TypeSpec::Int, "c"),
                    N::assign("c", N::binary(BinOp::Multiply, N::ident("a"), N::int(1))),
                    N::assign("c", N::binary(BinOp::Add, N::ident("c"), N::ident("b"))),
                    N::ret(Some(N::ident("c"))),
                ],
            ),
            N::declaration(TypeSpec::Int, "y"),
            N::assign("y", N::binary(BinOp::Subtract, N::int(10), N::int(4))),
            N::write(N::call("scale", vec![N::ident("y"), N::int(3)])),
            N::write(N::ident("y")),
        ])
    }

    #[test]
    fn constant_expression_is_folded() {
        let tree = N::program(vec![
            N::declaration(TypeSpec::Int, "x"),
            N::assign("x", N::binary(BinOp::Add, N::int(2), N::int(3))),
            N::write(N::ident("x")),
        ]);
        let program = optimised(&tree);

        assert_eq!(
            ["t0 = 5; preserved", "print t0"][..],
            lines(&program.top_level)
        );
        assert_eq!(Ok(vec![Constant::Int(5)]), interpret(&program));
    }

    #[test]
    fn multiplication_by_one_is_simplified_away() {
        let tree = N::program(vec![
            N::declaration(TypeSpec::Int, "x"),
            N::declaration(TypeSpec::Int, "y"),
            N::assign("x", N::int(1)),
            N::assign("y", N::binary(BinOp::Multiply, N::ident("x"), N::int(1))),
            N::write(N::ident("y")),
        ]);
        let program = optimised(&tree);

        assert_eq!(
            ["x = 1; preserved", "print x"][..],
            lines(&program.top_level)
        );
        assert_eq!(Ok(vec![Constant::Int(1)]), interpret(&program));
    }

    #[test]
    fn branch_condition_survives_optimisation() {
        let program = optimised(&if_else_tree());
        let lines = lines(&program.top_level);

        assert!(lines.contains(&"x = 4; preserved".to_string()));
        assert!(lines.contains(&"t0 = x < 3; preserved".to_string()));
        assert!(lines.contains(&"ifFalse t0 goto if_else_1".to_string()));
        assert_eq!(Ok(vec![Constant::Int(2)]), interpret(&program));
    }

    #[test]
    fn arity_mismatch_emits_no_call() {
        let tree = N::program(vec![
            N::function(
                "add",
                &[("a", TypeSpec::Int), ("b", TypeSpec::Int)],
                TypeSpec::Int,
                vec![N::ret(Some(N::binary(
                    BinOp::Add,
                    N::ident("a"),
                    N::ident("b"),
                )))],
            ),
            N::write(N::call("add", vec![N::int(1)])),
        ]);
        let lowering = lower(&tree, GeneratorOptions::default());

        assert!(lowering.diagnostics.contains(&Diagnostic::ArityMismatch {
            name: "add".to_string(),
            expected: 2,
            found: 1
        }));
        assert!(!lowering
            .program
            .top_level
            .iter_instructions()
            .any(|instr| matches!(instr.kind, InstrKind::Call(..) | InstrKind::Param(_))));
        assert!(matches!(
            compile(&tree, CompileOptions::default()),
            Err(CompileError::Diagnostics(_))
        ));
    }

    #[test]
    fn duplicate_functions_are_reported_once() {
        let function = || N::function("f", &[], TypeSpec::Void, vec![]);
        let tree = N::program(vec![function(), function()]);
        let lowering = lower(&tree, GeneratorOptions::default());

        let duplicates = lowering
            .diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::DuplicateDeclaration(_)))
            .count();
        assert_eq!(1, duplicates);
    }

    #[test]
    fn warnings_do_not_stop_compilation() {
        let tree = N::program(vec![
            N::declaration(TypeSpec::Int, "x"),
            N::write(N::ident("x")),
        ]);
        let compilation = compile(&tree, CompileOptions::default()).unwrap();

        assert_eq!(
            vec![Diagnostic::UninitializedVariable("x".to_string())],
            compilation.diagnostics
        );
        assert_eq!(Ok(vec![Constant::Int(0)]), interpret(&compilation.program));
    }

    #[test]
    fn compilation_is_deterministic() {
        for tree in [if_else_tree(), function_tree()] {
            for policy in [TempPolicy::Monotonic, TempPolicy::Recycle] {
                let options = CompileOptions {
                    temp_policy: policy,
                    optimise: true,
                };
                let first = compile(&tree, options).unwrap().assembly.to_string();
                let second = compile(&tree, options).unwrap().assembly.to_string();
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn optimising_twice_changes_nothing() {
        for tree in [if_else_tree(), function_tree()] {
            let once = optimised(&tree);
            let twice = optimise_program(once.clone()).unwrap().code;
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn optimisation_keeps_control_flow_and_output() {
        let is_kept = |kind: &InstrKind| {
            matches!(
                kind,
                InstrKind::Label(_) | InstrKind::IfFalse(..) | InstrKind::Goto(_) | InstrKind::Print(_)
            )
        };
        for tree in [if_else_tree(), function_tree()] {
            let before = unoptimised(&tree);
            let after = optimised(&tree);
            for ((_, before), (_, after)) in before.listings().zip(after.listings()) {
                let count = |listing: &TacListing| {
                    listing.iter_instructions().filter(|i| is_kept(&i.kind)).count()
                };
                assert_eq!(count(before), count(after));
            }
        }
    }

    #[test]
    fn optimisation_does_not_change_the_output() {
        for policy in [TempPolicy::Monotonic, TempPolicy::Recycle] {
            for tree in [if_else_tree(), function_tree()] {
                let before = lower(&tree, GeneratorOptions { temp_policy: policy }).program;
                let after = optimise_program(before.clone()).unwrap().code;
                assert_eq!(interpret(&before), interpret(&after));
            }
        }
        assert_eq!(
            Ok(vec![Constant::Int(9), Constant::Int(6)]),
            interpret(&optimised(&function_tree()))
        );
    }

    /// A xorshift generator, so that a seed describes the same tree on every run.
    struct Xorshift(u64);
    impl Xorshift {
        fn new(seed: u64) -> Self {
            Self(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1)
        }

        fn below(&mut self, bound: u64) -> u64 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.0 = x;
            x % bound
        }

        fn small(&mut self, bound: u64) -> i32 {
            self.below(2 * bound + 1) as i32 - bound as i32
        }

        fn pick<T: Copy>(&mut self, items: &[T]) -> T {
            items[self.below(items.len() as u64) as usize]
        }
    }

    const GLOBALS: [&str; 3] = ["a", "var", "x"];
    const LOCALS: [&str; 3] = ["p", "q", "r"];

    /// Only the top level calls `mix` and touches `arr`. Divisors are always literals, so the
    /// only runtime fault is a division by a literal zero.
    fn random_expr(rng: &mut Xorshift, vars: &[&str], depth: u32, top_level: bool) -> SyntaxNode {
        if depth == 0 || rng.below(3) == 0 {
            return match rng.below(7) {
                0 => N::int(rng.small(3)),
                1 => N::float(rng.pick(&[0.5, -1.5, 2.25])),
                2 => N::boolean(rng.below(2) == 0),
                3 if top_level => N::call(
                    "mix",
                    vec![
                        random_expr(rng, vars, 1, false),
                        random_expr(rng, vars, 1, false),
                    ],
                ),
                4 if top_level => N::index("arr", N::int(rng.below(4) as i32)),
                _ => N::ident(rng.pick(vars)),
            };
        }

        let lhs = random_expr(rng, vars, depth - 1, top_level);
        match rng.below(5) {
            0 => {
                let op = rng.pick(&[BinOp::Add, BinOp::Subtract, BinOp::Multiply]);
                N::binary(op, lhs, random_expr(rng, vars, depth - 1, top_level))
            }
            1 => N::binary(BinOp::Divide, lhs, N::int(rng.small(2))),
            2 => {
                let op = rng.pick(&[
                    BinOp::LessThan,
                    BinOp::LessThanEqual,
                    BinOp::GreaterThan,
                    BinOp::GreaterThanEqual,
                    BinOp::Equal,
                    BinOp::NotEqual,
                ]);
                N::binary(op, lhs, random_expr(rng, vars, depth - 1, top_level))
            }
            3 => N::unary(rng.pick(&[UnOp::Negate, UnOp::Not]), lhs),
            _ => {
                let op = rng.pick(&[BinOp::Add, BinOp::Multiply]);
                let identity = N::int(rng.below(2) as i32);
                if rng.below(2) == 0 {
                    N::binary(op, lhs, identity)
                } else {
                    N::binary(op, identity, lhs)
                }
            }
        }
    }

    fn random_block(rng: &mut Xorshift, vars: &[&str], depth: u32, top_level: bool) -> SyntaxNode {
        let count = 1 + rng.below(3);
        N::program(
            (0..count)
                .map(|_| random_stmt(rng, vars, depth, top_level))
                .collect(),
        )
    }

    fn random_stmt(rng: &mut Xorshift, vars: &[&str], depth: u32, top_level: bool) -> SyntaxNode {
        match rng.below(12) {
            0..=3 => N::assign(rng.pick(vars), random_expr(rng, vars, 3, top_level)),
            4..=6 => N::write(random_expr(rng, vars, 3, top_level)),
            7 | 8 if depth > 0 => {
                let cond = random_expr(rng, vars, 2, top_level);
                let then = random_block(rng, vars, depth - 1, top_level);
                if rng.below(2) == 0 {
                    N::if_then(cond, then)
                } else {
                    N::if_else(cond, then, random_block(rng, vars, depth - 1, top_level))
                }
            }
            9 if top_level => N::array_assign(
                "arr",
                N::int(rng.below(4) as i32),
                random_expr(rng, vars, 2, top_level),
            ),
            10 if top_level => match rng.below(3) {
                0 => N::ret(None),
                _ => N::write(N::ident(rng.pick(vars))),
            },
            _ => N::write(N::ident(rng.pick(vars))),
        }
    }

    fn random_tree(seed: u64) -> SyntaxNode {
        let mut rng = Xorshift::new(seed);

        let mut body = vec![N::declaration(TypeSpec::Float, "r")];
        for _ in 0..rng.below(4) {
            body.push(random_stmt(&mut rng, &LOCALS, 1, false));
        }
        body.push(N::ret(Some(random_expr(&mut rng, &LOCALS, 2, false))));

        let mut statements = vec![
            N::function(
                "mix",
                &[("p", TypeSpec::Int), ("q", TypeSpec::Float)],
                TypeSpec::Float,
                body,
            ),
            N::array_decl("arr", TypeSpec::Int, 4),
            N::declaration(TypeSpec::Int, "a"),
            N::declaration(TypeSpec::Int, "var"),
            N::declaration(TypeSpec::Float, "x"),
        ];
        for _ in 0..1 + rng.below(10) {
            statements.push(random_stmt(&mut rng, &GLOBALS, 2, true));
        }
        N::program(statements)
    }

    /// Printed values match, counting any two NaNs as equal.
    fn same_output(before: &[Constant], after: &[Constant]) -> bool {
        before.len() == after.len()
            && before.iter().zip(after).all(|pair| match pair {
                (Constant::Float(x), Constant::Float(y)) => x == y || (x.is_nan() && y.is_nan()),
                (x, y) => x == y,
            })
    }

    #[test]
    fn optimisation_does_not_change_the_output_of_random_trees() {
        for seed in 0..3_000 {
            let tree = random_tree(seed);
            for policy in [TempPolicy::Monotonic, TempPolicy::Recycle] {
                let lowering = lower(&tree, GeneratorOptions { temp_policy: policy });
                assert!(lowering.is_valid(), "seed {}: {:?}", seed, lowering.diagnostics);
                let before = lowering.program;
                assert_eq!(before, parse_program(&before.to_string()).unwrap());
                let after = optimise_program(before.clone()).unwrap().code;

                let outcome = |program: &TacProgram| match interpret(program) {
                    Ok(values) => Ok(values),
                    Err(InterpretError::DivisionByZero(_)) => Err(()),
                    Err(e) => panic!("seed {}: {}", seed, e),
                };
                match (outcome(&before), outcome(&after)) {
                    (Ok(b), Ok(a)) => {
                        assert!(same_output(&b, &a), "seed {}: {:?} became {:?}", seed, b, a)
                    }
                    (Err(()), Err(())) => (),
                    (b, a) => panic!("seed {}: {:?} became {:?}\n{}", seed, b, a, before),
                }
            }
        }
    }

    #[test]
    fn keyword_named_variables_survive_the_text_form() {
        for ident in ["var", "array", "function"] {
            let tree = N::program(vec![
                N::declaration(TypeSpec::Int, ident),
                N::assign(ident, N::int(3)),
                N::write(N::ident(ident)),
            ]);
            let program = unoptimised(&tree);
            assert_eq!(format!("_{0} = 3\nprint _{0}\n", ident), program.to_string());
            assert_eq!(program, parse_program(&program.to_string()).unwrap());
        }
    }

    #[test]
    fn folded_arithmetic_matches_the_target() {
        let cases = [
            (BinOp::Add, i32::MAX, 1, i32::MIN),
            (BinOp::Subtract, 3, 10, -7),
            (BinOp::Multiply, 65536, 65536, 0),
            (BinOp::Divide, -7, 2, -3),
            (BinOp::Divide, 7, -2, -3),
        ];
        for (op, lhs, rhs, expected) in cases {
            let tree = N::program(vec![N::write(N::binary(op, N::int(lhs), N::int(rhs)))]);
            let program = optimised(&tree);
            assert_eq!(Ok(vec![Constant::Int(expected)]), interpret(&program));
            assert_eq!(
                [format!("t0 = {}; preserved", expected), "print t0".to_string()][..],
                lines(&program.top_level)
            );
        }
    }

    #[test]
    fn undefined_identifiers_prevent_code_generation() {
        let tree = N::program(vec![N::write(N::ident("nope"))]);
        match compile(&tree, CompileOptions::default()) {
            Err(CompileError::Diagnostics(diagnostics)) => assert_eq!(
                vec![Diagnostic::UndefinedIdentifier("nope".to_string())],
                diagnostics
            ),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
