//! Code generation for a MIPS-like target.
//!
//! Every name lives in its own stack slot, so no registers are allocated: each instruction
//! loads its operands into scratch registers and stores its result right away.

pub mod assembly;
mod calling_convention;
mod frame;
mod isa;
mod procedure_compiler;
mod stack_convention;

use crate::{
    ast::TypeSpec,
    error::MalformedIr,
    il::{validate_program, NumericKind, TacProgram},
    prelude::*,
};

use self::{
    assembly::*,
    calling_convention::WORD_SIZE,
    procedure_compiler::*,
    stack_convention::{Callee, Program},
};

/// Lowers a whole program to assembly. The program is validated first, and nothing is
/// generated for malformed code.
pub fn generate(program: &TacProgram) -> Result<Assembly, MalformedIr> {
    validate_program(program)?;

    let mut assembly = Assembly::default();
    assembly.data.asciiz(NEWLINE, "\n");
    if !program.arrays.is_empty() {
        assembly.data.align(2);
    }
    for array in &program.arrays {
        let bytes = array.size * WORD_SIZE as usize;
        assembly.data.space(array_label(&array.name), bytes);
    }

    let main = ProcedureCompiler::<Program>::compile(
        "main".to_string(),
        &program.top_level,
        &[],
        Some(NumericKind::Int),
        program,
    )?;
    assembly.text.procedures.push(main);

    for function in &program.functions {
        let returns = match function.returns {
            TypeSpec::Void => None,
            ty => Some(NumericKind::of(ty)),
        };
        let procedure = ProcedureCompiler::<Callee>::compile(
            procedure_name(&function.name),
            &function.body,
            &function.params,
            returns,
            program,
        )?;
        assembly.text.procedures.push(procedure);
    }

    debug!(
        "generated {} procedure(s) and {} array(s)",
        assembly.text.procedures.len(),
        program.arrays.len()
    );
    Ok(assembly)
}

#[cfg(test)]
mod tests {
    use crate::il::parse_program;

    use super::*;

    fn body(procedure: &Procedure) -> Vec<String> {
        procedure
            .body
            .statements()
            .map(|stmt| stmt.to_string().split_whitespace().collect::<Vec<_>>().join(" "))
            .collect()
    }

    fn compile(text: &str) -> Assembly {
        generate(&parse_program(text).unwrap()).unwrap()
    }

    macro_rules! assert_body {
        ($source:expr, $procedure:expr, $expected:expr) => {{
            let assembly = compile($source);
            assert_eq!(&$expected[..], body(&assembly.text.procedures[$procedure]))
        }};
    }

    #[test]
    fn copy_and_print() {
        assert_body!(
            "x = 2\nprint x",
            0,
            [
                "li $t0, 2",
                "sw $t0, -4($fp)",
                "lw $a0, -4($fp)",
                "li $v0, 1",
                "syscall",
                "la $a0, newline",
                "li $v0, 4",
                "syscall",
            ]
        );
    }

    #[test]
    fn float_values_are_truncated_into_int_slots() {
        assert_body!(
            "var x: float\nx = 1.5\ny = x\nprint x",
            0,
            [
                "li.s $f0, 1.5",
                "s.s $f0, -4($fp)",
                "l.s $f10, -4($fp)",
                "cvt.w.s $f10, $f10",
                "mfc1 $t0, $f10",
                "sw $t0, -8($fp)",
                "l.s $f12, -4($fp)",
                "li $v0, 2",
                "syscall",
                "la $a0, newline",
                "li $v0, 4",
                "syscall",
            ]
        );
    }

    #[test]
    fn mixed_arithmetic_converts_the_int_operand() {
        assert_body!(
            "a = 2\nf0 = a * 1.5",
            0,
            [
                "li $t0, 2",
                "sw $t0, -4($fp)",
                "lw $t8, -4($fp)",
                "mtc1 $t8, $f0",
                "cvt.s.w $f0, $f0",
                "li.s $f2, 1.5",
                "mul.s $f0, $f0, $f2",
                "s.s $f0, -8($fp)",
            ]
        );
    }

    #[test]
    fn integer_division_reads_the_quotient() {
        assert_body!(
            "t0 = 7 / 2",
            0,
            ["li $t0, 7", "li $t1, 2", "div $t0, $t1", "mflo $t0", "sw $t0, -4($fp)"]
        );
    }

    #[test]
    fn conditional_jumps_test_for_zero() {
        assert_body!(
            "t0 = 1 < 2\nifFalse t0 goto if_else_1\nlabel if_else_1:",
            0,
            [
                "li $t0, 1",
                "li $t1, 2",
                "slt $t0, $t0, $t1",
                "sw $t0, -4($fp)",
                "lw $t0, -4($fp)",
                "beqz $t0, if_else_1",
                "if_else_1:",
            ]
        );
    }

    #[test]
    fn float_comparison_clears_the_result_when_false() {
        assert_body!(
            "var x: float\nx = 1.5\nt0 = x > 1.0",
            0,
            [
                "li.s $f0, 1.5",
                "s.s $f0, -4($fp)",
                "l.s $f0, -4($fp)",
                "li.s $f2, 1.0",
                "li $t0, 1",
                "c.lt.s $f2, $f0",
                "movf $t0, $zero",
                "sw $t0, -8($fp)",
            ]
        );
    }

    #[test]
    fn calls_push_parameters_and_read_the_result() {
        let source = "
param 2
t0 = call sq, 1
print t0

function sq(a: int) -> int:
    t0 = a * a
    return t0
";
        assert_body!(
            source,
            0,
            [
                "addiu $sp, $sp, -4",
                "li $t0, 2",
                "sw $t0, 0($sp)",
                "jal fn_sq",
                "addiu $sp, $sp, 4",
                "move $t0, $v0",
                "sw $t0, -4($fp)",
                "lw $a0, -4($fp)",
                "li $v0, 1",
                "syscall",
                "la $a0, newline",
                "li $v0, 4",
                "syscall",
            ]
        );
        assert_body!(
            source,
            1,
            [
                "lw $t0, 8($fp)",
                "lw $t1, 8($fp)",
                "mul $t0, $t0, $t1",
                "sw $t0, -4($fp)",
                "lw $v0, -4($fp)",
                "move $sp, $fp",
                "lw $fp, 0($sp)",
                "lw $ra, 4($sp)",
                "addiu $sp, $sp, 8",
                "jr $ra",
            ]
        );
    }

    #[test]
    fn functions_falling_off_the_end_return_zero() {
        let assembly = compile("function f() -> int:\n    print 1");
        assert_eq!(
            Some("li $v0, 0".to_string()),
            body(&assembly.text.procedures[1]).last().cloned()
        );
    }

    #[test]
    fn arrays_are_addressed_by_scaled_index() {
        let assembly = compile("array a[3]: int\na[2] = 7");
        assert_eq!(
            vec![
                "li $t0, 7",
                "li $t1, 2",
                "sll $t1, $t1, 2",
                "la $t2, arr_a",
                "addu $t1, $t1, $t2",
                "sw $t0, 0($t1)",
            ],
            body(&assembly.text.procedures[0])
        );
        assert!(assembly.to_string().contains("arr_a: .space 12"));
    }

    #[test]
    fn procedures_are_named_after_their_functions() {
        let text = compile("call f, 0\nfunction f() -> void:\n    return").to_string();
        assert!(text.contains("\nmain:\n"));
        assert!(text.contains("\nfn_f:\n"));
        assert!(text.contains("jal     fn_f"));
    }

    #[test]
    fn instructions_carry_their_source_as_comment() {
        let text = compile("x = 2").to_string();
        assert!(text.lines().any(|line| line.starts_with("    li      $t0, 2")
            && line.ends_with("# x = 2")));
    }

    #[test]
    fn generation_is_deterministic() {
        let program = parse_program(
            "a = 3\nf0 = a / 2.0\nt0 = f0 > 1.0\nifFalse t0 goto l_1\nprint f0\nlabel l_1:",
        )
        .unwrap();
        assert_eq!(
            generate(&program).unwrap().to_string(),
            generate(&program).unwrap().to_string()
        );
    }

    #[test]
    fn malformed_code_is_rejected() {
        let program = parse_program("print x").unwrap();
        assert!(matches!(
            generate(&program),
            Err(MalformedIr::UndefinedName { .. })
        ));
    }
}
