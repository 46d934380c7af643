use std::marker::PhantomData;

use crate::{
    ast::BinOp,
    error::MalformedIr,
    il::*,
    prelude::*,
};

use super::{
    assembly::*,
    calling_convention::WORD_SIZE,
    frame::Frame,
    isa::*,
    stack_convention::StackConvention,
};

use Op::*;
use Operand::*;
use Register::*;

/// The label of the newline string printed after every value.
pub const NEWLINE: &str = "newline";

/// The label of the procedure implementing a function.
pub fn procedure_name(function: &str) -> String {
    format!("fn_{}", function)
}

/// The label of the storage of an array.
pub fn array_label(array: &str) -> String {
    format!("arr_{}", array)
}

/// Translates one listing into one procedure. Every instruction is translated on its own:
/// operands are loaded from their slots into scratch registers, and the result is stored
/// back into its slot.
pub struct ProcedureCompiler<'a, C: StackConvention> {
    program: &'a TacProgram,
    frame: Frame,
    body: Block,
    /// The kind of value this procedure returns.
    returns: Option<NumericKind>,
    /// Parameters waiting for the next call.
    arg_stack: Vec<&'a Value>,
    /// The comment for the next emitted line.
    pending_comment: Option<String>,
    _phantom: PhantomData<*const C>,
}
impl<'a, C: StackConvention> ProcedureCompiler<'a, C> {
    /// Compile a listing into a procedure with the given name.
    pub fn compile(
        name: String,
        listing: &'a TacListing,
        params: &[Name],
        returns: Option<NumericKind>,
        program: &'a TacProgram,
    ) -> Result<Procedure, MalformedIr> {
        let mut compiler = Self {
            program,
            frame: Frame::new(params),
            body: Block::new(),
            returns,
            arg_stack: vec![],
            pending_comment: None,
            _phantom: PhantomData,
        };
        for instr in listing.iter_instructions() {
            compiler.compile_instr(instr)?;
        }
        compiler.add_default_return(listing);
        debug!(
            "compiled {} to a frame of {} byte(s)",
            name,
            compiler.frame.size()
        );

        Ok(Procedure {
            name,
            prologue: C::prologue(compiler.frame.size()),
            body: compiler.body,
            epilogue: C::epilogue(),
        })
    }

    /// Compile a single TAC instruction.
    fn compile_instr(&mut self, instr: &'a Instruction) -> Result<(), MalformedIr> {
        self.pending_comment = Some(instr.kind.to_string());
        match &instr.kind {
            InstrKind::Copy(result, value) => self.compile_copy(result, value),
            InstrKind::Bin(result, op, lhs, rhs) => self.compile_bin(result, *op, lhs, rhs),
            InstrKind::Print(value) => self.compile_print(value),
            InstrKind::Label(lbl) => {
                let comment = self.pending_comment.take();
                self.body.label(lbl.as_str(), comment);
            }
            InstrKind::IfFalse(value, lbl) => self.compile_if_false(value, lbl),
            InstrKind::Goto(lbl) => {
                self.emit(J, [Id(lbl.to_string())]);
            }
            InstrKind::Param(value) => {
                self.arg_stack.push(value);
                let comment = self.pending_comment.take().unwrap_or_default();
                self.body.comment(comment);
            }
            InstrKind::Call(result, name, argcount) => {
                self.compile_call(result.as_ref(), name, *argcount)?
            }
            InstrKind::Return(value) => self.compile_return(value.as_ref()),
            InstrKind::ArrayLoad(result, array, index) => {
                self.compile_array_load(result, array, index)?
            }
            InstrKind::ArrayStore(array, index, value) => {
                self.compile_array_store(array, index, value)?
            }
        }
        Ok(())
    }

    fn compile_copy(&mut self, result: &Name, value: &Value) {
        match result.kind() {
            NumericKind::Int => self.load_int(value, T0),
            NumericKind::Float => self.load_float(value, F0),
        }
        self.store(result, result.kind());
    }

    /// Compile a binary operation. The operation is performed in floating point when either
    /// operand is a float. Comparisons always produce an integer.
    fn compile_bin(&mut self, result: &Name, op: BinOp, lhs: &Value, rhs: &Value) {
        let in_float = lhs.kind() == NumericKind::Float || rhs.kind() == NumericKind::Float;
        if !in_float {
            self.load_int(lhs, T0);
            self.load_int(rhs, T1);
            match op {
                BinOp::Divide => {
                    self.emit(Div, [Reg(T0), Reg(T1)]);
                    self.emit(Mflo, [Reg(T0)]);
                }
                op => {
                    self.emit(int_op(op), [Reg(T0), Reg(T0), Reg(T1)]);
                }
            }
            self.store(result, NumericKind::Int);
            return;
        }

        self.load_float(lhs, F0);
        self.load_float(rhs, F2);
        if let Some(arith) = float_arith_op(op) {
            self.emit(arith, [Reg(F0), Reg(F0), Reg(F2)]);
            self.store(result, NumericKind::Float);
            return;
        }

        // The comparison sets the condition flag, which then decides whether the 1 in the
        // result register is cleared.
        let (compare, swap, clear_on_true) = match op {
            BinOp::Equal => (CEqS, false, false),
            BinOp::NotEqual => (CEqS, false, true),
            BinOp::LessThan => (CLtS, false, false),
            BinOp::LessThanEqual => (CLeS, false, false),
            BinOp::GreaterThan => (CLtS, true, false),
            _ => (CLeS, true, false),
        };
        let (left, right) = if swap { (F2, F0) } else { (F0, F2) };
        self.emit(Li, [Reg(T0), Lit(1)]);
        self.emit(compare, [Reg(left), Reg(right)]);
        let clear = if clear_on_true { Movt } else { Movf };
        self.emit(clear, [Reg(T0), Reg(Zero)]);
        self.store(result, NumericKind::Int);
    }

    fn compile_print(&mut self, value: &Value) {
        let syscall = match value.kind() {
            NumericKind::Int => {
                self.load_int(value, A0);
                SyscallCode::PrintInt
            }
            NumericKind::Float => {
                self.load_float(value, F12);
                SyscallCode::PrintFloat
            }
        };
        self.emit(Li, [Reg(V0), Lit(syscall as i64)])
            .emit(Op::Syscall, [])
            .emit(La, [Reg(A0), Id(NEWLINE.to_string())])
            .emit(Li, [Reg(V0), Lit(SyscallCode::PrintString as i64)])
            .emit(Op::Syscall, []);
    }

    fn compile_if_false(&mut self, value: &Value, lbl: &Label) {
        match value.kind() {
            NumericKind::Int => {
                self.load_int(value, T0);
                self.emit(Beqz, [Reg(T0), Id(lbl.to_string())]);
            }
            NumericKind::Float => {
                self.load_float(value, F0);
                self.emit(Mtc1, [Reg(Zero), Reg(F2)])
                    .emit(CEqS, [Reg(F0), Reg(F2)])
                    .emit(Bc1t, [Id(lbl.to_string())]);
            }
        }
    }

    /// Compile a call. The pending parameters are pushed in order, converted to the kinds
    /// the callee declares, and popped again once the callee returns.
    fn compile_call(
        &mut self,
        result: Option<&Name>,
        name: &str,
        argcount: usize,
    ) -> Result<(), MalformedIr> {
        let function = self
            .program
            .function(name)
            .ok_or_else(|| MalformedIr::UnknownFunction(name.to_string()))?;
        if argcount > self.arg_stack.len() || argcount != function.params.len() {
            return Err(MalformedIr::ParamCount {
                name: name.to_string(),
                expected: function.params.len(),
                found: argcount,
            });
        }

        let args = self.arg_stack.split_off(self.arg_stack.len() - argcount);
        for (arg, kind) in args.into_iter().zip(function.param_kinds()) {
            self.emit(Addiu, [Reg(Sp), Reg(Sp), Lit(-WORD_SIZE as i64)]);
            match kind {
                NumericKind::Int => {
                    self.load_int(arg, T0);
                    self.emit(Sw, [Reg(T0), Mem(0, Sp)]);
                }
                NumericKind::Float => {
                    self.load_float(arg, F0);
                    self.emit(SS, [Reg(F0), Mem(0, Sp)]);
                }
            }
        }
        self.emit(Jal, [Id(procedure_name(name))]);
        if argcount > 0 {
            let bytes = WORD_SIZE as i64 * argcount as i64;
            self.emit(Addiu, [Reg(Sp), Reg(Sp), Lit(bytes)]);
        }

        if let Some(result) = result {
            let kind = NumericKind::of(function.returns);
            if kind == NumericKind::Int {
                self.emit(Move, [Reg(T0), Reg(V0)]);
            }
            self.store(result, kind);
        }
        Ok(())
    }

    fn compile_return(&mut self, value: Option<&Value>) {
        match (value, self.returns) {
            (Some(value), Some(kind)) => {
                let register = C::return_register(kind);
                match kind {
                    NumericKind::Int => self.load_int(value, register),
                    NumericKind::Float => self.load_float(value, register),
                }
                self.flush_comment();
                C::add_return(&mut self.body, true);
            }
            _ => {
                self.flush_comment();
                C::add_return(&mut self.body, false);
            }
        }
    }

    fn compile_array_load(
        &mut self,
        result: &Name,
        array: &str,
        index: &Value,
    ) -> Result<(), MalformedIr> {
        let kind = self.element_kind(array)?;
        self.element_address(array, index);
        match kind {
            NumericKind::Int => self.emit(Lw, [Reg(T0), Mem(0, T1)]),
            NumericKind::Float => self.emit(LS, [Reg(F0), Mem(0, T1)]),
        };
        self.store(result, kind);
        Ok(())
    }

    fn compile_array_store(
        &mut self,
        array: &str,
        index: &Value,
        value: &Value,
    ) -> Result<(), MalformedIr> {
        let kind = self.element_kind(array)?;
        match kind {
            NumericKind::Int => self.load_int(value, T0),
            NumericKind::Float => self.load_float(value, F0),
        }
        self.element_address(array, index);
        match kind {
            NumericKind::Int => self.emit(Sw, [Reg(T0), Mem(0, T1)]),
            NumericKind::Float => self.emit(SS, [Reg(F0), Mem(0, T1)]),
        };
        Ok(())
    }

    fn element_kind(&self, array: &str) -> Result<NumericKind, MalformedIr> {
        self.program
            .array(array)
            .map(|decl| NumericKind::of(decl.elem))
            .ok_or_else(|| MalformedIr::UnknownArray(array.to_string()))
    }

    /// Places the address of `array[index]` in `$t1`.
    fn element_address(&mut self, array: &str, index: &Value) {
        self.load_int(index, T1);
        self.emit(Sll, [Reg(T1), Reg(T1), Lit(2)])
            .emit(La, [Reg(T2), Id(array_label(array))])
            .emit(Addu, [Reg(T1), Reg(T1), Reg(T2)]);
    }

    /// A function that runs off the end of its body returns zero.
    fn add_default_return(&mut self, listing: &TacListing) {
        let Some(kind) = self.returns.filter(|_| C::RETURNS_TO_CALLER) else {
            return;
        };
        let ends_in_return = matches!(
            listing.iter_instructions().last().map(|instr| &instr.kind),
            Some(InstrKind::Return(_))
        );
        if ends_in_return {
            return;
        }
        match kind {
            NumericKind::Int => {
                self.body
                    .push_cmt(Li, [Reg(C::return_register(kind)), Lit(0)], "default result");
            }
            NumericKind::Float => {
                self.body.push_cmt(
                    Mtc1,
                    [Reg(Zero), Reg(C::return_register(kind))],
                    "default result",
                );
            }
        }
    }

    /// Loads a value into an integer register, truncating floats.
    fn load_int(&mut self, value: &Value, target: Register) {
        match value {
            Value::Const(c) => {
                self.emit(Li, [Reg(target), Lit(c.as_int() as i64)]);
            }
            Value::Name(name) => {
                let slot = self.frame.slot(name);
                match slot.kind {
                    NumericKind::Int => {
                        self.emit(Lw, [Reg(target), Mem(slot.offset, Fp)]);
                    }
                    NumericKind::Float => {
                        self.emit(LS, [Reg(F10), Mem(slot.offset, Fp)])
                            .emit(CvtWS, [Reg(F10), Reg(F10)])
                            .emit(Mfc1, [Reg(target), Reg(F10)]);
                    }
                }
            }
        }
    }

    /// Loads a value into a floating point register, converting integers.
    fn load_float(&mut self, value: &Value, target: Register) {
        match value {
            Value::Const(c) => {
                self.emit(LiS, [Reg(target), Float(c.as_float())]);
            }
            Value::Name(name) => {
                let slot = self.frame.slot(name);
                match slot.kind {
                    NumericKind::Float => {
                        self.emit(LS, [Reg(target), Mem(slot.offset, Fp)]);
                    }
                    NumericKind::Int => {
                        self.emit(Lw, [Reg(T8), Mem(slot.offset, Fp)])
                            .emit(Mtc1, [Reg(T8), Reg(target)])
                            .emit(CvtSW, [Reg(target), Reg(target)]);
                    }
                }
            }
        }
    }

    /// Stores a computed value into the slot of `name`. The value is in `$t0` when `computed`
    /// is an integer, and in `$f0` otherwise.
    fn store(&mut self, name: &Name, computed: NumericKind) {
        let slot = self.frame.slot(name);
        match (computed, slot.kind) {
            (NumericKind::Int, NumericKind::Int) => {
                self.emit(Sw, [Reg(T0), Mem(slot.offset, Fp)]);
            }
            (NumericKind::Float, NumericKind::Float) => {
                self.emit(SS, [Reg(F0), Mem(slot.offset, Fp)]);
            }
            (NumericKind::Int, NumericKind::Float) => {
                self.emit(Mtc1, [Reg(T0), Reg(F0)])
                    .emit(CvtSW, [Reg(F0), Reg(F0)])
                    .emit(SS, [Reg(F0), Mem(slot.offset, Fp)]);
            }
            (NumericKind::Float, NumericKind::Int) => {
                self.emit(CvtWS, [Reg(F10), Reg(F0)])
                    .emit(Mfc1, [Reg(T0), Reg(F10)])
                    .emit(Sw, [Reg(T0), Mem(slot.offset, Fp)]);
            }
        }
    }

    /// Emits an instruction. The first instruction emitted for a TAC instruction carries
    /// its text as a comment.
    fn emit<I>(&mut self, op: Op, operands: I) -> &mut Self
    where
        I: IntoIterator<Item = Operand>,
    {
        match self.pending_comment.take() {
            Some(comment) => self.body.push_cmt(op, operands, comment),
            None => self.body.push(op, operands),
        };
        self
    }

    fn flush_comment(&mut self) {
        if let Some(comment) = self.pending_comment.take() {
            self.body.comment(comment);
        }
    }
}

fn int_op(op: BinOp) -> Op {
    match op {
        BinOp::Add => Addu,
        BinOp::Subtract => Subu,
        BinOp::Multiply => Mul,
        BinOp::Divide => Div,
        BinOp::LessThan => Slt,
        BinOp::LessThanEqual => Sle,
        BinOp::GreaterThan => Sgt,
        BinOp::GreaterThanEqual => Sge,
        BinOp::Equal => Seq,
        BinOp::NotEqual => Sne,
    }
}

fn float_arith_op(op: BinOp) -> Option<Op> {
    match op {
        BinOp::Add => Some(AddS),
        BinOp::Subtract => Some(SubS),
        BinOp::Multiply => Some(MulS),
        BinOp::Divide => Some(DivS),
        _ => None,
    }
}
