//! Shared fixtures and AST constructors for middle-end tests.

use veles_ast::{
    BinaryOp, Decl, Expr, ExprKind, IdentId, Literal, Stmt, SyntaxContext, TranslationUnit,
    UnaryOp,
};
use veles_types::{Idx, Pool};

use crate::build::{lower_unit, LowerError};
use crate::gen::{Backend, ExternData, FunctionData, GlobalData, Lvalue, Rvalue};
use crate::ir::{BlockId, Function, Instr, Label, Opcode, Operand, Value, ValueId};
use crate::module::Module;

// ── Expression constructors ─────────────────────────────────────────

pub(crate) fn int(value: i64) -> Expr {
    Expr {
        ty: Idx::INT,
        kind: ExprKind::Literal(Literal::Int(value)),
    }
}

pub(crate) fn flt(value: f64) -> Expr {
    Expr {
        ty: Idx::FLOAT,
        kind: ExprKind::Literal(Literal::Float(value)),
    }
}

pub(crate) fn ident(id: IdentId, ty: Idx) -> Expr {
    Expr {
        ty,
        kind: ExprKind::Identifier(id),
    }
}

pub(crate) fn bin(op: BinaryOp, ty: Idx, lhs: Expr, rhs: Expr) -> Expr {
    Expr {
        ty,
        kind: ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
    }
}

pub(crate) fn unary(op: UnaryOp, ty: Idx, operand: Expr) -> Expr {
    Expr {
        ty,
        kind: ExprKind::Unary {
            op,
            operand: Box::new(operand),
        },
    }
}

pub(crate) fn assign(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr {
        ty: lhs.ty,
        kind: ExprKind::Assignment {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
    }
}

/// A direct call; the callee node carries the function type, the call
/// node the return type.
pub(crate) fn call(callee: IdentId, fn_ty: Idx, ret_ty: Idx, args: Vec<Expr>) -> Expr {
    Expr {
        ty: ret_ty,
        kind: ExprKind::Call {
            callee: Box::new(ident(callee, fn_ty)),
            args,
        },
    }
}

// ── Statement constructors ──────────────────────────────────────────

pub(crate) fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr(expr)
}

pub(crate) fn ret(expr: Option<Expr>) -> Stmt {
    Stmt::Return(expr)
}

pub(crate) fn compound(stmts: Vec<Stmt>) -> Stmt {
    Stmt::Compound(stmts)
}

pub(crate) fn var_decl(ident: IdentId, init: Option<Expr>) -> Stmt {
    Stmt::Declaration(vec![Decl::Var { ident, init }])
}

// ── Fixture ─────────────────────────────────────────────────────────

/// A syntax context and type pool for one test, plus lowering entry
/// points that panic on failure with the error message.
pub(crate) struct Fixture {
    pub sx: SyntaxContext,
    pub types: Pool,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self {
            sx: SyntaxContext::new(),
            types: Pool::new(),
        }
    }

    pub(crate) fn declare_fn(&mut self, name: &str, ret: Idx, params: &[Idx]) -> IdentId {
        let ty = self.types.function(ret, params);
        self.sx.declare(name, ty)
    }

    pub(crate) fn declare_var(&mut self, name: &str, ty: Idx) -> IdentId {
        self.sx.declare(name, ty)
    }

    pub(crate) fn lower(&self, unit: &TranslationUnit) -> Module {
        let mut module = Module::new();
        if let Err(err) = lower_unit(&mut module, &self.sx, &self.types, unit) {
            panic!("lowering failed: {err}");
        }
        module
    }

    pub(crate) fn lower_err(&self, unit: &TranslationUnit) -> LowerError {
        let mut module = Module::new();
        match lower_unit(&mut module, &self.sx, &self.types, unit) {
            Ok(()) => panic!("lowering unexpectedly succeeded"),
            Err(err) => err,
        }
    }
}

pub(crate) fn func(ident: IdentId, params: Vec<IdentId>, body: Stmt) -> Decl {
    Decl::Func {
        ident,
        params,
        body,
    }
}

pub(crate) fn unit(decls: Vec<Decl>) -> TranslationUnit {
    TranslationUnit { decls }
}

// ── Raw IR constructors (for analysis/optimiser tests) ──────────────

/// A fresh instruction-result value with the given temp number.
pub(crate) fn temp_value(module: &mut Module, n: u32) -> ValueId {
    module.add_value(Value::InstrResult {
        ty: Idx::INT,
        block: BlockId::new(0),
        index: 0,
        temp: n,
    })
}

/// A local stack-slot value at the given displacement.
pub(crate) fn local_value(module: &mut Module, displ: u32) -> ValueId {
    module.add_value(Value::Local {
        ty: Idx::INT,
        displ,
    })
}

pub(crate) fn rrr(op: Opcode, lhs: ValueId, rhs: ValueId, res: ValueId) -> Instr {
    Instr::with_res(
        op,
        [Operand::Value(lhs), Operand::Value(rhs), Operand::None],
        res,
    )
}

pub(crate) fn load(src: ValueId, res: ValueId) -> Instr {
    Instr::with_res(
        Opcode::Load,
        [Operand::Value(src), Operand::None, Operand::None],
        res,
    )
}

pub(crate) fn store(src: ValueId, dst: ValueId) -> Instr {
    Instr::new(
        Opcode::Store,
        [Operand::Value(src), Operand::Value(dst), Operand::None],
    )
}

pub(crate) fn push(value: ValueId) -> Instr {
    Instr::new(
        Opcode::Push,
        [Operand::Value(value), Operand::None, Operand::None],
    )
}

pub(crate) fn ret_value(value: ValueId) -> Instr {
    Instr::new(
        Opcode::Ret,
        [Operand::Value(value), Operand::None, Operand::None],
    )
}

pub(crate) fn move_to(src: ValueId, dst: ValueId) -> Instr {
    Instr::new(
        Opcode::Move,
        [Operand::Value(src), Operand::Value(dst), Operand::None],
    )
}

// ── Inspection helpers ──────────────────────────────────────────────

/// All opcodes of a function, flattened in block order.
pub(crate) fn opcodes(function: &Function) -> Vec<Opcode> {
    function
        .blocks
        .iter()
        .flat_map(|block| block.instrs.iter().map(|instr| instr.op))
        .collect()
}

/// Count occurrences of one opcode in a function.
pub(crate) fn count_op(function: &Function, op: Opcode) -> usize {
    opcodes(function).iter().filter(|&&o| o == op).count()
}

// ── Recording back end ──────────────────────────────────────────────

/// A mock back end that records every callback invocation as a line of
/// text, for bracket-structure and determinism checks.
#[derive(Default)]
pub(crate) struct RecordingBackend {
    pub calls: Vec<String>,
}

impl Backend for RecordingBackend {
    fn gen_begin(&mut self) {
        self.calls.push("begin".into());
    }

    fn gen_end(&mut self) {
        self.calls.push("end".into());
    }

    fn gen_extern(&mut self, data: &ExternData) {
        self.calls.push(format!("extern %{}", data.ident.raw()));
    }

    fn gen_global(&mut self, data: &GlobalData) {
        self.calls
            .push(format!("global %{} {:?}", data.ident.raw(), data.init));
    }

    fn gen_function_begin(&mut self, data: &FunctionData) {
        self.calls.push(format!(
            "function_begin %{} params={} leaf={} locals={} maxargs={}",
            data.ident.raw(),
            data.param_count,
            data.is_leaf,
            data.local_size,
            data.max_call_arguments
        ));
    }

    fn gen_function_end(&mut self, data: &FunctionData) {
        self.calls.push(format!("function_end %{}", data.ident.raw()));
    }

    fn gen_n(&mut self, op: Opcode) {
        self.calls.push(op.mnemonic().to_owned());
    }

    fn gen_rn(&mut self, op: Opcode, op1: Option<&Rvalue>) {
        self.calls.push(format!("{} {op1:?}", op.mnemonic()));
    }

    fn gen_rr(&mut self, op: Opcode, op1: &Rvalue, res: &Rvalue) {
        self.calls
            .push(format!("{} {op1:?} -> {res:?}", op.mnemonic()));
    }

    fn gen_rrn(&mut self, op: Opcode, op1: &Rvalue, op2: &Rvalue) {
        self.calls
            .push(format!("{} {op1:?}, {op2:?}", op.mnemonic()));
    }

    fn gen_rrr(&mut self, op: Opcode, op1: &Rvalue, op2: &Rvalue, res: &Rvalue) {
        self.calls
            .push(format!("{} {op1:?}, {op2:?} -> {res:?}", op.mnemonic()));
    }

    fn gen_lr(&mut self, op: Opcode, src: &Lvalue, res: &Rvalue) {
        self.calls
            .push(format!("{} {src:?} -> {res:?}", op.mnemonic()));
    }

    fn gen_rln(&mut self, op: Opcode, src: &Rvalue, dst: &Lvalue) {
        self.calls
            .push(format!("{} {src:?}, {dst:?}", op.mnemonic()));
    }

    fn gen_sl(&mut self, op: Opcode, size: u32, res: &Lvalue) {
        self.calls
            .push(format!("{} {size} -> {res:?}", op.mnemonic()));
    }

    fn gen_bn(&mut self, op: Opcode, label: Label) {
        self.calls.push(format!("{} {label}", op.mnemonic()));
    }

    fn gen_brn(&mut self, op: Opcode, label: Label, cond: &Rvalue) {
        self.calls
            .push(format!("{} {label}, {cond:?}", op.mnemonic()));
    }

    fn gen_brrn(&mut self, op: Opcode, label: Label, lhs: &Rvalue, rhs: &Rvalue) {
        self.calls
            .push(format!("{} {label}, {lhs:?}, {rhs:?}", op.mnemonic()));
    }

    fn gen_fr(&mut self, op: Opcode, func: IdentId, res: &Rvalue) {
        self.calls
            .push(format!("{} %{} -> {res:?}", op.mnemonic(), func.raw()));
    }
}
