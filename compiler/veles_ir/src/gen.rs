//! Generator driver.
//!
//! Walks module → functions → blocks → instructions and dispatches
//! each instruction to the back end through the [`Backend`] trait:
//! one callback per format class, plus module brackets, extern/global
//! callbacks and per-function brackets. The driver owns all decoding:
//! callbacks receive [`Rvalue`]s, [`Lvalue`]s, [`Label`]s, callee
//! identifiers and sizes, never raw value ids.
//!
//! The driver reads the module and never mutates it; a back end that
//! needs state keeps it behind its own `&mut self`.

use veles_ast::IdentId;
use veles_types::Idx;

use crate::ir::{
    Extern, FormatClass, Function, Global, Instr, Label, Opcode, Operand, Value, ValueId,
};
use crate::module::Module;

// ── Decoded operand surface ─────────────────────────────────────────

/// A readable value as the back end sees it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Rvalue {
    /// Immediate integer.
    Int(i64),
    /// Immediate floating.
    Float(f64),
    /// String literal by pool id.
    String(veles_ast::StringId),
    /// An instruction result held in temp `id`.
    Temp { ty: Idx, id: u32 },
}

/// An addressable location as the back end sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lvalue {
    /// Stack slot at a byte offset.
    Local { ty: Idx, displ: u32 },
    /// Parameter slot, optionally displaced into an aggregate.
    Param {
        ty: Idx,
        index: u32,
        displ: Option<u32>,
    },
    /// Named global, optionally displaced.
    Global {
        ty: Idx,
        ident: IdentId,
        displ: Option<u32>,
    },
    /// An address computed at run time, held in temp `temp`.
    Indirect { ty: Idx, temp: u32 },
}

/// Extern record handed to the back end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExternData {
    pub ident: IdentId,
    pub ty: Idx,
}

/// Global record handed to the back end.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalData {
    pub ident: IdentId,
    pub ty: Idx,
    pub init: Option<Rvalue>,
}

/// Function record handed to the back end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FunctionData {
    pub ident: IdentId,
    pub ty: Idx,
    pub param_count: u32,
    pub is_leaf: bool,
    pub local_size: u32,
    pub max_call_arguments: u32,
}

// ── Callback surface ────────────────────────────────────────────────

/// Per-opcode emit callbacks, grouped by format class.
///
/// `generate` invokes `gen_begin`, then one `gen_extern`/`gen_global`
/// per module entry, then per function `gen_function_begin`, one
/// `gen_<class>` call per instruction in block order, and
/// `gen_function_end`; finally `gen_end`. Every callback receives the
/// opcode so a class shared by several opcodes can tell them apart.
pub trait Backend {
    fn gen_begin(&mut self);
    fn gen_end(&mut self);
    fn gen_extern(&mut self, data: &ExternData);
    fn gen_global(&mut self, data: &GlobalData);
    fn gen_function_begin(&mut self, data: &FunctionData);
    fn gen_function_end(&mut self, data: &FunctionData);

    /// `nop`.
    fn gen_n(&mut self, op: Opcode);
    /// `push v`; `ret v?` (a plain `ret` carries no value).
    fn gen_rn(&mut self, op: Opcode, op1: Option<&Rvalue>);
    /// `itof`/`ftoi`.
    fn gen_rr(&mut self, op: Opcode, op1: &Rvalue, res: &Rvalue);
    /// `move src, dst`.
    fn gen_rrn(&mut self, op: Opcode, op1: &Rvalue, op2: &Rvalue);
    /// Arithmetic and `ptr`.
    fn gen_rrr(&mut self, op: Opcode, op1: &Rvalue, op2: &Rvalue, res: &Rvalue);
    /// `load lvalue → rvalue`.
    fn gen_lr(&mut self, op: Opcode, src: &Lvalue, res: &Rvalue);
    /// `store rvalue, lvalue`.
    fn gen_rln(&mut self, op: Opcode, src: &Rvalue, dst: &Lvalue);
    /// `alloca size → lvalue`.
    fn gen_sl(&mut self, op: Opcode, size: u32, res: &Lvalue);
    /// `label L`; `jmp L`.
    fn gen_bn(&mut self, op: Opcode, label: Label);
    /// `jmpz`/`jmpnz`.
    fn gen_brn(&mut self, op: Opcode, label: Label, cond: &Rvalue);
    /// `jmpeq`/`jmplt`/`jmple`.
    fn gen_brrn(&mut self, op: Opcode, label: Label, lhs: &Rvalue, rhs: &Rvalue);
    /// `call f → rvalue`.
    fn gen_fr(&mut self, op: Opcode, func: IdentId, res: &Rvalue);
}

// ── Decoding ────────────────────────────────────────────────────────

fn decode_rvalue(module: &Module, id: ValueId) -> Rvalue {
    match *module.value(id) {
        Value::ConstInt(value) => Rvalue::Int(value),
        Value::ConstFloat(value) => Rvalue::Float(value),
        Value::ConstString(string) => Rvalue::String(string),
        Value::InstrResult { ty, temp, .. } => Rvalue::Temp { ty, id: temp },
        Value::Param { .. } | Value::Local { .. } | Value::Global { .. } => {
            unreachable!("storage value in an rvalue slot")
        }
    }
}

fn decode_lvalue(module: &Module, id: ValueId) -> Lvalue {
    match *module.value(id) {
        Value::Local { ty, displ } => Lvalue::Local { ty, displ },
        Value::Param { ty, index, displ } => Lvalue::Param { ty, index, displ },
        Value::Global { ident, ty, displ } => Lvalue::Global { ty, ident, displ },
        // A pointer-arithmetic result: the address lives in a temp.
        Value::InstrResult { ty, temp, .. } => Lvalue::Indirect { ty, temp },
        Value::ConstInt(_) | Value::ConstFloat(_) | Value::ConstString(_) => {
            unreachable!("constant in an lvalue slot")
        }
    }
}

fn expect_value(operand: Operand) -> ValueId {
    match operand {
        Operand::Value(id) => id,
        _ => unreachable!("value slot holds a non-value operand"),
    }
}

fn expect_label(module: &Module, operand: Operand) -> Label {
    match operand {
        Operand::Label(id) => module.label(id),
        _ => unreachable!("label slot holds a non-label operand"),
    }
}

fn expect_res(instr: &Instr) -> ValueId {
    match instr.res {
        Some(id) => id,
        None => unreachable!("result-producing instruction without a result"),
    }
}

// ── Driving ─────────────────────────────────────────────────────────

/// Generate the whole module through `backend`.
pub fn generate(module: &Module, backend: &mut dyn Backend) {
    tracing::debug!(
        externs = module.externs().len(),
        globals = module.globals().len(),
        functions = module.functions().len(),
        "generating module"
    );

    backend.gen_begin();
    for ext in module.externs() {
        gen_extern(backend, ext);
    }
    for global in module.globals() {
        gen_global(module, backend, global);
    }
    for function in module.functions() {
        gen_function(module, backend, function);
    }
    backend.gen_end();
}

fn gen_extern(backend: &mut dyn Backend, ext: &Extern) {
    backend.gen_extern(&ExternData {
        ident: ext.ident,
        ty: ext.ty,
    });
}

fn gen_global(module: &Module, backend: &mut dyn Backend, global: &Global) {
    backend.gen_global(&GlobalData {
        ident: global.ident,
        ty: global.ty,
        init: global.init.map(|id| decode_rvalue(module, id)),
    });
}

fn gen_function(module: &Module, backend: &mut dyn Backend, function: &Function) {
    let data = FunctionData {
        ident: function.ident,
        ty: function.ty,
        param_count: function.param_count,
        is_leaf: function.is_leaf,
        local_size: function.local_size,
        max_call_arguments: function.max_call_arguments,
    };
    backend.gen_function_begin(&data);
    for block in &function.blocks {
        for instr in &block.instrs {
            gen_instr(module, backend, instr);
        }
    }
    backend.gen_function_end(&data);
}

/// Decode one instruction per its format class and invoke the matching
/// callback.
fn gen_instr(module: &Module, backend: &mut dyn Backend, instr: &Instr) {
    match instr.op.format_class() {
        FormatClass::N => backend.gen_n(instr.op),
        FormatClass::Rn => {
            let op1 = instr.ops[0].as_value().map(|id| decode_rvalue(module, id));
            backend.gen_rn(instr.op, op1.as_ref());
        }
        FormatClass::Rr => {
            let op1 = decode_rvalue(module, expect_value(instr.ops[0]));
            let res = decode_rvalue(module, expect_res(instr));
            backend.gen_rr(instr.op, &op1, &res);
        }
        FormatClass::Rrn => {
            let op1 = decode_rvalue(module, expect_value(instr.ops[0]));
            let op2 = decode_rvalue(module, expect_value(instr.ops[1]));
            backend.gen_rrn(instr.op, &op1, &op2);
        }
        FormatClass::Rrr => {
            let op1 = decode_rvalue(module, expect_value(instr.ops[0]));
            let op2 = decode_rvalue(module, expect_value(instr.ops[1]));
            let res = decode_rvalue(module, expect_res(instr));
            backend.gen_rrr(instr.op, &op1, &op2, &res);
        }
        FormatClass::Lr => {
            let src = decode_lvalue(module, expect_value(instr.ops[0]));
            let res = decode_rvalue(module, expect_res(instr));
            backend.gen_lr(instr.op, &src, &res);
        }
        FormatClass::Rln => {
            let src = decode_rvalue(module, expect_value(instr.ops[0]));
            let dst = decode_lvalue(module, expect_value(instr.ops[1]));
            backend.gen_rln(instr.op, &src, &dst);
        }
        FormatClass::Sl => {
            let size = match *module.value(expect_value(instr.ops[0])) {
                #[expect(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    reason = "alloca sizes are small positive byte counts"
                )]
                Value::ConstInt(bytes) => bytes as u32,
                _ => unreachable!("alloca size is always an integer constant"),
            };
            let res = decode_lvalue(module, expect_res(instr));
            backend.gen_sl(instr.op, size, &res);
        }
        FormatClass::Bn => {
            backend.gen_bn(instr.op, expect_label(module, instr.ops[0]));
        }
        FormatClass::Brn => {
            let label = expect_label(module, instr.ops[0]);
            let cond = decode_rvalue(module, expect_value(instr.ops[1]));
            backend.gen_brn(instr.op, label, &cond);
        }
        FormatClass::Brrn => {
            let label = expect_label(module, instr.ops[0]);
            let lhs = decode_rvalue(module, expect_value(instr.ops[1]));
            let rhs = decode_rvalue(module, expect_value(instr.ops[2]));
            backend.gen_brrn(instr.op, label, &lhs, &rhs);
        }
        FormatClass::Fr => {
            let func = match instr.ops[0] {
                Operand::Func(ident) => ident,
                _ => unreachable!("call target is always a function reference"),
            };
            let res = decode_rvalue(module, expect_res(instr));
            backend.gen_fr(instr.op, func, &res);
        }
    }
}

#[cfg(test)]
mod tests;
