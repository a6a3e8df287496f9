//! AST → IR lowering.
//!
//! Converts the typed tree (implicit control flow) into the linear
//! three-address form (explicit labels and jumps). The split mirrors
//! the syntax: this module owns the [`Builder`] with its block and
//! temp management plus declaration lowering; `expr.rs` lowers
//! expressions and `stmt.rs` lowers statements.
//!
//! # Block discipline
//!
//! A new block is started whenever a control-transfer instruction is
//! emitted (any jump or `call`) and whenever a label is placed. The
//! current block is always the last block of the current function.
//!
//! # Failure semantics
//!
//! Constructs the language front end accepts but this lowering does not
//! implement (structure assignment, array initialisation, address-of,
//! arrow member access, ...) fail fatally with [`LowerError::Unsupported`]
//! naming the construct; the builder never silently emits wrong code.
//! A well-typed tree is otherwise assumed, and shape violations fail
//! with [`LowerError::Unexpected`].

mod expr;
mod stmt;

use std::fmt;

use veles_ast::{Decl, IdentId, Literal, SyntaxContext, TranslationUnit};
use veles_types::{Idx, Pool};

use crate::ir::{
    Block, BlockId, Extern, FuncId, Function, Global, Instr, LabelId, LabelKind, Opcode, Operand,
    Value, ValueId, WORD_SIZE,
};
use crate::module::Module;

// ── Errors ──────────────────────────────────────────────────────────

/// Fatal lowering failure. Nothing here is recoverable; the caller
/// decides whether to continue with other translation units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LowerError {
    /// A construct whose lowering is not implemented.
    Unsupported { construct: &'static str },
    /// An ill-formed tree (e.g. an rvalue where an lvalue is required).
    Unexpected { what: &'static str },
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowerError::Unsupported { construct } => {
                write!(f, "unsupported construct: {construct}")
            }
            LowerError::Unexpected { what } => write!(f, "unexpected node: {what}"),
        }
    }
}

impl std::error::Error for LowerError {}

// ── Builder ─────────────────────────────────────────────────────────

/// Stateful lowering context.
///
/// Holds the module being populated, the front-end context it reads,
/// the current function, and the active `break`/`continue` targets.
/// The target labels form a stack that mirrors the nesting of the
/// tree: each loop or switch saves the outer bindings on entry and
/// restores them on exit.
pub struct Builder<'a> {
    module: &'a mut Module,
    sx: &'a SyntaxContext,
    types: &'a Pool,
    function: Option<FuncId>,
    pub(crate) break_label: Option<LabelId>,
    pub(crate) continue_label: Option<LabelId>,
    /// Per-function temp-number slots; `free_value` releases them for
    /// reuse. Reuse is a hint only and never affects value identity.
    temp_used: Vec<bool>,
}

/// Lower a whole translation unit into `module`.
pub fn lower_unit(
    module: &mut Module,
    sx: &SyntaxContext,
    types: &Pool,
    unit: &TranslationUnit,
) -> Result<(), LowerError> {
    let mut builder = Builder::new(module, sx, types);
    for decl in &unit.decls {
        builder.emit_declaration(decl)?;
    }
    Ok(())
}

impl<'a> Builder<'a> {
    /// Create a builder over an (often empty) module.
    pub fn new(module: &'a mut Module, sx: &'a SyntaxContext, types: &'a Pool) -> Self {
        Self {
            module,
            sx,
            types,
            function: None,
            break_label: None,
            continue_label: None,
            temp_used: Vec::new(),
        }
    }

    // ── Current function and block ─────────────────────────────────

    fn cur_func_id(&self) -> FuncId {
        match self.function {
            Some(id) => id,
            None => unreachable!("no function is being lowered"),
        }
    }

    fn cur_func(&mut self) -> &mut Function {
        let id = self.cur_func_id();
        self.module.function_mut(id)
    }

    fn cur_block_id(&mut self) -> BlockId {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "block counts never exceed u32"
        )]
        let raw = self.cur_func().blocks.len() as u32 - 1;
        BlockId::new(raw)
    }

    /// Start a fresh block; subsequent instructions accumulate there.
    fn start_block(&mut self) {
        self.cur_func().blocks.push(Block::new());
    }

    /// Append an instruction to the current block and, for
    /// control-transfer opcodes, start the successor block.
    fn push(&mut self, instr: Instr) {
        let ends_block = instr.op.ends_block();
        let func = self.cur_func();
        let Some(block) = func.blocks.last_mut() else {
            unreachable!("function without blocks");
        };
        block.instrs.push(instr);
        if ends_block {
            self.start_block();
        }
    }

    // ── Temps and values ───────────────────────────────────────────

    /// Allocate a fresh instruction-result value with the lowest free
    /// temp number.
    pub(crate) fn alloc_temp(&mut self, ty: Idx) -> ValueId {
        let slot = match self.temp_used.iter().position(|used| !used) {
            Some(slot) => slot,
            None => {
                self.temp_used.push(false);
                self.temp_used.len() - 1
            }
        };
        self.temp_used[slot] = true;

        let block = self.cur_block_id();
        #[expect(
            clippy::cast_possible_truncation,
            reason = "block lengths and temp slots never exceed u32"
        )]
        let value = Value::InstrResult {
            ty,
            block,
            index: self.module.function(self.cur_func_id()).blocks[block.index()]
                .instrs
                .len() as u32,
            temp: slot as u32,
        };
        self.module.add_value(value)
    }

    /// Hint that a value is no longer needed. Instruction-result temp
    /// numbers return to the pool for reuse; all other values (and
    /// every value id) stay valid.
    pub fn free_value(&mut self, id: ValueId) {
        if let Value::InstrResult { temp, .. } = *self.module.value(id) {
            if let Some(slot) = self.temp_used.get_mut(temp as usize) {
                *slot = false;
            }
        }
    }

    // ── Immediates ─────────────────────────────────────────────────

    pub(crate) fn imm_int(&mut self, value: i64) -> ValueId {
        self.module.intern_int(value)
    }

    pub(crate) fn imm_float(&mut self, value: f64) -> ValueId {
        self.module.intern_float(value)
    }

    pub(crate) fn imm_string(&mut self, string: veles_ast::StringId) -> ValueId {
        self.module.intern_string(string)
    }

    pub(crate) fn imm_zero(&mut self) -> ValueId {
        self.imm_int(0)
    }

    pub(crate) fn imm_one(&mut self) -> ValueId {
        self.imm_int(1)
    }

    pub(crate) fn imm_minus_one(&mut self) -> ValueId {
        self.imm_int(-1)
    }

    // ── Labels ─────────────────────────────────────────────────────

    pub(crate) fn add_label(&mut self, kind: LabelKind) -> LabelId {
        self.module.add_label(kind)
    }

    /// Place a label: starts a new block headed by a `label`
    /// instruction. A preceding jump already opened a fresh block, so
    /// one is only added when instructions have accumulated since.
    pub(crate) fn build_label(&mut self, label: LabelId) {
        let needs_block = self
            .cur_func()
            .blocks
            .last()
            .is_some_and(|block| !block.instrs.is_empty());
        if needs_block {
            self.start_block();
        }
        self.push(Instr::new(
            Opcode::Label,
            [Operand::Label(label), Operand::None, Operand::None],
        ));
    }

    // ── Instruction emitters ───────────────────────────────────────

    pub(crate) fn build_move(&mut self, src: ValueId, dst: ValueId) {
        self.push(Instr::new(
            Opcode::Move,
            [Operand::Value(src), Operand::Value(dst), Operand::None],
        ));
    }

    pub(crate) fn build_load(&mut self, src: ValueId) -> ValueId {
        let ty = self.module.value(src).ty();
        let res = self.alloc_temp(ty);
        self.push(Instr::with_res(
            Opcode::Load,
            [Operand::Value(src), Operand::None, Operand::None],
            res,
        ));
        res
    }

    pub(crate) fn build_store(&mut self, src: ValueId, dst: ValueId) {
        self.push(Instr::new(
            Opcode::Store,
            [Operand::Value(src), Operand::Value(dst), Operand::None],
        ));
    }

    /// Reserve a frame slot for `ty` and emit the `alloca`. The result
    /// value is the `Local` at the slot's byte displacement.
    pub(crate) fn build_alloca(&mut self, ty: Idx) -> ValueId {
        let bytes = self.types.size_in_words(ty) * WORD_SIZE;
        let displ = {
            let func = self.cur_func();
            let displ = func.local_size;
            func.local_size += bytes;
            displ
        };
        let size = self.imm_int(i64::from(bytes));
        let res = self.module.add_value(Value::Local { ty, displ });
        self.push(Instr::with_res(
            Opcode::Alloca,
            [Operand::Value(size), Operand::None, Operand::None],
            res,
        ));
        res
    }

    /// Derive the address of a member at a constant byte displacement
    /// from a statically known location. No instruction is emitted;
    /// the displacement folds into the value. Bases whose address is
    /// only known at run time have no static displaced form.
    pub(crate) fn build_ptr_displ(
        &mut self,
        ty: Idx,
        base: ValueId,
        displ: u32,
    ) -> Result<ValueId, LowerError> {
        let derived = match *self.module.value(base) {
            Value::Local { displ: base_displ, .. } => Value::Local {
                ty,
                displ: base_displ + displ,
            },
            Value::Param {
                index,
                displ: base_displ,
                ..
            } => Value::Param {
                ty,
                index,
                displ: Some(base_displ.unwrap_or(0) + displ),
            },
            Value::Global {
                ident,
                displ: base_displ,
                ..
            } => Value::Global {
                ident,
                ty,
                displ: Some(base_displ.unwrap_or(0) + displ),
            },
            _ => {
                return Err(LowerError::Unsupported {
                    construct: "member access through a computed address",
                })
            }
        };
        Ok(self.module.add_value(derived))
    }

    /// Address of element `index` of `base`: a `ptr` instruction whose
    /// result type names the element type (the back end scales the
    /// index by it).
    pub(crate) fn build_ptr(&mut self, ty: Idx, base: ValueId, index: ValueId) -> ValueId {
        let res = self.alloc_temp(ty);
        self.push(Instr::with_res(
            Opcode::Ptr,
            [Operand::Value(base), Operand::Value(index), Operand::None],
            res,
        ));
        res
    }

    /// Arithmetic, shift or bitwise instruction producing a temp of
    /// the opcode's natural type (integer or floating).
    pub(crate) fn build_bin(&mut self, op: Opcode, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = match op {
            Opcode::Fadd | Opcode::Fsub | Opcode::Fmul | Opcode::Fdiv => Idx::FLOAT,
            _ => Idx::INT,
        };
        let res = self.alloc_temp(ty);
        self.push(Instr::with_res(
            op,
            [Operand::Value(lhs), Operand::Value(rhs), Operand::None],
            res,
        ));
        res
    }

    pub(crate) fn build_itof(&mut self, value: ValueId) -> ValueId {
        let res = self.alloc_temp(Idx::FLOAT);
        self.push(Instr::with_res(
            Opcode::Itof,
            [Operand::Value(value), Operand::None, Operand::None],
            res,
        ));
        res
    }

    pub(crate) fn build_ftoi(&mut self, value: ValueId) -> ValueId {
        let res = self.alloc_temp(Idx::INT);
        self.push(Instr::with_res(
            Opcode::Ftoi,
            [Operand::Value(value), Operand::None, Operand::None],
            res,
        ));
        res
    }

    pub(crate) fn build_jmp(&mut self, label: LabelId) {
        self.push(Instr::new(
            Opcode::Jmp,
            [Operand::Label(label), Operand::None, Operand::None],
        ));
    }

    pub(crate) fn build_jmpz(&mut self, label: LabelId, value: ValueId) {
        self.push(Instr::new(
            Opcode::Jmpz,
            [Operand::Label(label), Operand::Value(value), Operand::None],
        ));
    }

    pub(crate) fn build_jmpnz(&mut self, label: LabelId, value: ValueId) {
        self.push(Instr::new(
            Opcode::Jmpnz,
            [Operand::Label(label), Operand::Value(value), Operand::None],
        ));
    }

    pub(crate) fn build_jmpeq(&mut self, label: LabelId, lhs: ValueId, rhs: ValueId) {
        self.push(Instr::new(
            Opcode::Jmpeq,
            [
                Operand::Label(label),
                Operand::Value(lhs),
                Operand::Value(rhs),
            ],
        ));
    }

    pub(crate) fn build_jmplt(&mut self, label: LabelId, lhs: ValueId, rhs: ValueId) {
        self.push(Instr::new(
            Opcode::Jmplt,
            [
                Operand::Label(label),
                Operand::Value(lhs),
                Operand::Value(rhs),
            ],
        ));
    }

    pub(crate) fn build_jmple(&mut self, label: LabelId, lhs: ValueId, rhs: ValueId) {
        self.push(Instr::new(
            Opcode::Jmple,
            [
                Operand::Label(label),
                Operand::Value(lhs),
                Operand::Value(rhs),
            ],
        ));
    }

    pub(crate) fn build_push(&mut self, value: ValueId) {
        self.push(Instr::new(
            Opcode::Push,
            [Operand::Value(value), Operand::None, Operand::None],
        ));
    }

    pub(crate) fn build_call(&mut self, callee: IdentId, ret_ty: Idx) -> ValueId {
        let res = self.alloc_temp(ret_ty);
        self.push(Instr::with_res(
            Opcode::Call,
            [Operand::Func(callee), Operand::None, Operand::None],
            res,
        ));
        res
    }

    pub(crate) fn build_ret(&mut self, value: Option<ValueId>) {
        let op1 = value.map_or(Operand::None, Operand::Value);
        self.push(Instr::new(
            Opcode::Ret,
            [op1, Operand::None, Operand::None],
        ));
    }

    // ── Function metadata ──────────────────────────────────────────

    pub(crate) fn make_non_leaf(&mut self) {
        self.cur_func().is_leaf = false;
    }

    pub(crate) fn update_max_call_arguments(&mut self, amount: u32) {
        let func = self.cur_func();
        func.max_call_arguments = func.max_call_arguments.max(amount);
    }

    // ── Declarations ───────────────────────────────────────────────

    /// Register an external declaration (a referenced function or
    /// object defined in another unit).
    pub fn build_extern(&mut self, ident: IdentId, ty: Idx) {
        self.module.add_extern(Extern { ident, ty });
        let value = self.module.add_value(Value::Global {
            ident,
            ty,
            displ: None,
        });
        self.module.bind_ident(ident, value);
    }

    pub(crate) fn emit_declaration(&mut self, decl: &Decl) -> Result<(), LowerError> {
        match decl {
            Decl::Var { ident, init } => self.emit_variable_declaration(*ident, init.as_ref()),
            Decl::Func {
                ident,
                params,
                body,
            } => self.emit_function_definition(*ident, params, body),
            // Type declarations carry no code.
            Decl::Type { .. } => Ok(()),
        }
    }

    fn emit_variable_declaration(
        &mut self,
        ident: IdentId,
        init: Option<&veles_ast::Expr>,
    ) -> Result<(), LowerError> {
        let ty = self.sx.ident_type(ident);

        if self.function.is_none() {
            return self.emit_global_declaration(ident, ty, init);
        }

        let slot = self.build_alloca(ty);
        self.module.bind_ident(ident, slot);

        if let Some(init) = init {
            if self.types.is_structure(ty) {
                return Err(LowerError::Unsupported {
                    construct: "structure initialisation",
                });
            }
            if self.types.is_array(ty) {
                return Err(LowerError::Unsupported {
                    construct: "array initialisation",
                });
            }
            let value = self.emit_expression(init)?;
            self.build_store(value, slot);
            self.free_value(value);
        }
        Ok(())
    }

    /// A declaration outside any function defines a global. Only
    /// constant initialisers are representable in the global list.
    fn emit_global_declaration(
        &mut self,
        ident: IdentId,
        ty: Idx,
        init: Option<&veles_ast::Expr>,
    ) -> Result<(), LowerError> {
        let init_value = match init {
            None => None,
            Some(expr) => match &expr.kind {
                veles_ast::ExprKind::Literal(Literal::Bool(b)) => {
                    Some(self.imm_int(i64::from(*b)))
                }
                veles_ast::ExprKind::Literal(Literal::Char(c)) => {
                    Some(self.imm_int(i64::from(u32::from(*c))))
                }
                veles_ast::ExprKind::Literal(Literal::Int(v)) => Some(self.imm_int(*v)),
                veles_ast::ExprKind::Literal(Literal::Float(v)) => Some(self.imm_float(*v)),
                veles_ast::ExprKind::Literal(Literal::String(s)) => Some(self.imm_string(*s)),
                _ => {
                    return Err(LowerError::Unsupported {
                        construct: "non-constant global initialiser",
                    })
                }
            },
        };
        self.module.add_global(Global {
            ident,
            ty,
            init: init_value,
        });
        let value = self.module.add_value(Value::Global {
            ident,
            ty,
            displ: None,
        });
        self.module.bind_ident(ident, value);
        Ok(())
    }

    fn emit_function_definition(
        &mut self,
        ident: IdentId,
        params: &[IdentId],
        body: &veles_ast::Stmt,
    ) -> Result<(), LowerError> {
        let func_ty = self.sx.ident_type(ident);
        let param_count = self.types.function_param_count(func_ty);
        tracing::debug!(
            function = self.sx.ident_spelling(ident),
            param_count,
            "lowering function"
        );

        let id = self.module.add_function(Function::new(ident, func_ty, param_count));
        self.function = Some(id);
        self.temp_used.clear();

        // Parameter slots resolve by identifier like any other storage.
        for (index, &param) in params.iter().enumerate() {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "parameter counts never exceed u32"
            )]
            let param_ty = self.types.function_param_type(func_ty, index as u32);
            #[expect(
                clippy::cast_possible_truncation,
                reason = "parameter counts never exceed u32"
            )]
            let value = self.module.add_value(Value::Param {
                ty: param_ty,
                index: index as u32,
                displ: None,
            });
            self.module.bind_ident(param, value);
        }

        self.emit_statement(body)?;

        // Fallthrough off the end of the body returns void.
        let needs_ret = self
            .cur_func()
            .blocks
            .last()
            .is_none_or(|block| !matches!(block.instrs.last(), Some(i) if i.op == Opcode::Ret));
        if needs_ret {
            self.build_ret(None);
        }

        self.function = None;
        Ok(())
    }
}
