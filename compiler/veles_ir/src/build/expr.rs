//! Expression lowering.
//!
//! Two mutually recursive entry points: [`Builder::emit_expression`]
//! produces an rvalue, [`Builder::emit_lvalue`] a value denoting an
//! addressable location. When an rvalue is required from an lvalue
//! node, an explicit `load` is inserted.
//!
//! Relational and logical operators have no direct instruction; they
//! materialise a 0/1 temp with a compare-branch-move diamond. Mixed
//! integer/floating arithmetic coerces both sides to floating via
//! `itof` and uses the floating opcode.

use veles_ast::{BinaryOp, Expr, ExprKind, Literal, UnaryOp};
use veles_types::Idx;

use crate::ir::{LabelKind, Opcode, ValueId, WORD_SIZE};

use super::{Builder, LowerError};

impl Builder<'_> {
    // ── Lvalues ────────────────────────────────────────────────────

    /// Lower a node denoting an addressable location.
    pub(crate) fn emit_lvalue(&mut self, expr: &Expr) -> Result<ValueId, LowerError> {
        if !expr.is_lvalue() {
            return Err(LowerError::Unexpected {
                what: "rvalue where an lvalue is required",
            });
        }
        match &expr.kind {
            ExprKind::Identifier(ident) => {
                self.module
                    .ident_value(*ident)
                    .ok_or(LowerError::Unexpected {
                        what: "identifier without registered storage",
                    })
            }
            ExprKind::Subscript { base, index } => {
                let base_value = self.emit_expression(base)?;
                let index_value = self.emit_expression(index)?;
                let res = self.build_ptr(expr.ty, base_value, index_value);
                self.free_value(base_value);
                self.free_value(index_value);
                Ok(res)
            }
            ExprKind::Member {
                base,
                member,
                arrow,
            } => self.emit_member_lvalue(expr.ty, base, *member, *arrow),
            ExprKind::Unary {
                op: UnaryOp::Indirection,
                ..
            } => Err(LowerError::Unsupported {
                construct: "indirection lvalue",
            }),
            _ => Err(LowerError::Unexpected {
                what: "node is not an lvalue",
            }),
        }
    }

    /// Member access folds to a constant byte displacement: the sum of
    /// the sizes of the preceding members.
    fn emit_member_lvalue(
        &mut self,
        ty: Idx,
        base: &Expr,
        member: u32,
        arrow: bool,
    ) -> Result<ValueId, LowerError> {
        if arrow {
            return Err(LowerError::Unsupported {
                construct: "arrow member access",
            });
        }
        let struct_ty = base.ty;
        let mut displ = 0u32;
        for i in 0..member {
            let member_ty = self.types.structure_member_type(struct_ty, i);
            displ += self.types.size_in_words(member_ty) * WORD_SIZE;
        }
        let base_value = self.emit_lvalue(base)?;
        self.build_ptr_displ(ty, base_value, displ)
    }

    // ── Rvalues ────────────────────────────────────────────────────

    /// Lower a node to an rvalue. Lvalue nodes are lowered to their
    /// location and loaded.
    pub(crate) fn emit_expression(&mut self, expr: &Expr) -> Result<ValueId, LowerError> {
        if expr.is_lvalue() {
            let location = self.emit_lvalue(expr)?;
            return Ok(self.build_load(location));
        }
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(self.emit_literal(lit)),
            ExprKind::Call { callee, args } => self.emit_call(callee, args),
            ExprKind::Cast(operand) => self.emit_cast(expr.ty, operand),
            ExprKind::Unary { op, operand } => self.emit_unary(*op, operand),
            ExprKind::Binary { op, lhs, rhs } => self.emit_binary(*op, lhs, rhs),
            ExprKind::Ternary { cond, lhs, rhs } => self.emit_ternary(cond, lhs, rhs),
            ExprKind::Assignment { op, lhs, rhs } => self.emit_assignment(*op, lhs, rhs),
            ExprKind::Initializer(_) => Err(LowerError::Unsupported {
                construct: "initializer expression",
            }),
            // A member access in rvalue position is a structure
            // returned from a function.
            ExprKind::Member { .. } => Err(LowerError::Unsupported {
                construct: "structure return value",
            }),
            ExprKind::Identifier(_) | ExprKind::Subscript { .. } => {
                unreachable!("lvalue nodes are handled above")
            }
        }
    }

    pub(crate) fn emit_literal(&mut self, lit: &Literal) -> ValueId {
        match *lit {
            Literal::Bool(value) => self.imm_int(i64::from(value)),
            Literal::Char(value) => self.imm_int(i64::from(u32::from(value))),
            Literal::Int(value) => self.imm_int(value),
            Literal::Float(value) => self.imm_float(value),
            Literal::String(value) => self.imm_string(value),
        }
    }

    /// Arguments are evaluated left to right, then pushed in the same
    /// order, then the call is emitted. Calling marks the current
    /// function non-leaf and records the peak call arity.
    fn emit_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<ValueId, LowerError> {
        let ExprKind::Identifier(func_ref) = callee.kind else {
            return Err(LowerError::Unsupported {
                construct: "call through a function pointer",
            });
        };
        let ret_ty = self.types.function_return_type(callee.ty);

        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.emit_expression(arg)?);
        }
        for &value in &arg_values {
            self.build_push(value);
            self.free_value(value);
        }

        let res = self.build_call(func_ref, ret_ty);

        self.make_non_leaf();
        #[expect(
            clippy::cast_possible_truncation,
            reason = "argument counts never exceed u32"
        )]
        self.update_max_call_arguments(args.len() as u32);

        Ok(res)
    }

    /// Integer↔floating casts convert; every other cast is a no-op.
    fn emit_cast(&mut self, target: Idx, operand: &Expr) -> Result<ValueId, LowerError> {
        let source = operand.ty;
        let value = self.emit_expression(operand)?;

        if self.types.is_integer(source) && self.types.is_floating(target) {
            return Ok(self.build_itof(value));
        }
        if self.types.is_floating(source) && self.types.is_integer(target) {
            return Ok(self.build_ftoi(value));
        }
        Ok(value)
    }

    /// `++`/`--`, both fixities: compute the location, load, add or
    /// subtract one, store back. Prefix yields the new value, postfix
    /// the original.
    fn emit_increment(&mut self, op: UnaryOp, operand: &Expr) -> Result<ValueId, LowerError> {
        let is_inc = matches!(op, UnaryOp::PreInc | UnaryOp::PostInc);
        let is_prefix = matches!(op, UnaryOp::PreInc | UnaryOp::PreDec);
        let bin = if is_inc { BinaryOp::Add } else { BinaryOp::Sub };

        let location = self.emit_lvalue(operand)?;
        let loaded = self.build_load(location);
        let one = self.imm_one();
        let updated = self.build_binary_operation(loaded, one, bin)?;
        self.free_value(one);
        self.build_store(updated, location);

        if is_prefix {
            self.free_value(loaded);
            Ok(updated)
        } else {
            self.free_value(updated);
            Ok(loaded)
        }
    }

    fn emit_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<ValueId, LowerError> {
        match op {
            UnaryOp::PostInc | UnaryOp::PostDec | UnaryOp::PreInc | UnaryOp::PreDec => {
                self.emit_increment(op, operand)
            }
            UnaryOp::Minus => {
                let value = self.emit_expression(operand)?;
                let minus_one = self.imm_minus_one();
                let res = self.build_binary_operation(value, minus_one, BinaryOp::Mul)?;
                self.free_value(minus_one);
                self.free_value(value);
                Ok(res)
            }
            UnaryOp::BitNot => {
                let value = self.emit_expression(operand)?;
                let minus_one = self.imm_minus_one();
                let res = self.build_binary_operation(value, minus_one, BinaryOp::BitXor)?;
                self.free_value(minus_one);
                self.free_value(value);
                Ok(res)
            }
            UnaryOp::LogNot => {
                let value = self.emit_expression(operand)?;
                let else_label = self.add_label(LabelKind::Else);
                let end_label = self.add_label(LabelKind::End);

                let res = self.alloc_temp(Idx::BOOL);

                let zero = self.imm_zero();
                self.build_jmpeq(else_label, value, zero);
                self.free_value(value);

                let zero_move = self.imm_zero();
                self.build_move(zero_move, res);
                self.build_jmp(end_label);

                self.build_label(else_label);
                let one = self.imm_one();
                self.build_move(one, res);
                self.build_label(end_label);

                Ok(res)
            }
            UnaryOp::Indirection => Err(LowerError::Unsupported {
                construct: "indirection rvalue",
            }),
            UnaryOp::Address => Err(LowerError::Unsupported {
                construct: "address-of",
            }),
            UnaryOp::Abs => Err(LowerError::Unsupported {
                construct: "built-in abs",
            }),
            UnaryOp::Upb => Err(LowerError::Unsupported {
                construct: "built-in upb",
            }),
        }
    }

    /// Lower a non-short-circuit binary operator over already-emitted
    /// operands. Arithmetic picks the integer or floating opcode from
    /// the operand types; relational operators materialise a boolean.
    pub(crate) fn build_binary_operation(
        &mut self,
        lhs: ValueId,
        rhs: ValueId,
        op: BinaryOp,
    ) -> Result<ValueId, LowerError> {
        debug_assert!(!matches!(op, BinaryOp::LogAnd | BinaryOp::LogOr));

        match op {
            BinaryOp::Add => self.emit_arith(lhs, rhs, Opcode::Add, Opcode::Fadd),
            BinaryOp::Sub => self.emit_arith(lhs, rhs, Opcode::Sub, Opcode::Fsub),
            BinaryOp::Mul => self.emit_arith(lhs, rhs, Opcode::Mul, Opcode::Fmul),
            BinaryOp::Div => self.emit_arith(lhs, rhs, Opcode::Div, Opcode::Fdiv),
            BinaryOp::Rem => Ok(self.build_bin(Opcode::Mod, lhs, rhs)),
            BinaryOp::Shl => Ok(self.build_bin(Opcode::Shl, lhs, rhs)),
            BinaryOp::Shr => Ok(self.build_bin(Opcode::Shr, lhs, rhs)),
            BinaryOp::BitAnd => Ok(self.build_bin(Opcode::And, lhs, rhs)),
            BinaryOp::BitXor => Ok(self.build_bin(Opcode::Xor, lhs, rhs)),
            BinaryOp::BitOr => Ok(self.build_bin(Opcode::Or, lhs, rhs)),
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq
            | BinaryOp::Ne => self.emit_comparison(lhs, rhs, op),
            _ => Err(LowerError::Unexpected {
                what: "operator without a value lowering",
            }),
        }
    }

    /// Integer opcode when both operands are integer; otherwise both
    /// sides are coerced to floating and the floating opcode is used.
    fn emit_arith(
        &mut self,
        lhs: ValueId,
        rhs: ValueId,
        int_op: Opcode,
        float_op: Opcode,
    ) -> Result<ValueId, LowerError> {
        let lhs_ty = self.module.value(lhs).ty();
        let rhs_ty = self.module.value(rhs).ty();

        if self.types.is_integer(lhs_ty) && self.types.is_integer(rhs_ty) {
            return Ok(self.build_bin(int_op, lhs, rhs));
        }

        let lhs_value = if self.types.is_floating(lhs_ty) {
            lhs
        } else {
            self.build_itof(lhs)
        };
        let rhs_value = if self.types.is_floating(rhs_ty) {
            rhs
        } else {
            self.build_itof(rhs)
        };
        Ok(self.build_bin(float_op, lhs_value, rhs_value))
    }

    /// Relational operators compare-and-branch around two `move`s into
    /// a boolean temp: the branch goes to an `Else` label holding one
    /// arm, the fallthrough holds the other, an `End` label joins.
    fn emit_comparison(
        &mut self,
        lhs: ValueId,
        rhs: ValueId,
        op: BinaryOp,
    ) -> Result<ValueId, LowerError> {
        let lhs_ty = self.module.value(lhs).ty();
        let rhs_ty = self.module.value(rhs).ty();
        if !self.types.is_integer(lhs_ty) || !self.types.is_integer(rhs_ty) {
            return Err(LowerError::Unsupported {
                construct: "floating comparison",
            });
        }

        // Branch taken ⇒ the Else arm's value; fallthrough ⇒ the other.
        let (branch, else_value, fall_value) = match op {
            BinaryOp::Lt => (Opcode::Jmplt, 1, 0),
            BinaryOp::Gt => (Opcode::Jmple, 0, 1),
            BinaryOp::Le => (Opcode::Jmple, 1, 0),
            BinaryOp::Ge => (Opcode::Jmplt, 0, 1),
            BinaryOp::Eq => (Opcode::Jmpeq, 1, 0),
            BinaryOp::Ne => (Opcode::Jmpeq, 0, 1),
            _ => unreachable!("caller filters to relational operators"),
        };

        let res = self.alloc_temp(Idx::BOOL);
        let else_label = self.add_label(LabelKind::Else);
        let end_label = self.add_label(LabelKind::End);

        match branch {
            Opcode::Jmplt => self.build_jmplt(else_label, lhs, rhs),
            Opcode::Jmple => self.build_jmple(else_label, lhs, rhs),
            Opcode::Jmpeq => self.build_jmpeq(else_label, lhs, rhs),
            _ => unreachable!("relational branches are jmplt/jmple/jmpeq"),
        }

        let fall = self.imm_int(fall_value);
        self.build_move(fall, res);
        self.build_jmp(end_label);

        self.build_label(else_label);
        let taken = self.imm_int(else_value);
        self.build_move(taken, res);

        self.build_label(end_label);
        Ok(res)
    }

    fn emit_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<ValueId, LowerError> {
        match op {
            BinaryOp::Comma => {
                self.emit_void_expression(lhs)?;
                self.emit_expression(rhs)
            }
            BinaryOp::LogAnd => self.emit_short_circuit(lhs, rhs, true),
            BinaryOp::LogOr => self.emit_short_circuit(lhs, rhs, false),
            _ => {
                let lhs_value = self.emit_expression(lhs)?;
                let rhs_value = self.emit_expression(rhs)?;
                let res = self.build_binary_operation(lhs_value, rhs_value, op)?;
                self.free_value(lhs_value);
                self.free_value(rhs_value);
                Ok(res)
            }
        }
    }

    /// `&&`/`||`: branch-on-zero (resp. branch-on-nonzero) over both
    /// operands to a shared `And`/`Or` label, then fallthrough moves.
    fn emit_short_circuit(
        &mut self,
        lhs: &Expr,
        rhs: &Expr,
        is_and: bool,
    ) -> Result<ValueId, LowerError> {
        let res = self.alloc_temp(Idx::INT);
        let short_label = self.add_label(if is_and { LabelKind::And } else { LabelKind::Or });
        let end_label = self.add_label(LabelKind::End);

        let lhs_value = self.emit_expression(lhs)?;
        if is_and {
            self.build_jmpz(short_label, lhs_value);
        } else {
            self.build_jmpnz(short_label, lhs_value);
        }
        self.free_value(lhs_value);

        let rhs_value = self.emit_expression(rhs)?;
        if is_and {
            self.build_jmpz(short_label, rhs_value);
        } else {
            self.build_jmpnz(short_label, rhs_value);
        }
        self.free_value(rhs_value);

        // Fallthrough: every operand passed. The short label holds the
        // decided value.
        let fall = if is_and { self.imm_one() } else { self.imm_zero() };
        self.build_move(fall, res);
        self.build_jmp(end_label);

        self.build_label(short_label);
        let short = if is_and { self.imm_zero() } else { self.imm_one() };
        self.build_move(short, res);

        self.build_label(end_label);
        Ok(res)
    }

    /// `cond ? lhs : rhs`: a result temp typed like the LHS, `jmpz`
    /// over the then-move to an `Else` label, an `End` label joining.
    fn emit_ternary(
        &mut self,
        cond: &Expr,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<ValueId, LowerError> {
        let cond_value = self.emit_expression(cond)?;
        let lhs_value = self.emit_expression(lhs)?;
        let rhs_value = self.emit_expression(rhs)?;

        let res_ty = self.module.value(lhs_value).ty();
        let res = self.alloc_temp(res_ty);

        let else_label = self.add_label(LabelKind::Else);
        let end_label = self.add_label(LabelKind::End);

        self.build_jmpz(else_label, cond_value);

        self.build_move(lhs_value, res);
        self.build_jmp(end_label);

        self.build_label(else_label);
        self.build_move(rhs_value, res);

        self.build_label(end_label);

        self.free_value(cond_value);
        self.free_value(lhs_value);
        self.free_value(rhs_value);

        Ok(res)
    }

    /// `=` stores the RHS; compound forms load the LHS, apply the base
    /// operator, and store the combined value. The expression's value
    /// is the stored one.
    fn emit_assignment(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<ValueId, LowerError> {
        let rhs_value = self.emit_expression(rhs)?;
        let lhs_location = self.emit_lvalue(lhs)?;

        if op == BinaryOp::Assign {
            self.build_store(rhs_value, lhs_location);
            self.free_value(lhs_location);
            return Ok(rhs_value);
        }

        let Some(base) = op.compound_base() else {
            return Err(LowerError::Unexpected {
                what: "assignment with a non-assignment operator",
            });
        };
        let lhs_value = self.build_load(lhs_location);
        let res = self.build_binary_operation(lhs_value, rhs_value, base)?;
        self.build_store(res, lhs_location);

        self.free_value(lhs_value);
        self.free_value(lhs_location);
        self.free_value(rhs_value);

        Ok(res)
    }

    /// Evaluate an expression for its effect only. Lvalue nodes have
    /// no effect beyond their subexpressions; rvalue results are freed
    /// immediately.
    pub(crate) fn emit_void_expression(&mut self, expr: &Expr) -> Result<(), LowerError> {
        if expr.is_lvalue() {
            self.emit_lvalue(expr)?;
            return Ok(());
        }
        let value = self.emit_expression(expr)?;
        self.free_value(value);
        Ok(())
    }
}
