//! Statement lowering.
//!
//! Control-flow statements allocate labels, thread the active
//! `break`/`continue` targets through the builder, and place bodies
//! between them. Label placement follows the source shape directly;
//! no later pass reorders blocks.

use veles_ast::Stmt;

use crate::ir::{LabelId, LabelKind};

use super::{Builder, LowerError};

impl Builder<'_> {
    pub(crate) fn emit_statement(&mut self, stmt: &Stmt) -> Result<(), LowerError> {
        match stmt {
            Stmt::Declaration(decls) => {
                for decl in decls {
                    self.emit_declaration(decl)?;
                }
                Ok(())
            }
            Stmt::Compound(stmts) => {
                for sub in stmts {
                    self.emit_statement(sub)?;
                }
                Ok(())
            }
            Stmt::Expr(expr) => self.emit_void_expression(expr),
            Stmt::Null => Ok(()),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => self.emit_if(cond, then_branch, else_branch.as_deref()),
            Stmt::Switch { cond, body } => self.emit_switch(cond, body),
            Stmt::While { cond, body } => self.emit_while(cond, body),
            Stmt::Do { body, cond } => self.emit_do(body, cond),
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => self.emit_for(init.as_deref(), cond.as_ref(), step.as_deref(), body),
            // Case and default arms only make sense inside a switch
            // body, where emit_switch consumes them directly.
            Stmt::Case { .. } | Stmt::Default { .. } => Err(LowerError::Unexpected {
                what: "case arm outside a switch body",
            }),
            Stmt::Continue => match self.continue_label {
                Some(label) => {
                    self.build_jmp(label);
                    Ok(())
                }
                None => Err(LowerError::Unexpected {
                    what: "continue outside a loop",
                }),
            },
            Stmt::Break => match self.break_label {
                Some(label) => {
                    self.build_jmp(label);
                    Ok(())
                }
                None => Err(LowerError::Unexpected {
                    what: "break outside a loop or switch",
                }),
            },
            Stmt::Return(expr) => self.emit_return(expr.as_ref()),
        }
    }

    /// `if`: `jmpz` past the then-arm. The `Else` label exists only
    /// when there is an else-arm; a single-arm `if` jumps straight to
    /// `End`.
    fn emit_if(
        &mut self,
        cond: &veles_ast::Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> Result<(), LowerError> {
        let end_label = self.add_label(LabelKind::End);
        let cond_value = self.emit_expression(cond)?;

        match else_branch {
            Some(else_branch) => {
                let else_label = self.add_label(LabelKind::Else);
                self.build_jmpz(else_label, cond_value);
                self.free_value(cond_value);

                self.emit_statement(then_branch)?;
                self.build_jmp(end_label);

                self.build_label(else_label);
                self.emit_statement(else_branch)?;
            }
            None => {
                self.build_jmpz(end_label, cond_value);
                self.free_value(cond_value);
                self.emit_statement(then_branch)?;
            }
        }

        self.build_label(end_label);
        Ok(())
    }

    fn emit_while(&mut self, cond: &veles_ast::Expr, body: &Stmt) -> Result<(), LowerError> {
        let begin_label = self.add_label(LabelKind::BeginCycle);
        let end_label = self.add_label(LabelKind::End);

        let saved = self.enter_loop(begin_label, end_label);

        self.build_label(begin_label);
        let cond_value = self.emit_expression(cond)?;
        self.build_jmpnz(end_label, cond_value);
        self.free_value(cond_value);

        self.emit_statement(body)?;
        self.build_jmp(begin_label);
        self.build_label(end_label);

        self.leave_loop(saved);
        Ok(())
    }

    /// `do`: the body runs before the first condition test, so an
    /// always-false condition still executes it once. `continue`
    /// targets the `Next` label in front of the condition.
    fn emit_do(&mut self, body: &Stmt, cond: &veles_ast::Expr) -> Result<(), LowerError> {
        let begin_label = self.add_label(LabelKind::BeginCycle);
        self.build_label(begin_label);

        let next_label = self.add_label(LabelKind::Next);
        let end_label = self.add_label(LabelKind::End);

        let saved = self.enter_loop(next_label, end_label);

        self.emit_statement(body)?;
        self.build_label(next_label);

        let cond_value = self.emit_expression(cond)?;
        self.build_jmpnz(begin_label, cond_value);
        self.free_value(cond_value);

        self.build_label(end_label);

        self.leave_loop(saved);
        Ok(())
    }

    fn emit_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&veles_ast::Expr>,
        step: Option<&Stmt>,
        body: &Stmt,
    ) -> Result<(), LowerError> {
        if let Some(init) = init {
            self.emit_statement(init)?;
        }

        let begin_label = self.add_label(LabelKind::Begin);
        let end_label = self.add_label(LabelKind::End);

        let saved = self.enter_loop(begin_label, end_label);

        self.build_label(begin_label);

        if let Some(cond) = cond {
            let cond_value = self.emit_expression(cond)?;
            self.build_jmpnz(end_label, cond_value);
            self.free_value(cond_value);
        }

        self.emit_statement(body)?;

        if let Some(step) = step {
            self.emit_statement(step)?;
        }

        self.build_jmp(begin_label);
        self.build_label(end_label);

        self.leave_loop(saved);
        Ok(())
    }

    /// `switch`: one pass over the arms emits the dispatch chain (an
    /// equality test and `jmpnz` per `case`), then a jump to the
    /// default arm or past the switch, then a second pass places each
    /// arm's label and body. Fall-through comes from label placement
    /// following the scanning order.
    fn emit_switch(&mut self, cond: &veles_ast::Expr, body: &Stmt) -> Result<(), LowerError> {
        let Stmt::Compound(items) = body else {
            return Err(LowerError::Unexpected {
                what: "switch body is not a compound statement",
            });
        };

        let cond_value = self.emit_expression(cond)?;

        let end_label = self.add_label(LabelKind::End);
        let saved_break = self.break_label.replace(end_label);

        // Dispatch chain. Arm labels are recorded positionally so the
        // body pass below stays aligned with the arm list.
        let mut arm_labels: Vec<Option<LabelId>> = Vec::with_capacity(items.len());
        let mut default_label = None;
        for item in items {
            match item {
                Stmt::Case { expr, .. } => {
                    let case_label = self.add_label(LabelKind::Case);
                    arm_labels.push(Some(case_label));

                    let case_value = self.emit_expression(expr)?;
                    let matched =
                        self.build_binary_operation(cond_value, case_value, veles_ast::BinaryOp::Eq)?;
                    self.free_value(case_value);
                    self.build_jmpnz(case_label, matched);
                    self.free_value(matched);
                }
                Stmt::Default { .. } => {
                    let label = self.add_label(LabelKind::Case);
                    default_label = Some(label);
                    arm_labels.push(Some(label));
                }
                _ => arm_labels.push(None),
            }
        }

        // No arm matched: take default if present, otherwise skip the
        // whole body.
        match default_label {
            Some(label) => self.build_jmp(label),
            None => self.build_jmp(end_label),
        }
        self.free_value(cond_value);

        // Arm bodies, in source order.
        for (item, label) in items.iter().zip(&arm_labels) {
            match item {
                Stmt::Case { body, .. } | Stmt::Default { body } => {
                    if let Some(label) = *label {
                        self.build_label(label);
                    }
                    self.emit_statement(body)?;
                }
                other => self.emit_statement(other)?,
            }
        }

        self.build_label(end_label);
        self.break_label = saved_break;
        Ok(())
    }

    fn emit_return(&mut self, expr: Option<&veles_ast::Expr>) -> Result<(), LowerError> {
        match expr {
            Some(expr) => {
                let value = self.emit_expression(expr)?;
                self.build_ret(Some(value));
                self.free_value(value);
            }
            None => self.build_ret(None),
        }
        Ok(())
    }

    // ── Loop target bookkeeping ────────────────────────────────────

    fn enter_loop(
        &mut self,
        continue_label: LabelId,
        break_label: LabelId,
    ) -> (Option<LabelId>, Option<LabelId>) {
        let saved = (self.continue_label, self.break_label);
        self.continue_label = Some(continue_label);
        self.break_label = Some(break_label);
        saved
    }

    fn leave_loop(&mut self, saved: (Option<LabelId>, Option<LabelId>)) {
        self.continue_label = saved.0;
        self.break_label = saved.1;
    }
}
