//! Module: the owner of every IR entity.
//!
//! A module holds the extern and global lists, the functions, the label
//! list, and the shared value pool. Constants are interned: one id per
//! `(variant, payload)` pair, with an `FxHashMap` index over the pool
//! so lookup stays O(1) as modules grow. Instruction results are never
//! deduplicated here; collapsing redundant computations is the local
//! optimiser's job.
//!
//! The module also carries the identifier → value map used to resolve
//! named references while lowering declarations and identifiers.

use rustc_hash::FxHashMap;

use veles_ast::{IdentId, StringId};

use crate::ir::{Extern, FuncId, Function, Global, Label, LabelId, LabelKind, Value, ValueId};

/// Intern key for constant values. Floats are keyed by bit pattern so
/// `-0.0` and `0.0` stay distinct and `NaN` payloads compare stably.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum ConstKey {
    Int(i64),
    Float(u64),
    Str(StringId),
}

/// An IR module under construction or inspection.
///
/// Created empty, populated by the builder, rewritten in place by the
/// optimiser, and read (never mutated) by the generator driver.
#[derive(Default)]
pub struct Module {
    externs: Vec<Extern>,
    globals: Vec<Global>,
    functions: Vec<Function>,
    values: Vec<Value>,
    labels: Vec<Label>,
    const_index: FxHashMap<ConstKey, ValueId>,
    idents: FxHashMap<IdentId, ValueId>,
}

impl Module {
    /// Create an empty module.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Value pool ─────────────────────────────────────────────────

    fn push_value(&mut self, value: Value) -> ValueId {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "value pools never exceed u32 entries"
        )]
        let id = ValueId::new(self.values.len() as u32);
        self.values.push(value);
        id
    }

    /// Intern an integer constant.
    pub fn intern_int(&mut self, value: i64) -> ValueId {
        let key = ConstKey::Int(value);
        if let Some(&id) = self.const_index.get(&key) {
            return id;
        }
        let id = self.push_value(Value::ConstInt(value));
        self.const_index.insert(key, id);
        id
    }

    /// Intern a floating constant.
    pub fn intern_float(&mut self, value: f64) -> ValueId {
        let key = ConstKey::Float(value.to_bits());
        if let Some(&id) = self.const_index.get(&key) {
            return id;
        }
        let id = self.push_value(Value::ConstFloat(value));
        self.const_index.insert(key, id);
        id
    }

    /// Intern a string-literal constant.
    pub fn intern_string(&mut self, string: StringId) -> ValueId {
        let key = ConstKey::Str(string);
        if let Some(&id) = self.const_index.get(&key) {
            return id;
        }
        let id = self.push_value(Value::ConstString(string));
        self.const_index.insert(key, id);
        id
    }

    /// Add a non-constant value (parameter, local, global reference or
    /// instruction result). Always allocates a fresh id.
    pub fn add_value(&mut self, value: Value) -> ValueId {
        debug_assert!(!value.is_const(), "constants go through the intern_* entry points");
        self.push_value(value)
    }

    /// Look up a value by id.
    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.index()]
    }

    /// Number of values in the pool.
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    // ── Labels ─────────────────────────────────────────────────────

    /// Allocate a label of the given kind with a fresh id.
    pub fn add_label(&mut self, kind: LabelKind) -> LabelId {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "label counts never exceed u32"
        )]
        let raw = self.labels.len() as u32;
        self.labels.push(Label { kind, id: raw });
        LabelId::new(raw)
    }

    /// Look up a label by id.
    pub fn label(&self, id: LabelId) -> Label {
        self.labels[id.index()]
    }

    // ── Externs and globals ────────────────────────────────────────

    /// Register an external declaration.
    pub fn add_extern(&mut self, ext: Extern) {
        self.externs.push(ext);
    }

    /// The extern list, in registration order.
    pub fn externs(&self) -> &[Extern] {
        &self.externs
    }

    /// Register a global definition.
    pub fn add_global(&mut self, global: Global) {
        self.globals.push(global);
    }

    /// The global list, in registration order.
    pub fn globals(&self) -> &[Global] {
        &self.globals
    }

    // ── Functions ──────────────────────────────────────────────────

    /// Append a function, returning its id.
    pub fn add_function(&mut self, function: Function) -> FuncId {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "function counts never exceed u32"
        )]
        let id = FuncId::new(self.functions.len() as u32);
        self.functions.push(function);
        id
    }

    /// Look up a function by id.
    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.index()]
    }

    /// Mutable access to a function.
    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id.index()]
    }

    /// The functions, in definition order.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Mutable access to all functions (used by the optimiser).
    pub fn functions_mut(&mut self) -> &mut [Function] {
        &mut self.functions
    }

    // ── Identifier resolution ──────────────────────────────────────

    /// Bind a source identifier to the value denoting its storage.
    pub fn bind_ident(&mut self, ident: IdentId, value: ValueId) {
        self.idents.insert(ident, value);
    }

    /// Resolve a source identifier to its storage value, if declared.
    pub fn ident_value(&self, ident: IdentId) -> Option<ValueId> {
        self.idents.get(&ident).copied()
    }
}

#[cfg(test)]
mod tests;
