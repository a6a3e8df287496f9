//! Three-address IR data model.
//!
//! The IR is a linearised control-flow form: a [`Module`](crate::Module)
//! holds functions, a [`Function`] holds an ordered list of basic
//! [`Block`]s, and a block holds [`Instr`]uctions. Labels are ordinary
//! instructions (`Opcode::Label`) rather than block headers, which keeps
//! dumping and generation uniform; successor edges can be recomputed
//! from label/jump pairs whenever a later pass needs them.
//!
//! Operands are [`ValueId`] handles into the module's value pool. Every
//! opcode has exactly one [`FormatClass`] describing which operand slots
//! are rvalues, lvalues, labels, sizes or function references; the
//! class table is the single source of truth shared by the dump, the
//! next-use analysis and the generator driver.

use std::fmt;

use veles_ast::{IdentId, StringId};
use veles_types::Idx;

/// Number of bytes in one machine word. Frame displacements are in
/// bytes; type sizes come from the pool in words.
pub const WORD_SIZE: u32 = 4;

// ── ID newtypes ─────────────────────────────────────────────────────

/// Value ID: an index into the module's value pool.
///
/// Identity is stable for the lifetime of the module; constants are
/// deduplicated so equal payloads share one id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct ValueId(u32);

impl ValueId {
    /// Create a new value ID from a raw index.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into the pool).
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Label ID: an index into the module's label list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct LabelId(u32);

impl LabelId {
    /// Create a new label ID from a raw index.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize`.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Block ID within a function (index into `Function::blocks`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    /// Create a new block ID from a raw index.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize`.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Function ID within a module (index into the function list).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct FuncId(u32);

impl FuncId {
    /// Create a new function ID from a raw index.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize`.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

// ── Labels ──────────────────────────────────────────────────────────

/// Label kind. Kinds carry no semantics beyond naming the control-flow
/// construct that allocated the label; they make dumps readable and
/// keep nested constructs apart while lowering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum LabelKind {
    Begin,
    Then,
    Else,
    End,
    BeginCycle,
    Next,
    And,
    Or,
    Case,
}

impl LabelKind {
    /// Dump spelling of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            LabelKind::Begin => "BEGIN",
            LabelKind::Then => "THEN",
            LabelKind::Else => "ELSE",
            LabelKind::End => "END",
            LabelKind::BeginCycle => "BEGIN_CYCLE",
            LabelKind::Next => "NEXT",
            LabelKind::And => "AND",
            LabelKind::Or => "OR",
            LabelKind::Case => "CASE",
        }
    }
}

/// A jump target: a kind plus a module-unique numeric id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Label {
    pub kind: LabelKind,
    pub id: u32,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.as_str(), self.id)
    }
}

// ── Values ──────────────────────────────────────────────────────────

/// A value in the module pool.
///
/// Constants are module-global and deduplicated; `Param`, `Local` and
/// `InstrResult` are function-local. Displacements are in bytes.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Immediate integer.
    ConstInt(i64),
    /// Immediate floating.
    ConstFloat(f64),
    /// String literal, by id in the syntax context's literal pool.
    ConstString(StringId),
    /// Function parameter slot, with an optional displacement for
    /// aggregate fields.
    Param {
        ty: Idx,
        index: u32,
        displ: Option<u32>,
    },
    /// Stack slot at a byte offset within the frame.
    Local { ty: Idx, displ: u32 },
    /// Named global, with an optional displacement.
    Global {
        ident: IdentId,
        ty: Idx,
        displ: Option<u32>,
    },
    /// Result of a concrete instruction. `block`/`index` record where
    /// the producing instruction was appended; `temp` is the small
    /// reusable temp number shown as `%N` in dumps.
    InstrResult {
        ty: Idx,
        block: BlockId,
        index: u32,
        temp: u32,
    },
}

impl Value {
    /// The value's type. Constants have their implicit primitive type.
    pub fn ty(&self) -> Idx {
        match *self {
            Value::ConstInt(_) => Idx::INT,
            Value::ConstFloat(_) => Idx::FLOAT,
            Value::ConstString(_) => Idx::STR,
            Value::Param { ty, .. }
            | Value::Local { ty, .. }
            | Value::Global { ty, .. }
            | Value::InstrResult { ty, .. } => ty,
        }
    }

    /// Whether this is one of the deduplicated constant variants.
    pub fn is_const(&self) -> bool {
        matches!(
            self,
            Value::ConstInt(_) | Value::ConstFloat(_) | Value::ConstString(_)
        )
    }
}

// ── Instructions ────────────────────────────────────────────────────

/// Instruction code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Opcode {
    Nop,
    Label,
    Move,
    Store,
    Load,
    Alloca,
    Ptr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Fadd,
    Fsub,
    Fmul,
    Fdiv,
    Jmp,
    Jmpz,
    Jmpnz,
    Jmpeq,
    Jmplt,
    Jmple,
    Itof,
    Ftoi,
    Slt,
    Push,
    Call,
    Ret,
}

/// Operand-shape class of an opcode.
///
/// Letters name the slots in order: `R` rvalue, `L` lvalue, `S` size,
/// `B` label (branch target), `F` function reference, `N` unused. The
/// trailing result slot is implied by classes ending in `R`/`L`
/// (`Rr`, `Rrr`, `Lr`, `Sl`, `Fr`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum FormatClass {
    /// No operands: `nop`.
    N,
    /// One rvalue read: `push`, `ret`.
    Rn,
    /// One rvalue read, one result: `itof`, `ftoi`.
    Rr,
    /// Two rvalue reads: `move`.
    Rrn,
    /// Two rvalue reads, one result: arithmetic, `ptr`.
    Rrr,
    /// One lvalue read, one result: `load`.
    Lr,
    /// One rvalue read, one lvalue written: `store`.
    Rln,
    /// One size, one lvalue result: `alloca`.
    Sl,
    /// One label: `label`, `jmp`.
    Bn,
    /// One label, one rvalue read: `jmpz`, `jmpnz`.
    Brn,
    /// One label, two rvalue reads: `jmpeq`, `jmplt`, `jmple`.
    Brrn,
    /// One function reference, one result: `call`.
    Fr,
}

impl FormatClass {
    /// Operand slots read as values (rvalue, lvalue or size slots, in
    /// that order within `Instr::ops`).
    pub fn read_slots(self) -> &'static [usize] {
        match self {
            FormatClass::N | FormatClass::Bn | FormatClass::Fr => &[],
            FormatClass::Rn | FormatClass::Rr | FormatClass::Lr | FormatClass::Sl => &[0],
            FormatClass::Rrn | FormatClass::Rrr | FormatClass::Rln => &[0, 1],
            FormatClass::Brn => &[1],
            FormatClass::Brrn => &[1, 2],
        }
    }

    /// Whether instructions of this class define a result value.
    pub fn writes_result(self) -> bool {
        matches!(
            self,
            FormatClass::Rr | FormatClass::Rrr | FormatClass::Lr | FormatClass::Sl | FormatClass::Fr
        )
    }
}

impl Opcode {
    /// Total opcode → format-class mapping.
    pub fn format_class(self) -> FormatClass {
        match self {
            Opcode::Nop => FormatClass::N,
            Opcode::Label | Opcode::Jmp => FormatClass::Bn,
            Opcode::Move => FormatClass::Rrn,
            Opcode::Store => FormatClass::Rln,
            Opcode::Load => FormatClass::Lr,
            Opcode::Alloca => FormatClass::Sl,
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::Shl
            | Opcode::Shr
            | Opcode::Fadd
            | Opcode::Fsub
            | Opcode::Fmul
            | Opcode::Fdiv
            | Opcode::Ptr
            | Opcode::Slt => FormatClass::Rrr,
            Opcode::Jmpz | Opcode::Jmpnz => FormatClass::Brn,
            Opcode::Jmpeq | Opcode::Jmplt | Opcode::Jmple => FormatClass::Brrn,
            Opcode::Itof | Opcode::Ftoi => FormatClass::Rr,
            Opcode::Push | Opcode::Ret => FormatClass::Rn,
            Opcode::Call => FormatClass::Fr,
        }
    }

    /// Dump spelling.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::Label => "label",
            Opcode::Move => "move",
            Opcode::Store => "store",
            Opcode::Load => "load",
            Opcode::Alloca => "alloca",
            Opcode::Ptr => "ptr",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Mod => "mod",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Shl => "shl",
            Opcode::Shr => "shr",
            Opcode::Fadd => "fadd",
            Opcode::Fsub => "fsub",
            Opcode::Fmul => "fmul",
            Opcode::Fdiv => "fdiv",
            Opcode::Jmp => "jmp",
            Opcode::Jmpz => "jmpz",
            Opcode::Jmpnz => "jmpnz",
            Opcode::Jmpeq => "jmpeq",
            Opcode::Jmplt => "jmplt",
            Opcode::Jmple => "jmple",
            Opcode::Itof => "itof",
            Opcode::Ftoi => "ftoi",
            Opcode::Slt => "slt",
            Opcode::Push => "push",
            Opcode::Call => "call",
            Opcode::Ret => "ret",
        }
    }

    /// Whether the local optimiser may merge two occurrences of this
    /// opcode with identical operands. Side-effecting and control-flow
    /// opcodes are never merged; neither is `move`, whose destination
    /// is an already-allocated temp rather than a fresh result.
    pub fn is_value_numberable(self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::And
                | Opcode::Or
                | Opcode::Xor
                | Opcode::Shl
                | Opcode::Shr
                | Opcode::Fadd
                | Opcode::Fsub
                | Opcode::Fmul
                | Opcode::Fdiv
                | Opcode::Itof
                | Opcode::Ftoi
                | Opcode::Load
                | Opcode::Ptr
                | Opcode::Slt
        )
    }

    /// Whether emitting this instruction ends the current block: every
    /// jump and `call` does (a call transfers control out and back).
    pub fn ends_block(self) -> bool {
        matches!(
            self,
            Opcode::Jmp
                | Opcode::Jmpz
                | Opcode::Jmpnz
                | Opcode::Jmpeq
                | Opcode::Jmplt
                | Opcode::Jmple
                | Opcode::Call
        )
    }
}

/// One operand slot of an instruction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Operand {
    /// Unused slot.
    #[default]
    None,
    /// A value-pool reference (rvalue, lvalue or size, per class).
    Value(ValueId),
    /// A branch target.
    Label(LabelId),
    /// A callee, by identifier (defined functions and externs alike).
    Func(IdentId),
}

impl Operand {
    /// The value id, if this slot holds one.
    pub fn as_value(self) -> Option<ValueId> {
        match self {
            Operand::Value(id) => Some(id),
            _ => None,
        }
    }

    /// The label id, if this slot holds one.
    pub fn as_label(self) -> Option<LabelId> {
        match self {
            Operand::Label(id) => Some(id),
            _ => None,
        }
    }
}

/// A single three-address instruction.
///
/// Up to three operand slots, interpreted per the opcode's
/// [`FormatClass`], plus a result value for classes that produce one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Instr {
    pub op: Opcode,
    pub ops: [Operand; 3],
    pub res: Option<ValueId>,
}

impl Instr {
    /// Build an instruction with no result.
    pub fn new(op: Opcode, ops: [Operand; 3]) -> Self {
        debug_assert!(!op.format_class().writes_result());
        Self { op, ops, res: None }
    }

    /// Build an instruction carrying a result value.
    pub fn with_res(op: Opcode, ops: [Operand; 3], res: ValueId) -> Self {
        debug_assert!(op.format_class().writes_result());
        Self {
            op,
            ops,
            res: Some(res),
        }
    }
}

// ── Blocks and functions ────────────────────────────────────────────

/// A basic block: an ordered instruction sequence, by convention ended
/// by a control-transfer instruction.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    pub instrs: Vec<Instr>,
}

impl Block {
    /// Create an empty block.
    pub fn new() -> Self {
        Self::default()
    }
}

/// A function: metadata plus the ordered block list. The first block is
/// the entry.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Function {
    pub ident: IdentId,
    pub ty: Idx,
    pub param_count: u32,
    /// False iff the body contains a `call`.
    pub is_leaf: bool,
    /// Bytes reserved on the frame by `alloca`s; only grows.
    pub local_size: u32,
    /// Peak argument count across all calls in the body.
    pub max_call_arguments: u32,
    pub blocks: Vec<Block>,
}

impl Function {
    /// Create a function with an empty entry block.
    pub fn new(ident: IdentId, ty: Idx, param_count: u32) -> Self {
        Self {
            ident,
            ty,
            param_count,
            is_leaf: true,
            local_size: 0,
            max_call_arguments: 0,
            blocks: vec![Block::new()],
        }
    }
}

/// An external declaration: identifier and type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Extern {
    pub ident: IdentId,
    pub ty: Idx,
}

/// A global definition: identifier, type, optional initial value
/// (a constant in the value pool).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Global {
    pub ident: IdentId,
    pub ty: Idx,
    pub init: Option<ValueId>,
}

#[cfg(test)]
mod tests;
