//! Middle end of the Veles compiler.
//!
//! This crate provides:
//!
//! - **The IR data model** ([`Module`], [`Function`], [`Block`],
//!   [`Instr`], [`Value`]) — a linear three-address form: functions of
//!   ordered basic blocks, labels as instructions, operands as handles
//!   into a module-wide value pool with deduplicated constants.
//!
//! - **The builder** ([`Builder`], [`lower_unit`]) — recursive descent
//!   over the typed AST producing module contents, with the
//!   rvalue/lvalue split, short-circuit and relational materialisation,
//!   and loop/switch target tracking.
//!
//! - **Local analysis and optimisation** ([`annotate_next_use`],
//!   [`optimize_module`]) — per-block next-use annotation walking
//!   instructions in reverse, and a value-numbering DAG that collapses
//!   redundant computations and drops dead values.
//!
//! - **The generator driver** ([`generate`], [`Backend`]) — walks the
//!   module and dispatches each instruction to one callback per
//!   operand-shape class, with operands decoded to the
//!   [`Rvalue`]/[`Lvalue`] surface.
//!
//! # Pipeline
//!
//! A compilation is strictly sequential: build, then optimise, then
//! generate. The module is exclusively owned by the builder and the
//! optimiser in their phases; the driver only ever reads it. Nothing
//! here blocks or yields, and independent modules can be processed by
//! independent workers sharing no state.
//!
//! # Crate dependencies
//!
//! `veles_ir` reads the typed tree from `veles_ast` and answers type
//! queries through `veles_types`. No back end is linked; back ends
//! implement [`Backend`] and receive callbacks.

pub mod build;
pub mod dag;
pub mod dump;
pub mod gen;
pub mod ir;
pub mod module;
pub mod next_use;

pub use build::{lower_unit, Builder, LowerError};
pub use dag::{optimize_block, optimize_function, optimize_module, UseSet};
pub use dump::dump_module;
pub use gen::{generate, Backend, ExternData, FunctionData, GlobalData, Lvalue, Rvalue};
pub use ir::{
    Block, BlockId, Extern, FormatClass, FuncId, Function, Global, Instr, Label, LabelId,
    LabelKind, Opcode, Operand, Value, ValueId, WORD_SIZE,
};
pub use module::Module;
pub use next_use::{annotate_next_use, InstrNextUse};

#[cfg(test)]
mod test_helpers;
#[cfg(test)]
mod tests;
