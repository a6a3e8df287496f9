//! Typed AST and syntax context for the Veles compiler.
//!
//! The parser produces a fully typed tree: every expression node carries
//! the [`Idx`](veles_types::Idx) of its type, and every identifier has
//! been resolved to an [`IdentId`] registered in the [`SyntaxContext`].
//! The middle end consumes this tree read-only.
//!
//! Node taxonomies are plain tagged enums, one per syntactic level
//! ([`Decl`], [`Stmt`], [`ExprKind`]), discriminated by `match`.

mod ast;
mod context;
mod ids;

pub use ast::{BinaryOp, Decl, Expr, ExprKind, Literal, Stmt, TranslationUnit, UnaryOp};
pub use context::SyntaxContext;
pub use ids::{IdentId, StringId};
