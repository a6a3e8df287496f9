//! Type system for the Veles compiler.
//!
//! All types live in a unified [`Pool`] and are referenced by 32-bit
//! [`Idx`] handles. Primitive types are pre-interned at fixed indices,
//! composite types (pointers, arrays, structures, functions) are
//! deduplicated structurally, so type equality is an O(1) index
//! comparison everywhere else in the compiler.
//!
//! The query surface is what the middle end needs: classification
//! predicates (`is_integer`, `is_floating`, ...), sizes in machine
//! words, and element/member/parameter accessors.

mod idx;
mod pool;

pub use idx::Idx;
pub use pool::{Pool, Tag};
