//! Syntax context: identifier table and string-literal pool.

use rustc_hash::FxHashMap;
use veles_types::Idx;

use crate::{IdentId, StringId};

struct IdentInfo {
    spelling: String,
    ty: Idx,
}

/// Identifier table and string-literal pool for one translation unit.
///
/// Identifiers are registered by the parser in declaration order; both
/// Latin and Cyrillic spellings are plain UTF-8 strings here. String
/// literals are deduplicated, so equal literals share a [`StringId`].
#[derive(Default)]
pub struct SyntaxContext {
    idents: Vec<IdentInfo>,
    strings: Vec<String>,
    string_index: FxHashMap<String, StringId>,
}

impl SyntaxContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identifier with its declared type.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "identifier counts never exceed u32"
    )]
    pub fn declare(&mut self, spelling: impl Into<String>, ty: Idx) -> IdentId {
        let id = IdentId::new(self.idents.len() as u32);
        self.idents.push(IdentInfo {
            spelling: spelling.into(),
            ty,
        });
        id
    }

    /// Declared type of an identifier.
    pub fn ident_type(&self, id: IdentId) -> Idx {
        self.idents[id.index()].ty
    }

    /// Source spelling of an identifier.
    pub fn ident_spelling(&self, id: IdentId) -> &str {
        &self.idents[id.index()].spelling
    }

    /// Intern a string literal, returning the shared id for equal
    /// contents.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "literal counts never exceed u32"
    )]
    pub fn intern_string(&mut self, contents: impl Into<String>) -> StringId {
        let contents = contents.into();
        if let Some(&id) = self.string_index.get(&contents) {
            return id;
        }
        let id = StringId::new(self.strings.len() as u32);
        self.strings.push(contents.clone());
        self.string_index.insert(contents, id);
        id
    }

    /// Contents of a string literal.
    pub fn string(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn declare_and_query() {
        let mut sx = SyntaxContext::new();
        let a = sx.declare("счётчик", Idx::INT);
        let b = sx.declare("total", Idx::FLOAT);
        assert_eq!(sx.ident_type(a), Idx::INT);
        assert_eq!(sx.ident_spelling(a), "счётчик");
        assert_eq!(sx.ident_type(b), Idx::FLOAT);
        assert_ne!(a, b);
    }

    #[test]
    fn string_literals_are_deduplicated() {
        let mut sx = SyntaxContext::new();
        let s1 = sx.intern_string("привет");
        let s2 = sx.intern_string("привет");
        let s3 = sx.intern_string("мир");
        assert_eq!(s1, s2);
        assert_ne!(s1, s3);
        assert_eq!(sx.string(s3), "мир");
    }
}
