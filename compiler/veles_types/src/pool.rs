//! Unified type pool.
//!
//! Stores every type as a tagged item plus (for composites) a slice of
//! the shared `extra` array. Hash-based deduplication guarantees each
//! unique type exists exactly once, so an [`Idx`] comparison is a type
//! equality test.
//!
//! Layout of `extra` per tag:
//! - `Pointer`: none (element index lives in the item data)
//! - `Array`: `[element, length]` (`length == u32::MAX` for unsized)
//! - `Structure`: `[member_count, member...]`
//! - `Function`: `[return, param_count, param...]`

use rustc_hash::FxHashMap;

use crate::Idx;

/// Array length marker for arrays of statically unknown extent.
const UNSIZED: u32 = u32::MAX;

/// Classification tag of a pool item.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Tag {
    Void,
    Int,
    Float,
    Bool,
    Char,
    Pointer,
    Array,
    Structure,
    Function,
}

#[derive(Copy, Clone)]
struct Item {
    tag: Tag,
    /// Element index (`Pointer`) or offset into `extra` (other composites).
    data: u32,
}

/// Dedup key for composite types.
#[derive(PartialEq, Eq, Hash)]
enum Key {
    Pointer(Idx),
    Array { element: Idx, len: u32 },
    Structure(Vec<Idx>),
    Function { ret: Idx, params: Vec<Idx> },
}

/// The unified type pool.
///
/// Created with the primitives pre-interned; composite types are added
/// through the `pointer_to`/`array_of`/`structure`/`function`
/// constructors, which deduplicate structurally.
pub struct Pool {
    items: Vec<Item>,
    extra: Vec<u32>,
    intern: FxHashMap<Key, Idx>,
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool {
    /// Create a pool with all primitive types pre-interned at their
    /// fixed [`Idx`] constants.
    pub fn new() -> Self {
        let mut pool = Self {
            items: Vec::with_capacity(64),
            extra: Vec::new(),
            intern: FxHashMap::default(),
        };
        for tag in [Tag::Void, Tag::Int, Tag::Float, Tag::Bool, Tag::Char] {
            pool.items.push(Item { tag, data: 0 });
        }
        // Idx::STR is an unsized character array, pre-interned so string
        // literals have a type without consulting the intern map.
        let str_idx = pool.array_of(Idx::CHAR, None);
        debug_assert!(str_idx == Idx::STR);
        pool
    }

    fn push(&mut self, item: Item) -> Idx {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "type indices never exceed u32"
        )]
        let idx = Idx::from_raw(self.items.len() as u32);
        self.items.push(item);
        idx
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "extra offsets never exceed u32"
    )]
    fn push_extra(&mut self, words: &[u32]) -> u32 {
        let offset = self.extra.len() as u32;
        self.extra.extend_from_slice(words);
        offset
    }

    // ── Constructors ───────────────────────────────────────────────

    /// Intern a pointer type.
    pub fn pointer_to(&mut self, element: Idx) -> Idx {
        if let Some(&idx) = self.intern.get(&Key::Pointer(element)) {
            return idx;
        }
        let idx = self.push(Item {
            tag: Tag::Pointer,
            data: element.raw(),
        });
        self.intern.insert(Key::Pointer(element), idx);
        idx
    }

    /// Intern an array type. `len` of `None` means unsized.
    pub fn array_of(&mut self, element: Idx, len: Option<u32>) -> Idx {
        let raw_len = len.unwrap_or(UNSIZED);
        let key = Key::Array {
            element,
            len: raw_len,
        };
        if let Some(&idx) = self.intern.get(&key) {
            return idx;
        }
        let data = self.push_extra(&[element.raw(), raw_len]);
        let idx = self.push(Item {
            tag: Tag::Array,
            data,
        });
        self.intern.insert(key, idx);
        idx
    }

    /// Intern a structure type from its member types, in declaration order.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "member counts never exceed u32"
    )]
    pub fn structure(&mut self, members: &[Idx]) -> Idx {
        let key = Key::Structure(members.to_vec());
        if let Some(&idx) = self.intern.get(&key) {
            return idx;
        }
        let mut words = Vec::with_capacity(members.len() + 1);
        words.push(members.len() as u32);
        words.extend(members.iter().map(|m| m.raw()));
        let data = self.push_extra(&words);
        let idx = self.push(Item {
            tag: Tag::Structure,
            data,
        });
        self.intern.insert(key, idx);
        idx
    }

    /// Intern a function type from its return type and parameter types.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "parameter counts never exceed u32"
    )]
    pub fn function(&mut self, ret: Idx, params: &[Idx]) -> Idx {
        let key = Key::Function {
            ret,
            params: params.to_vec(),
        };
        if let Some(&idx) = self.intern.get(&key) {
            return idx;
        }
        let mut words = Vec::with_capacity(params.len() + 2);
        words.push(ret.raw());
        words.push(params.len() as u32);
        words.extend(params.iter().map(|p| p.raw()));
        let data = self.push_extra(&words);
        let idx = self.push(Item {
            tag: Tag::Function,
            data,
        });
        self.intern.insert(key, idx);
        idx
    }

    // ── Classification ─────────────────────────────────────────────

    /// Tag of a type.
    pub fn tag(&self, idx: Idx) -> Tag {
        self.items[idx.index()].tag
    }

    /// Integer classification: `int`, `char` and `bool` all lower to
    /// integer arithmetic.
    pub fn is_integer(&self, idx: Idx) -> bool {
        matches!(self.tag(idx), Tag::Int | Tag::Char | Tag::Bool)
    }

    /// Floating classification.
    pub fn is_floating(&self, idx: Idx) -> bool {
        self.tag(idx) == Tag::Float
    }

    /// `void` check.
    pub fn is_void(&self, idx: Idx) -> bool {
        self.tag(idx) == Tag::Void
    }

    /// Pointer check.
    pub fn is_pointer(&self, idx: Idx) -> bool {
        self.tag(idx) == Tag::Pointer
    }

    /// Array check.
    pub fn is_array(&self, idx: Idx) -> bool {
        self.tag(idx) == Tag::Array
    }

    /// Structure check.
    pub fn is_structure(&self, idx: Idx) -> bool {
        self.tag(idx) == Tag::Structure
    }

    /// Function check.
    pub fn is_function(&self, idx: Idx) -> bool {
        self.tag(idx) == Tag::Function
    }

    // ── Measurement ────────────────────────────────────────────────

    /// Size of a type in machine words.
    ///
    /// Scalars, pointers and unsized arrays occupy one word; sized
    /// arrays and structures are the sum of their parts. `void` is
    /// zero-sized.
    pub fn size_in_words(&self, idx: Idx) -> u32 {
        let item = self.items[idx.index()];
        match item.tag {
            Tag::Void => 0,
            Tag::Int | Tag::Float | Tag::Bool | Tag::Char | Tag::Pointer | Tag::Function => 1,
            Tag::Array => {
                let element = Idx::from_raw(self.extra[item.data as usize]);
                let len = self.extra[item.data as usize + 1];
                if len == UNSIZED {
                    1
                } else {
                    len * self.size_in_words(element)
                }
            }
            Tag::Structure => {
                let count = self.extra[item.data as usize] as usize;
                let base = item.data as usize + 1;
                (0..count)
                    .map(|i| self.size_in_words(Idx::from_raw(self.extra[base + i])))
                    .sum()
            }
        }
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// Element type of a pointer.
    pub fn pointer_element(&self, idx: Idx) -> Idx {
        let item = self.items[idx.index()];
        debug_assert!(item.tag == Tag::Pointer);
        Idx::from_raw(item.data)
    }

    /// Element type of an array.
    pub fn array_element(&self, idx: Idx) -> Idx {
        let item = self.items[idx.index()];
        debug_assert!(item.tag == Tag::Array);
        Idx::from_raw(self.extra[item.data as usize])
    }

    /// Member count of a structure.
    pub fn structure_member_count(&self, idx: Idx) -> u32 {
        let item = self.items[idx.index()];
        debug_assert!(item.tag == Tag::Structure);
        self.extra[item.data as usize]
    }

    /// Type of the `n`-th structure member.
    pub fn structure_member_type(&self, idx: Idx, n: u32) -> Idx {
        let item = self.items[idx.index()];
        debug_assert!(item.tag == Tag::Structure);
        debug_assert!(n < self.extra[item.data as usize]);
        Idx::from_raw(self.extra[item.data as usize + 1 + n as usize])
    }

    /// Return type of a function.
    pub fn function_return_type(&self, idx: Idx) -> Idx {
        let item = self.items[idx.index()];
        debug_assert!(item.tag == Tag::Function);
        Idx::from_raw(self.extra[item.data as usize])
    }

    /// Parameter count of a function.
    pub fn function_param_count(&self, idx: Idx) -> u32 {
        let item = self.items[idx.index()];
        debug_assert!(item.tag == Tag::Function);
        self.extra[item.data as usize + 1]
    }

    /// Type of the `n`-th function parameter.
    pub fn function_param_type(&self, idx: Idx, n: u32) -> Idx {
        let item = self.items[idx.index()];
        debug_assert!(item.tag == Tag::Function);
        debug_assert!(n < self.extra[item.data as usize + 1]);
        Idx::from_raw(self.extra[item.data as usize + 2 + n as usize])
    }
}
