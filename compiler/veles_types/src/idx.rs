//! Unified type index handle.
//!
//! `Idx` is the canonical type representation: every type is stored in
//! the [`Pool`](crate::Pool) and referenced by its 32-bit index.
//! Primitive types have fixed indices so the common classification
//! queries never touch the pool.

use std::fmt;

/// A 32-bit index into the type pool.
///
/// Types are compared by index equality (O(1)), never structurally.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Idx(u32);

impl Idx {
    // Primitive types, pre-interned at pool creation.

    /// The `void` type.
    pub const VOID: Self = Self(0);
    /// The integer type (one machine word).
    pub const INT: Self = Self(1);
    /// The floating type (one machine word).
    pub const FLOAT: Self = Self(2);
    /// The boolean type.
    pub const BOOL: Self = Self(3);
    /// The character type.
    pub const CHAR: Self = Self(4);
    /// The string-literal type (an unsized character array).
    pub const STR: Self = Self(5);

    /// First index handed out for composite types.
    pub const FIRST_DYNAMIC: u32 = 6;

    /// Sentinel for "no type".
    pub const NONE: Self = Self(u32::MAX);

    /// Create an index from a raw u32 value.
    ///
    /// The caller must ensure the index is valid in the pool.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into the pool).
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Check whether this is a pre-interned primitive.
    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.0 < Self::FIRST_DYNAMIC
    }

    /// Check whether this is the NONE sentinel.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Debug for Idx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::VOID => write!(f, "Idx(void)"),
            Self::INT => write!(f, "Idx(int)"),
            Self::FLOAT => write!(f, "Idx(float)"),
            Self::BOOL => write!(f, "Idx(bool)"),
            Self::CHAR => write!(f, "Idx(char)"),
            Self::STR => write!(f, "Idx(str)"),
            Self::NONE => write!(f, "Idx(none)"),
            Self(raw) => write!(f, "Idx({raw})"),
        }
    }
}
