//! Deterministic hash-based type identity.
//!
//! [`TypeHash`] is the type descriptor key shared by the registry, the object
//! heap and every handle. It is computed from the script-visible name, so the
//! same name always maps to the same descriptor regardless of registration
//! order.
//!
//! # Examples
//!
//! ```
//! use rco_core::TypeHash;
//!
//! let horse = TypeHash::from_name("Horse");
//! assert_eq!(horse, TypeHash::from_name("Horse"));
//! assert_ne!(horse, TypeHash::from_name("Dog"));
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
///
/// Types and behavior declarations share one hash space; the domain markers
/// keep a type named `f` apart from a behavior declared as `f`.
pub mod hash_constants {
    /// Separator constant for chained components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for behavior and method declarations.
    pub const BEHAVIOR: u64 = 0x7d3c8b4a92e15f6d;
}

/// A deterministic 64-bit hash identifying a registered type or one of its
/// declared behaviors.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash. A null handle reports this as its type.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a qualified type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create the hash of a behavior or method declaration owned by `owner`.
    ///
    /// The declaration string is hashed verbatim, so `"void f()"` and
    /// `"void f(int)"` are distinct behaviors.
    #[inline]
    pub fn from_behavior(owner: TypeHash, declaration: &str) -> Self {
        let decl = xxh64(declaration.as_bytes(), 0);
        TypeHash(
            (hash_constants::BEHAVIOR ^ owner.0)
                .wrapping_mul(hash_constants::SEP)
                .wrapping_add(decl),
        )
    }

    /// Check if this is the empty hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_hash_determinism() {
        assert_eq!(TypeHash::from_name("Horse"), TypeHash::from_name("Horse"));
    }

    #[test]
    fn type_hash_uniqueness() {
        let horse = TypeHash::from_name("Horse");
        let dog = TypeHash::from_name("Dog");
        let parrot = TypeHash::from_name("Parrot");
        assert_ne!(horse, dog);
        assert_ne!(horse, parrot);
        assert_ne!(dog, parrot);
    }

    #[test]
    fn behavior_hash_includes_owner() {
        let horse = TypeHash::from_name("Horse");
        let dog = TypeHash::from_name("Dog");
        assert_ne!(
            TypeHash::from_behavior(horse, "void f()"),
            TypeHash::from_behavior(dog, "void f()")
        );
    }

    #[test]
    fn behavior_hash_distinguishes_declarations() {
        let owner = TypeHash::from_name("RefCountingObjectHandle");
        assert_ne!(
            TypeHash::from_behavior(owner, "void f()"),
            TypeHash::from_behavior(owner, "void f(const ?&in)")
        );
    }

    #[test]
    fn behavior_and_type_domains_differ() {
        let owner = TypeHash::EMPTY;
        assert_ne!(TypeHash::from_behavior(owner, "f"), TypeHash::from_name("f"));
    }

    #[test]
    fn empty_hash() {
        assert!(TypeHash::EMPTY.is_empty());
        assert!(!TypeHash::from_name("Horse").is_empty());
        assert_eq!(TypeHash::EMPTY.as_u64(), 0);
    }

    #[test]
    fn hash_display() {
        let hash = TypeHash(0x1234);
        assert_eq!(format!("{}", hash), "0x0000000000001234");
    }

    #[test]
    fn hash_debug() {
        let hash = TypeHash(0x1234);
        assert_eq!(format!("{:?}", hash), "TypeHash(0x0000000000001234)");
    }
}
