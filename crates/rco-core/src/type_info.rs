//! Type descriptors.
//!
//! A [`TypeInfo`] is the runtime descriptor that lets type-erased code (the
//! generic handle, the collector) act on an object without knowing its
//! static type. It is created once at registration time and lives in the
//! registry for the lifetime of the engine.

use bitflags::bitflags;

use crate::{RegistrationError, TypeHash};

bitflags! {
    /// Registration flags of a type, after AngelScript's `asOBJ_*` flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeFlags: u32 {
        /// Reference type: heap allocated, reference counted.
        const REF = 1 << 0;
        /// Value type: copied on assignment.
        const VALUE = 1 << 1;
        /// Participates in cycle collection.
        const GC = 1 << 2;
        /// Value type that behaves like a handle in scripts.
        const AS_HANDLE = 1 << 3;
        /// Native class with constructor, destructor, assignment and copy constructor.
        const APP_CLASS_CDAK = 1 << 4;
    }
}

/// Whether a type is a reference type or a value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Counted, heap-allocated, shared through handles.
    Reference,
    /// Stored inline, copied on assignment.
    Value,
}

/// A registered behavior or method: its declaration and identity hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorDecl {
    /// Hash of owner + declaration.
    pub hash: TypeHash,
    /// Script-side declaration, e.g. `"Horse@ f(string name)"`.
    pub declaration: String,
}

impl BehaviorDecl {
    /// Create a declaration owned by `owner`.
    pub fn new(owner: TypeHash, declaration: impl Into<String>) -> Self {
        let declaration = declaration.into();
        Self {
            hash: TypeHash::from_behavior(owner, &declaration),
            declaration,
        }
    }
}

/// Lifecycle behaviors of a type.
///
/// Mirrors the `asBEHAVE_*` table: which behaviors exist and under which
/// declaration. The callables themselves are held by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeBehaviors {
    /// Factories - allocate and return a new instance (reference types).
    /// Corresponds to asBEHAVE_FACTORY
    pub factories: Vec<BehaviorDecl>,

    /// Constructors - initialize in place (value types).
    /// Corresponds to asBEHAVE_CONSTRUCT
    pub constructors: Vec<BehaviorDecl>,

    /// Corresponds to asBEHAVE_DESTRUCT
    pub destructor: Option<BehaviorDecl>,

    /// Corresponds to asBEHAVE_ADDREF
    pub addref: Option<BehaviorDecl>,

    /// Corresponds to asBEHAVE_RELEASE
    pub release: Option<BehaviorDecl>,

    /// Corresponds to asBEHAVE_ENUMREFS
    pub enum_refs: Option<BehaviorDecl>,

    /// Corresponds to asBEHAVE_RELEASEREFS
    pub release_refs: Option<BehaviorDecl>,

    /// Registered methods and operators (`opEquals`, `opCast`, ...).
    pub methods: Vec<BehaviorDecl>,
}

impl TypeBehaviors {
    /// Create an empty behavior table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a method with the given declaration is registered.
    pub fn has_method(&self, declaration: &str) -> bool {
        self.methods.iter().any(|m| m.declaration == declaration)
    }

    /// Names of the behaviors a type with `kind` and `flags` must have but lacks.
    pub fn missing(&self, kind: TypeKind, flags: TypeFlags) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if kind == TypeKind::Reference {
            if self.addref.is_none() {
                missing.push("ADDREF");
            }
            if self.release.is_none() {
                missing.push("RELEASE");
            }
        }
        if flags.contains(TypeFlags::GC) {
            if self.enum_refs.is_none() {
                missing.push("ENUMREFS");
            }
            if self.release_refs.is_none() {
                missing.push("RELEASEREFS");
            }
        }
        missing
    }
}

/// Runtime type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// Script-visible name.
    pub name: String,
    /// Identity hash, `TypeHash::from_name(&name)`.
    pub hash: TypeHash,
    /// Reference or value type.
    pub kind: TypeKind,
    /// Registration flags.
    pub flags: TypeFlags,
    /// Single-hierarchy base type, if any.
    pub base: Option<TypeHash>,
    /// Lifecycle behaviors.
    pub behaviors: TypeBehaviors,
}

impl TypeInfo {
    /// Create a reference-type descriptor with no behaviors.
    pub fn reference(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            hash: TypeHash::from_name(&name),
            name,
            kind: TypeKind::Reference,
            flags: TypeFlags::REF,
            base: None,
            behaviors: TypeBehaviors::new(),
        }
    }

    /// Create a value-type descriptor with the given extra flags.
    pub fn value(name: impl Into<String>, flags: TypeFlags) -> Self {
        let name = name.into();
        Self {
            hash: TypeHash::from_name(&name),
            name,
            kind: TypeKind::Value,
            flags: TypeFlags::VALUE | flags,
            base: None,
            behaviors: TypeBehaviors::new(),
        }
    }

    /// True for reference types.
    pub fn is_reference(&self) -> bool {
        self.kind == TypeKind::Reference
    }

    /// True if the type takes part in cycle collection.
    pub fn is_garbage_collected(&self) -> bool {
        self.flags.contains(TypeFlags::GC)
    }

    /// Check that all behaviors required by the kind and flags are present.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        let missing = self.behaviors.missing(self.kind, self.flags);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RegistrationError::MissingBehaviors {
                type_name: self.name.clone(),
                missing,
            })
        }
    }
}
