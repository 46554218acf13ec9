//! Type registry: the process-wide table of type descriptors of one engine.

use std::rc::Rc;

use log::debug;
use rustc_hash::FxHashMap;

use crate::{RegistrationError, TypeHash, TypeInfo};

/// Registered type descriptors, indexed by [`TypeHash`].
///
/// Descriptors are shared as `Rc<TypeInfo>` so handles can carry them
/// without a registry lookup on every operation.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: FxHashMap<TypeHash, Rc<TypeInfo>>,
    /// Script name to hash. A type may carry a hash not derived from its name.
    names: FxHashMap<String, TypeHash>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor.
    ///
    /// Fails if a type with the same name exists, if required behaviors are
    /// missing, or if the base type is unknown or not a reference type.
    pub fn register(&mut self, info: TypeInfo) -> Result<Rc<TypeInfo>, RegistrationError> {
        if self.types.contains_key(&info.hash) || self.names.contains_key(&info.name) {
            return Err(RegistrationError::DuplicateType(info.name));
        }
        info.validate()?;

        if let Some(base_hash) = info.base {
            let Some(base) = self.types.get(&base_hash) else {
                return Err(RegistrationError::InvalidBase {
                    type_name: info.name,
                    base: base_hash.to_string(),
                    reason: "base type is not registered",
                });
            };
            if !base.is_reference() || !info.is_reference() {
                return Err(RegistrationError::InvalidBase {
                    type_name: info.name,
                    base: base.name.clone(),
                    reason: "only reference types can form a hierarchy",
                });
            }
        }

        debug!("registered type '{}' ({}) flags={:?}", info.name, info.hash, info.flags);
        let info = Rc::new(info);
        self.types.insert(info.hash, Rc::clone(&info));
        self.names.insert(info.name.clone(), info.hash);
        Ok(info)
    }

    /// Look up a descriptor by hash.
    pub fn get(&self, hash: TypeHash) -> Option<&Rc<TypeInfo>> {
        self.types.get(&hash)
    }

    /// Look up a descriptor by script name.
    pub fn get_by_name(&self, name: &str) -> Option<&Rc<TypeInfo>> {
        self.names.get(name).and_then(|hash| self.types.get(hash))
    }

    /// Check whether a type is registered.
    pub fn contains(&self, hash: TypeHash) -> bool {
        self.types.contains_key(&hash)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Check whether an object of concrete type `actual` may be referenced
    /// as `target`.
    ///
    /// True when `target` is `actual` itself or one of its registered bases.
    /// Unrelated types, and types outside the single base chain, fail.
    pub fn can_cast(&self, actual: TypeHash, target: TypeHash) -> bool {
        let mut current = Some(actual);
        // The chain is acyclic (bases must be registered first), but bound
        // the walk by the table size regardless.
        for _ in 0..=self.types.len() {
            match current {
                Some(hash) if hash == target => return true,
                Some(hash) => current = self.types.get(&hash).and_then(|info| info.base),
                None => return false,
            }
        }
        false
    }
}
