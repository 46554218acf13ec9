//! Registration of counted types and of the generic handle type.
//!
//! # Example
//!
//! ```
//! use angelscript_rco::{Counted, Dynamic, Engine, FactoryContract, RuntimeError};
//!
//! struct Horse {
//!     name: String,
//! }
//!
//! impl Counted for Horse {
//!     fn type_name() -> &'static str {
//!         "Horse"
//!     }
//! }
//!
//! let engine = Engine::new();
//! engine
//!     .register_object_type::<Horse>()
//!     .factory("Horse@ f(string name)", FactoryContract::Transfers, |engine, args| {
//!         let name = args.first().and_then(Dynamic::as_str).unwrap_or_default();
//!         let horse = engine.create(Horse { name: name.to_string() })?;
//!         Ok(horse.into_raw())
//!     })
//!     .build()
//!     .unwrap();
//!
//! let horse = engine.call_factory("Horse", &[Dynamic::String("Artax".into())]).unwrap();
//! assert_eq!(engine.ref_count(horse.object_ref()), Some(1));
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use rco_core::{BehaviorDecl, ObjectRef, RegistrationError, RuntimeError, TypeFlags, TypeInfo};

use crate::counted::Counted;
use crate::dynamic::Dynamic;
use crate::engine::Engine;
use crate::gc::{GcCallbacks, GcObject};

/// Reference-count contract of a factory behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryContract {
    /// The returned reference already includes the caller's count, as for a
    /// freshly created object. The engine passes it on untouched.
    Transfers,
    /// The returned reference is still owned by someone else, e.g. a shared
    /// instance. The engine increments before handing it to the caller.
    Borrowed,
}

pub(crate) type FactoryFn = Rc<dyn Fn(&Engine, &[Dynamic]) -> Result<ObjectRef, RuntimeError>>;

/// A registered factory behavior.
#[derive(Clone)]
pub(crate) struct Factory {
    pub(crate) decl: BehaviorDecl,
    pub(crate) contract: FactoryContract,
    pub(crate) func: FactoryFn,
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("decl", &self.decl.declaration)
            .field("contract", &self.contract)
            .finish_non_exhaustive()
    }
}

/// Builder for registering a counted reference type.
///
/// Created by [`Engine::register_object_type`]. The ADDREF and RELEASE
/// behaviors are always registered; they are served by the engine's heap.
pub struct ObjectTypeBuilder<'e, T: Counted> {
    engine: &'e Engine,
    info: TypeInfo,
    factories: Vec<Factory>,
    gc: Option<GcCallbacks>,
    base_error: Option<RegistrationError>,
    _marker: PhantomData<T>,
}

impl<'e, T: Counted> ObjectTypeBuilder<'e, T> {
    pub(crate) fn new(engine: &'e Engine) -> Self {
        let mut info = TypeInfo::reference(T::type_name());
        info.hash = T::type_hash();
        info.behaviors.addref = Some(BehaviorDecl::new(info.hash, "void f()"));
        info.behaviors.release = Some(BehaviorDecl::new(info.hash, "void f()"));
        Self {
            engine,
            info,
            factories: Vec::new(),
            gc: None,
            base_error: None,
            _marker: PhantomData,
        }
    }

    /// Declare `B` as the base of this type for casting purposes.
    ///
    /// `B` must already be registered.
    pub fn base<B: Counted>(mut self) -> Self {
        if self.engine.type_info::<B>().is_none() {
            self.base_error = Some(RegistrationError::TypeNotFound(B::type_name().to_string()));
        }
        self.info.base = Some(B::type_hash());
        self
    }

    /// Add a factory behavior with its script declaration and count contract.
    pub fn factory<F>(mut self, declaration: &str, contract: FactoryContract, func: F) -> Self
    where
        F: Fn(&Engine, &[Dynamic]) -> Result<ObjectRef, RuntimeError> + 'static,
    {
        let decl = BehaviorDecl::new(self.info.hash, declaration);
        self.info.behaviors.factories.push(decl.clone());
        self.factories.push(Factory {
            decl,
            contract,
            func: Rc::new(func),
        });
        self
    }

    /// Finish registration.
    pub fn build(self) -> Result<Rc<TypeInfo>, RegistrationError> {
        if let Some(err) = self.base_error {
            return Err(err);
        }
        self.engine.register_type(self.info, self.factories, self.gc)
    }
}

impl<T: GcObject> ObjectTypeBuilder<'_, T> {
    /// Make the type collectable, wiring ENUMREFS/RELEASEREFS to its [`GcObject`] impl.
    pub fn gc(mut self) -> Self {
        self.info.flags |= TypeFlags::GC;
        self.info.behaviors.enum_refs = Some(BehaviorDecl::new(self.info.hash, "void f(int&in)"));
        self.info.behaviors.release_refs =
            Some(BehaviorDecl::new(self.info.hash, "void f(int&in)"));
        self.gc = Some(GcCallbacks::of::<T>());
        self
    }
}

/// Descriptor of the generic handle value type.
pub(crate) fn handle_type_info(name: &str) -> TypeInfo {
    let mut info = TypeInfo::value(
        name,
        TypeFlags::AS_HANDLE | TypeFlags::GC | TypeFlags::APP_CLASS_CDAK,
    );
    let owner = info.hash;
    let b = &mut info.behaviors;

    b.constructors.push(BehaviorDecl::new(owner, "void f()"));
    b.constructors
        .push(BehaviorDecl::new(owner, format!("void f(const {name} &in)")));
    b.constructors.push(BehaviorDecl::new(owner, "void f(const ?&in)"));
    b.destructor = Some(BehaviorDecl::new(owner, "void f()"));
    b.enum_refs = Some(BehaviorDecl::new(owner, "void f(int&in)"));
    b.release_refs = Some(BehaviorDecl::new(owner, "void f(int&in)"));

    b.methods.push(BehaviorDecl::new(owner, "void opCast(?&out)"));
    b.methods.push(BehaviorDecl::new(
        owner,
        format!("{name} &opHndlAssign(const {name} &in)"),
    ));
    b.methods
        .push(BehaviorDecl::new(owner, format!("{name} &opHndlAssign(const ?&in)")));
    b.methods.push(BehaviorDecl::new(
        owner,
        format!("bool opEquals(const {name} &in) const"),
    ));
    b.methods
        .push(BehaviorDecl::new(owner, "bool opEquals(const ?&in) const"));

    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_HANDLE_TYPE_NAME;
    use rco_core::{TypeHash, TypeKind};

    struct Animal;
    impl Counted for Animal {
        fn type_name() -> &'static str {
            "Animal"
        }
    }

    struct Horse;
    impl Counted for Horse {
        fn type_name() -> &'static str {
            "Horse"
        }
    }

    #[test]
    fn object_type_gets_counting_behaviors() {
        let engine = Engine::new();
        let info = engine.register_object_type::<Horse>().build().unwrap();

        assert_eq!(info.kind, TypeKind::Reference);
        assert_eq!(info.flags, TypeFlags::REF);
        assert!(info.behaviors.addref.is_some());
        assert!(info.behaviors.release.is_some());
        assert!(info.behaviors.factories.is_empty());
    }

    #[test]
    fn duplicate_object_type_fails() {
        let engine = Engine::new();
        engine.register_object_type::<Horse>().build().unwrap();
        assert_eq!(
            engine.register_object_type::<Horse>().build(),
            Err(RegistrationError::DuplicateType("Horse".to_string()))
        );
    }

    #[test]
    fn factories_are_recorded() {
        let engine = Engine::new();
        let info = engine
            .register_object_type::<Horse>()
            .factory("Horse@ f()", FactoryContract::Transfers, |engine, _| {
                Ok(engine.create(Horse)?.into_raw())
            })
            .build()
            .unwrap();

        assert_eq!(info.behaviors.factories.len(), 1);
        assert_eq!(info.behaviors.factories[0].declaration, "Horse@ f()");
    }

    #[test]
    fn base_must_be_registered_first() {
        let engine = Engine::new();
        let result = engine.register_object_type::<Horse>().base::<Animal>().build();
        assert_eq!(result, Err(RegistrationError::TypeNotFound("Animal".to_string())));

        engine.register_object_type::<Animal>().build().unwrap();
        let info = engine
            .register_object_type::<Horse>()
            .base::<Animal>()
            .build()
            .unwrap();
        assert_eq!(info.base, Some(TypeHash::from_name("Animal")));
    }

    #[test]
    fn aliased_hash_is_found_by_name() {
        struct Pony;
        impl Counted for Pony {
            fn type_name() -> &'static str {
                "Pony"
            }

            fn type_hash() -> TypeHash {
                TypeHash::from_name("Horse")
            }
        }

        let engine = Engine::new();
        engine
            .register_object_type::<Pony>()
            .factory("Pony@ f()", FactoryContract::Transfers, |engine, _| {
                Ok(engine.create(Pony)?.into_raw())
            })
            .build()
            .unwrap();

        let info = engine.type_info_by_name("Pony").unwrap();
        assert_eq!(info.hash, TypeHash::from_name("Horse"));
        assert_eq!(engine.type_info::<Pony>().map(|i| i.hash), Some(info.hash));

        let pony = engine.call_factory("Pony", &[]).unwrap();
        assert_eq!(pony.type_info().name, "Pony");
        assert_eq!(engine.ref_count(pony.object_ref()), Some(1));
    }

    #[test]
    fn handle_type_registration() {
        let engine = Engine::new();
        let info = engine.register_handle_type().unwrap();

        assert_eq!(info.name, DEFAULT_HANDLE_TYPE_NAME);
        assert_eq!(info.kind, TypeKind::Value);
        assert!(info.flags.contains(TypeFlags::VALUE | TypeFlags::AS_HANDLE | TypeFlags::GC));
        assert_eq!(info.behaviors.constructors.len(), 3);
        assert!(info.behaviors.destructor.is_some());
        assert!(info.behaviors.enum_refs.is_some());
        assert!(info.behaviors.release_refs.is_some());
        assert!(info.behaviors.has_method("void opCast(?&out)"));
        assert!(info.behaviors.has_method(
            "RefCountingObjectHandle &opHndlAssign(const RefCountingObjectHandle &in)"
        ));
        assert!(info.behaviors.has_method("bool opEquals(const ?&in) const"));
        assert_eq!(engine.handle_type().map(|h| h.hash), Some(info.hash));
    }

    #[test]
    fn handle_type_registers_once() {
        let engine = Engine::new();
        engine.register_handle_type().unwrap();
        assert!(matches!(
            engine.register_handle_type(),
            Err(RegistrationError::DuplicateType(_))
        ));
    }

    #[test]
    fn handle_type_custom_name() {
        let engine = Engine::new();
        let info = engine.register_handle_type_as("ref").unwrap();
        assert_eq!(info.name, "ref");
        assert!(info.behaviors.has_method("ref &opHndlAssign(const ?&in)"));
    }
}
