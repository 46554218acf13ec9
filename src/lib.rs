//! Reference-counted object handles for script engine hosts.
//!
//! Objects shared between a host and its scripts are kept alive by an
//! intrusive reference count. This crate provides the engine those objects
//! live in and the two handle types that manage the counts:
//!
//! - [`Handle`]: type-erased, can hold any registered reference type
//! - [`TypedPtr<T>`]: the same discipline for one concrete type
//!
//! Both own exactly one increment of their target. A reference that was
//! already counted for its receiver arrives as an [`OwnedRef`] or
//! [`Owned<T>`] and is transferred, never incremented again.
//!
//! ```
//! use angelscript_rco::prelude::*;
//!
//! struct Horse;
//! impl Counted for Horse {
//!     fn type_name() -> &'static str { "Horse" }
//! }
//!
//! let engine = Engine::new();
//! engine.register_object_type::<Horse>().build().unwrap();
//!
//! let handle = Handle::from(engine.create(Horse).unwrap());
//! let obj = handle.object_ref().unwrap();
//!
//! let copy = handle.clone();
//! assert_eq!(engine.ref_count(obj), Some(2));
//!
//! drop(handle);
//! drop(copy);
//! assert!(!engine.is_alive(obj));
//! ```

mod context;
mod counted;
mod dynamic;
mod engine;
mod gc;
mod handle;
mod ptr;
mod registration;
mod slot;

pub use context::ActiveContext;
pub use counted::{Counted, Owned, OwnedRef};
pub use dynamic::Dynamic;
pub use engine::{DEFAULT_HANDLE_TYPE_NAME, Engine};
pub use gc::{GcObject, GcReferences, GcVisitor, ReferenceCollector};
pub use handle::Handle;
pub use ptr::TypedPtr;
pub use registration::{FactoryContract, ObjectTypeBuilder};
pub use slot::{Slot, SlotOutcome};

pub use rco_core::{
    EngineProperties, EngineProperty, ObjectRef, RcoError, RcoResult, RegistrationError,
    RuntimeError, TypeFlags, TypeHash, TypeInfo, TypeKind,
};

pub mod prelude {
    pub use crate::{
        ActiveContext, Counted, Dynamic, Engine, EngineProperty, FactoryContract, GcObject,
        GcReferences, GcVisitor, Handle, ObjectRef, Owned, OwnedRef, RuntimeError, Slot,
        SlotOutcome, TypedPtr,
    };
}
