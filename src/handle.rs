//! The generic, type-erased object handle.
//!
//! A [`Handle`] can hold a reference to an object of any registered type. It
//! pairs the raw [`ObjectRef`] with the type descriptor it is held under and
//! defers every count change to the engine through that descriptor, so one
//! handle implementation serves all types.
//!
//! The handle owns exactly one increment of the object it holds:
//!
//! - cloning takes a new reference,
//! - reassigning releases the old target before taking the new one,
//! - assigning the reference already held changes nothing,
//! - dropping releases.
//!
//! Conversions from [`OwnedRef`], [`Owned`] and an owned [`TypedPtr`] are
//! transfers and leave the count alone.

use std::fmt;
use std::rc::Rc;

use log::{trace, warn};
use rco_core::{ObjectRef, RuntimeError, TypeHash, TypeInfo};

use crate::context::ActiveContext;
use crate::counted::{Counted, CountedRef, Owned, OwnedRef};
use crate::dynamic::Dynamic;
use crate::engine::Engine;
use crate::gc::{GcReferences, GcVisitor};
use crate::ptr::TypedPtr;

/// Type-erased reference to a counted object.
#[derive(Default)]
pub struct Handle {
    held: Option<CountedRef>,
}

impl Handle {
    /// A null handle.
    pub const fn null() -> Self {
        Self { held: None }
    }

    /// Construct from a reference and descriptor supplied by the host.
    ///
    /// The reference is owned elsewhere, so a new reference is taken.
    pub fn from_raw(engine: &Engine, object: ObjectRef, type_info: Rc<TypeInfo>) -> Self {
        let mut handle = Self::null();
        handle.set(engine, object, type_info);
        handle
    }

    /// Construct from an opaque host value (`void f(const ?&in)`).
    ///
    /// See [`Handle::assign_dynamic`].
    pub fn from_dynamic(ctx: &ActiveContext<'_>, value: &Dynamic) -> Result<Self, RuntimeError> {
        let mut handle = Self::null();
        handle.assign_dynamic(ctx, value)?;
        Ok(handle)
    }

    /// Point the handle at `object`, held under `type_info`.
    ///
    /// Assigning the reference already held is a no-op. Otherwise the old
    /// target is released first and the new one is then referenced.
    pub fn set(&mut self, engine: &Engine, object: ObjectRef, type_info: Rc<TypeInfo>) {
        if self.holds(engine, object) {
            return;
        }
        self.release_held();

        if engine.trace_enabled() {
            trace!("Handle::set {} '{}'", object, type_info.name);
        }
        if engine.add_ref_script_object(object, &type_info) {
            self.held = Some(CountedRef {
                engine: engine.clone(),
                object,
                type_info,
            });
        } else {
            warn!("Handle::set to dead or uncounted object {}; handle left null", object);
        }
    }

    /// Set the handle to null, releasing the held reference.
    pub fn clear(&mut self) {
        self.release_held();
    }

    /// Copy another handle's reference (`opHndlAssign(const Handle &in)`).
    pub fn assign(&mut self, other: &Handle) -> &mut Self {
        match &other.held {
            Some(held) => {
                let engine = held.engine.clone();
                self.set(&engine, held.object, Rc::clone(&held.type_info));
            }
            None => self.clear(),
        }
        self
    }

    /// Assign from an opaque host value (`opHndlAssign(const ?&in)`).
    ///
    /// - the null handle clears this handle;
    /// - an object or object handle is looked up in the active engine and
    ///   referenced under its concrete type;
    /// - another generic handle has its content copied, so handles never
    ///   nest inside handles;
    /// - any other value is rejected with [`RuntimeError::NotAReference`].
    ///
    /// On error the handle keeps its current target.
    pub fn assign_dynamic(
        &mut self,
        ctx: &ActiveContext<'_>,
        value: &Dynamic,
    ) -> Result<&mut Self, RuntimeError> {
        match value {
            Dynamic::NullHandle => {
                self.clear();
                Ok(self)
            }
            Dynamic::Object(object) | Dynamic::ObjectHandle(object) => {
                let engine = ctx.engine();
                let type_info = engine
                    .type_info_by_hash(object.type_hash)
                    .ok_or_else(|| RuntimeError::TypeNotRegistered(object.type_hash.to_string()))?;
                if !engine.is_alive(*object) {
                    return Err(RuntimeError::DeadObject(object.to_string()));
                }
                self.set(engine, *object, type_info);
                Ok(self)
            }
            Dynamic::Handle(other) => Ok(self.assign(other)),
            other => Err(RuntimeError::NotAReference(other.type_name())),
        }
    }

    /// Compare against an opaque host value (`opEquals(const ?&in)`).
    ///
    /// Objects compare by reference identity only. Another generic handle
    /// compares with `==`. There is no dynamic-cast fallback, so the same
    /// object seen through a different descriptor is not equal.
    pub fn equals_dynamic(&self, value: &Dynamic) -> bool {
        match value {
            Dynamic::NullHandle => self.is_null(),
            Dynamic::Object(object) | Dynamic::ObjectHandle(object) => {
                self.object_ref() == Some(*object)
            }
            Dynamic::Handle(other) => self == other,
            _ => false,
        }
    }

    /// Cast to `target` (`opCast(?&out)`).
    ///
    /// Succeeds when `target` is the object's concrete type or one of its
    /// registered bases; the result is a new reference. A null handle or a
    /// mismatch yields `None` and leaves all counts unchanged.
    pub fn cast(&self, target: &Rc<TypeInfo>) -> Option<OwnedRef> {
        let held = self.held.as_ref()?;
        held.engine.ref_cast_object(held.object, &held.type_info, target)
    }

    /// Cast to a typed pointer. `T` must be the object's concrete type.
    pub fn cast_to<T: Counted>(&self) -> Option<TypedPtr<T>> {
        let held = self.held.as_ref()?;
        let target = held.engine.type_info::<T>()?;
        let owned = self.cast(&target)?;
        owned.downcast::<T>().ok().map(TypedPtr::from)
    }

    /// The held reference.
    pub fn object_ref(&self) -> Option<ObjectRef> {
        self.held.as_ref().map(|held| held.object)
    }

    /// The descriptor the reference is held under.
    pub fn type_info(&self) -> Option<&Rc<TypeInfo>> {
        self.held.as_ref().map(|held| &held.type_info)
    }

    /// Hash of the held descriptor, [`TypeHash::EMPTY`] when null.
    pub fn type_hash(&self) -> TypeHash {
        self.held
            .as_ref()
            .map_or(TypeHash::EMPTY, |held| held.type_info.hash)
    }

    /// The engine owning the held object.
    pub fn engine(&self) -> Option<&Engine> {
        self.held.as_ref().map(|held| &held.engine)
    }

    pub fn is_null(&self) -> bool {
        self.held.is_none()
    }

    fn holds(&self, engine: &Engine, object: ObjectRef) -> bool {
        self.held
            .as_ref()
            .is_some_and(|held| held.object == object && held.engine.ptr_eq(engine))
    }

    fn release_held(&mut self) {
        if let Some(held) = self.held.take() {
            if held.engine.trace_enabled() {
                trace!("Handle::release {} '{}'", held.object, held.type_info.name);
            }
            held.release();
        }
    }
}

impl Clone for Handle {
    fn clone(&self) -> Self {
        let mut handle = Self::null();
        handle.assign(self);
        handle
    }

    fn clone_from(&mut self, source: &Self) {
        self.assign(source);
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.release_held();
    }
}

/// Equal iff both are null, or both hold the same object under the same
/// descriptor in the same engine.
impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        match (&self.held, &other.held) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.object == b.object
                    && a.type_info.hash == b.type_info.hash
                    && a.engine.ptr_eq(&b.engine)
            }
            _ => false,
        }
    }
}

impl Eq for Handle {}

impl GcReferences for Handle {
    fn enum_references(&self, visitor: &mut dyn GcVisitor) {
        if let Some(held) = &self.held {
            visitor.visit_object(held.object);
            visitor.visit_type(&held.type_info);
        }
    }

    fn release_references(&mut self) {
        self.clear();
    }
}

impl From<OwnedRef> for Handle {
    fn from(owned: OwnedRef) -> Self {
        Self {
            held: Some(owned.take()),
        }
    }
}

impl<T: Counted> From<Owned<T>> for Handle {
    fn from(owned: Owned<T>) -> Self {
        Self {
            held: Some(owned.into_parts().0),
        }
    }
}

impl<T: Counted> From<TypedPtr<T>> for Handle {
    fn from(ptr: TypedPtr<T>) -> Self {
        Self {
            held: ptr.into_counted(),
        }
    }
}

impl<T: Counted> From<&TypedPtr<T>> for Handle {
    fn from(ptr: &TypedPtr<T>) -> Self {
        ptr.to_owned_ref().map_or_else(Handle::null, Handle::from)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.held {
            Some(held) => write!(f, "Handle({:?})", held),
            None => write!(f, "Handle(null)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Horse;
    impl Counted for Horse {
        fn type_name() -> &'static str {
            "Horse"
        }
    }

    fn engine() -> Engine {
        let engine = Engine::new();
        engine.register_object_type::<Horse>().build().unwrap();
        engine
    }

    #[test]
    fn assign_dynamic_to_dead_object_keeps_target() {
        let engine = engine();
        let mut handle = Handle::from(engine.create(Horse).unwrap());
        let held = handle.object_ref().unwrap();
        let dead = engine.create(Horse).unwrap().into_raw();
        engine.release(dead);

        let ctx = engine.prepare_context().unwrap();
        let result = handle.assign_dynamic(&ctx, &Dynamic::Object(dead)).map(|_| ());
        assert_eq!(result, Err(RuntimeError::DeadObject(dead.to_string())));
        assert_eq!(handle.object_ref(), Some(held));
        assert_eq!(engine.ref_count(held), Some(1));
    }

    #[test]
    fn set_to_dead_object_leaves_null() {
        let engine = engine();
        let dead = engine.create(Horse).unwrap().into_raw();
        engine.release(dead);

        let handle = Handle::from_raw(&engine, dead, engine.type_info::<Horse>().unwrap());
        assert!(handle.is_null());
    }

    #[test]
    fn handles_from_different_engines_differ() {
        let first = engine();
        let second = engine();
        let a = Handle::from(first.create(Horse).unwrap());
        let b = Handle::from(second.create(Horse).unwrap());
        assert_eq!(a.object_ref(), b.object_ref());
        assert_ne!(a, b);
    }

    #[test]
    fn debug_shows_target() {
        let engine = engine();
        let handle = Handle::from(engine.create(Horse).unwrap());
        assert_eq!(format!("{:?}", handle), "Handle(#0.0 'Horse')");
    }
}
