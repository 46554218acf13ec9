//! Counted objects and owned references.
//!
//! A type becomes a counted object by implementing [`Counted`] and being
//! registered with an [`Engine`]. Its instances live in the engine's object
//! heap and are destroyed when their reference count reaches zero.
//!
//! [`OwnedRef`] and [`Owned<T>`] are the tokens that carry one reference
//! which has *already* been counted for their holder: what a factory
//! returns, what a successful cast returns, what a host hands back after
//! incrementing on its side. They cannot be cloned. Turning one into a
//! [`Handle`](crate::Handle) or [`TypedPtr`](crate::TypedPtr) is an
//! ownership transfer and does not touch the count; dropping one unused
//! releases its reference.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use rco_core::{ObjectRef, TypeHash, TypeInfo};

use crate::Engine;

/// Trait for native types that can live in the engine's object heap.
///
/// # Example
///
/// ```
/// use angelscript_rco::Counted;
///
/// struct Horse {
///     name: String,
/// }
///
/// impl Counted for Horse {
///     fn type_name() -> &'static str {
///         "Horse"
///     }
/// }
/// ```
pub trait Counted: 'static {
    /// The script-visible type name.
    fn type_name() -> &'static str;

    /// The type hash. Derived from the name; override only to alias types.
    fn type_hash() -> TypeHash {
        TypeHash::from_name(Self::type_name())
    }
}

/// One counted reference: object, descriptor, and the engine that owns the
/// object. Whoever holds a `CountedRef` owns exactly one increment.
pub(crate) struct CountedRef {
    pub(crate) engine: Engine,
    pub(crate) object: ObjectRef,
    pub(crate) type_info: Rc<TypeInfo>,
}

impl CountedRef {
    /// Give the reference back to the engine.
    pub(crate) fn release(self) {
        self.engine.release_script_object(self.object, &self.type_info);
    }
}

impl fmt::Debug for CountedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.object, self.type_info.name)
    }
}

/// An untyped reference already counted for its holder.
#[must_use = "dropping an OwnedRef releases the reference it carries"]
pub struct OwnedRef {
    counted: Option<CountedRef>,
}

impl OwnedRef {
    pub(crate) fn new(counted: CountedRef) -> Self {
        Self {
            counted: Some(counted),
        }
    }

    fn counted(&self) -> &CountedRef {
        // Only `take` empties the option, and it consumes `self`.
        self.counted.as_ref().unwrap_or_else(|| unreachable!())
    }

    pub(crate) fn take(mut self) -> CountedRef {
        self.counted.take().unwrap_or_else(|| unreachable!())
    }

    /// The referenced object.
    pub fn object_ref(&self) -> ObjectRef {
        self.counted().object
    }

    /// The descriptor the reference is held under.
    pub fn type_info(&self) -> &Rc<TypeInfo> {
        &self.counted().type_info
    }

    /// The engine owning the object.
    pub fn engine(&self) -> &Engine {
        &self.counted().engine
    }

    /// Give up ownership without releasing, returning the raw reference.
    ///
    /// The count stays as it is; the caller becomes responsible for the
    /// reference, e.g. by handing it to the host or to [`Engine::adopt`].
    pub fn into_raw(self) -> ObjectRef {
        self.take().object
    }

    /// Convert into a typed owned reference if the object is a `T`.
    ///
    /// On a type mismatch the untyped reference is returned unchanged.
    pub fn downcast<T: Counted>(self) -> Result<Owned<T>, OwnedRef> {
        let value = self.engine().get::<T>(self.object_ref());
        match value {
            Some(value) => Ok(Owned {
                counted: Some(self.take()),
                value,
            }),
            None => Err(self),
        }
    }
}

impl Drop for OwnedRef {
    fn drop(&mut self) {
        if let Some(counted) = self.counted.take() {
            counted.release();
        }
    }
}

impl fmt::Debug for OwnedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedRef").field(&self.counted).finish()
    }
}

/// A typed reference already counted for its holder.
///
/// Returned by [`Engine::create`], the native factory path.
#[must_use = "dropping an Owned releases the reference it carries"]
pub struct Owned<T: Counted> {
    counted: Option<CountedRef>,
    value: Rc<T>,
}

impl<T: Counted> Owned<T> {
    pub(crate) fn new(counted: CountedRef, value: Rc<T>) -> Self {
        Self {
            counted: Some(counted),
            value,
        }
    }

    fn counted(&self) -> &CountedRef {
        self.counted.as_ref().unwrap_or_else(|| unreachable!())
    }

    pub(crate) fn into_parts(mut self) -> (CountedRef, Rc<T>) {
        let counted = self.counted.take().unwrap_or_else(|| unreachable!());
        (counted, Rc::clone(&self.value))
    }

    /// The referenced object.
    pub fn object_ref(&self) -> ObjectRef {
        self.counted().object
    }

    /// The engine owning the object.
    pub fn engine(&self) -> &Engine {
        &self.counted().engine
    }

    /// Give up ownership without releasing. See [`OwnedRef::into_raw`].
    pub fn into_raw(self) -> ObjectRef {
        self.into_parts().0.object
    }

    /// Forget the static type.
    pub fn into_untyped(self) -> OwnedRef {
        OwnedRef::new(self.into_parts().0)
    }
}

impl<T: Counted> Deref for Owned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Counted> Drop for Owned<T> {
    fn drop(&mut self) {
        if let Some(counted) = self.counted.take() {
            counted.release();
        }
    }
}

impl<T: Counted> fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&self.counted).finish()
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

    struct Bird;
    impl Counted for Bird {
        fn type_name() -> &'static str {
            "Bird"
        }
    }

    fn engine() -> Engine {
        let engine = Engine::new();
        engine.register_object_type::<Horse>().build().unwrap();
        engine.register_object_type::<Bird>().build().unwrap();
        engine
    }

    #[test]
    fn downcast_mismatch_returns_the_reference() {
        let engine = engine();
        let owned = engine.create(Horse).unwrap().into_untyped();
        let obj = owned.object_ref();

        let owned = owned.downcast::<Bird>().unwrap_err();
        assert_eq!(owned.object_ref(), obj);
        assert_eq!(engine.ref_count(obj), Some(1));

        let horse = owned.downcast::<Horse>().unwrap();
        assert_eq!(horse.object_ref(), obj);
        assert_eq!(engine.ref_count(obj), Some(1));
    }

    #[test]
    fn into_untyped_keeps_count_and_descriptor() {
        let engine = engine();
        let owned = engine.create(Horse).unwrap();
        let obj = owned.object_ref();

        let untyped = owned.into_untyped();
        assert_eq!(engine.ref_count(obj), Some(1));
        assert_eq!(untyped.type_info().name, "Horse");
        assert!(untyped.engine().ptr_eq(&engine));
    }

    #[test]
    fn dropping_owned_tokens_releases() {
        let engine = engine();
        let typed = engine.create(Horse).unwrap();
        let typed_obj = typed.object_ref();
        drop(typed);
        assert!(!engine.is_alive(typed_obj));

        let untyped = engine.create(Horse).unwrap().into_untyped();
        let untyped_obj = untyped.object_ref();
        drop(untyped);
        assert!(!engine.is_alive(untyped_obj));
    }

    #[test]
    fn into_raw_keeps_the_count() {
        let engine = engine();
        let raw = engine.create(Horse).unwrap().into_untyped().into_raw();
        assert_eq!(engine.ref_count(raw), Some(1));
        assert!(engine.release(raw));
    }

    #[test]
    fn type_hash_defaults_to_name() {
        assert_eq!(Horse::type_hash(), TypeHash::from_name("Horse"));
    }
}
