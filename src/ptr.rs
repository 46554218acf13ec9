//! Statically typed counted pointer.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use log::{trace, warn};
use rco_core::ObjectRef;

use crate::counted::{Counted, CountedRef, Owned, OwnedRef};
use crate::engine::Engine;
use crate::gc::{GcReferences, GcVisitor};
use crate::handle::Handle;

/// A pointer to a counted `T` with the same ownership discipline as
/// [`Handle`]: it owns one increment of whatever it points at.
///
/// Building one from an [`Owned<T>`] transfers the reference the factory
/// already counted. Cloning increments.
///
/// ```
/// use angelscript_rco::{Counted, Engine, TypedPtr};
///
/// struct Horse;
/// impl Counted for Horse {
///     fn type_name() -> &'static str { "Horse" }
/// }
///
/// let engine = Engine::new();
/// engine.register_object_type::<Horse>().build().unwrap();
///
/// let first = TypedPtr::from(engine.create(Horse).unwrap());
/// let obj = first.object_ref().unwrap();
/// assert_eq!(engine.ref_count(obj), Some(1));
///
/// let second = first.clone();
/// assert_eq!(engine.ref_count(obj), Some(2));
///
/// drop(first);
/// drop(second);
/// assert!(!engine.is_alive(obj));
/// ```
pub struct TypedPtr<T: Counted> {
    held: Option<(CountedRef, Rc<T>)>,
}

impl<T: Counted> TypedPtr<T> {
    pub const fn null() -> Self {
        Self { held: None }
    }

    /// Take over an owned reference without incrementing.
    pub fn from_owned(owned: Owned<T>) -> Self {
        Self {
            held: Some(owned.into_parts()),
        }
    }

    /// Point at an object the caller does not own, taking a new reference.
    ///
    /// Returns `None` if the object is gone or is not a `T`.
    pub fn retain(engine: &Engine, object: ObjectRef) -> Option<Self> {
        let owned = engine.retain(object)?;
        owned.downcast::<T>().ok().map(Self::from_owned)
    }

    /// Copy another pointer. Pointing at the same object already is a no-op.
    pub fn assign(&mut self, other: &TypedPtr<T>) -> &mut Self {
        if self == other {
            return self;
        }
        self.reset();
        self.held = other.retain_held();
        self
    }

    /// Take over an owned reference, releasing the current target.
    pub fn assign_owned(&mut self, owned: Owned<T>) -> &mut Self {
        let (counted, value) = owned.into_parts();
        if self.object_ref() == Some(counted.object) {
            // Already held: the transferred increment is surplus.
            counted.release();
            return self;
        }
        self.reset();
        self.held = Some((counted, value));
        self
    }

    /// Release the current target and become null.
    pub fn reset(&mut self) {
        if let Some((counted, value)) = self.held.take() {
            if counted.engine.trace_enabled() {
                trace!("TypedPtr::release {} '{}'", counted.object, counted.type_info.name);
            }
            // The value must not outlive the count that keeps it in the heap.
            drop(value);
            counted.release();
        }
    }

    /// The target, or `None` if null.
    pub fn get(&self) -> Option<&T> {
        self.held.as_ref().map(|(_, value)| &**value)
    }

    pub fn is_null(&self) -> bool {
        self.held.is_none()
    }

    pub fn is_some(&self) -> bool {
        self.held.is_some()
    }

    pub fn object_ref(&self) -> Option<ObjectRef> {
        self.held.as_ref().map(|(counted, _)| counted.object)
    }

    pub fn engine(&self) -> Option<&Engine> {
        self.held.as_ref().map(|(counted, _)| &counted.engine)
    }

    /// Convert into a generic handle, transferring the reference.
    pub fn into_handle(self) -> Handle {
        Handle::from(self)
    }

    /// Hand the reference out as an [`Owned`], transferring it.
    pub fn into_owned(mut self) -> Option<Owned<T>> {
        let (counted, value) = self.held.take()?;
        Some(Owned::new(counted, value))
    }

    /// A new reference to the target, incremented for the receiver.
    ///
    /// This is the path for returning a raw reference to the host, which
    /// expects to own what it gets.
    pub fn to_owned_ref(&self) -> Option<Owned<T>> {
        let (counted, value) = self.retain_held()?;
        Some(Owned::new(counted, value))
    }

    pub(crate) fn into_counted(mut self) -> Option<CountedRef> {
        self.held.take().map(|(counted, _)| counted)
    }

    fn retain_held(&self) -> Option<(CountedRef, Rc<T>)> {
        let (counted, value) = self.held.as_ref()?;
        if !counted
            .engine
            .add_ref_script_object(counted.object, &counted.type_info)
        {
            warn!("TypedPtr copy of uncounted object {}", counted.object);
            return None;
        }
        if counted.engine.trace_enabled() {
            trace!("TypedPtr::copy {} '{}'", counted.object, counted.type_info.name);
        }
        Some((
            CountedRef {
                engine: counted.engine.clone(),
                object: counted.object,
                type_info: Rc::clone(&counted.type_info),
            },
            Rc::clone(value),
        ))
    }
}

impl<T: Counted> Default for TypedPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: Counted> From<Owned<T>> for TypedPtr<T> {
    fn from(owned: Owned<T>) -> Self {
        Self::from_owned(owned)
    }
}

impl<T: Counted> TryFrom<OwnedRef> for TypedPtr<T> {
    type Error = OwnedRef;

    fn try_from(owned: OwnedRef) -> Result<Self, OwnedRef> {
        owned.downcast::<T>().map(Self::from_owned)
    }
}

impl<T: Counted> Clone for TypedPtr<T> {
    fn clone(&self) -> Self {
        Self {
            held: self.retain_held(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.assign(source);
    }
}

impl<T: Counted> Deref for TypedPtr<T> {
    type Target = T;

    /// # Panics
    ///
    /// Panics if the pointer is null.
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => panic!("dereferenced a null TypedPtr<{}>", T::type_name()),
        }
    }
}

impl<T: Counted> PartialEq for TypedPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.held, &other.held) {
            (None, None) => true,
            (Some((a, _)), Some((b, _))) => a.object == b.object && a.engine.ptr_eq(&b.engine),
            _ => false,
        }
    }
}

impl<T: Counted> Eq for TypedPtr<T> {}

impl<T: Counted> GcReferences for TypedPtr<T> {
    fn enum_references(&self, visitor: &mut dyn GcVisitor) {
        if let Some((counted, _)) = &self.held {
            visitor.visit_object(counted.object);
            visitor.visit_type(&counted.type_info);
        }
    }

    fn release_references(&mut self) {
        self.reset();
    }
}

impl<T: Counted> Drop for TypedPtr<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: Counted> fmt::Debug for TypedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.held {
            Some((counted, _)) => write!(f, "TypedPtr<{}>({:?})", T::type_name(), counted),
            None => write!(f, "TypedPtr<{}>(null)", T::type_name()),
        }
    }
}
