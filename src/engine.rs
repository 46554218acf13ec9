//! The host engine: type registry, object heap and the reference counting
//! entry points every handle defers to.
//!
//! An [`Engine`] is a cheap, cloneable, single-threaded reference to shared
//! engine state. Handles keep a clone of it while they hold an object, so
//! the engine outlives every reference into its heap.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use log::{debug, trace, warn};
use rco_core::{
    EngineProperties, EngineProperty, ObjectHeap, ObjectRef, RegistrationError, Released,
    RuntimeError, TypeHash, TypeInfo, TypeRegistry,
};
use rustc_hash::FxHashMap;

use crate::counted::{Counted, CountedRef, Owned, OwnedRef};
use crate::context::ActiveContext;
use crate::dynamic::Dynamic;
use crate::gc::{GcCallbacks, GcVisitor};
use crate::registration::{Factory, FactoryContract, ObjectTypeBuilder, handle_type_info};

/// Name under which [`Engine::register_handle_type`] registers the generic handle.
pub const DEFAULT_HANDLE_TYPE_NAME: &str = "RefCountingObjectHandle";

/// Shared handle to an engine instance.
#[derive(Clone)]
pub struct Engine {
    inner: Rc<EngineInner>,
}

struct EngineInner {
    properties: RefCell<EngineProperties>,
    registry: RefCell<TypeRegistry>,
    heap: RefCell<ObjectHeap>,
    factories: RefCell<FxHashMap<TypeHash, Vec<Factory>>>,
    gc_callbacks: RefCell<FxHashMap<TypeHash, GcCallbacks>>,
    handle_type: RefCell<Option<Rc<TypeInfo>>>,
    context_active: Cell<bool>,
}

impl Engine {
    /// Create an engine with default properties.
    pub fn new() -> Self {
        Self::with_properties(EngineProperties::new())
    }

    /// Create an engine with the given properties.
    pub fn with_properties(properties: EngineProperties) -> Self {
        let capacity = properties.get(EngineProperty::InitHeapCapacity);
        Self {
            inner: Rc::new(EngineInner {
                properties: RefCell::new(properties),
                registry: RefCell::new(TypeRegistry::new()),
                heap: RefCell::new(ObjectHeap::with_capacity(capacity)),
                factories: RefCell::new(FxHashMap::default()),
                gc_callbacks: RefCell::new(FxHashMap::default()),
                handle_type: RefCell::new(None),
                context_active: Cell::new(false),
            }),
        }
    }

    /// Change a property.
    pub fn set_property(&self, property: EngineProperty, value: usize) {
        self.inner.properties.borrow_mut().set(property, value);
    }

    /// Read a property.
    pub fn property(&self, property: EngineProperty) -> usize {
        self.inner.properties.borrow().get(property)
    }

    pub(crate) fn trace_enabled(&self) -> bool {
        self.inner.properties.borrow().trace_ref_counts()
    }

    /// True if both values refer to the same engine instance.
    pub fn ptr_eq(&self, other: &Engine) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Start registering `T` as a counted reference type.
    ///
    /// ```
    /// use angelscript_rco::{Counted, Engine};
    ///
    /// struct Dog;
    /// impl Counted for Dog {
    ///     fn type_name() -> &'static str { "Dog" }
    /// }
    ///
    /// let engine = Engine::new();
    /// let info = engine.register_object_type::<Dog>().build().unwrap();
    /// assert_eq!(info.name, "Dog");
    /// ```
    pub fn register_object_type<T: Counted>(&self) -> ObjectTypeBuilder<'_, T> {
        ObjectTypeBuilder::new(self)
    }

    pub(crate) fn register_type(
        &self,
        info: TypeInfo,
        factories: Vec<Factory>,
        gc: Option<GcCallbacks>,
    ) -> Result<Rc<TypeInfo>, RegistrationError> {
        let info = self.inner.registry.borrow_mut().register(info)?;
        if !factories.is_empty() {
            self.inner.factories.borrow_mut().insert(info.hash, factories);
        }
        if let Some(callbacks) = gc {
            self.inner.gc_callbacks.borrow_mut().insert(info.hash, callbacks);
        }
        Ok(info)
    }

    /// Register the generic handle value type under its default name.
    pub fn register_handle_type(&self) -> Result<Rc<TypeInfo>, RegistrationError> {
        self.register_handle_type_as(DEFAULT_HANDLE_TYPE_NAME)
    }

    /// Register the generic handle value type under a custom name.
    pub fn register_handle_type_as(&self, name: &str) -> Result<Rc<TypeInfo>, RegistrationError> {
        let info = self.register_type(handle_type_info(name), Vec::new(), None)?;
        *self.inner.handle_type.borrow_mut() = Some(Rc::clone(&info));
        Ok(info)
    }

    /// The registered handle type, if any.
    pub fn handle_type(&self) -> Option<Rc<TypeInfo>> {
        self.inner.handle_type.borrow().clone()
    }

    /// Descriptor of a native type.
    pub fn type_info<T: Counted>(&self) -> Option<Rc<TypeInfo>> {
        self.type_info_by_hash(T::type_hash())
    }

    /// Descriptor by hash.
    pub fn type_info_by_hash(&self, hash: TypeHash) -> Option<Rc<TypeInfo>> {
        self.inner.registry.borrow().get(hash).cloned()
    }

    /// Descriptor by script name.
    pub fn type_info_by_name(&self, name: &str) -> Option<Rc<TypeInfo>> {
        self.inner.registry.borrow().get_by_name(name).cloned()
    }

    // =========================================================================
    // Object creation
    // =========================================================================

    /// Allocate a new counted object with a reference count of one.
    ///
    /// The returned [`Owned`] carries that initial reference.
    pub fn create<T: Counted>(&self, value: T) -> Result<Owned<T>, RuntimeError> {
        let type_info = self
            .type_info::<T>()
            .ok_or_else(|| RuntimeError::TypeNotRegistered(T::type_name().to_string()))?;

        let object = self.inner.heap.borrow_mut().allocate(type_info.hash, value);
        let value = self
            .get::<T>(object)
            .ok_or_else(|| RuntimeError::TypeNotRegistered(T::type_name().to_string()))?;

        if self.trace_enabled() {
            trace!("create {} '{}' refcount=1", object, type_info.name);
        }
        Ok(Owned::new(
            CountedRef {
                engine: self.clone(),
                object,
                type_info,
            },
            value,
        ))
    }

    /// Invoke the first registered factory of `type_name`.
    ///
    /// The factory's [`FactoryContract`] decides whether the engine has to
    /// add a reference before handing the object to the caller.
    pub fn call_factory(&self, type_name: &str, args: &[Dynamic]) -> Result<OwnedRef, RuntimeError> {
        let type_info = self
            .type_info_by_name(type_name)
            .ok_or_else(|| RuntimeError::TypeNotRegistered(type_name.to_string()))?;

        let factory = self
            .inner
            .factories
            .borrow()
            .get(&type_info.hash)
            .and_then(|factories| factories.first().cloned())
            .ok_or_else(|| RuntimeError::NoFactory(type_name.to_string()))?;

        let object = (factory.func)(self, args)?;
        let matches = self.inner.registry.borrow().can_cast(object.type_hash, type_info.hash);
        if !matches {
            if factory.contract == FactoryContract::Transfers {
                self.release(object);
            }
            return Err(RuntimeError::FactoryFailed {
                type_name: type_name.to_string(),
                reason: format!("factory returned an object of type {}", object.type_hash),
            });
        }

        match factory.contract {
            FactoryContract::Transfers => {}
            FactoryContract::Borrowed => {
                self.add_ref_script_object(object, &type_info);
            }
        }

        if !self.is_alive(object) {
            return Err(RuntimeError::FactoryFailed {
                type_name: type_name.to_string(),
                reason: "factory returned a destroyed object".to_string(),
            });
        }
        Ok(OwnedRef::new(CountedRef {
            engine: self.clone(),
            object,
            type_info,
        }))
    }

    /// Take ownership of a raw reference whose count already includes the caller.
    ///
    /// This is the receiving side of [`OwnedRef::into_raw`]: no increment is
    /// made. Returns `None` for stale references or unregistered types.
    pub fn adopt(&self, object: ObjectRef) -> Option<OwnedRef> {
        if !self.is_alive(object) {
            return None;
        }
        let type_info = self.type_info_by_hash(object.type_hash)?;
        Some(OwnedRef::new(CountedRef {
            engine: self.clone(),
            object,
            type_info,
        }))
    }

    /// Take a new reference to an object the caller does not own.
    ///
    /// The count is incremented. Returns `None` for stale references or
    /// unregistered types.
    pub fn retain(&self, object: ObjectRef) -> Option<OwnedRef> {
        let type_info = self.type_info_by_hash(object.type_hash)?;
        if !self.add_ref(object) {
            return None;
        }
        Some(OwnedRef::new(CountedRef {
            engine: self.clone(),
            object,
            type_info,
        }))
    }

    /// Shared access to an object's value. The `Rc` is not a counted reference.
    pub(crate) fn get<T: Counted>(&self, object: ObjectRef) -> Option<Rc<T>> {
        self.inner.heap.borrow().get::<T>(object)
    }

    // =========================================================================
    // Reference counting
    // =========================================================================

    /// AddRef behavior: increment the count. Returns false for a stale reference.
    pub fn add_ref(&self, object: ObjectRef) -> bool {
        let added = self.inner.heap.borrow_mut().add_ref(object);
        if self.trace_enabled() {
            trace!("add_ref {} refcount={:?}", object, self.ref_count(object));
        }
        if !added {
            warn!("add_ref on stale object {}", object);
        }
        added
    }

    /// Release behavior: decrement the count, destroying the object at zero.
    ///
    /// Returns true if the object was destroyed. The destructor runs after
    /// the heap is unlocked, so it may release further objects.
    pub fn release(&self, object: ObjectRef) -> bool {
        let released = self.inner.heap.borrow_mut().release(object);
        match released {
            Released::Decremented(count) => {
                if self.trace_enabled() {
                    trace!("release {} refcount={}", object, count);
                }
                false
            }
            Released::Destroyed(value) => {
                debug!("destroying {} ({})", object, self.type_name_of(object.type_hash));
                drop(value);
                true
            }
            Released::Stale => {
                warn!("release on stale object {}", object);
                false
            }
        }
    }

    /// Increment through the descriptor, like `AddRefScriptObject`.
    ///
    /// Types that are not reference counted are left alone.
    pub fn add_ref_script_object(&self, object: ObjectRef, type_info: &TypeInfo) -> bool {
        if !type_info.is_reference() || type_info.behaviors.addref.is_none() {
            return false;
        }
        self.add_ref(object)
    }

    /// Decrement through the descriptor, like `ReleaseScriptObject`.
    pub fn release_script_object(&self, object: ObjectRef, type_info: &TypeInfo) -> bool {
        if !type_info.is_reference() || type_info.behaviors.release.is_none() {
            return false;
        }
        self.release(object)
    }

    /// Cast a reference from one descriptor to another, like `RefCastObject`.
    ///
    /// Succeeds when `to` is the object's concrete type or one of its
    /// registered bases. The result carries a fresh reference; on failure
    /// nothing is incremented.
    pub fn ref_cast_object(&self, object: ObjectRef, from: &TypeInfo, to: &Rc<TypeInfo>) -> Option<OwnedRef> {
        let allowed = self.inner.registry.borrow().can_cast(object.type_hash, to.hash);
        if self.trace_enabled() {
            trace!("ref_cast {} '{}' -> '{}': {}", object, from.name, to.name, allowed);
        }
        if !allowed || !self.add_ref_script_object(object, to) {
            return None;
        }
        Some(OwnedRef::new(CountedRef {
            engine: self.clone(),
            object,
            type_info: Rc::clone(to),
        }))
    }

    /// Current reference count, or `None` if the object is gone.
    pub fn ref_count(&self, object: ObjectRef) -> Option<u32> {
        self.inner.heap.borrow().ref_count(object)
    }

    /// True if the reference points at a live object.
    pub fn is_alive(&self, object: ObjectRef) -> bool {
        self.inner.heap.borrow().contains(object)
    }

    /// Number of live objects.
    pub fn live_objects(&self) -> usize {
        self.inner.heap.borrow().live_count()
    }

    /// References to every live object.
    pub fn live_refs(&self) -> Vec<ObjectRef> {
        self.inner.heap.borrow().live_refs()
    }

    fn type_name_of(&self, hash: TypeHash) -> String {
        self.inner
            .registry
            .borrow()
            .get(hash)
            .map(|info| info.name.clone())
            .unwrap_or_else(|| hash.to_string())
    }

    // =========================================================================
    // Execution context
    // =========================================================================

    /// Activate an execution context.
    ///
    /// Operations that interpret opaque host values take the returned
    /// guard. Only one context can be active per engine at a time.
    pub fn prepare_context(&self) -> Result<ActiveContext<'_>, RuntimeError> {
        if self.inner.context_active.replace(true) {
            return Err(RuntimeError::ContextActive);
        }
        Ok(ActiveContext::new(self))
    }

    pub(crate) fn end_context(&self) {
        self.inner.context_active.set(false);
    }

    /// True while a context is active.
    pub fn has_active_context(&self) -> bool {
        self.inner.context_active.get()
    }

    // =========================================================================
    // Garbage collection callbacks
    // =========================================================================

    /// ENUMREFS behavior: report every reference the object holds.
    ///
    /// Returns false if the object is gone or its type does not take part in
    /// cycle collection.
    pub fn gc_enum_references(&self, object: ObjectRef, visitor: &mut dyn GcVisitor) -> bool {
        let Some(callbacks) = self.inner.gc_callbacks.borrow().get(&object.type_hash).copied() else {
            return false;
        };
        let Some(value) = self.inner.heap.borrow().get_any(object) else {
            return false;
        };
        (callbacks.enum_refs)(&*value, visitor);
        true
    }

    /// RELEASEREFS behavior: make the object drop every reference it holds.
    ///
    /// The object itself is kept alive for the duration of the call even if
    /// releasing its references drops its own count to zero.
    pub fn gc_release_references(&self, object: ObjectRef) -> bool {
        let Some(callbacks) = self.inner.gc_callbacks.borrow().get(&object.type_hash).copied() else {
            return false;
        };
        let Some(value) = self.inner.heap.borrow().get_any(object) else {
            return false;
        };
        debug!("releasing references held by {}", object);
        (callbacks.release_refs)(&*value);
        true
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("types", &self.inner.registry.borrow().len())
            .field("heap", &*self.inner.heap.borrow())
            .finish()
    }
}
