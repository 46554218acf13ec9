//! Cycle collector protocol.
//!
//! Reference counting frees everything except cycles. A host collector
//! breaks those by walking the reference graph: it asks each collectable
//! object to enumerate the references it holds, and once it has found a
//! cycle no one else can reach, asks the objects on it to release their
//! references. The collector's algorithm lives in the host; this module
//! defines the two callbacks it relies on.
//!
//! - [`GcReferences`] is implemented by values that hold references
//!   ([`Handle`](crate::Handle), [`TypedPtr`](crate::TypedPtr)).
//! - [`GcObject`] is implemented by counted objects that contain such
//!   values; the engine dispatches to it through the type descriptor.

use std::any::Any;

use rco_core::{ObjectRef, TypeHash, TypeInfo};

use crate::Counted;

/// Receives the references reported during enumeration, like `GCEnumCallback`.
pub trait GcVisitor {
    /// A referenced object.
    fn visit_object(&mut self, object: ObjectRef);

    /// The descriptor a reference is held under.
    fn visit_type(&mut self, _type_info: &TypeInfo) {}
}

/// A visitor that records everything it is shown.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReferenceCollector {
    /// Objects reported, in order.
    pub objects: Vec<ObjectRef>,
    /// Descriptors reported, in order.
    pub types: Vec<TypeHash>,
}

impl ReferenceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.types.is_empty()
    }
}

impl GcVisitor for ReferenceCollector {
    fn visit_object(&mut self, object: ObjectRef) {
        self.objects.push(object);
    }

    fn visit_type(&mut self, type_info: &TypeInfo) {
        self.types.push(type_info.hash);
    }
}

/// GC callbacks of a reference-holding value.
pub trait GcReferences {
    /// Report every held reference to the visitor. No-op when empty.
    fn enum_references(&self, visitor: &mut dyn GcVisitor);

    /// Drop every held reference. Must be idempotent.
    fn release_references(&mut self);
}

/// GC callbacks of a counted object that holds references.
///
/// Objects are shared, so releasing goes through `&self`; fields holding
/// handles are expected to sit in a `RefCell`.
pub trait GcObject: Counted {
    /// Report every reference this object holds.
    fn enum_references(&self, visitor: &mut dyn GcVisitor);

    /// Drop every reference this object holds.
    fn release_references(&self);
}

/// Type-erased GC entry points of one registered type.
#[derive(Clone, Copy)]
pub(crate) struct GcCallbacks {
    pub(crate) enum_refs: fn(&dyn Any, &mut dyn GcVisitor),
    pub(crate) release_refs: fn(&dyn Any),
}

impl GcCallbacks {
    pub(crate) fn of<T: GcObject>() -> Self {
        Self {
            enum_refs: enum_refs_thunk::<T>,
            release_refs: release_refs_thunk::<T>,
        }
    }
}

fn enum_refs_thunk<T: GcObject>(value: &dyn Any, visitor: &mut dyn GcVisitor) {
    if let Some(object) = value.downcast_ref::<T>() {
        object.enum_references(visitor);
    }
}

fn release_refs_thunk<T: GcObject>(value: &dyn Any) {
    if let Some(object) = value.downcast_ref::<T>() {
        object.release_references();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_records_objects_and_types() {
        let mut collector = ReferenceCollector::new();
        assert!(collector.is_empty());

        let info = TypeInfo::reference("Horse");
        let obj = ObjectRef::new(0, 0, info.hash);
        collector.visit_object(obj);
        collector.visit_type(&info);

        assert_eq!(collector.objects, vec![obj]);
        assert_eq!(collector.types, vec![info.hash]);
    }
}
