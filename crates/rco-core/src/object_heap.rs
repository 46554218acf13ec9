//! Generational arena for reference-counted objects.
//!
//! Every counted object lives in a heap slot next to its reference count.
//! A new object starts with a count of one, owned by its creator. When the
//! count drops to zero the value is taken out of the slot and the slot's
//! generation is bumped, so stale [`ObjectRef`]s can never reach the next
//! occupant.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::TypeHash;

/// Raw reference to a heap object.
///
/// This is the equivalent of a bare object pointer: copyable, non-owning,
/// and never counted by itself. The generational index makes use after
/// destruction detectable instead of undefined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Index into ObjectHeap.slots
    pub index: u32,
    /// Generation for use-after-free detection
    pub generation: u32,
    /// Concrete type of the referenced object
    pub type_hash: TypeHash,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(index: u32, generation: u32, type_hash: TypeHash) -> Self {
        Self {
            index,
            generation,
            type_hash,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Outcome of [`ObjectHeap::release`].
pub enum Released {
    /// The count was decremented and is still positive.
    Decremented(u32),
    /// The count reached zero. The value has left the heap; dropping it
    /// destroys the object.
    Destroyed(Rc<dyn Any>),
    /// The reference was stale or never valid. Nothing changed.
    Stale,
}

impl fmt::Debug for Released {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Released::Decremented(n) => write!(f, "Decremented({})", n),
            Released::Destroyed(_) => write!(f, "Destroyed(..)"),
            Released::Stale => write!(f, "Stale"),
        }
    }
}

/// Heap storage for counted objects with generational indices.
pub struct ObjectHeap {
    slots: Vec<HeapSlot>,
    free_list: Vec<u32>,
}

struct HeapSlot {
    generation: u32,
    type_hash: TypeHash,
    value: Option<Rc<dyn Any>>,
    ref_count: u32,
}

impl ObjectHeap {
    /// Create a new empty object heap.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty heap with room for `capacity` objects.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
        }
    }

    /// Allocate a new object with a reference count of one.
    pub fn allocate<T: Any>(&mut self, type_hash: TypeHash, value: T) -> ObjectRef {
        let value: Rc<dyn Any> = Rc::new(value);

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.type_hash = type_hash;
            slot.value = Some(value);
            slot.ref_count = 1;
            ObjectRef::new(index, slot.generation, type_hash)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(HeapSlot {
                generation: 0,
                type_hash,
                value: Some(value),
                ref_count: 1,
            });
            ObjectRef::new(index, 0, type_hash)
        }
    }

    fn live_slot(&self, obj: ObjectRef) -> Option<&HeapSlot> {
        self.slots
            .get(obj.index as usize)
            .filter(|slot| slot.generation == obj.generation && slot.value.is_some())
    }

    fn live_slot_mut(&mut self, obj: ObjectRef) -> Option<&mut HeapSlot> {
        self.slots
            .get_mut(obj.index as usize)
            .filter(|slot| slot.generation == obj.generation && slot.value.is_some())
    }

    /// Get a shared pointer to the object's value.
    ///
    /// Returns None if the reference is stale or the type doesn't match.
    /// The returned `Rc` does not count as a reference.
    pub fn get<T: Any>(&self, obj: ObjectRef) -> Option<Rc<T>> {
        let value = self.live_slot(obj)?.value.clone()?;
        value.downcast::<T>().ok()
    }

    /// Get the type-erased value.
    pub fn get_any(&self, obj: ObjectRef) -> Option<Rc<dyn Any>> {
        self.live_slot(obj)?.value.clone()
    }

    /// Increment reference count.
    ///
    /// Returns false if the reference is stale or the count would overflow.
    pub fn add_ref(&mut self, obj: ObjectRef) -> bool {
        match self.live_slot_mut(obj) {
            Some(slot) => match slot.ref_count.checked_add(1) {
                Some(count) => {
                    slot.ref_count = count;
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Decrement reference count, evicting the value at zero.
    ///
    /// The evicted value is handed back instead of dropped here, so that its
    /// destructor can run after the caller has released any borrow of the heap.
    pub fn release(&mut self, obj: ObjectRef) -> Released {
        let Some(slot) = self.live_slot_mut(obj) else {
            return Released::Stale;
        };

        slot.ref_count -= 1;
        if slot.ref_count > 0 {
            return Released::Decremented(slot.ref_count);
        }

        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(obj.index);
        match value {
            Some(value) => Released::Destroyed(value),
            None => Released::Stale,
        }
    }

    /// Get the reference count for an object.
    pub fn ref_count(&self, obj: ObjectRef) -> Option<u32> {
        self.live_slot(obj).map(|slot| slot.ref_count)
    }

    /// Check whether the reference still points at a live object.
    pub fn contains(&self, obj: ObjectRef) -> bool {
        self.live_slot(obj).is_some()
    }

    /// Number of live objects.
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// References to every live object, in slot order.
    pub fn live_refs(&self) -> Vec<ObjectRef> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.value.is_some())
            .map(|(index, slot)| ObjectRef::new(index as u32, slot.generation, slot.type_hash))
            .collect()
    }
}

impl Default for ObjectHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHeap")
            .field("slot_count", &self.slots.len())
            .field("free_count", &self.free_list.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_hash() -> TypeHash {
        TypeHash::from_name("int")
    }

    #[test]
    fn allocate_starts_at_one() {
        let mut heap = ObjectHeap::new();
        let obj = heap.allocate(int_hash(), 42i32);
        assert_eq!(heap.ref_count(obj), Some(1));
        assert_eq!(obj.type_hash, int_hash());
        assert_eq!(heap.get::<i32>(obj).as_deref(), Some(&42));
    }

    #[test]
    fn get_wrong_type() {
        let mut heap = ObjectHeap::new();
        let obj = heap.allocate(int_hash(), 42i32);
        assert!(heap.get::<String>(obj).is_none());
    }

    #[test]
    fn ref_counting() {
        let mut heap = ObjectHeap::new();
        let obj = heap.allocate(int_hash(), 42i32);

        assert!(heap.add_ref(obj));
        assert_eq!(heap.ref_count(obj), Some(2));

        assert!(matches!(heap.release(obj), Released::Decremented(1)));
        assert_eq!(heap.ref_count(obj), Some(1));

        assert!(matches!(heap.release(obj), Released::Destroyed(_)));
        assert_eq!(heap.ref_count(obj), None);
        assert!(heap.get::<i32>(obj).is_none());
    }

    #[test]
    fn release_hands_back_value() {
        let mut heap = ObjectHeap::new();
        let obj = heap.allocate(int_hash(), 7i32);
        match heap.release(obj) {
            Released::Destroyed(value) => assert_eq!(value.downcast_ref::<i32>(), Some(&7)),
            other => panic!("expected Destroyed, got {:?}", other),
        }
    }

    #[test]
    fn generational_refs() {
        let mut heap = ObjectHeap::new();
        let first = heap.allocate(int_hash(), 42i32);
        let _ = heap.release(first);

        let second = heap.allocate(int_hash(), 100i32);
        assert_eq!(first.index, second.index);
        assert_ne!(first.generation, second.generation);

        assert!(heap.get::<i32>(first).is_none());
        assert_eq!(heap.get::<i32>(second).as_deref(), Some(&100));
    }

    #[test]
    fn stale_refs_are_ignored() {
        let mut heap = ObjectHeap::new();
        let obj = heap.allocate(int_hash(), 42i32);
        let _ = heap.release(obj);

        assert!(!heap.add_ref(obj));
        assert!(matches!(heap.release(obj), Released::Stale));
        assert!(!heap.contains(obj));
    }

    #[test]
    fn add_ref_refuses_overflow() {
        let mut heap = ObjectHeap::new();
        let obj = heap.allocate(int_hash(), 42i32);
        heap.slots[obj.index as usize].ref_count = u32::MAX;

        assert!(!heap.add_ref(obj));
        assert_eq!(heap.ref_count(obj), Some(u32::MAX));
        assert!(matches!(heap.release(obj), Released::Decremented(n) if n == u32::MAX - 1));
    }

    #[test]
    fn invalid_refs_are_ignored() {
        let mut heap = ObjectHeap::new();
        let fake = ObjectRef::new(999, 0, int_hash());
        assert!(!heap.add_ref(fake));
        assert!(matches!(heap.release(fake), Released::Stale));
        assert!(heap.ref_count(fake).is_none());
    }

    #[test]
    fn live_tracking() {
        let mut heap = ObjectHeap::with_capacity(4);
        let a = heap.allocate(int_hash(), 1i32);
        let b = heap.allocate(int_hash(), 2i32);
        assert_eq!(heap.live_count(), 2);
        assert_eq!(heap.live_refs(), vec![a, b]);

        let _ = heap.release(a);
        assert_eq!(heap.live_count(), 1);
        assert_eq!(heap.live_refs(), vec![b]);
    }

    #[test]
    fn heap_debug() {
        let heap = ObjectHeap::default();
        assert_eq!(
            format!("{:?}", heap),
            "ObjectHeap { slot_count: 0, free_count: 0 }"
        );
    }

    #[test]
    fn object_ref_display() {
        let obj = ObjectRef::new(3, 2, int_hash());
        assert_eq!(obj.to_string(), "#3.2");
    }
}
