//! A single-occupant holding slot for counted objects.
//!
//! A [`Slot`] is explicit host state that functions receive by reference
//! instead of reaching for a global. It keeps the first object put into it
//! and turns later arrivals away until it is cleared.

use log::{debug, info};

use crate::counted::{Counted, Owned};
use crate::handle::Handle;
use crate::ptr::TypedPtr;

/// What a [`Slot::put`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOutcome {
    /// The slot was empty and now holds the newcomer.
    Stored,
    /// The slot was occupied by another object; the newcomer was dropped.
    Discarded,
    /// A null was put into an occupied slot, releasing the occupant.
    Cleared,
    /// Nothing changed.
    Unchanged,
}

/// Holds at most one `T`.
pub struct Slot<T: Counted> {
    occupant: TypedPtr<T>,
}

impl<T: Counted> Slot<T> {
    /// An empty slot.
    pub const fn new() -> Self {
        Self {
            occupant: TypedPtr::null(),
        }
    }

    /// Offer a pointer to the slot, which takes over its reference.
    pub fn put(&mut self, newcomer: TypedPtr<T>) -> SlotOutcome {
        match (self.occupant.is_some(), newcomer.is_some()) {
            (false, false) => SlotOutcome::Unchanged,
            (false, true) => {
                debug!("{} slot: stored {:?}", T::type_name(), newcomer.object_ref());
                self.occupant = newcomer;
                SlotOutcome::Stored
            }
            (true, false) => {
                debug!("{} slot: cleared", T::type_name());
                self.occupant.reset();
                SlotOutcome::Cleared
            }
            (true, true) if self.occupant == newcomer => SlotOutcome::Unchanged,
            (true, true) => {
                info!("{} slot occupied! discarding {:?}", T::type_name(), newcomer.object_ref());
                SlotOutcome::Discarded
            }
        }
    }

    /// Offer a reference the host already counted for the slot.
    pub fn put_owned(&mut self, owned: Option<Owned<T>>) -> SlotOutcome {
        self.put(owned.map_or_else(TypedPtr::null, TypedPtr::from))
    }

    /// Offer the object behind a generic handle.
    ///
    /// A handle to an object that is not a `T` is turned away like an
    /// occupied-slot newcomer and reported as [`SlotOutcome::Discarded`].
    pub fn put_handle(&mut self, handle: &Handle) -> SlotOutcome {
        if handle.is_null() {
            return self.put(TypedPtr::null());
        }
        match handle.cast_to::<T>() {
            Some(ptr) => self.put(ptr),
            None => {
                info!("{} slot: discarding handle of another type", T::type_name());
                SlotOutcome::Discarded
            }
        }
    }

    /// A copy of the occupant.
    pub fn fetch(&self) -> TypedPtr<T> {
        self.occupant.clone()
    }

    /// The occupant as a generic handle.
    pub fn fetch_handle(&self) -> Handle {
        Handle::from(&self.occupant)
    }

    /// A reference to the occupant counted for the receiving host.
    pub fn fetch_owned(&self) -> Option<Owned<T>> {
        self.occupant.to_owned_ref()
    }

    /// Release the occupant.
    pub fn clear(&mut self) {
        self.occupant.reset();
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }
}

impl<T: Counted> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Counted> std::fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot").field("occupant", &self.occupant).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Engine;

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
    fn put_policy() {
        let engine = engine();
        let mut slot = Slot::new();

        assert_eq!(slot.put(TypedPtr::null()), SlotOutcome::Unchanged);

        let x = TypedPtr::from(engine.create(Horse).unwrap());
        let x_obj = x.object_ref().unwrap();
        assert_eq!(slot.put(x.clone()), SlotOutcome::Stored);
        assert_eq!(engine.ref_count(x_obj), Some(2));

        assert_eq!(slot.put(x.clone()), SlotOutcome::Unchanged);
        assert_eq!(engine.ref_count(x_obj), Some(2));

        let y = engine.create(Horse).unwrap();
        let y_obj = y.object_ref();
        assert_eq!(slot.put_owned(Some(y)), SlotOutcome::Discarded);
        assert!(!engine.is_alive(y_obj));

        assert_eq!(slot.put(TypedPtr::null()), SlotOutcome::Cleared);
        assert!(!slot.is_occupied());
        assert_eq!(engine.ref_count(x_obj), Some(1));
    }

    #[test]
    fn fetch_variants_count_for_receiver() {
        let engine = engine();
        let mut slot = Slot::new();
        let owned = engine.create(Horse).unwrap();
        let obj = owned.object_ref();
        slot.put_owned(Some(owned));
        assert_eq!(engine.ref_count(obj), Some(1));

        let copy = slot.fetch();
        assert_eq!(engine.ref_count(obj), Some(2));
        let handle = slot.fetch_handle();
        assert_eq!(engine.ref_count(obj), Some(3));
        let raw = slot.fetch_owned().unwrap().into_raw();
        assert_eq!(engine.ref_count(obj), Some(4));

        drop(copy);
        drop(handle);
        engine.release(raw);
        assert_eq!(engine.ref_count(obj), Some(1));
        slot.clear();
        assert!(!engine.is_alive(obj));
    }

    #[test]
    fn put_handle_checks_type() {
        let engine = engine();
        let mut slot: Slot<Horse> = Slot::new();

        let bird = Handle::from(engine.create(Bird).unwrap());
        assert_eq!(slot.put_handle(&bird), SlotOutcome::Discarded);
        assert!(!slot.is_occupied());
        assert_eq!(engine.ref_count(bird.object_ref().unwrap()), Some(1));

        let horse = Handle::from(engine.create(Horse).unwrap());
        assert_eq!(slot.put_handle(&horse), SlotOutcome::Stored);
        assert_eq!(engine.ref_count(horse.object_ref().unwrap()), Some(2));

        assert_eq!(slot.put_handle(&Handle::null()), SlotOutcome::Cleared);
        assert_eq!(engine.ref_count(horse.object_ref().unwrap()), Some(1));
    }

    #[test]
    fn empty_slot_fetches_null() {
        let slot: Slot<Horse> = Slot::default();
        assert!(slot.fetch().is_null());
        assert!(slot.fetch_handle().is_null());
        assert!(slot.fetch_owned().is_none());
    }
}
