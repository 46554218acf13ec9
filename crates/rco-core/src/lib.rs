//! Core data structures for reference-counted script objects.
//!
//! This crate holds everything that does not need to know about handles:
//!
//! - [`TypeHash`]: deterministic type identity
//! - [`TypeInfo`]: runtime type descriptor with flags and behaviors
//! - [`TypeRegistry`]: descriptor table and single-hierarchy cast rules
//! - [`ObjectHeap`]: generational arena holding counted objects
//! - [`EngineProperties`]: engine configuration
//! - Error types shared by the workspace

mod error;
mod object_heap;
mod properties;
mod registry;
mod type_hash;
mod type_info;

pub use error::{RcoError, RcoResult, RegistrationError, RuntimeError};
pub use object_heap::{ObjectHeap, ObjectRef, Released};
pub use properties::{EngineProperties, EngineProperty};
pub use registry::TypeRegistry;
pub use type_hash::{TypeHash, hash_constants};
pub use type_info::{BehaviorDecl, TypeBehaviors, TypeFlags, TypeInfo, TypeKind};
