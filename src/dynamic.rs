//! Host values passed through `?&in` parameters.

use std::fmt;

use rco_core::ObjectRef;

use crate::Handle;

/// A value handed over by the host together with its runtime type.
///
/// This is what a variable-type parameter (`const ?&in`) carries: the
/// handle operations that accept one inspect the variant to decide whether
/// the value is null, an object, an object handle, or another generic
/// handle whose content must be unwrapped.
///
/// Dynamic does not implement Clone because a contained [`Handle`] owns a
/// reference; copying it must go through `Handle::clone`.
pub enum Dynamic {
    /// Void/empty
    Void,
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// String value (owned)
    String(String),
    /// An object passed by reference
    Object(ObjectRef),
    /// An object handle (`@`), dereferenced to the object it points at
    ObjectHandle(ObjectRef),
    /// A generic handle value
    Handle(Handle),
    /// Null handle
    NullHandle,
}

impl Dynamic {
    /// Get a human-readable name for this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Void => "void",
            Dynamic::Int(_) => "int",
            Dynamic::Float(_) => "float",
            Dynamic::Bool(_) => "bool",
            Dynamic::String(_) => "string",
            Dynamic::Object(_) => "object",
            Dynamic::ObjectHandle(_) => "object@",
            Dynamic::Handle(_) => "handle",
            Dynamic::NullHandle => "null",
        }
    }

    /// Check if this value is void.
    pub fn is_void(&self) -> bool {
        matches!(self, Dynamic::Void)
    }

    /// Check if this value is the null handle.
    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::NullHandle)
    }

    /// The object this value refers to, after unwrapping handles.
    pub fn object_ref(&self) -> Option<ObjectRef> {
        match self {
            Dynamic::Object(obj) | Dynamic::ObjectHandle(obj) => Some(*obj),
            Dynamic::Handle(handle) => handle.object_ref(),
            _ => None,
        }
    }

    /// The string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dynamic::Void => write!(f, "Void"),
            Dynamic::Int(v) => write!(f, "Int({})", v),
            Dynamic::Float(v) => write!(f, "Float({})", v),
            Dynamic::Bool(v) => write!(f, "Bool({})", v),
            Dynamic::String(s) => write!(f, "String({:?})", s),
            Dynamic::Object(obj) => write!(f, "Object({})", obj),
            Dynamic::ObjectHandle(obj) => write!(f, "ObjectHandle({})", obj),
            Dynamic::Handle(h) => write!(f, "Handle({:?})", h),
            Dynamic::NullHandle => write!(f, "NullHandle"),
        }
    }
}

impl From<Handle> for Dynamic {
    fn from(handle: Handle) -> Self {
        Dynamic::Handle(handle)
    }
}
