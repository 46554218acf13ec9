//! Error types for type registration and host-side runtime operations.
//!
//! ## Error Hierarchy
//!
//! ```text
//! RcoError (top-level wrapper)
//! ├── RegistrationError - type/behavior registration errors
//! └── RuntimeError      - recoverable failures of host-facing operations
//! ```
//!
//! Contract violations of the handle protocol itself (dereferencing a null
//! pointer, releasing past zero) are not represented here. They are either
//! prevented structurally or treated as panics.

use thiserror::Error;

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors that occur while registering types with an engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A referenced type was not found.
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// A type with this name already exists.
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    /// The declared base type cannot be used as a base.
    #[error("type '{type_name}' cannot derive from '{base}': {reason}")]
    InvalidBase {
        /// The type being registered.
        type_name: String,
        /// The requested base type.
        base: String,
        /// Why the base was rejected.
        reason: &'static str,
    },

    /// Required behaviors are missing for this type kind.
    #[error("type '{type_name}' is missing required behaviors: {}", missing.join(", "))]
    MissingBehaviors {
        /// The type name.
        type_name: String,
        /// List of missing behavior names.
        missing: Vec<&'static str>,
    },
}

// ============================================================================
// Runtime Errors
// ============================================================================

/// Recoverable errors raised by host-facing operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// An object was created for a type that was never registered.
    #[error("type '{0}' is not registered with this engine")]
    TypeNotRegistered(String),

    /// A factory was requested for a type that has none.
    #[error("type '{0}' has no factory behavior")]
    NoFactory(String),

    /// A factory ran but could not produce an object.
    #[error("factory for '{type_name}' failed: {reason}")]
    FactoryFailed {
        /// The type whose factory failed.
        type_name: String,
        /// Description of the failure.
        reason: String,
    },

    /// A host value that is not a reference was given where a handle was expected.
    #[error("value of type '{0}' cannot be held by a handle")]
    NotAReference(&'static str),

    /// A host value referred to an object that has already been destroyed.
    #[error("object {0} has been destroyed")]
    DeadObject(String),

    /// A second execution context was requested while one is still active.
    #[error("an execution context is already active on this engine")]
    ContextActive,
}

// ============================================================================
// Top-level Error
// ============================================================================

/// Unified error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RcoError {
    /// Registration error.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Runtime error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Result alias for operations that can fail in either phase.
pub type RcoResult<T> = Result<T, RcoError>;
