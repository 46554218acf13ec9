//! Active execution context guard.

use std::fmt;

use crate::Engine;

/// Proof that an execution context is active on an engine.
///
/// Interpreting an opaque host value (a reference plus a type id) needs the
/// engine of the running script. Operations that do so take an
/// `&ActiveContext`, so they cannot be called outside host-driven execution.
/// Obtained from [`Engine::prepare_context`]; the context ends when the
/// guard is dropped.
pub struct ActiveContext<'e> {
    engine: &'e Engine,
}

impl<'e> ActiveContext<'e> {
    pub(crate) fn new(engine: &'e Engine) -> Self {
        Self { engine }
    }

    /// The engine executing in this context.
    pub fn engine(&self) -> &'e Engine {
        self.engine
    }
}

impl Drop for ActiveContext<'_> {
    fn drop(&mut self) {
        self.engine.end_context();
    }
}

impl fmt::Debug for ActiveContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveContext").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_ends_context_on_drop() {
        let engine = Engine::new();
        {
            let ctx = engine.prepare_context().unwrap();
            assert!(ctx.engine().ptr_eq(&engine));
            assert!(engine.has_active_context());
        }
        assert!(!engine.has_active_context());
    }

    #[test]
    fn contexts_are_per_engine() {
        let first = Engine::new();
        let second = Engine::new();
        let _a = first.prepare_context().unwrap();
        assert!(second.prepare_context().is_ok());
    }
}
