//! Engine configuration properties.

use rustc_hash::FxHashMap;

/// Configurable engine properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineProperty {
    /// Number of object slots reserved when the engine is created.
    InitHeapCapacity,
    /// Non-zero to emit a trace log line for every reference count change
    /// and handle operation.
    TraceRefCounts,
}

impl EngineProperty {
    pub fn default_value(&self) -> usize {
        match self {
            EngineProperty::InitHeapCapacity => 0,
            EngineProperty::TraceRefCounts => 0,
        }
    }
}

/// Property values of one engine. Unset properties read as their default.
#[derive(Debug, Clone, Default)]
pub struct EngineProperties {
    values: FxHashMap<EngineProperty, usize>,
}

impl EngineProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, property: EngineProperty, value: usize) -> Self {
        self.set(property, value);
        self
    }

    pub fn set(&mut self, property: EngineProperty, value: usize) {
        self.values.insert(property, value);
    }

    pub fn get(&self, property: EngineProperty) -> usize {
        self.values
            .get(&property)
            .copied()
            .unwrap_or_else(|| property.default_value())
    }

    /// Shorthand for `TraceRefCounts != 0`.
    pub fn trace_ref_counts(&self) -> bool {
        self.get(EngineProperty::TraceRefCounts) != 0
    }
}
