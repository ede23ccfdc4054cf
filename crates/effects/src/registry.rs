//! Effect plugin registry.

use crate::box_blur::BoxBlur;
use crate::directional_blur::DirectionalBlur;
use crate::plugin::EffectPlugin;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Thread-safe map from identifier to plugin, in registration order.
#[derive(Default)]
pub struct EffectRegistry {
    plugins: RwLock<IndexMap<String, Arc<dyn EffectPlugin>>>,
}

impl EffectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in blurs.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(BoxBlur));
        registry.register(Arc::new(DirectionalBlur));
        registry
    }

    /// Register a plugin, returning the one it replaced.
    pub fn register(&self, plugin: Arc<dyn EffectPlugin>) -> Option<Arc<dyn EffectPlugin>> {
        let id = plugin.identifier().to_string();
        tracing::debug!(effect = %id, "Registering effect plugin");
        self.plugins.write().insert(id, plugin)
    }

    pub fn unregister(&self, identifier: &str) -> Option<Arc<dyn EffectPlugin>> {
        self.plugins.write().shift_remove(identifier)
    }

    /// Get a plugin by identifier.
    pub fn get(&self, identifier: &str) -> Option<Arc<dyn EffectPlugin>> {
        self.plugins.read().get(identifier).cloned()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.plugins.read().contains_key(identifier)
    }

    /// Registered identifiers in registration order.
    pub fn identifiers(&self) -> Vec<String> {
        self.plugins.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("plugins", &self.identifiers())
            .finish()
    }
}
