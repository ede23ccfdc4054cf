//! Named bitmaps referenced by image layers.

use parking_lot::RwLock;
use render::Surface;
use std::collections::HashMap;
use std::sync::Arc;

/// Image store keyed by source name. Images are kept premultiplied.
#[derive(Debug, Default)]
pub struct ImageStore {
    images: RwLock<HashMap<String, Arc<Surface>>>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an image, replacing any previous one with the same name.
    pub fn insert(&self, name: impl Into<String>, mut image: Surface) {
        image.premultiply();
        self.images.write().insert(name.into(), Arc::new(image));
    }

    /// Get an image by name.
    pub fn get(&self, name: &str) -> Option<Arc<Surface>> {
        self.images.read().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Surface>> {
        self.images.write().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.images.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.images.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.read().is_empty()
    }

    /// Clear all images.
    pub fn clear(&self) {
        self.images.write().clear();
    }
}
