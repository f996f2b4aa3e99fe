//! Engine asset sources used to resolve texture keys.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::texture::{Texture, TextureHandle, asset_name};

/// Where textures come from: the engine's packaged asset store plus plain
/// image files on disk.
pub trait AssetSource: Send + Sync {
    /// Load the asset stored under an exact identifier such as
    /// `"UI/Backgrounds/Blood/splat1"`.
    fn load_by_identifier(&self, identifier: &str) -> Option<TextureHandle>;

    /// All textures at or below `namespace`.
    fn load_all_by_namespace(&self, namespace: &str) -> Vec<TextureHandle>;

    /// Decode an image file. Missing or unreadable files yield `None`.
    fn load_from_filesystem_path(&self, path: &Path) -> Option<TextureHandle> {
        match Texture::open(path) {
            Ok(texture) => Some(Arc::new(texture)),
            Err(err) => {
                debug!("Could not load {}: {err}", path.display());
                None
            }
        }
    }
}

/// In-memory asset store keyed by full identifier.
#[derive(Debug, Default, Clone)]
pub struct MemoryAssets {
    assets: HashMap<String, TextureHandle>,
}

impl MemoryAssets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a texture under `identifier`. Its name becomes the final
    /// segment of the identifier.
    pub fn insert(&mut self, identifier: impl Into<String>, mut texture: Texture) -> TextureHandle {
        let identifier = identifier.into();
        asset_name(&identifier).clone_into(&mut texture.name);
        let handle = Arc::new(texture);
        self.assets.insert(identifier, Arc::clone(&handle));
        handle
    }

    /// Builder form of [`MemoryAssets::insert`].
    #[must_use]
    pub fn with(mut self, identifier: impl Into<String>, texture: Texture) -> Self {
        self.insert(identifier, texture);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetSource for MemoryAssets {
    fn load_by_identifier(&self, identifier: &str) -> Option<TextureHandle> {
        self.assets.get(identifier).cloned()
    }

    fn load_all_by_namespace(&self, namespace: &str) -> Vec<TextureHandle> {
        let prefix = format!("{}/", namespace.trim_end_matches('/'));
        let mut found: Vec<_> = self
            .assets
            .iter()
            .filter(|(identifier, _)| identifier.starts_with(&prefix))
            .collect();
        found.sort_by(|a, b| a.0.cmp(b.0));
        found.into_iter().map(|(_, texture)| Arc::clone(texture)).collect()
    }
}

impl<T: AssetSource + ?Sized> AssetSource for Arc<T> {
    fn load_by_identifier(&self, identifier: &str) -> Option<TextureHandle> {
        (**self).load_by_identifier(identifier)
    }

    fn load_all_by_namespace(&self, namespace: &str) -> Vec<TextureHandle> {
        (**self).load_all_by_namespace(namespace)
    }

    fn load_from_filesystem_path(&self, path: &Path) -> Option<TextureHandle> {
        (**self).load_from_filesystem_path(path)
    }
}
