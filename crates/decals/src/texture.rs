//! CPU-side textures.

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;

/// Shared handle to a loaded texture. Cache hits return clones of the same
/// handle, so `Arc::ptr_eq` identifies repeats.
pub type TextureHandle = Arc<Texture>;

/// Decoded RGBA8 texture.
#[derive(Clone, PartialEq, Eq)]
pub struct Texture {
    /// Asset name, the final segment of its identifier.
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8 pixels.
    pub pixels: Vec<u8>,
    /// Whether the renderer should generate mipmaps.
    pub mipmaps: bool,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("mipmaps", &self.mipmaps)
            .finish_non_exhaustive()
    }
}

impl Texture {
    /// Transparent texture of the given size.
    #[must_use]
    pub fn blank(name: impl Into<String>, width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 4;
        Self {
            name: name.into(),
            width,
            height,
            pixels: vec![0; len],
            mipmaps: false,
        }
    }

    /// Decode PNG or JPEG bytes.
    pub fn decode(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?.into_rgba8();
        Ok(Self {
            name: name.into(),
            width: image.width(),
            height: image.height(),
            pixels: image.into_raw(),
            mipmaps: false,
        })
    }

    /// Read and decode an image file.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::decode(name, &bytes)
    }

    #[must_use]
    pub fn with_mipmaps(mut self, mipmaps: bool) -> Self {
        self.mipmaps = mipmaps;
        self
    }

    /// Width over height, or `None` for an empty texture.
    #[must_use]
    pub fn aspect(&self) -> Option<f32> {
        decal_fit::aspect_ratio(self.width, self.height)
    }
}

/// Final path segment of an asset identifier.
#[must_use]
pub fn asset_name(identifier: &str) -> &str {
    identifier.rsplit('/').next().unwrap_or(identifier)
}
