#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use decals::{
    AssetCache, AssetSource, DecalSettings, DecalSystem, LoopbackTransport, MemoryAssets,
    SceneTree, Shader, ShaderLibrary, TextureHandle,
};

pub const EPSILON: f32 = 1e-5;

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

/// Shader library that knows a fixed set of shaders.
pub struct Shaders(pub Vec<&'static str>);

impl Shaders {
    pub fn all() -> Self {
        Self(vec!["decal/projector", "decal/spray", "decal/spray_solid"])
    }
}

impl ShaderLibrary for Shaders {
    fn find(&self, name: &str) -> Option<Shader> {
        self.0.contains(&name).then(|| Shader::new(name))
    }
}

/// Asset source that counts lookups.
#[derive(Default)]
pub struct CountingAssets {
    pub inner: MemoryAssets,
    pub lookups: AtomicUsize,
}

impl CountingAssets {
    pub fn new(inner: MemoryAssets) -> Arc<Self> {
        Arc::new(Self {
            inner,
            lookups: AtomicUsize::new(0),
        })
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl AssetSource for CountingAssets {
    fn load_by_identifier(&self, identifier: &str) -> Option<TextureHandle> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.load_by_identifier(identifier)
    }

    fn load_all_by_namespace(&self, namespace: &str) -> Vec<TextureHandle> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.load_all_by_namespace(namespace)
    }
}

pub fn system_with(assets: MemoryAssets, settings: DecalSettings) -> DecalSystem {
    let cache = AssetCache::new(Box::new(Shaders::all()), Box::new(assets));
    DecalSystem::new(cache, Box::new(settings))
}

pub fn system(settings: DecalSettings) -> DecalSystem {
    system_with(MemoryAssets::new(), settings)
}

/// Deliver every queued broadcast to `system`, one second apart from
/// `start`.
pub fn deliver(
    system: &mut DecalSystem,
    transport: &mut LoopbackTransport,
    scene: &SceneTree,
    start: Duration,
) -> Vec<decals::DecalId> {
    let envelopes: Vec<_> = transport.drain().collect();
    envelopes
        .into_iter()
        .enumerate()
        .filter_map(|(i, envelope)| {
            let now = start + Duration::from_secs(i as u64);
            system.handle_message(envelope.message, &envelope.payload, &envelope.sender, scene, now)
        })
        .collect()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 20, 20, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}
