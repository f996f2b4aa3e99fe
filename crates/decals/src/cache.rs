//! Material template and texture cache.
//!
//! Templates are built at most once per decal kind and textures are resolved
//! at most once per key. Remote textures are downloaded by [`FetchJob`]s that
//! the host runs off the frame loop; [`AssetCache::poll_fetches`] collects
//! their results on the frame loop.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::fetch::{FetchJob, FetchResult, is_texture_url};
use crate::kind::DecalKind;
use crate::loader::AssetSource;
use crate::material::{Material, MaterialTemplate, ShaderLibrary, TemplateHandle};
use crate::texture::{TextureHandle, asset_name};

/// Prefix of background aliases, `BG:<name>`.
pub const BACKGROUND_ALIAS_PREFIX: &str = "BG:";
/// Namespace background aliases resolve into.
pub const BACKGROUND_NAMESPACE: &str = "UI/Backgrounds";
/// Sub-namespaces of [`BACKGROUND_NAMESPACE`] tried after its root.
pub const BACKGROUND_SUBNAMESPACES: &[&str] = &["Blood"];
/// Namespaces searched by asset name when no exact identifier matches.
pub const NAME_SEARCH_NAMESPACES: &[&str] = &[BACKGROUND_NAMESPACE, "UI"];
/// Textures loaded during pre-warm.
pub const COMMON_TEXTURE_KEYS: &[&str] = &["Decals/bloodsplat1", "Decals/cut1"];

/// Extensions tried by the filesystem fallback, in order.
const FILESYSTEM_EXTENSIONS: &[&str] = &["png", "jpg"];

/// A resolved texture and its optional normal map.
#[derive(Debug, Clone)]
pub struct CachedTexture {
    pub texture: TextureHandle,
    pub normal_map: Option<TextureHandle>,
}

/// Result of [`AssetCache::get_or_load_texture`].
#[derive(Debug, Clone)]
pub enum TextureLookup {
    Ready(CachedTexture),
    /// A download is in flight; the texture arrives through
    /// [`AssetCache::poll_fetches`].
    Pending,
    /// Nothing resolved the key. The decal keeps its flat color.
    Missing,
}

#[derive(Debug, Clone)]
enum TemplateSlot {
    Ready(TemplateHandle),
    /// The kind's shader is missing; the kind renders as quads for the rest
    /// of the session.
    Unavailable,
}

/// Caches material templates and textures for the decal system.
pub struct AssetCache {
    shaders: Box<dyn ShaderLibrary>,
    assets: Box<dyn AssetSource>,
    /// Root for the development filesystem fallback.
    dev_root: Option<PathBuf>,
    templates: HashMap<DecalKind, TemplateSlot>,
    textures: HashMap<String, CachedTexture>,
    in_flight: HashSet<String>,
    reported_missing: HashSet<String>,
    pending_jobs: Vec<FetchJob>,
    fetch_tx: async_channel::Sender<FetchResult>,
    fetch_rx: async_channel::Receiver<FetchResult>,
    mipmaps: bool,
    size_limit: usize,
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("dev_root", &self.dev_root)
            .field("templates", &self.templates)
            .field("textures", &self.textures.len())
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl AssetCache {
    #[must_use]
    pub fn new(shaders: Box<dyn ShaderLibrary>, assets: Box<dyn AssetSource>) -> Self {
        let (fetch_tx, fetch_rx) = async_channel::unbounded();
        Self {
            shaders,
            assets,
            dev_root: None,
            templates: HashMap::new(),
            textures: HashMap::new(),
            in_flight: HashSet::new(),
            reported_missing: HashSet::new(),
            pending_jobs: Vec::new(),
            fetch_tx,
            fetch_rx,
            mipmaps: true,
            size_limit: crate::settings::DEFAULT_TEXTURE_SIZE_LIMIT,
        }
    }

    /// Enable the filesystem fallback rooted at `root`.
    #[must_use]
    pub fn with_dev_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.dev_root = Some(root.into());
        self
    }

    /// Download options for future fetch jobs.
    pub fn set_fetch_options(&mut self, mipmaps: bool, size_limit: usize) {
        self.mipmaps = mipmaps;
        self.size_limit = size_limit;
    }

    /// Template for `kind`, building it on first use.
    ///
    /// Returns `None` if the kind's projector shader is unavailable. That
    /// outcome is remembered, so the shader is looked up once per session
    /// and the warning is logged once.
    pub fn get_or_create_template(&mut self, kind: DecalKind) -> Option<TemplateHandle> {
        if let Some(slot) = self.templates.get(&kind) {
            return match slot {
                TemplateSlot::Ready(template) => Some(Arc::clone(template)),
                TemplateSlot::Unavailable => None,
            };
        }

        let shader_name = kind.policy().projector_shader;
        let slot = match self.shaders.find(shader_name) {
            Some(shader) => {
                info!("Created material template for {kind:?} from {shader_name}");
                TemplateSlot::Ready(Arc::new(MaterialTemplate::projector(shader)))
            }
            None => {
                warn!("Shader {shader_name} not found; {kind:?} decals fall back to quads");
                TemplateSlot::Unavailable
            }
        };
        self.templates.insert(kind, slot.clone());
        match slot {
            TemplateSlot::Ready(template) => Some(template),
            TemplateSlot::Unavailable => None,
        }
    }

    /// Per-decal material copied from `template`.
    #[must_use]
    pub fn instantiate_from_template(&self, template: &TemplateHandle) -> Material {
        Material::for_projector(template)
    }

    /// Texture for `key`, resolving it on first use.
    ///
    /// Resolution order: exact identifier, `BG:` alias, name search, URL
    /// download, filesystem fallback. A resolved texture is cached under the
    /// original key.
    pub fn get_or_load_texture(&mut self, key: &str) -> TextureLookup {
        if let Some(cached) = self.textures.get(key) {
            return TextureLookup::Ready(cached.clone());
        }
        if self.in_flight.contains(key) {
            return TextureLookup::Pending;
        }

        if let Some(cached) = self.resolve_local(key) {
            info!("Cached texture {key}");
            self.textures.insert(key.to_string(), cached.clone());
            return TextureLookup::Ready(cached);
        }

        if is_texture_url(key) {
            debug!("Queued texture download {key}");
            self.in_flight.insert(key.to_string());
            self.pending_jobs.push(FetchJob::new(
                key.to_string(),
                self.size_limit,
                self.mipmaps,
                self.fetch_tx.clone(),
            ));
            return TextureLookup::Pending;
        }

        if let Some(texture) = self.load_from_dev_root(key) {
            info!("Cached texture {key} from the filesystem");
            let cached = CachedTexture {
                texture,
                normal_map: None,
            };
            self.textures.insert(key.to_string(), cached.clone());
            return TextureLookup::Ready(cached);
        }

        if self.reported_missing.insert(key.to_string()) {
            warn!("Texture {key} not found; using material color only");
        }
        TextureLookup::Missing
    }

    /// The cached texture for `key`, without resolving.
    #[must_use]
    pub fn cached_texture(&self, key: &str) -> Option<&CachedTexture> {
        self.textures.get(key)
    }

    /// Whether a download for `key` is in flight.
    #[must_use]
    pub fn is_fetching(&self, key: &str) -> bool {
        self.in_flight.contains(key)
    }

    /// Build templates for `kinds` and resolve `keys` ahead of time.
    pub fn pre_warm(&mut self, kinds: &[DecalKind], keys: &[&str]) {
        for &kind in kinds {
            let _ = self.get_or_create_template(kind);
        }
        let mut ready = 0;
        for key in keys {
            if matches!(self.get_or_load_texture(key), TextureLookup::Ready(_)) {
                ready += 1;
            }
        }
        info!(
            "Pre-warmed {} decal templates and {ready}/{} textures",
            kinds.len(),
            keys.len()
        );
    }

    /// Downloads queued since the last call, for the host to run.
    pub fn take_fetch_jobs(&mut self) -> Vec<FetchJob> {
        std::mem::take(&mut self.pending_jobs)
    }

    /// Collect finished downloads. Successful ones are cached under their
    /// key; every finished key is returned so waiting decals can be updated.
    pub fn poll_fetches(&mut self) -> Vec<(String, Option<CachedTexture>)> {
        let mut finished = Vec::new();
        while let Ok(FetchResult { key, texture }) = self.fetch_rx.try_recv() {
            self.in_flight.remove(&key);
            let cached = texture.map(|texture| CachedTexture {
                texture,
                normal_map: None,
            });
            if let Some(cached) = &cached {
                info!("Cached downloaded texture {key}");
                self.textures.insert(key.clone(), cached.clone());
            }
            finished.push((key, cached));
        }
        finished
    }

    fn resolve_local(&self, key: &str) -> Option<CachedTexture> {
        let identifier = self.resolve_alias(key);
        let identifier = identifier.as_deref().unwrap_or(key);

        if let Some(texture) = self.assets.load_by_identifier(identifier) {
            let normal_map = identifier
                .contains("Blood")
                .then(|| {
                    self.assets
                        .load_by_identifier(&identifier.replace("Blood", "Normal_4"))
                })
                .flatten();
            debug!(
                "Loaded texture {identifier} (normal map: {})",
                normal_map.is_some()
            );
            return Some(CachedTexture {
                texture,
                normal_map,
            });
        }

        let name = asset_name(identifier);
        if name.is_empty() {
            return None;
        }
        NAME_SEARCH_NAMESPACES.iter().find_map(|namespace| {
            let texture = self
                .assets
                .load_all_by_namespace(namespace)
                .into_iter()
                .find(|texture| texture.name == name)?;
            debug!("Resolved texture {name} by name in {namespace}");
            Some(CachedTexture {
                texture,
                normal_map: None,
            })
        })
    }

    /// Map a `BG:<name>` alias to an identifier: the background root if it
    /// holds the asset, else the first sub-namespace that does, else the
    /// background root so the name search can run.
    fn resolve_alias(&self, key: &str) -> Option<String> {
        let name = key.strip_prefix(BACKGROUND_ALIAS_PREFIX)?;
        let candidates = std::iter::once(format!("{BACKGROUND_NAMESPACE}/{name}")).chain(
            BACKGROUND_SUBNAMESPACES
                .iter()
                .map(|sub| format!("{BACKGROUND_NAMESPACE}/{sub}/{name}")),
        );
        for candidate in candidates {
            if self.assets.load_by_identifier(&candidate).is_some() {
                return Some(candidate);
            }
        }
        Some(format!("{BACKGROUND_NAMESPACE}/{name}"))
    }

    fn load_from_dev_root(&self, key: &str) -> Option<TextureHandle> {
        let root = self.dev_root.as_ref()?;
        FILESYSTEM_EXTENSIONS.iter().find_map(|extension| {
            let path = root.join(format!("{key}.{extension}"));
            if !path.is_file() {
                return None;
            }
            let texture = self.assets.load_from_filesystem_path(&path)?;
            debug!("Loaded texture from {}", path.display());
            Some(texture)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryAssets;
    use crate::material::Shader;
    use crate::texture::Texture;

    struct Shaders(&'static [&'static str]);

    impl ShaderLibrary for Shaders {
        fn find(&self, name: &str) -> Option<Shader> {
            self.0.contains(&name).then(|| Shader::new(name))
        }
    }

    fn cache(assets: MemoryAssets) -> AssetCache {
        AssetCache::new(
            Box::new(Shaders(&["decal/projector", "decal/spray"])),
            Box::new(assets),
        )
    }

    #[test]
    fn template_is_built_once() {
        let mut cache = cache(MemoryAssets::new());
        let a = cache.get_or_create_template(DecalKind::Generic).unwrap();
        let b = cache.get_or_create_template(DecalKind::Generic).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn missing_shader_is_remembered() {
        let mut cache = cache(MemoryAssets::new());
        assert!(cache.get_or_create_template(DecalKind::SolidSpray).is_none());
        assert!(cache.get_or_create_template(DecalKind::SolidSpray).is_none());
        assert!(matches!(
            cache.templates.get(&DecalKind::SolidSpray),
            Some(TemplateSlot::Unavailable)
        ));
    }

    #[test]
    fn blood_textures_pick_up_normal_maps() {
        let assets = MemoryAssets::new()
            .with("Decals/Blood/splat", Texture::blank("", 2, 2))
            .with("Decals/Normal_4/splat", Texture::blank("", 2, 2));
        let mut cache = cache(assets);
        let TextureLookup::Ready(cached) = cache.get_or_load_texture("Decals/Blood/splat") else {
            panic!("expected a texture");
        };
        assert!(cached.normal_map.is_some());
    }

    #[test]
    fn name_search_finds_nested_assets() {
        let assets = MemoryAssets::new().with("UI/Icons/spray3", Texture::blank("", 2, 2));
        let mut cache = cache(assets);
        assert!(matches!(
            cache.get_or_load_texture("Somewhere/spray3"),
            TextureLookup::Ready(_)
        ));
        assert!(cache.cached_texture("Somewhere/spray3").is_some());
    }

    #[test]
    fn urls_are_coalesced() {
        let mut cache = cache(MemoryAssets::new());
        let url = "https://example.com/spray.png";
        assert!(matches!(cache.get_or_load_texture(url), TextureLookup::Pending));
        assert!(matches!(cache.get_or_load_texture(url), TextureLookup::Pending));
        assert_eq!(cache.take_fetch_jobs().len(), 1);
        assert!(cache.take_fetch_jobs().is_empty());
        assert!(cache.is_fetching(url));
    }

    #[test]
    fn unknown_key_is_missing() {
        let mut cache = cache(MemoryAssets::new());
        assert!(matches!(
            cache.get_or_load_texture("nothing/here"),
            TextureLookup::Missing
        ));
        assert!(cache.take_fetch_jobs().is_empty());
    }

    #[test]
    fn filesystem_fallback_prefers_png() {
        let root = std::env::temp_dir().join(format!("decals-cache-{}", std::process::id()));
        std::fs::create_dir_all(root.join("dev")).unwrap();
        image::RgbaImage::new(3, 1).save(root.join("dev/mark.png")).unwrap();

        let mut cache = cache(MemoryAssets::new()).with_dev_root(root.clone());
        let TextureLookup::Ready(cached) = cache.get_or_load_texture("dev/mark") else {
            panic!("expected a texture");
        };
        assert_eq!(cached.texture.width, 3);

        std::fs::remove_dir_all(&root).unwrap();
    }
}
