mod common;

use std::sync::Arc;
use std::time::Duration;

use decals::{
    AssetCache, DecalKind, DecalSettings, DecalState, DecalSystem, Error, GeometryKind,
    MemoryAssets, Result, SceneTree, SenderInfo, SpawnParams, SpawnRequest, Texture,
    TextureLookup, UrlFetcher, VisualEvent,
};
use glam::Vec3;

use common::{CountingAssets, Shaders, approx_eq, png_bytes, system_with};

const URL: &str = "https://cdn.example.com/sprays/wide.png";

struct StaticFetcher(Vec<u8>);

impl UrlFetcher for StaticFetcher {
    async fn fetch_bytes(&self, _url: &str, size_limit: usize) -> Result<Vec<u8>> {
        if self.0.len() > size_limit {
            return Err(Error::PayloadTooLarge {
                limit: size_limit,
                actual: self.0.len() as u64,
            });
        }
        Ok(self.0.clone())
    }
}

struct FailingFetcher;

impl UrlFetcher for FailingFetcher {
    async fn fetch_bytes(&self, url: &str, _size_limit: usize) -> Result<Vec<u8>> {
        Err(Error::InvalidUrl(url.to_string()))
    }
}

fn sender() -> SenderInfo {
    SenderInfo {
        actor: Some(1),
        authoritative: false,
        sent_at: Duration::ZERO,
    }
}

fn spray(key: &str) -> SpawnRequest {
    SpawnRequest::Simple(
        SpawnParams::new(DecalKind::SolidSpray, key, Vec3::ZERO, Vec3::Y)
            .with_size(4.0)
            .with_owner(Some(1)),
    )
}

#[test]
fn background_alias_resolves_in_sub_namespace_and_caches_original_key() {
    let mut assets = MemoryAssets::new();
    let sky = assets.insert("UI/Backgrounds/Blood/Sky", Texture::blank("", 4, 4));
    let source = CountingAssets::new(assets);
    let mut cache = AssetCache::new(Box::new(Shaders::all()), Box::new(Arc::clone(&source)));

    let TextureLookup::Ready(first) = cache.get_or_load_texture("BG:Sky") else {
        panic!("alias did not resolve");
    };
    assert!(Arc::ptr_eq(&first.texture, &sky));
    assert!(cache.cached_texture("BG:Sky").is_some());
    assert!(cache.cached_texture("UI/Backgrounds/Blood/Sky").is_none());

    let lookups = source.lookups();
    let TextureLookup::Ready(second) = cache.get_or_load_texture("BG:Sky") else {
        panic!("cached texture missing");
    };
    assert!(Arc::ptr_eq(&first.texture, &second.texture));
    assert_eq!(source.lookups(), lookups);
}

#[test]
fn background_alias_prefers_root_namespace() {
    let mut assets = MemoryAssets::new();
    let root = assets.insert("UI/Backgrounds/Sky", Texture::blank("", 2, 2));
    assets.insert("UI/Backgrounds/Blood/Sky", Texture::blank("", 2, 2));
    let mut cache = AssetCache::new(Box::new(Shaders::all()), Box::new(assets));

    let TextureLookup::Ready(cached) = cache.get_or_load_texture("BG:Sky") else {
        panic!("alias did not resolve");
    };
    assert!(Arc::ptr_eq(&cached.texture, &root));
}

#[test]
fn loaded_texture_fits_aspect_at_spawn() {
    let assets = MemoryAssets::new().with("Decals/wide", Texture::blank("", 200, 100));
    let mut system = system_with(assets, DecalSettings::default());
    let scene = SceneTree::new();

    let id = system.receive(spray("Decals/wide"), &sender(), &scene, Duration::ZERO);

    let visual = system.visual(id).unwrap();
    assert_eq!(visual.geometry, GeometryKind::CubeProjector);
    assert!(visual.material.texture.is_some());
    let scale = visual.transform.scale;
    assert!(approx_eq(scale.x, 4.0));
    assert!(approx_eq(scale.y, 4.0));
    assert!(approx_eq(scale.z, 2.0));
    assert_eq!(system.registry().get(id).unwrap().state, DecalState::Live);
}

#[test]
fn missing_texture_keeps_flat_color() {
    let mut system = system_with(MemoryAssets::new(), DecalSettings::default());
    let scene = SceneTree::new();
    let id = system.receive(spray("nowhere/to/be/found"), &sender(), &scene, Duration::ZERO);

    let visual = system.visual(id).unwrap();
    assert!(visual.material.texture.is_none());
    assert_eq!(system.registry().get(id).unwrap().state, DecalState::Live);
    assert!(system.take_fetch_jobs().is_empty());
}

#[tokio::test]
async fn downloaded_texture_updates_waiting_decals() {
    let mut system = system_with(MemoryAssets::new(), DecalSettings::default());
    let scene = SceneTree::new();

    let first = system.receive(spray(URL), &sender(), &scene, Duration::ZERO);
    let SpawnRequest::Simple(params) = spray(URL) else {
        unreachable!()
    };
    let second = system.receive(
        SpawnRequest::Simple(params.with_owner(Some(2))),
        &sender(),
        &scene,
        Duration::ZERO,
    );
    assert_eq!(system.registry().get(first).unwrap().state, DecalState::Pending);

    let jobs = system.take_fetch_jobs();
    assert_eq!(jobs.len(), 1);
    system.drain_events();

    let fetcher = StaticFetcher(png_bytes(8, 4));
    for job in jobs {
        job.run(&fetcher).await;
    }
    system.update(Duration::from_secs(1));

    let events = system.drain_events();
    for id in [first, second] {
        assert!(events.contains(&VisualEvent::Updated(id)));
        assert_eq!(system.registry().get(id).unwrap().state, DecalState::Live);
        let visual = system.visual(id).unwrap();
        assert_eq!(visual.material.texture.as_ref().unwrap().width, 8);
        assert!(approx_eq(visual.transform.scale.z, 2.0));
    }
    assert!(system.assets().cached_texture(URL).is_some());
    assert!(!system.assets().is_fetching(URL));
}

#[tokio::test]
async fn late_texture_for_removed_decal_is_discarded() {
    let mut system = system_with(MemoryAssets::new(), DecalSettings::default());
    let scene = SceneTree::new();

    let id = system.receive(spray(URL), &sender(), &scene, Duration::ZERO);
    let jobs = system.take_fetch_jobs();
    assert!(system.destroy(id));
    system.drain_events();

    let fetcher = StaticFetcher(png_bytes(2, 2));
    for job in jobs {
        job.run(&fetcher).await;
    }
    system.update(Duration::from_secs(1));

    assert!(system.drain_events().is_empty());
    assert!(system.visual(id).is_none());
    assert!(system.assets().cached_texture(URL).is_some());

    // The next spray with the same key finds the cached texture right away.
    let again = system.receive(spray(URL), &sender(), &scene, Duration::from_secs(2));
    assert!(system.visual(again).unwrap().material.texture.is_some());
    assert!(system.take_fetch_jobs().is_empty());
}

#[tokio::test]
async fn failed_download_leaves_flat_color_and_allows_retry() {
    let mut system = system_with(MemoryAssets::new(), DecalSettings::default());
    let scene = SceneTree::new();

    let id = system.receive(spray(URL), &sender(), &scene, Duration::ZERO);
    for job in system.take_fetch_jobs() {
        job.run(&FailingFetcher).await;
    }
    system.update(Duration::from_secs(1));

    assert_eq!(system.registry().get(id).unwrap().state, DecalState::Live);
    assert!(system.visual(id).unwrap().material.texture.is_none());
    assert!(!system.assets().is_fetching(URL));

    system.receive(spray(URL), &sender(), &scene, Duration::from_secs(2));
    assert_eq!(system.take_fetch_jobs().len(), 1);
}

#[tokio::test]
async fn oversized_download_is_rejected() {
    let settings = DecalSettings {
        texture_size_limit: 16,
        ..DecalSettings::default()
    };
    let mut system = system_with(MemoryAssets::new(), settings);
    let scene = SceneTree::new();

    let id = system.receive(spray(URL), &sender(), &scene, Duration::ZERO);
    let jobs = system.take_fetch_jobs();
    assert_eq!(jobs[0].size_limit, 16);
    for job in jobs {
        job.run(&StaticFetcher(png_bytes(16, 16))).await;
    }
    system.update(Duration::from_secs(1));

    assert!(system.visual(id).unwrap().material.texture.is_none());
    assert!(system.assets().cached_texture(URL).is_none());
}

#[test]
fn pre_warm_builds_templates_and_common_textures() {
    let assets = MemoryAssets::new().with("Decals/bloodsplat1", Texture::blank("", 2, 2));
    let cache = AssetCache::new(Box::new(Shaders::all()), Box::new(assets));
    let mut system = DecalSystem::new(cache, Box::new(DecalSettings::default()));

    system.pre_warm();

    assert!(system.assets().cached_texture("Decals/bloodsplat1").is_some());
    assert!(system.assets().cached_texture("Decals/cut1").is_none());
    let template = system.assets_mut().get_or_create_template(DecalKind::Generic);
    assert!(template.is_some());
}
