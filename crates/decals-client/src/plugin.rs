//! Drives the decal system from the Bevy frame loop.
//!
//! Replicated messages go through an in-process loopback transport, so the
//! local player is the authoritative peer. Texture downloads run on the Tokio
//! runtime from `bevy-tokio-tasks` (reqwest requires it) and report back
//! through the cache's `async_channel`, which is drained every frame.

use std::path::PathBuf;
use std::sync::Arc;

use bevy::prelude::*;
use bevy_tokio_tasks::TokioTasksRuntime;

use decals::{
    ActorId, AssetCache, DecalSettings, DecalSystem, HttpFetcher, LoopbackTransport, MemoryAssets,
    Shader, ShaderLibrary,
};

use crate::render::{DecalEntities, sync_visuals};
use crate::scene::Hierarchy;

/// Plugin that owns the session's [`DecalSystem`].
pub struct DecalPlugin {
    pub settings: DecalSettings,
    /// Packaged textures.
    pub assets: MemoryAssets,
    /// Root of the development texture fallback, if any.
    pub dev_root: Option<PathBuf>,
    pub local_actor: ActorId,
}

impl Plugin for DecalPlugin {
    fn build(&self, app: &mut App) {
        let mut cache = AssetCache::new(Box::new(ForwardDecalShaders), Box::new(self.assets.clone()));
        if let Some(root) = &self.dev_root {
            cache = cache.with_dev_root(root.clone());
        }

        app.insert_resource(Decals {
            system: DecalSystem::new(cache, Box::new(self.settings.clone())),
            transport: LoopbackTransport::new(Some(self.local_actor), true),
            fetcher: Arc::new(HttpFetcher::new()),
        })
        .init_resource::<Hierarchy>()
        .init_resource::<DecalEntities>()
        .add_systems(Startup, pre_warm)
        .add_systems(
            Update,
            (
                deliver_messages,
                spawn_fetch_jobs,
                tick,
                cull,
                sync_visuals,
            )
                .chain()
                .in_set(DecalSet),
        );
    }
}

/// Systems that advance and mirror decals. Gameplay systems that request
/// decals run before this set.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecalSet;

/// Decal state for the running session.
#[derive(Resource)]
pub struct Decals {
    pub system: DecalSystem,
    pub transport: LoopbackTransport,
    fetcher: Arc<HttpFetcher>,
}

/// The three projector shaders, all rendered as Bevy forward decals.
struct ForwardDecalShaders;

impl ShaderLibrary for ForwardDecalShaders {
    fn find(&self, name: &str) -> Option<Shader> {
        match name {
            "decal/projector" | "decal/spray" => Some(Shader {
                normal_map: name == "decal/projector",
                ..Shader::new(name)
            }),
            "decal/spray_solid" => Some(Shader {
                render_queue: decals::material::PROJECTOR_QUEUE,
                ..Shader::new(name)
            }),
            _ => None,
        }
    }
}

fn pre_warm(mut decals: ResMut<Decals>) {
    decals.system.pre_warm();
}

/// Hand every queued broadcast to the decal system.
#[allow(clippy::needless_pass_by_value)]
fn deliver_messages(mut decals: ResMut<Decals>, hierarchy: Res<Hierarchy>, time: Res<Time>) {
    let Decals {
        system, transport, ..
    } = &mut *decals;
    let now = time.elapsed();
    for envelope in transport.drain() {
        system.handle_message(
            envelope.message,
            &envelope.payload,
            &envelope.sender,
            &hierarchy.tree,
            now,
        );
    }
}

/// Start queued texture downloads on the Tokio runtime.
#[allow(clippy::needless_pass_by_value)]
fn spawn_fetch_jobs(mut decals: ResMut<Decals>, runtime: ResMut<TokioTasksRuntime>) {
    for job in decals.system.take_fetch_jobs() {
        let fetcher = Arc::clone(&decals.fetcher);
        tracing::debug!("Downloading decal texture {}", job.key);
        runtime.spawn_background_task(move |_ctx| async move {
            job.run(fetcher.as_ref()).await;
        });
    }
}

/// Expire decals and apply finished downloads.
#[allow(clippy::needless_pass_by_value)]
fn tick(mut decals: ResMut<Decals>, time: Res<Time>) {
    decals.system.update(time.elapsed());
}

/// Hide decals beyond the render distance from the camera.
#[allow(clippy::needless_pass_by_value)]
fn cull(
    mut decals: ResMut<Decals>,
    hierarchy: Res<Hierarchy>,
    cameras: Query<&GlobalTransform, With<Camera3d>>,
) {
    let Ok(camera) = cameras.single() else {
        return;
    };
    decals.system.cull(camera.translation(), &hierarchy.tree);
}
