//! Decal playground: spawn, spray and attach replicated decals.
//!
//! Environment:
//! - `DECALS_SETTINGS`: path to a JSON settings file
//! - `DECALS_CUSTOM_SPRAY`: texture key or URL for the custom spray slot
//! - `DECALS_DEV_ROOT`: directory for the development texture fallback
//! - `RUST_LOG`: log filter, `info` by default

mod camera;
mod plugin;
mod render;
mod scene;

use bevy::prelude::*;
use bevy_tokio_tasks::TokioTasksPlugin;
use tracing_subscriber::EnvFilter;

use decals::DecalSettings;

use crate::camera::CameraControllerPlugin;
use crate::plugin::DecalPlugin;
use crate::scene::{PlaygroundPlugin, playground_assets};

/// Actor number of the local player.
const LOCAL_ACTOR: decals::ActorId = 1;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let assets = playground_assets();
    let custom_spray = std::env::var("DECALS_CUSTOM_SPRAY").unwrap_or_default();

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Decals".to_string(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(TokioTasksPlugin::default())
        .add_plugins(CameraControllerPlugin)
        .add_plugins(DecalPlugin {
            settings,
            assets: assets.clone(),
            dev_root: std::env::var_os("DECALS_DEV_ROOT").map(Into::into),
            local_actor: LOCAL_ACTOR,
        })
        .add_plugins(PlaygroundPlugin {
            custom_spray,
            assets,
        })
        .run();
}

fn load_settings() -> DecalSettings {
    let Some(path) = std::env::var_os("DECALS_SETTINGS") else {
        return DecalSettings::default();
    };
    let loaded = std::fs::read_to_string(&path)
        .map_err(decals::Error::from)
        .and_then(|json| DecalSettings::from_json_str(&json));
    match loaded {
        Ok(settings) => {
            tracing::info!("Loaded decal settings from {}", path.to_string_lossy());
            settings
        }
        Err(e) => {
            tracing::error!("Failed to load {}: {}", path.to_string_lossy(), e);
            DecalSettings::default()
        }
    }
}
