//! Mirror decal visuals into Bevy entities.
//!
//! Projector decals become forward decals, which project along their local
//! Y axis onto the depth prepass. Quad decals become unlit rectangles facing
//! along local Z.

use std::collections::HashMap;

use bevy::asset::RenderAssetUsages;
use bevy::light::{NotShadowCaster, NotShadowReceiver};
use bevy::pbr::decal::{ForwardDecal, ForwardDecalMaterial, ForwardDecalMaterialExt};
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

use decals::{DecalId, DecalVisual, GeometryKind, Placement, Texture, VisualEvent};

use crate::plugin::Decals;
use crate::scene::Hierarchy;

/// How far forward decals fade into the surface behind them.
const DEPTH_FADE_FACTOR: f32 = 8.0;

/// Entities and GPU assets created for decals.
#[derive(Resource, Default)]
pub struct DecalEntities {
    entities: HashMap<DecalId, Entity>,
    /// Uploaded textures by texture key.
    images: HashMap<String, Handle<Image>>,
    quad: Option<Handle<Mesh>>,
}

/// Asset stores touched while mirroring.
#[derive(bevy::ecs::system::SystemParam)]
pub struct DecalAssets<'w> {
    images: ResMut<'w, Assets<Image>>,
    meshes: ResMut<'w, Assets<Mesh>>,
    materials: ResMut<'w, Assets<StandardMaterial>>,
    decal_materials: ResMut<'w, Assets<ForwardDecalMaterial<StandardMaterial>>>,
}

/// Apply this frame's visual events.
#[allow(clippy::needless_pass_by_value)]
pub fn sync_visuals(
    mut commands: Commands,
    mut decals: ResMut<Decals>,
    hierarchy: Res<Hierarchy>,
    mut entities: ResMut<DecalEntities>,
    mut assets: DecalAssets,
) {
    for event in decals.system.drain_events() {
        match event {
            VisualEvent::Spawned(id) => {
                let Some(visual) = decals.system.visual(id) else {
                    continue;
                };
                let entity = commands.spawn(Name::new(format!("{id}"))).id();
                insert_visual(&mut commands, entity, visual, &mut entities, &mut assets);
                if let Some(parent) = visual
                    .attachment
                    .and_then(|attachment| hierarchy.entities.get(&attachment.node))
                {
                    commands.entity(entity).insert(ChildOf(*parent));
                }
                entities.entities.insert(id, entity);
            }
            VisualEvent::Updated(id) => {
                let (Some(visual), Some(&entity)) =
                    (decals.system.visual(id), entities.entities.get(&id))
                else {
                    continue;
                };
                insert_visual(&mut commands, entity, visual, &mut entities, &mut assets);
            }
            VisualEvent::Despawned(id) => {
                if let Some(entity) = entities.entities.remove(&id) {
                    commands.entity(entity).try_despawn();
                }
            }
        }
    }
}

fn insert_visual(
    commands: &mut Commands,
    entity: Entity,
    visual: &DecalVisual,
    entities: &mut DecalEntities,
    assets: &mut DecalAssets,
) {
    let texture = visual
        .material
        .texture
        .as_ref()
        .map(|texture| upload(&visual.texture_key, texture, entities, &mut assets.images));
    let tint = visual.material.template().tint;
    let base = StandardMaterial {
        base_color: Color::srgba(tint.x, tint.y, tint.z, tint.w),
        base_color_texture: texture,
        alpha_mode: AlphaMode::Blend,
        ..default()
    };

    let visibility = if visual.visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
    let mut entity = commands.entity(entity);
    entity.insert((transform(&visual.transform), visibility));

    match visual.geometry {
        GeometryKind::CubeProjector => {
            entity.insert((
                ForwardDecal,
                MeshMaterial3d(assets.decal_materials.add(ForwardDecalMaterial {
                    base,
                    extension: ForwardDecalMaterialExt {
                        depth_fade_factor: DEPTH_FADE_FACTOR,
                    },
                })),
            ));
        }
        GeometryKind::Quad => {
            let mesh = entities
                .quad
                .get_or_insert_with(|| assets.meshes.add(Rectangle::new(1.0, 1.0)))
                .clone();
            entity.insert((
                Mesh3d(mesh),
                MeshMaterial3d(assets.materials.add(StandardMaterial {
                    unlit: true,
                    ..base
                })),
            ));
            if !visual.shadows {
                entity.insert((NotShadowCaster, NotShadowReceiver));
            }
        }
    }
}

fn upload(
    key: &str,
    texture: &Texture,
    entities: &mut DecalEntities,
    images: &mut Assets<Image>,
) -> Handle<Image> {
    entities
        .images
        .entry(key.to_string())
        .or_insert_with(|| {
            tracing::debug!("Uploading decal texture {key} ({}x{})", texture.width, texture.height);
            images.add(Image::new(
                Extent3d {
                    width: texture.width,
                    height: texture.height,
                    depth_or_array_layers: 1,
                },
                TextureDimension::D2,
                texture.pixels.clone(),
                TextureFormat::Rgba8UnormSrgb,
                RenderAssetUsages::RENDER_WORLD,
            ))
        })
        .clone()
}

fn transform(placement: &Placement) -> Transform {
    Transform {
        translation: placement.position,
        rotation: placement.rotation,
        scale: placement.scale,
    }
}
