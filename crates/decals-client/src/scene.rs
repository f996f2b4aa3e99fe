//! Demo playground: a floor, a wall and a moving replicated object, plus the
//! input that requests decals on them.
//!
//! Controls (with the cursor grabbed):
//! - Left click: blood splat on the floor or wall
//! - F: built-in spray, R: next spray page entry
//! - G: custom spray from the configured URL
//! - T: splat attached to the moving titan

use std::collections::HashMap;

use bevy::core_pipeline::prepass::DepthPrepass;
use bevy::prelude::*;

use decals::{
    DecalKind, MemoryAssets, NodeId, SceneTree, SpawnParams, SprayCatalog, SprayChoice,
    SprayCooldown, SprayIntent, SurfaceHit, Texture,
};

use crate::camera::{FlightCamera, cursor_is_grabbed};
use crate::plugin::{DecalSet, Decals};

/// Network id of the demo titan.
const TITAN_OBJECT: u32 = 1;
const TITAN_RADIUS: f32 = 1.5;
const BLOOD_KEYS: &[&str] = &["Decals/bloodsplat1", "Decals/cut1"];

/// Scene graph mirrored for decal attachment.
#[derive(Resource, Default)]
pub struct Hierarchy {
    pub tree: SceneTree,
    /// Entity for each node, used to parent attached decals.
    pub entities: HashMap<NodeId, Entity>,
}

/// Plugin that builds the playground.
pub struct PlaygroundPlugin {
    /// Key used for the custom spray slot.
    pub custom_spray: String,
    /// Same textures the decal plugin was given.
    pub assets: MemoryAssets,
}

impl Plugin for PlaygroundPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SprayState {
            catalog: SprayCatalog::from_source(&self.assets),
            cooldown: SprayCooldown::default(),
            page: 0,
            slot: 0,
            custom: self.custom_spray.clone(),
        })
        .add_systems(Startup, setup)
        .add_systems(
            Update,
            (
                animate_titan,
                (splat, spray, attach_to_titan).run_if(cursor_is_grabbed),
            )
                .chain()
                .before(DecalSet),
        );
    }
}

#[derive(Resource)]
struct SprayState {
    catalog: SprayCatalog,
    cooldown: SprayCooldown,
    page: usize,
    slot: usize,
    custom: String,
}

#[derive(Component)]
struct Titan {
    node: NodeId,
}

#[derive(Component)]
struct TitanHead {
    node: NodeId,
}

/// Procedural textures standing in for packaged art.
#[must_use]
pub fn playground_assets() -> MemoryAssets {
    let mut assets = MemoryAssets::new();
    assets.insert("Decals/bloodsplat1", splat_texture(64, 64, [120, 0, 0]));
    assets.insert("Decals/cut1", splat_texture(128, 32, [90, 0, 0]));
    assets.insert("UI/Backgrounds/Blood/BloodBackground", splat_texture(32, 32, [60, 0, 0]));
    for (i, color) in [[30, 160, 220], [240, 190, 40], [80, 200, 90]].into_iter().enumerate() {
        assets.insert(
            format!("UI/Backgrounds/MainBackground{i}Texture"),
            stripes_texture(96, 64, color),
        );
    }
    assets
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn splat_texture(width: u32, height: u32, rgb: [u8; 3]) -> Texture {
    let mut texture = Texture::blank("", width, height);
    for y in 0..height {
        for x in 0..width {
            let u = (x as f32 + 0.5) / width as f32 * 2.0 - 1.0;
            let v = (y as f32 + 0.5) / height as f32 * 2.0 - 1.0;
            let alpha = (1.0 - (u * u + v * v).sqrt()).clamp(0.0, 1.0);
            let i = ((y * width + x) * 4) as usize;
            texture.pixels[i..i + 4].copy_from_slice(&[rgb[0], rgb[1], rgb[2], (alpha * 255.0) as u8]);
        }
    }
    texture
}

fn stripes_texture(width: u32, height: u32, rgb: [u8; 3]) -> Texture {
    let mut texture = Texture::blank("", width, height);
    for y in 0..height {
        for x in 0..width {
            let on = (x / 8 + y / 8) % 2 == 0;
            let i = ((y * width + x) * 4) as usize;
            let pixel = if on { [rgb[0], rgb[1], rgb[2], 255] } else { [255, 255, 255, 200] };
            texture.pixels[i..i + 4].copy_from_slice(&pixel);
        }
    }
    texture
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut hierarchy: ResMut<Hierarchy>,
) {
    commands.spawn((
        Name::new("Camera"),
        Camera3d::default(),
        // Forward decals need the depth prepass.
        DepthPrepass,
        FlightCamera::default(),
        Transform::from_xyz(-4.0, 4.0, 10.0).looking_to(FlightCamera::default().direction, Vec3::Y),
    ));

    commands.spawn((
        Name::new("Light"),
        PointLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 8.0, 4.0),
    ));

    let white = materials.add(Color::WHITE);
    commands.spawn((
        Name::new("Floor"),
        Mesh3d(meshes.add(Plane3d::default().mesh().size(40.0, 40.0))),
        MeshMaterial3d(white.clone()),
    ));
    commands.spawn((
        Name::new("Wall"),
        Mesh3d(meshes.add(Cuboid::new(20.0, 6.0, 0.5))),
        MeshMaterial3d(white),
        Transform::from_xyz(0.0, 3.0, -6.25),
    ));

    let titan_transform = Transform::from_xyz(5.0, TITAN_RADIUS, 0.0);
    let head_transform = Transform::from_xyz(0.0, TITAN_RADIUS * 1.6, 0.0);
    let root = hierarchy
        .tree
        .add_root("Titan", titan_transform.compute_affine());
    let head = hierarchy
        .tree
        .add_child(root, "Head", head_transform.compute_affine());
    hierarchy.tree.register_replicated(TITAN_OBJECT, root);

    let skin = materials.add(Color::srgb(0.8, 0.6, 0.5));
    let titan = commands
        .spawn((
            Name::new("Titan"),
            Titan { node: root },
            Mesh3d(meshes.add(Sphere::new(TITAN_RADIUS))),
            MeshMaterial3d(skin.clone()),
            titan_transform,
        ))
        .id();
    let head_entity = commands
        .spawn((
            Name::new("Head"),
            TitanHead { node: head },
            Mesh3d(meshes.add(Sphere::new(TITAN_RADIUS * 0.5))),
            MeshMaterial3d(skin),
            head_transform,
            ChildOf(titan),
        ))
        .id();
    hierarchy.entities.insert(root, titan);
    hierarchy.entities.insert(head, head_entity);
}

/// Walk the titan in a circle and mirror its transform into the tree.
#[allow(clippy::needless_pass_by_value)]
fn animate_titan(
    time: Res<Time>,
    mut hierarchy: ResMut<Hierarchy>,
    mut titans: Query<(&Titan, &mut Transform)>,
) {
    let t = time.elapsed_secs() * 0.3;
    for (titan, mut transform) in &mut titans {
        transform.translation = Vec3::new(5.0 * t.cos(), TITAN_RADIUS, 5.0 * t.sin());
        transform.rotation = Quat::from_rotation_y(-t);
        hierarchy
            .tree
            .set_local_transform(titan.node, transform.compute_affine());
    }
}

fn camera_ray(camera: &GlobalTransform) -> (Vec3, Vec3) {
    (camera.translation(), camera.forward().as_vec3())
}

/// First hit on the floor (y = 0) or the wall face (z = -6).
fn raycast_static(origin: Vec3, direction: Vec3) -> Option<SurfaceHit> {
    let planes = [(Vec3::Y, 0.0), (Vec3::Z, -6.0)];
    planes
        .into_iter()
        .filter_map(|(normal, offset)| {
            let facing = direction.dot(normal);
            if facing >= 0.0 {
                return None;
            }
            let distance = (offset - origin.dot(normal)) / facing;
            (distance > 0.0).then(|| SurfaceHit {
                position: origin + direction * distance,
                normal,
                distance,
            })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

fn raycast_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<SurfaceHit> {
    let to_origin = origin - center;
    let b = to_origin.dot(direction);
    let c = to_origin.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let distance = -b - discriminant.sqrt();
    (distance > 0.0).then(|| {
        let position = origin + direction * distance;
        SurfaceHit {
            position,
            normal: (position - center).normalize(),
            distance,
        }
    })
}

/// Left click: blood splat.
#[allow(clippy::needless_pass_by_value)]
fn splat(
    mouse: Res<ButtonInput<MouseButton>>,
    time: Res<Time>,
    mut decals: ResMut<Decals>,
    cameras: Query<&GlobalTransform, With<FlightCamera>>,
) {
    if !mouse.just_pressed(MouseButton::Left) {
        return;
    }
    let Ok(camera) = cameras.single() else {
        return;
    };
    let (origin, direction) = camera_ray(camera);
    let Some(hit) = raycast_static(origin, direction) else {
        return;
    };

    let key = BLOOD_KEYS[time.elapsed().subsec_millis() as usize % BLOOD_KEYS.len()];
    let params = SpawnParams::new(DecalKind::Generic, key, hit.position, hit.normal)
        .with_size(1.5)
        .with_lifetime(60.0);
    let Decals {
        system, transport, ..
    } = &mut *decals;
    system.request_spawn(transport, params);
}

/// F sprays the selected built-in spray, R selects the next one, G sprays
/// the custom key.
#[allow(clippy::needless_pass_by_value)]
fn spray(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut state: ResMut<SprayState>,
    mut decals: ResMut<Decals>,
    cameras: Query<&GlobalTransform, With<FlightCamera>>,
) {
    if keyboard.just_pressed(KeyCode::KeyR) {
        let labels = state.catalog.page(state.page).len();
        state.slot += 1;
        if state.slot >= labels {
            state.slot = 0;
            state.page = state.catalog.next_page(state.page);
        }
        tracing::info!("Selected spray {:?}", state.catalog.select(state.page, state.slot));
    }

    let choice = if keyboard.just_pressed(KeyCode::KeyF) {
        state.catalog.select(state.page, state.slot)
    } else if keyboard.just_pressed(KeyCode::KeyG) {
        SprayChoice::Custom
    } else {
        return;
    };
    let Ok(camera) = cameras.single() else {
        return;
    };
    let (origin, direction) = camera_ray(camera);
    let Some(hit) = raycast_static(origin, direction) else {
        return;
    };
    let Some(intent) = SprayIntent::new(&choice, &state.custom, &hit, camera.up().as_vec3()) else {
        tracing::debug!("Nothing to spray or target out of reach");
        return;
    };

    let SprayState { cooldown, .. } = &mut *state;
    let Decals {
        system, transport, ..
    } = &mut *decals;
    if !system.request_spray(transport, &intent, cooldown, time.elapsed()) {
        tracing::info!("Spray not available yet");
    }
}

/// T: splat attached to whichever part of the titan the camera looks at.
#[allow(clippy::needless_pass_by_value)]
fn attach_to_titan(
    keyboard: Res<ButtonInput<KeyCode>>,
    hierarchy: Res<Hierarchy>,
    mut decals: ResMut<Decals>,
    cameras: Query<&GlobalTransform, With<FlightCamera>>,
    parts: Query<(&GlobalTransform, Option<&Titan>, Option<&TitanHead>)>,
) {
    if !keyboard.just_pressed(KeyCode::KeyT) {
        return;
    }
    let Ok(camera) = cameras.single() else {
        return;
    };
    let (origin, direction) = camera_ray(camera);

    let hit = parts
        .iter()
        .filter_map(|(transform, titan, head)| {
            let (node, radius) = match (titan, head) {
                (Some(titan), _) => (titan.node, TITAN_RADIUS),
                (None, Some(head)) => (head.node, TITAN_RADIUS * 0.5),
                (None, None) => return None,
            };
            raycast_sphere(origin, direction, transform.translation(), radius).map(|hit| (node, hit))
        })
        .min_by(|a, b| a.1.distance.total_cmp(&b.1.distance));
    let Some((node, hit)) = hit else {
        return;
    };

    let params = SpawnParams::new(DecalKind::Generic, BLOOD_KEYS[0], hit.position, hit.normal)
        .with_size(0.8)
        .with_lifetime(30.0);
    let Decals {
        system, transport, ..
    } = &mut *decals;
    system.request_spawn_attached(transport, params, &hierarchy.tree, TITAN_OBJECT, node);
}
