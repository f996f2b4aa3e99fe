//! Surface placement.

use glam::{Mat3, Quat, Vec3};

use crate::aspect::fit_aspect;
use crate::{GeometryKind, PARALLEL_EPSILON, Placement, QUAD_THICKNESS, SURFACE_OFFSET};

/// Normalize a replicated surface normal, falling back to world up for
/// zero-length or non-finite input.
#[must_use]
pub fn surface_normal(normal: Vec3) -> Vec3 {
    normal.try_normalize().unwrap_or(Vec3::Y)
}

/// Rotation that aligns the geometry's canonical axis with `normal`.
///
/// Projectors project along local +Y, so +Y maps to the normal. Quads face
/// along local +Z, so +Z maps to the normal with +Y kept as close to world
/// up as possible. The two alignments are not interchangeable.
#[must_use]
pub fn base_rotation(normal: Vec3, geometry: GeometryKind) -> Quat {
    let n = surface_normal(normal);
    match geometry {
        GeometryKind::CubeProjector => Quat::from_rotation_arc(Vec3::Y, n),
        GeometryKind::Quad => look_rotation(n, Vec3::Y),
    }
}

/// Rotation mapping local +Z to `forward` and local +Y towards `up`.
fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let right = up.cross(forward);
    let right = if right.length_squared() < PARALLEL_EPSILON {
        forward.any_orthonormal_vector()
    } else {
        right.normalize()
    };
    let up = forward.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, forward))
}

/// Scale used before a texture is known.
#[must_use]
pub fn initial_scale(base_size: f32, geometry: GeometryKind) -> Vec3 {
    match geometry {
        GeometryKind::CubeProjector => Vec3::splat(base_size),
        GeometryKind::Quad => Vec3::new(base_size, base_size, QUAD_THICKNESS),
    }
}

/// Compute the world placement of a decal for a surface hit.
///
/// # Arguments
///
/// * `hit_position` - Point on the surface
/// * `hit_normal` - Surface normal at the hit (need not be normalized)
/// * `base_size` - Edge length of the decal before aspect fitting
/// * `texture_aspect` - Width over height of the loaded texture, if any
/// * `geometry` - Shape used to display the decal
#[must_use]
pub fn compute_placement(
    hit_position: Vec3,
    hit_normal: Vec3,
    base_size: f32,
    texture_aspect: Option<f32>,
    geometry: GeometryKind,
) -> Placement {
    let n = surface_normal(hit_normal);
    let scale = match texture_aspect {
        Some(aspect) => fit_aspect(base_size, aspect, geometry),
        None => initial_scale(base_size, geometry),
    };
    Placement {
        position: hit_position + n * SURFACE_OFFSET,
        rotation: base_rotation(n, geometry),
        scale,
    }
}
