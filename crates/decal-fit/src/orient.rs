//! Rotation about the surface normal towards a desired "up".

use glam::{Quat, Vec3};

use crate::placement::surface_normal;
use crate::{GeometryKind, PARALLEL_EPSILON};

/// Local axis that should line up with the desired up once the canonical
/// axis is aligned to the normal.
#[must_use]
pub fn secondary_axis(geometry: GeometryKind) -> Vec3 {
    match geometry {
        GeometryKind::CubeProjector => Vec3::Z,
        GeometryKind::Quad => Vec3::Y,
    }
}

/// Signed angle in radians from `from` to `to` about `axis`.
///
/// Both vectors are expected to lie in the plane perpendicular to `axis`.
#[must_use]
pub fn signed_angle(from: Vec3, to: Vec3, axis: Vec3) -> f32 {
    from.cross(to).dot(axis).atan2(from.dot(to))
}

fn project_onto_plane(v: Vec3, normal: Vec3) -> Vec3 {
    v - v.dot(normal) * normal
}

/// Rotation about the normal that turns the geometry's secondary axis
/// towards `desired_up` projected onto the surface plane.
///
/// Returns the identity when the projected desired up has (near) zero
/// length, i.e. when it is parallel to the normal.
///
/// # Arguments
///
/// * `rotation` - Current rotation, with the canonical axis on the normal
/// * `normal` - Surface normal
/// * `desired_up` - Raw desired up vector, projected here
/// * `geometry` - Shape of the decal, which picks the secondary axis
#[must_use]
pub fn orientation_correction(
    rotation: Quat,
    normal: Vec3,
    desired_up: Vec3,
    geometry: GeometryKind,
) -> Quat {
    let n = surface_normal(normal);

    let desired = project_onto_plane(desired_up, n);
    if !desired.is_finite() || desired.length_squared() < PARALLEL_EPSILON {
        return Quat::IDENTITY;
    }
    let desired = desired.normalize();

    let current = project_onto_plane(rotation * secondary_axis(geometry), n);
    let current = if current.length_squared() < PARALLEL_EPSILON {
        n.cross(Vec3::X)
            .try_normalize()
            .unwrap_or_else(|| n.any_orthonormal_vector())
    } else {
        current.normalize()
    };

    Quat::from_axis_angle(n, signed_angle(current, desired, n))
}

/// Apply [`orientation_correction`] to `rotation`.
#[must_use]
pub fn orient(rotation: Quat, normal: Vec3, desired_up: Vec3, geometry: GeometryKind) -> Quat {
    (orientation_correction(rotation, normal, desired_up, geometry) * rotation).normalize()
}
