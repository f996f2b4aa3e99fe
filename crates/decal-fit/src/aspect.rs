//! Aspect-ratio fitting.

use glam::Vec3;

use crate::placement::initial_scale;
use crate::{GeometryKind, QUAD_THICKNESS};

/// Width over height of a texture, or `None` for an empty texture.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn aspect_ratio(width: u32, height: u32) -> Option<f32> {
    (width > 0 && height > 0).then(|| width as f32 / height as f32)
}

/// Scale a decal so the texture keeps its aspect ratio.
///
/// The longer texture axis keeps `base_size` and the shorter one shrinks by
/// the aspect ratio. Projector shaders sample the texture with the local X
/// and Z coordinates, so for projectors the texture maps onto X (horizontal)
/// and Z (depth) while Y, the projection axis, stays at `base_size`. Quads
/// map it onto X and Y and keep a near-zero thickness on Z.
///
/// Non-positive or non-finite aspect ratios leave the decal square.
#[must_use]
pub fn fit_aspect(base_size: f32, aspect: f32, geometry: GeometryKind) -> Vec3 {
    if !(aspect.is_finite() && aspect > 0.0) {
        return initial_scale(base_size, geometry);
    }

    let (across, along) = if aspect >= 1.0 {
        (base_size, base_size / aspect)
    } else {
        (base_size * aspect, base_size)
    };

    match geometry {
        GeometryKind::CubeProjector => Vec3::new(across, base_size, along),
        GeometryKind::Quad => Vec3::new(across, along, QUAD_THICKNESS),
    }
}
