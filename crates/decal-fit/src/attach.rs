//! Inward bias for decals parented to moving objects.

use glam::Vec3;

use crate::OUTWARD_THICKNESS;
use crate::placement::surface_normal;

/// Distance to push an attached projector into its parent.
///
/// The projector keeps [`OUTWARD_THICKNESS`] outside the surface so it wraps
/// the parent's silhouette without floating, and is never pushed outward.
#[must_use]
pub fn inward_bias(base_size: f32) -> f32 {
    (base_size * 0.5 - OUTWARD_THICKNESS).max(0.0)
}

/// World-space offset applied to an attached decal's position.
#[must_use]
pub fn attach_offset(normal: Vec3, base_size: f32) -> Vec3 {
    -surface_normal(normal) * inward_bias(base_size)
}
