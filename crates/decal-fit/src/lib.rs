//! Placement math for fitting decals onto surfaces.
//!
//! This crate provides pure synchronous functions that turn a surface hit
//! (position and normal) plus a few replicated parameters into a world
//! placement for a decal. Every peer runs the same functions on the same
//! inputs, so the results must depend on nothing but the arguments.
//!
//! # Key functions
//!
//! - [`compute_placement`]: Offset, base rotation and scale for a surface hit
//! - [`orient`]: Spin a placed decal around the normal towards a desired up
//! - [`fit_aspect`]: Scale a decal to a texture's aspect ratio
//! - [`inward_bias`]: Push distance for decals attached to moving objects

mod aspect;
mod attach;
mod orient;
mod placement;

pub use aspect::{aspect_ratio, fit_aspect};
pub use attach::{attach_offset, inward_bias};
pub use orient::{orient, orientation_correction, secondary_axis, signed_angle};
pub use placement::{base_rotation, compute_placement, initial_scale, surface_normal};

use glam::{Affine3A, Quat, Vec3};

/// Distance a decal is pushed along the surface normal to avoid z-fighting.
pub const SURFACE_OFFSET: f32 = 0.02;

/// Constant outward thickness kept by attached projectors regardless of size.
pub const OUTWARD_THICKNESS: f32 = 0.03;

/// Thickness of flat quads along their facing axis.
pub const QUAD_THICKNESS: f32 = 0.001;

/// Squared-length threshold below which a projected vector is treated as zero.
pub const PARALLEL_EPSILON: f32 = 1e-6;

/// Shape used to display a decal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// Unit cube whose shader projects the texture along local +Y onto
    /// whatever surfaces it encloses.
    CubeProjector,
    /// Flat quad facing along local +Z.
    Quad,
}

/// Position, rotation and non-uniform scale of a decal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Placement {
    /// The placement as an affine transform.
    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Decompose an affine transform into a placement.
    #[must_use]
    pub fn from_affine(affine: &Affine3A) -> Self {
        let (scale, rotation, position) = affine.to_scale_rotation_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Express this world-space placement in the local space of `parent`,
    /// keeping the world pose unchanged.
    #[must_use]
    pub fn relative_to(&self, parent: &Affine3A) -> Self {
        Self::from_affine(&(parent.inverse() * self.to_affine()))
    }
}
