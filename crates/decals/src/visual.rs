//! Render-side state of each decal, mirrored by the host renderer.

use decal_fit::{GeometryKind, Placement};
use glam::Affine3A;

use crate::hierarchy::NodeId;
use crate::material::Material;
use crate::registry::DecalId;

/// What the renderer should draw for one decal.
#[derive(Debug, Clone)]
pub struct DecalVisual {
    pub geometry: GeometryKind,
    pub material: Material,
    /// Local to the attachment's node when attached, world space otherwise.
    pub transform: Placement,
    pub attachment: Option<Attachment>,
    /// Cleared by render-distance culling.
    pub visible: bool,
    pub texture_key: String,
    /// Whether the visual casts and receives shadows.
    pub shadows: bool,
}

/// Object an attached decal follows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attachment {
    pub node: NodeId,
    /// World transform of `node` when the decal was attached.
    pub parent_world: Affine3A,
}

/// Change to the set of visuals since the last drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualEvent {
    Spawned(DecalId),
    /// Texture, scale or visibility changed.
    Updated(DecalId),
    Despawned(DecalId),
}

impl VisualEvent {
    #[must_use]
    pub const fn id(self) -> DecalId {
        match self {
            Self::Spawned(id) | Self::Updated(id) | Self::Despawned(id) => id,
        }
    }
}
