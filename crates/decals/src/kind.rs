//! Decal kinds and their per-kind policy.

use crate::error::{Error, Result};

/// Closed set of decal kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DecalKind {
    /// Ambient marks such as blood splats.
    Generic,
    /// Player spray from the built-in set.
    Spray,
    /// Player spray from a custom image; uses an opaque projector so the
    /// image does not bleed.
    SolidSpray,
}

/// How a kind's live count is capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapPolicy {
    /// Global cap across all owners, plus a per-owner cap for requests from
    /// non-authoritative peers.
    Ambient,
    /// Per-owner cap only.
    PerOwner,
}

/// Policy table entry for one [`DecalKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindPolicy {
    pub cap: CapPolicy,
    /// Whether `replace_existing` removes the owner's earlier records.
    pub replaceable: bool,
    /// Shader that renders this kind as a projector.
    pub projector_shader: &'static str,
}

impl DecalKind {
    pub const ALL: [Self; 3] = [Self::Generic, Self::Spray, Self::SolidSpray];

    /// Policy for this kind.
    #[must_use]
    pub const fn policy(self) -> KindPolicy {
        match self {
            Self::Generic => KindPolicy {
                cap: CapPolicy::Ambient,
                replaceable: false,
                projector_shader: "decal/projector",
            },
            Self::Spray => KindPolicy {
                cap: CapPolicy::PerOwner,
                replaceable: true,
                projector_shader: "decal/spray",
            },
            Self::SolidSpray => KindPolicy {
                cap: CapPolicy::PerOwner,
                replaceable: true,
                projector_shader: "decal/spray_solid",
            },
        }
    }

    /// Decode a wire value.
    pub fn from_wire(value: i32) -> Result<Self> {
        match decal_proto::DecalKind::try_from(value) {
            Ok(decal_proto::DecalKind::Generic) => Ok(Self::Generic),
            Ok(decal_proto::DecalKind::Spray) => Ok(Self::Spray),
            Ok(decal_proto::DecalKind::SolidSpray) => Ok(Self::SolidSpray),
            Err(_) => Err(Error::UnknownDecalKind(value)),
        }
    }

    /// Encode as a wire value.
    #[must_use]
    pub fn to_wire(self) -> i32 {
        let kind = match self {
            Self::Generic => decal_proto::DecalKind::Generic,
            Self::Spray => decal_proto::DecalKind::Spray,
            Self::SolidSpray => decal_proto::DecalKind::SolidSpray,
        };
        kind as i32
    }
}
