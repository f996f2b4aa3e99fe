//! Replicated spawn requests.
//!
//! Requests carry fully resolved parameters. Inputs are clamped when decoded
//! so every peer runs the spawn procedure on the same sanitized values.

use glam::Vec3;
use prost::Message;

use decal_proto as proto;

use crate::ActorId;
use crate::error::{Error, Result};
use crate::kind::DecalKind;

/// Smallest accepted decal size.
pub const MIN_SIZE: f32 = 0.01;
/// Largest accepted decal size.
pub const MAX_SIZE: f32 = 100.0;
/// Longest accepted texture key, in bytes.
pub const MAX_KEY_LEN: usize = 2048;

/// Parameters shared by all three request shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnParams {
    pub kind: DecalKind,
    /// Asset identifier, `BG:` alias or URL.
    pub texture_key: String,
    pub position: Vec3,
    pub normal: Vec3,
    pub size: f32,
    /// Seconds; zero or less never expires.
    pub lifetime: f32,
    pub owner: Option<ActorId>,
    pub replace_existing: bool,
}

impl SpawnParams {
    /// Size one, never expiring, not replacing, no owner.
    #[must_use]
    pub fn new(kind: DecalKind, texture_key: impl Into<String>, position: Vec3, normal: Vec3) -> Self {
        Self {
            kind,
            texture_key: texture_key.into(),
            position,
            normal,
            size: 1.0,
            lifetime: 0.0,
            owner: None,
            replace_existing: false,
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    /// Seconds before the decal expires.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: f32) -> Self {
        self.lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner: Option<ActorId>) -> Self {
        self.owner = owner;
        self
    }

    /// Remove the owner's earlier decals of the same kind.
    #[must_use]
    pub fn replacing(mut self, replace_existing: bool) -> Self {
        self.replace_existing = replace_existing;
        self
    }

    /// Clamp and validate fields.
    ///
    /// Sizes are clamped into [`MIN_SIZE`, `MAX_SIZE`], normals are
    /// normalized with a fallback, and non-finite lifetimes become "never
    /// expires". Non-finite positions and oversized keys are rejected.
    pub fn sanitized(mut self) -> Result<Self> {
        if !self.position.is_finite() {
            return Err(Error::InvalidRequest("non-finite position"));
        }
        if self.texture_key.len() > MAX_KEY_LEN {
            return Err(Error::InvalidRequest("texture key too long"));
        }
        self.size = if self.size.is_finite() {
            self.size.clamp(MIN_SIZE, MAX_SIZE)
        } else {
            MIN_SIZE
        };
        if !self.lifetime.is_finite() {
            self.lifetime = 0.0;
        }
        self.normal = decal_fit::surface_normal(self.normal);
        Ok(self)
    }

    fn to_wire(&self) -> proto::SpawnDecal {
        proto::SpawnDecal {
            kind: self.kind.to_wire(),
            texture_key: self.texture_key.clone(),
            position: Some(vector(self.position)),
            normal: Some(vector(self.normal)),
            size: self.size,
            lifetime: self.lifetime,
            owner: self.owner,
            replace_existing: self.replace_existing,
        }
    }

    fn from_wire(message: proto::SpawnDecal) -> Result<Self> {
        Self {
            kind: DecalKind::from_wire(message.kind)?,
            texture_key: message.texture_key,
            position: message.position.map_or(Vec3::NAN, vec3),
            normal: message.normal.map_or(Vec3::Y, vec3),
            size: message.size,
            lifetime: message.lifetime,
            owner: message.owner,
            replace_existing: message.replace_existing,
        }
        .sanitized()
    }
}

/// One of the three request shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum SpawnRequest {
    Simple(SpawnParams),
    /// Spun around the normal towards `desired_up` on every receiver.
    Oriented { params: SpawnParams, desired_up: Vec3 },
    /// Parented to a replicated object, at a path below its root.
    Attached {
        params: SpawnParams,
        parent_object: u32,
        parent_path: String,
    },
}

impl SpawnRequest {
    #[must_use]
    pub fn params(&self) -> &SpawnParams {
        match self {
            Self::Simple(params)
            | Self::Oriented { params, .. }
            | Self::Attached { params, .. } => params,
        }
    }

    /// Transport message name for this shape.
    #[must_use]
    pub fn message_name(&self) -> &'static str {
        match self {
            Self::Simple(_) => proto::SPAWN_DECAL,
            Self::Oriented { .. } => proto::SPAWN_DECAL_ORIENTED,
            Self::Attached { .. } => proto::SPAWN_DECAL_ATTACHED,
        }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Simple(params) => params.to_wire().encode_to_vec(),
            Self::Oriented { params, desired_up } => proto::SpawnDecalOriented {
                spawn: Some(params.to_wire()),
                desired_up: Some(vector(*desired_up)),
            }
            .encode_to_vec(),
            Self::Attached {
                params,
                parent_object,
                parent_path,
            } => proto::SpawnDecalAttached {
                spawn: Some(params.to_wire()),
                parent_object: *parent_object,
                parent_path: parent_path.clone(),
            }
            .encode_to_vec(),
        }
    }

    /// Decode and sanitize a received message.
    pub fn decode(message: &str, payload: &[u8]) -> Result<Self> {
        match message {
            proto::SPAWN_DECAL => Ok(Self::Simple(SpawnParams::from_wire(
                proto::SpawnDecal::decode(payload)?,
            )?)),
            proto::SPAWN_DECAL_ORIENTED => {
                let message = proto::SpawnDecalOriented::decode(payload)?;
                Ok(Self::Oriented {
                    params: SpawnParams::from_wire(message.spawn.unwrap_or_default())?,
                    desired_up: message
                        .desired_up
                        .map(vec3)
                        .filter(|up| up.is_finite())
                        .unwrap_or(Vec3::ZERO),
                })
            }
            proto::SPAWN_DECAL_ATTACHED => {
                let message = proto::SpawnDecalAttached::decode(payload)?;
                Ok(Self::Attached {
                    params: SpawnParams::from_wire(message.spawn.unwrap_or_default())?,
                    parent_object: message.parent_object,
                    parent_path: message.parent_path,
                })
            }
            other => Err(Error::UnknownMessage(other.to_string())),
        }
    }
}

fn vector(v: Vec3) -> proto::Vector3 {
    proto::Vector3::new(v.x, v.y, v.z)
}

fn vec3(v: proto::Vector3) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}
