//! Wire message types for replicated decal spawn requests.
//!
//! These are `prost` messages declared by hand rather than generated from a
//! `.proto` file; the field tags are the wire contract and must not be
//! renumbered. Every peer (including the sender) decodes the same bytes and
//! runs the same deterministic spawn procedure, so messages carry fully
//! resolved parameters only.

/// Message name for a [`SpawnDecal`] broadcast.
pub const SPAWN_DECAL: &str = "SpawnDecalRPC";
/// Message name for a [`SpawnDecalOriented`] broadcast.
pub const SPAWN_DECAL_ORIENTED: &str = "SpawnDecalOrientedRPC";
/// Message name for a [`SpawnDecalAttached`] broadcast.
pub const SPAWN_DECAL_ATTACHED: &str = "SpawnDecalAttachRPC";

/// Closed set of decal kinds as they appear on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DecalKind {
    Generic = 0,
    Spray = 1,
    SolidSpray = 2,
}

/// Three-component float vector.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Vector3 {
    #[prost(float, tag = "1")]
    pub x: f32,
    #[prost(float, tag = "2")]
    pub y: f32,
    #[prost(float, tag = "3")]
    pub z: f32,
}

impl Vector3 {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Simple spawn request: a decal placed in world space.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpawnDecal {
    #[prost(enumeration = "DecalKind", tag = "1")]
    pub kind: i32,
    /// Registered asset identifier, `BG:<name>` alias, or URL.
    #[prost(string, tag = "2")]
    pub texture_key: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub position: ::core::option::Option<Vector3>,
    #[prost(message, optional, tag = "4")]
    pub normal: ::core::option::Option<Vector3>,
    #[prost(float, tag = "5")]
    pub size: f32,
    /// Seconds; zero or negative never expires.
    #[prost(float, tag = "6")]
    pub lifetime: f32,
    /// Originating actor, absent when the sender had no actor number.
    #[prost(int32, optional, tag = "7")]
    pub owner: ::core::option::Option<i32>,
    #[prost(bool, tag = "8")]
    pub replace_existing: bool,
}

/// Spawn request with an additional desired "up" direction.
///
/// The projection of `desired_up` onto the surface plane happens on the
/// receiving side so every peer computes the correction from identical
/// inputs.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpawnDecalOriented {
    #[prost(message, optional, tag = "1")]
    pub spawn: ::core::option::Option<SpawnDecal>,
    #[prost(message, optional, tag = "2")]
    pub desired_up: ::core::option::Option<Vector3>,
}

/// Spawn request parented to a replicated object.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpawnDecalAttached {
    #[prost(message, optional, tag = "1")]
    pub spawn: ::core::option::Option<SpawnDecal>,
    /// Network identifier of the replicated parent object.
    #[prost(uint32, tag = "2")]
    pub parent_object: u32,
    /// Slash-separated chain of child names below the parent's root.
    #[prost(string, tag = "3")]
    pub parent_path: ::prost::alloc::string::String,
}
