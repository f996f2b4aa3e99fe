//! Replicated, capacity-bounded decals.
//!
//! Players ask for marks on world geometry (blood, sprays, custom images).
//! Each request is broadcast to every peer, and every peer, the sender
//! included, admits it into its own bounded registry, fits it to the surface
//! and resolves its material and texture through a shared cache.
//!
//! # Key types
//!
//! - [`DecalSystem`]: Per-session context that sends and receives requests
//! - [`DecalRegistry`]: Live decals with global and per-owner caps
//! - [`AssetCache`]: Material templates and textures, built or loaded once
//! - [`SpawnRequest`]: The three replicated request shapes
//!
//! The host supplies the engine-facing pieces through traits:
//! [`ShaderLibrary`], [`AssetSource`], [`Transport`], [`HierarchyResolver`]
//! and [`SettingsProvider`]. Remote textures are downloaded by [`FetchJob`]s
//! the host runs on its async runtime.

mod error;

pub mod cache;
pub mod fetch;
pub mod hierarchy;
pub mod kind;
pub mod loader;
pub mod material;
pub mod protocol;
pub mod registry;
pub mod settings;
pub mod spray;
pub mod system;
pub mod texture;
pub mod transport;
pub mod visual;

pub use cache::{AssetCache, CachedTexture, TextureLookup};
pub use error::{Error, Result};
pub use fetch::{FetchJob, FetchResult, HttpFetcher, UrlFetcher};
pub use hierarchy::{HierarchyResolver, NodeId, SceneTree};
pub use kind::{CapPolicy, DecalKind, KindPolicy};
pub use loader::{AssetSource, MemoryAssets};
pub use material::{Material, MaterialTemplate, Shader, ShaderLibrary, TemplateHandle};
pub use protocol::{SpawnParams, SpawnRequest};
pub use registry::{AdmissionDecision, AdmissionRequest, DecalId, DecalRecord, DecalRegistry, DecalState};
pub use settings::{DecalSettings, Limits, SettingsProvider};
pub use spray::{SprayCatalog, SprayChoice, SprayCooldown, SprayIntent, SurfaceHit};
pub use system::DecalSystem;
pub use texture::{Texture, TextureHandle};
pub use transport::{Envelope, LoopbackTransport, SenderInfo, Transport};
pub use visual::{Attachment, DecalVisual, VisualEvent};

pub use decal_fit::{GeometryKind, Placement};

/// Network actor number of a participant.
pub type ActorId = i32;
