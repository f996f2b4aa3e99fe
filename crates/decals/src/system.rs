//! The per-session decal context.
//!
//! [`DecalSystem`] owns the registry, the asset cache and the render-side
//! visuals. Local requests are broadcast through a [`Transport`]; every peer,
//! the sender included, spawns decals only from received messages so all
//! peers run the same procedure on the same inputs.
//!
//! All methods run on the host's frame loop. Texture downloads are the only
//! work done elsewhere, and their results re-enter through
//! [`DecalSystem::update`], which drops results for decals that are gone.

use std::collections::HashMap;
use std::time::Duration;

use decal_fit::{GeometryKind, Placement};
use glam::Vec3;
use tracing::{debug, trace, warn};

use crate::ActorId;
use crate::cache::{AssetCache, COMMON_TEXTURE_KEYS, CachedTexture, TextureLookup};
use crate::fetch::FetchJob;
use crate::hierarchy::{HierarchyResolver, NodeId};
use crate::kind::DecalKind;
use crate::material::Material;
use crate::protocol::{SpawnParams, SpawnRequest};
use crate::registry::{AdmissionRequest, DecalId, DecalRecord, DecalRegistry, DecalState};
use crate::settings::{Limits, SettingsProvider};
use crate::spray::{SPRAY_LIFETIME, SPRAY_SIZE, SprayCooldown, SprayIntent};
use crate::transport::{SenderInfo, Transport};
use crate::visual::{Attachment, DecalVisual, VisualEvent};

/// Decal state for one session.
pub struct DecalSystem {
    registry: DecalRegistry,
    assets: AssetCache,
    settings: Box<dyn SettingsProvider>,
    visuals: HashMap<DecalId, DecalVisual>,
    /// Decals waiting on a texture download, by texture key.
    waiting: HashMap<String, Vec<DecalId>>,
    events: Vec<VisualEvent>,
}

impl std::fmt::Debug for DecalSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecalSystem")
            .field("registry", &self.registry)
            .field("assets", &self.assets)
            .field("waiting", &self.waiting)
            .finish_non_exhaustive()
    }
}

impl DecalSystem {
    #[must_use]
    pub fn new(assets: AssetCache, settings: Box<dyn SettingsProvider>) -> Self {
        Self {
            registry: DecalRegistry::new(),
            assets,
            settings,
            visuals: HashMap::new(),
            waiting: HashMap::new(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &DecalRegistry {
        &self.registry
    }

    #[must_use]
    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetCache {
        &mut self.assets
    }

    #[must_use]
    pub fn settings(&self) -> &dyn SettingsProvider {
        self.settings.as_ref()
    }

    /// Replace the settings; caps apply from the next admission.
    pub fn set_settings(&mut self, settings: Box<dyn SettingsProvider>) {
        self.settings = settings;
    }

    #[must_use]
    pub fn visual(&self, id: DecalId) -> Option<&DecalVisual> {
        self.visuals.get(&id)
    }

    pub fn visuals(&self) -> impl Iterator<Item = (DecalId, &DecalVisual)> {
        self.visuals.iter().map(|(&id, visual)| (id, visual))
    }

    /// Build every kind's template and load the common textures.
    pub fn pre_warm(&mut self) {
        self.sync_fetch_options();
        self.assets.pre_warm(&DecalKind::ALL, COMMON_TEXTURE_KEYS);
    }

    /// Broadcast a simple spawn request owned by the local actor.
    pub fn request_spawn(&self, transport: &mut dyn Transport, params: SpawnParams) {
        let params = params.with_owner(transport.local_actor());
        send(transport, &SpawnRequest::Simple(params));
    }

    /// Broadcast a spawn request that receivers spin towards `desired_up`.
    pub fn request_spawn_oriented(
        &self,
        transport: &mut dyn Transport,
        params: SpawnParams,
        desired_up: Vec3,
    ) {
        let params = params.with_owner(transport.local_actor());
        send(transport, &SpawnRequest::Oriented { params, desired_up });
    }

    /// Broadcast a spawn request attached to `hit_node`, which must lie
    /// below the replicated object `parent_object`.
    ///
    /// If `hit_node` is not below the object, the decal attaches to the
    /// object's root.
    pub fn request_spawn_attached(
        &self,
        transport: &mut dyn Transport,
        params: SpawnParams,
        hierarchy: &dyn HierarchyResolver,
        parent_object: u32,
        hit_node: NodeId,
    ) {
        let parent_path = hierarchy
            .replicated_object(parent_object)
            .and_then(|root| hierarchy.path_from(hit_node, root))
            .unwrap_or_else(|| {
                warn!("{hit_node:?} is not below replicated object {parent_object}; attaching to its root");
                String::new()
            });
        let params = params.with_owner(transport.local_actor());
        send(
            transport,
            &SpawnRequest::Attached {
                params,
                parent_object,
                parent_path,
            },
        );
    }

    /// Broadcast a spray if sprays are enabled and the cooldown allows it.
    ///
    /// Returns whether a request was sent.
    pub fn request_spray(
        &self,
        transport: &mut dyn Transport,
        intent: &SprayIntent,
        cooldown: &mut SprayCooldown,
        now: Duration,
    ) -> bool {
        if !self.settings.sprays_enabled() {
            debug!("Sprays are disabled");
            return false;
        }
        if !cooldown.is_ready(now) {
            debug!("Spray on cooldown");
            return false;
        }
        let params = SpawnParams::new(
            intent.kind,
            intent.texture_key.clone(),
            intent.position,
            intent.normal,
        )
        .with_size(SPRAY_SIZE)
        .with_lifetime(SPRAY_LIFETIME)
        .replacing(true);
        self.request_spawn_oriented(transport, params, intent.surface_up);
        cooldown.trigger(now);
        true
    }

    /// Decode and apply a received message.
    ///
    /// Malformed messages are logged and dropped. Returns the spawned decal.
    pub fn handle_message(
        &mut self,
        message: &str,
        payload: &[u8],
        sender: &SenderInfo,
        hierarchy: &dyn HierarchyResolver,
        now: Duration,
    ) -> Option<DecalId> {
        match SpawnRequest::decode(message, payload) {
            Ok(request) => Some(self.receive(request, sender, hierarchy, now)),
            Err(err) => {
                warn!("Dropping {message} from {:?}: {err}", sender.actor);
                None
            }
        }
    }

    /// Spawn a decal for a decoded request. `now` becomes its spawn time.
    ///
    /// The oriented and attached shapes run the simple procedure and then
    /// adjust the result.
    pub fn receive(
        &mut self,
        request: SpawnRequest,
        sender: &SenderInfo,
        hierarchy: &dyn HierarchyResolver,
        now: Duration,
    ) -> DecalId {
        match request {
            SpawnRequest::Simple(params) => self.spawn(&params, sender, now),
            SpawnRequest::Oriented { params, desired_up } => {
                let id = self.spawn(&params, sender, now);
                self.apply_orientation(id, params.normal, desired_up);
                id
            }
            SpawnRequest::Attached {
                params,
                parent_object,
                parent_path,
            } => {
                let id = self.spawn(&params, sender, now);
                self.apply_attachment(id, &params, hierarchy, parent_object, &parent_path);
                id
            }
        }
    }

    fn spawn(&mut self, params: &SpawnParams, sender: &SenderInfo, now: Duration) -> DecalId {
        let limits = Limits::from_settings(self.settings.as_ref());
        let admission = self.registry.try_admit(
            &AdmissionRequest {
                kind: params.kind,
                owner: params.owner,
                replace_existing: params.replace_existing,
                authoritative: sender.authoritative,
            },
            &limits,
        );
        for record in admission.evicted {
            self.despawn(&record);
        }

        let (geometry, mut material) = match self.assets.get_or_create_template(params.kind) {
            Some(template) => (
                GeometryKind::CubeProjector,
                self.assets.instantiate_from_template(&template),
            ),
            None => (GeometryKind::Quad, Material::unlit_quad()),
        };

        self.sync_fetch_options();
        let lookup = self.assets.get_or_load_texture(&params.texture_key);
        let aspect = match &lookup {
            TextureLookup::Ready(cached) => cached.texture.aspect(),
            TextureLookup::Pending | TextureLookup::Missing => None,
        };
        let placement = decal_fit::compute_placement(
            params.position,
            params.normal,
            params.size,
            aspect,
            geometry,
        );

        let id = self.registry.allocate_id();
        let state = match lookup {
            TextureLookup::Ready(CachedTexture {
                texture,
                normal_map,
            }) => {
                material.set_texture(texture, normal_map);
                DecalState::Live
            }
            TextureLookup::Pending => {
                self.waiting
                    .entry(params.texture_key.clone())
                    .or_default()
                    .push(id);
                DecalState::Pending
            }
            TextureLookup::Missing => DecalState::Live,
        };

        let mut record = DecalRecord::new(
            id,
            params.kind,
            params.owner,
            now,
            params.lifetime,
            params.size,
            geometry,
        );
        record.placement = placement;
        record.state = state;
        self.registry.register(record);

        self.visuals.insert(
            id,
            DecalVisual {
                geometry,
                material,
                transform: placement,
                attachment: None,
                visible: true,
                texture_key: params.texture_key.clone(),
                shadows: geometry == GeometryKind::CubeProjector,
            },
        );
        self.events.push(VisualEvent::Spawned(id));
        debug!(
            "Spawned {id} ({:?}, {geometry:?}) for {:?} at {}",
            params.kind, params.owner, params.position
        );
        id
    }

    fn apply_orientation(&mut self, id: DecalId, normal: Vec3, desired_up: Vec3) {
        let (Some(record), Some(visual)) = (self.registry.get_mut(id), self.visuals.get_mut(&id))
        else {
            return;
        };
        record.placement.rotation =
            decal_fit::orient(record.placement.rotation, normal, desired_up, record.geometry);
        visual.transform = record.placement;
    }

    fn apply_attachment(
        &mut self,
        id: DecalId,
        params: &SpawnParams,
        hierarchy: &dyn HierarchyResolver,
        parent_object: u32,
        parent_path: &str,
    ) {
        let Some(root) = hierarchy.replicated_object(parent_object) else {
            warn!("Replicated object {parent_object} not found; {id} stays unattached");
            return;
        };
        let node = hierarchy.find_path(root, parent_path).unwrap_or_else(|| {
            warn!("Path {parent_path:?} not found under object {parent_object}; attaching {id} to its root");
            root
        });
        let Some(parent_world) = hierarchy.world_transform(node) else {
            warn!("{node:?} has no transform; {id} stays unattached");
            return;
        };

        let (Some(record), Some(visual)) = (self.registry.get_mut(id), self.visuals.get_mut(&id))
        else {
            return;
        };
        record.placement.position += decal_fit::attach_offset(params.normal, record.base_size);
        let attachment = Attachment { node, parent_world };
        visual.transform = local_transform(&record.placement, Some(&attachment));
        visual.attachment = Some(attachment);
        debug!("Attached {id} to {node:?} at {parent_path:?}");
    }

    /// Advance to `now`: expire decals whose lifetime has elapsed and apply
    /// finished texture downloads.
    pub fn update(&mut self, now: Duration) {
        for record in self.registry.expire_due(now) {
            self.despawn(&record);
        }
        self.apply_fetched_textures();
    }

    fn apply_fetched_textures(&mut self) {
        for (key, cached) in self.assets.poll_fetches() {
            let Some(ids) = self.waiting.remove(&key) else {
                continue;
            };
            for id in ids {
                let (Some(record), Some(visual)) =
                    (self.registry.get_mut(id), self.visuals.get_mut(&id))
                else {
                    trace!("Discarding texture {key} for removed {id}");
                    continue;
                };
                record.state = DecalState::Live;
                let Some(CachedTexture {
                    texture,
                    normal_map,
                }) = cached.clone()
                else {
                    continue;
                };
                if let Some(aspect) = texture.aspect() {
                    record.placement.scale =
                        decal_fit::fit_aspect(record.base_size, aspect, record.geometry);
                    visual.transform = local_transform(&record.placement, visual.attachment.as_ref());
                }
                visual.material.set_texture(texture, normal_map);
                self.events.push(VisualEvent::Updated(id));
            }
        }
    }

    /// Hide decals farther than the render distance from `viewpoint` and
    /// show the rest. A render distance of zero or less shows everything.
    pub fn cull(&mut self, viewpoint: Vec3, hierarchy: &dyn HierarchyResolver) {
        let render_distance = self.settings.render_distance();
        for (&id, visual) in &mut self.visuals {
            let visible = render_distance <= 0.0 || {
                let position = world_position(visual, hierarchy);
                position.distance(viewpoint) <= render_distance
            };
            if visual.visible != visible {
                visual.visible = visible;
                self.events.push(VisualEvent::Updated(id));
            }
        }
    }

    /// Remove a decal. Unknown ids are ignored.
    pub fn destroy(&mut self, id: DecalId) -> bool {
        match self.registry.unregister(id) {
            Some(record) => {
                self.despawn(&record);
                true
            }
            None => false,
        }
    }

    /// Remove every decal, for example when the scene unloads.
    pub fn clear(&mut self) {
        for record in self.registry.clear() {
            self.despawn(&record);
        }
        self.waiting.clear();
    }

    /// Visual changes since the last call.
    pub fn drain_events(&mut self) -> Vec<VisualEvent> {
        std::mem::take(&mut self.events)
    }

    /// Texture downloads for the host to run.
    pub fn take_fetch_jobs(&mut self) -> Vec<FetchJob> {
        self.assets.take_fetch_jobs()
    }

    /// Number of live decals of `kind` owned by `owner`.
    #[must_use]
    pub fn count_owned(&self, kind: DecalKind, owner: Option<ActorId>) -> usize {
        self.registry.count_by_type_and_owner(kind, owner)
    }

    fn despawn(&mut self, record: &DecalRecord) {
        if self.visuals.remove(&record.id()).is_some() {
            self.events.push(VisualEvent::Despawned(record.id()));
        }
        debug!("Removed {} ({:?})", record.id(), record.state);
    }

    fn sync_fetch_options(&mut self) {
        self.assets
            .set_fetch_options(self.settings.mipmaps(), self.settings.texture_size_limit());
    }
}

fn send(transport: &mut dyn Transport, request: &SpawnRequest) {
    transport.broadcast(request.message_name(), request.encode());
}

fn local_transform(world: &Placement, attachment: Option<&Attachment>) -> Placement {
    match attachment {
        Some(attachment) => world.relative_to(&attachment.parent_world),
        None => *world,
    }
}

/// Current world position of a visual, following its attachment.
fn world_position(visual: &DecalVisual, hierarchy: &dyn HierarchyResolver) -> Vec3 {
    match visual.attachment {
        Some(attachment) => hierarchy
            .world_transform(attachment.node)
            .unwrap_or(attachment.parent_world)
            .transform_point3(visual.transform.position),
        None => visual.transform.position,
    }
}
