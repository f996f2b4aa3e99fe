//! Bounded registry of live decals.
//!
//! Each peer keeps its own registry. Peers agree on the inputs that drive
//! admission, not on the exact contents: spawn times are local receipt times,
//! so two peers may briefly disagree on which record is oldest when requests
//! from different owners arrive at the same moment.

use std::time::Duration;

use decal_fit::{GeometryKind, Placement};

use crate::ActorId;
use crate::kind::{CapPolicy, DecalKind};
use crate::settings::Limits;

/// Handle of a decal record.
///
/// Ids are allocated in increasing order and never reused, so they double as
/// the insertion sequence that breaks spawn-time ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecalId(u64);

impl DecalId {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DecalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "decal#{}", self.0)
    }
}

/// Lifecycle state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecalState {
    /// Admitted and visible, texture still resolving.
    Pending,
    /// Texture applied, or resolution finished without one.
    Live,
    /// Removed by its lifetime timer.
    Expired,
    /// Removed to make room for another decal.
    Evicted,
}

/// One decal.
#[derive(Debug, Clone)]
pub struct DecalRecord {
    id: DecalId,
    kind: DecalKind,
    owner: Option<ActorId>,
    spawn_time: Duration,
    lifetime: Option<Duration>,
    pub base_size: f32,
    pub geometry: GeometryKind,
    /// World placement derived at spawn; not authoritative input.
    pub placement: Placement,
    pub state: DecalState,
}

impl DecalRecord {
    /// Create a pending record.
    ///
    /// A `lifetime` of zero or less (or a non-finite one) never expires.
    #[must_use]
    pub fn new(
        id: DecalId,
        kind: DecalKind,
        owner: Option<ActorId>,
        spawn_time: Duration,
        lifetime: f32,
        base_size: f32,
        geometry: GeometryKind,
    ) -> Self {
        let lifetime = if lifetime.is_finite() && lifetime > 0.0 {
            Duration::try_from_secs_f32(lifetime).ok()
        } else {
            None
        };
        Self {
            id,
            kind,
            owner,
            spawn_time,
            lifetime,
            base_size,
            geometry,
            placement: Placement::default(),
            state: DecalState::Pending,
        }
    }

    #[must_use]
    pub fn id(&self) -> DecalId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> DecalKind {
        self.kind
    }

    #[must_use]
    pub fn owner(&self) -> Option<ActorId> {
        self.owner
    }

    /// Local time the record was created; never changes.
    #[must_use]
    pub fn spawn_time(&self) -> Duration {
        self.spawn_time
    }

    #[must_use]
    pub fn lifetime(&self) -> Option<Duration> {
        self.lifetime
    }

    /// Time at which the record expires, if it ever does.
    #[must_use]
    pub fn expires_at(&self) -> Option<Duration> {
        self.lifetime.map(|lifetime| self.spawn_time + lifetime)
    }

    fn age_key(&self) -> (Duration, DecalId) {
        (self.spawn_time, self.id)
    }
}

/// Inputs to [`DecalRegistry::try_admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionRequest {
    pub kind: DecalKind,
    pub owner: Option<ActorId>,
    pub replace_existing: bool,
    /// Whether the request came from the authoritative peer.
    pub authoritative: bool,
}

/// Outcome of admission. The registry never refuses a decal; it makes room
/// by evicting instead.
#[derive(Debug, Default)]
#[must_use]
pub struct AdmissionDecision {
    /// Records removed to make room, in eviction order.
    pub evicted: Vec<DecalRecord>,
}

/// The live set of decals on this peer.
#[derive(Debug, Default)]
pub struct DecalRegistry {
    records: Vec<DecalRecord>,
    next_id: u64,
}

impl DecalRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id.
    pub fn allocate_id(&mut self) -> DecalId {
        let id = DecalId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Apply the capacity and replacement policy for a new decal.
    ///
    /// Policy, in order:
    /// 1. Replaceable kinds with `replace_existing` remove every live record
    ///    of the same kind owned by the same owner.
    /// 2. Ambient kinds evict the globally oldest record of the kind while at
    ///    or over the global cap, then, for non-authoritative requests, the
    ///    owner's oldest while at or over the per-owner cap.
    /// 3. Per-owner kinds evict the owner's oldest while at or over the
    ///    per-owner cap.
    pub fn try_admit(&mut self, request: &AdmissionRequest, limits: &Limits) -> AdmissionDecision {
        let mut decision = AdmissionDecision::default();
        let policy = request.kind.policy();

        if policy.replaceable && request.replace_existing {
            let (replaced, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.records)
                .into_iter()
                .partition(|r| r.kind == request.kind && r.owner == request.owner);
            self.records = kept;
            decision.evicted.extend(replaced.into_iter().map(|mut record| {
                record.state = DecalState::Evicted;
                record
            }));
        }

        match policy.cap {
            CapPolicy::Ambient => {
                if let Some(max) = limits.global_max {
                    while self.count_by_type(request.kind) >= max {
                        let Some(id) = self.oldest_of_type(request.kind) else {
                            break;
                        };
                        decision.evicted.extend(self.evict(id));
                    }
                }
                // Only non-authoritative admissions cap ambient decals per
                // owner, so peers can disagree on which ambient decal is
                // evicted. Kept as-is; may be worth unifying.
                if !request.authoritative {
                    self.enforce_owner_cap(request, limits, &mut decision);
                }
            }
            CapPolicy::PerOwner => self.enforce_owner_cap(request, limits, &mut decision),
        }

        decision
    }

    fn enforce_owner_cap(
        &mut self,
        request: &AdmissionRequest,
        limits: &Limits,
        decision: &mut AdmissionDecision,
    ) {
        while self.count_by_type_and_owner(request.kind, request.owner) >= limits.per_owner_max {
            let Some(id) = self.oldest_of_type_and_owner(request.kind, request.owner) else {
                break;
            };
            decision.evicted.extend(self.evict(id));
        }
    }

    fn evict(&mut self, id: DecalId) -> Option<DecalRecord> {
        let mut record = self.unregister(id)?;
        record.state = DecalState::Evicted;
        Some(record)
    }

    /// Insert an admitted record.
    ///
    /// Returns `false` and leaves the registry unchanged if a record with
    /// the same id is already live.
    pub fn register(&mut self, record: DecalRecord) -> bool {
        if self.contains(record.id) {
            tracing::warn!("Ignoring duplicate registration of {}", record.id);
            return false;
        }
        self.records.push(record);
        true
    }

    /// Remove a record. Unknown or already removed ids are a no-op.
    pub fn unregister(&mut self, id: DecalId) -> Option<DecalRecord> {
        let index = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.swap_remove(index))
    }

    /// Remove and return every record whose lifetime has elapsed by `now`.
    pub fn expire_due(&mut self, now: Duration) -> Vec<DecalRecord> {
        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| r.expires_at().is_some_and(|at| at <= now));
        self.records = kept;
        expired
            .into_iter()
            .map(|mut record| {
                record.state = DecalState::Expired;
                record
            })
            .collect()
    }

    /// Remove every record.
    pub fn clear(&mut self) -> Vec<DecalRecord> {
        std::mem::take(&mut self.records)
    }

    #[must_use]
    pub fn contains(&self, id: DecalId) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    #[must_use]
    pub fn get(&self, id: DecalId) -> Option<&DecalRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn get_mut(&mut self, id: DecalId) -> Option<&mut DecalRecord> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecalRecord> {
        self.records.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn count_by_type(&self, kind: DecalKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    #[must_use]
    pub fn count_by_type_and_owner(&self, kind: DecalKind, owner: Option<ActorId>) -> usize {
        self.records
            .iter()
            .filter(|r| r.kind == kind && r.owner == owner)
            .count()
    }

    #[must_use]
    pub fn oldest_of_type(&self, kind: DecalKind) -> Option<DecalId> {
        self.records
            .iter()
            .filter(|r| r.kind == kind)
            .min_by_key(|r| r.age_key())
            .map(|r| r.id)
    }

    #[must_use]
    pub fn oldest_of_type_and_owner(
        &self,
        kind: DecalKind,
        owner: Option<ActorId>,
    ) -> Option<DecalId> {
        self.records
            .iter()
            .filter(|r| r.kind == kind && r.owner == owner)
            .min_by_key(|r| r.age_key())
            .map(|r| r.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn limits(global_max: Option<usize>, per_owner_max: usize) -> Limits {
        Limits {
            global_max,
            per_owner_max,
        }
    }

    fn admit_and_register(
        registry: &mut DecalRegistry,
        kind: DecalKind,
        owner: Option<ActorId>,
        now: Duration,
        limits: &Limits,
        authoritative: bool,
    ) -> (DecalId, Vec<DecalRecord>) {
        let decision = registry.try_admit(
            &AdmissionRequest {
                kind,
                owner,
                replace_existing: false,
                authoritative,
            },
            limits,
        );
        let id = registry.allocate_id();
        assert!(registry.register(DecalRecord::new(
            id,
            kind,
            owner,
            now,
            0.0,
            1.0,
            GeometryKind::CubeProjector,
        )));
        (id, decision.evicted)
    }

    #[test]
    fn global_cap_evicts_oldest() {
        let mut registry = DecalRegistry::new();
        let limits = limits(Some(2), 100);

        let (first, _) =
            admit_and_register(&mut registry, DecalKind::Generic, Some(1), secs(1), &limits, true);
        let (second, _) =
            admit_and_register(&mut registry, DecalKind::Generic, Some(2), secs(2), &limits, true);
        let (third, evicted) =
            admit_and_register(&mut registry, DecalKind::Generic, Some(3), secs(3), &limits, true);

        assert_eq!(registry.count_by_type(DecalKind::Generic), 2);
        assert!(!registry.contains(first));
        assert!(registry.contains(second));
        assert!(registry.contains(third));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id(), first);
        assert_eq!(evicted[0].state, DecalState::Evicted);
    }

    #[test]
    fn spawn_time_ties_break_by_insertion() {
        let mut registry = DecalRegistry::new();
        let limits = limits(Some(2), 100);

        let (first, _) =
            admit_and_register(&mut registry, DecalKind::Generic, None, secs(5), &limits, true);
        let (_second, _) =
            admit_and_register(&mut registry, DecalKind::Generic, None, secs(5), &limits, true);
        assert_eq!(registry.oldest_of_type(DecalKind::Generic), Some(first));
    }

    #[test]
    fn non_authoritative_owner_cap_applies_to_ambient() {
        let mut registry = DecalRegistry::new();
        let limits = limits(None, 2);

        let (first, _) =
            admit_and_register(&mut registry, DecalKind::Generic, Some(7), secs(1), &limits, false);
        admit_and_register(&mut registry, DecalKind::Generic, Some(7), secs(2), &limits, false);
        admit_and_register(&mut registry, DecalKind::Generic, Some(8), secs(3), &limits, false);
        admit_and_register(&mut registry, DecalKind::Generic, Some(7), secs(4), &limits, false);

        assert_eq!(registry.count_by_type_and_owner(DecalKind::Generic, Some(7)), 2);
        assert_eq!(registry.count_by_type_and_owner(DecalKind::Generic, Some(8)), 1);
        assert!(!registry.contains(first));
    }

    #[test]
    fn authoritative_requests_skip_ambient_owner_cap() {
        let mut registry = DecalRegistry::new();
        let limits = limits(None, 1);

        for t in 0..3 {
            admit_and_register(&mut registry, DecalKind::Generic, Some(1), secs(t), &limits, true);
        }
        assert_eq!(registry.count_by_type_and_owner(DecalKind::Generic, Some(1)), 3);
    }

    #[test]
    fn spray_owner_cap_ignores_authority() {
        let mut registry = DecalRegistry::new();
        let limits = limits(Some(1), 2);

        for t in 0..4 {
            admit_and_register(&mut registry, DecalKind::Spray, Some(1), secs(t), &limits, true);
        }
        assert_eq!(registry.count_by_type_and_owner(DecalKind::Spray, Some(1)), 2);
    }

    #[test]
    fn replace_existing_removes_same_kind_and_owner_only() {
        let mut registry = DecalRegistry::new();
        let limits = limits(None, 10);

        admit_and_register(&mut registry, DecalKind::Spray, Some(1), secs(1), &limits, false);
        admit_and_register(&mut registry, DecalKind::Spray, Some(1), secs(2), &limits, false);
        admit_and_register(&mut registry, DecalKind::Spray, Some(2), secs(3), &limits, false);
        admit_and_register(&mut registry, DecalKind::SolidSpray, Some(1), secs(4), &limits, false);

        let decision = registry.try_admit(
            &AdmissionRequest {
                kind: DecalKind::Spray,
                owner: Some(1),
                replace_existing: true,
                authoritative: false,
            },
            &limits,
        );

        assert_eq!(decision.evicted.len(), 2);
        assert_eq!(registry.count_by_type_and_owner(DecalKind::Spray, Some(1)), 0);
        assert_eq!(registry.count_by_type_and_owner(DecalKind::Spray, Some(2)), 1);
        assert_eq!(
            registry.count_by_type_and_owner(DecalKind::SolidSpray, Some(1)),
            1
        );
    }

    #[test]
    fn replace_is_ignored_for_generic() {
        let mut registry = DecalRegistry::new();
        let limits = limits(None, 10);
        admit_and_register(&mut registry, DecalKind::Generic, Some(1), secs(1), &limits, false);

        let decision = registry.try_admit(
            &AdmissionRequest {
                kind: DecalKind::Generic,
                owner: Some(1),
                replace_existing: true,
                authoritative: false,
            },
            &limits,
        );
        assert!(decision.evicted.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn shrinking_cap_is_enforced_on_next_admission() {
        let mut registry = DecalRegistry::new();
        let wide = limits(None, 100);
        for t in 0..5 {
            admit_and_register(&mut registry, DecalKind::Generic, None, secs(t), &wide, true);
        }

        let narrow = limits(Some(2), 100);
        let (_, evicted) =
            admit_and_register(&mut registry, DecalKind::Generic, None, secs(10), &narrow, true);
        assert_eq!(evicted.len(), 4);
        assert_eq!(registry.count_by_type(DecalKind::Generic), 2);
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut registry = DecalRegistry::new();
        let limits = limits(None, 10);
        let (id, _) =
            admit_and_register(&mut registry, DecalKind::Generic, None, secs(1), &limits, true);
        let (other, _) =
            admit_and_register(&mut registry, DecalKind::Generic, None, secs(2), &limits, true);

        assert!(registry.unregister(id).is_some());
        assert!(registry.unregister(id).is_none());
        assert!(registry.unregister(DecalId(999)).is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(other));
    }

    #[test]
    fn duplicate_register_is_rejected() {
        let mut registry = DecalRegistry::new();
        let id = registry.allocate_id();
        let record = DecalRecord::new(
            id,
            DecalKind::Generic,
            None,
            secs(0),
            0.0,
            1.0,
            GeometryKind::Quad,
        );
        assert!(registry.register(record.clone()));
        assert!(!registry.register(record));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn expiry_respects_lifetime() {
        let mut registry = DecalRegistry::new();
        let short = registry.allocate_id();
        let forever = registry.allocate_id();
        registry.register(DecalRecord::new(
            short,
            DecalKind::Generic,
            None,
            secs(10),
            2.0,
            1.0,
            GeometryKind::Quad,
        ));
        registry.register(DecalRecord::new(
            forever,
            DecalKind::Generic,
            None,
            secs(10),
            0.0,
            1.0,
            GeometryKind::Quad,
        ));

        assert!(registry.expire_due(secs(11)).is_empty());
        let expired = registry.expire_due(secs(12));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id(), short);
        assert_eq!(expired[0].state, DecalState::Expired);
        assert!(registry.expire_due(secs(10_000)).is_empty());
        assert!(registry.contains(forever));
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn caps_hold_after_every_admission(
                ops in prop::collection::vec((0usize..3, 0i32..4, any::<bool>(), any::<bool>()), 1..80),
                global in 1usize..6,
                per_owner in 1usize..4,
            ) {
                let mut registry = DecalRegistry::new();
                let limits = limits(Some(global), per_owner);

                for (t, (kind, owner, replace_existing, authoritative)) in ops.into_iter().enumerate() {
                    let kind = DecalKind::ALL[kind];
                    let _ = registry.try_admit(
                        &AdmissionRequest {
                            kind,
                            owner: Some(owner),
                            replace_existing,
                            authoritative,
                        },
                        &limits,
                    );
                    let id = registry.allocate_id();
                    registry.register(DecalRecord::new(
                        id,
                        kind,
                        Some(owner),
                        secs(t as u64),
                        0.0,
                        1.0,
                        GeometryKind::Quad,
                    ));

                    prop_assert!(registry.count_by_type(DecalKind::Generic) <= global);
                    for sprayed in [DecalKind::Spray, DecalKind::SolidSpray] {
                        for o in 0..4 {
                            prop_assert!(registry.count_by_type_and_owner(sprayed, Some(o)) <= per_owner);
                        }
                    }
                    if kind == DecalKind::Generic && !authoritative {
                        prop_assert!(registry.count_by_type_and_owner(kind, Some(owner)) <= per_owner);
                    }
                }
            }
        }
    }
}
