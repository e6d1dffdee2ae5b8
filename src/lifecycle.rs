//! Surface lifecycle: creation on activation, fade-out on deactivation, and
//! the global surface budget.
//!
//! This is the only component that talks to a [`SurfaceFactory`]. The live
//! count includes surfaces that are fading out; they still hold GPU/DOM
//! resources until their fade completes.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::surface::{LayerRole, SurfaceFactory, SurfaceHandle, SurfaceId, SurfaceRequest};
use crate::zone::{Zone, ZoneId};

#[derive(Debug, Clone, Copy, PartialEq)]
enum ZoneState {
    Active,
    FadingOut { generation: u64 },
}

#[derive(Debug, Clone)]
struct LiveSurface {
    handle: SurfaceHandle,
    paused: bool,
}

#[derive(Debug, Clone)]
struct ZoneEntry {
    state: ZoneState,
    surfaces: Vec<LiveSurface>,
}

/// Outcome of [`LifecycleManager::activate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Zone was inactive; `created` surfaces were built.
    Started { created: usize },
    /// A pending fade-out was cancelled.
    Resumed { created: usize },
    AlreadyActive,
    /// Surface creation failed; the zone is active with no surfaces.
    Degraded,
}

/// Identifies one fade-out. Completing a stale ticket is a no-op.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeTicket {
    pub zone: ZoneId,
    pub generation: u64,
    pub deadline_ms: f64,
}

#[derive(Debug)]
pub struct LifecycleManager {
    budget: usize,
    fade_ms: f64,
    zones: BTreeMap<ZoneId, ZoneEntry>,
    next_surface: u64,
    next_generation: u64,
}

impl LifecycleManager {
    pub fn new(budget: usize, fade_ms: f64) -> Self {
        Self {
            budget: budget.max(1),
            fade_ms: fade_ms.max(0.0),
            zones: BTreeMap::new(),
            next_surface: 0,
            next_generation: 0,
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn fade_ms(&self) -> f64 {
        self.fade_ms
    }

    /// Surfaces holding resources, fading ones included.
    pub fn live_count(&self) -> usize {
        self.zones.values().map(|z| z.surfaces.len()).sum()
    }

    /// True when the zone is active (not fading).
    pub fn is_active(&self, zone: ZoneId) -> bool {
        self.zones
            .get(&zone)
            .is_some_and(|z| z.state == ZoneState::Active)
    }

    pub fn is_fading(&self, zone: ZoneId) -> bool {
        self.zones
            .get(&zone)
            .is_some_and(|z| matches!(z.state, ZoneState::FadingOut { .. }))
    }

    pub fn active_zones(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.zones
            .iter()
            .filter(|(_, z)| z.state == ZoneState::Active)
            .map(|(id, _)| *id)
    }

    /// Running (unpaused) surfaces of an active zone.
    pub fn running_surfaces(&self, zone: ZoneId) -> impl Iterator<Item = &SurfaceHandle> + '_ {
        self.zones
            .get(&zone)
            .filter(|z| z.state == ZoneState::Active)
            .into_iter()
            .flat_map(|z| z.surfaces.iter())
            .filter(|s| !s.paused)
            .map(|s| &s.handle)
    }

    pub fn surfaces(&self, zone: ZoneId) -> impl Iterator<Item = &SurfaceHandle> + '_ {
        self.zones
            .get(&zone)
            .into_iter()
            .flat_map(|z| z.surfaces.iter())
            .map(|s| &s.handle)
    }

    pub fn is_live(&self, id: SurfaceId) -> bool {
        self.zones
            .values()
            .any(|z| z.surfaces.iter().any(|s| s.handle.id == id))
    }

    pub fn paused_count(&self) -> usize {
        self.zones
            .values()
            .flat_map(|z| z.surfaces.iter())
            .filter(|s| s.paused)
            .count()
    }

    /// Make `zone` active, creating its configured layers within budget.
    ///
    /// Reactivating a fading zone cancels the fade; its surfaces are kept.
    pub fn activate<F: SurfaceFactory + ?Sized>(&mut self, zone: &Zone, factory: &mut F) -> Activation {
        let id = zone.id();
        let resumed = match self.zones.get_mut(&id) {
            Some(entry) if entry.state == ZoneState::Active => return Activation::AlreadyActive,
            Some(entry) => {
                entry.state = ZoneState::Active;
                for surface in &entry.surfaces {
                    factory.cancel_fade(&surface.handle);
                }
                debug!(zone = zone.name(), "fade-out cancelled by reactivation");
                true
            }
            None => {
                self.zones.insert(
                    id,
                    ZoneEntry {
                        state: ZoneState::Active,
                        surfaces: Vec::new(),
                    },
                );
                false
            }
        };

        match self.fill_layers(zone, factory) {
            Ok(created) if resumed => Activation::Resumed { created },
            Ok(created) => {
                debug!(zone = zone.name(), created, live = self.live_count(), "zone activated");
                Activation::Started { created }
            }
            Err(()) => Activation::Degraded,
        }
    }

    /// Start fading `zone` out. Returns the ticket to complete once the fade
    /// has run, or `None` when there is nothing to fade.
    pub fn deactivate<F: SurfaceFactory + ?Sized>(
        &mut self,
        zone: ZoneId,
        now_ms: f64,
        factory: &mut F,
    ) -> Option<FadeTicket> {
        let entry = self.zones.get_mut(&zone)?;
        if entry.state != ZoneState::Active {
            return None;
        }
        if entry.surfaces.is_empty() {
            self.zones.remove(&zone);
            return None;
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        entry.state = ZoneState::FadingOut { generation };
        for surface in &entry.surfaces {
            factory.begin_fade(&surface.handle, self.fade_ms);
        }
        debug!(zone = zone.0, generation, "zone fading out");
        Some(FadeTicket {
            zone,
            generation,
            deadline_ms: now_ms + self.fade_ms,
        })
    }

    /// Release a faded zone's surfaces. Returns false for stale tickets.
    pub fn complete_fade<F: SurfaceFactory + ?Sized>(&mut self, ticket: FadeTicket, factory: &mut F) -> bool {
        let current = self.zones.get(&ticket.zone).map(|z| z.state);
        if current != Some(ZoneState::FadingOut { generation: ticket.generation }) {
            return false;
        }
        if let Some(entry) = self.zones.remove(&ticket.zone) {
            for surface in &entry.surfaces {
                factory.release(&surface.handle);
            }
            debug!(zone = ticket.zone.0, released = entry.surfaces.len(), "fade complete");
        }
        true
    }

    /// Change the budget, evicting surfaces if it shrank below the live count.
    pub fn set_budget<F: SurfaceFactory + ?Sized>(&mut self, budget: usize, factory: &mut F) {
        self.budget = budget.max(1);
        while self.live_count() > self.budget {
            if self.evict_one(None, factory).is_none() {
                break;
            }
        }
    }

    /// Pause the lowest-priority running decorative surface.
    pub fn pause_decorative<F: SurfaceFactory + ?Sized>(&mut self, factory: &mut F) -> Option<SurfaceId> {
        let victim = self
            .zones
            .values_mut()
            .filter(|z| z.state == ZoneState::Active)
            .flat_map(|z| z.surfaces.iter_mut())
            .filter(|s| !s.paused && s.handle.role.is_decorative())
            .min_by_key(|s| (s.handle.role.priority(), s.handle.id))?;
        victim.paused = true;
        factory.set_paused(&victim.handle, true);
        debug!(surface = victim.handle.id.0, role = victim.handle.role.name(), "surface paused");
        Some(victim.handle.id)
    }

    /// Resume every paused surface. Returns how many resumed.
    pub fn resume_all<F: SurfaceFactory + ?Sized>(&mut self, factory: &mut F) -> usize {
        let mut resumed = 0;
        for surface in self.zones.values_mut().flat_map(|z| z.surfaces.iter_mut()) {
            if surface.paused {
                surface.paused = false;
                factory.set_paused(&surface.handle, false);
                resumed += 1;
            }
        }
        resumed
    }

    /// Release everything immediately, pending fades included.
    pub fn teardown<F: SurfaceFactory + ?Sized>(&mut self, factory: &mut F) {
        for (_, entry) in std::mem::take(&mut self.zones) {
            for surface in &entry.surfaces {
                factory.release(&surface.handle);
            }
        }
    }

    fn fill_layers<F: SurfaceFactory + ?Sized>(&mut self, zone: &Zone, factory: &mut F) -> Result<usize, ()> {
        let id = zone.id();
        let mut wanted: Vec<LayerRole> = zone.visualizer().layers.clone();
        wanted.sort_by_key(|r| std::cmp::Reverse(r.priority()));
        wanted.dedup();

        let mut created = 0;
        for role in wanted {
            let present = self
                .zones
                .get(&id)
                .is_some_and(|z| z.surfaces.iter().any(|s| s.handle.role == role));
            if present {
                continue;
            }
            if self.live_count() >= self.budget && self.evict_one(Some(id), factory).is_none() {
                debug!(zone = zone.name(), role = role.name(), "surface budget exhausted; layer skipped");
                break;
            }

            self.next_surface += 1;
            let surface_id = SurfaceId(self.next_surface);
            let request = SurfaceRequest {
                id: surface_id,
                zone,
                role,
            };
            match factory.create(&request) {
                Ok(kind) => {
                    let handle = SurfaceHandle {
                        id: surface_id,
                        zone: id,
                        role,
                        kind,
                    };
                    if let Some(entry) = self.zones.get_mut(&id) {
                        entry.surfaces.push(LiveSurface { handle, paused: false });
                    }
                    created += 1;
                }
                Err(err) => {
                    warn!(zone = zone.name(), role = role.name(), %err, "surface creation failed; continuing without it");
                    let empty = self.zones.get(&id).map_or(true, |z| z.surfaces.is_empty());
                    return if empty { Err(()) } else { Ok(created) };
                }
            }
        }
        Ok(created)
    }

    /// Release one surface, preferring fading zones, then lowest priority,
    /// then oldest. Surfaces of `protect` are never chosen.
    fn evict_one<F: SurfaceFactory + ?Sized>(&mut self, protect: Option<ZoneId>, factory: &mut F) -> Option<SurfaceId> {
        let (zone, index) = self
            .zones
            .iter()
            .filter(|(id, _)| Some(**id) != protect)
            .flat_map(|(id, entry)| {
                let fading = matches!(entry.state, ZoneState::FadingOut { .. });
                entry.surfaces.iter().enumerate().map(move |(i, s)| {
                    let key = (!fading, s.handle.role.priority(), s.handle.id);
                    (key, *id, i)
                })
            })
            .min_by_key(|(key, _, _)| *key)
            .map(|(_, zone, i)| (zone, i))?;

        let entry = self.zones.get_mut(&zone)?;
        let victim = entry.surfaces.remove(index);
        factory.release(&victim.handle);
        if entry.surfaces.is_empty() && matches!(entry.state, ZoneState::FadingOut { .. }) {
            self.zones.remove(&zone);
        }
        debug!(
            surface = victim.handle.id.0,
            zone = zone.0,
            role = victim.handle.role.name(),
            "surface evicted for budget"
        );
        Some(victim.handle.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChoreoConfig, ZoneSpec};
    use crate::headless::{BackendEvent, HeadlessBackend};
    use crate::zone::ZoneTable;

    fn table(layers: &[&[LayerRole]]) -> ZoneTable {
        let zones = layers
            .iter()
            .enumerate()
            .map(|(i, roles)| {
                let mut spec = ZoneSpec::new(format!("z{i}"));
                spec.visualizer.layers = roles.to_vec();
                spec
            })
            .collect();
        let config = ChoreoConfig {
            zones,
            ..ChoreoConfig::default()
        };
        ZoneTable::uniform(&config, 1000.0).unwrap()
    }

    const ALL: &[LayerRole] = &[
        LayerRole::Highlight,
        LayerRole::Content,
        LayerRole::Shadow,
        LayerRole::Accent,
    ];

    #[test]
    fn activation_creates_layers_highest_priority_first() {
        let t = table(&[ALL]);
        let mut backend = HeadlessBackend::new();
        let mut lm = LifecycleManager::new(8, 800.0);
        assert_eq!(lm.activate(&t.zones()[0], &mut backend), Activation::Started { created: 4 });
        let roles: Vec<LayerRole> = backend
            .events()
            .iter()
            .filter_map(|e| match e {
                BackendEvent::Created { role, .. } => Some(*role),
                _ => None,
            })
            .collect();
        assert_eq!(
            roles,
            [LayerRole::Content, LayerRole::Accent, LayerRole::Shadow, LayerRole::Highlight]
        );
        assert_eq!(lm.activate(&t.zones()[0], &mut backend), Activation::AlreadyActive);
    }

    #[test]
    fn own_layers_beyond_budget_are_skipped() {
        let t = table(&[ALL]);
        let mut backend = HeadlessBackend::new();
        let mut lm = LifecycleManager::new(2, 800.0);
        assert_eq!(lm.activate(&t.zones()[0], &mut backend), Activation::Started { created: 2 });
        let roles: Vec<LayerRole> = lm.surfaces(ZoneId(0)).map(|s| s.role).collect();
        assert_eq!(roles, [LayerRole::Content, LayerRole::Accent]);
    }

    #[test]
    fn fading_surfaces_are_evicted_first_by_priority() {
        let t = table(&[ALL, &[LayerRole::Content, LayerRole::Accent]]);
        let mut backend = HeadlessBackend::new();
        let mut lm = LifecycleManager::new(4, 800.0);
        lm.activate(&t.zones()[0], &mut backend);
        lm.deactivate(ZoneId(0), 0.0, &mut backend).unwrap();
        backend.take_events();

        lm.activate(&t.zones()[1], &mut backend);
        assert_eq!(lm.live_count(), 4);
        let released: Vec<SurfaceId> = backend.released().collect();
        // Highlight (id 4) then Shadow (id 3) of the fading zone.
        assert_eq!(released, [SurfaceId(4), SurfaceId(3)]);
        assert!(lm.is_fading(ZoneId(0)));
    }

    #[test]
    fn reactivation_cancels_fade() {
        let t = table(&[&[LayerRole::Content]]);
        let mut backend = HeadlessBackend::new();
        let mut lm = LifecycleManager::new(4, 800.0);
        lm.activate(&t.zones()[0], &mut backend);
        let ticket = lm.deactivate(ZoneId(0), 100.0, &mut backend).unwrap();
        assert_eq!(ticket.deadline_ms, 900.0);

        assert_eq!(lm.activate(&t.zones()[0], &mut backend), Activation::Resumed { created: 0 });
        assert!(!lm.complete_fade(ticket, &mut backend));
        assert_eq!(backend.released().count(), 0);
        assert!(lm.is_active(ZoneId(0)));
    }

    #[test]
    fn completed_fade_releases_surfaces() {
        let t = table(&[&[LayerRole::Content, LayerRole::Accent]]);
        let mut backend = HeadlessBackend::new();
        let mut lm = LifecycleManager::new(4, 800.0);
        lm.activate(&t.zones()[0], &mut backend);
        let ticket = lm.deactivate(ZoneId(0), 0.0, &mut backend).unwrap();
        assert_eq!(lm.live_count(), 2);
        assert!(lm.complete_fade(ticket, &mut backend));
        assert_eq!(lm.live_count(), 0);
        assert!(backend.live().is_empty());
    }

    #[test]
    fn stale_ticket_after_refade_is_ignored() {
        let t = table(&[&[LayerRole::Content]]);
        let mut backend = HeadlessBackend::new();
        let mut lm = LifecycleManager::new(4, 800.0);
        lm.activate(&t.zones()[0], &mut backend);
        let first = lm.deactivate(ZoneId(0), 0.0, &mut backend).unwrap();
        lm.activate(&t.zones()[0], &mut backend);
        let second = lm.deactivate(ZoneId(0), 10.0, &mut backend).unwrap();
        assert_ne!(first, second);
        assert!(!lm.complete_fade(first, &mut backend));
        assert!(lm.complete_fade(second, &mut backend));
    }

    #[test]
    fn creation_failure_degrades_without_surfaces() {
        let t = table(&[ALL]);
        let mut backend = HeadlessBackend::new();
        backend.fail_creation = true;
        let mut lm = LifecycleManager::new(4, 800.0);
        assert_eq!(lm.activate(&t.zones()[0], &mut backend), Activation::Degraded);
        assert!(lm.is_active(ZoneId(0)));
        assert_eq!(lm.live_count(), 0);
        assert!(lm.deactivate(ZoneId(0), 0.0, &mut backend).is_none());
        assert!(!lm.is_active(ZoneId(0)));
    }

    #[test]
    fn pause_picks_lowest_priority_decorative_layer() {
        let t = table(&[ALL]);
        let mut backend = HeadlessBackend::new();
        let mut lm = LifecycleManager::new(8, 800.0);
        lm.activate(&t.zones()[0], &mut backend);
        let mut order = Vec::new();
        while let Some(id) = lm.pause_decorative(&mut backend) {
            order.push(lm.surfaces(ZoneId(0)).find(|s| s.id == id).unwrap().role);
        }
        assert_eq!(order, [LayerRole::Highlight, LayerRole::Shadow, LayerRole::Accent]);
        assert_eq!(lm.running_surfaces(ZoneId(0)).count(), 1);
        assert_eq!(lm.resume_all(&mut backend), 3);
    }

    #[test]
    fn shrinking_budget_evicts() {
        let t = table(&[ALL]);
        let mut backend = HeadlessBackend::new();
        let mut lm = LifecycleManager::new(8, 800.0);
        lm.activate(&t.zones()[0], &mut backend);
        lm.set_budget(1, &mut backend);
        assert_eq!(lm.live_count(), 1);
        assert_eq!(lm.surfaces(ZoneId(0)).next().map(|s| s.role), Some(LayerRole::Content));
    }

    #[test]
    fn teardown_releases_fading_and_active() {
        let t = table(&[&[LayerRole::Content], &[LayerRole::Content]]);
        let mut backend = HeadlessBackend::new();
        let mut lm = LifecycleManager::new(4, 800.0);
        lm.activate(&t.zones()[0], &mut backend);
        lm.deactivate(ZoneId(0), 0.0, &mut backend);
        lm.activate(&t.zones()[1], &mut backend);
        lm.teardown(&mut backend);
        assert_eq!(lm.live_count(), 0);
        assert!(backend.live().is_empty());
    }
}
