//! Composition root.
//!
//! [`Engine`] owns exactly one of each component and wires them together
//! explicitly. Input handlers only record state; all visual work happens in
//! [`Engine::frame`], which runs a strict pipeline:
//!
//! 1. due timers (fade completions)
//! 2. gesture sampling
//! 3. zone resolution
//! 4. lifecycle transitions
//! 5. parameter mapping
//! 6. adapter flush (surfaces and root custom properties)

use std::collections::HashMap;

use tracing::{debug, info};

use crate::adapter::{RootVariables, VisualizerAdapter};
use crate::config::ChoreoConfig;
use crate::device::{DeviceTier, QualityAction, QualityGovernor};
use crate::gesture::{GestureClassifier, GestureState, RawInput};
use crate::lifecycle::{FadeTicket, LifecycleManager};
use crate::params::{map_parameters, MapInput, ParameterSet};
use crate::resolver::{self, ScrollSnapshot, ZonePosition};
use crate::scheduler::{FrameScheduler, TaskId};
use crate::surface::{SurfaceFactory, SurfaceId, SurfaceWriter};
use crate::zone::{ZoneId, ZoneTable};

/// What one call to [`Engine::frame`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub position: Option<ZonePosition>,
    pub params: Option<ParameterSet>,
    /// Surface writes issued by the adapter.
    pub writes: usize,
    /// Whether another frame should be requested.
    pub wants_frame: bool,
}

impl FrameReport {
    const IDLE: FrameReport = FrameReport {
        position: None,
        params: None,
        writes: 0,
        wants_frame: false,
    };
}

pub struct Engine<B> {
    config: ChoreoConfig,
    table: ZoneTable,
    gesture: GestureClassifier,
    lifecycle: LifecycleManager,
    adapter: VisualizerAdapter,
    scheduler: FrameScheduler<Engine<B>>,
    backend: B,
    tier: DeviceTier,
    governor: QualityGovernor,

    scroll_y: f64,
    max_scroll: f64,
    viewport: (f64, f64),
    pointer: (f64, f64),
    current: Option<ZoneId>,
    fades: HashMap<ZoneId, TaskId>,
    snapshot: ScrollSnapshot,
    last_frame_ms: Option<f64>,
    torn_down: bool,
}

impl<B> Engine<B>
where
    B: SurfaceFactory + SurfaceWriter + 'static,
{
    pub fn new(config: ChoreoConfig, table: ZoneTable, tier: DeviceTier, backend: B) -> Self {
        let lifecycle = LifecycleManager::new(tier.budget(&config.budgets), config.fade_ms);
        info!(
            zones = table.len(),
            tier = tier.name(),
            budget = lifecycle.budget(),
            "choreography engine ready"
        );
        Self {
            gesture: GestureClassifier::new(config.gesture.clone()),
            adapter: VisualizerAdapter::new(config.embedded_debounce_ms),
            governor: QualityGovernor::new(config.quality),
            scheduler: FrameScheduler::new(),
            lifecycle,
            table,
            backend,
            tier,
            scroll_y: 0.0,
            max_scroll: 0.0,
            viewport: (0.0, 0.0),
            pointer: (0.5, 0.5),
            current: None,
            fades: HashMap::new(),
            snapshot: ScrollSnapshot {
                scroll_y: 0.0,
                global_progress: 0.0,
                position: None,
            },
            last_frame_ms: None,
            torn_down: false,
            config,
        }
    }

    pub fn config(&self) -> &ChoreoConfig {
        &self.config
    }

    pub fn table(&self) -> &ZoneTable {
        &self.table
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn snapshot(&self) -> &ScrollSnapshot {
        &self.snapshot
    }

    pub fn gesture_state(&self) -> &GestureState {
        self.gesture.state()
    }

    pub fn current_zone(&self) -> Option<ZoneId> {
        self.current
    }

    pub fn tier(&self) -> DeviceTier {
        self.tier
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Ask for a frame; true when the host must schedule one.
    pub fn request_frame(&mut self) -> bool {
        self.scheduler.request_frame()
    }

    /// The host could not schedule the frame it was asked for.
    pub fn frame_request_failed(&mut self) {
        self.scheduler.cancel_frame_request();
    }

    pub fn on_wheel(&mut self, now_ms: f64, delta_y: f64) {
        self.gesture.push(now_ms, RawInput::Wheel { delta: delta_y });
    }

    pub fn on_touch_move(&mut self, now_ms: f64, delta_y: f64) {
        self.gesture.push(now_ms, RawInput::Touch { delta: delta_y });
    }

    /// Feed a navigation key. Returns false for keys that do not scroll.
    pub fn on_key(&mut self, now_ms: f64, key: &str) -> bool {
        let step = self.config.gesture.keyboard_delta;
        let page = (self.viewport.1 * 0.9).max(step);
        let delta = match key {
            "ArrowDown" => step,
            "ArrowUp" => -step,
            "PageDown" | " " => page,
            "PageUp" => -page,
            "Home" => -self.scroll_y,
            "End" => self.max_scroll - self.scroll_y,
            _ => return false,
        };
        self.gesture.push(now_ms, RawInput::Key { delta });
        true
    }

    /// Take the scroll position the page loaded at. Not a gesture.
    pub fn seed_scroll(&mut self, scroll_y: f64, max_scroll: f64) {
        self.scroll_y = scroll_y;
        self.max_scroll = max_scroll.max(0.0);
    }

    pub fn on_scroll(&mut self, now_ms: f64, scroll_y: f64, max_scroll: f64) {
        let delta = scroll_y - self.scroll_y;
        self.scroll_y = scroll_y;
        self.max_scroll = max_scroll.max(0.0);
        if delta != 0.0 {
            self.gesture.push(now_ms, RawInput::Scroll { delta });
        }
    }

    /// Pointer position in viewport pixels.
    pub fn on_pointer_move(&mut self, x: f64, y: f64) {
        let (w, h) = self.viewport;
        if w > 0.0 && h > 0.0 {
            self.pointer = ((x / w).clamp(0.0, 1.0), (y / h).clamp(0.0, 1.0));
        }
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = (width.max(0.0), height.max(0.0));
    }

    pub fn set_tier(&mut self, tier: DeviceTier) {
        self.tier = tier;
        self.lifecycle
            .set_budget(tier.budget(&self.config.budgets), &mut self.backend);
    }

    /// Swap in a re-measured table.
    ///
    /// When the same sections appear in the same order zone ids stay valid
    /// and live surfaces are kept; otherwise everything is released and the
    /// next frame starts fresh.
    pub fn relayout(&mut self, table: ZoneTable) {
        let same = self
            .table
            .zones()
            .iter()
            .map(|z| z.name())
            .eq(table.zones().iter().map(|z| z.name()));
        self.table = table;
        if !same {
            debug!("zone set changed; releasing surfaces");
            self.release_all();
        }
    }

    /// Run one frame of the pipeline at `now_ms`.
    pub fn frame(&mut self, now_ms: f64) -> FrameReport {
        if self.torn_down {
            return FrameReport::IDLE;
        }
        for task in self.scheduler.begin_frame(now_ms) {
            task(self, now_ms);
        }
        self.track_frame_time(now_ms);

        let gesture = self.gesture.sample(now_ms);

        self.snapshot = resolver::resolve(&self.table, self.scroll_y, self.max_scroll);
        let position = self.snapshot.position;

        let next = position.map(|p| p.zone);
        if next != self.current {
            if let Some(old) = self.current {
                self.deactivate(old, now_ms);
            }
            if let Some(new) = next {
                self.activate(new);
            }
            self.current = next;
        }
        let lifecycle = &self.lifecycle;
        self.adapter.retain(|id| lifecycle.is_live(id));
        // Only the current zone's running surfaces may still be written.
        let running: Vec<SurfaceId> = next
            .map(|zone| lifecycle.running_surfaces(zone).map(|s| s.id).collect())
            .unwrap_or_default();
        self.adapter.retain_pending(|id| running.contains(&id));

        let params = position.and_then(|pos| self.map(&pos, &gesture, now_ms));
        if let (Some(pos), Some(p)) = (position, params) {
            for surface in self.lifecycle.running_surfaces(pos.zone) {
                self.adapter.stage(surface, p);
            }
        }
        self.adapter.stage_root(RootVariables {
            scroll_y: self.scroll_y,
            scroll_progress: self.snapshot.global_progress,
            mouse_x: self.pointer.0,
            mouse_y: self.pointer.1,
            user_energy: gesture.intensity,
            quality_multiplier: self.quality_multiplier(),
        });
        let writes = self.adapter.flush(now_ms, &mut self.backend);

        FrameReport {
            position,
            params,
            writes,
            wants_frame: self.wants_frame(),
        }
    }

    /// True while anything is animating or waiting on a timer.
    pub fn wants_frame(&self) -> bool {
        !self.torn_down
            && (self.current.is_some()
                || self.scheduler.pending_timers() > 0
                || self.gesture.state().intensity > 0.0)
    }

    pub fn quality_multiplier(&self) -> f64 {
        self.tier.quality() * self.governor.factor()
    }

    /// Cancel pending timers and release every surface now.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.release_all();
        self.scheduler.stop();
        self.gesture.reset();
        self.torn_down = true;
        info!("choreography engine torn down");
    }

    fn map(&self, pos: &ZonePosition, gesture: &GestureState, now_ms: f64) -> Option<ParameterSet> {
        let zone = self.table.get(pos.zone)?;
        let phase = &self.table.phases().phases()[pos.phase as usize];
        Some(map_parameters(&MapInput {
            visualizer: zone.visualizer(),
            phase,
            phase_progress: pos.phase_progress,
            global_progress: self.snapshot.global_progress,
            gesture,
            energy_bonus: self.config.energy_bonus,
            t_ms: now_ms,
        }))
    }

    fn activate(&mut self, id: ZoneId) {
        if let Some(task) = self.fades.remove(&id) {
            self.scheduler.cancel(task);
        }
        if let Some(zone) = self.table.get(id) {
            let outcome = self.lifecycle.activate(zone, &mut self.backend);
            debug!(zone = zone.name(), ?outcome, "zone entered");
        }
    }

    fn deactivate(&mut self, id: ZoneId, now_ms: f64) {
        if let Some(ticket) = self.lifecycle.deactivate(id, now_ms, &mut self.backend) {
            let task = self.scheduler.at(
                ticket.deadline_ms,
                Box::new(move |engine: &mut Engine<B>, _now: f64| engine.finish_fade(ticket)),
            );
            self.fades.insert(id, task);
        }
    }

    fn finish_fade(&mut self, ticket: FadeTicket) {
        self.fades.remove(&ticket.zone);
        self.lifecycle.complete_fade(ticket, &mut self.backend);
    }

    fn release_all(&mut self) {
        for (_, task) in self.fades.drain() {
            self.scheduler.cancel(task);
        }
        self.lifecycle.teardown(&mut self.backend);
        self.adapter.retain(|_| false);
        self.current = None;
    }

    fn track_frame_time(&mut self, now_ms: f64) {
        if let Some(prev) = self.last_frame_ms {
            match self.governor.observe(now_ms - prev) {
                QualityAction::Degrade => {
                    if let Some(id) = self.lifecycle.pause_decorative(&mut self.backend) {
                        debug!(surface = id.0, "slow frames; decorative layer paused");
                    }
                }
                QualityAction::Recover => {
                    let resumed = self.lifecycle.resume_all(&mut self.backend);
                    debug!(resumed, "frame rate recovered");
                }
                QualityAction::Hold => {}
            }
        }
        self.last_frame_ms = Some(now_ms);
    }
}
