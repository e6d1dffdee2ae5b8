//! A backend with no DOM behind it.
//!
//! Records every call so host tools and tests can see what the browser
//! backend would have been asked to do.

use std::collections::BTreeSet;

use crate::config::SurfacePreference;
use crate::error::ChoreoError;
use crate::surface::{
    LayerRole, SurfaceFactory, SurfaceHandle, SurfaceId, SurfaceKind, SurfaceRequest, SurfaceWriter,
};
use crate::zone::ZoneId;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Created {
        id: SurfaceId,
        zone: ZoneId,
        role: LayerRole,
        kind: SurfaceKind,
    },
    FadeStarted(SurfaceId),
    FadeCancelled(SurfaceId),
    Paused(SurfaceId, bool),
    Released(SurfaceId),
    Uniforms(SurfaceId, Vec<(&'static str, f32)>),
    Css(SurfaceId, Vec<(&'static str, String)>),
    Query(SurfaceId, String),
    Root(Vec<(&'static str, String)>),
}

#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    /// When false, WebGL requests fall back to CSS surfaces.
    pub webgl_available: bool,
    /// When true, every creation fails outright.
    pub fail_creation: bool,
    events: Vec<BackendEvent>,
    live: BTreeSet<SurfaceId>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            webgl_available: true,
            fail_creation: false,
            events: Vec::new(),
            live: BTreeSet::new(),
        }
    }

    /// A backend on a device with no WebGL context.
    pub fn without_webgl() -> Self {
        Self {
            webgl_available: false,
            ..Self::new()
        }
    }

    /// A backend whose every surface creation fails.
    pub fn failing() -> Self {
        Self {
            fail_creation: true,
            ..Self::new()
        }
    }

    pub fn events(&self) -> &[BackendEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<BackendEvent> {
        std::mem::take(&mut self.events)
    }

    /// Surfaces created and not yet released.
    pub fn live(&self) -> &BTreeSet<SurfaceId> {
        &self.live
    }

    pub fn released(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.events.iter().filter_map(|e| match e {
            BackendEvent::Released(id) => Some(*id),
            _ => None,
        })
    }
}

impl SurfaceFactory for HeadlessBackend {
    fn create(&mut self, request: &SurfaceRequest<'_>) -> Result<SurfaceKind, ChoreoError> {
        if self.fail_creation {
            return Err(ChoreoError::SurfaceUnavailable {
                zone: request.zone.name().to_string(),
                reason: "headless backend refuses surfaces".into(),
            });
        }
        let kind = match request.zone.visualizer().surface {
            SurfacePreference::WebGl if self.webgl_available => SurfaceKind::WebGl,
            SurfacePreference::WebGl | SurfacePreference::Css => SurfaceKind::Css,
            SurfacePreference::Embedded { .. } => SurfaceKind::EmbeddedDocument,
        };
        self.live.insert(request.id);
        self.events.push(BackendEvent::Created {
            id: request.id,
            zone: request.zone.id(),
            role: request.role,
            kind,
        });
        Ok(kind)
    }

    fn begin_fade(&mut self, surface: &SurfaceHandle, _duration_ms: f64) {
        self.events.push(BackendEvent::FadeStarted(surface.id));
    }

    fn cancel_fade(&mut self, surface: &SurfaceHandle) {
        self.events.push(BackendEvent::FadeCancelled(surface.id));
    }

    fn set_paused(&mut self, surface: &SurfaceHandle, paused: bool) {
        self.events.push(BackendEvent::Paused(surface.id, paused));
    }

    fn release(&mut self, surface: &SurfaceHandle) {
        self.live.remove(&surface.id);
        self.events.push(BackendEvent::Released(surface.id));
    }
}

impl SurfaceWriter for HeadlessBackend {
    fn write_uniforms(&mut self, surface: &SurfaceHandle, uniforms: &[(&'static str, f32)]) {
        self.events.push(BackendEvent::Uniforms(surface.id, uniforms.to_vec()));
    }

    fn write_css(&mut self, surface: &SurfaceHandle, properties: &[(&'static str, String)]) {
        self.events.push(BackendEvent::Css(surface.id, properties.to_vec()));
    }

    fn load_query(&mut self, surface: &SurfaceHandle, query: &str) {
        self.events.push(BackendEvent::Query(surface.id, query.to_string()));
    }

    fn write_root(&mut self, properties: &[(&'static str, String)]) {
        self.events.push(BackendEvent::Root(properties.to_vec()));
    }
}
