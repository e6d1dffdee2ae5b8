//! Rendering surfaces and the backend seams that create and drive them.
//!
//! The split between [`SurfaceFactory`] and [`SurfaceWriter`] mirrors
//! ownership: only the lifecycle manager holds a factory, so it is the only
//! place surfaces come into or go out of existence. The adapter only writes.

use serde::{Deserialize, Serialize};

use crate::error::ChoreoError;
use crate::zone::{Zone, ZoneId};

/// Layer a surface plays within its zone. Higher priority survives longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerRole {
    /// Primary layer carrying the zone's visualizer.
    Content,
    Accent,
    Shadow,
    Highlight,
}

impl LayerRole {
    pub const fn priority(self) -> u8 {
        match self {
            LayerRole::Content => 3,
            LayerRole::Accent => 2,
            LayerRole::Shadow => 1,
            LayerRole::Highlight => 0,
        }
    }

    pub const fn is_decorative(self) -> bool {
        !matches!(self, LayerRole::Content)
    }

    pub const fn name(self) -> &'static str {
        match self {
            LayerRole::Content => "content",
            LayerRole::Accent => "accent",
            LayerRole::Shadow => "shadow",
            LayerRole::Highlight => "highlight",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Shader uniforms on an owned WebGL context.
    WebGl,
    /// Query string of an embedded document; changes reload it.
    EmbeddedDocument,
    /// CSS custom properties on a plain element.
    Css,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceHandle {
    pub id: SurfaceId,
    pub zone: ZoneId,
    pub role: LayerRole,
    pub kind: SurfaceKind,
}

/// What the lifecycle manager asks a factory to build.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceRequest<'a> {
    pub id: SurfaceId,
    pub zone: &'a Zone,
    pub role: LayerRole,
}

/// Creates and destroys surfaces.
pub trait SurfaceFactory {
    /// Build a surface for `request`.
    ///
    /// Returns the kind actually created; a factory that cannot get a WebGL
    /// context should fall back to [`SurfaceKind::Css`] rather than fail.
    fn create(&mut self, request: &SurfaceRequest<'_>) -> Result<SurfaceKind, ChoreoError>;

    /// Start fading the surface out over `duration_ms`. Resources stay live.
    fn begin_fade(&mut self, surface: &SurfaceHandle, duration_ms: f64);

    /// Bring a fading surface back to full opacity.
    fn cancel_fade(&mut self, surface: &SurfaceHandle);

    fn set_paused(&mut self, surface: &SurfaceHandle, paused: bool);

    /// Destroy the surface and free its GPU/DOM resources.
    fn release(&mut self, surface: &SurfaceHandle);
}

/// Pushes encoded parameters onto live surfaces.
pub trait SurfaceWriter {
    fn write_uniforms(&mut self, surface: &SurfaceHandle, uniforms: &[(&'static str, f32)]);

    fn write_css(&mut self, surface: &SurfaceHandle, properties: &[(&'static str, String)]);

    /// Point an embedded document at `?{query}`.
    fn load_query(&mut self, surface: &SurfaceHandle, query: &str);

    /// Custom properties on the document root.
    fn write_root(&mut self, properties: &[(&'static str, String)]);
}
