//! Visualizer adapter: encodes a [`ParameterSet`] for each kind of surface
//! and coalesces writes to one per surface per frame.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use crate::params::ParameterSet;
use crate::surface::{SurfaceHandle, SurfaceId, SurfaceKind, SurfaceWriter};

/// Shader uniforms for a WebGL surface.
pub fn uniforms(p: &ParameterSet) -> [(&'static str, f32); 6] {
    [
        ("u_intensity", p.intensity as f32),
        ("u_hue", p.hue as f32),
        ("u_morph", p.morph_factor as f32),
        ("u_chaos", p.chaos as f32),
        ("u_speed", p.speed as f32),
        ("u_rotation", p.rotation as f32),
    ]
}

/// Custom properties for a CSS-driven surface.
pub fn css_properties(p: &ParameterSet) -> Vec<(&'static str, String)> {
    vec![
        ("--viz-intensity", format!("{:.3}", p.intensity)),
        ("--viz-hue", format!("{:.1}", p.hue)),
        ("--viz-morph", format!("{:.3}", p.morph_factor)),
        ("--viz-chaos", format!("{:.3}", p.chaos)),
        ("--viz-speed", format!("{:.3}", p.speed)),
    ]
}

/// Query string for an embedded document, e.g.
/// `intensity=0.80&hue=200.0&morphFactor=1.20&chaos=0.25&speed=1.00`.
///
/// Values are rounded so that imperceptible changes do not force a reload.
pub fn query_string(p: &ParameterSet) -> String {
    let mut q = String::with_capacity(64);
    let _ = write!(
        q,
        "intensity={:.2}&hue={:.1}&morphFactor={:.2}&chaos={:.2}&speed={:.2}",
        p.intensity, p.hue, p.morph_factor, p.chaos, p.speed
    );
    q
}

/// Values published as custom properties on the document root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootVariables {
    pub scroll_y: f64,
    pub scroll_progress: f64,
    /// Pointer position normalized to the viewport, `[0, 1]`.
    pub mouse_x: f64,
    pub mouse_y: f64,
    pub user_energy: f64,
    pub quality_multiplier: f64,
}

impl RootVariables {
    pub fn properties(&self) -> [(&'static str, String); 6] {
        [
            ("--scroll-y", format!("{:.1}", self.scroll_y)),
            ("--scroll-progress", format!("{:.4}", self.scroll_progress)),
            ("--mouse-x", format!("{:.4}", self.mouse_x)),
            ("--mouse-y", format!("{:.4}", self.mouse_y)),
            ("--user-energy", format!("{:.3}", self.user_energy)),
            ("--quality-multiplier", format!("{:.2}", self.quality_multiplier)),
        ]
    }
}

#[derive(Debug, Clone, Default)]
struct EmbeddedState {
    query: Option<String>,
    loaded_at_ms: Option<f64>,
}

#[derive(Debug)]
pub struct VisualizerAdapter {
    debounce_ms: f64,
    pending: BTreeMap<SurfaceId, (SurfaceHandle, ParameterSet)>,
    embedded: HashMap<SurfaceId, EmbeddedState>,
    root_written: HashMap<&'static str, String>,
    root_pending: Option<RootVariables>,
}

impl VisualizerAdapter {
    pub fn new(debounce_ms: f64) -> Self {
        Self {
            debounce_ms: debounce_ms.max(0.0),
            pending: BTreeMap::new(),
            embedded: HashMap::new(),
            root_written: HashMap::new(),
            root_pending: None,
        }
    }

    /// Queue `params` for `surface`, replacing anything already queued for it.
    pub fn stage(&mut self, surface: &SurfaceHandle, params: ParameterSet) {
        self.pending.insert(surface.id, (surface.clone(), params));
    }

    pub fn stage_root(&mut self, vars: RootVariables) {
        self.root_pending = Some(vars);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Keep queued work and state only for surfaces `keep` accepts.
    pub fn retain<F: FnMut(SurfaceId) -> bool>(&mut self, mut keep: F) {
        self.pending.retain(|id, _| keep(*id));
        self.embedded.retain(|id, _| keep(*id));
    }

    /// Drop queued work, including held back reloads, for surfaces `keep`
    /// rejects. Their last-loaded state is kept.
    pub fn retain_pending<F: FnMut(SurfaceId) -> bool>(&mut self, mut keep: F) {
        self.pending.retain(|id, _| keep(*id));
    }

    /// Apply everything staged this frame. Returns the number of surface
    /// writes issued.
    pub fn flush<W: SurfaceWriter + ?Sized>(&mut self, now_ms: f64, writer: &mut W) -> usize {
        let mut written = 0;
        for (id, (surface, params)) in std::mem::take(&mut self.pending) {
            match self.apply(&surface, &params, now_ms, writer) {
                Applied::Written => written += 1,
                Applied::Unchanged => {}
                Applied::Deferred => {
                    self.pending.insert(id, (surface, params));
                }
            }
        }

        if let Some(vars) = self.root_pending.take() {
            let changed: Vec<(&'static str, String)> = vars
                .properties()
                .into_iter()
                .filter(|(name, value)| self.root_written.get(name) != Some(value))
                .collect();
            if !changed.is_empty() {
                writer.write_root(&changed);
                self.root_written.extend(changed);
            }
        }
        written
    }

    /// Push one parameter set onto one surface now.
    pub fn apply<W: SurfaceWriter + ?Sized>(
        &mut self,
        surface: &SurfaceHandle,
        params: &ParameterSet,
        now_ms: f64,
        writer: &mut W,
    ) -> Applied {
        match surface.kind {
            SurfaceKind::WebGl => {
                writer.write_uniforms(surface, &uniforms(params));
                Applied::Written
            }
            SurfaceKind::Css => {
                writer.write_css(surface, &css_properties(params));
                Applied::Written
            }
            SurfaceKind::EmbeddedDocument => {
                let query = query_string(params);
                let state = self.embedded.entry(surface.id).or_default();
                if state.query.as_deref() == Some(query.as_str()) {
                    return Applied::Unchanged;
                }
                if let Some(at) = state.loaded_at_ms {
                    if now_ms - at < self.debounce_ms {
                        return Applied::Deferred;
                    }
                }
                writer.load_query(surface, &query);
                state.query = Some(query);
                state.loaded_at_ms = Some(now_ms);
                Applied::Written
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Written,
    /// Same as what the surface already shows.
    Unchanged,
    /// Held back by the reload debounce; retried on a later flush.
    Deferred,
}
