//! Serde-backed configuration.
//!
//! Everything has a default so an empty JSON object (`{}`) is a valid
//! config describing the stock six-section page.

use serde::{Deserialize, Serialize};

use crate::error::{ChoreoError, Result};
use crate::surface::LayerRole;
use crate::zone::PhaseKind;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoreoConfig {
    /// Page sections in document order.
    pub zones: Vec<ZoneSpec>,
    /// Interior phase boundaries as fractions of a zone's span.
    pub phase_cuts: [f64; 3],
    pub phase_multipliers: PhaseTable,
    pub gesture: GestureConfig,
    pub budgets: BudgetConfig,
    /// Fade-out duration before a deactivated zone's surfaces are released.
    pub fade_ms: f64,
    /// Minimum interval between reloads of an embedded document surface.
    pub embedded_debounce_ms: f64,
    /// Maximum fractional boost gesture energy adds to intensity.
    pub energy_bonus: f64,
    pub quality: QualityConfig,
}

impl Default for ChoreoConfig {
    fn default() -> Self {
        Self {
            zones: default_zones(),
            phase_cuts: [0.2, 0.5, 0.8],
            phase_multipliers: PhaseTable::default(),
            gesture: GestureConfig::default(),
            budgets: BudgetConfig::default(),
            fade_ms: 800.0,
            embedded_debounce_ms: 250.0,
            energy_bonus: 0.3,
            quality: QualityConfig::default(),
        }
    }
}

impl ChoreoConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let [a, b, c] = self.phase_cuts;
        let cuts_ok = [a, b, c].iter().all(|x| x.is_finite()) && 0.0 < a && a < b && b < c && c < 1.0;
        if !cuts_ok {
            return Err(ChoreoError::InvalidPhaseCuts(self.phase_cuts));
        }

        for (i, zone) in self.zones.iter().enumerate() {
            if zone.id.trim().is_empty() {
                return Err(ChoreoError::InvalidConfig(format!("zone #{i} has an empty id")));
            }
            if self.zones[..i].iter().any(|z| z.id == zone.id) {
                return Err(ChoreoError::DuplicateZone(zone.id.clone()));
            }
            let [lo, hi] = zone.visualizer.intensity_range;
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return Err(ChoreoError::InvalidConfig(format!(
                    "zone `{}` intensity range [{lo}, {hi}] is not ordered",
                    zone.id
                )));
            }
        }

        if self.gesture.window == 0 {
            return Err(ChoreoError::InvalidConfig("gesture window must hold at least one sample".into()));
        }
        if !(self.gesture.calibration > 0.0) {
            return Err(ChoreoError::InvalidConfig("gesture calibration must be positive".into()));
        }
        if self.gesture.trackpad_max_delta > self.gesture.mouse_min_delta {
            return Err(ChoreoError::InvalidConfig(
                "trackpad threshold must not exceed mouse threshold".into(),
            ));
        }
        let s = &self.gesture.sensitivity;
        if s.trackpad > s.mouse {
            // Larger deltas must never produce less intensity.
            return Err(ChoreoError::InvalidConfig(
                "trackpad sensitivity must not exceed mouse sensitivity".into(),
            ));
        }
        if self.budgets.low == 0 || self.budgets.medium == 0 || self.budgets.high == 0 {
            return Err(ChoreoError::InvalidConfig("surface budgets must be at least 1".into()));
        }
        if !(self.fade_ms >= 0.0) || !(self.embedded_debounce_ms >= 0.0) {
            return Err(ChoreoError::InvalidConfig("durations must be non-negative".into()));
        }
        Ok(())
    }
}

/// One page section and its decoration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSpec {
    /// DOM id of the section element.
    pub id: String,
    #[serde(default)]
    pub visualizer: VisualizerConfig,
}

impl ZoneSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            visualizer: VisualizerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    /// Layers to create when the zone activates, any order.
    pub layers: Vec<LayerRole>,
    pub surface: SurfacePreference,
    /// Intensity at phase progress 0 and 1.
    pub intensity_range: [f64; 2],
    pub reactivity: Reactivity,
    pub base_speed: f64,
    pub base_chaos: f64,
    /// Degrees added to the document-wide hue.
    pub hue_offset: f64,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            layers: vec![LayerRole::Content, LayerRole::Accent],
            surface: SurfacePreference::WebGl,
            intensity_range: [0.3, 0.9],
            reactivity: Reactivity::default(),
            base_speed: 1.0,
            base_chaos: 0.2,
            hue_offset: 0.0,
        }
    }
}

/// Which kind of surface a zone asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurfacePreference {
    /// Owned WebGL canvas; falls back to CSS when no context is available.
    WebGl,
    /// Legacy embedded document driven by its query string.
    Embedded { src: String },
    Css,
}

/// Per-channel weights applied to the gesture energy bonus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reactivity {
    pub intensity: f64,
    pub speed: f64,
    pub chaos: f64,
}

impl Default for Reactivity {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            speed: 1.0,
            chaos: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseMultipliers {
    pub intensity: f64,
    pub morph: f64,
    pub chaos: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseTable {
    pub entry: PhaseMultipliers,
    pub development: PhaseMultipliers,
    pub flourish: PhaseMultipliers,
    pub transition: PhaseMultipliers,
}

impl PhaseTable {
    pub fn get(&self, kind: PhaseKind) -> PhaseMultipliers {
        match kind {
            PhaseKind::Entry => self.entry,
            PhaseKind::Development => self.development,
            PhaseKind::Flourish => self.flourish,
            PhaseKind::Transition => self.transition,
        }
    }
}

impl Default for PhaseTable {
    fn default() -> Self {
        Self {
            entry: PhaseMultipliers {
                intensity: 0.7,
                morph: 0.5,
                chaos: 0.2,
            },
            development: PhaseMultipliers {
                intensity: 1.0,
                morph: 1.0,
                chaos: 0.4,
            },
            flourish: PhaseMultipliers {
                intensity: 1.3,
                morph: 1.5,
                chaos: 0.8,
            },
            transition: PhaseMultipliers {
                intensity: 0.8,
                morph: 0.7,
                chaos: 0.5,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Maximum samples kept in the rolling window.
    pub window: usize,
    /// Samples older than this are dropped when sampling.
    pub window_ms: f64,
    /// Velocity (units per ms) that maps to full intensity.
    pub calibration: f64,
    /// Wheel deltas below this are treated as a trackpad.
    pub trackpad_max_delta: f64,
    /// Wheel deltas at or above this are treated as a mouse wheel.
    pub mouse_min_delta: f64,
    pub sensitivity: Sensitivity,
    /// Delta fed for one keyboard navigation press.
    pub keyboard_delta: f64,
    /// Scroll events within this long after wheel/touch input are not sampled.
    pub scroll_suppress_ms: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            window: 10,
            window_ms: 200.0,
            calibration: 10.0,
            trackpad_max_delta: 10.0,
            mouse_min_delta: 100.0,
            sensitivity: Sensitivity::default(),
            keyboard_delta: 120.0,
            scroll_suppress_ms: 80.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sensitivity {
    pub mouse: f64,
    pub trackpad: f64,
    pub touch: f64,
    pub keyboard: f64,
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self {
            mouse: 1.2,
            trackpad: 1.0,
            touch: 1.4,
            keyboard: 1.0,
        }
    }
}

/// Concurrent surface budget per device tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            low: 4,
            medium: 6,
            high: 8,
        }
    }
}

/// Adaptive quality thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Frame intervals above this count as slow.
    pub slow_frame_ms: f64,
    /// Consecutive slow frames before decorative layers are paused.
    pub degrade_after: u32,
    /// Consecutive fast frames before paused layers resume.
    pub recover_after: u32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            slow_frame_ms: 28.0,
            degrade_after: 30,
            recover_after: 120,
        }
    }
}

fn default_zones() -> Vec<ZoneSpec> {
    let mut zones: Vec<ZoneSpec> = ["hero", "technology", "portfolio", "research", "team", "contact"]
        .into_iter()
        .map(ZoneSpec::new)
        .collect();

    zones[0].visualizer.layers = vec![
        LayerRole::Content,
        LayerRole::Accent,
        LayerRole::Shadow,
        LayerRole::Highlight,
    ];
    zones[0].visualizer.intensity_range = [0.5, 1.0];

    zones[1].visualizer.hue_offset = 40.0;
    zones[1].visualizer.reactivity.speed = 1.5;

    zones[2].visualizer.layers = vec![LayerRole::Content, LayerRole::Highlight];
    zones[2].visualizer.base_chaos = 0.1;

    zones[3].visualizer.base_chaos = 0.45;
    zones[3].visualizer.reactivity.chaos = 1.6;

    zones[4].visualizer.surface = SurfacePreference::Css;
    zones[4].visualizer.layers = vec![LayerRole::Content];
    zones[4].visualizer.intensity_range = [0.2, 0.6];

    zones[5].visualizer.intensity_range = [0.2, 0.7];
    zones[5].visualizer.base_speed = 0.6;
    zones
}
