//! Parameter mapping: (zone, phase, progress, gesture, time) to the flat set
//! of visual parameters pushed onto surfaces.
//!
//! [`map_parameters`] is a pure function. Everything time-dependent arrives
//! as an argument, so identical inputs always give identical outputs.

use crate::config::VisualizerConfig;
use crate::gesture::GestureState;
use crate::zone::Phase;

/// Visual parameters for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSet {
    pub intensity: f64,
    /// Degrees, `[0, 360)`.
    pub hue: f64,
    pub morph_factor: f64,
    pub chaos: f64,
    pub speed: f64,
    /// 4D rotation angle in radians.
    pub rotation: f64,
}

/// Inputs to [`map_parameters`], pre-clamped by the caller.
#[derive(Debug, Clone, Copy)]
pub struct MapInput<'a> {
    pub visualizer: &'a VisualizerConfig,
    pub phase: &'a Phase,
    /// Progress through `phase`, `[0, 1]`.
    pub phase_progress: f64,
    /// Progress through the whole document, `[0, 1]`.
    pub global_progress: f64,
    pub gesture: &'a GestureState,
    /// Maximum fractional boost gesture energy can add.
    pub energy_bonus: f64,
    pub t_ms: f64,
}

pub fn lerp(lo: f64, hi: f64, t: f64) -> f64 {
    lo + (hi - lo) * t
}

pub fn map_parameters(input: &MapInput<'_>) -> ParameterSet {
    let viz = input.visualizer;
    let multipliers = input.phase.multipliers;
    let energy = input.gesture.intensity.clamp(0.0, 1.0);
    let bonus = |weight: f64| 1.0 + input.energy_bonus * energy * weight;

    let [lo, hi] = viz.intensity_range;
    let base = lerp(lo, hi, input.phase_progress);
    let intensity = base * multipliers.intensity * bonus(viz.reactivity.intensity);

    // Morph swells through each phase, scaled by the phase's own factor.
    let morph_factor = multipliers.morph * lerp(0.8, 1.2, input.phase_progress);
    let chaos = viz.base_chaos * multipliers.chaos.max(0.0) * bonus(viz.reactivity.chaos)
        + energy * 0.1 * viz.reactivity.chaos;
    let speed = viz.base_speed * bonus(viz.reactivity.speed);

    let hue = (input.global_progress * 360.0 + viz.hue_offset).rem_euclid(360.0);
    let rotation = (input.t_ms / 1000.0 * speed).rem_euclid(std::f64::consts::TAU);

    ParameterSet {
        intensity,
        hue,
        morph_factor,
        chaos,
        speed,
        rotation,
    }
}
