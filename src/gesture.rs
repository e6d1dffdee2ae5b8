//! Gesture classification from raw wheel/touch/key/scroll deltas.
//!
//! Device detection is a heuristic. A wrong guess changes how strongly the
//! page reacts, nothing else, so every path produces a value.

use std::collections::VecDeque;

use crate::config::GestureConfig;

/// Treat a lone sample as having arrived over one nominal frame.
const MIN_SPAN_MS: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Mouse,
    Trackpad,
    Touch,
    Keyboard,
}

impl InputKind {
    pub const fn name(self) -> &'static str {
        match self {
            InputKind::Mouse => "mouse",
            InputKind::Trackpad => "trackpad",
            InputKind::Touch => "touch",
            InputKind::Keyboard => "keyboard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureState {
    pub direction: Direction,
    /// Signed units per millisecond; positive scrolls down.
    pub velocity: f64,
    /// Normalized energy in `[0, 1]`.
    pub intensity: f64,
    pub input: InputKind,
}

impl GestureState {
    pub const IDLE: GestureState = GestureState {
        direction: Direction::None,
        velocity: 0.0,
        intensity: 0.0,
        input: InputKind::Mouse,
    };
}

impl Default for GestureState {
    fn default() -> Self {
        Self::IDLE
    }
}

/// One raw input delta, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawInput {
    Wheel { delta: f64 },
    /// Finger movement; positive when content moves up (scrolling down).
    Touch { delta: f64 },
    Key { delta: f64 },
    /// Scroll position change with no direct input attached.
    Scroll { delta: f64 },
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    at_ms: f64,
    delta: f64,
    kind: InputKind,
}

#[derive(Debug, Clone)]
pub struct GestureClassifier {
    config: GestureConfig,
    samples: VecDeque<Sample>,
    last_kind: InputKind,
    last_direct_ms: Option<f64>,
    state: GestureState,
}

impl GestureClassifier {
    pub fn new(config: GestureConfig) -> Self {
        let window = config.window.max(1);
        Self {
            config,
            samples: VecDeque::with_capacity(window),
            last_kind: InputKind::Mouse,
            last_direct_ms: None,
            state: GestureState::IDLE,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// Guess the device behind a wheel delta.
    pub fn classify_wheel(&self, delta: f64) -> InputKind {
        let magnitude = delta.abs();
        if magnitude >= self.config.mouse_min_delta {
            InputKind::Mouse
        } else if magnitude < self.config.trackpad_max_delta {
            InputKind::Trackpad
        } else if self.samples.is_empty() {
            InputKind::Trackpad
        } else {
            // Mid-sized deltas continue whatever wheel the gesture started on.
            match self.last_kind {
                InputKind::Mouse => InputKind::Mouse,
                _ => InputKind::Trackpad,
            }
        }
    }

    /// Record an input event and recompute the state.
    pub fn push(&mut self, at_ms: f64, input: RawInput) -> GestureState {
        if !at_ms.is_finite() {
            return self.state;
        }
        let (delta, kind) = match input {
            RawInput::Wheel { delta } => (delta, self.classify_wheel(delta)),
            RawInput::Touch { delta } => (delta, InputKind::Touch),
            RawInput::Key { delta } => (delta, InputKind::Keyboard),
            RawInput::Scroll { delta } => {
                let suppressed = self
                    .last_direct_ms
                    .is_some_and(|t| at_ms - t < self.config.scroll_suppress_ms);
                if suppressed {
                    return self.sample(at_ms);
                }
                (delta, self.last_kind)
            }
        };
        if !delta.is_finite() {
            return self.state;
        }
        if !matches!(input, RawInput::Scroll { .. }) {
            self.last_direct_ms = Some(at_ms);
        }

        self.last_kind = kind;
        if self.samples.len() == self.config.window.max(1) {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample { at_ms, delta, kind });
        self.sample(at_ms)
    }

    /// Drop stale samples and recompute the state as of `now_ms`.
    pub fn sample(&mut self, now_ms: f64) -> GestureState {
        let horizon = now_ms - self.config.window_ms;
        while self.samples.front().is_some_and(|s| s.at_ms < horizon) {
            self.samples.pop_front();
        }
        self.state = self.compute();
        self.state
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.last_direct_ms = None;
        self.state = GestureState {
            input: self.last_kind,
            ..GestureState::IDLE
        };
    }

    fn compute(&self) -> GestureState {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return GestureState {
                input: self.last_kind,
                ..GestureState::IDLE
            };
        };
        let total: f64 = self.samples.iter().map(|s| s.delta).sum();
        let span = (last.at_ms - first.at_ms).max(MIN_SPAN_MS);
        let velocity = total / span;

        let sensitivity = match last.kind {
            InputKind::Mouse => self.config.sensitivity.mouse,
            InputKind::Trackpad => self.config.sensitivity.trackpad,
            InputKind::Touch => self.config.sensitivity.touch,
            InputKind::Keyboard => self.config.sensitivity.keyboard,
        };
        let intensity = (velocity.abs() * sensitivity / self.config.calibration).clamp(0.0, 1.0);
        let direction = if total > 0.0 {
            Direction::Down
        } else if total < 0.0 {
            Direction::Up
        } else {
            Direction::None
        };
        GestureState {
            direction,
            velocity,
            intensity,
            input: last.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> GestureClassifier {
        GestureClassifier::new(GestureConfig::default())
    }

    #[test]
    fn no_samples_means_zero_intensity() {
        let mut c = classifier();
        let state = c.sample(1000.0);
        assert_eq!(state.intensity, 0.0);
        assert_eq!(state.direction, Direction::None);
    }

    #[test]
    fn single_mouse_notch_over_one_frame() {
        let mut c = classifier();
        let state = c.push(0.0, RawInput::Wheel { delta: 120.0 });
        assert_eq!(state.input, InputKind::Mouse);
        assert_eq!(state.direction, Direction::Down);
        assert!((state.velocity - 7.5).abs() < 1e-12);
        // 7.5 units/ms * 1.2 sensitivity / 10 calibration
        assert!((state.intensity - 0.9).abs() < 1e-12);
    }

    #[test]
    fn wheel_classification_thresholds() {
        let c = classifier();
        assert_eq!(c.classify_wheel(4.0), InputKind::Trackpad);
        assert_eq!(c.classify_wheel(-150.0), InputKind::Mouse);
        assert_eq!(c.classify_wheel(40.0), InputKind::Trackpad);
    }

    #[test]
    fn touch_is_always_touch() {
        let mut c = classifier();
        let state = c.push(0.0, RawInput::Touch { delta: -300.0 });
        assert_eq!(state.input, InputKind::Touch);
        assert_eq!(state.direction, Direction::Up);
        assert_eq!(state.intensity, 1.0);
    }

    #[test]
    fn window_is_bounded() {
        let mut c = classifier();
        for i in 0..25 {
            c.push(i as f64, RawInput::Wheel { delta: 1.0 });
        }
        assert_eq!(c.samples.len(), 10);
    }

    #[test]
    fn intensity_decays_once_input_stops() {
        let mut c = classifier();
        c.push(0.0, RawInput::Wheel { delta: 120.0 });
        assert!(c.sample(100.0).intensity > 0.0);
        assert_eq!(c.sample(500.0).intensity, 0.0);
    }

    #[test]
    fn scroll_echo_of_wheel_input_is_ignored() {
        let mut c = classifier();
        let after_wheel = c.push(0.0, RawInput::Wheel { delta: 5.0 });
        let after_scroll = c.push(10.0, RawInput::Scroll { delta: 5000.0 });
        assert_eq!(after_wheel.velocity, after_scroll.velocity);

        // A lone scroll long after input is sampled as the last device.
        let state = c.push(1000.0, RawInput::Scroll { delta: 50.0 });
        assert_eq!(state.input, InputKind::Trackpad);
        assert!(state.intensity > 0.0);
    }

    #[test]
    fn non_finite_input_is_ignored() {
        let mut c = classifier();
        let state = c.push(0.0, RawInput::Wheel { delta: f64::NAN });
        assert_eq!(state, GestureState::IDLE);
    }
}
