//! Device tiering and adaptive quality.

use crate::config::{BudgetConfig, QualityConfig};

/// What the host could tell us about the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProfile {
    /// `navigator.hardwareConcurrency`.
    pub cores: u32,
    /// `navigator.deviceMemory` in GB, when exposed.
    pub memory_gb: Option<f64>,
    pub viewport_width: f64,
    pub touch: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceTier {
    Low,
    Medium,
    High,
}

impl DeviceTier {
    pub fn detect(profile: &DeviceProfile) -> Self {
        let memory = profile.memory_gb.unwrap_or(4.0);
        let small_touch = profile.touch && profile.viewport_width < 768.0;
        if profile.cores <= 2 || memory <= 2.0 || small_touch {
            DeviceTier::Low
        } else if profile.cores >= 8 && memory >= 8.0 && profile.viewport_width >= 1280.0 {
            DeviceTier::High
        } else {
            DeviceTier::Medium
        }
    }

    pub fn budget(self, budgets: &BudgetConfig) -> usize {
        match self {
            DeviceTier::Low => budgets.low,
            DeviceTier::Medium => budgets.medium,
            DeviceTier::High => budgets.high,
        }
    }

    /// Baseline for `--quality-multiplier`.
    pub const fn quality(self) -> f64 {
        match self {
            DeviceTier::Low => 0.6,
            DeviceTier::Medium => 0.85,
            DeviceTier::High => 1.0,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            DeviceTier::Low => "low",
            DeviceTier::Medium => "medium",
            DeviceTier::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityAction {
    Hold,
    /// Sustained slow frames: shed a decorative layer.
    Degrade,
    /// Sustained fast frames: bring paused layers back.
    Recover,
}

/// Watches frame intervals and asks for quality changes on sustained runs.
#[derive(Debug, Clone)]
pub struct QualityGovernor {
    config: QualityConfig,
    slow_run: u32,
    fast_run: u32,
    steps_down: u32,
}

const STEP: f64 = 0.15;
const FLOOR: f64 = 0.4;

impl QualityGovernor {
    pub fn new(config: QualityConfig) -> Self {
        Self {
            config,
            slow_run: 0,
            fast_run: 0,
            steps_down: 0,
        }
    }

    pub fn observe(&mut self, interval_ms: f64) -> QualityAction {
        if !interval_ms.is_finite() || interval_ms <= 0.0 {
            return QualityAction::Hold;
        }
        if interval_ms > self.config.slow_frame_ms {
            self.fast_run = 0;
            self.slow_run += 1;
            if self.slow_run >= self.config.degrade_after.max(1) {
                self.slow_run = 0;
                self.steps_down += 1;
                return QualityAction::Degrade;
            }
        } else {
            self.slow_run = 0;
            self.fast_run += 1;
            if self.steps_down > 0 && self.fast_run >= self.config.recover_after.max(1) {
                self.fast_run = 0;
                self.steps_down = 0;
                return QualityAction::Recover;
            }
        }
        QualityAction::Hold
    }

    /// Multiplier applied on top of the tier's baseline.
    pub fn factor(&self) -> f64 {
        (1.0 - STEP * self.steps_down as f64).max(FLOOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(cores: u32, memory: Option<f64>, width: f64, touch: bool) -> DeviceProfile {
        DeviceProfile {
            cores,
            memory_gb: memory,
            viewport_width: width,
            touch,
        }
    }

    #[test]
    fn tiers() {
        assert_eq!(DeviceTier::detect(&profile(8, Some(8.0), 1440.0, false)), DeviceTier::High);
        assert_eq!(DeviceTier::detect(&profile(8, None, 1440.0, false)), DeviceTier::Medium);
        assert_eq!(DeviceTier::detect(&profile(8, Some(8.0), 390.0, true)), DeviceTier::Low);
        assert_eq!(DeviceTier::detect(&profile(2, Some(8.0), 1440.0, false)), DeviceTier::Low);
        let budgets = BudgetConfig::default();
        assert_eq!(DeviceTier::Low.budget(&budgets), 4);
        assert_eq!(DeviceTier::High.budget(&budgets), 8);
    }

    #[test]
    fn governor_degrades_then_recovers() {
        let mut g = QualityGovernor::new(QualityConfig {
            slow_frame_ms: 20.0,
            degrade_after: 3,
            recover_after: 2,
        });
        assert_eq!(g.observe(40.0), QualityAction::Hold);
        assert_eq!(g.observe(40.0), QualityAction::Hold);
        assert_eq!(g.observe(40.0), QualityAction::Degrade);
        assert!((g.factor() - 0.85).abs() < 1e-12);
        assert_eq!(g.observe(16.0), QualityAction::Hold);
        assert_eq!(g.observe(16.0), QualityAction::Recover);
        assert_eq!(g.factor(), 1.0);
        assert_eq!(g.observe(16.0), QualityAction::Hold);
    }
}
