//! Zone table: the page's vertical extent partitioned into named zones, each
//! split into four ordered phases.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ChoreoConfig, PhaseMultipliers, PhaseTable, VisualizerConfig};
use crate::error::{ChoreoError, Result};

/// Presentation stage within a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Entry,
    Development,
    Flourish,
    Transition,
}

impl PhaseKind {
    pub const ALL: [PhaseKind; 4] = [
        PhaseKind::Entry,
        PhaseKind::Development,
        PhaseKind::Flourish,
        PhaseKind::Transition,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            PhaseKind::Entry => "entry",
            PhaseKind::Development => "development",
            PhaseKind::Flourish => "flourish",
            PhaseKind::Transition => "transition",
        }
    }
}

/// A half-open `[start, end)` sub-range of a zone's local progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Phase {
    pub kind: PhaseKind,
    pub start: f64,
    pub end: f64,
    pub multipliers: PhaseMultipliers,
}

/// The four phases shared by every zone.
///
/// Built from three interior cut points, so consecutive phases share their
/// boundary and together cover `[0, 1)` exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseLayout {
    phases: [Phase; 4],
}

impl PhaseLayout {
    pub fn new(cuts: [f64; 3], table: &PhaseTable) -> Result<Self> {
        let [a, b, c] = cuts;
        if !(0.0 < a && a < b && b < c && c < 1.0) {
            return Err(ChoreoError::InvalidPhaseCuts(cuts));
        }
        let bounds = [0.0, a, b, c, 1.0];
        let phases = PhaseKind::ALL.map(|kind| {
            let i = kind as usize;
            Phase {
                kind,
                start: bounds[i],
                end: bounds[i + 1],
                multipliers: table.get(kind),
            }
        });
        Ok(Self { phases })
    }

    pub fn phases(&self) -> &[Phase; 4] {
        &self.phases
    }

    /// Phase containing `local` (zone progress in `[0, 1)`) and the progress
    /// through that phase, clamped to `[0, 1]`.
    pub fn locate(&self, local: f64) -> (&Phase, f64) {
        let local = local.clamp(0.0, 1.0);
        let phase = self
            .phases
            .iter()
            .find(|p| local < p.end)
            .unwrap_or(&self.phases[3]);
        let progress = (local - phase.start) / (phase.end - phase.start);
        (phase, progress.clamp(0.0, 1.0))
    }
}

/// Index of a zone within its [`ZoneTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId(pub usize);

/// Scroll-offset range `[start, end)` in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub start: f64,
    pub end: f64,
}

impl Extent {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, offset: f64) -> bool {
        self.start <= offset && offset < self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    id: ZoneId,
    name: String,
    extent: Extent,
    visualizer: VisualizerConfig,
}

impl Zone {
    pub fn id(&self) -> ZoneId {
        self.id
    }

    /// DOM id of the section this zone is bound to.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn visualizer(&self) -> &VisualizerConfig {
        &self.visualizer
    }

    /// Progress through the whole zone; not clamped.
    pub fn local_progress(&self, offset: f64) -> f64 {
        (offset - self.extent.start) / self.extent.span()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneTable {
    zones: Vec<Zone>,
    phases: PhaseLayout,
}

impl ZoneTable {
    /// Build a table by measuring each configured section.
    ///
    /// `measure` returns the section's extent, or `None` when the section is
    /// missing from the page; such zones, and zones measuring empty or
    /// inverted, are skipped with a warning. Zones
    /// are ordered by start offset and must not overlap.
    pub fn from_layout<F>(config: &ChoreoConfig, mut measure: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<Extent>,
    {
        let phases = PhaseLayout::new(config.phase_cuts, &config.phase_multipliers)?;

        let mut measured = Vec::with_capacity(config.zones.len());
        for spec in &config.zones {
            let Some(extent) = measure(&spec.id) else {
                warn!(zone = %spec.id, "section not found; zone skipped");
                continue;
            };
            if !(extent.start.is_finite() && extent.end.is_finite() && extent.start < extent.end) {
                // Hidden sections measure as zero height.
                warn!(
                    zone = %spec.id,
                    start = extent.start,
                    end = extent.end,
                    "section has no extent; zone skipped"
                );
                continue;
            }
            measured.push((spec, extent));
        }

        measured.sort_by(|a, b| a.1.start.total_cmp(&b.1.start));
        for pair in measured.windows(2) {
            if pair[1].1.start < pair[0].1.end {
                return Err(ChoreoError::OverlappingZones {
                    first: pair[0].0.id.clone(),
                    second: pair[1].0.id.clone(),
                });
            }
        }

        let zones: Vec<Zone> = measured
            .into_iter()
            .enumerate()
            .map(|(i, (spec, extent))| Zone {
                id: ZoneId(i),
                name: spec.id.clone(),
                extent,
                visualizer: spec.visualizer.clone(),
            })
            .collect();
        debug!(zones = zones.len(), "zone table built");
        Ok(Self { zones, phases })
    }

    /// Back-to-back zones of equal `span`, in config order, starting at 0.
    pub fn uniform(config: &ChoreoConfig, span: f64) -> Result<Self> {
        let mut next = 0.0;
        Self::from_layout(config, |_| {
            let extent = Extent::new(next, next + span);
            next += span;
            Some(extent)
        })
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn get(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.name == name)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn phases(&self) -> &PhaseLayout {
        &self.phases
    }

    /// End offset of the last zone, or 0 for an empty table.
    pub fn document_end(&self) -> f64 {
        self.zones.last().map_or(0.0, |z| z.extent.end)
    }
}
