//! Maps a scroll offset onto (zone, phase, progress).

use crate::zone::{PhaseKind, Zone, ZoneId, ZoneTable};

/// Where the viewport is this frame. Superseded each frame, never versioned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSnapshot {
    pub scroll_y: f64,
    /// `scroll_y / max_scroll`, clamped to `[0, 1]`.
    pub global_progress: f64,
    pub position: Option<ZonePosition>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZonePosition {
    pub zone: ZoneId,
    pub phase: PhaseKind,
    /// Progress through the phase, `[0, 1]`.
    pub phase_progress: f64,
    /// Progress through the whole zone, `[0, 1)`.
    pub zone_progress: f64,
}

/// The zone whose `[start, end)` contains `offset`.
///
/// A boundary offset belongs to the later zone. Offsets before the first
/// zone, after the last, or in a gap between zones resolve to `None`.
pub fn zone_at(table: &ZoneTable, offset: f64) -> Option<&Zone> {
    if !offset.is_finite() {
        return None;
    }
    let zones = table.zones();
    let idx = zones.partition_point(|z| z.extent().start <= offset);
    let candidate = zones.get(idx.checked_sub(1)?)?;
    candidate.extent().contains(offset).then_some(candidate)
}

/// Full resolution of an offset within `table`.
pub fn resolve(table: &ZoneTable, scroll_y: f64, max_scroll: f64) -> ScrollSnapshot {
    let global_progress = if max_scroll > 0.0 {
        (scroll_y / max_scroll).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let position = zone_at(table, scroll_y).map(|zone| {
        let zone_progress = zone.local_progress(scroll_y);
        let (phase, phase_progress) = table.phases().locate(zone_progress);
        ZonePosition {
            zone: zone.id(),
            phase: phase.kind,
            phase_progress,
            zone_progress,
        }
    });
    ScrollSnapshot {
        scroll_y,
        global_progress,
        position,
    }
}
