//! Property-based invariants for the choreography core.
//!
//! 1. An offset inside the document resolves to at most one zone
//! 2. The four phases tile a zone without gaps
//! 3. Parameter mapping is pure
//! 4. The live surface count never exceeds the budget
//! 5. Reactivating a zone never releases its surfaces
//! 6. Larger wheel deltas never produce less gesture intensity

#![cfg(not(target_arch = "wasm32"))]

use choreo_wasm::config::{ChoreoConfig, GestureConfig, VisualizerConfig, ZoneSpec};
use choreo_wasm::gesture::{GestureClassifier, GestureState, InputKind, RawInput};
use choreo_wasm::headless::HeadlessBackend;
use choreo_wasm::lifecycle::LifecycleManager;
use choreo_wasm::params::{map_parameters, MapInput};
use choreo_wasm::resolver::{resolve, zone_at};
use choreo_wasm::surface::LayerRole;
use choreo_wasm::zone::{Extent, PhaseKind, ZoneId, ZoneTable};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────

/// Section heights with optional gaps before each one.
fn layout_strategy() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((0.0f64..500.0, 1.0f64..4000.0), 1..8)
}

fn table_from(layout: &[(f64, f64)]) -> ZoneTable {
    let config = ChoreoConfig {
        zones: (0..layout.len()).map(|i| ZoneSpec::new(format!("z{i}"))).collect(),
        ..ChoreoConfig::default()
    };
    let mut cursor = 0.0;
    let extents: Vec<Extent> = layout
        .iter()
        .map(|&(gap, height)| {
            let start = cursor + gap;
            cursor = start + height;
            Extent::new(start, cursor)
        })
        .collect();
    ZoneTable::from_layout(&config, |id| {
        let i: usize = id[1..].parse().ok()?;
        extents.get(i).copied()
    })
    .unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Activate(usize),
    Deactivate(usize),
    CompleteFades,
    Budget(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..6).prop_map(Op::Activate),
        3 => (0usize..6).prop_map(Op::Deactivate),
        1 => Just(Op::CompleteFades),
        1 => (1usize..9).prop_map(Op::Budget),
    ]
}

fn layered_table() -> ZoneTable {
    let visualizer = VisualizerConfig {
        layers: vec![
            LayerRole::Content,
            LayerRole::Accent,
            LayerRole::Shadow,
            LayerRole::Highlight,
        ],
        ..VisualizerConfig::default()
    };
    let config = ChoreoConfig {
        zones: (0..6)
            .map(|i| ZoneSpec {
                id: format!("z{i}"),
                visualizer: visualizer.clone(),
            })
            .collect(),
        ..ChoreoConfig::default()
    };
    ZoneTable::uniform(&config, 1000.0).unwrap()
}

// ── Properties ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn offsets_resolve_to_at_most_one_zone(layout in layout_strategy(), frac in 0.0f64..1.0) {
        let table = table_from(&layout);
        let offset = table.document_end() * frac;
        let containing = table.zones().iter().filter(|z| z.extent().contains(offset)).count();
        prop_assert!(containing <= 1);
        let resolved = zone_at(&table, offset).map(|z| z.id());
        let expected = table.zones().iter().find(|z| z.extent().contains(offset)).map(|z| z.id());
        prop_assert_eq!(resolved, expected);
    }

    #[test]
    fn phases_cover_the_whole_zone(local in 0.0f64..1.0) {
        let table = ZoneTable::uniform(&ChoreoConfig::default(), 1000.0).unwrap();
        let (phase, progress) = table.phases().locate(local);
        prop_assert!(phase.start <= local && local < phase.end);
        prop_assert!((0.0..=1.0).contains(&progress));
    }

    #[test]
    fn resolution_reports_progress_in_range(layout in layout_strategy(), frac in 0.0f64..1.0) {
        let table = table_from(&layout);
        let end = table.document_end();
        let snap = resolve(&table, end * frac, end);
        prop_assert!((0.0..=1.0).contains(&snap.global_progress));
        if let Some(pos) = snap.position {
            prop_assert!((0.0..1.0).contains(&pos.zone_progress));
            prop_assert!((0.0..=1.0).contains(&pos.phase_progress));
            prop_assert!(PhaseKind::ALL.contains(&pos.phase));
        }
    }

    #[test]
    fn mapping_is_pure(
        progress in 0.0f64..=1.0,
        global in 0.0f64..=1.0,
        energy in 0.0f64..=1.0,
        t_ms in 0.0f64..1.0e7,
        phase_idx in 0usize..4,
    ) {
        let table = ZoneTable::uniform(&ChoreoConfig::default(), 1000.0).unwrap();
        let visualizer = VisualizerConfig::default();
        let gesture = GestureState { intensity: energy, ..GestureState::IDLE };
        let input = MapInput {
            visualizer: &visualizer,
            phase: &table.phases().phases()[phase_idx],
            phase_progress: progress,
            global_progress: global,
            gesture: &gesture,
            energy_bonus: 0.3,
            t_ms,
        };
        let a = map_parameters(&input);
        let b = map_parameters(&input);
        prop_assert_eq!(a, b);
        prop_assert!((0.0..360.0).contains(&a.hue));
        prop_assert!((0.0..std::f64::consts::TAU).contains(&a.rotation));
    }

    #[test]
    fn live_surfaces_never_exceed_budget(
        budget in 1usize..9,
        ops in prop::collection::vec(op_strategy(), 1..60),
    ) {
        let table = layered_table();
        let mut backend = HeadlessBackend::new();
        let mut lm = LifecycleManager::new(budget, 800.0);
        let mut tickets = Vec::new();
        for (step, op) in ops.into_iter().enumerate() {
            match op {
                Op::Activate(z) => {
                    lm.activate(&table.zones()[z], &mut backend);
                }
                Op::Deactivate(z) => {
                    tickets.extend(lm.deactivate(ZoneId(z), step as f64, &mut backend));
                }
                Op::CompleteFades => {
                    for ticket in tickets.drain(..) {
                        lm.complete_fade(ticket, &mut backend);
                    }
                }
                Op::Budget(b) => lm.set_budget(b, &mut backend),
            }
            prop_assert!(lm.live_count() <= lm.budget());
            prop_assert_eq!(lm.live_count(), backend.live().len());
        }
    }

    #[test]
    fn reactivation_never_releases(zone in 0usize..6, budget in 4usize..9) {
        let table = layered_table();
        let mut backend = HeadlessBackend::new();
        let mut lm = LifecycleManager::new(budget, 800.0);
        let z = &table.zones()[zone];
        lm.activate(z, &mut backend);
        let before: Vec<_> = lm.surfaces(z.id()).map(|s| s.id).collect();
        let _ticket = lm.deactivate(z.id(), 0.0, &mut backend);
        lm.activate(z, &mut backend);
        let after: Vec<_> = lm.surfaces(z.id()).map(|s| s.id).collect();
        prop_assert_eq!(&before, &after);
        prop_assert_eq!(backend.released().count(), 0);
    }

    #[test]
    fn wheel_intensity_is_monotonic(a in 0.0f64..400.0, b in 0.0f64..400.0) {
        let (small, large) = if a <= b { (a, b) } else { (b, a) };
        let intensity = |delta: f64| {
            let mut g = GestureClassifier::new(GestureConfig::default());
            g.push(0.0, RawInput::Wheel { delta }).intensity
        };
        prop_assert!(intensity(small) <= intensity(large));
    }

    #[test]
    fn large_wheel_deltas_read_as_mouse(delta in 100.0f64..1000.0) {
        let g = GestureClassifier::new(GestureConfig::default());
        prop_assert_eq!(g.classify_wheel(delta), InputKind::Mouse);
    }
}
