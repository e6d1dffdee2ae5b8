//! End-to-end scroll choreography against the headless backend.

use choreo_wasm::config::{ChoreoConfig, SurfacePreference, ZoneSpec};
use choreo_wasm::device::DeviceTier;
use choreo_wasm::headless::{BackendEvent, HeadlessBackend};
use choreo_wasm::resolver::{resolve, zone_at};
use choreo_wasm::surface::{LayerRole, SurfaceKind};
use choreo_wasm::zone::{Extent, PhaseKind, ZoneId, ZoneTable};
use choreo_wasm::Engine;
use pretty_assertions::assert_eq;

fn config(zones: usize) -> ChoreoConfig {
    ChoreoConfig {
        zones: (0..zones).map(|i| ZoneSpec::new(format!("section-{i}"))).collect(),
        ..ChoreoConfig::default()
    }
}

fn engine(zones: usize, backend: HeadlessBackend) -> Engine<HeadlessBackend> {
    let config = config(zones);
    let table = ZoneTable::uniform(&config, 3000.0).unwrap();
    let mut engine = Engine::new(config, table, DeviceTier::Medium, backend);
    engine.set_viewport(1280.0, 800.0);
    engine
}

#[test]
fn zone_boundaries_resolve_as_documented() {
    let table = ZoneTable::uniform(&config(3), 3000.0).unwrap();

    let start = resolve(&table, 0.0, 9000.0).position.unwrap();
    assert_eq!(start.zone, ZoneId(0));
    assert_eq!(start.phase, PhaseKind::Entry);
    assert_eq!(start.phase_progress, 0.0);

    let last_pixel = resolve(&table, 2999.0, 9000.0).position.unwrap();
    assert_eq!(last_pixel.zone, ZoneId(0));
    assert_eq!(last_pixel.phase, PhaseKind::Transition);
    assert!(last_pixel.phase_progress > 0.99);

    let next = resolve(&table, 3000.0, 9000.0).position.unwrap();
    assert_eq!(next.zone, ZoneId(1));
    assert_eq!(next.phase, PhaseKind::Entry);
    assert_eq!(next.phase_progress, 0.0);
}

#[test]
fn gaps_between_sections_resolve_to_no_zone() {
    let config = config(2);
    let table = ZoneTable::from_layout(&config, |id| match id {
        "section-0" => Some(Extent::new(0.0, 1000.0)),
        "section-1" => Some(Extent::new(1500.0, 2500.0)),
        _ => None,
    })
    .unwrap();
    assert!(zone_at(&table, 1200.0).is_none());
    assert_eq!(zone_at(&table, 1500.0).map(|z| z.name()), Some("section-1"));
    assert!(zone_at(&table, 2500.0).is_none());
}

#[test]
fn scrolling_through_the_page_keeps_surfaces_within_budget() {
    let mut e = engine(6, HeadlessBackend::new());
    let budget = e.lifecycle().budget();
    let mut t = 0.0;
    let mut y = 0.0;
    while y < 18_000.0 {
        e.on_wheel(t, 120.0);
        e.on_scroll(t, y, 18_000.0);
        e.frame(t);
        assert!(e.lifecycle().live_count() <= budget);
        assert!(e.backend().live().len() <= budget);
        t += 16.0;
        y += 120.0;
    }
    // Let the last fades finish.
    e.frame(t + 2000.0);
    assert_eq!(e.lifecycle().live_count(), e.backend().live().len());
}

#[test]
fn embedded_zones_reload_their_document() {
    let mut config = config(1);
    config.zones[0].visualizer.surface = SurfacePreference::Embedded {
        src: "legacy/viz.html".into(),
    };
    config.zones[0].visualizer.layers = vec![LayerRole::Content];
    let table = ZoneTable::uniform(&config, 3000.0).unwrap();
    let mut e = Engine::new(config, table, DeviceTier::High, HeadlessBackend::new());
    e.set_viewport(1280.0, 800.0);

    e.on_scroll(0.0, 0.0, 2200.0);
    e.frame(0.0);
    // Inside the debounce window nothing reloads.
    e.on_scroll(10.0, 800.0, 2200.0);
    e.frame(16.0);
    e.frame(400.0);

    let kinds: Vec<SurfaceKind> = e
        .backend()
        .events()
        .iter()
        .filter_map(|ev| match ev {
            BackendEvent::Created { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, [SurfaceKind::EmbeddedDocument]);

    let queries = e
        .backend()
        .events()
        .iter()
        .filter(|ev| matches!(ev, BackendEvent::Query(..)))
        .count();
    assert_eq!(queries, 2);
}

#[test]
fn held_back_reload_is_dropped_when_the_zone_is_left() {
    let mut config = config(1);
    config.zones[0].visualizer.surface = SurfacePreference::Embedded {
        src: "legacy/viz.html".into(),
    };
    config.zones[0].visualizer.layers = vec![LayerRole::Content];
    let table = ZoneTable::uniform(&config, 3000.0).unwrap();
    let mut e = Engine::new(config, table, DeviceTier::High, HeadlessBackend::new());
    e.set_viewport(1280.0, 800.0);

    e.on_scroll(0.0, 0.0, 3500.0);
    e.frame(0.0);
    // Held back by the debounce.
    e.on_scroll(10.0, 1500.0, 3500.0);
    e.frame(16.0);
    e.on_scroll(20.0, 3500.0, 3500.0);
    assert!(e.frame(32.0).position.is_none());
    let late = e.frame(300.0);
    assert!(late.position.is_none());
    assert_eq!(late.writes, 0);

    let queries = e
        .backend()
        .events()
        .iter()
        .filter(|ev| matches!(ev, BackendEvent::Query(..)))
        .count();
    assert_eq!(queries, 1);
}

#[test]
fn missing_webgl_degrades_to_css_surfaces() {
    let backend = HeadlessBackend::without_webgl();
    let mut e = engine(1, backend);
    e.on_scroll(0.0, 0.0, 2200.0);
    let report = e.frame(0.0);
    assert_eq!(report.writes, 2);
    assert!(e
        .backend()
        .events()
        .iter()
        .any(|ev| matches!(ev, BackendEvent::Css(..))));
    assert!(!e
        .backend()
        .events()
        .iter()
        .any(|ev| matches!(ev, BackendEvent::Uniforms(..))));
}

#[test]
fn failed_surface_creation_leaves_the_page_running() {
    let backend = HeadlessBackend::failing();
    let mut e = engine(2, backend);
    e.on_scroll(0.0, 0.0, 5200.0);
    let report = e.frame(0.0);
    assert_eq!(report.position.map(|p| p.zone), Some(ZoneId(0)));
    assert!(report.params.is_some());
    assert_eq!(report.writes, 0);
    assert_eq!(e.lifecycle().live_count(), 0);
}

#[test]
fn low_tier_gets_the_smallest_budget() {
    let config = config(4);
    let low = config.budgets.low;
    let table = ZoneTable::uniform(&config, 3000.0).unwrap();
    let mut e = Engine::new(config, table, DeviceTier::High, HeadlessBackend::new());
    e.on_scroll(0.0, 0.0, 11_200.0);
    e.frame(0.0);
    e.on_scroll(10.0, 3000.0, 11_200.0);
    e.frame(16.0);
    assert_eq!(e.lifecycle().live_count(), 4);

    e.set_tier(DeviceTier::Low);
    assert_eq!(e.lifecycle().budget(), low);
    assert!(e.lifecycle().live_count() <= low);
    assert!(e.lifecycle().is_active(ZoneId(1)));
}

#[test]
fn root_properties_follow_scroll_and_pointer() {
    let mut e = engine(1, HeadlessBackend::new());
    e.on_scroll(0.0, 1100.0, 2200.0);
    e.on_pointer_move(640.0, 200.0);
    e.frame(0.0);

    let root = e
        .backend()
        .events()
        .iter()
        .find_map(|ev| match ev {
            BackendEvent::Root(props) => Some(props.clone()),
            _ => None,
        })
        .unwrap();
    let get = |name: &str| {
        root.iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
            .unwrap()
    };
    assert_eq!(get("--scroll-y"), "1100.0");
    assert_eq!(get("--scroll-progress"), "0.5000");
    assert_eq!(get("--mouse-x"), "0.5000");
    assert_eq!(get("--mouse-y"), "0.2500");
}

#[test]
fn relayout_with_the_same_sections_keeps_surfaces() {
    let mut e = engine(2, HeadlessBackend::new());
    e.on_scroll(0.0, 0.0, 5200.0);
    e.frame(0.0);
    let before = e.backend().live().clone();

    let wider = ZoneTable::uniform(e.config(), 3200.0).unwrap();
    e.relayout(wider);
    e.frame(16.0);
    assert_eq!(e.backend().live(), &before);

    let fewer = ZoneTable::uniform(&config(1), 3200.0).unwrap();
    e.relayout(fewer);
    assert!(e.backend().live().is_empty());
}
