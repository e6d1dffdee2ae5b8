//! Host-side helper.
//!
//! `cargo run` replays a scroll through the configured zones on the headless
//! backend and prints where each offset lands and what would be drawn.
//! `cargo run -- --serve` builds the WASM bundle into `static/pkg` and serves
//! `static/` on port 8000.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode, Stdio};
use std::{env, fs};

use choreo_wasm::device::DeviceTier;
use choreo_wasm::headless::HeadlessBackend;
use choreo_wasm::zone::ZoneTable;
use choreo_wasm::{ChoreoConfig, ChoreoError, Engine};
use tracing::{error, info, warn};

const SECTION_HEIGHT_PX: f64 = 3000.0;
const VIEWPORT: (f64, f64) = (1280.0, 800.0);
const SAMPLES_PER_ZONE: usize = 5;

fn load_config(path: &Path) -> Result<ChoreoConfig, ChoreoError> {
    match fs::read_to_string(path) {
        Ok(json) => ChoreoConfig::from_json(&json),
        Err(err) => {
            warn!(path = %path.display(), %err, "config not readable; using defaults");
            Ok(ChoreoConfig::default())
        }
    }
}

fn preview(config: ChoreoConfig) -> Result<(), ChoreoError> {
    let table = ZoneTable::uniform(&config, SECTION_HEIGHT_PX)?;
    let end = table.document_end();
    let mut engine = Engine::new(config, table, DeviceTier::High, HeadlessBackend::new());
    engine.set_viewport(VIEWPORT.0, VIEWPORT.1);

    println!(
        "{:>8}  {:<14} {:<12} {:>6}  {:>9} {:>6} {:>6} {:>6} {:>6}  {:>4}",
        "offset", "zone", "phase", "prog", "intensity", "hue", "morph", "chaos", "speed", "live"
    );
    let steps = engine.table().len() * SAMPLES_PER_ZONE;
    let mut now = 0.0;
    for i in 0..steps {
        let offset = end * i as f64 / steps as f64;
        engine.on_scroll(now, offset, end);
        let report = engine.frame(now);
        let live = engine.lifecycle().live_count();
        match (report.position, report.params) {
            (Some(pos), Some(p)) => {
                let name = engine.table().get(pos.zone).map_or("?", |z| z.name());
                println!(
                    "{offset:>8.0}  {name:<14} {:<12} {:>6.2}  {:>9.3} {:>6.1} {:>6.3} {:>6.3} {:>6.3}  {live:>4}",
                    pos.phase.name(),
                    pos.phase_progress,
                    p.intensity,
                    p.hue,
                    p.morph_factor,
                    p.chaos,
                    p.speed,
                );
            }
            _ => println!("{offset:>8.0}  {:<14} {live:>50}", "-"),
        }
        now += 1000.0;
    }
    engine.teardown();
    info!(events = engine.backend().events().len(), "preview complete");
    Ok(())
}

fn serve() -> ExitCode {
    info!("building WASM pkg");
    match Command::new("wasm-pack")
        .args(["build", "--release", "--target", "web", "--out-dir", "static/pkg"])
        .status()
    {
        Ok(st) if st.success() => {}
        Ok(_) => {
            error!("wasm-pack finished with errors");
            return ExitCode::FAILURE;
        }
        Err(_) => warn!("wasm-pack not found in PATH; serving existing artifacts"),
    }

    info!("serving static/ at http://127.0.0.1:8000");
    match Command::new("python3")
        .args(["-m", "http.server", "8000", "--directory", "static"])
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .status()
    {
        Ok(st) if st.success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            error!(%err, "failed to start http server");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let mut config_path = PathBuf::from("static/choreo.json");
    let mut serve_site = false;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--serve" => serve_site = true,
            other => config_path = PathBuf::from(other),
        }
    }
    if serve_site {
        return serve();
    }

    match load_config(&config_path).and_then(preview) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "preview failed");
            ExitCode::FAILURE
        }
    }
}
