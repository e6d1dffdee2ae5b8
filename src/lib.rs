//! Scroll-driven choreography for 4D visualizer surfaces.
//!
//! The page is split into zones, one per content section. Scroll position
//! resolves to a zone and a phase inside it, input gestures add energy, and
//! the result is mapped onto whatever surfaces the zone owns: WebGL canvases,
//! embedded documents or plain CSS custom properties. Surfaces are created on
//! entry, faded on exit and released afterwards, within a per-device budget.
//!
//! Everything except the `wasm` module is plain Rust and runs on the host;
//! the browser glue is compiled only for `wasm32`.

#![cfg_attr(target_arch = "wasm32", allow(dead_code))]

pub mod adapter;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod gesture;
pub mod headless;
pub mod lifecycle;
pub mod params;
pub mod polytope;
pub mod ready;
pub mod resolver;
pub mod scheduler;
pub mod surface;
pub mod tilt;
pub mod zone;

pub use config::ChoreoConfig;
pub use engine::{Engine, FrameReport};
pub use error::{ChoreoError, Result};

#[cfg(target_arch = "wasm32")]
pub use wasm::{boot, Choreographer};

// Only compile wasm-specific code when targeting wasm32.

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::rc::Rc;

    use tracing::Level;
    use wasm_bindgen::prelude::*;

    use crate::config::ChoreoConfig;

    mod console;
    mod dom;
    mod render;
    mod runtime;

    use runtime::Host;

    #[wasm_bindgen(start)]
    pub fn main() {
        console::install(Level::INFO);
    }

    /// Start choreographing the current page.
    ///
    /// `config_json` overrides the built-in zone set; pass nothing for
    /// defaults. Mounting waits for `DOMContentLoaded` if the document is
    /// still parsing.
    #[wasm_bindgen]
    pub fn boot(config_json: Option<String>) -> Result<Choreographer, JsValue> {
        let config = match config_json.as_deref() {
            Some(json) => ChoreoConfig::from_json(json),
            None => Ok(ChoreoConfig::default()),
        }
        .map_err(|err| JsValue::from_str(&err.to_string()))?;
        let host = Host::new(config)?;
        host.start()?;
        Ok(Choreographer { host })
    }

    #[wasm_bindgen]
    pub struct Choreographer {
        host: Rc<Host>,
    }

    #[wasm_bindgen]
    impl Choreographer {
        /// Call `callback` once surfaces are mounted; immediately if they
        /// already are.
        #[wasm_bindgen(js_name = whenReady)]
        pub fn when_ready(&self, callback: js_sys::Function) {
            self.host.ready().on_ready(move |_| {
                if let Err(err) = callback.call0(&JsValue::NULL) {
                    tracing::warn!(reason = ?err, "ready callback threw");
                }
            });
        }

        #[wasm_bindgen(js_name = isReady)]
        pub fn is_ready(&self) -> bool {
            self.host.ready().is_ready()
        }

        /// Name of the zone under the viewport, if any.
        #[wasm_bindgen(js_name = currentZone)]
        pub fn current_zone(&self) -> Option<String> {
            self.host
                .with_engine(|e| {
                    let id = e.current_zone()?;
                    e.table().get(id).map(|z| z.name().to_string())
                })
                .flatten()
        }

        #[wasm_bindgen(js_name = liveSurfaces)]
        pub fn live_surfaces(&self) -> usize {
            self.host
                .with_engine(|e| e.lifecycle().live_count())
                .unwrap_or(0)
        }

        pub fn teardown(&self) {
            self.host.teardown();
        }
    }
}
