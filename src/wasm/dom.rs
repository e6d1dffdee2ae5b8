//! Browser backend: surfaces are elements appended to their zone's section.

use std::collections::HashMap;

use tracing::{debug, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, HtmlCanvasElement, HtmlElement, HtmlIFrameElement};

use super::render::TesseractRenderer;
use crate::config::SurfacePreference;
use crate::error::ChoreoError;
use crate::surface::{
    SurfaceFactory, SurfaceHandle, SurfaceId, SurfaceKind, SurfaceRequest, SurfaceWriter,
};

struct Mounted {
    element: HtmlElement,
    renderer: Option<TesseractRenderer>,
    src: Option<String>,
}

pub struct DomBackend {
    document: Document,
    fade_ms: f64,
    device_pixel_ratio: f64,
    mounted: HashMap<SurfaceId, Mounted>,
}

fn js_reason(err: JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

impl DomBackend {
    pub fn new(document: Document, fade_ms: f64, device_pixel_ratio: f64) -> Self {
        Self {
            document,
            fade_ms,
            device_pixel_ratio: device_pixel_ratio.max(1.0),
            mounted: HashMap::new(),
        }
    }

    /// Re-fit every canvas after a viewport change.
    pub fn resize(&mut self, device_pixel_ratio: f64) {
        self.device_pixel_ratio = device_pixel_ratio.max(1.0);
        for renderer in self.mounted.values().filter_map(|m| m.renderer.as_ref()) {
            renderer.resize(self.device_pixel_ratio);
        }
    }

    fn element(&self, tag: &str, request: &SurfaceRequest<'_>) -> Result<HtmlElement, JsValue> {
        let el: HtmlElement = self.document.create_element(tag)?.dyn_into()?;
        el.set_class_name(&format!("choreo-surface choreo-{}", request.role.name()));
        el.set_attribute("aria-hidden", "true")?;
        let style = el.style();
        style.set_property("position", "absolute")?;
        style.set_property("inset", "0")?;
        style.set_property("width", "100%")?;
        style.set_property("height", "100%")?;
        style.set_property("border", "0")?;
        style.set_property("pointer-events", "none")?;
        style.set_property("z-index", &(request.role.priority() as i32 - 4).to_string())?;
        style.set_property("transition", &format!("opacity {}ms ease", self.fade_ms))?;
        style.set_property("opacity", "1")?;
        Ok(el)
    }

    fn mount(&self, request: &SurfaceRequest<'_>) -> Result<(SurfaceKind, Mounted), JsValue> {
        let section = self
            .document
            .get_element_by_id(request.zone.name())
            .ok_or("section not found")?;

        let (kind, mounted) = match &request.zone.visualizer().surface {
            SurfacePreference::WebGl => {
                let el = self.element("canvas", request)?;
                let canvas: HtmlCanvasElement = el.clone().dyn_into()?;
                section.append_child(&el)?;
                match TesseractRenderer::new(&canvas, request.role) {
                    Ok(renderer) => {
                        renderer.resize(self.device_pixel_ratio);
                        (
                            SurfaceKind::WebGl,
                            Mounted {
                                element: el,
                                renderer: Some(renderer),
                                src: None,
                            },
                        )
                    }
                    Err(err) => {
                        warn!(
                            zone = request.zone.name(),
                            reason = %js_reason(err),
                            "WebGL unavailable; using CSS surface"
                        );
                        el.remove();
                        let div = self.element("div", request)?;
                        div.class_list().add_1("choreo-css")?;
                        section.append_child(&div)?;
                        (SurfaceKind::Css, Mounted { element: div, renderer: None, src: None })
                    }
                }
            }
            SurfacePreference::Embedded { src } => {
                let el = self.element("iframe", request)?;
                let frame: &HtmlIFrameElement = el.unchecked_ref();
                frame.set_src(src);
                section.append_child(&el)?;
                (
                    SurfaceKind::EmbeddedDocument,
                    Mounted {
                        element: el,
                        renderer: None,
                        src: Some(src.clone()),
                    },
                )
            }
            SurfacePreference::Css => {
                let el = self.element("div", request)?;
                el.class_list().add_1("choreo-css")?;
                section.append_child(&el)?;
                (SurfaceKind::Css, Mounted { element: el, renderer: None, src: None })
            }
        };
        Ok((kind, mounted))
    }

    fn set_style(&self, id: SurfaceId, name: &str, value: &str) {
        if let Some(m) = self.mounted.get(&id) {
            let _ = m.element.style().set_property(name, value);
        }
    }
}

impl SurfaceFactory for DomBackend {
    fn create(&mut self, request: &SurfaceRequest<'_>) -> Result<SurfaceKind, ChoreoError> {
        let (kind, mounted) =
            self.mount(request)
                .map_err(|err| ChoreoError::SurfaceUnavailable {
                    zone: request.zone.name().to_string(),
                    reason: js_reason(err),
                })?;
        debug!(surface = request.id.0, zone = request.zone.name(), ?kind, "surface mounted");
        self.mounted.insert(request.id, mounted);
        Ok(kind)
    }

    fn begin_fade(&mut self, surface: &SurfaceHandle, duration_ms: f64) {
        self.set_style(surface.id, "transition", &format!("opacity {duration_ms}ms ease"));
        self.set_style(surface.id, "opacity", "0");
    }

    fn cancel_fade(&mut self, surface: &SurfaceHandle) {
        self.set_style(surface.id, "opacity", "1");
    }

    fn set_paused(&mut self, surface: &SurfaceHandle, paused: bool) {
        self.set_style(surface.id, "visibility", if paused { "hidden" } else { "visible" });
    }

    fn release(&mut self, surface: &SurfaceHandle) {
        if let Some(m) = self.mounted.remove(&surface.id) {
            if let Some(renderer) = &m.renderer {
                renderer.lose_context();
            }
            m.element.remove();
            debug!(surface = surface.id.0, "surface released");
        }
    }
}

impl SurfaceWriter for DomBackend {
    fn write_uniforms(&mut self, surface: &SurfaceHandle, uniforms: &[(&'static str, f32)]) {
        if let Some(renderer) = self
            .mounted
            .get_mut(&surface.id)
            .and_then(|m| m.renderer.as_mut())
        {
            renderer.apply(uniforms);
        }
    }

    fn write_css(&mut self, surface: &SurfaceHandle, properties: &[(&'static str, String)]) {
        if let Some(m) = self.mounted.get(&surface.id) {
            let style = m.element.style();
            for (name, value) in properties {
                let _ = style.set_property(name, value);
            }
        }
    }

    fn load_query(&mut self, surface: &SurfaceHandle, query: &str) {
        let Some(m) = self.mounted.get(&surface.id) else {
            return;
        };
        let (Some(src), Some(frame)) = (&m.src, m.element.dyn_ref::<HtmlIFrameElement>()) else {
            return;
        };
        let base = src.split('?').next().unwrap_or(src);
        frame.set_src(&format!("{base}?{query}"));
    }

    fn write_root(&mut self, properties: &[(&'static str, String)]) {
        let Some(root) = self
            .document
            .document_element()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        else {
            return;
        };
        let style = root.style();
        for (name, value) in properties {
            let _ = style.set_property(name, value);
        }
    }
}
