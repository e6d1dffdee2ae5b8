//! Page wiring: DOM events in, one animation frame loop out.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    AddEventListenerOptions, Document, Event, EventTarget, HtmlElement, KeyboardEvent,
    MouseEvent, TouchEvent, WheelEvent, Window,
};

use super::dom::DomBackend;
use crate::config::ChoreoConfig;
use crate::device::{DeviceProfile, DeviceTier};
use crate::engine::Engine;
use crate::error::ChoreoError;
use crate::ready::ReadySignal;
use crate::tilt::{self, Rect};
use crate::zone::{Extent, ZoneTable};

const TILT_MAX_DEG: f64 = 8.0;
const LINE_HEIGHT_PX: f64 = 16.0;

struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

/// Owns the engine for one page and everything the browser calls back into.
pub struct Host {
    window: Window,
    document: Document,
    config: ChoreoConfig,
    engine: RefCell<Option<Engine<DomBackend>>>,
    frame_cb: RefCell<Option<Closure<dyn FnMut(f64)>>>,
    raf_id: Cell<Option<i32>>,
    listeners: RefCell<Vec<Listener>>,
    last_touch_y: Cell<Option<f64>>,
    ready: ReadySignal<()>,
}

impl Host {
    pub fn new(config: ChoreoConfig) -> Result<Rc<Self>, JsValue> {
        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        Ok(Rc::new(Self {
            window,
            document,
            config,
            engine: RefCell::new(None),
            frame_cb: RefCell::new(None),
            raf_id: Cell::new(None),
            listeners: RefCell::new(Vec::new()),
            last_touch_y: Cell::new(None),
            ready: ReadySignal::new(),
        }))
    }

    pub fn ready(&self) -> &ReadySignal<()> {
        &self.ready
    }

    /// Mount now, or once the document has parsed.
    pub fn start(self: &Rc<Self>) -> Result<(), JsValue> {
        if self.document.ready_state() == "loading" {
            let weak = Rc::downgrade(self);
            self.listen(self.document.clone().into(), "DOMContentLoaded", false, move |_| {
                if let Some(host) = weak.upgrade() {
                    if let Err(err) = host.mount() {
                        warn!(reason = ?err, "choreography mount failed");
                    }
                }
            })?;
            Ok(())
        } else {
            self.mount()
        }
    }

    fn mount(self: &Rc<Self>) -> Result<(), JsValue> {
        if self.ready.is_ready() {
            return Ok(());
        }
        let table = self.measure().map_err(to_js)?;
        let tier = DeviceTier::detect(&self.profile());
        let backend = DomBackend::new(
            self.document.clone(),
            self.config.fade_ms,
            self.window.device_pixel_ratio(),
        );
        let mut engine = Engine::new(self.config.clone(), table, tier, backend);
        let (w, h) = self.viewport();
        engine.set_viewport(w, h);
        let (y, max) = self.scroll_metrics();
        engine.seed_scroll(y, max);
        *self.engine.borrow_mut() = Some(engine);

        self.install_listeners()?;
        self.schedule();
        self.ready.resolve(()).map_err(to_js)?;
        info!(tier = tier.name(), "choreography mounted");
        Ok(())
    }

    pub fn with_engine<R>(&self, f: impl FnOnce(&mut Engine<DomBackend>) -> R) -> Option<R> {
        let mut guard = self.engine.try_borrow_mut().ok()?;
        guard.as_mut().map(f)
    }

    fn now(&self) -> f64 {
        self.window.performance().map_or(0.0, |p| p.now())
    }

    fn viewport(&self) -> (f64, f64) {
        let w = self.window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        let h = self.window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        (w, h)
    }

    fn scroll_metrics(&self) -> (f64, f64) {
        let y = self.window.scroll_y().unwrap_or(0.0);
        let height = self
            .document
            .document_element()
            .map_or(0.0, |el| f64::from(el.scroll_height()));
        (y, (height - self.viewport().1).max(0.0))
    }

    fn profile(&self) -> DeviceProfile {
        let navigator = self.window.navigator();
        let memory_gb = js_sys::Reflect::get(&navigator, &JsValue::from_str("deviceMemory"))
            .ok()
            .and_then(|v| v.as_f64());
        DeviceProfile {
            cores: navigator.hardware_concurrency() as u32,
            memory_gb,
            viewport_width: self.viewport().0,
            touch: navigator.max_touch_points() > 0,
        }
    }

    /// Zone extents in document coordinates.
    fn measure(&self) -> Result<ZoneTable, ChoreoError> {
        let scroll_y = self.window.scroll_y().unwrap_or(0.0);
        ZoneTable::from_layout(&self.config, |id| {
            let rect = self.document.get_element_by_id(id)?.get_bounding_client_rect();
            let start = rect.top() + scroll_y;
            Some(Extent::new(start, start + rect.height()))
        })
    }

    fn schedule(self: &Rc<Self>) {
        if self.with_engine(|e| e.request_frame()) != Some(true) {
            return;
        }
        if self.frame_cb.borrow().is_none() {
            let weak: Weak<Self> = Rc::downgrade(self);
            *self.frame_cb.borrow_mut() = Some(Closure::wrap(Box::new(move |now: f64| {
                if let Some(host) = weak.upgrade() {
                    host.on_frame(now);
                }
            }) as Box<dyn FnMut(f64)>));
        }
        let id = self.frame_cb.borrow().as_ref().and_then(|cb| {
            self.window
                .request_animation_frame(cb.as_ref().unchecked_ref())
                .map_err(|err| warn!(reason = ?err, "animation frame request failed"))
                .ok()
        });
        if id.is_none() {
            self.with_engine(|e| e.frame_request_failed());
        }
        self.raf_id.set(id);
    }

    fn on_frame(self: &Rc<Self>, now: f64) {
        self.raf_id.set(None);
        let wants = self.with_engine(|e| e.frame(now).wants_frame);
        if wants == Some(true) {
            self.schedule();
        }
    }

    fn listen<F>(&self, target: EventTarget, kind: &'static str, passive: bool, f: F) -> Result<(), JsValue>
    where
        F: FnMut(Event) + 'static,
    {
        let callback = Closure::wrap(Box::new(f) as Box<dyn FnMut(Event)>);
        let opts = AddEventListenerOptions::new();
        opts.set_passive(passive);
        target.add_event_listener_with_callback_and_add_event_listener_options(
            kind,
            callback.as_ref().unchecked_ref(),
            &opts,
        )?;
        self.listeners.borrow_mut().push(Listener { target, kind, callback });
        Ok(())
    }

    /// Register a handler that feeds the engine and then asks for a frame.
    fn on<F>(self: &Rc<Self>, target: EventTarget, kind: &'static str, mut f: F) -> Result<(), JsValue>
    where
        F: FnMut(&Rc<Self>, Event) + 'static,
    {
        let weak = Rc::downgrade(self);
        self.listen(target, kind, true, move |event| {
            if let Some(host) = weak.upgrade() {
                f(&host, event);
                host.schedule();
            }
        })
    }

    fn install_listeners(self: &Rc<Self>) -> Result<(), JsValue> {
        let win: EventTarget = self.window.clone().into();
        let doc: EventTarget = self.document.clone().into();

        self.on(win.clone(), "scroll", |host, _| {
            let (y, max) = host.scroll_metrics();
            let now = host.now();
            host.with_engine(|e| e.on_scroll(now, y, max));
        })?;

        self.on(win.clone(), "wheel", |host, event| {
            let Some(wheel) = event.dyn_ref::<WheelEvent>() else {
                return;
            };
            let scale = match wheel.delta_mode() {
                WheelEvent::DOM_DELTA_LINE => LINE_HEIGHT_PX,
                WheelEvent::DOM_DELTA_PAGE => host.viewport().1,
                _ => 1.0,
            };
            let now = host.now();
            host.with_engine(|e| e.on_wheel(now, wheel.delta_y() * scale));
        })?;

        self.on(win.clone(), "touchstart", |host, event| {
            host.last_touch_y.set(first_touch_y(&event));
        })?;

        self.on(win.clone(), "touchmove", |host, event| {
            let Some(y) = first_touch_y(&event) else {
                return;
            };
            if let Some(prev) = host.last_touch_y.replace(Some(y)) {
                let now = host.now();
                host.with_engine(|e| e.on_touch_move(now, prev - y));
            }
        })?;

        self.on(doc.clone(), "keydown", |host, event| {
            if let Some(key) = event.dyn_ref::<KeyboardEvent>().map(|k| k.key()) {
                let now = host.now();
                host.with_engine(|e| e.on_key(now, &key));
            }
        })?;

        self.on(win.clone(), "pointermove", |host, event| {
            let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let (x, y) = (f64::from(mouse.client_x()), f64::from(mouse.client_y()));
            host.with_engine(|e| e.on_pointer_move(x, y));
            host.tilt_cards(x, y);
        })?;

        self.on(win.clone(), "resize", |host, _| host.resize())?;

        let weak = Rc::downgrade(self);
        self.listen(win, "pagehide", false, move |_| {
            if let Some(host) = weak.upgrade() {
                host.teardown();
            }
        })?;
        Ok(())
    }

    fn resize(&self) {
        let (w, h) = self.viewport();
        let dpr = self.window.device_pixel_ratio();
        let table = self.measure();
        let (y, max) = self.scroll_metrics();
        let now = self.now();
        self.with_engine(|e| {
            e.set_viewport(w, h);
            e.backend_mut().resize(dpr);
            match table {
                Ok(table) => e.relayout(table),
                Err(err) => warn!(%err, "re-measure failed; keeping previous layout"),
            }
            e.on_scroll(now, y, max);
        });
    }

    fn tilt_cards(&self, x: f64, y: f64) {
        let Ok(cards) = self.document.query_selector_all(".tilt-card") else {
            return;
        };
        for i in 0..cards.length() {
            let Some(card) = cards.item(i).and_then(|n| n.dyn_into::<HtmlElement>().ok()) else {
                continue;
            };
            let r = card.get_bounding_client_rect();
            let rect = Rect {
                left: r.left(),
                top: r.top(),
                width: r.width(),
                height: r.height(),
            };
            let (rx, ry) = tilt::tilt(x, y, &rect, TILT_MAX_DEG);
            let _ = card.style().set_property("transform", &tilt::transform(rx, ry));
        }
    }

    /// Stop the loop, release every surface and detach from the page.
    ///
    /// Listener closures are kept alive until the host drops; this may run
    /// from inside one of them.
    pub fn teardown(&self) {
        if let Some(id) = self.raf_id.take() {
            let _ = self.window.cancel_animation_frame(id);
        }
        self.with_engine(|e| e.teardown());
        for l in self.listeners.borrow().iter() {
            let _ = l
                .target
                .remove_event_listener_with_callback(l.kind, l.callback.as_ref().unchecked_ref());
        }
    }
}

fn first_touch_y(event: &Event) -> Option<f64> {
    let touch = event.dyn_ref::<TouchEvent>()?.touches().get(0)?;
    Some(f64::from(touch.client_y()))
}

fn to_js(err: ChoreoError) -> JsValue {
    JsValue::from_str(&err.to_string())
}
