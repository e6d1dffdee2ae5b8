//! Routes `tracing` events and panics to the browser console.

use std::fmt::{self, Write as _};
use std::sync::Once;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use wasm_bindgen::JsValue;
use web_sys::console;

struct ConsoleLayer;

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let line = JsValue::from_str(&format!(
            "[{}] {}{}",
            meta.target(),
            visitor.message,
            visitor.fields
        ));
        match *meta.level() {
            Level::ERROR => console::error_1(&line),
            Level::WARN => console::warn_1(&line),
            Level::INFO => console::info_1(&line),
            _ => console::debug_1(&line),
        }
    }
}

/// Install the console subscriber and panic hook once per page.
pub fn install(max_level: Level) {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            console::error_1(&JsValue::from_str(&format!("{info}")));
        }));
        let subscriber = tracing_subscriber::registry()
            .with(LevelFilter::from_level(max_level))
            .with(ConsoleLayer);
        // Another subscriber may already be installed by the embedding page.
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
