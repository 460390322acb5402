use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Event, EventTarget};

/// Event listener that is removed again when dropped.
///
/// Owns the closure for as long as the registration lives.
pub struct ScopedListener {
    target: EventTarget,
    event: String,
    callback: Closure<dyn FnMut(Event)>,
}

impl ScopedListener {
    pub fn new(
        target: EventTarget,
        event: &str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        tracing::debug!(event, "listener attached");

        Ok(Self {
            target,
            event: event.to_string(),
            callback,
        })
    }
}

impl Drop for ScopedListener {
    fn drop(&mut self) {
        let callback = self.callback.as_ref().unchecked_ref();
        let removed = self
            .target
            .remove_event_listener_with_callback(&self.event, callback);
        if removed.is_err() {
            tracing::warn!(event = %self.event, "failed to detach listener");
        }
    }
}
