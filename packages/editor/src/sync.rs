//! # Synchronization Bridge
//!
//! The only way HTML leaves the engine. Listeners registered with
//! [`SyncBridge::on_change`] see every emission in order; the bridge never
//! coalesces or skips. Incoming host content is compared as canonical trees,
//! so an echo of our own emission is recognized even when the host rewrote
//! attribute order or whitespace.

use folio_schema::Document;
use tracing::debug;

pub type ChangeListener = Box<dyn FnMut(&str)>;

#[derive(Default)]
pub struct SyncBridge {
    listeners: Vec<ChangeListener>,
    last_emitted: Option<String>,
    emit_count: u64,
}

impl SyncBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_change(&mut self, listener: impl FnMut(&str) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Deliver one change to every listener
    pub fn emit(&mut self, html: String) {
        self.emit_count += 1;
        debug!(
            emission = self.emit_count,
            bytes = html.len(),
            listeners = self.listeners.len(),
            "emitting change"
        );
        for listener in self.listeners.iter_mut() {
            listener(&html);
        }
        self.last_emitted = Some(html);
    }

    /// Whether `incoming` is the same document as `current`
    pub fn is_echo(current: &Document, incoming: &Document) -> bool {
        current == incoming
    }

    pub fn last_emitted(&self) -> Option<&str> {
        self.last_emitted.as_deref()
    }

    pub fn emit_count(&self) -> u64 {
        self.emit_count
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }
}

impl std::fmt::Debug for SyncBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncBridge")
            .field("listeners", &self.listeners.len())
            .field("emit_count", &self.emit_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_schema::parse;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_emissions_are_ordered() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bridge = SyncBridge::new();
        let sink = seen.clone();
        bridge.on_change(move |html| sink.borrow_mut().push(html.to_string()));

        bridge.emit("<p>1</p>".to_string());
        bridge.emit("<p>2</p>".to_string());

        assert_eq!(*seen.borrow(), vec!["<p>1</p>", "<p>2</p>"]);
        assert_eq!(bridge.emit_count(), 2);
        assert_eq!(bridge.last_emitted(), Some("<p>2</p>"));
    }

    #[test]
    fn test_echo_ignores_markup_differences() {
        let current = parse(r#"<p><b>a</b></p><img alt="x" src="y.png">"#);
        let incoming = parse(r#"<p><strong>a</strong></p>  <img src="y.png" alt="x">"#);
        assert!(SyncBridge::is_echo(&current, &incoming));
        assert!(!SyncBridge::is_echo(&current, &parse("<p>a</p>")));
    }
}
