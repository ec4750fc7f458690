use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

struct Subscription {
    handler: EventHandler,
    once: bool,
}

/// In-process pub/sub for host signals.
///
/// Handlers run outside the lock, so a handler may trigger further events
/// (including on the same bus) or subscribe new handlers.
#[derive(Default)]
pub struct EventBus {
    subscriptions: Mutex<HashMap<String, Vec<Subscription>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, event: &str, handler: EventHandler) {
        self.subscribe(event, handler, false);
    }

    pub fn once(&self, event: &str, handler: EventHandler) {
        self.subscribe(event, handler, true);
    }

    fn subscribe(&self, event: &str, handler: EventHandler, once: bool) {
        let mut subs = match self.subscriptions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subs.entry(event.to_string())
            .or_default()
            .push(Subscription { handler, once });
    }

    /// Returns how many handlers ran.
    pub fn trigger(&self, event: &str, data: &Value) -> usize {
        let handlers: Vec<EventHandler> = {
            let mut subs = match self.subscriptions.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let Some(list) = subs.get_mut(event) else {
                log::debug!("no handler for host event '{event}'");
                return 0;
            };
            let handlers = list.iter().map(|s| s.handler.clone()).collect();
            list.retain(|s| !s.once);
            handlers
        };

        for handler in &handlers {
            handler(data);
        }
        handlers.len()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.subscriptions
            .lock()
            .map(|subs| subs.get(event).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }
}
