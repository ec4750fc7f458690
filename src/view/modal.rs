//! Secondary surface opened from the sidebar.
//!
//! It receives the opener's payload through `getData`, binds its reads to
//! the opener instance, and can fetch the ticket on demand.

use std::sync::mpsc;

use serde_json::Value;

use crate::error::AppError;
use crate::host::HostBridge;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModalView {
    some_sample_data: Option<Value>,
    sidebar_bound: bool,
    ticket: Option<Value>,
    is_ticket_fetch_loading: bool,
    is_ticket_fetch_complete: bool,
    ticket_error: bool,
}

impl ModalView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the forwarded payload and returns the opener context the
    /// bridge should bind to.
    pub fn receive_data(&mut self, data: &Value) -> Option<Value> {
        log::debug!("modal received data: {data}");
        self.some_sample_data = Some(data.get("someSampleData").cloned().unwrap_or(Value::Null));
        data.get("sidebarContext").filter(|ctx| !ctx.is_null()).cloned()
    }

    pub fn sidebar_bound(&mut self, bound: bool) {
        self.sidebar_bound = bound;
    }

    /// `false` while a fetch is already running.
    pub fn begin_ticket_fetch(&mut self) -> bool {
        if self.is_ticket_fetch_loading {
            return false;
        }
        self.is_ticket_fetch_loading = true;
        self.ticket_error = false;
        true
    }

    pub fn ticket_loaded(&mut self, result: Result<Value, AppError>) {
        self.is_ticket_fetch_loading = false;
        match result {
            Ok(ticket) => {
                log::debug!("modal ticket: {ticket}");
                self.ticket = Some(ticket);
                self.is_ticket_fetch_complete = true;
            }
            Err(e) => {
                log::error!("failed to fetch ticket: {e}");
                self.ticket_error = true;
            }
        }
    }

    pub fn has_data(&self) -> bool {
        self.some_sample_data.is_some()
    }

    pub fn is_sidebar_bound(&self) -> bool {
        self.sidebar_bound
    }

    pub fn is_ticket_fetch_loading(&self) -> bool {
        self.is_ticket_fetch_loading
    }

    pub fn is_ticket_fetch_complete(&self) -> bool {
        self.is_ticket_fetch_complete
    }

    pub fn ticket_error(&self) -> bool {
        self.ticket_error
    }

    pub fn ticket(&self) -> Option<&Value> {
        self.ticket.as_ref()
    }

    /// The forwarded sample value as display text.
    pub fn sample_data_text(&self) -> String {
        match &self.some_sample_data {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// `(id, subject)` of the fetched ticket.
    pub fn ticket_summary(&self) -> Option<(String, String)> {
        let ticket = self.ticket.as_ref()?;
        let id = match ticket.get("id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => "?".to_string(),
        };
        let subject = ticket
            .get("subject")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some((id, subject))
    }
}

/// Subscribes to the opener's payload, then reports the modal ready.
///
/// Payloads are delivered on `sink`; the receiving side applies them with
/// [`ModalView::receive_data`] and binds the bridge.
pub fn connect(bridge: &HostBridge, sink: mpsc::Sender<Value>) {
    bridge.on_modal_data(move |data| {
        if sink.send(data.clone()).is_err() {
            log::debug!("modal data arrived after the view closed");
        }
    });
    bridge.modal_ready();
}

pub async fn fetch_ticket(bridge: &HostBridge) -> Result<Value, AppError> {
    bridge.get("ticket").await
}
