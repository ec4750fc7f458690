//! Host runtime seam.
//!
//! The app never talks to the network or the surrounding UI directly: every
//! property read, action, HTTP call and lifecycle signal goes through a
//! [`HostRuntime`]. [`ZendeskHost`] is the shipped runtime; tests plug in
//! scripted ones. [`HostBridge`] is what the views hold.

mod bridge;
mod events;
mod zendesk;

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Method;
use serde_json::Value;

use crate::error::AppError;

pub use bridge::{HostBridge, Registration, RequestOptions};
pub use events::{EventBus, EventHandler};
pub use zendesk::ZendeskHost;

/// Lifecycle signals exchanged with the host.
pub mod signals {
    pub const APP_REGISTERED: &str = "app.registered";
    pub const MODAL_READY: &str = "modalReady";
    pub const GET_DATA: &str = "getData";
}

pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq)]
pub struct HostRequest {
    pub url: String,
    pub method: Method,
    pub data: Option<String>,
    pub content_type: String,
    pub secure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoticeKind {
    #[default]
    Success,
    Warning,
    Error,
}

impl NoticeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::Success => "success",
            NoticeKind::Warning => "warning",
            NoticeKind::Error => "error",
        }
    }

    /// Accepts the host's own names (`notice`, `alert`) as well.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "warning" | "alert" => NoticeKind::Warning,
            "error" => NoticeKind::Error,
            _ => NoticeKind::Success,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostNotice {
    pub message: String,
    pub kind: NoticeKind,
    pub duration_ms: u64,
}

/// The host-provided client object.
///
/// `get` answers with a `{path: value}` envelope, the way the host does;
/// [`HostBridge::get`] unwraps it.
pub trait HostRuntime: Send + Sync {
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Value, AppError>>;

    fn set(&self, params: Value) -> BoxFuture<'_, Result<Value, AppError>>;

    fn invoke<'a>(
        &'a self,
        action: &'a str,
        args: Vec<Value>,
    ) -> BoxFuture<'a, Result<Value, AppError>>;

    fn request(&self, request: HostRequest) -> BoxFuture<'_, Result<Value, AppError>>;

    fn on(&self, event: &str, handler: EventHandler);

    /// Like `on`, but the handler is dropped after its first call.
    fn once(&self, event: &str, handler: EventHandler);

    fn trigger(&self, event: &str, data: &Value);

    fn instance(&self, guid: &str) -> Option<Arc<dyn HostRuntime>>;
}
