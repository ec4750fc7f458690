use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, OnceLock, RwLock, Weak};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde_json::{json, Map, Value};
use url::Url;

use super::{signals, EventBus, EventHandler, HostNotice, HostRequest, HostRuntime, NoticeKind};
use crate::error::AppError;
use crate::settings::AppSettings;

const DEFAULT_NOTICE_MS: u64 = 5000;

struct Shared {
    http: Client,
    settings: AppSettings,
    notices: Mutex<Option<mpsc::Sender<HostNotice>>>,
    instances: RwLock<HashMap<String, Arc<ZendeskHost>>>,
    root: OnceLock<Weak<ZendeskHost>>,
    next_instance: AtomicU64,
}

impl Shared {
    fn new_guid(&self, location: &str) -> String {
        let n = self.next_instance.fetch_add(1, Ordering::SeqCst);
        format!(
            "{location}-{:x}-{n:04x}",
            chrono::Utc::now().timestamp_millis()
        )
    }
}

/// Host runtime backed by the Zendesk REST API.
///
/// One root instance per process (the launch location) plus any child
/// instances created through `invoke("instances.create")`. Every instance
/// has its own event bus and context snapshot; HTTP client, settings and
/// the notice channel are shared.
pub struct ZendeskHost {
    shared: Arc<Shared>,
    guid: String,
    location: String,
    bus: EventBus,
    context: RwLock<Map<String, Value>>,
    closed: AtomicBool,
}

impl ZendeskHost {
    pub fn new(settings: AppSettings, location: &str) -> Result<Arc<Self>, AppError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .user_agent(concat!("zis-config/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Message(format!("failed to build HTTP client: {e}")))?;

        let shared = Arc::new(Shared {
            http,
            settings,
            notices: Mutex::new(None),
            instances: RwLock::new(HashMap::new()),
            root: OnceLock::new(),
            next_instance: AtomicU64::new(1),
        });

        let root = Arc::new(Self::instance_for(shared.clone(), location));
        let _ = shared.root.set(Arc::downgrade(&root));
        Ok(root)
    }

    fn instance_for(shared: Arc<Shared>, location: &str) -> Self {
        let guid = shared.new_guid(location);
        let mut context = Map::new();
        context.insert("location".to_string(), json!(location));
        context.insert("instanceGuid".to_string(), json!(guid));
        context.insert("product".to_string(), json!("support"));
        context.insert(
            "account".to_string(),
            json!({"subdomain": shared.settings.subdomain.clone().unwrap_or_default()}),
        );
        Self {
            shared,
            guid,
            location: location.to_string(),
            bus: EventBus::new(),
            context: RwLock::new(context),
            closed: AtomicBool::new(false),
        }
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Notices raised by any instance are delivered here.
    pub fn set_notice_sender(&self, tx: mpsc::Sender<HostNotice>) {
        match self.shared.notices.lock() {
            Ok(mut guard) => *guard = Some(tx),
            Err(poisoned) => *poisoned.into_inner() = Some(tx),
        }
    }

    fn context_snapshot(&self) -> Value {
        match self.context.read() {
            Ok(guard) => Value::Object(guard.clone()),
            Err(poisoned) => Value::Object(poisoned.into_inner().clone()),
        }
    }

    /// Fires `app.registered` with the settings and context snapshot.
    pub fn register(&self) {
        let data = json!({
            "metadata": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "settings": self.shared.settings.host_settings(),
            },
            "context": self.context_snapshot(),
        });
        let handled = self.bus.trigger(signals::APP_REGISTERED, &data);
        log::debug!(
            "app.registered on {} ({}) reached {handled} handler(s)",
            self.guid,
            self.location
        );
    }

    fn build_url(&self, request: &HostRequest) -> Result<Url, AppError> {
        let origin = self.shared.settings.api_origin(request.secure)?;
        let base = Url::parse(&origin)
            .map_err(|e| AppError::Config(format!("invalid API origin '{origin}': {e}")))?;
        base.join(&request.url)
            .map_err(|e| AppError::InvalidInput(format!("invalid request url '{}': {e}", request.url)))
    }

    async fn send(&self, request: HostRequest) -> Result<Value, AppError> {
        let url = self.build_url(&request)?;
        let settings = &self.shared.settings;

        let mut builder = self
            .shared
            .http
            .request(request.method.clone(), url.clone())
            .header(CONTENT_TYPE, request.content_type.as_str());
        if let (Some(email), Some(token)) = (&settings.email, &settings.api_token) {
            builder = builder.basic_auth(format!("{email}/token"), Some(token));
        }
        if request.method != Method::GET {
            if let Some(body) = request.data {
                builder = builder.body(body);
            }
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| AppError::Network(format!("{} {url}: {e}", request.method)))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Http {
                method: request.method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AppError::Network(format!("failed to read response from {url}: {e}")))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| AppError::malformed(format!("{url} did not return JSON: {e}")))
    }

    async fn fetch_envelope(&self, path: &str, field: &str) -> Result<Value, AppError> {
        let value = self
            .send(HostRequest {
                url: path.to_string(),
                method: Method::GET,
                data: None,
                content_type: super::JSON_CONTENT_TYPE.to_string(),
                secure: self.shared.settings.is_production,
            })
            .await?;
        value
            .get(field)
            .cloned()
            .ok_or_else(|| AppError::malformed(format!("{path} has no '{field}'")))
    }

    async fn read_property(&self, path: &str) -> Result<Value, AppError> {
        match path {
            "currentUser" => self.fetch_envelope("/api/v2/users/me.json", "user").await,
            "ticket" => {
                let Some(id) = self.shared.settings.ticket_id else {
                    return Err(AppError::Host(
                        "no ticket in this context (set --ticket-id)".to_string(),
                    ));
                };
                self.fetch_envelope(&format!("/api/v2/tickets/{id}.json"), "ticket")
                    .await
            }
            other => {
                let snapshot = self.context_snapshot();
                let pointer = format!("/{}", other.replace('.', "/"));
                snapshot
                    .pointer(&pointer)
                    .cloned()
                    .ok_or_else(|| AppError::Host(format!("unknown property '{other}'")))
            }
        }
    }

    fn emit_notice(&self, args: &[Value]) -> Result<Value, AppError> {
        let message = args
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::InvalidInput("notify needs a message".to_string()))?;
        let kind = args
            .get(1)
            .and_then(Value::as_str)
            .map(NoticeKind::parse)
            .unwrap_or_default();
        let duration_ms = args
            .get(2)
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_NOTICE_MS);
        let notice = HostNotice {
            message: message.to_string(),
            kind,
            duration_ms,
        };

        let sender = self.shared.notices.lock()?.clone();
        match sender {
            Some(tx) => {
                if tx.send(notice).is_err() {
                    log::debug!("notice receiver dropped: {message}");
                }
            }
            None => log::info!("[{}] {message}", kind.as_str()),
        }
        Ok(Value::Null)
    }

    fn create_instance(&self, args: &[Value]) -> Result<Value, AppError> {
        let options = args.first().cloned().unwrap_or(Value::Null);
        let location = options
            .get("location")
            .and_then(Value::as_str)
            .unwrap_or("modal")
            .to_string();
        let child = Arc::new(Self::instance_for(self.shared.clone(), &location));
        if let Some(url) = options.get("url") {
            child.context.write()?.insert("url".to_string(), url.clone());
        }
        if let Some(size) = options.get("size") {
            child.context.write()?.insert("size".to_string(), size.clone());
        }
        let guid = child.guid.clone();
        self.shared
            .instances
            .write()?
            .insert(guid.clone(), child);
        log::debug!("created {location} instance {guid}");
        Ok(json!({"instances.create": [{"instanceGuid": guid, "location": location}]}))
    }

    fn destroy(&self) -> Result<Value, AppError> {
        self.closed.store(true, Ordering::SeqCst);
        self.shared.instances.write()?.remove(&self.guid);
        Ok(Value::Null)
    }
}

impl HostRuntime for ZendeskHost {
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Value, AppError>> {
        async move {
            let value = self.read_property(path).await?;
            Ok(json!({ path: value }))
        }
        .boxed()
    }

    fn set(&self, params: Value) -> BoxFuture<'_, Result<Value, AppError>> {
        async move {
            let Value::Object(map) = &params else {
                return Err(AppError::InvalidInput("set expects an object".to_string()));
            };
            let mut context = self.context.write()?;
            for (key, value) in map {
                context.insert(key.clone(), value.clone());
            }
            Ok(params)
        }
        .boxed()
    }

    fn invoke<'a>(
        &'a self,
        action: &'a str,
        args: Vec<Value>,
    ) -> BoxFuture<'a, Result<Value, AppError>> {
        async move {
            match action {
                "notify" => self.emit_notice(&args),
                "instances.create" => self.create_instance(&args),
                "destroy" => self.destroy(),
                "resize" => {
                    log::debug!("resize requested: {:?}", args.first());
                    Ok(Value::Null)
                }
                other => Err(AppError::Host(format!("unsupported action '{other}'"))),
            }
        }
        .boxed()
    }

    fn request(&self, request: HostRequest) -> BoxFuture<'_, Result<Value, AppError>> {
        self.send(request).boxed()
    }

    fn on(&self, event: &str, handler: EventHandler) {
        self.bus.on(event, handler);
    }

    fn once(&self, event: &str, handler: EventHandler) {
        self.bus.once(event, handler);
    }

    fn trigger(&self, event: &str, data: &Value) {
        self.bus.trigger(event, data);
    }

    fn instance(&self, guid: &str) -> Option<Arc<dyn HostRuntime>> {
        if let Some(root) = self.shared.root.get().and_then(Weak::upgrade) {
            if root.guid == guid {
                return Some(root as Arc<dyn HostRuntime>);
            }
        }
        let instances = self.shared.instances.read().ok()?;
        instances
            .get(guid)
            .cloned()
            .map(|child| child as Arc<dyn HostRuntime>)
    }
}
