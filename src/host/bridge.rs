use std::sync::{Arc, OnceLock, RwLock};

use reqwest::Method;
use serde_json::{json, Map, Value};

use super::{signals, HostRequest, HostRuntime, NoticeKind, JSON_CONTENT_TYPE};
use crate::error::AppError;
use crate::zis::{self, BundleDescriptor, ConfigMap, ConfigRecord, Integration};

/// What the host hands over on `app.registered`.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub metadata: Value,
    pub settings: Value,
    pub context: Value,
    pub subdomain: Option<String>,
}

impl Registration {
    pub fn from_event(data: &Value) -> Self {
        let metadata = data.get("metadata").cloned().unwrap_or(Value::Null);
        let settings = metadata
            .get("settings")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        let context = data.get("context").cloned().unwrap_or(Value::Null);
        let subdomain = context
            .pointer("/account/subdomain")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            metadata,
            settings,
            context,
            subdomain,
        }
    }

    pub fn location(&self) -> Option<&str> {
        self.context.get("location").and_then(Value::as_str)
    }
}

/// Per-call overrides; `method` is always explicit.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub content_type: Option<String>,
    pub secure: Option<bool>,
}

impl RequestOptions {
    pub fn method(method: Method) -> Self {
        Self {
            method,
            content_type: None,
            secure: None,
        }
    }
}

/// Wrapper the views talk to.
///
/// Reads and actions go to the bound sidebar instance when the current
/// surface is a modal that has been handed its opener, otherwise to the
/// surface's own client.
pub struct HostBridge {
    client: Arc<dyn HostRuntime>,
    sidebar: RwLock<Option<Arc<dyn HostRuntime>>>,
    registration: Arc<OnceLock<Registration>>,
}

impl HostBridge {
    pub fn new(client: Arc<dyn HostRuntime>) -> Self {
        Self {
            client,
            sidebar: RwLock::new(None),
            registration: Arc::new(OnceLock::new()),
        }
    }

    pub fn client(&self) -> &Arc<dyn HostRuntime> {
        &self.client
    }

    // ------------------------------------------------------------------
    // Lifecycle events
    // ------------------------------------------------------------------

    /// Captures the registration data once, then hands it to `callback`.
    /// A second registration signal still reaches the callback but does
    /// not replace what was captured.
    pub fn on_app_registered<F>(&self, callback: F)
    where
        F: Fn(&Registration) + Send + Sync + 'static,
    {
        let store = self.registration.clone();
        self.client.on(
            signals::APP_REGISTERED,
            Arc::new(move |data| {
                let incoming = Registration::from_event(data);
                if store.set(incoming.clone()).is_err() {
                    log::debug!("host registration already captured; keeping the first one");
                }
                callback(&incoming);
            }),
        );
    }

    pub fn modal_ready(&self) {
        self.client.trigger(signals::MODAL_READY, &Value::Null);
    }

    pub fn on_modal_data<F>(&self, callback: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.client.on(signals::GET_DATA, Arc::new(callback));
    }

    /// Binds reads and actions to the opener instance named in `context`.
    pub fn bind_sidebar_client(&self, context: &Value) -> bool {
        let guid = context
            .get("instanceGuid")
            .and_then(Value::as_str)
            .unwrap_or("");
        let instance = self.client.instance(guid);
        let bound = instance.is_some();
        if !bound {
            log::warn!("no host instance '{guid}' to bind the sidebar client to");
        }
        match self.sidebar.write() {
            Ok(mut guard) => *guard = instance,
            Err(poisoned) => *poisoned.into_inner() = instance,
        }
        bound
    }

    fn target(&self) -> Arc<dyn HostRuntime> {
        let bound = match self.sidebar.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        bound.unwrap_or_else(|| self.client.clone())
    }

    // ------------------------------------------------------------------
    // Captured registration data
    // ------------------------------------------------------------------

    pub fn registration(&self) -> Option<&Registration> {
        self.registration.get()
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.registration().map(|r| &r.metadata)
    }

    pub fn settings(&self) -> Option<&Value> {
        self.registration().map(|r| &r.settings)
    }

    pub fn context(&self) -> Option<&Value> {
        self.registration().map(|r| &r.context)
    }

    pub fn subdomain(&self) -> Option<&str> {
        self.registration().and_then(|r| r.subdomain.as_deref())
    }

    pub fn is_production(&self) -> bool {
        self.settings()
            .and_then(|s| s.get("IS_PRODUCTION"))
            .map(|v| match v {
                Value::Bool(b) => *b,
                Value::String(s) => !s.is_empty() && s != "false",
                Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
                _ => false,
            })
            .unwrap_or(false)
    }

    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings()
            .and_then(|s| s.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    // ------------------------------------------------------------------
    // Client calls
    // ------------------------------------------------------------------

    pub async fn get(&self, key: &str) -> Result<Value, AppError> {
        let envelope = self.target().get(key).await?;
        Ok(envelope.get(key).cloned().unwrap_or(Value::Null))
    }

    pub async fn set(&self, params: Value) -> Result<Value, AppError> {
        self.target().set(params).await
    }

    pub async fn invoke(&self, action: &str, args: Vec<Value>) -> Result<Value, AppError> {
        self.target().invoke(action, args).await
    }

    pub async fn request(
        &self,
        url: &str,
        data: Option<String>,
        options: RequestOptions,
    ) -> Result<Value, AppError> {
        let request = HostRequest {
            url: url.to_string(),
            method: options.method,
            data,
            content_type: options
                .content_type
                .unwrap_or_else(|| JSON_CONTENT_TYPE.to_string()),
            secure: options.secure.unwrap_or_else(|| self.is_production()),
        };
        log::debug!("host request {} {}", request.method, request.url);
        self.client.request(request).await
    }

    pub async fn notify(
        &self,
        message: &str,
        kind: NoticeKind,
        duration_ms: u64,
    ) -> Result<(), AppError> {
        self.target()
            .invoke(
                "notify",
                vec![json!(message), json!(kind.as_str()), json!(duration_ms)],
            )
            .await
            .map(|_| ())
    }

    pub async fn resize_frame(&self, height: u32) -> Result<(), AppError> {
        self.client
            .invoke(
                "resize",
                vec![json!({"width": "100%", "height": format!("{height}px")})],
            )
            .await
            .map(|_| ())
    }

    /// Opens a modal instance and arranges for it to receive `payload`
    /// (plus this surface's context as `sidebarContext`) once it reports
    /// ready.
    pub async fn open_modal(
        &self,
        payload: Value,
        url_params: &str,
        width: &str,
        height: &str,
    ) -> Result<Arc<dyn HostRuntime>, AppError> {
        let created = self
            .client
            .invoke(
                "instances.create",
                vec![json!({
                    "location": "modal",
                    "url": format!("assets/iframe.html{url_params}"),
                    "size": {"width": width, "height": height},
                })],
            )
            .await?;
        let guid = created
            .pointer("/instances.create/0/instanceGuid")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::malformed("instances.create returned no instanceGuid"))?;
        let modal = self
            .client
            .instance(guid)
            .ok_or_else(|| AppError::Host(format!("modal instance '{guid}' not found")))?;

        let mut forwarded = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        forwarded.insert(
            "sidebarContext".to_string(),
            self.context().cloned().unwrap_or(Value::Null),
        );
        let forwarded = Value::Object(forwarded);

        let relay = Arc::downgrade(&modal);
        modal.once(
            signals::MODAL_READY,
            Arc::new(move |_| {
                if let Some(modal) = relay.upgrade() {
                    modal.trigger(signals::GET_DATA, &forwarded);
                }
            }),
        );
        Ok(modal)
    }

    pub async fn close_modal(&self) -> Result<(), AppError> {
        self.client.invoke("destroy", Vec::new()).await.map(|_| ())
    }

    // ------------------------------------------------------------------
    // ZIS endpoints
    // ------------------------------------------------------------------

    pub async fn get_integrations(&self) -> Result<Vec<Integration>, AppError> {
        let value = self
            .request(
                &zis::integrations_path(),
                None,
                RequestOptions::method(Method::GET),
            )
            .await?;
        zis::parse_integrations(value)
    }

    pub async fn get_zis_config(&self, integration_key: &str) -> Result<ConfigRecord, AppError> {
        let value = self
            .request(
                &zis::configs_path(integration_key),
                None,
                RequestOptions::method(Method::GET),
            )
            .await?;
        zis::parse_first_config(value)
    }

    pub async fn update_zis_config(
        &self,
        integration_key: &str,
        config: &ConfigMap,
    ) -> Result<Value, AppError> {
        let body = zis::config_update_body(integration_key, config)?;
        self.request(
            &zis::config_update_path(integration_key),
            Some(body),
            RequestOptions::method(Method::PUT),
        )
        .await
    }

    pub async fn get_bundle_uuid(
        &self,
        integration_key: &str,
    ) -> Result<BundleDescriptor, AppError> {
        let value = self
            .request(
                &zis::bundles_path(integration_key),
                None,
                RequestOptions::method(Method::GET),
            )
            .await?;
        zis::parse_first_bundle(value)
    }

    pub async fn get_bundle(&self, integration_key: &str, uuid: &str) -> Result<Value, AppError> {
        self.request(
            &zis::bundle_path(integration_key, uuid),
            None,
            RequestOptions::method(Method::GET),
        )
        .await
    }

    /// Descriptor list first, then the document for the first UUID.
    pub async fn load_bundle(
        &self,
        integration_key: &str,
    ) -> Result<(BundleDescriptor, Value), AppError> {
        let descriptor = self.get_bundle_uuid(integration_key).await?;
        let document = self.get_bundle(integration_key, &descriptor.uuid).await?;
        Ok((descriptor, document))
    }
}
