#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Map, Value};

use zis_config_lib::host::{EventBus, EventHandler, HostRequest, HostRuntime};
use zis_config_lib::AppError;

/// Instances of one scripted account; any instance can look up any other.
#[derive(Default)]
pub struct Hub {
    instances: RwLock<HashMap<String, Arc<ScriptedHost>>>,
    responses: Mutex<HashMap<String, VecDeque<Result<Value, u16>>>>,
    requests: Mutex<Vec<HostRequest>>,
}

impl Hub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a response for `METHOD url`; the last queued one repeats.
    pub fn respond(&self, method: &str, url: &str, response: Result<Value, u16>) {
        self.responses
            .lock()
            .expect("lock responses")
            .entry(format!("{method} {url}"))
            .or_default()
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<HostRequest> {
        self.requests.lock().expect("lock requests").clone()
    }

    pub fn instance(&self, guid: &str) -> Option<Arc<ScriptedHost>> {
        self.instances
            .read()
            .expect("lock instances")
            .get(guid)
            .cloned()
    }

    fn next_response(&self, request: &HostRequest) -> Result<Value, AppError> {
        let key = format!("{} {}", request.method, request.url);
        let mut responses = self.responses.lock().expect("lock responses");
        let queue = responses.get_mut(&key);
        let response = match queue {
            Some(q) if q.len() > 1 => q.pop_front(),
            Some(q) => q.front().cloned(),
            None => None,
        };
        match response {
            Some(Ok(value)) => Ok(value),
            Some(Err(status)) => Err(AppError::Http {
                method: request.method.to_string(),
                url: request.url.clone(),
                status,
            }),
            None => Err(AppError::Http {
                method: request.method.to_string(),
                url: request.url.clone(),
                status: 404,
            }),
        }
    }
}

/// A host instance that answers from its hub's script.
pub struct ScriptedHost {
    hub: Arc<Hub>,
    guid: String,
    bus: EventBus,
    properties: Mutex<Map<String, Value>>,
    invocations: Mutex<Vec<(String, Vec<Value>)>>,
    registration: OnceLock<Value>,
}

impl ScriptedHost {
    pub fn spawn(hub: &Arc<Hub>, guid: &str, location: &str) -> Arc<Self> {
        let host = Arc::new(Self {
            hub: hub.clone(),
            guid: guid.to_string(),
            bus: EventBus::new(),
            properties: Mutex::new(Map::new()),
            invocations: Mutex::new(Vec::new()),
            registration: OnceLock::new(),
        });
        let _ = host.registration.set(json!({
            "metadata": {
                "name": "zis-config",
                "settings": {"zis_integration_key": "jira", "IS_PRODUCTION": true},
            },
            "context": {
                "location": location,
                "instanceGuid": guid,
                "account": {"subdomain": "acme"},
            },
        }));
        hub.instances
            .write()
            .expect("lock instances")
            .insert(guid.to_string(), host.clone());
        host
    }

    pub fn set_property(&self, path: &str, value: Value) {
        self.properties
            .lock()
            .expect("lock properties")
            .insert(path.to_string(), value);
    }

    pub fn register(&self) {
        let data = self.registration.get().cloned().unwrap_or(Value::Null);
        self.bus.trigger("app.registered", &data);
    }

    pub fn invocations(&self) -> Vec<(String, Vec<Value>)> {
        self.invocations.lock().expect("lock invocations").clone()
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }
}

impl HostRuntime for ScriptedHost {
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Value, AppError>> {
        async move {
            let value = self
                .properties
                .lock()
                .expect("lock properties")
                .get(path)
                .cloned()
                .ok_or_else(|| AppError::Host(format!("no property '{path}'")))?;
            Ok(json!({ path: value }))
        }
        .boxed()
    }

    fn set(&self, params: Value) -> BoxFuture<'_, Result<Value, AppError>> {
        async move {
            if let Value::Object(map) = &params {
                let mut props = self.properties.lock().expect("lock properties");
                for (k, v) in map {
                    props.insert(k.clone(), v.clone());
                }
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
            self.invocations
                .lock()
                .expect("lock invocations")
                .push((action.to_string(), args));
            if action == "instances.create" {
                let guid = format!("{}-modal", self.guid);
                ScriptedHost::spawn(&self.hub, &guid, "modal");
                return Ok(json!({"instances.create": [{"instanceGuid": guid}]}));
            }
            Ok(Value::Null)
        }
        .boxed()
    }

    fn request(&self, request: HostRequest) -> BoxFuture<'_, Result<Value, AppError>> {
        async move {
            let response = self.hub.next_response(&request);
            self.hub.requests.lock().expect("lock requests").push(request);
            response
        }
        .boxed()
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
        self.hub
            .instance(guid)
            .map(|host| host as Arc<dyn HostRuntime>)
    }
}

/// Serializes tests that touch the process-wide translator.
pub fn lock_test_mutex() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}
