pub mod bundle;
pub mod config;
pub mod integrations;
pub mod settings;
pub mod ui;

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::bootstrap::{self, Session};
use crate::cli::i18n::texts;
use crate::cli::Location;
use crate::error::AppError;
use crate::host::{HostRuntime, ZendeskHost};
use crate::settings::{effective_settings, AppSettings, SettingsOverrides};

/// A registered host session plus the runtime the one-shot commands
/// drive it with.
pub struct Connection {
    pub runtime: Runtime,
    pub host: Arc<ZendeskHost>,
    pub session: Session,
    pub settings: AppSettings,
}

impl Connection {
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Explicit argument, then the persisted default, then the host setting.
    pub fn integration_key(&self, explicit: Option<&str>) -> Result<String, AppError> {
        resolve_key(
            explicit,
            self.settings.zis_integration_key.as_deref(),
            self.session.bridge.setting_str("zis_integration_key"),
        )
    }
}

pub fn connect(overrides: &SettingsOverrides, location: Location) -> Result<Connection, AppError> {
    let settings = effective_settings(overrides);
    if settings.subdomain.is_none() && settings.base_url.is_none() {
        return Err(AppError::Config(texts::no_subdomain()));
    }
    if !settings.has_credentials() {
        log::warn!("no email/api token configured; requests go out unauthenticated");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::IoContext {
            context: "failed to start async runtime".to_string(),
            source: e,
        })?;

    let host = ZendeskHost::new(settings.clone(), location.as_str())?;
    let client: Arc<dyn HostRuntime> = host.clone();
    let registrar = host.clone();
    let session = runtime.block_on(bootstrap::start(
        client,
        move || registrar.register(),
        settings.locale.as_deref(),
    ))?;

    Ok(Connection {
        runtime,
        host,
        session,
        settings,
    })
}

pub fn resolve_key(
    explicit: Option<&str>,
    configured: Option<&str>,
    host_setting: Option<&str>,
) -> Result<String, AppError> {
    [explicit, configured, host_setting]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|k| !k.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::InvalidInput(texts::no_integration_key()))
}
