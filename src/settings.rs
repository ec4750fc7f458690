use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{OnceLock, RwLock};

use crate::error::AppError;

const SETTINGS_DIR: &str = ".zis-config";
const SETTINGS_FILE: &str = "settings.json";

fn default_is_production() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    20
}

/// 宿主注入的应用设置（子域名、凭据、生产环境开关等）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Overrides `https://{subdomain}.zendesk.com`, e.g. a local proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Production installs talk TLS; sandbox installs may use plain http.
    #[serde(default = "default_is_production")]
    pub is_production: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zis_integration_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<u64>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            subdomain: None,
            email: None,
            api_token: None,
            base_url: None,
            is_production: true,
            zis_integration_key: None,
            locale: None,
            ticket_id: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Per-run values from the command line or environment; never persisted
/// unless `settings set` asks for it.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub subdomain: Option<String>,
    pub email: Option<String>,
    pub api_token: Option<String>,
    pub base_url: Option<String>,
    pub sandbox: bool,
    pub integration_key: Option<String>,
    pub locale: Option<String>,
    pub ticket_id: Option<u64>,
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

impl AppSettings {
    pub fn settings_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(SETTINGS_DIR)
            .join(SETTINGS_FILE)
    }

    fn normalize(&mut self) {
        self.subdomain = trimmed(&self.subdomain).map(|s| {
            // Accept "acme", "acme.zendesk.com" and full URLs alike.
            let s = s
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/');
            s.strip_suffix(".zendesk.com").unwrap_or(s).to_string()
        });
        self.email = trimmed(&self.email);
        self.api_token = trimmed(&self.api_token);
        self.base_url = trimmed(&self.base_url).map(|s| s.trim_end_matches('/').to_string());
        self.zis_integration_key = trimmed(&self.zis_integration_key);
        self.locale = trimmed(&self.locale);
        self.timeout_secs = self.timeout_secs.max(1);
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<AppSettings>(&content) {
            Ok(mut settings) => {
                settings.normalize();
                settings
            }
            Err(err) => {
                log::warn!(
                    "failed to parse settings, falling back to defaults. path: {}, error: {}",
                    path.display(),
                    err
                );
                Self::default()
            }
        }
    }

    pub fn load() -> Self {
        Self::load_from(&Self::settings_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), AppError> {
        let mut normalized = self.clone();
        normalized.normalize();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(&normalized)
            .map_err(|e| AppError::JsonSerialize { source: e })?;
        fs::write(path, json).map_err(|e| AppError::io(path, e))?;
        Ok(())
    }

    pub fn save(&self) -> Result<(), AppError> {
        self.save_to(&Self::settings_path())
    }

    pub fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if let Some(v) = trimmed(&overrides.subdomain) {
            self.subdomain = Some(v);
        }
        if let Some(v) = trimmed(&overrides.email) {
            self.email = Some(v);
        }
        if let Some(v) = trimmed(&overrides.api_token) {
            self.api_token = Some(v);
        }
        if let Some(v) = trimmed(&overrides.base_url) {
            self.base_url = Some(v);
        }
        if overrides.sandbox {
            self.is_production = false;
        }
        if let Some(v) = trimmed(&overrides.integration_key) {
            self.zis_integration_key = Some(v);
        }
        if let Some(v) = trimmed(&overrides.locale) {
            self.locale = Some(v);
        }
        if overrides.ticket_id.is_some() {
            self.ticket_id = overrides.ticket_id;
        }
        self.normalize();
    }

    /// Origin every API path is resolved against.
    pub fn api_origin(&self, secure: bool) -> Result<String, AppError> {
        if let Some(base) = &self.base_url {
            return Ok(base.clone());
        }
        let subdomain = self.subdomain.as_deref().ok_or_else(|| {
            AppError::Config(
                "no Zendesk subdomain configured (use --subdomain or ZENDESK_SUBDOMAIN)"
                    .to_string(),
            )
        })?;
        let scheme = if secure { "https" } else { "http" };
        Ok(format!("{scheme}://{subdomain}.zendesk.com"))
    }

    /// Settings as the host hands them to the app on registration.
    pub fn host_settings(&self) -> Value {
        json!({
            "zis_integration_key": self.zis_integration_key.clone().unwrap_or_default(),
            "IS_PRODUCTION": self.is_production,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.email.is_some() && self.api_token.is_some()
    }
}

fn settings_store() -> &'static RwLock<AppSettings> {
    static STORE: OnceLock<RwLock<AppSettings>> = OnceLock::new();
    STORE.get_or_init(|| RwLock::new(AppSettings::load()))
}

pub fn get_settings() -> AppSettings {
    match settings_store().read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

pub fn update_settings(mut new_settings: AppSettings) -> Result<(), AppError> {
    new_settings.normalize();
    new_settings.save()?;

    let mut guard = settings_store().write()?;
    *guard = new_settings;
    Ok(())
}

/// Persisted settings with this run's overrides applied on top.
pub fn effective_settings(overrides: &SettingsOverrides) -> AppSettings {
    let mut settings = get_settings();
    settings.apply_overrides(overrides);
    settings
}
