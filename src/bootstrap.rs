//! Startup: register with the host, pick the locale, choose the view.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::cli::i18n::{self, Translator, DEFAULT_LOCALE};
use crate::error::AppError;
use crate::host::{HostBridge, HostRuntime, Registration};
use crate::view::Mounted;

const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Session {
    pub bridge: Arc<HostBridge>,
    pub registration: Registration,
    pub current_user: Value,
    pub locale: String,
    pub location: String,
    pub mounted: Mounted,
}

impl Session {
    pub fn user_name(&self) -> Option<&str> {
        self.current_user.get("name").and_then(Value::as_str)
    }
}

/// Waits for `app.registered` (fired by `register`), then resolves the
/// user locale and installs the translator.
///
/// `locale_override` comes from settings and wins over the user's locale.
/// A failed `currentUser` read falls back to the default locale.
pub async fn start<F>(
    client: Arc<dyn HostRuntime>,
    register: F,
    locale_override: Option<&str>,
) -> Result<Session, AppError>
where
    F: FnOnce(),
{
    let bridge = Arc::new(HostBridge::new(client));

    let (tx, rx) = oneshot::channel::<Registration>();
    let tx = Mutex::new(Some(tx));
    bridge.on_app_registered(move |registration| {
        let pending = match tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(tx) = pending {
            let _ = tx.send(registration.clone());
        }
    });

    register();

    let registration = tokio::time::timeout(REGISTRATION_TIMEOUT, rx)
        .await
        .map_err(|_| AppError::Host("timed out waiting for app.registered".to_string()))?
        .map_err(|_| AppError::Host("host went away before app.registered".to_string()))?;

    let location = registration.location().unwrap_or("sidebar").to_string();
    log::debug!("registered at location '{location}'");

    let current_user = match bridge.get("currentUser").await {
        Ok(user) => user,
        Err(e) => {
            log::warn!("could not read currentUser: {e}");
            Value::Null
        }
    };

    let locale = resolve_locale(locale_override, &current_user);
    i18n::install(Translator::new(&locale));

    Ok(Session {
        bridge,
        registration,
        current_user,
        locale,
        mounted: Mounted::for_location(&location),
        location,
    })
}

pub fn resolve_locale(locale_override: Option<&str>, current_user: &Value) -> String {
    locale_override
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .or_else(|| {
            current_user
                .get("locale")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|l| !l.is_empty())
        })
        .unwrap_or(DEFAULT_LOCALE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn locale_prefers_override_then_user_then_default() {
        let user = json!({"name": "Ada", "locale": "es-ES"});
        assert_eq!(resolve_locale(Some("he"), &user), "he");
        assert_eq!(resolve_locale(Some(" "), &user), "es-ES");
        assert_eq!(resolve_locale(None, &user), "es-ES");
        assert_eq!(resolve_locale(None, &Value::Null), "en");
    }

    #[test]
    fn location_picks_the_view() {
        assert_eq!(Mounted::for_location("modal"), Mounted::Modal);
        assert_eq!(Mounted::for_location("ticket_sidebar"), Mounted::Config);
        assert_eq!(Mounted::for_location("sidebar"), Mounted::Config);
    }
}
