//! Primary view: integration picker, configuration form and bundle viewer.
//!
//! All state changes go through the named transitions below. Fetches are
//! tagged with a request token when they start; a response carrying an
//! older token than the current one is dropped, so the most recent
//! selection always wins regardless of arrival order.

use serde_json::Value;

use super::format::{format_date, format_key};
use crate::cli::i18n::texts;
use crate::error::AppError;
use crate::host::NoticeKind;
use crate::zis::{self, ConfigMap, ConfigRecord, Integration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigState {
    Initial,
    Loading,
    Configuration,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleState {
    Initial,
    Loading,
    Available,
    Error,
}

/// Inline message under the form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormAlert {
    pub kind: NoticeKind,
    pub message: String,
}

/// Handed back by [`ConfigView::select`]; the caller runs both fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTickets {
    pub integration_key: String,
    pub config_token: u64,
    pub bundle_token: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub integration_key: String,
    pub config: ConfigMap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedBundle {
    pub uuid: String,
    pub document: Value,
}

#[derive(Debug, Clone)]
pub struct ConfigView {
    integration_options: Vec<String>,
    integration_key: Option<String>,

    state: ConfigState,
    config: ConfigMap,
    last_updated_at: Option<String>,

    bundle_state: BundleState,
    bundle: Option<LoadedBundle>,
    bundle_text: String,

    alert: Option<FormAlert>,
    is_form_submit_loading: bool,

    last_token: u64,
    config_token: u64,
    bundle_token: u64,
}

impl ConfigView {
    /// `default_key` comes from the `zis_integration_key` setting.
    pub fn new(default_key: Option<String>) -> Self {
        Self {
            integration_options: Vec::new(),
            integration_key: default_key.filter(|k| !k.trim().is_empty()),
            state: ConfigState::Initial,
            config: ConfigMap::new(),
            last_updated_at: None,
            bundle_state: BundleState::Initial,
            bundle: None,
            bundle_text: String::new(),
            alert: None,
            is_form_submit_loading: false,
            last_token: 0,
            config_token: 0,
            bundle_token: 0,
        }
    }

    fn next_token(&mut self) -> u64 {
        self.last_token += 1;
        self.last_token
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// A failed listing leaves the options empty; the view stays usable.
    pub fn integrations_loaded(&mut self, result: Result<Vec<Integration>, AppError>) {
        match result {
            Ok(list) => {
                self.integration_options = list.into_iter().map(|i| i.name).collect();
            }
            Err(e) => {
                log::error!("failed to load integrations: {e}");
                self.integration_options.clear();
            }
        }
    }

    /// Starts loading configuration and bundle for `integration_key`.
    ///
    /// Old configuration values stay in place until the new fetch lands.
    pub fn select(&mut self, integration_key: &str) -> LoadTickets {
        self.integration_key = Some(integration_key.to_string());
        self.alert = None;
        self.state = ConfigState::Loading;
        self.bundle_state = BundleState::Loading;
        self.config_token = self.next_token();
        self.bundle_token = self.next_token();
        LoadTickets {
            integration_key: integration_key.to_string(),
            config_token: self.config_token,
            bundle_token: self.bundle_token,
        }
    }

    /// Returns `false` when the response belongs to a superseded selection.
    pub fn config_loaded(&mut self, token: u64, result: Result<ConfigRecord, AppError>) -> bool {
        if token != self.config_token {
            log::debug!("dropping stale config response (token {token}, current {})", self.config_token);
            return false;
        }
        match result {
            Ok(record) => {
                self.config = record.config;
                self.last_updated_at = record.updated_at;
                self.state = ConfigState::Configuration;
            }
            Err(e) => {
                log::error!("failed to load configuration: {e}");
                self.state = ConfigState::Error;
            }
        }
        true
    }

    pub fn bundle_loaded(&mut self, token: u64, result: Result<LoadedBundle, AppError>) -> bool {
        if token != self.bundle_token {
            log::debug!("dropping stale bundle response (token {token}, current {})", self.bundle_token);
            return false;
        }
        match result.and_then(|bundle| Ok((zis::pretty_json(&bundle.document)?, bundle))) {
            Ok((text, bundle)) => {
                log::debug!("bundle {} loaded", bundle.uuid);
                self.bundle_text = text;
                self.bundle = Some(bundle);
                self.bundle_state = BundleState::Available;
            }
            Err(e) => {
                log::error!("failed to load bundle: {e}");
                self.bundle_state = BundleState::Error;
            }
        }
        true
    }

    /// Replaces one field's value. Numbers stay numbers when `raw` still
    /// parses as one; everything else is stored as text.
    pub fn set_field(&mut self, key: &str, raw: &str) -> Result<(), AppError> {
        let Some(slot) = self.config.get_mut(key) else {
            return Err(AppError::InvalidInput(texts::unknown_field(key)));
        };
        let parsed = if slot.is_number() {
            serde_json::from_str::<Value>(raw.trim())
                .ok()
                .filter(Value::is_number)
        } else {
            None
        };
        *slot = parsed.unwrap_or_else(|| Value::String(raw.to_string()));
        Ok(())
    }

    /// `None` while a save is running or before a configuration is shown.
    pub fn begin_save(&mut self) -> Option<SaveRequest> {
        if self.is_form_submit_loading || self.state != ConfigState::Configuration {
            return None;
        }
        let integration_key = self.integration_key.clone()?;
        self.is_form_submit_loading = true;
        Some(SaveRequest {
            integration_key,
            config: self.config.clone(),
        })
    }

    /// Always clears the busy flag.
    pub fn finish_save(&mut self, result: Result<(), AppError>) -> FormAlert {
        self.is_form_submit_loading = false;
        let alert = match result {
            Ok(()) => FormAlert {
                kind: NoticeKind::Success,
                message: texts::save_success(),
            },
            Err(e) => {
                log::error!("failed to update configuration: {e}");
                FormAlert {
                    kind: NoticeKind::Warning,
                    message: texts::save_failure(),
                }
            }
        };
        self.alert = Some(alert.clone());
        alert
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn state(&self) -> ConfigState {
        self.state
    }

    pub fn bundle_state(&self) -> BundleState {
        self.bundle_state
    }

    pub fn integration_options(&self) -> &[String] {
        &self.integration_options
    }

    pub fn integration_key(&self) -> Option<&str> {
        self.integration_key.as_deref()
    }

    pub fn config(&self) -> &ConfigMap {
        &self.config
    }

    pub fn last_updated_at(&self) -> Option<&str> {
        self.last_updated_at.as_deref()
    }

    pub fn formatted_last_updated(&self) -> String {
        format_date(self.last_updated_at.as_deref())
    }

    pub fn bundle(&self) -> Option<&LoadedBundle> {
        self.bundle.as_ref()
    }

    pub fn bundle_text(&self) -> &str {
        &self.bundle_text
    }

    pub fn alert(&self) -> Option<&FormAlert> {
        self.alert.as_ref()
    }

    pub fn is_form_submit_loading(&self) -> bool {
        self.is_form_submit_loading
    }

    /// The bundle section appears once anything has been selected.
    pub fn shows_bundle(&self) -> bool {
        self.state != ConfigState::Initial
    }

    /// `(key, label, value)` rows in server order.
    pub fn fields(&self) -> Vec<(String, String, String)> {
        self.config
            .iter()
            .map(|(key, value)| (key.clone(), format_key(key), display_value(value)))
            .collect()
    }

    pub fn config_json(&self) -> Result<String, AppError> {
        zis::pretty_json(&self.config)
    }
}

/// Strings are shown bare; anything else as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    fn record(config: Value, updated_at: &str) -> ConfigRecord {
        ConfigRecord {
            config: serde_json::from_value(config).expect("config map"),
            updated_at: Some(updated_at.to_string()),
        }
    }

    fn loaded(view: &mut ConfigView, key: &str, config: Value, updated_at: &str) {
        let tickets = view.select(key);
        assert!(view.config_loaded(tickets.config_token, Ok(record(config, updated_at))));
    }

    #[test]
    fn starts_initial_with_default_key() {
        let view = ConfigView::new(Some("jira".to_string()));
        assert_eq!(view.state(), ConfigState::Initial);
        assert_eq!(view.bundle_state(), BundleState::Initial);
        assert_eq!(view.integration_key(), Some("jira"));
        assert!(!view.shows_bundle());
        assert!(ConfigView::new(Some("  ".to_string())).integration_key().is_none());
    }

    #[test]
    fn selection_enters_loading_and_clears_alert() {
        let mut view = ConfigView::new(None);
        loaded(&mut view, "jira", json!({"a": 1}), "2024-01-05T13:05:00");
        view.begin_save().expect("save allowed");
        view.finish_save(Ok(()));
        assert!(view.alert().is_some());

        let tickets = view.select("slack");
        assert_eq!(tickets.integration_key, "slack");
        assert_ne!(tickets.config_token, tickets.bundle_token);
        assert_eq!(view.state(), ConfigState::Loading);
        assert_eq!(view.bundle_state(), BundleState::Loading);
        assert!(view.alert().is_none());
        assert!(view.shows_bundle());
    }

    #[test]
    fn failed_fetch_keeps_previous_config() {
        let mut view = ConfigView::new(None);
        loaded(&mut view, "jira", json!({"api_url": "https://a.test"}), "2024-01-05T13:05:00");

        let tickets = view.select("jira");
        view.config_loaded(tickets.config_token, Err(AppError::malformed("configs list is empty")));
        assert_eq!(view.state(), ConfigState::Error);
        assert_eq!(view.config()["api_url"], json!("https://a.test"));
        assert_eq!(view.last_updated_at(), Some("2024-01-05T13:05:00"));
    }

    #[test]
    fn successful_fetch_replaces_config_wholesale() {
        let mut view = ConfigView::new(None);
        loaded(&mut view, "jira", json!({"a": 1, "b": 2}), "2024-01-05T13:05:00");
        loaded(&mut view, "slack", json!({"c": "x"}), "2024-02-01T08:00:00");

        assert_eq!(view.state(), ConfigState::Configuration);
        let keys: Vec<_> = view.config().keys().cloned().collect();
        assert_eq!(keys, ["c"]);
        assert_eq!(view.last_updated_at(), Some("2024-02-01T08:00:00"));
        assert_eq!(view.formatted_last_updated(), "01 Feb 2024, 8:00 AM");
    }

    #[test]
    fn stale_responses_are_dropped() {
        let mut view = ConfigView::new(None);
        let first = view.select("jira");
        let second = view.select("slack");

        assert!(!view.config_loaded(first.config_token, Ok(record(json!({"old": 1}), "x"))));
        assert!(!view.bundle_loaded(
            first.bundle_token,
            Ok(LoadedBundle { uuid: "u1".to_string(), document: json!({}) })
        ));
        assert_eq!(view.state(), ConfigState::Loading);
        assert_eq!(view.bundle_state(), BundleState::Loading);

        assert!(view.config_loaded(second.config_token, Ok(record(json!({"new": 2}), "y"))));
        assert!(view.config().contains_key("new"));
        assert!(!view.config().contains_key("old"));
    }

    #[test]
    fn bundle_machine_is_independent() {
        let mut view = ConfigView::new(None);
        let tickets = view.select("jira");
        view.config_loaded(tickets.config_token, Err(AppError::Network("down".to_string())));
        view.bundle_loaded(
            tickets.bundle_token,
            Ok(LoadedBundle {
                uuid: "b-1".to_string(),
                document: json!({"name": "jira_bundle"}),
            }),
        );
        assert_eq!(view.state(), ConfigState::Error);
        assert_eq!(view.bundle_state(), BundleState::Available);
        assert_eq!(view.bundle_text(), "{\n    \"name\": \"jira_bundle\"\n}");
        assert_eq!(view.bundle().map(|b| b.uuid.as_str()), Some("b-1"));

        let again = view.select("jira");
        view.bundle_loaded(again.bundle_token, Err(AppError::malformed("bundles list is empty")));
        assert_eq!(view.bundle_state(), BundleState::Error);
    }

    #[test]
    #[serial]
    fn save_success_and_failure_both_clear_busy_flag() {
        let mut view = ConfigView::new(None);
        loaded(&mut view, "jira", json!({"a": 1}), "2024-01-05T13:05:00");

        let request = view.begin_save().expect("first save");
        assert_eq!(request.integration_key, "jira");
        assert!(view.is_form_submit_loading());
        assert!(view.begin_save().is_none(), "second save refused while busy");

        let alert = view.finish_save(Ok(()));
        assert!(!view.is_form_submit_loading());
        assert_eq!(alert.kind, NoticeKind::Success);
        assert_eq!(alert.message, "Config updated successfully!");

        view.begin_save().expect("save again");
        let alert = view.finish_save(Err(AppError::Http {
            method: "PUT".to_string(),
            url: "/x".to_string(),
            status: 500,
        }));
        assert!(!view.is_form_submit_loading());
        assert_eq!(alert.kind, NoticeKind::Warning);
        assert_eq!(view.alert().map(|a| a.message.as_str()), Some("Failed to update config!"));
    }

    #[test]
    fn save_needs_a_loaded_configuration() {
        let mut view = ConfigView::new(Some("jira".to_string()));
        assert!(view.begin_save().is_none());
        view.select("jira");
        assert!(view.begin_save().is_none());
    }

    #[test]
    fn field_edits_keep_numbers_numeric() {
        let mut view = ConfigView::new(None);
        loaded(
            &mut view,
            "jira",
            json!({"retries": 3, "api_url": "https://a.test", "ratio": 0.5}),
            "2024-01-05T13:05:00",
        );

        view.set_field("retries", " 5 ").expect("edit");
        view.set_field("ratio", "abc").expect("edit");
        view.set_field("api_url", "42").expect("edit");
        assert_eq!(view.config()["retries"], json!(5));
        assert_eq!(view.config()["ratio"], json!("abc"));
        assert_eq!(view.config()["api_url"], json!("42"));
        assert!(matches!(
            view.set_field("nope", "1"),
            Err(AppError::InvalidInput(_))
        ));

        let request = view.begin_save().expect("save");
        assert_eq!(request.config["retries"], json!(5));
    }

    #[test]
    fn fields_are_labelled_in_server_order() {
        let mut view = ConfigView::new(None);
        loaded(&mut view, "jira", json!({"zeta_key": 1, "alpha": "a"}), "x");
        assert_eq!(
            view.fields(),
            vec![
                ("zeta_key".to_string(), "Zeta Key".to_string(), "1".to_string()),
                ("alpha".to_string(), "Alpha".to_string(), "a".to_string()),
            ]
        );
        assert_eq!(
            view.config_json().expect("json"),
            "{\n    \"zeta_key\": 1,\n    \"alpha\": \"a\"\n}"
        );
    }

    #[test]
    fn failed_integration_listing_leaves_options_empty() {
        let mut view = ConfigView::new(None);
        view.integrations_loaded(Ok(vec![
            Integration { name: "jira".to_string() },
            Integration { name: "slack".to_string() },
        ]));
        assert_eq!(view.integration_options(), ["jira", "slack"]);
        view.integrations_loaded(Err(AppError::Network("offline".to_string())));
        assert!(view.integration_options().is_empty());
    }
}
