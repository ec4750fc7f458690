//! ZIS REST endpoints and the response shapes the app relies on.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// Field name → scalar value, in server order.
pub type ConfigMap = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    #[serde(default)]
    pub config: ConfigMap,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleDescriptor {
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigUpdate<'a> {
    pub scope: String,
    pub config: &'a ConfigMap,
}

#[derive(Deserialize)]
struct IntegrationsEnvelope {
    integrations: Vec<Integration>,
}

#[derive(Deserialize)]
struct ConfigsEnvelope {
    configs: Vec<ConfigRecord>,
}

#[derive(Deserialize)]
struct BundlesEnvelope {
    bundles: Vec<BundleDescriptor>,
}

pub fn settings_scope(integration_key: &str) -> String {
    format!("{integration_key}_settings")
}

pub fn integrations_path() -> String {
    "/api/services/zis/registry/integrations".to_string()
}

pub fn configs_path(integration_key: &str) -> String {
    format!(
        "/api/services/zis/integrations/{integration_key}/configs?filter[scope]={}",
        settings_scope(integration_key)
    )
}

pub fn config_update_path(integration_key: &str) -> String {
    format!(
        "/api/services/zis/integrations/{integration_key}/configs/{}",
        settings_scope(integration_key)
    )
}

pub fn bundles_path(integration_key: &str) -> String {
    format!("/api/services/zis/registry/{integration_key}/bundles")
}

pub fn bundle_path(integration_key: &str, uuid: &str) -> String {
    format!("/api/services/zis/registry/{integration_key}/bundles/{uuid}")
}

pub fn config_update_body(integration_key: &str, config: &ConfigMap) -> Result<String, AppError> {
    let body = ConfigUpdate {
        scope: settings_scope(integration_key),
        config,
    };
    serde_json::to_string(&body).map_err(|e| AppError::JsonSerialize { source: e })
}

pub fn parse_integrations(value: Value) -> Result<Vec<Integration>, AppError> {
    serde_json::from_value::<IntegrationsEnvelope>(value)
        .map(|env| env.integrations)
        .map_err(|e| AppError::malformed(format!("integrations: {e}")))
}

/// Only the first record matters; an empty list is a failure.
pub fn parse_first_config(value: Value) -> Result<ConfigRecord, AppError> {
    let env = serde_json::from_value::<ConfigsEnvelope>(value)
        .map_err(|e| AppError::malformed(format!("configs: {e}")))?;
    env.configs
        .into_iter()
        .next()
        .ok_or_else(|| AppError::malformed("configs list is empty"))
}

pub fn parse_first_bundle(value: Value) -> Result<BundleDescriptor, AppError> {
    let env = serde_json::from_value::<BundlesEnvelope>(value)
        .map_err(|e| AppError::malformed(format!("bundles: {e}")))?;
    env.bundles
        .into_iter()
        .next()
        .ok_or_else(|| AppError::malformed("bundles list is empty"))
}

/// Four-space indented JSON, the layout shown and copied by the views.
pub fn pretty_json<T: Serialize>(value: &T) -> Result<String, AppError> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| AppError::JsonSerialize { source: e })?;
    String::from_utf8(out).map_err(|e| AppError::Message(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paths_follow_the_zis_layout() {
        assert_eq!(
            configs_path("jira"),
            "/api/services/zis/integrations/jira/configs?filter[scope]=jira_settings"
        );
        assert_eq!(
            config_update_path("jira"),
            "/api/services/zis/integrations/jira/configs/jira_settings"
        );
        assert_eq!(bundles_path("jira"), "/api/services/zis/registry/jira/bundles");
        assert_eq!(
            bundle_path("jira", "b-1"),
            "/api/services/zis/registry/jira/bundles/b-1"
        );
    }

    #[test]
    fn first_config_keeps_field_order() {
        let record = parse_first_config(json!({
            "configs": [
                {"config": {"zeta": 1, "alpha": "a"}, "updated_at": "2024-01-05T13:05:00Z"},
                {"config": {"ignored": true}}
            ]
        }))
        .expect("parse configs");
        let keys: Vec<_> = record.config.keys().cloned().collect();
        assert_eq!(keys, ["zeta", "alpha"]);
        assert_eq!(record.updated_at.as_deref(), Some("2024-01-05T13:05:00Z"));
    }

    #[test]
    fn empty_lists_are_malformed() {
        assert!(matches!(
            parse_first_config(json!({"configs": []})),
            Err(AppError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_first_bundle(json!({"bundles": []})),
            Err(AppError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_integrations(json!({"unexpected": 1})),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn update_body_carries_scope_and_whole_config() {
        let mut config = ConfigMap::new();
        config.insert("api_url".to_string(), json!("https://x.test"));
        config.insert("retries".to_string(), json!(3));
        let body = config_update_body("jira", &config).expect("body");
        let value: Value = serde_json::from_str(&body).expect("json");
        assert_eq!(
            value,
            json!({"scope": "jira_settings", "config": {"api_url": "https://x.test", "retries": 3}})
        );
    }

    #[test]
    fn pretty_json_uses_four_spaces() {
        let text = pretty_json(&json!({"a": {"b": 1}})).expect("pretty");
        assert_eq!(text, "{\n    \"a\": {\n        \"b\": 1\n    }\n}");
    }
}
