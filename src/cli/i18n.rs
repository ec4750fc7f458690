use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

pub const DEFAULT_LOCALE: &str = "en";

/// Language codes rendered right-to-left.
const RTL_LANGUAGES: &[&str] = &["ar", "he"];

const EMBEDDED: &[(&str, &str)] = &[
    ("en", include_str!("locales/en.json")),
    ("es", include_str!("locales/es.json")),
];

static DICTIONARIES: Lazy<Value> = Lazy::new(|| {
    let mut all = Map::new();
    for (code, raw) in EMBEDDED {
        match serde_json::from_str::<Value>(raw) {
            Ok(dict) => {
                all.insert((*code).to_string(), dict);
            }
            Err(e) => log::error!("embedded dictionary '{code}' is not valid JSON: {e}"),
        }
    }
    Value::Object(all)
});

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s?(.*?)\s?\}\}").expect("placeholder regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }
}

/// Locales with an embedded dictionary.
pub fn available_locales() -> Vec<&'static str> {
    EMBEDDED.iter().map(|(code, _)| *code).collect()
}

/// Dotted-key lookup against locale-keyed dictionaries.
#[derive(Debug, Clone)]
pub struct Translator {
    locale: String,
    dictionaries: Value,
}

impl Translator {
    /// Translator over the dictionaries shipped with the binary.
    pub fn new(locale: &str) -> Self {
        Self::with_dictionaries(locale, DICTIONARIES.clone())
    }

    /// `dictionaries` is an object keyed by locale code.
    pub fn with_dictionaries(locale: &str, dictionaries: Value) -> Self {
        let locale = locale.trim();
        Self {
            locale: if locale.is_empty() {
                DEFAULT_LOCALE.to_string()
            } else {
                locale.to_string()
            },
            dictionaries,
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn language(&self) -> &str {
        self.locale.split('-').next().unwrap_or(&self.locale)
    }

    /// Exact locale, then the bare language, then the default.
    fn dictionary(&self) -> Option<&Value> {
        [self.locale.as_str(), self.language(), DEFAULT_LOCALE]
            .into_iter()
            .find_map(|candidate| self.dictionaries.get(candidate))
    }

    /// Missing keys resolve to an empty string.
    pub fn translate(&self, key: &str) -> String {
        let Some(mut node) = self.dictionary() else {
            return String::new();
        };
        for segment in key.split('.') {
            match node.get(segment) {
                Some(next) => node = next,
                None => return String::new(),
            }
        }
        match node {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => String::new(),
        }
    }

    pub fn translate_with(&self, key: &str, substitutions: &[(&str, &str)]) -> String {
        curly_format(&self.translate(key), substitutions)
    }

    pub fn direction(&self) -> Direction {
        let language = self.language().to_lowercase();
        if RTL_LANGUAGES.contains(&language.as_str()) {
            Direction::Rtl
        } else {
            Direction::Ltr
        }
    }

    pub fn is_rtl(&self) -> bool {
        self.direction() == Direction::Rtl
    }
}

/// Replaces `{{ name }}` placeholders. Names without a substitution stay as
/// written.
pub fn curly_format(text: &str, substitutions: &[(&str, &str)]) -> String {
    if substitutions.is_empty() || !text.contains("{{") {
        return text.to_string();
    }
    let lookup: HashMap<&str, &str> = substitutions.iter().copied().collect();
    PLACEHOLDER
        .replace_all(text, |caps: &regex::Captures| {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            match lookup.get(name) {
                Some(value) => (*value).to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

// ============================================================================
// Process-wide translator
// ============================================================================

fn translator_store() -> &'static RwLock<Translator> {
    static STORE: OnceLock<RwLock<Translator>> = OnceLock::new();
    STORE.get_or_init(|| RwLock::new(Translator::new(DEFAULT_LOCALE)))
}

/// Installs the translator used by [`texts`].
pub fn install(translator: Translator) {
    log::debug!("locale set to {}", translator.locale());
    match translator_store().write() {
        Ok(mut guard) => *guard = translator,
        Err(poisoned) => *poisoned.into_inner() = translator,
    }
}

pub fn set_locale(locale: &str) {
    install(Translator::new(locale));
}

pub fn current_locale() -> String {
    with_translator(|t| t.locale().to_string())
}

fn with_translator<R>(f: impl FnOnce(&Translator) -> R) -> R {
    match translator_store().read() {
        Ok(guard) => f(&*guard),
        Err(poisoned) => f(&*poisoned.into_inner()),
    }
}

pub fn translate(key: &str) -> String {
    with_translator(|t| t.translate(key))
}

pub fn translate_with(key: &str, substitutions: &[(&str, &str)]) -> String {
    with_translator(|t| t.translate_with(key, substitutions))
}

pub fn direction() -> Direction {
    with_translator(Translator::direction)
}

// ============================================================================
// UI texts
// ============================================================================

pub mod texts {
    use super::{translate, translate_with};

    pub fn hello_person(name: &str) -> String {
        translate_with("helloPerson", &[("name", name)])
    }

    pub fn loading() -> String {
        translate("messages.loading")
    }

    pub fn copied_to_clipboard() -> String {
        translate("messages.copied")
    }

    pub fn not_set() -> String {
        translate("messages.notSet")
    }

    pub fn goodbye() -> String {
        translate("messages.goodbye")
    }

    // ---- configuration view ----

    pub fn config_title() -> String {
        translate("configView.title")
    }

    pub fn select_integration() -> String {
        translate("configView.selectIntegration")
    }

    pub fn no_integrations() -> String {
        translate("configView.noIntegrations")
    }

    pub fn config_initial_hint() -> String {
        translate("configView.initial")
    }

    pub fn integration_key_label() -> String {
        translate("configView.integrationKey")
    }

    pub fn last_updated_label() -> String {
        translate("configView.lastUpdatedAt")
    }

    pub fn config_load_error() -> String {
        translate("configView.loadError")
    }

    pub fn no_fields() -> String {
        translate("configView.noFields")
    }

    pub fn saving() -> String {
        translate("configView.saving")
    }

    pub fn save_success() -> String {
        translate("configView.saveSuccess")
    }

    pub fn save_failure() -> String {
        translate("configView.saveFailure")
    }

    pub fn save_busy() -> String {
        translate("configView.saveBusy")
    }

    pub fn edit_field(field: &str) -> String {
        translate_with("configView.editField", &[("field", field)])
    }

    pub fn unknown_field(field: &str) -> String {
        translate_with("configView.unknownField", &[("field", field)])
    }

    pub fn nothing_to_copy() -> String {
        translate("configView.nothingToCopy")
    }

    pub fn bundle_title() -> String {
        translate("bundleView.title")
    }

    pub fn bundle_load_error() -> String {
        translate("bundleView.loadError")
    }

    // ---- modal ----

    pub fn modal_title() -> String {
        translate("modal.title")
    }

    pub fn modal_sample_data(data: &str) -> String {
        translate_with("modal.sampleData", &[("data", data)])
    }

    pub fn modal_waiting() -> String {
        translate("modal.waiting")
    }

    pub fn modal_get_ticket() -> String {
        translate("modal.getTicket")
    }

    pub fn modal_ticket_fetched(id: &str, subject: &str) -> String {
        translate_with("modal.ticketFetched", &[("id", id), ("subject", subject)])
    }

    pub fn modal_ticket_error() -> String {
        translate("modal.ticketError")
    }

    pub fn modal_opening() -> String {
        translate("modal.opening")
    }

    // ---- terminal UI chrome ----

    pub fn tui_app_title() -> String {
        translate("tui.appTitle")
    }

    pub fn tui_hint_config() -> String {
        translate("tui.hintConfig")
    }

    pub fn tui_hint_editor() -> String {
        translate("tui.hintEditor")
    }

    pub fn tui_hint_modal() -> String {
        translate("tui.hintModal")
    }

    pub fn tui_integrations_pane() -> String {
        translate("tui.integrationsPane")
    }

    pub fn tui_fields_pane() -> String {
        translate("tui.fieldsPane")
    }

    pub fn tui_location(location: &str) -> String {
        translate_with("tui.location", &[("location", location)])
    }

    // ---- command line ----

    pub fn column_name() -> String {
        translate("cli.columnName")
    }

    pub fn column_field() -> String {
        translate("cli.columnField")
    }

    pub fn column_value() -> String {
        translate("cli.columnValue")
    }

    pub fn fetching(what: &str) -> String {
        translate_with("cli.fetching", &[("what", what)])
    }

    pub fn saving_key(key: &str) -> String {
        translate_with("cli.saving", &[("key", key)])
    }

    pub fn no_integration_key() -> String {
        translate("cli.noIntegrationKey")
    }

    pub fn no_subdomain() -> String {
        translate("cli.noSubdomain")
    }

    pub fn invalid_assignment(input: &str) -> String {
        translate_with("cli.invalidAssignment", &[("input", input)])
    }

    pub fn no_changes() -> String {
        translate("cli.noChanges")
    }

    pub fn exported_to(path: &str) -> String {
        translate_with("cli.exportedTo", &[("path", path)])
    }

    pub fn settings_saved(path: &str) -> String {
        translate_with("cli.settingsSaved", &[("path", path)])
    }

    pub fn edit_prompt(field: &str) -> String {
        translate_with("cli.editPrompt", &[("field", field)])
    }

    pub fn confirm_save(count: usize, key: &str) -> String {
        translate_with(
            "cli.confirmSave",
            &[("count", &count.to_string()), ("key", key)],
        )
    }

    pub fn cancelled() -> String {
        translate("cli.cancelled")
    }

    pub fn requires_tty() -> String {
        translate("cli.requiresTty")
    }
}
