use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::Size;

use crate::cli::i18n::texts;
use crate::host::{HostNotice, NoticeKind};
use crate::view::{ConfigState, ConfigView, ModalView, Mounted};

/// Ticks per second of the UI loop.
pub const TICKS_PER_SECOND: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Integrations,
    Fields,
    Bundle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

impl From<NoticeKind> for ToastKind {
    fn from(kind: NoticeKind) -> Self {
        match kind {
            NoticeKind::Success => ToastKind::Success,
            NoticeKind::Warning => ToastKind::Warning,
            NoticeKind::Error => ToastKind::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub remaining_ticks: u16,
}

impl Toast {
    pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            message: message.into(),
            kind,
            remaining_ticks: 12,
        }
    }

    pub fn from_notice(notice: &HostNotice) -> Self {
        let ticks = notice.duration_ms.saturating_mul(TICKS_PER_SECOND) / 1000;
        Self {
            message: notice.message.clone(),
            kind: notice.kind.into(),
            remaining_ticks: u16::try_from(ticks.max(1)).unwrap_or(u16::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEditor {
    pub key: String,
    pub label: String,
    pub buffer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    None,
    FieldEditor(FieldEditor),
}

impl Overlay {
    pub fn is_active(&self) -> bool {
        !matches!(self, Overlay::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    ReloadIntegrations,
    SelectIntegration(String),
    ApplyField { key: String, value: String },
    Save,
    CopyConfig,
    CopyBundle,
    OpenModal,
    CloseModal,
    FetchTicket,
}

pub struct App {
    pub mounted: Mounted,
    pub config: ConfigView,
    /// Present while a modal surface is shown (always, when mounted as one).
    pub modal: Option<ModalView>,
    pub modal_opening: bool,

    pub greeting: String,
    pub location: String,
    pub subdomain: Option<String>,

    pub focus: Focus,
    pub integration_idx: usize,
    pub field_idx: usize,
    pub bundle_scroll: u16,

    pub overlay: Overlay,
    pub toast: Option<Toast>,
    pub should_quit: bool,
    pub last_size: Size,
}

impl App {
    pub fn new(mounted: Mounted, default_integration_key: Option<String>) -> Self {
        Self {
            mounted,
            config: ConfigView::new(default_integration_key),
            modal: (mounted == Mounted::Modal).then(ModalView::new),
            modal_opening: false,
            greeting: String::new(),
            location: String::new(),
            subdomain: None,
            focus: Focus::Integrations,
            integration_idx: 0,
            field_idx: 0,
            bundle_scroll: 0,
            overlay: Overlay::None,
            toast: None,
            should_quit: false,
            last_size: Size::new(0, 0),
        }
    }

    pub fn on_tick(&mut self) {
        if let Some(toast) = &mut self.toast {
            if toast.remaining_ticks > 0 {
                toast.remaining_ticks -= 1;
            }
            if toast.remaining_ticks == 0 {
                self.toast = None;
            }
        }
    }

    pub fn push_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.toast = Some(Toast::new(message, kind));
    }

    pub fn push_notice(&mut self, notice: &HostNotice) {
        self.toast = Some(Toast::from_notice(notice));
    }

    /// Integration names to pick from. Falls back to the configured
    /// default key while the registry list is empty.
    pub fn integration_choices(&self) -> Vec<String> {
        let options = self.config.integration_options();
        if !options.is_empty() {
            return options.to_vec();
        }
        self.config
            .integration_key()
            .map(|k| vec![k.to_string()])
            .unwrap_or_default()
    }

    /// Keeps the cursor on the selected key after the list reloads.
    pub fn sync_integration_cursor(&mut self) {
        let choices = self.integration_choices();
        if let Some(key) = self.config.integration_key() {
            if let Some(pos) = choices.iter().position(|c| c == key) {
                self.integration_idx = pos;
                return;
            }
        }
        self.integration_idx = self.integration_idx.min(choices.len().saturating_sub(1));
    }

    pub fn selected_field(&self) -> Option<(String, String, String)> {
        self.config.fields().into_iter().nth(self.field_idx)
    }

    fn clamp_selections(&mut self) {
        let choices = self.integration_choices().len();
        self.integration_idx = self.integration_idx.min(choices.saturating_sub(1));
        let fields = self.config.config().len();
        self.field_idx = self.field_idx.min(fields.saturating_sub(1));
        if self.focus == Focus::Bundle && !self.config.shows_bundle() {
            self.focus = Focus::Integrations;
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Action {
        self.clamp_selections();

        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
            self.should_quit = true;
            return Action::Quit;
        }

        if self.overlay.is_active() {
            return self.on_overlay_key(key);
        }

        if self.modal.is_some() {
            return self.on_modal_key(key);
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                return Action::Quit;
            }
            KeyCode::Tab => {
                self.focus = self.next_focus();
                return Action::None;
            }
            KeyCode::BackTab => {
                self.focus = self.prev_focus();
                return Action::None;
            }
            KeyCode::Char('s') => return Action::Save,
            KeyCode::Char('c') => return Action::CopyConfig,
            KeyCode::Char('b') => return Action::CopyBundle,
            KeyCode::Char('m') => return Action::OpenModal,
            KeyCode::Char('r') => return Action::ReloadIntegrations,
            _ => {}
        }

        match self.focus {
            Focus::Integrations => self.on_integrations_key(key),
            Focus::Fields => self.on_fields_key(key),
            Focus::Bundle => self.on_bundle_key(key),
        }
    }

    fn next_focus(&self) -> Focus {
        match self.focus {
            Focus::Integrations => Focus::Fields,
            Focus::Fields if self.config.shows_bundle() => Focus::Bundle,
            Focus::Fields | Focus::Bundle => Focus::Integrations,
        }
    }

    fn prev_focus(&self) -> Focus {
        match self.focus {
            Focus::Integrations if self.config.shows_bundle() => Focus::Bundle,
            Focus::Integrations | Focus::Bundle => Focus::Fields,
            Focus::Fields => Focus::Integrations,
        }
    }

    fn on_integrations_key(&mut self, key: KeyEvent) -> Action {
        let choices = self.integration_choices();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.integration_idx = self.integration_idx.saturating_sub(1);
                Action::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.integration_idx + 1 < choices.len() {
                    self.integration_idx += 1;
                }
                Action::None
            }
            KeyCode::Enter => match choices.get(self.integration_idx) {
                Some(name) => {
                    self.field_idx = 0;
                    self.bundle_scroll = 0;
                    Action::SelectIntegration(name.clone())
                }
                None => {
                    self.push_toast(texts::no_integrations(), ToastKind::Info);
                    Action::None
                }
            },
            _ => Action::None,
        }
    }

    fn on_fields_key(&mut self, key: KeyEvent) -> Action {
        if self.config.state() != ConfigState::Configuration {
            return Action::None;
        }
        let count = self.config.config().len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.field_idx = self.field_idx.saturating_sub(1);
                Action::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.field_idx + 1 < count {
                    self.field_idx += 1;
                }
                Action::None
            }
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some((key, label, value)) = self.selected_field() {
                    self.overlay = Overlay::FieldEditor(FieldEditor {
                        key,
                        label,
                        buffer: value,
                    });
                }
                Action::None
            }
            _ => Action::None,
        }
    }

    fn on_bundle_key(&mut self, key: KeyEvent) -> Action {
        let last_line = self.config.bundle_text().lines().count().saturating_sub(1);
        let max_scroll = u16::try_from(last_line).unwrap_or(u16::MAX);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.bundle_scroll = self.bundle_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.bundle_scroll = self.bundle_scroll.saturating_add(1).min(max_scroll);
            }
            KeyCode::PageUp => {
                self.bundle_scroll = self.bundle_scroll.saturating_sub(10);
            }
            KeyCode::PageDown => {
                self.bundle_scroll = self.bundle_scroll.saturating_add(10).min(max_scroll);
            }
            KeyCode::Home => self.bundle_scroll = 0,
            _ => {}
        }
        Action::None
    }

    fn on_overlay_key(&mut self, key: KeyEvent) -> Action {
        let Overlay::FieldEditor(editor) = &mut self.overlay else {
            return Action::None;
        };
        match key.code {
            KeyCode::Esc => {
                self.overlay = Overlay::None;
                Action::None
            }
            KeyCode::Enter => {
                let action = Action::ApplyField {
                    key: editor.key.clone(),
                    value: editor.buffer.clone(),
                };
                self.overlay = Overlay::None;
                action
            }
            KeyCode::Backspace => {
                editor.buffer.pop();
                Action::None
            }
            KeyCode::Char(c) => {
                editor.buffer.push(c);
                Action::None
            }
            _ => Action::None,
        }
    }

    fn on_modal_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('t') | KeyCode::Enter => Action::FetchTicket,
            KeyCode::Esc if self.mounted == Mounted::Config => Action::CloseModal,
            KeyCode::Esc | KeyCode::Char('q') if self.mounted == Mounted::Modal => {
                self.should_quit = true;
                Action::Quit
            }
            _ => Action::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zis::{ConfigRecord, Integration};
    use serde_json::json;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::CONTROL)
    }

    fn app_with_config() -> App {
        let mut app = App::new(Mounted::Config, Some("jira".to_string()));
        app.config.integrations_loaded(Ok(vec![
            Integration { name: "jira".to_string() },
            Integration { name: "slack".to_string() },
        ]));
        let tickets = app.config.select("jira");
        app.config.config_loaded(
            tickets.config_token,
            Ok(ConfigRecord {
                config: serde_json::from_value(json!({"api_url": "https://a.test", "retries": 3}))
                    .expect("config"),
                updated_at: Some("2024-01-05T13:05:00".to_string()),
            }),
        );
        app
    }

    #[test]
    fn enter_selects_the_highlighted_integration() {
        let mut app = app_with_config();
        app.focus = Focus::Integrations;
        app.on_key(key(KeyCode::Down));
        assert_eq!(
            app.on_key(key(KeyCode::Enter)),
            Action::SelectIntegration("slack".to_string())
        );
    }

    #[test]
    fn default_key_is_selectable_without_registry_list() {
        let mut app = App::new(Mounted::Config, Some("jira".to_string()));
        assert_eq!(app.integration_choices(), ["jira"]);
        assert_eq!(
            app.on_key(key(KeyCode::Enter)),
            Action::SelectIntegration("jira".to_string())
        );

        let mut empty = App::new(Mounted::Config, None);
        assert_eq!(empty.on_key(key(KeyCode::Enter)), Action::None);
        assert!(empty.toast.is_some());
    }

    #[test]
    fn cursor_follows_selected_key_after_reload() {
        let mut app = App::new(Mounted::Config, Some("slack".to_string()));
        app.config.integrations_loaded(Ok(vec![
            Integration { name: "jira".to_string() },
            Integration { name: "slack".to_string() },
        ]));
        app.sync_integration_cursor();
        assert_eq!(app.integration_idx, 1);
    }

    #[test]
    fn field_editor_round_trip() {
        let mut app = app_with_config();
        app.focus = Focus::Fields;
        app.on_key(key(KeyCode::Down));
        app.on_key(key(KeyCode::Enter));
        assert!(matches!(
            &app.overlay,
            Overlay::FieldEditor(FieldEditor { key, label, buffer })
                if key == "retries" && label == "Retries" && buffer == "3"
        ));

        app.on_key(key(KeyCode::Backspace));
        app.on_key(key(KeyCode::Char('7')));
        assert_eq!(
            app.on_key(key(KeyCode::Enter)),
            Action::ApplyField {
                key: "retries".to_string(),
                value: "7".to_string()
            }
        );
        assert!(!app.overlay.is_active());
    }

    #[test]
    fn escape_discards_field_edit() {
        let mut app = app_with_config();
        app.focus = Focus::Fields;
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Char('x')));
        assert_eq!(app.on_key(key(KeyCode::Esc)), Action::None);
        assert!(!app.overlay.is_active());
        assert!(!app.should_quit);
    }

    #[test]
    fn fields_are_inert_until_configuration_loads() {
        let mut app = App::new(Mounted::Config, Some("jira".to_string()));
        app.focus = Focus::Fields;
        assert_eq!(app.on_key(key(KeyCode::Enter)), Action::None);
        assert!(!app.overlay.is_active());
    }

    #[test]
    fn global_keys_map_to_actions() {
        let mut app = app_with_config();
        assert_eq!(app.on_key(key(KeyCode::Char('s'))), Action::Save);
        assert_eq!(app.on_key(key(KeyCode::Char('c'))), Action::CopyConfig);
        assert_eq!(app.on_key(key(KeyCode::Char('b'))), Action::CopyBundle);
        assert_eq!(app.on_key(key(KeyCode::Char('m'))), Action::OpenModal);
        assert_eq!(app.on_key(key(KeyCode::Char('r'))), Action::ReloadIntegrations);
        assert_eq!(app.on_key(ctrl(KeyCode::Char('c'))), Action::Quit);
        assert!(app.should_quit);
    }

    #[test]
    fn tab_skips_bundle_before_first_selection() {
        let mut app = App::new(Mounted::Config, None);
        app.on_key(key(KeyCode::Tab));
        assert_eq!(app.focus, Focus::Fields);
        app.on_key(key(KeyCode::Tab));
        assert_eq!(app.focus, Focus::Integrations);

        let mut loaded = app_with_config();
        loaded.focus = Focus::Fields;
        loaded.on_key(key(KeyCode::Tab));
        assert_eq!(loaded.focus, Focus::Bundle);
    }

    #[test]
    fn modal_keys() {
        let mut app = app_with_config();
        app.modal = Some(ModalView::new());
        assert_eq!(app.on_key(key(KeyCode::Char('t'))), Action::FetchTicket);
        assert_eq!(app.on_key(key(KeyCode::Char('s'))), Action::None);
        assert_eq!(app.on_key(key(KeyCode::Esc)), Action::CloseModal);
        assert!(!app.should_quit);

        let mut standalone = App::new(Mounted::Modal, None);
        assert!(standalone.modal.is_some());
        assert_eq!(standalone.on_key(key(KeyCode::Esc)), Action::Quit);
        assert!(standalone.should_quit);
    }

    #[test]
    fn notice_duration_maps_to_ticks() {
        let toast = Toast::from_notice(&HostNotice {
            message: "Copied to clipboard!".to_string(),
            kind: NoticeKind::Success,
            duration_ms: 5000,
        });
        assert_eq!(toast.remaining_ticks, 25);
        assert_eq!(toast.kind, ToastKind::Success);

        let mut app = App::new(Mounted::Config, None);
        app.toast = Some(Toast {
            remaining_ticks: 1,
            ..toast
        });
        app.on_tick();
        assert!(app.toast.is_none());
    }

    #[test]
    fn huge_notice_durations_cap_the_toast() {
        let toast = Toast::from_notice(&HostNotice {
            message: "saved".to_string(),
            kind: NoticeKind::Success,
            duration_ms: u64::MAX / 2,
        });
        assert_eq!(toast.remaining_ticks, u16::MAX);

        let short = Toast::from_notice(&HostNotice {
            message: "saved".to_string(),
            kind: NoticeKind::Warning,
            duration_ms: 0,
        });
        assert_eq!(short.remaining_ticks, 1);
        assert_eq!(short.kind, ToastKind::Warning);
    }

    #[test]
    fn bundle_scroll_stops_at_the_u16_limit() {
        let mut app = App::new(Mounted::Config, Some("jira".to_string()));
        let tickets = app.config.select("jira");
        let lines: Vec<u32> = (0..70_000).collect();
        app.config.bundle_loaded(
            tickets.bundle_token,
            Ok(crate::view::LoadedBundle {
                uuid: "b-1".to_string(),
                document: json!(lines),
            }),
        );
        app.focus = Focus::Bundle;
        app.bundle_scroll = u16::MAX - 3;

        app.on_key(key(KeyCode::PageDown));
        assert_eq!(app.bundle_scroll, u16::MAX);
        app.on_key(key(KeyCode::Down));
        assert_eq!(app.bundle_scroll, u16::MAX);
    }
}
