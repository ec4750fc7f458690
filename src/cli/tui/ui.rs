use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table,
        TableState, Wrap,
    },
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::cli::i18n::texts;
use crate::host::NoticeKind;
use crate::view::{BundleState, ConfigState, ModalView, Mounted};

use super::app::{App, Focus, Overlay, ToastKind};
use super::theme::Theme;

fn pane_border_style(app: &App, pane: Focus, theme: &Theme) -> Style {
    if app.focus == pane && app.modal.is_none() {
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.dim)
    }
}

fn selection_style(theme: &Theme) -> Style {
    if theme.no_color {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
            .fg(Color::Black)
            .bg(theme.accent)
            .add_modifier(Modifier::BOLD)
    }
}

fn pane_block(title: String, style: Style) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(style)
        .title(format!(" {title} "))
}

fn notice_color(kind: NoticeKind, theme: &Theme) -> Color {
    match kind {
        NoticeKind::Success => theme.ok,
        NoticeKind::Warning => theme.warn,
        NoticeKind::Error => theme.err,
    }
}

fn truncate_to_display_width(text: &str, width: u16) -> String {
    let width = width as usize;
    if width == 0 {
        return String::new();
    }

    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }

    if width == 1 {
        return "…".to_string();
    }

    let mut out = String::new();
    let mut used = 0usize;
    for c in text.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used.saturating_add(w) > width.saturating_sub(1) {
            break;
        }
        out.push(c);
        used = used.saturating_add(w);
    }
    out.push('…');
    out
}

pub fn render(frame: &mut Frame<'_>, app: &App, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0], theme);

    match app.mounted {
        Mounted::Config => {
            render_config_body(frame, app, chunks[1], theme);
            if let Some(modal) = &app.modal {
                render_modal(frame, modal, centered_rect(80, 80, chunks[1]), theme);
            }
        }
        Mounted::Modal => {
            if let Some(modal) = &app.modal {
                render_modal(frame, modal, chunks[1], theme);
            }
        }
    }

    render_overlay(frame, app, theme);
    render_footer(frame, app, chunks[2], theme);
}

fn render_header(frame: &mut Frame<'_>, app: &App, area: Rect, theme: &Theme) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let mut location = texts::tui_location(&app.location);
    if let Some(subdomain) = &app.subdomain {
        location.push_str(&format!("  {subdomain}.zendesk.com"));
    }
    let title_style = if theme.no_color {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD)
    };
    let title = Line::from(vec![
        Span::styled(format!(" {}", texts::tui_app_title()), title_style),
        Span::raw("  "),
        Span::styled(location, Style::default().fg(theme.dim)),
    ]);
    frame.render_widget(Paragraph::new(title), rows[0]);

    if !app.greeting.is_empty() {
        frame.render_widget(
            Paragraph::new(format!(" {}", app.greeting)).style(Style::default().fg(theme.dim)),
            rows[1],
        );
    }
}

fn render_config_body(frame: &mut Frame<'_>, app: &App, area: Rect, theme: &Theme) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(0)])
        .split(area);

    render_integrations(frame, app, columns[0], theme);

    if app.config.shows_bundle() {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(columns[1]);
        render_config(frame, app, rows[0], theme);
        render_bundle(frame, app, rows[1], theme);
    } else {
        render_config(frame, app, columns[1], theme);
    }
}

fn render_integrations(frame: &mut Frame<'_>, app: &App, area: Rect, theme: &Theme) {
    let block = pane_block(
        texts::select_integration(),
        pane_border_style(app, Focus::Integrations, theme),
    );
    let choices = app.integration_choices();
    if choices.is_empty() {
        frame.render_widget(
            Paragraph::new(texts::no_integrations())
                .style(Style::default().fg(theme.dim))
                .wrap(Wrap { trim: true })
                .block(block),
            area,
        );
        return;
    }

    let current = app.config.integration_key();
    let inner_width = area.width.saturating_sub(4);
    let items: Vec<ListItem> = choices
        .iter()
        .map(|name| {
            let marker = if Some(name.as_str()) == current { "● " } else { "  " };
            ListItem::new(truncate_to_display_width(
                &format!("{marker}{name}"),
                inner_width,
            ))
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.integration_idx));
    let list = List::new(items)
        .block(block)
        .highlight_style(selection_style(theme));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_config(frame: &mut Frame<'_>, app: &App, area: Rect, theme: &Theme) {
    let block = pane_block(
        texts::config_title(),
        pane_border_style(app, Focus::Fields, theme),
    );
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let message = |text: String, style: Style| {
        Paragraph::new(text).style(style).wrap(Wrap { trim: true })
    };

    match app.config.state() {
        ConfigState::Initial => {
            frame.render_widget(
                message(texts::config_initial_hint(), Style::default().fg(theme.dim)),
                inner,
            );
        }
        ConfigState::Loading => {
            frame.render_widget(
                message(texts::loading(), Style::default().fg(theme.accent))
                    .alignment(Alignment::Center),
                inner,
            );
        }
        ConfigState::Error => {
            frame.render_widget(
                message(texts::config_load_error(), Style::default().fg(theme.warn)),
                inner,
            );
        }
        ConfigState::Configuration => render_config_form(frame, app, inner, theme),
    }
}

fn render_config_form(frame: &mut Frame<'_>, app: &App, area: Rect, theme: &Theme) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let label = Style::default().add_modifier(Modifier::BOLD);
    let mut info = Vec::new();
    if app.config.last_updated_at().is_some() {
        info.push(Line::from(vec![
            Span::styled(format!("{}: ", texts::integration_key_label()), label),
            Span::raw(app.config.integration_key().unwrap_or_default().to_string()),
        ]));
        info.push(Line::from(vec![
            Span::styled(format!("{}: ", texts::last_updated_label()), label),
            Span::raw(app.config.formatted_last_updated()),
        ]));
    }
    frame.render_widget(Paragraph::new(info), rows[0]);

    let fields = app.config.fields();
    if fields.is_empty() {
        frame.render_widget(
            Paragraph::new(texts::no_fields()).style(Style::default().fg(theme.dim)),
            rows[1],
        );
    } else {
        let label_width = fields
            .iter()
            .map(|(_, label, _)| UnicodeWidthStr::width(label.as_str()))
            .max()
            .unwrap_or(0)
            .min(32) as u16;
        let value_width = rows[1].width.saturating_sub(label_width + 2);
        let table_rows = fields.iter().map(|(_, label, value)| {
            Row::new(vec![
                Cell::from(truncate_to_display_width(label, label_width)),
                Cell::from(truncate_to_display_width(value, value_width)),
            ])
        });
        let table = Table::new(
            table_rows,
            [Constraint::Length(label_width), Constraint::Min(0)],
        )
        .header(
            Row::new(vec![texts::column_field(), texts::column_value()])
                .style(Style::default().fg(theme.dim)),
        )
        .column_spacing(2)
        .row_highlight_style(if app.focus == Focus::Fields {
            selection_style(theme)
        } else {
            Style::default()
        });
        let mut state = TableState::default();
        state.select(Some(app.field_idx));
        frame.render_stateful_widget(table, rows[1], &mut state);
    }

    let status = if app.config.is_form_submit_loading() {
        Line::from(Span::styled(
            texts::saving(),
            Style::default().fg(theme.accent),
        ))
    } else if let Some(alert) = app.config.alert() {
        Line::from(Span::styled(
            alert.message.clone(),
            Style::default().fg(notice_color(alert.kind, theme)),
        ))
    } else {
        Line::default()
    };
    frame.render_widget(Paragraph::new(status), rows[2]);
}

fn render_bundle(frame: &mut Frame<'_>, app: &App, area: Rect, theme: &Theme) {
    let mut title = texts::bundle_title();
    if let Some(bundle) = app.config.bundle() {
        if app.config.bundle_state() == BundleState::Available {
            title.push_str(&format!(" · {}", bundle.uuid));
        }
    }
    let block = pane_block(title, pane_border_style(app, Focus::Bundle, theme));

    let paragraph = match app.config.bundle_state() {
        BundleState::Initial => Paragraph::new(""),
        BundleState::Loading => Paragraph::new(texts::loading())
            .style(Style::default().fg(theme.accent))
            .alignment(Alignment::Center),
        BundleState::Error => Paragraph::new(texts::bundle_load_error())
            .style(Style::default().fg(theme.warn))
            .wrap(Wrap { trim: true }),
        BundleState::Available => {
            Paragraph::new(app.config.bundle_text()).scroll((app.bundle_scroll, 0))
        }
    };
    frame.render_widget(paragraph.block(block), area);
}

fn render_modal(frame: &mut Frame<'_>, modal: &ModalView, area: Rect, theme: &Theme) {
    frame.render_widget(Clear, area);
    let block = pane_block(texts::modal_title(), Style::default().fg(theme.accent));

    let mut lines = Vec::new();
    if modal.has_data() {
        lines.push(Line::from(texts::modal_sample_data(&modal.sample_data_text())));
    } else {
        lines.push(Line::from(Span::styled(
            texts::modal_waiting(),
            Style::default().fg(theme.dim),
        )));
    }
    lines.push(Line::default());
    lines.push(Line::from(vec![
        Span::styled("[t] ", Style::default().fg(theme.dim)),
        Span::styled(
            texts::modal_get_ticket(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ]));
    lines.push(Line::default());

    if modal.is_ticket_fetch_loading() {
        lines.push(Line::from(Span::styled(
            texts::loading(),
            Style::default().fg(theme.accent),
        )));
    } else if modal.ticket_error() {
        lines.push(Line::from(Span::styled(
            texts::modal_ticket_error(),
            Style::default().fg(theme.warn),
        )));
    } else if let Some((id, subject)) = modal.ticket_summary() {
        lines.push(Line::from(Span::styled(
            texts::modal_ticket_fetched(&id, &subject),
            Style::default().fg(theme.ok),
        )));
    }

    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
        area,
    );
}

fn render_overlay(frame: &mut Frame<'_>, app: &App, theme: &Theme) {
    match &app.overlay {
        Overlay::None => {}
        Overlay::FieldEditor(editor) => {
            let area = centered_rect_fixed(64, 3, frame.area());
            frame.render_widget(Clear, area);
            let block = pane_block(
                texts::edit_field(&editor.label),
                Style::default().fg(theme.accent),
            );
            let visible = truncate_tail(&editor.buffer, area.width.saturating_sub(3));
            frame.render_widget(Paragraph::new(format!("{visible}▏")).block(block), area);
        }
    }
}

/// Keeps the end of `text` visible, which is where the cursor sits.
fn truncate_tail(text: &str, width: u16) -> String {
    let width = width as usize;
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    let mut out: Vec<char> = Vec::new();
    let mut used = 0usize;
    for c in text.chars().rev() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out.into_iter().rev().collect()
}

fn render_footer(frame: &mut Frame<'_>, app: &App, area: Rect, theme: &Theme) {
    let hint = if app.overlay.is_active() {
        texts::tui_hint_editor()
    } else if app.modal.is_some() {
        texts::tui_hint_modal()
    } else {
        texts::tui_hint_config()
    };

    let mut spans = Vec::new();
    if let Some(toast) = &app.toast {
        let color = match toast.kind {
            ToastKind::Info => theme.accent,
            ToastKind::Success => theme.ok,
            ToastKind::Warning => theme.warn,
            ToastKind::Error => theme.err,
        };
        spans.push(Span::styled(
            format!(" {} ", toast.message),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(
        truncate_to_display_width(&hint, area.width),
        Style::default().fg(theme.dim),
    ));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let width = width.min(r.width);
    let height = height.min(r.height);

    Rect {
        x: r.x + r.width.saturating_sub(width) / 2,
        y: r.y + r.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};
    use serde_json::json;
    use serial_test::serial;

    use crate::cli::tui::app::{App, FieldEditor, Focus, Overlay, Toast, ToastKind};
    use crate::cli::tui::theme::theme;
    use crate::error::AppError;
    use crate::view::{LoadedBundle, ModalView, Mounted};
    use crate::zis::{ConfigRecord, Integration};

    fn render(app: &App) -> Buffer {
        let backend = TestBackend::new(120, 40);
        let mut terminal = Terminal::new(backend).expect("terminal created");
        terminal
            .draw(|f| super::render(f, app, &theme(true)))
            .expect("draw ok");
        terminal.backend().buffer().clone()
    }

    fn all_text(buf: &Buffer) -> String {
        let mut all = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                all.push_str(buf[(x, y)].symbol());
            }
            all.push('\n');
        }
        all
    }

    fn loaded_app() -> App {
        let mut app = App::new(Mounted::Config, Some("jira".to_string()));
        app.location = "ticket_sidebar".to_string();
        app.config.integrations_loaded(Ok(vec![
            Integration { name: "jira".to_string() },
            Integration { name: "slack".to_string() },
        ]));
        let tickets = app.config.select("jira");
        app.config.config_loaded(
            tickets.config_token,
            Ok(ConfigRecord {
                config: serde_json::from_value(json!({"api_url": "https://a.test", "max_retries": 3}))
                    .expect("config"),
                updated_at: Some("2024-01-05T13:05:00".to_string()),
            }),
        );
        app.config.bundle_loaded(
            tickets.bundle_token,
            Ok(LoadedBundle {
                uuid: "b-1".to_string(),
                document: json!({"zis_template_version": "2019-10-14"}),
            }),
        );
        app
    }

    #[test]
    #[serial]
    fn initial_state_hides_bundle() {
        let mut app = App::new(Mounted::Config, None);
        app.location = "ticket_sidebar".to_string();
        let text = all_text(&render(&app));
        assert!(text.contains("ZIS Configuration"));
        assert!(text.contains("Pick an integration"));
        assert!(text.contains("Location: ticket_sidebar"));
        assert!(!text.contains("ZIS Bundle"));
    }

    #[test]
    #[serial]
    fn configuration_state_lists_formatted_fields() {
        let app = loaded_app();
        let text = all_text(&render(&app));
        assert!(text.contains("ZIS Integration Key: jira"));
        assert!(text.contains("Last Updated At: 05 Jan 2024, 1:05 PM"));
        assert!(text.contains("Api Url"));
        assert!(text.contains("Max Retries"));
        assert!(text.contains("https://a.test"));
        assert!(text.contains("ZIS Bundle · b-1"));
        assert!(text.contains("\"zis_template_version\": \"2019-10-14\""));
    }

    #[test]
    #[serial]
    fn error_states_show_warnings_per_section() {
        let mut app = App::new(Mounted::Config, None);
        let tickets = app.config.select("jira");
        app.config
            .config_loaded(tickets.config_token, Err(AppError::Network("down".to_string())));
        let text = all_text(&render(&app));
        assert!(text.contains("ZIS Configuration could not be loaded or found."));
        assert!(text.contains("Loading..."), "bundle still loading");

        app.config.bundle_loaded(
            tickets.bundle_token,
            Err(AppError::malformed("bundles list is empty")),
        );
        let text = all_text(&render(&app));
        assert!(text.contains("ZIS Bundle could not be loaded or found."));
    }

    #[test]
    #[serial]
    fn save_alert_and_toast_render() {
        let mut app = loaded_app();
        app.config.begin_save().expect("save");
        assert!(all_text(&render(&app)).contains("Saving..."));

        app.config.finish_save(Ok(()));
        app.toast = Some(Toast::new("Copied to clipboard!", ToastKind::Success));
        let text = all_text(&render(&app));
        assert!(text.contains("Config updated successfully!"));
        assert!(text.contains("Copied to clipboard!"));
    }

    #[test]
    #[serial]
    fn field_editor_overlay_shows_label_and_buffer() {
        let mut app = loaded_app();
        app.focus = Focus::Fields;
        app.overlay = Overlay::FieldEditor(FieldEditor {
            key: "api_url".to_string(),
            label: "Api Url".to_string(),
            buffer: "https://b.test".to_string(),
        });
        let text = all_text(&render(&app));
        assert!(text.contains("Edit Api Url"));
        assert!(text.contains("https://b.test▏"));
        assert!(text.contains("Enter apply"));
    }

    #[test]
    #[serial]
    fn modal_shows_forwarded_data_and_ticket() {
        let mut app = loaded_app();
        let mut modal = ModalView::new();
        let text = all_text(&render(&{
            let mut waiting = App::new(Mounted::Modal, None);
            waiting.location = "modal".to_string();
            waiting
        }));
        assert!(text.contains("Waiting for data from the sidebar..."));

        modal.receive_data(&json!({"someSampleData": "hi there", "sidebarContext": null}));
        modal.begin_ticket_fetch();
        modal.ticket_loaded(Ok(json!({"id": 7, "subject": "Help"})));
        app.modal = Some(modal);
        let text = all_text(&render(&app));
        assert!(text.contains("Data from sidebar : hi there"));
        assert!(text.contains("Get Ticket Details from Sidebar"));
        assert!(text.contains("Ticket #7: Help"));
    }

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(super::truncate_to_display_width("abcdef", 4), "abc…");
        assert_eq!(super::truncate_to_display_width("abc", 4), "abc");
        assert_eq!(super::truncate_tail("abcdef", 4), "…def");
    }
}
