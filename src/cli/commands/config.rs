use clap::Subcommand;
use inquire::{Confirm, Text};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::i18n::texts;
use crate::cli::ui::{create_table, dim, highlight, info, spinner, success, warning};
use crate::cli::Location;
use crate::error::AppError;
use crate::host::NoticeKind;
use crate::settings::SettingsOverrides;
use crate::view::{display_value, ConfigState, ConfigView};
use crate::zis::ConfigMap;

use super::{connect, Connection};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show an integration's configuration
    Show {
        /// Integration key (defaults to the configured one)
        key: Option<String>,
    },
    /// Update fields and save the whole configuration
    Set {
        /// Integration key
        key: String,
        /// Assignments in `field=value` form
        #[arg(required = true, value_name = "FIELD=VALUE")]
        assignments: Vec<String>,
    },
    /// Edit fields interactively
    Edit {
        /// Integration key (defaults to the configured one)
        key: Option<String>,
        /// Edit the configuration as JSON in $EDITOR
        #[arg(long)]
        editor: bool,
        /// Save without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Export the configuration as JSON
    Export {
        /// Integration key
        key: String,
        /// Output file (stdout when omitted)
        file: Option<PathBuf>,
    },
}

pub fn execute(
    cmd: ConfigCommand,
    overrides: &SettingsOverrides,
    location: Location,
) -> Result<(), AppError> {
    match cmd {
        ConfigCommand::Show { key } => show_config(key.as_deref(), overrides, location),
        ConfigCommand::Set { key, assignments } => {
            set_config(&key, &assignments, overrides, location)
        }
        ConfigCommand::Edit { key, editor, yes } => {
            edit_config(key.as_deref(), editor, yes, overrides, location)
        }
        ConfigCommand::Export { key, file } => {
            export_config(&key, file.as_deref(), overrides, location)
        }
    }
}

/// Runs the same select/load transitions the terminal UI does, but
/// surfaces the failure instead of parking the view in its error state.
fn load_view(conn: &Connection, key: &str) -> Result<ConfigView, AppError> {
    let mut view = ConfigView::new(Some(key.to_string()));
    let tickets = view.select(key);

    let pb = spinner(texts::fetching(key));
    let result = conn.block_on(conn.session.bridge.get_zis_config(key));
    pb.finish_and_clear();

    let record = result?;
    view.config_loaded(tickets.config_token, Ok(record));
    if view.state() != ConfigState::Configuration {
        return Err(AppError::Message(texts::config_load_error()));
    }
    Ok(view)
}

fn save_view(conn: &Connection, view: &mut ConfigView) -> Result<(), AppError> {
    let Some(request) = view.begin_save() else {
        return Err(AppError::Message(texts::save_busy()));
    };

    let pb = spinner(texts::saving_key(&request.integration_key));
    let result = conn
        .block_on(
            conn.session
                .bridge
                .update_zis_config(&request.integration_key, &request.config),
        )
        .map(|_| ());
    pb.finish_and_clear();

    let detail = result.as_ref().err().map(|e| e.to_string());
    let alert = view.finish_save(result);
    match alert.kind {
        NoticeKind::Success => {
            println!("{}", success(&alert.message));
            Ok(())
        }
        _ => {
            eprintln!("{}", warning(&alert.message));
            Err(AppError::Message(detail.unwrap_or(alert.message)))
        }
    }
}

fn print_view(view: &ConfigView) {
    println!(
        "{} {}",
        texts::integration_key_label(),
        highlight(view.integration_key().unwrap_or_default())
    );
    println!(
        "{} {}",
        texts::last_updated_label(),
        dim(&view.formatted_last_updated())
    );
    println!();

    let fields = view.fields();
    if fields.is_empty() {
        println!("{}", info(&texts::no_fields()));
        return;
    }

    let mut table = create_table();
    table.set_header(vec![
        texts::column_name(),
        texts::column_field(),
        texts::column_value(),
    ]);
    for (key, label, value) in fields {
        table.add_row(vec![label, key, value]);
    }
    println!("{table}");
}

fn show_config(
    key: Option<&str>,
    overrides: &SettingsOverrides,
    location: Location,
) -> Result<(), AppError> {
    let conn = connect(overrides, location)?;
    let key = conn.integration_key(key)?;
    let view = load_view(&conn, &key)?;
    print_view(&view);
    Ok(())
}

fn set_config(
    key: &str,
    assignments: &[String],
    overrides: &SettingsOverrides,
    location: Location,
) -> Result<(), AppError> {
    let parsed = parse_assignments(assignments)?;

    let conn = connect(overrides, location)?;
    let mut view = load_view(&conn, key)?;
    for (field, value) in &parsed {
        view.set_field(field, value)?;
    }
    save_view(&conn, &mut view)
}

fn edit_config(
    key: Option<&str>,
    use_editor: bool,
    yes: bool,
    overrides: &SettingsOverrides,
    location: Location,
) -> Result<(), AppError> {
    let conn = connect(overrides, location)?;
    let key = conn.integration_key(key)?;
    let mut view = load_view(&conn, &key)?;
    let before = view.config().clone();

    if use_editor {
        edit_in_editor(&mut view)?;
    } else {
        crate::cli::ui::apply_inquire_theme();
        edit_with_prompts(&mut view)?;
    }

    let changed = changed_fields(&before, view.config());
    if changed == 0 {
        println!("{}", info(&texts::no_changes()));
        return Ok(());
    }

    if !yes {
        let confirmed = Confirm::new(&texts::confirm_save(changed, &key))
            .with_default(true)
            .prompt()
            .map_err(|e| AppError::Message(e.to_string()))?;
        if !confirmed {
            println!("{}", info(&texts::cancelled()));
            return Ok(());
        }
    }

    save_view(&conn, &mut view)
}

fn edit_with_prompts(view: &mut ConfigView) -> Result<(), AppError> {
    for (key, label, value) in view.fields() {
        let answer = Text::new(&texts::edit_prompt(&label))
            .with_default(&value)
            .with_help_message(&key)
            .prompt()
            .map_err(|e| AppError::Message(e.to_string()))?;
        if answer != value {
            view.set_field(&key, &answer)?;
        }
    }
    Ok(())
}

fn edit_in_editor(view: &mut ConfigView) -> Result<(), AppError> {
    let original = view.config_json()?;
    let edited = edit::edit(&original).map_err(|e| AppError::IoContext {
        context: "failed to run editor".to_string(),
        source: e,
    })?;
    let updated: ConfigMap = serde_json::from_str(&edited)
        .map_err(|e| AppError::InvalidInput(format!("edited configuration is not valid JSON: {e}")))?;

    for (key, value) in &updated {
        if view.config().get(key) != Some(value) {
            view.set_field(key, &display_value(value))?;
        }
    }
    Ok(())
}

fn export_config(
    key: &str,
    file: Option<&Path>,
    overrides: &SettingsOverrides,
    location: Location,
) -> Result<(), AppError> {
    let conn = connect(overrides, location)?;
    let view = load_view(&conn, key)?;
    let json = view.config_json()?;

    match file {
        Some(path) => {
            fs::write(path, format!("{json}\n")).map_err(|e| AppError::io(path, e))?;
            println!("{}", success(&texts::exported_to(&path.display().to_string())));
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// `field=value` pairs; the value may itself contain `=`.
fn parse_assignments(raw: &[String]) -> Result<Vec<(String, String)>, AppError> {
    raw.iter()
        .map(|item| {
            let (field, value) = item
                .split_once('=')
                .ok_or_else(|| AppError::InvalidInput(texts::invalid_assignment(item)))?;
            let field = field.trim();
            if field.is_empty() {
                return Err(AppError::InvalidInput(texts::invalid_assignment(item)));
            }
            Ok((field.to_string(), value.to_string()))
        })
        .collect()
}

fn changed_fields(before: &ConfigMap, after: &ConfigMap) -> usize {
    after
        .iter()
        .filter(|(key, value)| before.get(*key) != Some(*value))
        .count()
}
