use clap::Subcommand;

use crate::cli::i18n::texts;
use crate::cli::ui::{create_table, highlight, mask_secret, success, warning};
use crate::error::AppError;
use crate::settings::{get_settings, update_settings, AppSettings, SettingsOverrides};

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Show persisted settings
    Show,
    /// Show the settings file path
    Path,
    /// Persist the global connection flags (--subdomain, --email, ...)
    Set {
        /// Mark the account as production again after --sandbox
        #[arg(long)]
        production: bool,
    },
}

pub fn execute(cmd: SettingsCommand, overrides: &SettingsOverrides) -> Result<(), AppError> {
    match cmd {
        SettingsCommand::Show => show_settings(),
        SettingsCommand::Path => {
            println!("{}", AppSettings::settings_path().display());
            Ok(())
        }
        SettingsCommand::Set { production } => set_settings(overrides, production),
    }
}

fn show_settings() -> Result<(), AppError> {
    let settings = get_settings();
    let not_set = texts::not_set();
    let or_not_set = |v: &Option<String>| v.clone().unwrap_or_else(|| not_set.clone());

    let mut table = create_table();
    table.set_header(vec![texts::column_field(), texts::column_value()]);
    table.add_row(vec!["subdomain".to_string(), or_not_set(&settings.subdomain)]);
    table.add_row(vec!["email".to_string(), or_not_set(&settings.email)]);
    table.add_row(vec![
        "apiToken".to_string(),
        settings
            .api_token
            .as_deref()
            .map(mask_secret)
            .unwrap_or_else(|| not_set.clone()),
    ]);
    table.add_row(vec!["baseUrl".to_string(), or_not_set(&settings.base_url)]);
    table.add_row(vec![
        "isProduction".to_string(),
        settings.is_production.to_string(),
    ]);
    table.add_row(vec![
        "zisIntegrationKey".to_string(),
        or_not_set(&settings.zis_integration_key),
    ]);
    table.add_row(vec!["locale".to_string(), or_not_set(&settings.locale)]);
    table.add_row(vec![
        "ticketId".to_string(),
        settings
            .ticket_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| not_set.clone()),
    ]);
    table.add_row(vec![
        "timeoutSecs".to_string(),
        settings.timeout_secs.to_string(),
    ]);

    println!("{}", highlight(&AppSettings::settings_path().display().to_string()));
    println!("{table}");
    if !settings.has_credentials() {
        println!("{}", warning("email/apiToken missing: API calls will be rejected."));
    }
    Ok(())
}

fn set_settings(overrides: &SettingsOverrides, production: bool) -> Result<(), AppError> {
    let mut settings = get_settings();
    settings.apply_overrides(overrides);
    if production {
        settings.is_production = true;
    }
    update_settings(settings)?;

    let path = AppSettings::settings_path();
    println!("{}", success(&texts::settings_saved(&path.display().to_string())));
    Ok(())
}
