use crate::cli::i18n::texts;
use crate::cli::ui::{create_table, highlight, info, spinner};
use crate::cli::Location;
use crate::error::AppError;
use crate::settings::SettingsOverrides;

use super::connect;

pub fn execute(overrides: &SettingsOverrides, location: Location) -> Result<(), AppError> {
    let conn = connect(overrides, location)?;
    let default_key = conn.integration_key(None).ok();

    let pb = spinner(texts::fetching("integrations"));
    let result = conn.block_on(conn.session.bridge.get_integrations());
    pb.finish_and_clear();
    let integrations = result?;

    if integrations.is_empty() {
        println!("{}", info(&texts::no_integrations()));
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["", &texts::column_name()]);
    for integration in &integrations {
        let is_default = default_key.as_deref() == Some(integration.name.as_str());
        let marker = if is_default { "*" } else { "" };
        table.add_row(vec![marker.to_string(), integration.name.clone()]);
    }
    println!("{table}");

    if let Some(key) = default_key {
        println!("{} {}", texts::integration_key_label(), highlight(&key));
    }
    Ok(())
}
