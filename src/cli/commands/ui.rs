use std::io::IsTerminal;
use std::sync::mpsc;

use crate::cli::i18n::texts;
use crate::cli::{tui, Location};
use crate::error::AppError;
use crate::settings::SettingsOverrides;

use super::connect;

pub fn execute(overrides: &SettingsOverrides, location: Location) -> Result<(), AppError> {
    if !std::io::stdout().is_terminal() || !std::io::stdin().is_terminal() {
        return Err(AppError::Message(texts::requires_tty()));
    }

    let conn = connect(overrides, location)?;
    let (notice_tx, notice_rx) = mpsc::channel();
    conn.host.set_notice_sender(notice_tx);

    let default_key = conn.integration_key(None).ok();
    let session = conn.session;
    tui::run(session, Some(notice_rx), default_key)?;

    println!("{}", texts::goodbye());
    Ok(())
}
