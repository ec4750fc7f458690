use clap::Subcommand;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::i18n::texts;
use crate::cli::ui::{spinner, success};
use crate::cli::Location;
use crate::error::AppError;
use crate::settings::SettingsOverrides;
use crate::zis;

use super::connect;

#[derive(Subcommand)]
pub enum BundleCommand {
    /// Print the integration's first bundle as JSON
    Show {
        /// Integration key (defaults to the configured one)
        key: Option<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn execute(
    cmd: BundleCommand,
    overrides: &SettingsOverrides,
    location: Location,
) -> Result<(), AppError> {
    match cmd {
        BundleCommand::Show { key, output } => {
            show_bundle(key.as_deref(), output.as_deref(), overrides, location)
        }
    }
}

fn show_bundle(
    key: Option<&str>,
    output: Option<&Path>,
    overrides: &SettingsOverrides,
    location: Location,
) -> Result<(), AppError> {
    let conn = connect(overrides, location)?;
    let key = conn.integration_key(key)?;

    let pb = spinner(texts::fetching(&texts::bundle_title()));
    let result = conn.block_on(conn.session.bridge.load_bundle(&key));
    pb.finish_and_clear();
    let (descriptor, document) = result?;
    log::debug!("bundle {} for {key}", descriptor.uuid);

    let text = zis::pretty_json(&document)?;
    match output {
        Some(path) => {
            fs::write(path, format!("{text}\n")).map_err(|e| AppError::io(path, e))?;
            println!("{}", success(&texts::exported_to(&path.display().to_string())));
        }
        None => println!("{text}"),
    }
    Ok(())
}
