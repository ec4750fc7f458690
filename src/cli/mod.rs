use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

pub mod commands;
pub mod i18n;
pub mod tui;
pub mod ui;

use crate::settings::SettingsOverrides;

/// Where the app pretends to be mounted in the agent workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Location {
    #[default]
    Sidebar,
    Modal,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Sidebar => "ticket_sidebar",
            Location::Modal => "modal",
        }
    }
}

#[derive(Parser)]
#[command(
    name = "zis-config",
    version,
    about = "View and edit Zendesk Integration Services configuration",
    long_about = "View and edit the configuration of a ZIS integration, and inspect its bundle.\n\nRun without arguments to open the terminal UI."
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Zendesk subdomain (the `acme` in acme.zendesk.com)
    #[arg(long, global = true, env = "ZENDESK_SUBDOMAIN")]
    pub subdomain: Option<String>,

    /// Agent email used for API token authentication
    #[arg(long, global = true, env = "ZENDESK_EMAIL")]
    pub email: Option<String>,

    /// Zendesk API token
    #[arg(long, global = true, env = "ZENDESK_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Default integration key
    #[arg(long, global = true, env = "ZIS_INTEGRATION_KEY")]
    pub integration_key: Option<String>,

    /// Override the API origin (e.g. http://localhost:4567)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Treat the account as a sandbox
    #[arg(long, global = true)]
    pub sandbox: bool,

    /// Surface the UI is mounted in
    #[arg(long, global = true, value_enum, default_value_t = Location::Sidebar)]
    pub location: Location,

    /// Force a UI locale (e.g. es, en-US)
    #[arg(long, global = true)]
    pub locale: Option<String>,

    /// Ticket the modal reads from
    #[arg(long, global = true)]
    pub ticket_id: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            subdomain: self.subdomain.clone(),
            email: self.email.clone(),
            api_token: self.api_token.clone(),
            base_url: self.base_url.clone(),
            sandbox: self.sandbox,
            integration_key: self.integration_key.clone(),
            locale: self.locale.clone(),
            ticket_id: self.ticket_id,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the terminal UI
    #[command(alias = "interactive")]
    Ui,

    /// List ZIS integrations
    #[command(alias = "ls")]
    Integrations,

    /// Show, edit or export an integration configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Inspect an integration bundle
    #[command(subcommand)]
    Bundle(commands::bundle::BundleCommand),

    /// Manage local settings
    #[command(subcommand)]
    Settings(commands::settings::SettingsCommand),

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Generate shell completions
pub fn generate_completions(shell: Shell) {
    use clap::CommandFactory;
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "zis-config",
            "config",
            "show",
            "jira",
            "--subdomain",
            "acme",
            "--sandbox",
            "--ticket-id",
            "42",
        ])
        .expect("parse");
        let overrides = cli.overrides();
        assert_eq!(overrides.subdomain.as_deref(), Some("acme"));
        assert!(overrides.sandbox);
        assert_eq!(overrides.ticket_id, Some(42));
        assert!(matches!(cli.command, Some(Commands::Config(_))));
    }

    #[test]
    fn no_subcommand_means_ui() {
        let cli = Cli::try_parse_from(["zis-config", "--location", "modal"]).expect("parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.location, Location::Modal);
        assert_eq!(cli.location.as_str(), "modal");
    }
}
