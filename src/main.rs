use clap::Parser;
use std::process;
use zis_config_lib::cli::{commands, Cli, Commands};
use zis_config_lib::AppError;

fn main() {
    let cli = Cli::parse();

    // 终端 UI 独占屏幕，默认只输出错误日志
    let log_level = if cli.verbose { "debug" } else { "error" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let overrides = cli.overrides();
    let settings = zis_config_lib::effective_settings(&overrides);
    if let Some(locale) = settings.locale.as_deref() {
        zis_config_lib::cli::i18n::set_locale(locale);
    }

    match cli.command {
        None | Some(Commands::Ui) => commands::ui::execute(&overrides, cli.location),
        Some(Commands::Integrations) => commands::integrations::execute(&overrides, cli.location),
        Some(Commands::Config(cmd)) => commands::config::execute(cmd, &overrides, cli.location),
        Some(Commands::Bundle(cmd)) => commands::bundle::execute(cmd, &overrides, cli.location),
        Some(Commands::Settings(cmd)) => commands::settings::execute(cmd, &overrides),
        Some(Commands::Completions { shell }) => {
            zis_config_lib::cli::generate_completions(shell);
            Ok(())
        }
    }
}
