//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

pub fn handle(
    args: &ConfigArgs,
    global: &GlobalOpts,
    loaded: Result<Config, CliError>,
) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = loaded?;
            let text = output::render_single(global.output, &cfg, |c| {
                config::to_toml(c).unwrap_or_else(|e| format!("# failed to render config: {e}"))
            })?;
            output::print_output(text.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::active_path(global).display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = config::active_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists { path });
            }
            config::save_config(&Config::default(), &path)?;
            tracing::info!(path = %path.display(), "wrote default config");
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }
    }
}
