mod cli;
mod commands;
mod config;
mod error;
mod output;
mod sim;

use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The config file can set the log level and file, so read it first.
    let loaded = config::load(&cli.global);
    let (level, config_log_file) = match &loaded {
        Ok(cfg) => (cfg.log.level.clone(), cfg.log.file.clone()),
        Err(_) => (Config::default().log.level, None),
    };
    let log_file = cli.global.log_file.clone().or(config_log_file);

    let log_guard = match init_tracing(cli.global.verbose, &level, log_file.as_deref()) {
        Ok(guard) => guard,
        Err(err) => exit_with(err),
    };

    let result = run(cli, loaded).await;
    // Flush buffered file logs before the process exits.
    drop(log_guard);
    if let Err(err) = result {
        exit_with(err);
    }
}

fn exit_with(err: CliError) -> ! {
    let code = err.exit_code();
    eprintln!("{:?}", miette::Report::new(err));
    std::process::exit(code);
}

fn init_tracing(
    verbosity: u8,
    default_level: &str,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>, CliError> {
    let filter = match verbosity {
        0 => default_level,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path.file_name().ok_or_else(|| CliError::Validation {
                field: "log file".into(),
                reason: format!("{} has no file name", path.display()),
            })?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            std::fs::create_dir_all(dir)?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn run(cli: Cli, loaded: Result<Config, CliError>) -> Result<(), CliError> {
    match cli.command {
        // Config commands decide for themselves whether they need a
        // readable config file.
        Command::Config(args) => commands::config_cmd::handle(&args, &cli.global, loaded),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "switchstat", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let cfg = loaded?;
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &cfg, &cli.global).await
        }
    }
}
