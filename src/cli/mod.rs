pub mod daemon_path;
pub mod process;
pub mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use process::{kill_previous_servers, restart_server};
use report::{process_report_command, ReportCommand};
use tracing::{info, level_filters::LevelFilter};

use crate::{
    config::AppConfig,
    daemon::start_daemon,
    report::google_auth::authorize,
    utils::{
        dir::resolve_application_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

/// Template installed by `init` when the application directory has none.
pub const BUNDLED_TEMPLATE: &str = include_str!("../../templates/report_prompt_template.txt");

#[derive(Parser, Debug)]
#[command(name = "Dayscribe", version, long_about = None)]
#[command(about = "Records your day and turns it into a daily report prompt", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts the activity logger in the background")]
    Init {},
    #[command(
        about = "Run the activity logger directly in current console. Used for debugging"
    )]
    Serve {},
    #[command(about = "Stop currently running activity logger.")]
    Stop {},
    #[command(about = "Authorize read access to Google Calendar")]
    Authorize {},
    #[command(about = "Build the report prompt for a day and optionally submit it")]
    Report {
        #[command(flatten)]
        command: ReportCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = resolve_application_path(args.dir)?;
    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir.join("logs"), logging_level, args.log)?;

    let config = AppConfig::load(&app_dir)?;

    match args.commands {
        Commands::Init {} => {
            install_template(&config.report.template_path(&app_dir))?;
            restart_server(&app_dir)?;
            Ok(())
        }
        Commands::Stop {} => {
            let stopped = kill_previous_servers()?;
            println!("Stopped {stopped} running loggers");
            Ok(())
        }
        Commands::Serve {} => start_daemon(app_dir, config).await,
        Commands::Authorize {} => {
            let token_path = config.calendar.token_path(&app_dir);
            authorize(&config.calendar.credentials_path(&app_dir), &token_path)
                .await
                .context("Calendar authorization failed")?;
            println!("Calendar authorized, token saved to {}", token_path.display());
            Ok(())
        }
        Commands::Report { command } => process_report_command(command, &app_dir, &config).await,
    }
}

/// Writes [BUNDLED_TEMPLATE] to `path` unless something is already there. Returns whether it
/// wrote anything.
pub fn install_template(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, BUNDLED_TEMPLATE)
        .with_context(|| format!("Failed to install report template into {path:?}"))?;
    info!("Installed report template into {path:?}");
    Ok(true)
}
