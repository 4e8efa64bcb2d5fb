// This runs daemon on windows without creating a console. Disable during development to see
// stdout.
#![windows_subsystem = "windows"]

use std::env::args;

use anyhow::Result;
use clap::Parser;
use dayscribe::{
    config::AppConfig,
    daemon::{args::DaemonArgs, start_daemon},
    utils::{
        dir::resolve_application_path,
        logging::{enable_logging, DAEMON_PREFIX},
        runtime::single_thread_runtime,
    },
};

fn main() -> Result<()> {
    run_service(args().collect::<Vec<_>>())
}

fn run_service(command_args: Vec<String>) -> Result<()> {
    let args = DaemonArgs::parse_from(&command_args);
    // Resolved before detaching, the daemon changes its working directory.
    let app_dir = resolve_application_path(args.dir.clone())?;

    if !args.force {
        #[cfg(feature = "win")]
        {
            use std::os::windows::process::CommandExt;
            use windows::Win32::System::Threading::DETACHED_PROCESS;

            println!("Starting detached process");
            let process_name = std::env::current_exe()?;
            let mut command = std::process::Command::new(process_name);
            command.arg("--force").arg("--dir").arg(&app_dir);
            if args.log_console {
                command.arg("--log-console");
            }
            if let Some(level) = args.log {
                command.arg("--log-filter").arg(level.to_string());
            }
            command.creation_flags(DETACHED_PROCESS.0);
            command.stdin(std::process::Stdio::null());
            command.stdout(std::process::Stdio::null());
            command.stderr(std::process::Stdio::null());
            #[allow(clippy::zombie_processes)]
            command.spawn()?;
            println!("Created daemon");
            return Ok(());
        }
        #[cfg(unix)]
        {
            use daemonize::Daemonize;

            let daemonize = Daemonize::new()
                .working_directory(&app_dir)
                .stdout(daemonize::Stdio::devnull())
                .stderr(daemonize::Stdio::devnull())
                .execute();
            match daemonize {
                daemonize::Outcome::Parent(parent) => {
                    parent.map_err(|e| {
                        anyhow::anyhow!("Failed to create daemon on parent side {e:?}")
                    })?;
                    println!("Created daemon");
                    return Ok(());
                }
                daemonize::Outcome::Child(child) => {
                    child.map_err(|e| anyhow::anyhow!("Failed to detach daemon {e:?}"))?;
                }
            }
        }
    }

    run(args, app_dir)
}

fn run(args: DaemonArgs, app_dir: std::path::PathBuf) -> Result<()> {
    enable_logging(
        DAEMON_PREFIX,
        &app_dir.join("logs"),
        args.log,
        args.log_console,
    )?;
    let config = AppConfig::load(&app_dir)?;
    single_thread_runtime()?.block_on(async move { start_daemon(app_dir, config).await })?;
    Ok(())
}
