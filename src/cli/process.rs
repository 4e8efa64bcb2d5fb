use std::{env, path::Path, process::Stdio};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, ProcessRefreshKind, ProcessesToUpdate, Signal, System};
use tracing::info;

use super::daemon_path::to_daemon_path;

/// Terminates every running activity logger. Returns how many were stopped.
pub fn kill_previous_servers() -> Result<usize> {
    let daemon = to_daemon_path(env::current_exe()?);
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't determine own pid {e}"))?;

    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::nothing().with_exe(sysinfo::UpdateKind::OnlyIfNotSet),
    );

    let mut stopped = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| daemon == *v)
            .is_some()
        {
            info!("Stopping logger {pid}");
            // This will forcefully terminate the process on Windows.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            stopped += 1;
        }
    }
    Ok(stopped)
}

/// Stops whatever logger is running and starts a new detached one for `app_dir`.
pub fn restart_server(app_dir: &Path) -> Result<()> {
    kill_previous_servers()?;

    let daemon = to_daemon_path(env::current_exe()?);
    let mut command = std::process::Command::new(&daemon);
    command.arg("--dir").arg(app_dir);
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());

    println!("Starting {daemon:?}");
    // The daemon detaches on its own, so this only waits for the launcher half.
    let status = command
        .status()
        .map_err(|e| anyhow!("Failed to start {daemon:?}: {e}"))?;
    if !status.success() {
        return Err(anyhow!("{daemon:?} exited with {status}"));
    }
    println!("Success");
    Ok(())
}
