use anyhow::{anyhow, Result};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::instrument;
use xcb::{
    x::{self, Atom, GetProperty, InternAtom, Window, ATOM_ANY},
    Connection,
};

use super::{app_name_from_executable, ForegroundApp};

fn intern_atom(conn: &Connection, name: &[u8]) -> Result<Atom> {
    let reply = conn.wait_for_reply(conn.send_request(&InternAtom {
        only_if_exists: false,
        name,
    }))?;
    Ok(reply.atom())
}

fn get_active_window(conn: &Connection, root: Window, active_window_atom: Atom) -> Result<Window> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window: root,
        property: active_window_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1,
    }))?;
    result
        .value::<Window>()
        .first()
        .copied()
        .ok_or_else(|| anyhow!("The window manager didn't report an active window"))
}

fn get_pid(conn: &Connection, window: Window, pid_atom: Atom) -> Result<Option<u32>> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window,
        property: pid_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1,
    }))?;
    Ok(result.value::<u32>().first().copied())
}

fn get_class(conn: &Connection, window: Window) -> Result<Option<String>> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window,
        property: x::ATOM_WM_CLASS,
        r#type: x::ATOM_STRING,
        long_offset: 0,
        long_length: 256,
    }))?;
    // WM_CLASS holds two null separated strings: instance and class.
    Ok(result
        .value::<u8>()
        .split(|b| *b == 0)
        .filter(|v| !v.is_empty())
        .nth(1)
        .map(|v| String::from_utf8_lossy(v).to_string()))
}

/// Resolves the focused application through `_NET_ACTIVE_WINDOW` and `_NET_WM_PID`, falling
/// back to `WM_CLASS` for clients that don't advertise their pid.
pub struct X11ForegroundApp {
    connection: Connection,
    preferred_screen: usize,
    active_window_atom: Atom,
    pid_atom: Atom,
    system: System,
}

impl X11ForegroundApp {
    pub fn new() -> Result<Self> {
        let (connection, preferred_screen) = xcb::Connection::connect(None)?;
        let active_window_atom = intern_atom(&connection, b"_NET_ACTIVE_WINDOW")?;
        let pid_atom = intern_atom(&connection, b"_NET_WM_PID")?;
        Ok(Self {
            connection,
            preferred_screen: preferred_screen.max(0) as usize,
            active_window_atom,
            pid_atom,
            system: System::new(),
        })
    }

    fn process_name(&mut self, pid: u32) -> Option<String> {
        let pid = Pid::from_u32(pid);
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_exe(sysinfo::UpdateKind::OnlyIfNotSet),
        );
        let process = self.system.process(pid)?;
        process
            .exe()
            .and_then(|v| v.to_str())
            .map(app_name_from_executable)
            .or_else(|| Some(process.name().to_string_lossy().to_string()))
    }
}

impl ForegroundApp for X11ForegroundApp {
    #[instrument(skip(self))]
    fn foreground_app(&mut self) -> Result<String> {
        let root = self
            .connection
            .get_setup()
            .roots()
            .nth(self.preferred_screen)
            .ok_or_else(|| anyhow!("Screen {} doesn't exist", self.preferred_screen))?
            .root();

        let active_window = get_active_window(&self.connection, root, self.active_window_atom)?;

        if let Some(name) = get_pid(&self.connection, active_window, self.pid_atom)?
            .and_then(|pid| self.process_name(pid))
        {
            return Ok(name);
        }

        get_class(&self.connection, active_window)?
            .ok_or_else(|| anyhow!("Active window {active_window:?} has neither a pid nor a class"))
    }
}
