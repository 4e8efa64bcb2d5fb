use std::path::PathBuf;

pub const DAEMON_EXECUTABLE_NAME: &str = "dayscribe-daemon";

/// Path of the logger executable installed next to `path`.
pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name(DAEMON_EXECUTABLE_NAME);
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}
