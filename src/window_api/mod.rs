//! Contains logic for finding out which application the user is looking at.
//! [GenericForegroundApp] is the main artifact of this module that abstracts
//! the operations.

#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use std::path::Path;

use anyhow::{anyhow, Result};

/// Intended to serve as a contract windows and linux systems must implement.
#[cfg_attr(test, mockall::automock)]
pub trait ForegroundApp {
    /// Name of the focused application, e.g. `firefox` or `Code`.
    fn foreground_app(&mut self) -> Result<String>;
}

/// Serves as a cross-compatible [ForegroundApp] implementation.
pub struct GenericForegroundApp {
    inner: Box<dyn ForegroundApp>,
}

impl GenericForegroundApp {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsForegroundApp;
                Ok(Self {
                    inner: Box::new(WindowsForegroundApp::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::X11ForegroundApp;
                Ok(Self {
                    inner: Box::new(X11ForegroundApp::new()?),
                })
            }
            else {
                Ok(Self {
                    inner: Box::new(UnsupportedForegroundApp),
                })
            }
        }
    }
}

impl ForegroundApp for GenericForegroundApp {
    fn foreground_app(&mut self) -> Result<String> {
        self.inner.foreground_app()
    }
}

/// Used when no platform backend was compiled in. Every query fails, so records end up under
/// the unknown application.
pub struct UnsupportedForegroundApp;

impl ForegroundApp for UnsupportedForegroundApp {
    fn foreground_app(&mut self) -> Result<String> {
        Err(anyhow!("No foreground application backend was compiled in"))
    }
}

/// Turns an executable path into an application name: `/usr/bin/firefox` and
/// `C:\Program Files\Code\Code.exe` become `firefox` and `Code`.
pub fn app_name_from_executable(path: &str) -> String {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    Path::new(file_name)
        .file_stem()
        .map(|v| v.to_string_lossy().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| file_name.to_string())
}
