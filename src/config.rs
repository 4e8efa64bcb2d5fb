//! Configuration read once from `<app_dir>/config.json`. Every field has a default, so a
//! missing file or a partially filled one is fine.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::report::phrases::Locale;

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_TEMPLATE_PATH: &str = "templates/report_prompt_template.txt";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sampling: SamplingConfig,
    pub capture: CaptureConfig,
    pub report: ReportConfig,
    pub calendar: CalendarConfig,
    pub submission: SubmissionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub interval_secs: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl SamplingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Commands used to grab a frame and to recognize text on it. `{frame}` is replaced with the
/// path of a temporary image file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub capture_command: Vec<String>,
    pub recognize_command: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let capture_command: &[&str] = if cfg!(target_os = "macos") {
            &["screencapture", "-x", "{frame}"]
        } else if cfg!(windows) {
            &[
                "powershell",
                "-NoProfile",
                "-Command",
                "Add-Type -AssemblyName System.Windows.Forms,System.Drawing; \
                 $b = [System.Windows.Forms.Screen]::PrimaryScreen.Bounds; \
                 $i = New-Object System.Drawing.Bitmap $b.Width, $b.Height; \
                 [System.Drawing.Graphics]::FromImage($i).CopyFromScreen($b.Location, [System.Drawing.Point]::Empty, $b.Size); \
                 $i.Save('{frame}')",
            ]
        } else {
            &["import", "-window", "root", "{frame}"]
        };
        Self {
            capture_command: capture_command.iter().map(|v| v.to_string()).collect(),
            recognize_command: ["tesseract", "{frame}", "stdout", "-l", "eng+jpn"]
                .iter()
                .map(|v| v.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Relative paths are resolved against the application directory.
    pub template: Option<PathBuf>,
    pub locale: Locale,
    pub output_dir: Option<PathBuf>,
}

impl ReportConfig {
    pub fn template_path(&self, app_dir: &Path) -> PathBuf {
        app_dir.join(
            self.template
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_TEMPLATE_PATH)),
        )
    }

    pub fn output_dir(&self, app_dir: &Path) -> PathBuf {
        app_dir.join(
            self.output_dir
                .as_deref()
                .unwrap_or_else(|| Path::new("outputs")),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub enabled: bool,
    /// Token file in the format written by Google's client libraries.
    pub token_path: Option<PathBuf>,
    /// OAuth client downloaded from the Google Cloud console, used by `authorize`.
    pub credentials_path: Option<PathBuf>,
    pub calendar_id: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token_path: None,
            credentials_path: None,
            calendar_id: "primary".into(),
        }
    }
}

impl CalendarConfig {
    pub fn token_path(&self, app_dir: &Path) -> PathBuf {
        app_dir.join(
            self.token_path
                .as_deref()
                .unwrap_or_else(|| Path::new("token.json")),
        )
    }

    pub fn credentials_path(&self, app_dir: &Path) -> PathBuf {
        app_dir.join(
            self.credentials_path
                .as_deref()
                .unwrap_or_else(|| Path::new("credentials.json")),
        )
    }
}

/// Waits and markers used while handing the prompt over to a chat surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    pub paste_delay_secs: u64,
    pub poll_interval_ms: u64,
    pub timeout_secs: u64,
    /// Text the answer is expected to start with. Anything before it is dropped.
    pub answer_marker: Option<String>,
    /// Text that starts boilerplate appended by the chat surface. It and anything after it is
    /// dropped.
    pub footer_marker: Option<String>,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            paste_delay_secs: 10,
            poll_interval_ms: 1000,
            timeout_secs: 300,
            answer_marker: None,
            footer_marker: None,
        }
    }
}

impl SubmissionConfig {
    pub fn paste_delay(&self) -> Duration {
        Duration::from_secs(self.paste_delay_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Reads `config.json` from the application directory, falling back to defaults when the
    /// file doesn't exist.
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = app_dir.join(CONFIG_FILE_NAME);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let config = serde_json::from_str(&content)
                    .with_context(|| format!("Invalid configuration in {path:?}"))?;
                debug!("Loaded configuration {config:?}");
                Ok(config)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No configuration at {path:?}, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read {path:?}")),
        }
    }
}
