use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::config::CaptureConfig;

/// Placeholder replaced with the path of the captured frame in capture and recognizer commands.
pub const FRAME_PLACEHOLDER: &str = "{frame}";

/// Reads the text currently shown on the screen. An empty string is a perfectly valid answer;
/// it just means nothing legible was found.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScreenReader: Send {
    async fn read_screen(&mut self) -> Result<String>;
}

/// [ScreenReader] built from two external programs: one that saves a screenshot and one that
/// prints the text it recognizes on it.
pub struct CommandScreenReader {
    capture_command: Vec<String>,
    recognize_command: Vec<String>,
}

impl CommandScreenReader {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            capture_command: config.capture_command.clone(),
            recognize_command: config.recognize_command.clone(),
        }
    }
}

#[async_trait]
impl ScreenReader for CommandScreenReader {
    #[instrument(skip(self))]
    async fn read_screen(&mut self) -> Result<String> {
        // The frame lives only for the duration of one cycle.
        let frame_dir = tempfile::Builder::new().prefix("dayscribe-").tempdir()?;
        let frame = frame_dir.path().join("frame.png");
        let frame = frame.to_string_lossy();

        run_with_frame(&self.capture_command, &frame)
            .await
            .context("Screen capture failed")?;
        let text = run_with_frame(&self.recognize_command, &frame)
            .await
            .context("Text recognition failed")?;
        debug!("Recognized {} characters", text.chars().count());
        Ok(text)
    }
}

async fn run_with_frame(command: &[String], frame: &str) -> Result<String> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| anyhow!("Command is empty"))?;

    let output = Command::new(program)
        .args(args.iter().map(|arg| arg.replace(FRAME_PLACEHOLDER, frame)))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("Failed to start {program}"))?;

    if !output.status.success() {
        bail!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use anyhow::Result;

    use crate::config::CaptureConfig;

    use super::{CommandScreenReader, ScreenReader};

    fn command(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_recognizer_reads_the_captured_frame() -> Result<()> {
        let mut reader = CommandScreenReader::new(&CaptureConfig {
            capture_command: command(&["sh", "-c", "printf 'hello\\nscreen' > \"$0\"", "{frame}"]),
            recognize_command: command(&["cat", "{frame}"]),
        });

        assert_eq!(reader.read_screen().await?, "hello\nscreen");
        Ok(())
    }

    #[tokio::test]
    async fn test_failing_capture_is_an_error() {
        let mut reader = CommandScreenReader::new(&CaptureConfig {
            capture_command: command(&["sh", "-c", "echo denied >&2; exit 3"]),
            recognize_command: command(&["cat", "{frame}"]),
        });

        let error = reader.read_screen().await.unwrap_err();
        assert!(format!("{error:#}").contains("denied"));
    }

    #[tokio::test]
    async fn test_empty_command_is_an_error() {
        let mut reader = CommandScreenReader::new(&CaptureConfig {
            capture_command: vec![],
            recognize_command: command(&["cat", "{frame}"]),
        });

        assert!(reader.read_screen().await.is_err());
    }
}
