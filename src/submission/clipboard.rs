use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::SubmissionConfig;

use super::{extract_report, poll::poll_until, SubmissionError, Submitter};

/// Minimal clipboard surface the submitter needs.
#[cfg_attr(test, mockall::automock)]
pub trait ClipboardAccess {
    fn set_text(&mut self, text: &str) -> Result<(), SubmissionError>;
    /// [None] when the clipboard holds no text.
    fn get_text(&mut self) -> Option<String>;
}

pub struct SystemClipboard(arboard::Clipboard);

impl SystemClipboard {
    pub fn new() -> Result<Self, SubmissionError> {
        arboard::Clipboard::new()
            .map(Self)
            .map_err(|e| SubmissionError::Clipboard(e.to_string()))
    }
}

impl ClipboardAccess for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), SubmissionError> {
        self.0
            .set_text(text)
            .map_err(|e| SubmissionError::Clipboard(e.to_string()))
    }

    fn get_text(&mut self) -> Option<String> {
        self.0
            .get_text()
            .inspect_err(|e| debug!("Clipboard has no text {e}"))
            .ok()
    }
}

/// Semi-manual submission. Each part is put on the clipboard for the user to paste into the
/// chat surface; the answer is whatever the user copies afterwards.
pub struct ClipboardSubmitter<C: ClipboardAccess> {
    clipboard: C,
    config: SubmissionConfig,
}

impl<C: ClipboardAccess> ClipboardSubmitter<C> {
    pub fn new(clipboard: C, config: SubmissionConfig) -> Self {
        Self { clipboard, config }
    }
}

#[async_trait(?Send)]
impl<C: ClipboardAccess> Submitter for ClipboardSubmitter<C> {
    async fn submit(&mut self, parts: &[(String, String)]) -> Result<String, SubmissionError> {
        let total: usize = parts.iter().map(|(_, body)| body.chars().count()).sum();
        info!("Submitting {} parts, {total} characters", parts.len());

        let mut last = String::new();
        for (index, (title, body)) in parts.iter().enumerate() {
            self.clipboard.set_text(body)?;
            println!(
                "[{}/{}] \"{title}\" is on the clipboard, paste it into the chat within {:?}",
                index + 1,
                parts.len(),
                self.config.paste_delay()
            );
            sleep(self.config.paste_delay()).await;
            last.clone_from(body);
        }

        println!(
            "Copy the answer once it's complete, waiting up to {:?}",
            self.config.timeout()
        );
        let clipboard = &mut self.clipboard;
        let response = poll_until(self.config.poll_interval(), self.config.timeout(), || {
            clipboard.get_text().filter(|text| *text != last)
        })
        .await
        .map_err(|e| {
            warn!("Gave up waiting for an answer {e}");
            SubmissionError::Timeout(e.0)
        })?;

        if response.trim().is_empty() {
            return Err(SubmissionError::EmptyResponse);
        }

        Ok(extract_report(
            &response,
            self.config.answer_marker.as_deref(),
            self.config.footer_marker.as_deref(),
        ))
    }
}
