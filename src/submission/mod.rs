//! Hands a finished prompt over to a chat surface and brings the answer back.

use std::time::Duration;

use async_trait::async_trait;

pub mod clipboard;
pub mod poll;

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("the copied answer was empty")]
    EmptyResponse,
    #[error("no answer was copied within {0:?}")]
    Timeout(Duration),
    #[error("clipboard is unavailable: {0}")]
    Clipboard(String),
}

/// Delivers titled prompt parts, in order, and returns the answer text.
#[cfg_attr(test, mockall::automock)]
#[async_trait(?Send)]
pub trait Submitter {
    async fn submit(&mut self, parts: &[(String, String)]) -> Result<String, SubmissionError>;
}

/// Strips what chat surfaces put around an answer. Text before `answer_marker` is dropped,
/// except a Markdown heading prefix (`#`, `# `, `## ` ...) right in front of it. `footer_marker`
/// and everything after it is dropped.
pub fn extract_report(
    response: &str,
    answer_marker: Option<&str>,
    footer_marker: Option<&str>,
) -> String {
    let mut report = response;

    if let Some(index) = footer_marker
        .filter(|m| !m.is_empty())
        .and_then(|m| report.find(m))
    {
        report = &report[..index];
    }

    if let Some(index) = answer_marker
        .filter(|m| !m.is_empty())
        .and_then(|m| report.find(m))
    {
        report = &report[heading_start(&report[..index])..];
    }

    report.trim().to_string()
}

/// Where a heading prefix ending `before` starts: one optional space preceded by a run of `#`.
/// Returns `before.len()` when there's no such prefix.
fn heading_start(before: &str) -> usize {
    let without_space = before.strip_suffix(' ').unwrap_or(before);
    let hashes = without_space.len() - without_space.trim_end_matches('#').len();
    if hashes == 0 {
        before.len()
    } else {
        without_space.len() - hashes
    }
}
