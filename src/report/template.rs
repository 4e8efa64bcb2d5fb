use std::path::Path;

use tracing::{debug, warn};

use super::assemble::ReportError;

pub const CALENDAR_PLACEHOLDER: &str = "calendar_events";
pub const DATE_PLACEHOLDER: &str = "date";
/// Splits the template into the instructions head and the data region.
pub const LOGS_MARKER: &str = "{daily_logs}";

/// A report prompt template, already split at its first [LOGS_MARKER]. Only the head is ever
/// rendered; log content is appended after it verbatim by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTemplate {
    head: String,
    has_log_marker: bool,
}

impl ReportTemplate {
    pub fn parse(source: &str) -> Self {
        match source.find(LOGS_MARKER) {
            Some(index) => Self {
                head: source[..index].to_string(),
                has_log_marker: true,
            },
            None => Self {
                head: source.to_string(),
                has_log_marker: false,
            },
        }
    }

    pub async fn load(path: &Path) -> Result<Self, ReportError> {
        debug!("Loading report template {path:?}");
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ReportError::TemplateMissing {
                path: path.to_path_buf(),
                source,
            })?;
        let template = Self::parse(&source);
        if !template.has_log_marker {
            warn!("Template {path:?} has no {LOGS_MARKER} marker, using all of it as instructions");
        }
        Ok(template)
    }

    pub fn has_log_marker(&self) -> bool {
        self.has_log_marker
    }

    /// Renders the instructions head. The result is trimmed and ends with exactly one line
    /// break.
    pub fn render_instructions(&self, date_key: &str, events: &str) -> String {
        let rendered = substitute(&self.head, |name| match name {
            DATE_PLACEHOLDER => Some(date_key),
            CALENDAR_PLACEHOLDER => Some(events),
            _ => None,
        });
        let mut instructions = rendered.trim().to_string();
        instructions.push('\n');
        instructions
    }
}

/// Single pass placeholder substitution. `{{` and `}}` produce literal braces and unknown
/// placeholders are kept as they are. Substituted values are never scanned again.
fn substitute<'a>(source: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut output = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(index) = rest.find(['{', '}']) {
        output.push_str(&rest[..index]);
        let tail = &rest[index..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            output.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }

        if tail.starts_with('{') {
            if let Some(end) = tail.find('}') {
                let name = &tail[1..end];
                if let Some(value) = lookup(name) {
                    output.push_str(value);
                    rest = &tail[end + 1..];
                    continue;
                }
            }
        }

        output.push_str(&tail[..1]);
        rest = &tail[1..];
    }

    output.push_str(rest);
    output
}
