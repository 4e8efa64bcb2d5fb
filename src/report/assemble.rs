use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::{daemon::storage::log_store::LogStore, utils::time::date_to_key};

use super::{
    aggregate::{aggregate, DayAggregate},
    calendar::CalendarProvider,
    format::{render_events, render_stats_table},
    phrases::Locale,
    template::ReportTemplate,
};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("report template {path:?} can't be read: {source}")]
    TemplateMissing {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The two blocks of a report prompt. They're kept apart so that they can be handed over
/// separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptParts {
    /// Rendered template head: guidance plus the day's calendar.
    pub instructions: String,
    /// Timeline followed by the usage statistics.
    pub log_block: String,
}

impl PromptParts {
    /// Parts paired with their localized titles, in the order they should be submitted.
    pub fn titled_parts(&self, locale: Locale) -> Vec<(String, String)> {
        let phrases = locale.phrases();
        vec![
            (phrases.instructions_title.to_string(), self.instructions.clone()),
            (phrases.log_title.to_string(), self.log_block.clone()),
        ]
    }
}

pub struct ReportAssembler<S: LogStore> {
    store: S,
    calendar: Box<dyn CalendarProvider>,
    template_path: PathBuf,
    locale: Locale,
}

impl<S: LogStore> ReportAssembler<S> {
    pub fn new(
        store: S,
        calendar: Box<dyn CalendarProvider>,
        template_path: PathBuf,
        locale: Locale,
    ) -> Self {
        Self {
            store,
            calendar,
            template_path,
            locale,
        }
    }

    /// Builds the prompt for `date`. Only a missing template fails; a calendar or log that
    /// can't be read ends up as a placeholder in the prompt.
    pub async fn assemble(&self, date: NaiveDate) -> Result<PromptParts, ReportError> {
        let template = ReportTemplate::load(&self.template_path).await?;
        let phrases = self.locale.phrases();

        let events = match self.calendar.get_events(date).await {
            Ok(events) => {
                info!("Fetched {} calendar events", events.len());
                render_events(&events, self.locale)
            }
            Err(e) => {
                warn!("Calendar is unavailable: {e}");
                self.locale.calendar_error(&e.to_string())
            }
        };

        let day = aggregate(&self.store, date).await.unwrap_or_else(|e| {
            error!("Failed to read the activity log of {date}: {e:?}");
            DayAggregate::default()
        });

        let instructions = template.render_instructions(&date_to_key(date), &events);

        let listing = if day.is_empty() {
            phrases.no_data
        } else {
            day.listing.as_str()
        };
        let log_block = format!("{listing}\n{}", render_stats_table(&day.stats, self.locale));

        Ok(PromptParts {
            instructions,
            log_block,
        })
    }
}
