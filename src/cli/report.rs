use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use crate::{
    config::{AppConfig, CalendarConfig},
    daemon::{storage::log_store::LogStoreImpl, RECORD_DIR_NAME},
    report::{
        assemble::{PromptParts, ReportAssembler, ReportError},
        calendar::{CalendarProvider, DisabledCalendar},
        google_calendar::GoogleCalendar,
        phrases::Locale,
    },
    submission::{
        clipboard::{ClipboardSubmitter, SystemClipboard},
        Submitter,
    },
    utils::time::{date_to_key, parse_compact_date},
};

pub const PROMPT_FILE_NAME: &str = "daily_report_prompt.txt";
const PREVIEW_CHARS: usize = 500;

#[derive(Debug, clap::Args)]
pub struct ReportCommand {
    #[arg(
        long,
        short,
        value_parser = parse_compact_date,
        help = "Day to report on in YYMMDD form, e.g. 251224. Defaults to today"
    )]
    date: Option<NaiveDate>,
    #[arg(long, short, help = "Submit without asking")]
    yes: bool,
    #[arg(long, conflicts_with = "yes", help = "Only write the prompt")]
    no_submit: bool,
    #[arg(long, help = "Language of the placeholders and statistics. Overrides the configuration")]
    locale: Option<Locale>,
}

/// Command to process `report`. Writes the prompt, then either submits it or shows a preview.
pub async fn process_report_command(
    ReportCommand {
        date,
        yes,
        no_submit,
        locale,
    }: ReportCommand,
    app_dir: &Path,
    config: &AppConfig,
) -> Result<()> {
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let locale = locale.unwrap_or(config.report.locale);
    let output_dir = config.report.output_dir(app_dir);

    println!("Building the report prompt for {}", date_to_key(date));
    let parts = build_prompt(date, locale, app_dir, config).await?;

    let prompt_path = write_prompt(&output_dir, &parts).await?;
    println!("Saved the instructions to {prompt_path:?}");

    let submit = !no_submit && (yes || ask("Submit the prompt through the clipboard? (y/n): ").await?);
    if !submit {
        println!("\n--- Prompt preview ---\n");
        println!("{}", preview(&parts.instructions));
        return Ok(());
    }

    let mut submitter =
        ClipboardSubmitter::new(SystemClipboard::new()?, config.submission.clone());
    let report_path = submit_and_save(&mut submitter, &parts, locale, &output_dir, date).await?;
    println!("Saved the report to {report_path:?}");
    Ok(())
}

async fn build_prompt(
    date: NaiveDate,
    locale: Locale,
    app_dir: &Path,
    config: &AppConfig,
) -> Result<PromptParts> {
    let store = LogStoreImpl::new(app_dir.join(RECORD_DIR_NAME))?;
    let assembler = ReportAssembler::new(
        store,
        create_calendar(&config.calendar, app_dir),
        config.report.template_path(app_dir),
        locale,
    );
    match assembler.assemble(date).await {
        Ok(parts) => Ok(parts),
        Err(e @ ReportError::TemplateMissing { .. }) => Err(anyhow::Error::new(e)
            .context("Prompt generation failed, run `dayscribe init` to install the bundled template")),
    }
}

fn create_calendar(config: &CalendarConfig, app_dir: &Path) -> Box<dyn CalendarProvider> {
    if !config.enabled {
        return Box::new(DisabledCalendar);
    }
    match GoogleCalendar::new(config.token_path(app_dir), config.calendar_id.clone()) {
        Ok(calendar) => Box::new(calendar),
        Err(e) => {
            warn!("Calendar client can't be created {e}");
            Box::new(DisabledCalendar)
        }
    }
}

/// Saves the instructions block as `daily_report_prompt.txt`.
pub async fn write_prompt(output_dir: &Path, parts: &PromptParts) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(PROMPT_FILE_NAME);
    tokio::fs::write(&path, &parts.instructions)
        .await
        .with_context(|| format!("Failed to write {path:?}"))?;
    Ok(path)
}

/// Submits both blocks and saves the answer as `daily_report_YYYY-MM-DD.md`. Nothing is
/// written when the submission fails.
pub async fn submit_and_save(
    submitter: &mut dyn Submitter,
    parts: &PromptParts,
    locale: Locale,
    output_dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf> {
    let report = submitter
        .submit(&parts.titled_parts(locale))
        .await
        .inspect_err(|e| error!("Submission failed {e}"))?;

    tokio::fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(format!("daily_report_{}.md", date_to_key(date)));
    tokio::fs::write(&path, report).await?;
    info!("Report saved to {path:?}");
    Ok(path)
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let mut preview = text.chars().take(PREVIEW_CHARS).collect::<String>();
    preview.push_str("\n...(truncated)...");
    preview
}

async fn ask(question: &str) -> Result<bool> {
    println!("{question}");
    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes"
    ))
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::{
        config::AppConfig,
        report::{assemble::PromptParts, phrases::Locale},
        submission::{MockSubmitter, SubmissionError},
    };

    use super::{build_prompt, preview, submit_and_save, write_prompt, PROMPT_FILE_NAME};

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2025, 12, 24).unwrap();

    fn parts() -> PromptParts {
        PromptParts {
            instructions: "Report for 2025-12-24\n".into(),
            log_block: "09:00:00 | Mail | x\n".into(),
        }
    }

    #[tokio::test]
    async fn test_write_prompt() -> Result<()> {
        let dir = tempdir()?;
        let output_dir = dir.path().join("outputs");

        let path = write_prompt(&output_dir, &parts()).await?;

        assert_eq!(path, output_dir.join(PROMPT_FILE_NAME));
        assert_eq!(std::fs::read_to_string(path)?, "Report for 2025-12-24\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_and_save() -> Result<()> {
        let dir = tempdir()?;
        let mut submitter = MockSubmitter::new();
        submitter
            .expect_submit()
            .withf(|parts: &[(String, String)]| {
                parts.len() == 2
                    && parts[0].0 == "Instructions and calendar"
                    && parts[1].1 == "09:00:00 | Mail | x\n"
            })
            .times(1)
            .returning(|_| Ok("# Daily report".into()));

        let path = submit_and_save(&mut submitter, &parts(), Locale::En, dir.path(), TEST_DATE)
            .await?;

        assert_eq!(path, dir.path().join("daily_report_2025-12-24.md"));
        assert_eq!(std::fs::read_to_string(path)?, "# Daily report");
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_submission_writes_nothing() -> Result<()> {
        let dir = tempdir()?;
        let mut submitter = MockSubmitter::new();
        submitter
            .expect_submit()
            .returning(|_| Err(SubmissionError::EmptyResponse));

        let result =
            submit_and_save(&mut submitter, &parts(), Locale::En, dir.path(), TEST_DATE).await;

        assert!(result.is_err());
        assert!(!dir.path().join("daily_report_2025-12-24.md").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_template_hints_at_init() -> Result<()> {
        let dir = tempdir()?;

        let error = build_prompt(TEST_DATE, Locale::En, dir.path(), &AppConfig::default())
            .await
            .unwrap_err();

        assert!(format!("{error:#}").contains("dayscribe init"));
        Ok(())
    }

    #[tokio::test]
    async fn test_other_failures_have_no_template_hint() -> Result<()> {
        let dir = tempdir()?;
        // A file where the record directory should be.
        std::fs::write(dir.path().join("records"), "")?;

        let error = build_prompt(TEST_DATE, Locale::En, dir.path(), &AppConfig::default())
            .await
            .unwrap_err();

        assert!(!format!("{error:#}").contains("template"));
        Ok(())
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short"), "short");
        let long = "あ".repeat(600);
        let shown = preview(&long);
        assert!(shown.starts_with(&"あ".repeat(500)));
        assert!(shown.ends_with("...(truncated)..."));
        assert!(!shown.contains(&"あ".repeat(501)));
    }
}
