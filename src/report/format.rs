//! Textual shapes of the report prompt: the pipe separated timeline, the Markdown statistics
//! table and the event list. They're tuned to what chat assistants read well and nothing else
//! depends on them.

use std::fmt::Write;

use crate::daemon::storage::entities::ActivityRecord;

use super::{aggregate::UsageStat, calendar::CalendarEvent, phrases::Locale};

/// One line per record, `timestamp | app_name | text_summary`, in partition order.
pub fn render_listing(records: &[ActivityRecord]) -> String {
    records
        .iter()
        .map(|r| {
            format!(
                "{} | {} | {}",
                r.timestamp.format("%H:%M:%S"),
                r.app_name,
                r.text_summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Markdown table of capture counts preceded by a blank line and a heading. Empty statistics
/// render as an empty string.
pub fn render_stats_table(stats: &[UsageStat], locale: Locale) -> String {
    if stats.is_empty() {
        return String::new();
    }
    let phrases = locale.phrases();
    let mut table = format!(
        "\n{}\n| {} | {} |\n|---|---|",
        phrases.stats_heading, phrases.app_column, phrases.count_column
    );
    for stat in stats {
        let _ = write!(
            table,
            "\n| {} | {} |",
            escape_cell(&stat.app_name),
            locale.format_count(stat.capture_count)
        );
    }
    table
}

/// Bullet list of events, one per line, each line terminated.
pub fn render_events(events: &[CalendarEvent], locale: Locale) -> String {
    if events.is_empty() {
        return locale.phrases().no_events.to_string();
    }
    events
        .iter()
        .map(|e| format!("- {}: {}\n", e.start, e.title))
        .collect()
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use crate::{
        daemon::storage::entities::ActivityRecord,
        report::{aggregate::UsageStat, calendar::CalendarEvent, phrases::Locale},
    };

    use super::{render_events, render_listing, render_stats_table};

    fn stat(app: &str, count: usize) -> UsageStat {
        UsageStat {
            app_name: app.into(),
            capture_count: count,
        }
    }

    #[test]
    fn test_listing() {
        let records = [
            ActivityRecord {
                timestamp: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                app_name: "Mail".into(),
                text_summary: "x".into(),
            },
            ActivityRecord {
                timestamp: NaiveTime::from_hms_opt(9, 2, 5).unwrap(),
                app_name: "Editor".into(),
                text_summary: "z".into(),
            },
        ];
        assert_eq!(
            render_listing(&records),
            "09:00:00 | Mail | x\n09:02:05 | Editor | z"
        );
        assert_eq!(render_listing(&[]), "");
    }

    #[test]
    fn test_stats_table() {
        let table = render_stats_table(&[stat("Mail", 2), stat("Editor", 1)], Locale::En);
        assert_eq!(
            table,
            "\n### App usage (capture frequency)\n\
             | Application | Captures |\n\
             |---|---|\n\
             | Mail | 2 captures |\n\
             | Editor | 1 capture |"
        );
    }

    #[test]
    fn test_stats_table_japanese() {
        let table = render_stats_table(&[stat("Slack", 3)], Locale::Ja);
        assert!(table.ends_with("| Slack | 3回 |"));
        assert!(table.contains("| アプリケーション | キャプチャ回数 |"));
    }

    #[test]
    fn test_stats_table_escapes_pipes() {
        let table = render_stats_table(&[stat("a|b", 1)], Locale::En);
        assert!(table.ends_with("| a\\|b | 1 capture |"));
    }

    #[test]
    fn test_empty_stats_table() {
        assert_eq!(render_stats_table(&[], Locale::En), "");
    }

    #[test]
    fn test_events() {
        let events = [
            CalendarEvent {
                start: "10:00".into(),
                title: "Standup".into(),
            },
            CalendarEvent {
                start: "2025-12-25".into(),
                title: "Holiday".into(),
            },
        ];
        assert_eq!(
            render_events(&events, Locale::En),
            "- 10:00: Standup\n- 2025-12-25: Holiday\n"
        );
        assert_eq!(render_events(&[], Locale::Ja), "（予定なし）");
    }
}
