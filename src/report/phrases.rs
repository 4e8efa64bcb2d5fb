use serde::{Deserialize, Serialize};

/// Language of the placeholder texts and the statistics table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ja,
}

pub struct Phrases {
    pub no_events: &'static str,
    pub calendar_error_prefix: &'static str,
    pub calendar_error_suffix: &'static str,
    pub no_data: &'static str,
    pub stats_heading: &'static str,
    pub app_column: &'static str,
    pub count_column: &'static str,
    pub instructions_title: &'static str,
    pub log_title: &'static str,
}

const EN: Phrases = Phrases {
    no_events: "(no events)",
    calendar_error_prefix: "(calendar unavailable: ",
    calendar_error_suffix: ")",
    no_data: "(no activity was recorded for this day)",
    stats_heading: "### App usage (capture frequency)",
    app_column: "Application",
    count_column: "Captures",
    instructions_title: "Instructions and calendar",
    log_title: "Activity log (with statistics)",
};

const JA: Phrases = Phrases {
    no_events: "（予定なし）",
    calendar_error_prefix: "（カレンダー取得エラー: ",
    calendar_error_suffix: "）",
    no_data: "（ログファイルが見つかりません。）",
    stats_heading: "### アプリ使用統計 (キャプチャ頻度)",
    app_column: "アプリケーション",
    count_column: "キャプチャ回数",
    instructions_title: "指示とカレンダー",
    log_title: "作業ログデータ (統計含む)",
};

impl Locale {
    pub fn phrases(self) -> &'static Phrases {
        match self {
            Locale::En => &EN,
            Locale::Ja => &JA,
        }
    }

    /// Capture count with its unit, e.g. `3 captures` or `3回`.
    pub fn format_count(self, count: usize) -> String {
        match self {
            Locale::En if count == 1 => "1 capture".into(),
            Locale::En => format!("{count} captures"),
            Locale::Ja => format!("{count}回"),
        }
    }

    pub fn calendar_error(self, error: &str) -> String {
        let phrases = self.phrases();
        format!(
            "{}{error}{}",
            phrases.calendar_error_prefix, phrases.calendar_error_suffix
        )
    }
}
