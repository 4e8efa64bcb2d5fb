use chrono::NaiveDate;

/// Format of a partition key. Every file in the record directory is named after it.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Compact date format accepted on the command line, e.g. `251224` for 2025-12-24.
pub const COMPACT_DATE_FORMAT: &str = "%y%m%d";

/// This is the standard way of converting a date to a partition key in dayscribe.
pub fn date_to_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Name of the partition file holding records for `date`.
pub fn date_to_record_name(date: NaiveDate) -> String {
    format!("daily_log_{}.jsonl", date_to_key(date))
}

/// Parses a `YYMMDD` date as typed by a user.
pub fn parse_compact_date(value: &str) -> Result<NaiveDate, String> {
    if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!(
            "Date must be in YYMMDD format (e.g. 251224 for 2025-12-24), got \"{value}\""
        ));
    }
    NaiveDate::parse_from_str(value, COMPACT_DATE_FORMAT)
        .map_err(|e| format!("\"{value}\" is not a valid YYMMDD date: {e}"))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{date_to_key, date_to_record_name, parse_compact_date};

    #[test]
    fn test_record_name() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(date_to_key(date), "2025-03-07");
        assert_eq!(date_to_record_name(date), "daily_log_2025-03-07.jsonl");
    }

    #[test]
    fn test_parse_compact_date() {
        assert_eq!(
            parse_compact_date("251224"),
            Ok(NaiveDate::from_ymd_opt(2025, 12, 24).unwrap())
        );
    }

    #[test]
    fn test_parse_compact_date_rejects_garbage() {
        assert!(parse_compact_date("2025-12-24").is_err());
        assert!(parse_compact_date("25122").is_err());
        assert!(parse_compact_date("251332").is_err());
        assert!(parse_compact_date("25a224").is_err());
    }
}
