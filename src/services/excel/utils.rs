use super::profiler::parse_as_float;
use super::types::{number_to_string, CellValue, ColumnType};
use crate::error::AppError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static ACCEPTED_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(xlsx|xls|csv)$").expect("extension pattern is valid")
});

static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}$").expect("year-month pattern is valid"));

/// Upload gate: only spreadsheet and CSV file names are let through to decoding.
pub fn check_extension(file_name: &str) -> Result<(), AppError> {
    if ACCEPTED_EXTENSION.is_match(file_name.trim()) {
        Ok(())
    } else {
        tracing::warn!("Rejected upload with unsupported name: {}", file_name);
        Err(AppError::UnsupportedExtension(file_name.to_string()))
    }
}

/// Strategy used by type detection to decide whether a string is a date.
pub trait DateParser: Send + Sync {
    fn parse(&self, value: &str) -> Option<NaiveDateTime>;

    fn is_date(&self, value: &str) -> bool {
        self.parse(value).is_some()
    }
}

/// Best-effort parser covering ISO, RFC 3339/2822, numeric day/month orders and
/// English month names. Independent of the host locale.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChronoDateParser;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%a %b %d %Y",
];

impl DateParser for ChronoDateParser {
    fn parse(&self, value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.naive_utc());
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
            return Some(dt.naive_utc());
        }

        for format in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
                return Some(dt);
            }
        }

        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(value, format) {
                return date.and_hms_opt(0, 0, 0);
            }
        }

        if YEAR_MONTH.is_match(value) {
            return NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0));
        }

        None
    }
}

/// Formats a value for display according to its column type.
pub fn format_value(value: &CellValue, column_type: ColumnType) -> String {
    if value.is_blank() {
        return "-".to_string();
    }

    let Some(n) = parse_as_float(value) else {
        return value.to_string();
    };

    match column_type {
        ColumnType::Currency => {
            let sign = if n < 0.0 { "-" } else { "" };
            format!("{}${}", sign, group_thousands(&format!("{:.2}", n.abs())))
        }
        ColumnType::Percent => {
            let fixed = format!("{:.2}", n.abs());
            let trimmed = match fixed.strip_suffix('0') {
                Some(one_digit) => one_digit.to_string(),
                None => fixed,
            };
            let sign = if n < 0.0 { "-" } else { "" };
            format!("{}{}%", sign, group_thousands(&trimmed))
        }
        _ => format_number(n),
    }
}

/// Compact rendering for plain numbers: `1.2M`, `3.4K`, integers, else two decimals.
pub fn format_number(n: f64) -> String {
    if n.abs() >= 1_000_000.0 {
        format!("{:.1}M", n / 1_000_000.0)
    } else if n.abs() >= 1_000.0 {
        format!("{:.1}K", n / 1_000.0)
    } else if n.fract() == 0.0 {
        number_to_string(n)
    } else {
        format!("{:.2}", n)
    }
}

fn group_thousands(unsigned: &str) -> String {
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}.{}", grouped, frac),
        None => grouped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_gate() {
        assert!(check_extension("report.xlsx").is_ok());
        assert!(check_extension("legacy.XLS").is_ok());
        assert!(check_extension("data.csv").is_ok());
        assert!(matches!(
            check_extension("notes.txt"),
            Err(AppError::UnsupportedExtension(_))
        ));
        assert!(check_extension("archive.csv.zip").is_err());
        assert!(check_extension("xlsx").is_err());
    }

    #[test]
    fn parses_common_date_shapes() {
        let parser = ChronoDateParser;
        for value in [
            "2024-01-15",
            "2024/01/15",
            "01/15/2024",
            "15/01/2024",
            "2024-01-15T10:30:00",
            "2024-01-15T10:30:00Z",
            "Jan 15, 2024",
            "15 January 2024",
            "Mon, 15 Jan 2024 10:30:00 +0000",
            "2024-01",
        ] {
            assert!(parser.is_date(value), "expected {value} to parse");
        }
        for value in ["abc", "", "13/13/2024", "12.5", "Q1 2024"] {
            assert!(!parser.is_date(value), "expected {value} to be rejected");
        }
    }

    #[test]
    fn formats_numbers_by_magnitude() {
        assert_eq!(format_value(&CellValue::Number(2_500_000.0), ColumnType::Number), "2.5M");
        assert_eq!(format_value(&CellValue::Number(1_234.0), ColumnType::Number), "1.2K");
        assert_eq!(format_value(&CellValue::Number(42.0), ColumnType::Number), "42");
        assert_eq!(format_value(&CellValue::Number(3.14159), ColumnType::Number), "3.14");
        assert_eq!(format_value(&CellValue::Text("7".into()), ColumnType::Text), "7");
    }

    #[test]
    fn formats_currency_and_percent() {
        assert_eq!(
            format_value(&CellValue::Number(1234.5), ColumnType::Currency),
            "$1,234.50"
        );
        assert_eq!(
            format_value(&CellValue::Text("-$20".into()), ColumnType::Currency),
            "-$20.00"
        );
        assert_eq!(format_value(&CellValue::Text("12.5%".into()), ColumnType::Percent), "12.5%");
        assert_eq!(format_value(&CellValue::Number(10.0), ColumnType::Percent), "10.0%");
        assert_eq!(format_value(&CellValue::Number(12.34), ColumnType::Percent), "12.34%");
    }

    #[test]
    fn blanks_and_text_pass_through() {
        assert_eq!(format_value(&CellValue::Empty, ColumnType::Number), "-");
        assert_eq!(format_value(&CellValue::Text(String::new()), ColumnType::Number), "-");
        assert_eq!(format_value(&CellValue::Text("north".into()), ColumnType::Currency), "north");
        assert_eq!(format_value(&CellValue::Bool(true), ColumnType::Text), "true");
    }
}
