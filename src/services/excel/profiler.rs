use super::types::*;
use super::utils::{format_number, format_value, ChronoDateParser, DateParser};
use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;
use std::collections::HashSet;

const CURRENCY_SYMBOLS: [char; 3] = ['$', '€', '£'];

static THOUSANDS_GROUPED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{1,3}(,\d{3})+(\.\d*)?([eE][+-]?\d+)?$").expect("grouping pattern is valid")
});

/// Numeric reading of a cell, if it has one.
///
/// Text is accepted with surrounding whitespace, a trailing `%`, a leading
/// currency symbol (before or after the sign) and thousands separators.
/// Commas must group the integer part in threes (`1,234.5`); `3,4` is not a
/// number. Non-finite results are rejected.
pub fn parse_as_float(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => parse_numeric_text(s),
        _ => None,
    }
}

fn parse_numeric_text(raw: &str) -> Option<f64> {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_suffix('%') {
        s = rest.trim_end();
    }

    let (negative, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let unsigned = unsigned
        .strip_prefix(&CURRENCY_SYMBOLS[..])
        .map(str::trim_start)
        .unwrap_or(unsigned);

    // a sign may also follow the currency symbol: "$-5"
    let (negative, digits) = match unsigned.strip_prefix('-') {
        Some(rest) if !negative => (true, rest),
        _ => (negative, unsigned),
    };

    if digits.is_empty()
        || !digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | 'e' | 'E' | '+' | '-'))
        || !digits.starts_with(|c: char| c.is_ascii_digit() || c == '.')
    {
        return None;
    }

    let n = if digits.contains(',') {
        if !THOUSANDS_GROUPED.is_match(digits) {
            return None;
        }
        digits.replace(',', "").parse::<f64>().ok()?
    } else {
        digits.parse::<f64>().ok()?
    };
    if !n.is_finite() {
        return None;
    }
    Some(if negative { -n } else { n })
}

/// Per-column numeric summary over the columns of the first row.
///
/// Values that do not parse as finite numbers are skipped; a column with no
/// numeric values, or whose sum overflows to infinity, is left out entirely. The median is the element at
/// `count / 2` of the sorted values, i.e. the upper middle for even counts.
pub fn summarize(rows: &[Row]) -> ColumnStatsMap {
    let mut summary = ColumnStatsMap::new();

    for column in first_row_columns(rows) {
        let reader = ColumnReader::new(rows, &column);
        let values: Vec<f64> = rows
            .iter()
            .filter_map(|row| reader.read(row))
            .filter_map(parse_as_float)
            .collect();

        if let Some(stats) = column_stats(values) {
            summary.insert(column, stats);
        }
    }

    summary
}

fn column_stats(mut values: Vec<f64>) -> Option<ColumnStats> {
    if values.is_empty() {
        return None;
    }

    let count = values.len();
    let sum: f64 = values.iter().sum();
    if !sum.is_finite() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    Some(ColumnStats {
        count,
        min: values[0],
        max: values[count - 1],
        sum,
        mean: sum / count as f64,
        median: values[count / 2],
    })
}

/// Semantic type per column using the default date parser.
pub fn detect_types(rows: &[Row]) -> ColumnTypeMap {
    detect_types_with(rows, &ChronoDateParser)
}

/// Semantic type per column, judged on the first [`TYPE_DETECTION_ROWS`] rows.
///
/// A column is numeric (or a date) only when every non-empty sampled value
/// qualifies; one stray value makes it text.
pub fn detect_types_with(rows: &[Row], dates: &dyn DateParser) -> ColumnTypeMap {
    let sample = &rows[..rows.len().min(TYPE_DETECTION_ROWS)];
    let mut types = ColumnTypeMap::new();

    for column in first_row_columns(rows) {
        let reader = ColumnReader::new(rows, &column);
        let values: Vec<&CellValue> = sample
            .iter()
            .filter_map(|row| reader.read(row))
            .filter(|value| !value.is_blank())
            .collect();

        types.insert(column, classify(&values, dates));
    }

    types
}

fn classify(values: &[&CellValue], dates: &dyn DateParser) -> ColumnType {
    if values.is_empty() {
        return ColumnType::Unknown;
    }

    if values.iter().all(|v| parse_as_float(v).is_some()) {
        let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        return if rendered.iter().any(|s| s.contains('%')) {
            ColumnType::Percent
        } else if rendered.iter().any(|s| s.contains(&CURRENCY_SYMBOLS[..])) {
            ColumnType::Currency
        } else {
            ColumnType::Number
        };
    }

    let all_dates = values.iter().all(|v| match v {
        CellValue::Text(s) => dates.is_date(s),
        _ => false,
    });
    if all_dates {
        ColumnType::Date
    } else {
        ColumnType::Text
    }
}

/// Describes every header column of a sheet for display.
pub fn column_summaries(
    rows: &[Row],
    headers: &[String],
    stats: &ColumnStatsMap,
    types: &ColumnTypeMap,
) -> Vec<ColumnSummary> {
    headers
        .iter()
        .map(|name| {
            let reader = ColumnReader::new(rows, name);
            let mut non_empty = 0;
            let mut seen = HashSet::new();
            let mut sample_values = SmallVec::<[String; SAMPLE_SIZE]>::new();

            for value in rows.iter().filter_map(|row| reader.read(row)) {
                if value.is_blank() {
                    continue;
                }
                non_empty += 1;
                let rendered = value.to_string();
                if sample_values.len() < SAMPLE_SIZE {
                    sample_values.push(rendered.clone());
                }
                seen.insert(rendered);
            }

            let column_type = types.get(name).copied().unwrap_or(ColumnType::Unknown);
            let column_stats = stats.get(name).copied();

            ColumnSummary {
                name: name.clone(),
                column_type,
                non_empty_count: non_empty,
                empty_count: rows.len() - non_empty,
                unique_count: seen.len(),
                sample_values,
                stats: column_stats,
                formatted: column_stats.map(|s| format_stats(&s, column_type)),
            }
        })
        .collect()
}

fn format_stats(stats: &ColumnStats, column_type: ColumnType) -> FormattedStats {
    let show = |n: f64| match column_type {
        ColumnType::Currency | ColumnType::Percent => {
            format_value(&CellValue::Number(n), column_type)
        }
        _ => format_number(n),
    };

    FormattedStats {
        min: show(stats.min),
        max: show(stats.max),
        sum: show(stats.sum),
        mean: show(stats.mean),
        median: show(stats.median),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn text_rows(column: &str, values: &[&str]) -> Vec<Row> {
        values
            .iter()
            .map(|v| Row::from_iter([(column, CellValue::Text(v.to_string()))]))
            .collect()
    }

    #[test]
    fn parse_as_float_handles_symbols() {
        let parse = |s: &str| parse_as_float(&CellValue::Text(s.to_string()));
        assert_eq!(parse("10%"), Some(10.0));
        assert_eq!(parse(" $1,200.50 "), Some(1200.5));
        assert_eq!(parse("-€3"), Some(-3.0));
        assert_eq!(parse("£-4.5"), Some(-4.5));
        assert_eq!(parse("1e3"), Some(1000.0));
        assert_eq!(parse(".5"), Some(0.5));
        assert_eq!(parse("abc"), None);
        assert_eq!(parse("12abc"), None);
        assert_eq!(parse("inf"), None);
        assert_eq!(parse("NaN"), None);
        assert_eq!(parse("%"), None);
        assert_eq!(parse("$"), None);
        assert_eq!(parse_as_float(&CellValue::Bool(true)), None);
        assert_eq!(parse_as_float(&CellValue::Number(f64::INFINITY)), None);
        assert_eq!(parse_as_float(&CellValue::Empty), None);
    }

    #[test]
    fn commas_must_group_thousands() {
        let parse = |s: &str| parse_as_float(&CellValue::Text(s.to_string()));
        assert_eq!(parse("1,234.5"), Some(1234.5));
        assert_eq!(parse("12,345,678"), Some(12_345_678.0));
        assert_eq!(parse("-$1,000"), Some(-1000.0));
        assert_eq!(parse("3,4"), None);
        assert_eq!(parse("1,2,3"), None);
        assert_eq!(parse("12,5%"), None);
        assert_eq!(parse("1234,567"), None);
        assert_eq!(parse(",123"), None);

        let rows = text_rows("qty", &["3,4", "1,5"]);
        assert_eq!(detect_types(&rows)["qty"], ColumnType::Text);
        assert!(summarize(&rows).is_empty());
    }

    #[test]
    fn overflowing_sums_leave_the_column_out() {
        let rows = vec![
            Row::from_iter([("big", CellValue::Number(1e308)), ("ok", CellValue::Number(1.0))]),
            Row::from_iter([("big", CellValue::Number(1e308)), ("ok", CellValue::Number(2.0))]),
        ];
        let summary = summarize(&rows);
        assert!(!summary.contains_key("big"));
        assert_eq!(summary["ok"].sum, 3.0);
    }

    #[test]
    fn summarize_uses_upper_middle_median() {
        let rows = text_rows("a", &["1", "2", "3", "4"]);
        let summary = summarize(&rows);
        assert_eq!(
            summary.get("a"),
            Some(&ColumnStats {
                count: 4,
                min: 1.0,
                max: 4.0,
                sum: 10.0,
                mean: 2.5,
                median: 3.0,
            })
        );
    }

    #[test]
    fn summarize_skips_non_numeric_values_and_columns() {
        let rows = vec![
            Row::from_iter([
                ("qty", CellValue::Number(5.0)),
                ("name", CellValue::Text("bolt".into())),
            ]),
            Row::from_iter([
                ("qty", CellValue::Text("n/a".into())),
                ("name", CellValue::Text("nut".into())),
            ]),
            Row::from_iter([("qty", CellValue::Number(1.0))]),
        ];
        let summary = summarize(&rows);

        assert!(!summary.contains_key("name"));
        let qty = summary["qty"];
        assert_eq!(qty.count, 2);
        assert_eq!((qty.min, qty.median, qty.max), (1.0, 5.0, 5.0));
    }

    #[test]
    fn summarize_ignores_columns_missing_from_first_row() {
        let rows = vec![
            Row::from_iter([("a", CellValue::Number(1.0))]),
            Row::from_iter([("a", CellValue::Number(2.0)), ("b", CellValue::Number(9.0))]),
        ];
        let summary = summarize(&rows);
        assert_eq!(summary.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn summarize_single_row_and_empty_input() {
        assert!(summarize(&[]).is_empty());
        let rows = text_rows("a", &["7"]);
        let stats = summarize(&rows)["a"];
        assert_eq!(stats.count, 1);
        assert_eq!((stats.min, stats.median, stats.max), (7.0, 7.0, 7.0));
    }

    #[test]
    fn summarize_invariants_hold() {
        let rows = text_rows("v", &["9", "x", "-2", "4.5", "", "$3", "11%"]);
        let stats = summarize(&rows)["v"];
        assert!(stats.count <= rows.len());
        assert!(stats.min <= stats.median && stats.median <= stats.max);
    }

    #[test]
    fn detects_percent_and_currency() {
        assert_eq!(
            detect_types(&text_rows("x", &["10%", "20%"]))["x"],
            ColumnType::Percent
        );
        assert_eq!(
            detect_types(&text_rows("x", &["$10", "20"]))["x"],
            ColumnType::Currency
        );
        // percent wins over currency across the column
        assert_eq!(
            detect_types(&text_rows("x", &["$10", "20%"]))["x"],
            ColumnType::Percent
        );
        assert_eq!(
            detect_types(&text_rows("x", &["10", "2.5"]))["x"],
            ColumnType::Number
        );
    }

    #[test]
    fn single_outlier_demotes_to_text() {
        assert_eq!(
            detect_types(&text_rows("x", &["10", "abc"]))["x"],
            ColumnType::Text
        );
        assert_eq!(
            detect_types(&text_rows("d", &["2024-01-01", "soon"]))["d"],
            ColumnType::Text
        );
    }

    #[test]
    fn detects_dates_and_unknown() {
        assert_eq!(
            detect_types(&text_rows("d", &["2024-01-01", "Jan 5, 2024"]))["d"],
            ColumnType::Date
        );

        let rows = vec![Row::from_iter([("blank", CellValue::Text(String::new()))])];
        assert_eq!(detect_types(&rows)["blank"], ColumnType::Unknown);
        assert!(detect_types(&[]).is_empty());
    }

    #[test]
    fn booleans_are_text() {
        let rows = vec![
            Row::from_iter([("flag", CellValue::Bool(true))]),
            Row::from_iter([("flag", CellValue::Bool(false))]),
        ];
        assert_eq!(detect_types(&rows)["flag"], ColumnType::Text);
    }

    #[test]
    fn only_the_sample_is_inspected() {
        let mut values = vec!["1"; TYPE_DETECTION_ROWS];
        values.push("not a number");
        let rows = text_rows("x", &values);
        assert_eq!(detect_types(&rows)["x"], ColumnType::Number);
    }

    #[test]
    fn detection_is_idempotent() {
        let rows = text_rows("x", &["1", "$2", "3"]);
        assert_eq!(detect_types(&rows), detect_types(&rows));
    }

    struct NeverDates;

    impl DateParser for NeverDates {
        fn parse(&self, _value: &str) -> Option<NaiveDateTime> {
            None
        }
    }

    #[test]
    fn date_strategy_is_pluggable() {
        let rows = text_rows("d", &["2024-01-01"]);
        assert_eq!(detect_types_with(&rows, &NeverDates)["d"], ColumnType::Text);
        assert_eq!(detect_types(&rows)["d"], ColumnType::Date);
    }

    #[test]
    fn summaries_cover_every_header() {
        let rows = vec![
            Row::from_iter([
                ("region", CellValue::Text("north".into())),
                ("sales", CellValue::Text("$1,000".into())),
            ]),
            Row::from_iter([
                ("region", CellValue::Text("north".into())),
                ("sales", CellValue::Text("$3,000".into())),
            ]),
            Row::from_iter([("sales", CellValue::Text("$2,000".into()))]),
        ];
        let headers = first_row_columns(&rows);
        let stats = summarize(&rows);
        let types = detect_types(&rows);
        let summaries = column_summaries(&rows, &headers, &stats, &types);

        assert_eq!(summaries.len(), 2);
        let region = &summaries[0];
        assert_eq!(region.column_type, ColumnType::Text);
        assert_eq!((region.non_empty_count, region.empty_count), (2, 1));
        assert_eq!(region.unique_count, 1);
        assert!(region.stats.is_none());

        let sales = &summaries[1];
        assert_eq!(sales.column_type, ColumnType::Currency);
        assert_eq!(sales.sample_values.len(), 3);
        let formatted = sales.formatted.as_ref().unwrap();
        assert_eq!(formatted.sum, "$6,000.00");
        assert_eq!(formatted.median, "$2,000.00");
    }
}
