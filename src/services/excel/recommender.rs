use super::types::{ChartKind, ColumnType, ColumnTypeMap};

/// Chart kinds suited to a sheet, judged only on its column classification.
///
/// Numeric columns are number/currency/percent, categorical ones text/date.
/// The result is deduplicated in first-seen order and never empty.
pub fn recommend(types: &ColumnTypeMap) -> Vec<ChartKind> {
    let numeric = types.values().filter(|t| t.is_numeric()).count();
    let categorical = types.values().filter(|t| t.is_categorical()).count();
    let has_date = types.values().any(|t| *t == ColumnType::Date);

    let mut candidates = Vec::new();

    if numeric >= 1 && categorical >= 1 {
        candidates.extend([ChartKind::Bar, ChartKind::Line]);
        if has_date {
            candidates.push(ChartKind::Area);
        }
    }
    if numeric >= 2 {
        candidates.push(ChartKind::Scatter);
    }
    if numeric == 1 && categorical == 1 {
        candidates.push(ChartKind::Pie);
    }
    if numeric >= 3 {
        candidates.push(ChartKind::Radar);
    }

    let mut recommendations: Vec<ChartKind> = Vec::with_capacity(candidates.len());
    for kind in candidates {
        if !recommendations.contains(&kind) {
            recommendations.push(kind);
        }
    }

    if recommendations.is_empty() {
        recommendations.push(ChartKind::Bar);
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(entries: &[(&str, ColumnType)]) -> ColumnTypeMap {
        entries
            .iter()
            .map(|(name, kind)| (name.to_string(), *kind))
            .collect()
    }

    #[test]
    fn one_number_one_text() {
        let result = recommend(&types(&[("a", ColumnType::Number), ("b", ColumnType::Text)]));
        assert_eq!(result, vec![ChartKind::Bar, ChartKind::Line, ChartKind::Pie]);
    }

    #[test]
    fn empty_map_falls_back_to_bar() {
        assert_eq!(recommend(&ColumnTypeMap::new()), vec![ChartKind::Bar]);
    }

    #[test]
    fn three_numbers_get_scatter_and_radar() {
        let result = recommend(&types(&[
            ("a", ColumnType::Number),
            ("b", ColumnType::Number),
            ("c", ColumnType::Number),
        ]));
        assert_eq!(result, vec![ChartKind::Scatter, ChartKind::Radar]);
    }

    #[test]
    fn dates_add_area_after_bar_and_line() {
        let result = recommend(&types(&[
            ("day", ColumnType::Date),
            ("sales", ColumnType::Currency),
            ("margin", ColumnType::Percent),
        ]));
        assert_eq!(
            result,
            vec![ChartKind::Bar, ChartKind::Line, ChartKind::Area, ChartKind::Scatter]
        );
    }

    #[test]
    fn date_without_numbers_adds_nothing() {
        let result = recommend(&types(&[("day", ColumnType::Date), ("note", ColumnType::Text)]));
        assert_eq!(result, vec![ChartKind::Bar]);
    }

    #[test]
    fn unknown_columns_count_for_nothing() {
        let result = recommend(&types(&[
            ("a", ColumnType::Number),
            ("b", ColumnType::Unknown),
            ("c", ColumnType::Text),
        ]));
        assert_eq!(result, vec![ChartKind::Bar, ChartKind::Line, ChartKind::Pie]);
    }

    #[test]
    fn kinds_render_lowercase() {
        let json = serde_json::to_string(&recommend(&ColumnTypeMap::new())).unwrap();
        assert_eq!(json, r#"["bar"]"#);
        assert_eq!(ChartKind::Scatter.as_str(), "scatter");
    }
}
