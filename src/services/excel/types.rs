use serde::{Deserialize, Serialize, Serializer};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

pub const SAMPLE_SIZE: usize = 3;

/// Rows inspected by type detection.
pub const TYPE_DETECTION_ROWS: usize = 100;

/// A single decoded cell. Empty cells are normally dropped from a [`Row`] by the
/// decoder, but the variant is kept so callers can represent explicit nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Empty cells and empty strings carry no value for profiling purposes.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) => write!(f, "{}", number_to_string(*n)),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// Renders integral floats without a trailing `.0` so `3.0` reads as `3`.
pub fn number_to_string(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Column names shared by the rows of one sheet, indexed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Columns {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Columns {
    /// Builds the index; when a name repeats, lookups resolve to its first slot.
    pub fn new(names: Vec<String>) -> Self {
        let mut positions = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            positions.entry(name.clone()).or_insert(idx);
        }
        Self { names, positions }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn push(&mut self, name: String) -> usize {
        let idx = self.names.len();
        self.positions.insert(name.clone(), idx);
        self.names.push(name);
        idx
    }
}

/// One data row: a value slot per column of its sheet, in column order.
/// Columns with no value in this row hold `None` and are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct Row {
    columns: Arc<Columns>,
    values: Vec<Option<CellValue>>,
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row over a shared column set; missing trailing slots are absent.
    pub fn with_columns(columns: Arc<Columns>, mut values: Vec<Option<CellValue>>) -> Self {
        values.resize(columns.len(), None);
        Self { columns, values }
    }

    pub fn columns(&self) -> &Arc<Columns> {
        &self.columns
    }

    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        let column = column.into();
        let idx = match self.columns.position(&column) {
            Some(idx) => idx,
            None => Arc::make_mut(&mut self.columns).push(column),
        };
        if self.values.len() <= idx {
            self.values.resize(idx + 1, None);
        }
        self.values[idx] = Some(value);
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.columns
            .position(column)
            .and_then(|idx| self.value_at(idx))
    }

    /// Value in slot `idx` of this row's column set.
    pub fn value_at(&self, idx: usize) -> Option<&CellValue> {
        self.values.get(idx).and_then(Option::as_ref)
    }

    /// Present cells in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.columns
            .names
            .iter()
            .zip(&self.values)
            .filter_map(|(name, value)| value.as_ref().map(|v| (name.as_str(), v)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(name, _)| name)
    }

    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// Looks a column up across the rows of one sheet. Rows sharing the cached
/// column set are read by slot; any other row falls back to a name lookup.
pub struct ColumnReader<'a> {
    name: &'a str,
    columns: Option<&'a Arc<Columns>>,
    idx: Option<usize>,
}

impl<'a> ColumnReader<'a> {
    pub fn new(rows: &'a [Row], name: &'a str) -> Self {
        let columns = rows.first().map(Row::columns);
        let idx = columns.and_then(|c| c.position(name));
        Self { name, columns, idx }
    }

    pub fn read<'r>(&self, row: &'r Row) -> Option<&'r CellValue> {
        match (self.columns, self.idx) {
            (Some(columns), Some(idx)) if Arc::ptr_eq(columns, &row.columns) => row.value_at(idx),
            _ => row.get(self.name),
        }
    }
}

pub type RowSet = Vec<Row>;

/// Column universe of a row set: the keys of its first row.
pub fn first_row_columns(rows: &[Row]) -> Vec<String> {
    rows.first()
        .map(|row| row.keys().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Decoded result of one uploaded file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workbook {
    pub sheet_names: Vec<String>,
    pub sheets: HashMap<String, RowSet>,
    pub headers: HashMap<String, Vec<String>>,
}

impl Workbook {
    /// Builds a workbook from sheets in source order, deriving headers from
    /// each sheet's first row.
    pub fn from_sheets(sheets: Vec<(String, RowSet)>) -> Self {
        let mut workbook = Workbook {
            sheet_names: Vec::with_capacity(sheets.len()),
            sheets: HashMap::with_capacity(sheets.len()),
            headers: HashMap::with_capacity(sheets.len()),
        };
        for (name, rows) in sheets {
            workbook.headers.insert(name.clone(), first_row_columns(&rows));
            workbook.sheet_names.push(name.clone());
            workbook.sheets.insert(name, rows);
        }
        workbook
    }

    pub fn first_sheet(&self) -> Option<&str> {
        self.sheet_names.first().map(String::as_str)
    }

    pub fn rows(&self, sheet: &str) -> Option<&RowSet> {
        self.sheets.get(sheet)
    }

    pub fn headers(&self, sheet: &str) -> &[String] {
        self.headers.get(sheet).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub mean: f64,
    pub median: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    Currency,
    Percent,
    Date,
    Text,
    Unknown,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Number | ColumnType::Currency | ColumnType::Percent)
    }

    pub fn is_categorical(self) -> bool {
        matches!(self, ColumnType::Text | ColumnType::Date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Area,
    Scatter,
    Pie,
    Radar,
}

impl ChartKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Area => "area",
            ChartKind::Scatter => "scatter",
            ChartKind::Pie => "pie",
            ChartKind::Radar => "radar",
        }
    }
}

pub type ColumnStatsMap = BTreeMap<String, ColumnStats>;
pub type ColumnTypeMap = BTreeMap<String, ColumnType>;

#[derive(Debug, Clone, Serialize)]
pub struct FormattedStats {
    pub min: String,
    pub max: String,
    pub sum: String,
    pub mean: String,
    pub median: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    pub name: String,
    pub column_type: ColumnType,
    pub non_empty_count: usize,
    pub empty_count: usize,
    pub unique_count: usize,
    pub sample_values: SmallVec<[String; SAMPLE_SIZE]>,
    pub stats: Option<ColumnStats>,
    pub formatted: Option<FormattedStats>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetAnalysis {
    pub sheet: String,
    pub row_count: usize,
    pub headers: Vec<String>,
    pub stats: ColumnStatsMap,
    pub column_types: ColumnTypeMap,
    pub columns: Vec<ColumnSummary>,
    pub recommendations: Vec<ChartKind>,
}
