use super::switch_setters;
use crate::arrays::{ArrayData, NdArray, format_shape};
use crate::capability::Backend;
use crate::comparator::{compare_named_arrays, ensure_supported, is_float_kind};
use crate::domain::{RegressionError, RegressionResult};
use crate::numerics::ToleranceSpec;
use crate::protocol::{CheckOutcome, SnapshotStrategy, SnapshotTarget};
use crate::regression::{Regression, Switches};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const TABLE_EXTENSION: &str = ".csv";
const FIXTURE: &str = "table";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCheck {
    pub basename: Option<String>,
    pub fullpath: Option<PathBuf>,
    pub tolerances: ToleranceSpec,
    /// Row labels written in the index column instead of `0..rows`.
    pub data_index: Option<Vec<String>>,
    /// Pad shorter float columns with NaN instead of rejecting them.
    pub fill_different_shape_with_nan: bool,
}

/// Named 1-D columns sharing one row index.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub labels: Vec<String>,
    pub columns: Vec<(String, NdArray)>,
}

impl Table {
    pub fn rows(&self) -> usize {
        self.labels.len()
    }

    pub fn column(&self, name: &str) -> Option<&NdArray> {
        self.columns
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, column)| column)
    }

    pub fn named_columns(&self) -> Vec<(&str, &NdArray)> {
        self.columns
            .iter()
            .map(|(key, column)| (key.as_str(), column))
            .collect()
    }
}

pub struct TableRegression<'a> {
    regression: &'a Regression,
    switches: Switches,
}

impl<'a> TableRegression<'a> {
    pub(crate) fn new(regression: &'a Regression) -> Self {
        Self {
            regression,
            switches: Switches::default(),
        }
    }

    switch_setters!();

    pub fn check<I, K, V>(&self, columns: I) -> RegressionResult<CheckOutcome>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<NdArray>,
    {
        self.check_with(columns, TableCheck::default())
    }

    pub fn check_with<I, K, V>(&self, columns: I, options: TableCheck) -> RegressionResult<CheckOutcome>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<NdArray>,
    {
        Backend::Csv.require(FIXTURE)?;
        let columns = columns
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        let table = build_table(
            columns,
            options.data_index,
            options.fill_different_shape_with_nan,
        )?;

        let target = SnapshotTarget {
            basename: options.basename,
            fullpath: options.fullpath,
            obtained_filename: None,
        };
        let snapshot = TableSnapshot {
            table,
            tolerances: options.tolerances,
        };
        self.regression
            .run(&target, TABLE_EXTENSION, self.switches, &snapshot)
    }
}

/// Validates columns and lines them up into a [`Table`].
pub fn build_table(
    columns: Vec<(String, NdArray)>,
    data_index: Option<Vec<String>>,
    fill_different_shape_with_nan: bool,
) -> RegressionResult<Table> {
    let mut seen = HashSet::new();
    let mut promoted = Vec::with_capacity(columns.len());
    for (key, column) in columns {
        if !seen.insert(key.clone()) {
            return Err(RegressionError::InvalidInput(format!(
                "column '{key}' was given more than once"
            )));
        }
        ensure_supported(&key, &column, FIXTURE).map_err(RegressionError::InvalidInput)?;
        let column = column.at_least_1d();
        if column.ndim() > 1 {
            return Err(RegressionError::InvalidInput(format!(
                "Only 1-D arrays are supported on {FIXTURE} fixture.\nArray '{key}' with shape {} was given.",
                format_shape(column.shape())
            )));
        }
        promoted.push((key, column));
    }

    let rows = promoted
        .iter()
        .map(|(_, column)| column.size())
        .max()
        .unwrap_or(0);
    if promoted.iter().any(|(_, column)| column.size() != rows) {
        if !fill_different_shape_with_nan {
            return Err(RegressionError::InvalidInput(
                "Data dict with different array lengths will not be accepted. Try setting fill_different_shape_with_nan=true."
                    .to_string(),
            ));
        }
        promoted = promoted
            .into_iter()
            .map(|(key, column)| pad_with_nan(column, rows).map(|column| (key, column)))
            .collect::<RegressionResult<_>>()?;
    }

    let labels = match data_index {
        Some(labels) if labels.len() != rows => {
            return Err(RegressionError::InvalidInput(format!(
                "data_index has {} labels but the table has {rows} rows",
                labels.len()
            )));
        }
        Some(labels) => labels,
        None => (0..rows).map(|row| row.to_string()).collect(),
    };

    Ok(Table {
        labels,
        columns: promoted,
    })
}

fn pad_with_nan(column: NdArray, rows: usize) -> RegressionResult<NdArray> {
    if column.size() == rows {
        return Ok(column);
    }
    if !is_float_kind(&column) {
        return Err(RegressionError::InvalidInput(
            "Checking multiple arrays with different shapes are not supported for non-float arrays"
                .to_string(),
        ));
    }
    let ArrayData::Float(values) = column.data() else {
        return Err(RegressionError::InvalidInput(format!(
            "column of dtype '{}' has no float storage",
            column.dtype()
        )));
    };
    let mut padded = values.clone();
    padded.resize(rows, f64::NAN);
    NdArray::from_raw(column.dtype(), vec![rows], ArrayData::Float(padded))
        .map_err(|error| RegressionError::InvalidInput(error.to_string()))
}

struct TableSnapshot {
    table: Table,
    tolerances: ToleranceSpec,
}

impl SnapshotStrategy for TableSnapshot {
    fn dump(&self, path: &Path) -> RegressionResult<()> {
        write_table(path, &self.table)
    }

    fn compare(&self, obtained: &Path, expected: &Path) -> RegressionResult<()> {
        compare_table_files(obtained, expected, &self.tolerances)
    }
}

/// Compares two CSV snapshots column by column.
pub fn compare_table_files(
    obtained: &Path,
    expected: &Path,
    tolerances: &ToleranceSpec,
) -> RegressionResult<()> {
    let obtained_table = read_table(obtained)?;
    let expected_table = read_table(expected)?;
    compare_named_arrays(
        &obtained_table.named_columns(),
        &expected_table.named_columns(),
        tolerances,
        Some(&obtained_table.labels),
    )?;
    Ok(())
}

#[cfg(feature = "table")]
pub fn write_table(path: &Path, table: &Table) -> RegressionResult<()> {
    codec::write(path, table)
}

#[cfg(not(feature = "table"))]
pub fn write_table(_path: &Path, _table: &Table) -> RegressionResult<()> {
    Err(Backend::Csv.unavailable(FIXTURE))
}

#[cfg(feature = "table")]
pub fn read_table(path: &Path) -> RegressionResult<Table> {
    codec::read(path)
}

#[cfg(not(feature = "table"))]
pub fn read_table(_path: &Path) -> RegressionResult<Table> {
    Err(Backend::Csv.unavailable(FIXTURE))
}

#[cfg(feature = "table")]
mod codec {
    use super::Table;
    use crate::arrays::{ArrayData, NdArray, format_complex};
    use crate::domain::{RegressionError, RegressionResult};
    use crate::numerics::format_g17;
    use num_complex::Complex64;
    use std::path::Path;

    pub(super) fn write(path: &Path, table: &Table) -> RegressionResult<()> {
        let mut writer =
            csv::Writer::from_path(path).map_err(|error| csv_error("write", path, error))?;

        let header = std::iter::once("").chain(table.columns.iter().map(|(key, _)| key.as_str()));
        writer
            .write_record(header)
            .map_err(|error| csv_error("write", path, error))?;

        for (row, label) in table.labels.iter().enumerate() {
            let mut record = Vec::with_capacity(table.columns.len() + 1);
            record.push(label.clone());
            record.extend(table.columns.iter().map(|(_, column)| cell(column, row)));
            writer
                .write_record(&record)
                .map_err(|error| csv_error("write", path, error))?;
        }
        writer
            .flush()
            .map_err(|source| RegressionError::io("write", path, source))
    }

    fn cell(column: &NdArray, row: usize) -> String {
        match column.data() {
            ArrayData::Bool(values) => match values.get(row) {
                Some(true) => "True".to_string(),
                Some(false) => "False".to_string(),
                None => String::new(),
            },
            ArrayData::Int(values) => values.get(row).map(i64::to_string).unwrap_or_default(),
            ArrayData::UInt(values) => values.get(row).map(u64::to_string).unwrap_or_default(),
            ArrayData::Float(values) => values.get(row).map(|value| float_cell(*value)).unwrap_or_default(),
            ArrayData::Complex(values) => values
                .get(row)
                .map(|value| format_complex(*value))
                .unwrap_or_default(),
            ArrayData::Unicode(values) => values.get(row).cloned().unwrap_or_default(),
            ArrayData::Raw(_) | ArrayData::Ticks(_) => String::new(),
        }
    }

    fn float_cell(value: f64) -> String {
        if value.is_nan() {
            return String::new();
        }
        let text = format_g17(value);
        if value.is_finite() && !text.contains(['.', 'e']) {
            format!("{text}.0")
        } else {
            text
        }
    }

    pub(super) fn read(path: &Path) -> RegressionResult<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|error| csv_error("read", path, error))?;
        let names: Vec<String> = reader
            .headers()
            .map_err(|error| csv_error("read", path, error))?
            .iter()
            .skip(1)
            .map(str::to_string)
            .collect();

        let mut labels = Vec::new();
        let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        for record in reader.records() {
            let record = record.map_err(|error| csv_error("read", path, error))?;
            let mut fields = record.iter();
            labels.push(fields.next().unwrap_or_default().to_string());
            for (column, field) in cells.iter_mut().zip(fields) {
                column.push(field.to_string());
            }
        }

        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, column)| (name, infer_column(column)))
            .collect();
        Ok(Table { labels, columns })
    }

    /// Picks the narrowest kind every cell parses as.
    pub(super) fn infer_column(cells: Vec<String>) -> NdArray {
        if !cells.is_empty() && cells.iter().all(|cell| cell == "True" || cell == "False") {
            return NdArray::from_vec(cells.iter().map(|cell| cell == "True").collect::<Vec<_>>());
        }
        if !cells.is_empty() {
            if let Some(ints) = parse_all(&cells, |cell| cell.parse::<i64>().ok()) {
                return NdArray::from_vec(ints);
            }
            if let Some(uints) = parse_all(&cells, |cell| cell.parse::<u64>().ok()) {
                return NdArray::from_vec(uints);
            }
        }
        if let Some(floats) = parse_all(&cells, parse_float) {
            return NdArray::from_vec(floats);
        }
        if let Some(complex) = parse_all(&cells, parse_complex) {
            return NdArray::from_vec(complex);
        }
        NdArray::from_vec(cells)
    }

    fn parse_all<T>(cells: &[String], parse: impl Fn(&str) -> Option<T>) -> Option<Vec<T>> {
        cells.iter().map(|cell| parse(cell)).collect()
    }

    fn parse_float(cell: &str) -> Option<f64> {
        if cell.is_empty() {
            Some(f64::NAN)
        } else {
            cell.parse().ok()
        }
    }

    pub(super) fn parse_complex(cell: &str) -> Option<Complex64> {
        if let Some(inner) = cell.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
            let (re, im) = split_complex(inner.strip_suffix('j')?)?;
            return Some(Complex64::new(re.parse().ok()?, im.parse().ok()?));
        }
        let im = cell.strip_suffix('j')?;
        Some(Complex64::new(0.0, im.parse().ok()?))
    }

    fn split_complex(inner: &str) -> Option<(&str, &str)> {
        let bytes = inner.as_bytes();
        let split = (1..bytes.len())
            .rev()
            .find(|&at| matches!(bytes[at], b'+' | b'-') && !matches!(bytes[at - 1], b'e' | b'E'))?;
        let im = &inner[split..];
        Some((&inner[..split], im.strip_prefix('+').unwrap_or(im)))
    }

    fn csv_error(action: &'static str, path: &Path, error: csv::Error) -> RegressionError {
        if !error.is_io_error() {
            return RegressionError::corrupt(path, error);
        }
        match error.into_kind() {
            csv::ErrorKind::Io(source) => RegressionError::io(action, path, source),
            kind => RegressionError::corrupt(path, format!("{kind:?}")),
        }
    }
}
