//! CSV → series ingest.
//!
//! One row per column key. The sort column (index 0 unless configured) supplies the
//! key; every other cell becomes a point in a series of its own. Without explicit
//! bindings each non-key column is read as decimals into `<prefix><header>`, with
//! the header reduced to alphanumerics and `_`. Cells that do not parse as numbers
//! are stored as `NaN`.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serfun_core::{SeriesValue, Value};
use serfun_io::SeriesStore;

use crate::metrics::emit_span;
use crate::runtime::ExecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Decimal,
    /// Unparsable cells are skipped.
    Long,
    String,
    /// `true`/`false` in any case; other cells are skipped.
    Boolean,
}

/// Explicit column → series mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub column: usize,
    pub path: String,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub rows: usize,
    pub points: usize,
    /// Series written, sorted.
    pub series: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CsvIngest {
    prefix: String,
    sort_column: usize,
    header_rows: usize,
    delimiter: u8,
    bindings: Vec<Binding>,
}

impl CsvIngest {
    /// `prefix` is prepended verbatim to every derived series path, e.g. `"acme/px_"`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            sort_column: 0,
            header_rows: 1,
            delimiter: b',',
            bindings: Vec::new(),
        }
    }

    pub fn sort_column(mut self, index: usize) -> Self {
        self.sort_column = index;
        self
    }

    /// Lines before the data; the last of them names the columns.
    pub fn header_rows(mut self, n: usize) -> Self {
        self.header_rows = n.max(1);
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Route `column` into `path` instead of the derived series.
    pub fn bind(mut self, column: usize, path: impl Into<String>, kind: ColumnKind) -> Self {
        self.bindings.push(Binding {
            column,
            path: path.into(),
            kind,
        });
        self
    }

    pub fn ingest_path(
        &self,
        path: impl AsRef<Path>,
        store: &dyn SeriesStore,
    ) -> Result<IngestReport, ExecError> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| {
            ExecError::Ingest(format!("open {}: {e}", path.as_ref().display()))
        })?;
        self.ingest(file, store)
    }

    pub fn ingest<R: Read>(&self, reader: R, store: &dyn SeriesStore) -> Result<IngestReport, ExecError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(reader);
        let mut records = rdr.records();

        let mut header = None;
        for _ in 0..self.header_rows {
            header = Some(
                records
                    .next()
                    .ok_or_else(|| ExecError::Ingest("missing header row".into()))??,
            );
        }
        let header: Vec<String> = header
            .map(|h| h.iter().map(sanitize_header).collect())
            .unwrap_or_default();

        let mut batches: BTreeMap<String, Vec<SeriesValue>> = BTreeMap::new();
        let mut rows = 0usize;
        for (line, record) in records.enumerate() {
            let record = record?;
            let key = record.get(self.sort_column).ok_or_else(|| {
                ExecError::Ingest(format!(
                    "data row {} has no sort column {}",
                    line + 1,
                    self.sort_column
                ))
            })?;
            rows += 1;

            if self.bindings.is_empty() {
                for (i, cell) in record.iter().enumerate() {
                    if i == self.sort_column {
                        continue;
                    }
                    let name = header.get(i).cloned().unwrap_or_else(|| format!("col{i}"));
                    batches
                        .entry(format!("{}{name}", self.prefix))
                        .or_default()
                        .push(SeriesValue::new(key, parse_decimal(cell)));
                }
                continue;
            }

            for binding in &self.bindings {
                let Some(cell) = record.get(binding.column) else {
                    continue;
                };
                let value = match binding.kind {
                    ColumnKind::Decimal => parse_decimal(cell),
                    ColumnKind::Long => match cell.trim().parse::<i64>() {
                        Ok(n) => Value::Long(n),
                        Err(_) => continue,
                    },
                    ColumnKind::String => Value::String(cell.to_string()),
                    ColumnKind::Boolean => match cell.trim().to_ascii_lowercase().as_str() {
                        "true" => Value::Boolean(true),
                        "false" => Value::Boolean(false),
                        _ => continue,
                    },
                };
                batches
                    .entry(binding.path.clone())
                    .or_default()
                    .push(SeriesValue::new(key, value));
            }
        }

        let mut report = IngestReport {
            rows,
            ..IngestReport::default()
        };
        for (path, points) in batches {
            store.add_points_to_series(&path, &points)?;
            report.points += points.len();
            report.series.push(path);
        }

        emit_span(
            "ingest",
            &[
                ("rows", report.rows.to_string()),
                ("points", report.points.to_string()),
                ("series", report.series.len().to_string()),
            ],
        );

        Ok(report)
    }
}

/// Trimmed, with every character other than alphanumerics and `_` replaced by `_`.
pub fn sanitize_header(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn parse_decimal(cell: &str) -> Value {
    Value::Decimal(cell.trim().parse::<f64>().unwrap_or(f64::NAN))
}
