use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use serfun_core::error::{Error, Result};
use serfun_core::{SeriesValue, Value};

use crate::codec::SeriesValueCodec;
use crate::store::{required_column, SeriesStore};

/// Local filesystem store: each series is a text file under `root`.
///
/// One point per line: `<marker><column><marker><encoded value>`, where the marker is
/// the first printable character not present in the column. Backslashes, newlines and
/// carriage returns are escaped so that every point stays on one line.
#[derive(Debug, Clone)]
pub struct FsSeriesStore {
    root: PathBuf,
}

impl FsSeriesStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn series_file(&self, path: &str) -> Result<PathBuf> {
        let rel = Path::new(path.trim_start_matches('/'));
        if rel.as_os_str().is_empty()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::Storage(format!("invalid series path '{path}'")));
        }
        Ok(self.root.join(rel))
    }

    fn read_series(&self, file: &Path) -> Result<BTreeMap<String, Value>> {
        let mut series = BTreeMap::new();
        if !file.exists() {
            return Ok(series);
        }
        if !file.is_file() {
            return Err(Error::Storage(format!(
                "{} is a folder, not a series",
                file.display()
            )));
        }
        let text = fs::read_to_string(file)?;
        for line in text.split('\n').filter(|l| !l.is_empty()) {
            let (column, payload) = split_line(&unescape(line))?;
            let value = SeriesValueCodec::decode_value(payload.as_bytes())?;
            series.insert(column, value);
        }
        Ok(series)
    }

    fn write_series(&self, file: &Path, series: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("mkparent: {e}")))?;
        }
        let mut buf = Vec::new();
        for (column, value) in series {
            let marker = pick_marker(column)?;
            let payload = SeriesValueCodec::encode_value(value)?;
            let payload = std::str::from_utf8(&payload)
                .map_err(|e| Error::Storage(format!("payload is not UTF-8: {e}")))?;
            let line = format!("{marker}{column}{marker}{payload}");
            buf.extend_from_slice(escape(&line).as_bytes());
            buf.push(b'\n');
        }

        // Write beside the target, then swap in.
        let mut tmp = file.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        let mut f = fs::File::create(&tmp).map_err(|e| Error::Storage(format!("create: {e}")))?;
        f.write_all(&buf)
            .map_err(|e| Error::Storage(format!("write: {e}")))?;
        f.flush()
            .map_err(|e| Error::Storage(format!("flush: {e}")))?;
        fs::rename(&tmp, file).map_err(|e| Error::Storage(format!("rename: {e}")))?;
        Ok(())
    }
}

fn pick_marker(column: &str) -> Result<char> {
    (b' '..=b'~')
        .map(char::from)
        .find(|c| *c != '\\' && !column.contains(*c))
        .ok_or_else(|| Error::Storage(format!("no free marker for column '{column}'")))
}

fn split_line(line: &str) -> Result<(String, String)> {
    let marker = line
        .chars()
        .next()
        .ok_or_else(|| Error::Decode("empty series line".into()))?;
    let start = marker.len_utf8();
    let end = line[start..]
        .find(marker)
        .map(|i| i + start)
        .ok_or_else(|| Error::Decode(format!("unterminated column in '{line}'")))?;
    Ok((
        line[start..end].to_string(),
        line[end + marker.len_utf8()..].to_string(),
    ))
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

impl SeriesStore for FsSeriesStore {
    fn get_points_after(
        &self,
        path: &str,
        after: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<SeriesValue>> {
        let file = self.series_file(path)?;
        let series = self.read_series(&file)?;
        Ok(series
            .into_iter()
            .filter(|(column, _)| after.map_or(true, |a| column.as_str() > a))
            .take(page_size)
            .map(|(column, value)| SeriesValue::new(column, value))
            .collect())
    }

    fn add_point_to_series(&self, path: &str, value: &SeriesValue) -> Result<()> {
        let column = required_column(value)?;
        let file = self.series_file(path)?;
        let mut series = self.read_series(&file)?;
        series.insert(column.to_string(), value.value.clone());

        #[cfg(feature = "tracing")]
        tracing::trace!(path, column, points = series.len(), "fs store append");

        self.write_series(&file, &series)
    }

    /// One read and one rewrite for the whole batch.
    fn add_points_to_series(&self, path: &str, values: &[SeriesValue]) -> Result<()> {
        let file = self.series_file(path)?;
        let mut series = self.read_series(&file)?;
        for value in values {
            series.insert(required_column(value)?.to_string(), value.value.clone());
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(path, added = values.len(), points = series.len(), "fs store batch append");

        self.write_series(&file, &series)
    }

    fn delete_series(&self, path: &str) -> Result<()> {
        let file = self.series_file(path)?;
        if file.is_file() {
            fs::remove_file(&file).map_err(|e| Error::Storage(format!("delete: {e}")))?;
        }
        Ok(())
    }
}
