//! `series2csv`: merge several streams by column key into CSV rows.

use serfun_core::error::{Error, Result};
use serfun_core::{NodeId, SeriesValue};

use crate::arg::HoseArg;
use crate::graph::{Graph, Ports};
use crate::traits::Hose;

/// Label of the key column in the header row.
pub const DATE_HEADER: &str = "Date";

/// Fan-in CSV writer over `N` streams. Pull only.
///
/// The first pull yields the header row. After that each pull yields one row for
/// the smallest column key held by any stream, with `NaN` for streams that have no
/// value at that key. Each row is a string value keyed by its column and ends in `\n`.
pub struct CsvMux {
    headers: Vec<String>,
    heads: Vec<Option<SeriesValue>>,
    drained: Vec<bool>,
    done: Vec<bool>,
    header_sent: bool,
    terminated: bool,
}

impl CsvMux {
    pub fn new(headers: Vec<String>) -> Self {
        let n = headers.len();
        Self {
            headers,
            heads: vec![None; n],
            drained: vec![false; n],
            done: vec![false; n],
            header_sent: false,
            terminated: false,
        }
    }

    /// Fill empty heads. Values without a column can never be placed and are skipped.
    fn refill(&mut self, ports: &mut Ports<'_>) -> Result<()> {
        for i in 0..self.heads.len() {
            while self.heads[i].is_none() && !self.drained[i] {
                match ports.pull(i)? {
                    Some(v) if v.column.is_null() => continue,
                    Some(v) => self.heads[i] = Some(v),
                    None => self.drained[i] = true,
                }
            }
        }
        Ok(())
    }

    fn next_row(&mut self) -> Result<Option<SeriesValue>> {
        let date = self
            .heads
            .iter()
            .flatten()
            .filter_map(|h| h.column.as_str())
            .min()
            .map(str::to_string);
        let Some(date) = date else {
            return Ok(None);
        };

        let mut fields = Vec::with_capacity(self.heads.len() + 1);
        fields.push(date.clone());
        for head in &mut self.heads {
            let at_date = matches!(head, Some(h) if h.column.as_str() == Some(date.as_str()));
            match if at_date { head.take() } else { None } {
                Some(h) => fields.push(h.to_string()),
                None => fields.push("NaN".to_string()),
            }
        }
        Ok(Some(SeriesValue::new(date, csv_row(&fields)?)))
    }
}

/// One CSV record with standard quoting, newline-terminated.
pub fn csv_row<S: AsRef<str>>(fields: &[S]) -> Result<String> {
    let mut writer = ::csv::WriterBuilder::new()
        .terminator(::csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer
        .write_record(fields.iter().map(|f| f.as_ref()))
        .map_err(write_error)?;
    let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| Error::Decode(format!("csv row: {e}")))
}

fn write_error(e: ::csv::Error) -> Error {
    Error::Io(e.into())
}

impl Hose for CsvMux {
    fn name(&self) -> &str {
        "series2csv"
    }

    fn inputs(&self) -> usize {
        self.headers.len()
    }

    fn outputs(&self) -> usize {
        1
    }

    fn pull_value(&mut self, _output: usize, ports: &mut Ports<'_>) -> Result<Option<SeriesValue>> {
        if !self.header_sent {
            self.header_sent = true;
            let mut fields = Vec::with_capacity(self.headers.len() + 1);
            fields.push(DATE_HEADER.to_string());
            fields.extend(self.headers.iter().cloned());
            return Ok(Some(SeriesValue::unkeyed(csv_row(&fields)?)));
        }
        if self.terminated {
            return Ok(None);
        }
        self.refill(ports)?;
        let row = self.next_row()?;
        if row.is_none() {
            self.terminated = true;
        }
        Ok(row)
    }

    fn push_value(&mut self, _value: SeriesValue, _input: usize, _ports: &mut Ports<'_>) -> Result<()> {
        Err(Error::Unsupported("series2csv only works in pull mode".into()))
    }

    fn terminate_stream(&mut self, input: usize, ports: &mut Ports<'_>) -> Result<()> {
        self.done[input] = true;
        if self.done.iter().all(|d| *d) && !self.terminated {
            self.terminated = true;
            ports.terminate(0)?;
        }
        Ok(())
    }

    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

pub(crate) fn make(args: Vec<HoseArg>, graph: &mut Graph) -> Result<NodeId> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(Error::ArityOrType(
            "Usage: series2csv [header stream]+".into(),
        ));
    }
    let mut headers = Vec::with_capacity(args.len() / 2);
    for pair in args.chunks(2) {
        if !pair[0].is_string() {
            return Err(Error::ArityOrType(format!(
                "series2csv header must be a string, got {}",
                pair[0].kind()
            )));
        }
        if !pair[1].is_series() {
            return Err(Error::ArityOrType(format!(
                "series2csv input for '{}' must be a stream, got {}",
                pair[0].as_string()?,
                pair[1].kind()
            )));
        }
        headers.push(pair[0].as_string()?);
    }
    let id = graph.add_node(CsvMux::new(headers));
    for (i, pair) in args.chunks(2).enumerate() {
        pair[1].bind_to(graph, id, i)?;
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Simple;
    use crate::testing::VecSource;
    use serfun_core::Endpoint;

    fn source(g: &mut Graph, name: &str, points: &[(&str, &str)]) -> NodeId {
        let values = points
            .iter()
            .map(|(c, v)| SeriesValue::new(*c, *v))
            .collect();
        g.add_node(Simple::new(VecSource::new(name, values)))
    }

    fn rows(g: &mut Graph, id: NodeId) -> Vec<String> {
        std::iter::from_fn(|| g.pull(Endpoint::new(id, 0)).unwrap())
            .map(|v| v.as_string().unwrap())
            .collect()
    }

    #[test]
    fn merges_by_smallest_key() {
        let mut g = Graph::new();
        let a = source(&mut g, "a", &[("1", "a1"), ("2", "a2"), ("4", "a4")]);
        let b = source(&mut g, "b", &[("2", "b2"), ("3", "b3")]);
        let id = make(
            vec![
                HoseArg::scalar("A"),
                HoseArg::stream(a),
                HoseArg::scalar("B"),
                HoseArg::stream(b),
            ],
            &mut g,
        )
        .unwrap();

        assert_eq!(
            rows(&mut g, id),
            vec![
                "Date,A,B\n",
                "1,a1,NaN\n",
                "2,a2,b2\n",
                "3,NaN,b3\n",
                "4,a4,NaN\n",
            ]
        );
        assert!(g.is_terminated(id));
    }

    #[test]
    fn fields_are_quoted_when_needed() {
        assert_eq!(csv_row(&["x,y", "plain", "say \"hi\""]).unwrap(), "\"x,y\",plain,\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn writer_failures_are_io_errors() {
        let broken = ::csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::WriteZero,
            "sink full",
        ));
        let err = write_error(broken);
        assert!(matches!(err, Error::Io(_)), "{err}");
        assert!(err.to_string().contains("sink full"), "{err}");
    }

    #[test]
    fn push_is_refused() {
        let mut g = Graph::new();
        let a = source(&mut g, "a", &[]);
        let id = make(vec![HoseArg::scalar("A"), HoseArg::stream(a)], &mut g).unwrap();
        assert!(matches!(
            g.push(id, 0, SeriesValue::new("1", 1i64)),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn terminates_only_after_every_input() {
        let mut g = Graph::new();
        let a = source(&mut g, "a", &[]);
        let b = source(&mut g, "b", &[]);
        let id = make(
            vec![
                HoseArg::scalar("A"),
                HoseArg::stream(a),
                HoseArg::scalar("B"),
                HoseArg::stream(b),
            ],
            &mut g,
        )
        .unwrap();
        g.terminate(id, 1).unwrap();
        assert!(!g.is_terminated(id));
        g.terminate(id, 0).unwrap();
        assert!(g.is_terminated(id));
    }

    #[test]
    fn argument_shape_is_checked() {
        let mut g = Graph::new();
        let a = source(&mut g, "a", &[]);
        let odd = make(vec![HoseArg::scalar("A")], &mut g).unwrap_err();
        assert!(odd.to_string().contains("Usage: series2csv"));
        assert!(make(vec![HoseArg::stream(a), HoseArg::scalar("A")], &mut g).is_err());
        assert!(make(vec![HoseArg::scalar("A"), HoseArg::scalar("B")], &mut g).is_err());
    }
}
