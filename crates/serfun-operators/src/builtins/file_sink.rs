//! `toFile`: write the text form of each value, one per line.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serfun_core::error::{Error, Result};
use serfun_core::{NodeId, SeriesValue};

use crate::arg::HoseArg;
use crate::base::{Simple, SimpleHose};
use crate::builtins::{expect_arity, string_arg};
use crate::graph::{Graph, Ports};

/// Writes every value it sees. Pulled values are forwarded; pushed values stop here.
pub struct FileSink {
    out: Box<dyn Write + Send>,
    lines: usize,
}

impl FileSink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out, lines: 0 }
    }

    /// Create (or truncate) `path`, making parent directories as needed.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path).map_err(|e| {
            Error::Storage(format!("cannot create {}: {e}", path.display()))
        })?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    /// One line per value; text that already ends in a newline (CSV rows) is not doubled.
    fn write(&mut self, value: &SeriesValue) -> Result<()> {
        let text = value.to_string();
        self.out.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            self.out.write_all(b"\n")?;
        }
        self.out.flush()?;
        self.lines += 1;
        Ok(())
    }
}

impl SimpleHose for FileSink {
    fn name(&self) -> &str {
        "toFile"
    }

    fn pull(&mut self, ports: &mut Ports<'_>) -> Result<Option<SeriesValue>> {
        let next = ports.pull(0)?;
        if let Some(v) = &next {
            self.write(v)?;
        }
        Ok(next)
    }

    fn push(&mut self, value: SeriesValue, _ports: &mut Ports<'_>) -> Result<()> {
        self.write(&value)
    }

    fn finish(&mut self, _ports: &mut Ports<'_>) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

pub(crate) fn make(args: Vec<HoseArg>, graph: &mut Graph) -> Result<NodeId> {
    expect_arity("toFile", &args, 2, 2)?;
    let path = string_arg("toFile", "path", &args[1])?;
    let id = graph.add_node(Simple::new(FileSink::create(&path)?));
    args[0].bind_to(graph, id, 0)?;
    Ok(id)
}
