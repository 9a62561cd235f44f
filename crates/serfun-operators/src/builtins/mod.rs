//! Built-in operators and their factories.
//!
//! | name | shape | arguments |
//! |---|---|---|
//! | `load` | source | `'authority/path'` or `'authority', 'path'` |
//! | `store` | 1 → 1 | stream, then a path as for `load` |
//! | `mavg` | 1 → 1 | stream, window size ≥ 1 |
//! | `sample` | 1 → 1 | stream, rate ≥ 2 |
//! | `split` | 1 → n | stream, fan ≥ 2 |
//! | `total` | 1 → 1 | stream |
//! | `skipNaN` | 1 → 1 | stream |
//! | `toFile` | 1 → 1 | stream, file path |
//! | `series2csv` | n → 1 | `header, stream` pairs |

pub mod csv_mux;
pub mod file_sink;
pub mod load;
pub mod sample;
pub mod skip_nan;
pub mod split;
pub mod store;
pub mod total;
pub mod window;

use std::sync::Arc;

use serfun_core::error::{Error, Result};
use serfun_io::SeriesStore;

use crate::arg::HoseArg;
use crate::registry::Registry;

pub use csv_mux::CsvMux;
pub use file_sink::FileSink;
pub use load::Load;
pub use sample::Sample;
pub use skip_nan::SkipNaN;
pub use split::Split;
pub use store::Store;
pub use total::RunningTotal;
pub use window::MovingAverage;

/// Register every built-in. `load` and `store` share `store`; `load` pages by `page_size`.
pub fn register_builtins(
    registry: &mut Registry,
    store: Arc<dyn SeriesStore>,
    page_size: usize,
) -> Result<()> {
    let source = Arc::clone(&store);
    registry.register_fn("load", move |args, graph, _| {
        load::make(Arc::clone(&source), page_size, args, graph)
    })?;
    let sink = Arc::clone(&store);
    registry.register_fn("store", move |args, graph, _| {
        store::make(Arc::clone(&sink), args, graph)
    })?;
    registry.register_fn("mavg", |args, graph, _| window::make(args, graph))?;
    registry.register_fn("sample", |args, graph, _| sample::make(args, graph))?;
    registry.register_fn("split", |args, graph, _| split::make(args, graph))?;
    registry.register_fn("total", |args, graph, _| total::make(args, graph))?;
    registry.register_fn("skipNaN", |args, graph, _| skip_nan::make(args, graph))?;
    registry.register_fn("toFile", |args, graph, _| file_sink::make(args, graph))?;
    registry.register_fn("series2csv", |args, graph, _| csv_mux::make(args, graph))?;
    Ok(())
}

impl Registry {
    /// A registry holding exactly the built-ins.
    pub fn with_builtins(store: Arc<dyn SeriesStore>, page_size: usize) -> Result<Self> {
        let mut registry = Registry::new();
        register_builtins(&mut registry, store, page_size)?;
        Ok(registry)
    }
}

pub(crate) fn expect_arity(name: &str, args: &[HoseArg], min: usize, max: usize) -> Result<()> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let wanted = if min == max {
        min.to_string()
    } else {
        format!("{min} to {max}")
    };
    Err(Error::ArityOrType(format!(
        "{name} expects {wanted} arguments, got {}",
        args.len()
    )))
}

/// Integer parameter with a lower bound, as a count.
pub(crate) fn count_arg(name: &str, what: &str, arg: &HoseArg, min: i64) -> Result<usize> {
    let n = match arg {
        HoseArg::Scalar(v) if v.is_long() => v.as_long()?,
        other => {
            return Err(Error::ArityOrType(format!(
                "{name} {what} must be an integer, got {}",
                other.kind()
            )))
        }
    };
    if n < min {
        return Err(Error::ArityOrType(format!(
            "{name} {what} must be at least {min}, got {n}"
        )));
    }
    usize::try_from(n).map_err(|_| Error::ArityOrType(format!("{name} {what} {n} is too large")))
}

pub(crate) fn string_arg(name: &str, what: &str, arg: &HoseArg) -> Result<String> {
    if !arg.is_string() {
        return Err(Error::ArityOrType(format!(
            "{name} {what} must be a string, got {}",
            arg.kind()
        )));
    }
    arg.as_string()
}

/// `'a/b'` or `'a', 'b'` → `a/b`.
pub(crate) fn series_path(name: &str, args: &[HoseArg]) -> Result<String> {
    match args {
        [path] => string_arg(name, "path", path),
        [authority, path] => {
            let authority = string_arg(name, "authority", authority)?;
            let path = string_arg(name, "path", path)?;
            Ok(format!(
                "{}/{}",
                authority.trim_end_matches('/'),
                path.trim_start_matches('/')
            ))
        }
        _ => Err(Error::ArityOrType(format!(
            "{name} expects a path or an authority and a path"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serfun_io::MemorySeriesStore;

    #[test]
    fn builtins_are_all_registered() {
        let reg = Registry::with_builtins(Arc::new(MemorySeriesStore::new()), 1000).unwrap();
        let names: Vec<_> = reg.names().collect();
        for name in [
            "load",
            "store",
            "mavg",
            "sample",
            "split",
            "total",
            "skipNaN",
            "toFile",
            "series2csv",
        ] {
            assert!(names.contains(&name), "missing {name}");
        }
    }

    #[test]
    fn path_forms_join_authority() {
        let one = [HoseArg::scalar("acme/px")];
        let two = [HoseArg::scalar("acme/"), HoseArg::scalar("/px")];
        assert_eq!(series_path("load", &one).unwrap(), "acme/px");
        assert_eq!(series_path("load", &two).unwrap(), "acme/px");
        assert!(series_path("load", &[HoseArg::scalar(3i64)]).is_err());
    }

    #[test]
    fn count_arg_enforces_bounds() {
        assert_eq!(count_arg("mavg", "range", &HoseArg::scalar(3i64), 1).unwrap(), 3);
        assert!(count_arg("sample", "rate", &HoseArg::scalar(1i64), 2).is_err());
        assert!(count_arg("mavg", "range", &HoseArg::scalar(2.5), 1).is_err());
    }
}
