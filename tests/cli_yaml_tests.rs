//! YAML job manifests and how the engine runs them.

use std::sync::Arc;

use serfun_core::{EngineConfig, SeriesValue};
use serfun_exec::{Engine, ScriptArg};
use serfun_io::{MemorySeriesStore, SeriesStore};
use serfun_planner::{parse_job, ArgSpec};

#[test]
fn test_parse_job_with_program_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("smooth.sf"),
        "(o) <- smooth(x, long n)\no <- mavg(x, n)\n",
    )
    .unwrap();

    let job = parse_job(
        r#"
program: smooth.sf
args:
  - type: stream
    path: acme/px
  - type: long
    value: 2
"#,
    )
    .unwrap();
    assert!(job.config.is_none());
    assert!(job.output.is_none());
    let source = job.program_source(dir.path()).unwrap();
    assert!(source.starts_with("(o) <- smooth"));
}

#[test]
fn test_job_runs_through_the_engine() {
    let job = parse_job(
        r#"
config:
  page_size: 2
source: |
  # cumulative sum of a sampled series
  (o) <- cum(x, long rate)
  o <- total(sample(x, rate))
args:
  - { type: stream, path: "acme/px" }
  - { type: long, value: 2 }
"#,
    )
    .unwrap();

    let mut cfg = EngineConfig::default();
    job.config.as_ref().unwrap().apply(&mut cfg).unwrap();
    assert_eq!(cfg.page_size, 2);

    let store = Arc::new(MemorySeriesStore::new());
    let points = (1..=6i64)
        .map(|i| SeriesValue::new(format!("d{i}"), i))
        .collect::<Vec<_>>();
    store.add_points_to_series("acme/px", &points).unwrap();

    let engine = Engine::with_store(cfg, store).unwrap();
    let source = job.program_source(std::path::Path::new(".")).unwrap();
    let args = job.args.into_iter().map(ScriptArg::from).collect();
    let out = engine.run_script(&source, args).unwrap();
    let totals = out.iter().map(|v| v.as_long().unwrap()).collect::<Vec<_>>();
    assert_eq!(totals, vec![2, 6, 12]);
}

#[test]
fn test_invalid_manifests() {
    assert!(parse_job("args: [ { type: stream } ]").is_err());
    assert!(parse_job("config: { page_size: -1 }").is_err());
    let job = parse_job("args: [ { type: boolean, value: true } ]").unwrap();
    assert_eq!(job.args, vec![ArgSpec::Boolean { value: true }]);
}
