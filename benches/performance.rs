use criterion::{criterion_group, criterion_main, Criterion};
use serfun_core::{Endpoint, SeriesValue};
use serfun_operators::builtins::{CsvMux, MovingAverage};
use serfun_operators::testing::VecSource;
use serfun_operators::{Graph, Simple};

fn make_series(rows: usize, stride: usize) -> Vec<SeriesValue> {
    (0..rows)
        .map(|i| SeriesValue::new(format!("{:08}", i * stride), (i % 10) as f64))
        .collect()
}

fn drain(graph: &mut Graph, from: Endpoint) -> usize {
    let mut n = 0;
    while let Ok(Some(_)) = graph.pull(from) {
        n += 1;
    }
    n
}

fn bench_mavg(c: &mut Criterion) {
    let series = make_series(4096, 1);
    c.bench_function("mavg_pull_4096_w20", |b| {
        b.iter(|| {
            let mut g = Graph::new();
            let src = g.add_node(Simple::new(VecSource::new("src", series.clone())));
            let avg = g.add_node(Simple::new(MovingAverage::new(20).unwrap()));
            g.bind(Endpoint::new(src, 0), avg, 0).unwrap();
            drain(&mut g, Endpoint::new(avg, 0))
        })
    });
}

fn bench_csv_merge(c: &mut Criterion) {
    let left = make_series(2048, 2);
    let right = make_series(2048, 3);
    c.bench_function("series2csv_merge_2x2048", |b| {
        b.iter(|| {
            let mut g = Graph::new();
            let a = g.add_node(Simple::new(VecSource::new("a", left.clone())));
            let bb = g.add_node(Simple::new(VecSource::new("b", right.clone())));
            let mux = g.add_node(CsvMux::new(vec!["A".into(), "B".into()]));
            g.bind(Endpoint::new(a, 0), mux, 0).unwrap();
            g.bind(Endpoint::new(bb, 0), mux, 1).unwrap();
            drain(&mut g, Endpoint::new(mux, 0))
        })
    });
}

criterion_group!(operators, bench_mavg, bench_csv_merge);
criterion_main!(operators);
