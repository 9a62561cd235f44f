//! Store backends and the value codec they persist with.

use serfun_core::config::StoreConfig;
use serfun_core::error::Error;
use serfun_core::{SeriesValue, Structure, Value};
use serfun_io::{build_store_from_config, FsSeriesStore, SeriesStore, SeriesValueCodec};

fn sample_structure() -> Structure {
    let mut s = Structure::new();
    s.set_field("quote.bid", 1.25).unwrap();
    s.set_field("quote.ask", 1.5).unwrap();
    s.set_field("venue", "XLON").unwrap();
    s.set_field("lots", 3i64).unwrap();
    s
}

#[test]
fn test_codec_round_trips_every_stored_variant() {
    let values = vec![
        Value::Long(-42),
        Value::Decimal(0.1 + 0.2),
        Value::Decimal(f64::NAN),
        Value::String("comma, quote \" and\nnewline".into()),
        Value::Boolean(false),
        Value::Structure(sample_structure()),
    ];
    for value in values {
        let bytes = SeriesValueCodec::encode_value(&value).unwrap();
        let back = SeriesValueCodec::decode_value(&bytes).unwrap();
        match (&value, &back) {
            (Value::Decimal(a), Value::Decimal(b)) if a.is_nan() => assert!(b.is_nan()),
            _ => assert_eq!(value, back),
        }
    }
}

#[test]
fn test_codec_rejects_malformed_input() {
    let malformed: [&[u8]; 6] = [
        b"",
        b"zabc",
        b"lnot-a-number",
        b"bmaybe",
        b"j[1,2]",
        b"j{\"a\":null}",
    ];
    for bytes in malformed {
        let err = SeriesValueCodec::decode_value(bytes).unwrap_err();
        assert!(matches!(err, Error::Decode(_)), "{bytes:?}: {err}");
    }
    assert!(SeriesValueCodec::encode_value(&Value::Array(vec![])).is_err());
}

#[test]
fn test_fs_store_keeps_points_sorted_and_typed() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsSeriesStore::new(dir.path());
    store
        .add_points_to_series(
            "desk/book",
            &[
                SeriesValue::new("2024-03-01", sample_structure()),
                SeriesValue::new("2024-01-01", 7i64),
                SeriesValue::new("2024-02-01", "note with\nnewline and \\ slash"),
            ],
        )
        .unwrap();
    store
        .add_point_to_series("desk/book", &SeriesValue::new("2024-01-01", true))
        .unwrap();

    let reopened = FsSeriesStore::new(dir.path());
    let points = reopened.get_points("desk/book").unwrap();
    let columns = points
        .iter()
        .map(|p| p.column.to_string())
        .collect::<Vec<_>>();
    assert_eq!(columns, vec!["2024-01-01", "2024-02-01", "2024-03-01"]);
    assert_eq!(points[0].value, Value::Boolean(true));
    assert_eq!(
        points[1].as_string().unwrap(),
        "note with\nnewline and \\ slash"
    );
    assert_eq!(
        points[2]
            .as_structure()
            .unwrap()
            .get_field("quote.ask")
            .unwrap(),
        &Value::Decimal(1.5)
    );

    let page = reopened
        .get_points_after("desk/book", Some("2024-01-01"), 1)
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].column.as_str(), Some("2024-02-01"));
}

#[test]
fn test_null_column_is_rejected_by_every_backend() {
    let dir = tempfile::tempdir().unwrap();
    let backends = [
        StoreConfig {
            uri: Some("memory://".into()),
            root: String::new(),
        },
        StoreConfig {
            uri: None,
            root: dir.path().to_string_lossy().to_string(),
        },
    ];
    for cfg in backends {
        let store = build_store_from_config(&cfg).unwrap();
        let err = store
            .add_point_to_series("a/b", &SeriesValue::unkeyed(1i64))
            .unwrap_err();
        assert!(err.to_string().contains("Null column not allowed"), "{err}");
    }
}

#[test]
fn test_unknown_store_scheme() {
    let cfg = StoreConfig {
        uri: Some("s3://bucket/prefix".into()),
        root: String::new(),
    };
    assert!(matches!(
        build_store_from_config(&cfg),
        Err(Error::Config(_))
    ));
}
