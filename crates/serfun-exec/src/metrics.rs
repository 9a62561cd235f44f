//! Metrics hooks. With the `tracing` feature each call becomes a trace span with one
//! event per key/value pair; without it they compile to nothing.

#[cfg(feature = "tracing")]
pub fn emit_span(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::trace_span!("serfun", event);
    let _entered = span.enter();
    for (k, v) in key_values {
        tracing::trace!(%k, %v, "metric");
    }
}

#[cfg(not(feature = "tracing"))]
pub fn emit_span(_event: &str, _key_values: &[(&str, String)]) {}
