//! Nested, dotted-path addressable records and their JSON tree form.

use std::collections::BTreeMap;

use serde_json::{Map, Number};

use crate::error::{Error, Result};
use crate::value::{Column, SeriesValue, Value};

/// Field name → value map. Built up with `set_field`, then treated as read-only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Structure {
    fields: BTreeMap<String, Value>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Set `a.b.c`, creating `a` and `a.b` as structures when missing.
    pub fn set_field(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let segments = split_path(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| Error::ArityOrType(format!("invalid field path '{path}'")))?;

        let mut cursor = &mut self.fields;
        for seg in parents {
            let slot = cursor
                .entry((*seg).to_string())
                .or_insert_with(|| Value::Structure(Structure::new()));
            cursor = match slot {
                Value::Structure(inner) => &mut inner.fields,
                other => return Err(Error::wrong("structure", other.kind())),
            };
        }
        cursor.insert((*last).to_string(), value.into());
        Ok(())
    }

    /// Look up `a.b.c`; `None` when any segment is missing or not a structure.
    pub fn get_field(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.fields.get(segments.next()?)?;
        for seg in segments {
            current = match current {
                Value::Structure(inner) => inner.fields.get(seg)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn to_json(&self) -> Result<String> {
        let tree = structure_to_json(self, true)?;
        Ok(serde_json::to_string(&serde_json::Value::Object(tree))?)
    }

    /// Parse a JSON object. Any other top-level tree is a decode error.
    pub fn parse_json(text: &str) -> Result<Structure> {
        let tree: serde_json::Value = serde_json::from_str(text)?;
        match tree {
            serde_json::Value::Object(map) => structure_from_json(map),
            other => Err(Error::Decode(format!(
                "expected a JSON object for a structure, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Pair columns with JSON object texts into keyed structure samples.
    pub fn zip<C, S>(
        columns: impl IntoIterator<Item = C>,
        json_values: impl IntoIterator<Item = S>,
    ) -> Result<Vec<SeriesValue>>
    where
        C: Into<Column>,
        S: AsRef<str>,
    {
        let parsed = json_values
            .into_iter()
            .map(|text| Structure::parse_json(text.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        SeriesValue::zip(columns, parsed)
    }
}

fn split_path(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(Error::ArityOrType(format!("invalid field path '{path}'")));
    }
    Ok(segments)
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn structure_to_json(s: &Structure, strict: bool) -> Result<Map<String, serde_json::Value>> {
    let mut map = Map::new();
    for (k, v) in &s.fields {
        map.insert(k.clone(), value_to_json(v, strict)?);
    }
    Ok(map)
}

fn structure_from_json(map: Map<String, serde_json::Value>) -> Result<Structure> {
    let mut fields = BTreeMap::new();
    for (k, v) in map {
        fields.insert(k, value_from_json(v)?);
    }
    Ok(Structure { fields })
}

/// With `strict` off, values JSON cannot hold are rendered as strings (display only).
pub(crate) fn value_to_json(v: &Value, strict: bool) -> Result<serde_json::Value> {
    Ok(match v {
        Value::Long(n) => serde_json::Value::Number((*n).into()),
        Value::Decimal(d) => match Number::from_f64(*d) {
            Some(n) => serde_json::Value::Number(n),
            None if strict => {
                return Err(Error::Unsupported(format!(
                    "decimal {d} has no JSON representation"
                )))
            }
            None => serde_json::Value::String(d.to_string()),
        },
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Structure(s) => serde_json::Value::Object(structure_to_json(s, strict)?),
        Value::Array(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|item| value_to_json(item, strict))
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Stream(ep) if !strict => serde_json::Value::String(format!("stream:{ep}")),
        Value::Stream(_) => return Err(Error::wrong("json", "stream")),
    })
}

pub(crate) fn value_from_json(v: serde_json::Value) -> Result<Value> {
    Ok(match v {
        serde_json::Value::Null => {
            return Err(Error::Decode("null is not a series value".into()));
        }
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) if !n.is_f64() => Value::Long(i),
            _ => Value::Decimal(
                n.as_f64()
                    .ok_or_else(|| Error::Decode(format!("unrepresentable number {n}")))?,
            ),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(value_from_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        serde_json::Value::Object(map) => Value::Structure(structure_from_json(map)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_paths_create_substructures() {
        let mut s = Structure::new();
        s.set_field("price.bid", 1.25).unwrap();
        s.set_field("price.ask", 1.5).unwrap();
        s.set_field("venue", "lse").unwrap();

        assert_eq!(s.len(), 2);
        assert_eq!(s.get_field("price.ask"), Some(&Value::Decimal(1.5)));
        assert!(s.get_field("price").unwrap().is_structure());
        assert_eq!(s.get_field("price.mid"), None);
        assert_eq!(s.get_field("venue.name"), None);
    }

    #[test]
    fn cannot_descend_through_a_leaf() {
        let mut s = Structure::new();
        s.set_field("a", 1i64).unwrap();
        assert!(matches!(
            s.set_field("a.b", 2i64),
            Err(Error::WrongVariant { .. })
        ));
        assert!(s.set_field("a..b", 2i64).is_err());
    }

    #[test]
    fn json_keeps_number_variants() {
        let s = Structure::parse_json(r#"{"n":3,"d":3.0,"ok":true,"xs":[1,"a"],"in":{"k":"v"}}"#)
            .unwrap();
        assert_eq!(s.get_field("n"), Some(&Value::Long(3)));
        assert_eq!(s.get_field("d"), Some(&Value::Decimal(3.0)));
        assert_eq!(s.get_field("ok"), Some(&Value::Boolean(true)));
        assert_eq!(s.get_field("in.k"), Some(&Value::from("v")));

        let back = Structure::parse_json(&s.to_json().unwrap()).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn json_null_is_rejected() {
        assert!(matches!(
            Structure::parse_json(r#"{"a":null}"#),
            Err(Error::Decode(_))
        ));
        assert!(Structure::parse_json("[1,2]").is_err());
    }

    #[test]
    fn zip_parses_each_text() {
        let rows = Structure::zip(["1", "2"], [r#"{"a":1}"#, r#"{"a":2}"#]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1].as_structure().unwrap().get_field("a"),
            Some(&Value::Long(2))
        );
    }
}
