//! Row-to-row functions meant to be chained with
//! [`Transformer::map`](crate::transformer::Transformer::map).

use super::{Row, Value};
use crate::types::Error;

/// Deepest mapping nesting [`flatten`] will follow.
pub const MAX_FLATTEN_DEPTH: usize = 128;

/// Collapses nested mappings into dot-joined keys.
///
/// `{"a": {"b": "v"}}` becomes `{"a.b": "v"}`. A nested mapping with no
/// fields contributes nothing to the output.
pub fn flatten(row: Row) -> Result<Row, Error> {
    let mut flat = Row::new();
    for (key, value) in row {
        flatten_into(&mut flat, key, value, 1)?;
    }
    Ok(flat)
}

fn flatten_into(flat: &mut Row, key: String, value: Value, depth: usize) -> Result<(), Error> {
    match value {
        Value::Object(fields) => {
            if depth > MAX_FLATTEN_DEPTH {
                return Err(Error::NestingTooDeep {
                    key,
                    limit: MAX_FLATTEN_DEPTH,
                });
            }
            for (part, value) in fields {
                flatten_into(flat, format!("{key}.{part}"), value, depth + 1)?;
            }
        }
        scalar => {
            flat.insert(key, scalar);
        }
    }
    Ok(())
}

/// Replaces every top-level sequence value with its compact JSON text.
///
/// Scalars and mappings are left alone, element order is preserved.
pub fn stringify_arrays(row: Row) -> Result<Row, Error> {
    row.into_iter()
        .map(|(key, value)| -> Result<(String, Value), Error> {
            match value {
                Value::Array(_) => Ok((key, Value::String(serde_json::to_string(&value)?))),
                other => Ok((key, other)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => Row::from(map),
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_flatten_nested() {
        let out = flatten(row(json!({
            "key1": {"key2": {"key3": "val1", "key4": "val2"}}
        })))
        .unwrap();

        assert_eq!(
            out,
            row(json!({"key1.key2.key3": "val1", "key1.key2.key4": "val2"}))
        );
    }

    #[test]
    fn test_flatten_keeps_scalars_and_arrays() {
        let out = flatten(row(json!({
            "id": 1,
            "name": {"first": "Ada", "last": "Lovelace"},
            "tags": [{"x": 1}],
            "active": true
        })))
        .unwrap();

        assert_eq!(
            out,
            row(json!({
                "id": 1,
                "name.first": "Ada",
                "name.last": "Lovelace",
                "tags": [{"x": 1}],
                "active": true
            }))
        );
    }

    #[test]
    fn test_flatten_is_idempotent_on_flat_rows() {
        let flat = row(json!({"a": 1, "b.c": "x", "d": null}));
        assert_eq!(flatten(flat.clone()).unwrap(), flat);
    }

    #[test]
    fn test_flatten_drops_empty_mappings() {
        let out = flatten(row(json!({"a": {}, "b": 2}))).unwrap();
        assert_eq!(out, row(json!({"b": 2})));
    }

    #[test]
    fn test_flatten_rejects_excessive_depth() {
        let mut value = json!("leaf");
        for _ in 0..=MAX_FLATTEN_DEPTH {
            value = json!({ "k": value });
        }
        let input = Row::new().with("root", value);

        let err = flatten(input).unwrap_err();
        assert!(matches!(err, Error::NestingTooDeep { limit: MAX_FLATTEN_DEPTH, .. }));
    }

    #[test]
    fn test_stringify_arrays() {
        let out = stringify_arrays(row(json!({"key": ["val1", "val2"]}))).unwrap();
        assert_eq!(out, row(json!({"key": r#"["val1","val2"]"#})));
    }

    #[test]
    fn test_stringify_arrays_leaves_other_values() {
        let input = row(json!({
            "n": 3.5,
            "s": "text",
            "m": {"inner": [1, 2]},
            "b": false
        }));

        assert_eq!(stringify_arrays(input.clone()).unwrap(), input);
    }

    #[test]
    fn test_stringify_nested_arrays() {
        let out = stringify_arrays(row(json!({"k": [[1, 2], {"a": "b"}]}))).unwrap();
        assert_eq!(out.get("k"), Some(&json!(r#"[[1,2],{"a":"b"}]"#)));
    }
}
