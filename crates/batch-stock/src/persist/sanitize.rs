//! Normalize provider payloads before they are written out
//!
//! Providers occasionally hand back table-shaped data in column or split
//! orientation. Those are flattened to plain JSON lists so every artifact
//! reads the same way.

use serde_json::{Map, Value};

/// Recursively rewrite tabular shapes into JSON-native lists
///
/// - `{columns, data, index?}` (split orientation) becomes a list of records
/// - `{index, values}` (a series) becomes the list of values
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(records) = split_table(&map) {
                return Value::Array(records.into_iter().map(sanitize).collect());
            }
            if is_series(&map) {
                if let Some(Value::Array(values)) = map.get("values") {
                    return Value::Array(values.iter().cloned().map(sanitize).collect());
                }
            }
            Value::Object(map.into_iter().map(|(k, v)| (k, sanitize(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        other => other,
    }
}

fn is_series(map: &Map<String, Value>) -> bool {
    map.len() == 2 && map.get("index").is_some_and(Value::is_array) && map.get("values").is_some_and(Value::is_array)
}

fn split_table(map: &Map<String, Value>) -> Option<Vec<Value>> {
    let allowed = ["columns", "data", "index"];
    if map.keys().any(|k| !allowed.contains(&k.as_str())) {
        return None;
    }
    let columns = map.get("columns")?.as_array()?;
    let rows = map.get("data")?.as_array()?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let cells = row.as_array()?;
        if cells.len() != columns.len() {
            return None;
        }
        let record: Map<String, Value> = columns
            .iter()
            .zip(cells)
            .map(|(column, cell)| {
                let key = column
                    .as_str()
                    .map_or_else(|| column.to_string(), ToString::to_string);
                (key, cell.clone())
            })
            .collect();
        records.push(Value::Object(record));
    }
    Some(records)
}
