//! Turns spreadsheet-style rows (column name -> cell) into ISAAC records.

use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use ulid::Ulid;

/// Columns copied verbatim into the record, by destination path.
const COLUMN_PATHS: &[(&str, &[&str])] = &[
    ("Environment", &["context", "environment"]),
    ("Cell Type", &["context", "electrochemistry", "cell_type"]),
    ("Potential Scale", &["context", "electrochemistry", "potential_scale"]),
    ("Reaction", &["context", "electrochemistry", "reaction"]),
    ("Flow Mode", &["context", "transport", "flow_mode"]),
    ("Sample Form", &["sample", "sample_form"]),
];

/// Empty strings and nulls count as blank cells.
fn cell<'a>(row: &'a Map<String, Value>, column: &str) -> Option<&'a Value> {
    row.get(column).filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    })
}

fn text_or(row: &Map<String, Value>, column: &str, default: &str) -> Value {
    cell(row, column)
        .cloned()
        .unwrap_or_else(|| Value::String(default.to_string()))
}

fn insert_path(target: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut node = target;
    for key in parents {
        let entry = node
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        node = next;
    }
    node.insert(last.to_string(), value);
}

fn as_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        _ => None,
    }
}

/// Build a fresh record from one row. Each call assigns a new ULID `record_id`.
pub fn build_record(row: &Map<String, Value>) -> Value {
    let mut record = Map::new();
    record.insert("isaac_record_version".into(), json!("1.0"));
    record.insert("record_id".into(), json!(Ulid::new().to_string()));
    record.insert("record_type".into(), text_or(row, "Record Type", "evidence"));
    record.insert(
        "record_domain".into(),
        text_or(row, "Record Domain", "characterization"),
    );
    if let Ok(now) = OffsetDateTime::now_utc().format(&Rfc3339) {
        record.insert("timestamps".into(), json!({ "created_utc": now }));
    }
    record.insert(
        "acquisition_source".into(),
        json!({ "source_type": text_or(row, "Source Type", "laboratory") }),
    );

    for (column, path) in COLUMN_PATHS {
        if let Some(value) = cell(row, column) {
            insert_path(&mut record, path, value.clone());
        }
    }
    if let Some(kelvin) = cell(row, "Temperature (K)") {
        // non-numeric text is kept so the schema reports it
        let value = as_number(kelvin).unwrap_or_else(|| kelvin.clone());
        insert_path(&mut record, &["context", "temperature_K"], value);
    }
    if let Some(name) = cell(row, "Material Name") {
        insert_path(&mut record, &["sample", "material", "name"], name.clone());
        if let Some(formula) = cell(row, "Formula") {
            let path = ["sample", "material", "formula"];
            insert_path(&mut record, &path, formula.clone());
        }
    }
    Value::Object(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn blank_row_gets_defaults() {
        let record = build_record(&Map::new());
        assert_eq!(record["record_type"], "evidence");
        assert_eq!(record["record_domain"], "characterization");
        assert_eq!(record["acquisition_source"]["source_type"], "laboratory");
        assert!(record.get("context").is_none());
        assert!(record.get("sample").is_none());
        let id = record["record_id"].as_str().unwrap();
        assert!(Ulid::from_string(id).is_ok());
    }

    #[test]
    fn columns_land_on_record_paths() {
        let record = build_record(&row(json!({
            "Environment": "operando",
            "Cell Type": "flow_cell",
            "Flow Mode": "flowing",
            "Temperature (K)": "298.15",
            "Material Name": "Copper",
            "Formula": "Cu",
            "Sample Form": "",
            "Reaction": null
        })));
        assert_eq!(record["context"]["environment"], "operando");
        assert_eq!(record["context"]["electrochemistry"]["cell_type"], "flow_cell");
        assert_eq!(record["context"]["transport"]["flow_mode"], "flowing");
        assert_eq!(record["context"]["temperature_K"], 298.15);
        assert_eq!(record["sample"]["material"]["formula"], "Cu");
        assert!(record["sample"].get("sample_form").is_none());
        let electrochemistry = &record["context"]["electrochemistry"];
        assert!(electrochemistry.get("reaction").is_none());
    }

    #[test]
    fn formula_without_material_name_is_dropped() {
        let record = build_record(&row(json!({"Formula": "Cu"})));
        assert!(record.get("sample").is_none());
    }

    #[test]
    fn each_row_gets_a_distinct_id() {
        let a = build_record(&Map::new());
        let b = build_record(&Map::new());
        assert_ne!(a["record_id"], b["record_id"]);
    }
}
