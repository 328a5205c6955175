use crate::core::violation::Violation;
use serde_json::Value;

/// Domain rules JSON Schema cannot express. Runs on any JSON, independent of the schema.
pub fn check_invariants(record: &Value) -> Vec<Violation> {
    let mut out = Vec::new();
    check_measurement(record, &mut out);
    check_configuration(record, &mut out);
    out
}

fn present<'a>(parent: &'a Value, key: &str) -> Option<&'a Value> {
    parent.get(key).filter(|v| !v.is_null())
}

fn check_measurement(record: &Value, out: &mut Vec<Violation>) {
    let Some(measurement) = present(record, "measurement") else {
        return;
    };
    let Some(series) = present(measurement, "series") else {
        out.push(Violation::logical("measurement", "Measurement block missing 'series'"));
        return;
    };
    // a non-array series is the schema's problem
    let Some(series) = series.as_array() else {
        return;
    };
    for (i, s) in series.iter().enumerate() {
        let label = match s.get("series_id").and_then(Value::as_str) {
            Some(id) => format!("Series '{id}'"),
            None => format!("Series at index {i}"),
        };
        for field in ["independent_variables", "channels"] {
            if present(s, field).is_none() {
                out.push(Violation::logical(
                    format!("measurement.series[{i}]"),
                    format!("{label} missing '{field}'"),
                ));
            }
        }
    }
}

fn check_configuration(record: &Value, out: &mut Vec<Violation>) {
    let Some(config) = record
        .get("system")
        .and_then(|s| present(s, "configuration"))
    else {
        return;
    };
    let Some(map) = config.as_object() else {
        out.push(Violation::logical(
            "system.configuration",
            "System configuration must be a flat key/value map",
        ));
        return;
    };
    for (key, value) in map {
        let nested = match value {
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            _ => continue,
        };
        out.push(Violation::logical(
            format!("system.configuration.{key}"),
            format!("System configuration must be flat. Key '{key}' contains nested {nested}"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::violation::Layer;
    use serde_json::json;

    #[test]
    fn measurement_without_series() {
        let violations = check_invariants(&json!({"record_id": "X", "measurement": {}}));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].layer, Layer::Logical);
        assert_eq!(violations[0].path, "measurement");
        assert_eq!(violations[0].message, "Measurement block missing 'series'");
    }

    #[test]
    fn no_measurement_no_violation() {
        assert!(check_invariants(&json!({"record_id": "X"})).is_empty());
    }

    #[test]
    fn series_fields_are_reported_separately() {
        let record = json!({"measurement": {"series": [
            {"series_id": "cu_k_edge", "channels": []},
            {"independent_variables": []}
        ]}});
        let violations = check_invariants(&record);
        let rendered: Vec<_> = violations
            .iter()
            .map(|v| format!("{} {}", v.path, v.message))
            .collect();
        assert_eq!(
            rendered,
            [
                "measurement.series[0] Series 'cu_k_edge' missing 'independent_variables'",
                "measurement.series[1] Series at index 1 missing 'channels'",
            ]
        );
    }

    #[test]
    fn nested_configuration_value_is_flagged() {
        let record = json!({"system": {"configuration": {"gain": 5, "mode": {"nested": true}}}});
        let violations = check_invariants(&record);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "system.configuration.mode");
        assert!(violations[0].message.contains("'mode'"));
    }

    #[test]
    fn flat_configuration_passes() {
        let record = json!({
            "system": {"configuration": {"gain": 5, "mode": "AC", "on": true, "x": null}}
        });
        assert!(check_invariants(&record).is_empty());
    }

    #[test]
    fn array_value_and_non_map_configuration() {
        let record = json!({"system": {"configuration": {"detectors": ["a", "b"]}}});
        assert_eq!(
            check_invariants(&record)[0].message,
            "System configuration must be flat. Key 'detectors' contains nested array"
        );

        let record = json!({"system": {"configuration": ["gain", 5]}});
        assert_eq!(check_invariants(&record)[0].path, "system.configuration");
    }

    #[test]
    fn rules_accumulate() {
        let record = json!({
            "measurement": {},
            "system": {"configuration": {"a": [], "b": {}}}
        });
        assert_eq!(check_invariants(&record).len(), 3);
    }
}
