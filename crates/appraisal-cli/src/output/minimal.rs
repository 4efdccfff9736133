use serde_json::Value;

/// Print just the key answer value from the output.
///
/// Heuristic: look for well-known result fields in order of priority,
/// then fall back to the first field.
pub fn print_minimal(value: &Value) {
    let obj = value.as_object();

    // Reconciliation and tax-savings answers live on the envelope itself
    let envelope_keys = ["final_value", "annual_savings"];
    if let Some(map) = obj {
        for key in &envelope_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }
    }

    // Per-approach answers live inside the "result" envelope
    let result_obj = obj.and_then(|m| m.get("result")).unwrap_or(value);
    let priority_keys = ["indicated_value", "confidence", "workfile_id"];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
