use colored::Colorize;
use serde_json::Value;
use tabled::{builder::Builder, Table};

/// Format a valuation envelope as tables: the result summary first, then
/// any comparable/build-up breakdown, then rationale and errors.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_envelope(result, map);
            } else {
                print_flat_object(value);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_envelope(result: &Value, envelope: &serde_json::Map<String, Value>) {
    if let Value::Object(res_map) = result {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in res_map {
            if key == "rationale" || key == "errors" {
                continue; // printed as lists below
            }
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        let table = Table::from(builder);
        println!("{}", table);
    } else {
        print_flat_object(&Value::Object(envelope.clone()));
    }

    // Per-comparable breakdown, when present
    if let Some(Value::Array(comps)) = envelope.get("comparables") {
        if !comps.is_empty() {
            println!();
            print_array_table(comps);
        }
    }

    if let Some(Value::Object(result_map)) = envelope.get("result") {
        if let Some(Value::Array(rationale)) = result_map.get("rationale") {
            if !rationale.is_empty() {
                println!("\nRationale:");
                for r in rationale {
                    if let Value::String(s) = r {
                        println!("  - {}", s);
                    }
                }
            }
        }
        if let Some(Value::Array(errors)) = result_map.get("errors") {
            if !errors.is_empty() {
                println!("\n{}:", "Errors".red().bold());
                for e in errors {
                    if let Value::String(s) = e {
                        println!("  - {}", s.red());
                    }
                }
            }
        }
    }
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        let table = Table::from(builder);
        println!("{}", table);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        let table = Table::from(builder);
        println!("{}", table);
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
