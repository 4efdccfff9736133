use serde_json::Value;

/// Pretty-print a valuation envelope as JSON. Default format, and the
/// same shape the Node bindings return.
pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("JSON serialization error: {e}"),
    }
}
