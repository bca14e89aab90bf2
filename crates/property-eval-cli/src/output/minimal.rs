use serde_json::Value;

/// Print the single headline number of a response.
///
/// Dashboard responses give the base-scenario ROI, amortization output gives
/// the monthly payment and exports give the projection path.
pub fn print_minimal(value: &Value) {
    if value.get("success") == Some(&Value::Bool(false)) {
        println!("error: {}", format_minimal(&value["error"]));
        return;
    }

    let candidates = [
        &value["scenarios"]["base"]["roi"],
        &value["monthly_payment"],
        &value["projection_csv"],
    ];
    if let Some(val) = candidates.into_iter().find(|v| !v.is_null()) {
        println!("{}", format_minimal(val));
        return;
    }

    match value {
        Value::Object(map) => {
            if let Some((key, val)) = map.iter().next() {
                println!("{}: {}", key, format_minimal(val));
            }
        }
        _ => println!("{}", format_minimal(value)),
    }
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
