use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

const SCENARIOS: [(&str, &str); 3] = [
    ("conservative", "Conservative"),
    ("base", "Base"),
    ("optimistic", "Optimistic"),
];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) if map.get("success") == Some(&Value::Bool(false)) => {
            let message = map.get("error").map(format_value).unwrap_or_default();
            println!("Evaluation failed: {}", message);
        }
        Value::Object(map) if map.contains_key("scenarios") => print_dashboard(map),
        Value::Object(map) => {
            // Arrays of records (schedule rows, summary lines) get their own table.
            let nested: Vec<&str> = map
                .iter()
                .filter(|(_, v)| matches!(v, Value::Array(a) if a.first().is_some_and(Value::is_object)))
                .map(|(k, _)| k.as_str())
                .collect();
            print_fields(map, &nested);
            for key in nested {
                if let Some(Value::Array(rows)) = map.get(key) {
                    println!("\n{}:", key);
                    print_array_table(rows);
                }
            }
            print_warnings(map);
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_dashboard(map: &Map<String, Value>) {
    if let Some(Value::Object(calc)) = map.get("calculator_data") {
        print_fields(calc, &[]);
    }

    let mut builder = Builder::default();
    builder.push_record(["Scenario", "Monthly Rent", "Monthly Cash Flow", "Annual Cash Flow", "ROI %", "IRR %"]);
    for (key, label) in SCENARIOS {
        let s = &map["scenarios"][key];
        builder.push_record([
            label.to_string(),
            format_value(&s["monthly_rent"]),
            format_value(&s["monthly_cash_flow"]),
            format_value(&s["annual_cash_flow"]),
            format_value(&s["roi"]),
            format_value(&s["irr"]),
        ]);
    }
    println!("\n{}", Table::from(builder));

    if let Some(Value::Object(metrics)) = map.get("advanced_metrics") {
        println!();
        print_fields(metrics, &[]);
    }
    if let Some(Value::Object(kpi)) = map.get("charts").and_then(|c| c.get("kpi_data")) {
        println!();
        print_fields(kpi, &[]);
    }

    if let Some(Value::Object(risk)) = map.get("risk_assessment") {
        let level = risk.get("risk_level").map(format_value).unwrap_or_default();
        println!("\nRisk level: {}", level);
        print_list("Risk factors", risk.get("risk_factors"));
        print_list("Recommendations", risk.get("recommendations"));
    }

    print_warnings(map);
}

fn print_fields(map: &Map<String, Value>, skip: &[&str]) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        if skip.contains(&key.as_str()) || (key == "warnings" && val.is_array()) {
            continue;
        }
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_warnings(map: &Map<String, Value>) {
    print_list("Warnings", map.get("warnings"));
}

fn print_list(title: &str, items: Option<&Value>) {
    if let Some(Value::Array(items)) = items {
        if !items.is_empty() {
            println!("\n{}:", title);
            for item in items {
                println!("  - {}", format_value(item));
            }
        }
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

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

/// Numbers are shown to two decimal places.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .map(|f| format!("{:.2}", f))
            .unwrap_or_else(|| n.to_string()),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
