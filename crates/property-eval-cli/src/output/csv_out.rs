use serde_json::Value;
use std::io;

const SCENARIO_KEYS: [&str; 3] = ["conservative", "base", "optimistic"];
const SUMMARY_COLUMNS: [&str; 5] = ["monthly_rent", "monthly_cash_flow", "annual_cash_flow", "roi", "irr"];

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) if map.contains_key("scenarios") => {
            // One row per scenario
            let mut header = vec!["scenario"];
            header.extend(SUMMARY_COLUMNS);
            let _ = wtr.write_record(&header);
            for key in SCENARIO_KEYS {
                let s = &value["scenarios"][key];
                let mut row = vec![key.to_string()];
                row.extend(SUMMARY_COLUMNS.iter().map(|c| format_csv_value(&s[*c])));
                let _ = wtr.write_record(&row);
            }
        }
        Value::Object(map) => match map.get("rows") {
            Some(Value::Array(rows)) => write_array_csv(&mut wtr, rows),
            _ => {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
        },
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let _ = wtr.write_record(&headers);

    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
