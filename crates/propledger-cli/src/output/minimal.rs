use serde_json::Value;

/// Headline fields, most specific first. A mortgage analysis answers with
/// its payment, a tracker summary with the days to the next due date, an
/// escrow action with the resulting status.
const PRIORITY_KEYS: [&str; 8] = [
    "monthly_payment",
    "days_until_next",
    "total_seconds",
    "status",
    "total_payable",
    "amount",
    "loan_amount",
    "remaining_balance",
];

/// Print just the key answer. Arrays (schedules, tracker batches) print
/// one line per element.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Array(items) => {
            for item in items {
                println!("{}", headline(item));
            }
        }
        other => println!("{}", headline(other)),
    }
}

fn headline(value: &Value) -> String {
    let Value::Object(map) = value else {
        return format_minimal(value);
    };

    for key in PRIORITY_KEYS {
        if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
            return format_minimal(val);
        }
    }

    map.iter()
        .next()
        .map(|(key, val)| format!("{}: {}", key, format_minimal(val)))
        .unwrap_or_default()
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        _ => value.to_string(),
    }
}
