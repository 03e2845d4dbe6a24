use super::Diagnostic;

pub fn render(d: &Diagnostic) -> String {
    let mut obj = serde_json::json!({
        "severity": d.severity.as_str(),
        "phase": d.phase.as_str(),
        "message": d.message,
        "line": d.line,
    });

    if let Some(location) = &d.location {
        obj["location"] = serde_json::Value::String(location.clone());
    }

    serde_json::to_string(&obj).unwrap_or_else(|_| r#"{"severity":"error","message":"internal error serializing diagnostic"}"#.to_string())
}
