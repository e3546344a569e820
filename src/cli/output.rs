//! Result rendering for the terminal.
//!
//! Every command prints either one JSON document (`--json`) or a short
//! human-readable summary.

use crate::session::{ControlOutcome, SessionStatus};
use serde::Serialize;
use serde_json::{Value, json};

/// JSON form of a control outcome
pub fn outcome_json(operation: &str, outcome: &ControlOutcome) -> Value {
    let mut doc = json!({
        "operation": operation,
        "outcome": outcome.label(),
    });
    if let Some(status) = outcome.status() {
        doc["status"] = serde_json::to_value(status).unwrap_or(Value::Null);
    }
    if let ControlOutcome::ConfigError(e) = outcome {
        doc["error"] = Value::String(e.to_string());
    }
    doc
}

/// Print a control outcome
pub fn render_outcome(operation: &str, outcome: &ControlOutcome, as_json: bool) {
    if as_json {
        print_json(&outcome_json(operation, outcome));
        return;
    }

    match outcome {
        ControlOutcome::ConfigError(e) => println!("{} failed: {}", operation, e),
        _ => {
            println!("{}: {}", operation, outcome.label());
            if let Some(status) = outcome.status() {
                print_status(status);
            }
        }
    }
}

/// Print any serializable result
pub fn render_value<T: Serialize>(value: &T, as_json: bool) {
    let value = serde_json::to_value(value).unwrap_or(Value::Null);
    if as_json {
        print_json(&value);
        return;
    }

    match value {
        Value::Object(fields) => {
            for (key, field) in fields {
                match field {
                    Value::Null => {}
                    Value::String(text) => println!("  {}: {}", key, text),
                    other => println!("  {}: {}", key, other),
                }
            }
        }
        other => println!("{}", other),
    }
}

fn print_status(status: &SessionStatus) {
    println!("  session:  {}", status.name);
    println!("  state:    {}", status.state);
    println!("  object:   {} ({})", status.object_id, status.library_id);
    if let Some(api) = &status.fabric_api {
        println!("  node:     {}", api);
    }
    if let Some(token) = &status.edge_write_token {
        println!("  edge:     {}", token);
    }
    if let Some(tlro) = &status.tlro {
        println!("  lro:      {}", tlro);
    }
    if let Some(since) = status.since_last_finalize_sec {
        println!("  last finalize: {:.1}s ago", since);
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionError, SessionState};

    #[test]
    fn test_outcome_json_carries_status() {
        let mut status = SessionStatus::new("s1", "ilibY", "iq__X");
        status.state = SessionState::Terminated;

        let doc = outcome_json("stop", &ControlOutcome::Converged(status));
        assert_eq!(doc["outcome"], "converged");
        assert_eq!(doc["status"]["state"], "terminated");
        assert!(doc.get("error").is_none());
    }

    #[test]
    fn test_outcome_json_carries_error() {
        let outcome = ControlOutcome::ConfigError(SessionError::ConfigNotFound("x".to_string()));

        let doc = outcome_json("start", &outcome);
        assert_eq!(doc["outcome"], "config_error");
        assert!(doc["error"].as_str().unwrap().contains("'x'"));
        assert!(doc.get("status").is_none());
    }
}
