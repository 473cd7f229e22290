//! Command grammar: `nav`, `jump <id>`, `<id>.exec [<json>]`, `exec [<json>]`.

use serde_json::{Map, Value};

use crate::error::{Result, ShellError};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Show the tree.
    Nav,
    /// Move the current position to a node.
    Jump(String),
    /// Execute `target` (or the current position when `None`) with inline arguments.
    Exec {
        target: Option<String>,
        args: Map<String, Value>,
    },
}

const USAGE: &str =
    "expected 'nav', 'jump <id>', '<id>.exec {\"arg\": \"value\"}', or 'exec {\"arg\": \"value\"}'";

pub fn parse(line: &str) -> Result<Command> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ShellError::Validation(format!("empty command; {}", USAGE)));
    }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (line, ""),
    };

    match head {
        "nav" if rest.is_empty() => Ok(Command::Nav),
        "jump" => {
            if rest.is_empty() || rest.contains(char::is_whitespace) {
                return Err(ShellError::Validation(
                    "jump takes exactly one node id, e.g. 'jump equip' or 'jump 0.1.9'".to_string(),
                ));
            }
            Ok(Command::Jump(rest.to_string()))
        }
        "exec" => Ok(Command::Exec {
            target: None,
            args: parse_args(rest)?,
        }),
        _ => match head.strip_suffix(".exec") {
            Some(target) if !target.is_empty() => Ok(Command::Exec {
                target: Some(target.to_string()),
                args: parse_args(rest)?,
            }),
            _ => Err(ShellError::Validation(format!(
                "unrecognized command '{}'; {}",
                line, USAGE
            ))),
        },
    }
}

/// Inline arguments: empty means no arguments; otherwise a JSON object.
fn parse_args(raw: &str) -> Result<Map<String, Value>> {
    if raw.is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ShellError::Validation(format!(
            "arguments must be a JSON object, got {}",
            json_type(&other)
        ))),
        Err(e) => Err(ShellError::Validation(format!("invalid JSON arguments: {}", e))),
    }
}

pub(crate) fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
