//! Line protocol frames (one JSON object per line).

use serde::{Deserialize, Serialize};

use crate::router::{OperationRegistry, Shell};

/// Method that runs one shell command.
pub const METHOD_RUN: &str = "run_conversation_shell";
/// Method that returns the command grammar and the operation tree.
pub const METHOD_DESCRIBE: &str = "describe";

/// Wire request: `{ "type": "req", "id", "method", "params" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRequest {
    #[serde(rename = "type")]
    pub typ: String,
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Wire response: `{ "type": "res", "id", "ok", "payload" or "error" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireResponse {
    #[serde(rename = "type")]
    pub typ: String,
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Params for method "run_conversation_shell".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunParams {
    pub command: String,
    /// Argument object merged under the command's inline JSON.
    #[serde(default)]
    pub args: Option<serde_json::Value>,
}

impl WireResponse {
    pub fn ok(id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            typ: "res".to_string(),
            id: id.into(),
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            typ: "res".to_string(),
            id: id.into(),
            ok: false,
            payload: None,
            error: Some(error.into()),
        }
    }
}

const GRAMMAR: &str = "Commands:\n\
- 'nav' - Show tree structure\n\
- 'jump <coordinate>' - Navigate to node (e.g., 'jump list_skills')\n\
- '<coordinate>.exec {\"args\": \"values\"}' - Jump and execute (e.g., 'equip.exec {\"name\": \"my-skill\"}')\n\
- 'exec {\"args\"}' - Execute current node";

/// Handle one raw line. Frame-level problems yield `ok: false`; command failures are
/// carried inside an `ok: true` payload.
pub async fn handle_line(shell: &Shell, line: &str) -> WireResponse {
    let req: WireRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => return WireResponse::err("", format!("invalid frame: {}", e)),
    };
    if req.typ != "req" {
        return WireResponse::err(&req.id, format!("unexpected frame type '{}'", req.typ));
    }
    match req.method.as_str() {
        METHOD_RUN => {
            let params: RunParams = match serde_json::from_value(req.params) {
                Ok(p) => p,
                Err(e) => return WireResponse::err(&req.id, format!("invalid params: {}", e)),
            };
            let response = shell.dispatch(&params.command, params.args).await;
            match serde_json::to_value(&response) {
                Ok(payload) => WireResponse::ok(&req.id, payload),
                Err(e) => WireResponse::err(&req.id, format!("encoding response: {}", e)),
            }
        }
        METHOD_DESCRIBE => WireResponse::ok(
            &req.id,
            serde_json::json!({
                "name": METHOD_RUN,
                "description": format!(
                    "{}\n\n{}",
                    OperationRegistry::render_tree(crate::router::ROOT),
                    GRAMMAR
                ),
            }),
        ),
        other => WireResponse::err(&req.id, format!("unknown method: {}", other)),
    }
}
