//! Session-scoped command dispatcher: parse → resolve → validate → execute.
//!
//! Every outcome, including panics inside an operation, comes back as a `ShellResponse`.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::command::{self, json_type, Command};
use super::registry::{Node, OperationRegistry, ROOT};
use super::request::{CatalogRequest, DashboardRequest, Recency, Request};
use crate::catalog::{LocalCatalog, SkillEngine};
use crate::config::{self, Config};
use crate::dashboard::{Dashboard, DashboardStore};
use crate::error::{ErrorKind, Result, ShellError};

/// Uniform result of one command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellResponse {
    pub success: bool,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl ShellResponse {
    fn ok(command: &str, output: String) -> Self {
        Self {
            success: true,
            command: command.to_string(),
            rendered_output: Some(output),
            error: None,
            kind: None,
        }
    }

    fn failed(command: &str, err: &ShellError) -> Self {
        Self {
            success: false,
            command: command.to_string(),
            rendered_output: None,
            error: Some(err.to_string()),
            kind: Some(err.kind()),
        }
    }

    /// Text shown to a human: the rendered output, or `Error: ...`.
    pub fn text(&self) -> String {
        match (&self.rendered_output, &self.error) {
            (Some(out), _) if self.success => out.clone(),
            (_, Some(err)) => format!("Error: {}", err),
            _ => String::new(),
        }
    }
}

pub struct Shell {
    engine: Arc<dyn SkillEngine>,
    dashboard: Arc<Dashboard>,
    position: Mutex<&'static str>,
    timeout: Duration,
}

impl Shell {
    pub fn new(engine: Arc<dyn SkillEngine>, dashboard: Arc<Dashboard>) -> Self {
        Self {
            engine,
            dashboard,
            position: Mutex::new(ROOT),
            timeout: config::ShellConfig::default().operation_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Shell over the local catalog and the dashboard file the config points at.
    pub fn from_config(config: &Config, config_path: &Path) -> Self {
        let data_dir = config::resolve_data_dir(config, config_path);
        let engine = LocalCatalog::new(
            config::resolve_skills_dir(config, config_path),
            config::resolve_extra_skill_dirs(config, config_path),
            &data_dir,
        );
        let store = DashboardStore::open(config::resolve_dashboard_path(config, config_path));
        log::debug!(
            "shell: data dir {}, dashboard {}",
            data_dir.display(),
            store.path().display()
        );
        Self::new(Arc::new(engine), Arc::new(Dashboard::new(store)))
            .with_timeout(config.shell.operation_timeout())
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// Current tree coordinate.
    pub fn position(&self) -> &'static str {
        *self.position.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_position(&self, coordinate: &'static str) {
        *self.position.lock().unwrap_or_else(|p| p.into_inner()) = coordinate;
    }

    /// Run one command. `args`, when given, must be a JSON object; inline arguments win on
    /// key clashes.
    pub async fn dispatch(&self, command: &str, args: Option<Value>) -> ShellResponse {
        match self.run(command, args).await {
            Ok(out) => ShellResponse::ok(command, out),
            Err(e) => {
                match e.kind() {
                    ErrorKind::NotFound | ErrorKind::Validation => {
                        log::debug!("command {:?} rejected: {}", command, e)
                    }
                    ErrorKind::Timeout | ErrorKind::Conflict => {
                        log::warn!("command {:?} failed: {}", command, e)
                    }
                    _ => log::error!("command {:?} failed: {}", command, e),
                }
                ShellResponse::failed(command, &e)
            }
        }
    }

    async fn run(&self, line: &str, extra: Option<Value>) -> Result<String> {
        let extra = match extra {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(ShellError::Validation(format!(
                    "args must be a JSON object, got {}",
                    json_type(&other)
                )))
            }
        };

        match command::parse(line)? {
            Command::Nav => Ok(OperationRegistry::render_tree(self.position())),
            Command::Jump(id) => {
                let node = resolve(&id)?;
                self.set_position(node.coordinate());
                Ok(OperationRegistry::render_node(node))
            }
            Command::Exec { target, args } => {
                let node = match target {
                    Some(id) => {
                        let node = resolve(&id)?;
                        self.set_position(node.coordinate());
                        node
                    }
                    None => OperationRegistry::resolve(self.position())
                        .unwrap_or_else(OperationRegistry::root),
                };
                let spec = match node {
                    Node::Operation(spec) => spec,
                    Node::Menu(m) => {
                        return Err(ShellError::Validation(format!(
                            "{} ({}) is a menu, not an operation; use 'jump {}' to list its operations",
                            m.coordinate, m.name, m.coordinate
                        )))
                    }
                };
                let mut merged = extra;
                merged.extend(args);
                let request = Request::build(spec, merged)?;
                log::debug!("executing {} ({})", spec.name, spec.coordinate);
                self.execute(spec.name, request).await
            }
        }
    }

    /// Run a validated request on the blocking pool, bounded by the configured timeout.
    pub async fn execute(&self, operation: &str, request: Request) -> Result<String> {
        let engine = Arc::clone(&self.engine);
        let dashboard = Arc::clone(&self.dashboard);
        let task = tokio::task::spawn_blocking(move || run_request(engine.as_ref(), &dashboard, request));
        match tokio::time::timeout(self.timeout, task).await {
            Err(_) => Err(ShellError::Timeout(self.timeout)),
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                let detail = if join_err.is_panic() {
                    panic_message(join_err.into_panic())
                } else {
                    join_err.to_string()
                };
                log::error!("operation {} aborted: {}", operation, detail);
                Err(ShellError::Internal(format!(
                    "operation {} failed unexpectedly",
                    operation
                )))
            }
        }
    }
}

fn resolve(id: &str) -> Result<Node> {
    OperationRegistry::resolve(id).ok_or_else(|| {
        ShellError::NotFound(format!("unknown node '{}'; run 'nav' to see the tree", id))
    })
}

fn run_request(engine: &dyn SkillEngine, dashboard: &Dashboard, request: Request) -> Result<String> {
    match request {
        Request::Catalog(req) => {
            let out = engine.execute(&req)?;
            record_recency(dashboard, &req);
            Ok(out)
        }
        Request::Dashboard(req) => run_dashboard(dashboard, req),
    }
}

/// Recency is a side channel: a failure here is logged and the operation still succeeds.
fn record_recency(dashboard: &Dashboard, req: &CatalogRequest) {
    let Some(recency) = req.recency() else {
        return;
    };
    let tracked = match &recency {
        Recency::Made(name) => dashboard.track_made(name),
        Recency::Equipped(name) => dashboard.track_equipped(name),
    };
    if let Err(e) = tracked {
        log::warn!("could not record {:?} in dashboard: {}", recency, e);
    }
}

fn run_dashboard(dashboard: &Dashboard, req: DashboardRequest) -> Result<String> {
    match req {
        DashboardRequest::FavSkillsList => dashboard.fav_skills_list(),
        DashboardRequest::FavSkillsAdd {
            skill_name,
            category,
        } => dashboard.fav_skills_add(&skill_name, &category),
        DashboardRequest::FavSkillsRemove { skill_name } => dashboard.fav_skills_remove(&skill_name),
        DashboardRequest::FavPersonasList => dashboard.fav_personas_list(),
        DashboardRequest::FavPersonasAdd { persona_name } => dashboard.fav_personas_add(&persona_name),
        DashboardRequest::FavPersonasRemove { persona_name } => {
            dashboard.fav_personas_remove(&persona_name)
        }
        DashboardRequest::RecentlyMade { limit } => dashboard.recently_made(limit),
        DashboardRequest::RecentlyEquipped { limit } => dashboard.recently_equipped(limit),
        DashboardRequest::CreateIssue { title, body, tags } => {
            dashboard.create_issue(&title, &body, &tags)
        }
        DashboardRequest::ReviewIssues { issue_id } => dashboard.review_issues(issue_id.as_deref()),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_text_is_prefixed() {
        let err = ShellError::NotFound("unknown node 'x'".to_string());
        let resp = ShellResponse::failed("jump x", &err);
        assert_eq!(resp.text(), "Error: unknown node 'x'");
        assert_eq!(resp.kind, Some(ErrorKind::NotFound));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["kind"], "not_found");
        assert!(json.get("rendered_output").is_none());
    }

    #[test]
    fn success_text_is_the_output() {
        let resp = ShellResponse::ok("nav", "tree".to_string());
        assert_eq!(resp.text(), "tree");
        assert!(resp.error.is_none());
    }

    #[test]
    fn panic_payloads_are_readable() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(7u8)), "panic");
    }
}
