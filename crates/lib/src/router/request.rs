//! Argument validation and typed requests.
//!
//! Raw JSON arguments are checked against the operation's `ArgSpec`s (unknown names,
//! missing required names, type coercion, defaults) and then deserialized into one
//! request variant per operation. Nothing here has side effects.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::command::json_type;
use super::registry::{ArgKind, ArgSpec, Family, OperationSpec};
use crate::error::{Result, ShellError};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewSkill {
    pub name: String,
    pub domain: String,
    pub content: String,
    pub description: String,
    #[serde(default)]
    pub subdomain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewSkillset {
    pub name: String,
    pub domain: String,
    pub description: String,
    /// Comma-separated skill names.
    pub skills: String,
    #[serde(default)]
    pub subdomain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPersona {
    pub name: String,
    pub domain: String,
    pub description: String,
    pub frame: String,
    #[serde(default)]
    pub mcp_set: Option<String>,
    #[serde(default)]
    pub skillset: Option<String>,
    #[serde(default)]
    pub carton_identity: Option<String>,
    #[serde(default)]
    pub subdomain: Option<String>,
}

/// Operations owned by the catalog engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum CatalogRequest {
    ListSkills,
    ListDomains,
    ListByDomain { domain: String },
    GetSkill { name: String },
    CreateSkill(NewSkill),
    SearchSkills { query: String, n_results: usize },
    ListEquipped,
    GetEquippedContent,
    Equip { name: String },
    Unequip { name: String },
    UnequipAll,
    ListSkillsets,
    CreateSkillset(NewSkillset),
    AddToSkillset { skillset_name: String, skill_name: String },
    MatchSkilllog { prediction: String },
    ListPersonas,
    CreatePersona(NewPersona),
    EquipPersona { name: String },
    GetActivePersona,
    DeactivatePersona,
}

/// A recency entry an operation produces once it succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recency {
    Made(String),
    Equipped(String),
}

impl CatalogRequest {
    pub fn recency(&self) -> Option<Recency> {
        match self {
            Self::Equip { name } | Self::EquipPersona { name } => {
                Some(Recency::Equipped(name.clone()))
            }
            Self::CreateSkill(s) => Some(Recency::Made(s.name.clone())),
            Self::CreateSkillset(s) => Some(Recency::Made(s.name.clone())),
            Self::CreatePersona(p) => Some(Recency::Made(p.name.clone())),
            _ => None,
        }
    }
}

/// Operations served by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum DashboardRequest {
    FavSkillsList,
    FavSkillsAdd { skill_name: String, category: String },
    FavSkillsRemove { skill_name: String },
    FavPersonasList,
    FavPersonasAdd { persona_name: String },
    FavPersonasRemove { persona_name: String },
    RecentlyMade { limit: usize },
    RecentlyEquipped { limit: usize },
    CreateIssue { title: String, body: String, tags: String },
    ReviewIssues {
        #[serde(default)]
        issue_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Catalog(CatalogRequest),
    Dashboard(DashboardRequest),
}

impl Request {
    /// Validate `args` against `spec` and build the typed request.
    pub fn build(spec: &OperationSpec, args: Map<String, Value>) -> Result<Self> {
        let mut fields = validate_args(spec, args)?;
        fields.insert(
            "operation".to_string(),
            Value::String(spec.name.to_string()),
        );
        let value = Value::Object(fields);
        let invalid = |e: serde_json::Error| {
            ShellError::Validation(format!("invalid arguments for {}: {}", spec.name, e))
        };
        match spec.family {
            Family::Catalog => serde_json::from_value(value)
                .map(Request::Catalog)
                .map_err(invalid),
            Family::Dashboard => serde_json::from_value(value)
                .map(Request::Dashboard)
                .map_err(invalid),
        }
    }
}

/// Check names and types, inject defaults. Reports every missing required argument at once.
pub fn validate_args(spec: &OperationSpec, mut args: Map<String, Value>) -> Result<Map<String, Value>> {
    if let Some(unknown) = args
        .keys()
        .find(|k| !spec.args.iter().any(|a| a.name == k.as_str()))
    {
        let accepted = if spec.args.is_empty() {
            "none".to_string()
        } else {
            spec.args.iter().map(|a| a.name).collect::<Vec<_>>().join(", ")
        };
        return Err(ShellError::Validation(format!(
            "unexpected argument '{}' for {} (accepted: {})",
            unknown, spec.name, accepted
        )));
    }

    let missing: Vec<&str> = spec
        .args
        .iter()
        .filter(|a| a.required && args.get(a.name).map_or(true, Value::is_null))
        .map(|a| a.name)
        .collect();
    if !missing.is_empty() {
        return Err(ShellError::Validation(format!(
            "{} is missing required argument(s): {}",
            spec.name,
            missing.join(", ")
        )));
    }

    let mut out = Map::new();
    for arg in spec.args {
        match args.remove(arg.name).filter(|v| !v.is_null()) {
            Some(v) => {
                out.insert(arg.name.to_string(), coerce(spec, arg, v)?);
            }
            None => {
                if let Some(default) = arg.default {
                    out.insert(arg.name.to_string(), default.to_value());
                }
            }
        }
    }
    Ok(out)
}

fn coerce(spec: &OperationSpec, arg: &ArgSpec, value: Value) -> Result<Value> {
    let mismatch = |v: &Value| {
        ShellError::Validation(format!(
            "argument '{}' of {} must be {}, got {}",
            arg.name,
            spec.name,
            arg.kind.as_str(),
            json_type(v)
        ))
    };
    match arg.kind {
        ArgKind::Str => match value {
            Value::String(_) => Ok(value),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(mismatch(&other)),
        },
        ArgKind::Int => match &value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| mismatch(&value)),
            other => Err(mismatch(other)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::registry::OperationRegistry;
    use crate::router::registry::Node;
    use serde_json::json;

    fn spec(name: &str) -> &'static OperationSpec {
        match OperationRegistry::resolve(name) {
            Some(Node::Operation(o)) => o,
            other => panic!("{} is not an operation: {:?}", name, other),
        }
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn every_operation_builds_a_request_from_its_required_args() {
        for op in OperationRegistry::operations() {
            let mut args = Map::new();
            for a in op.args.iter().filter(|a| a.required) {
                args.insert(a.name.to_string(), json!("x"));
            }
            let req = Request::build(op, args);
            assert!(req.is_ok(), "{}: {:?}", op.name, req);
        }
    }

    #[test]
    fn defaults_are_injected() {
        let req = Request::build(spec("fav_skills_add"), obj(json!({"skill_name": "alpha"}))).unwrap();
        assert_eq!(
            req,
            Request::Dashboard(DashboardRequest::FavSkillsAdd {
                skill_name: "alpha".to_string(),
                category: "general".to_string(),
            })
        );
        let req = Request::build(spec("recently_made"), Map::new()).unwrap();
        assert_eq!(req, Request::Dashboard(DashboardRequest::RecentlyMade { limit: 10 }));
    }

    #[test]
    fn missing_required_arguments_are_all_listed() {
        let err = Request::build(spec("create_skill"), obj(json!({"name": "x"}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "create_skill is missing required argument(s): domain, content, description"
        );
        let err = Request::build(spec("equip"), obj(json!({"name": null}))).unwrap_err();
        assert!(matches!(err, ShellError::Validation(_)));
    }

    #[test]
    fn unknown_arguments_are_rejected() {
        let err = Request::build(spec("list_skills"), obj(json!({"verbose": true}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unexpected argument 'verbose' for list_skills (accepted: none)"
        );
    }

    #[test]
    fn scalar_arguments_are_coerced() {
        let req = Request::build(spec("search_skills"), obj(json!({"query": 42, "n_results": "3"}))).unwrap();
        assert_eq!(
            req,
            Request::Catalog(CatalogRequest::SearchSkills {
                query: "42".to_string(),
                n_results: 3,
            })
        );
        let err = Request::build(spec("recently_made"), obj(json!({"limit": "many"}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument 'limit' of recently_made must be int, got string"
        );
        let err = Request::build(spec("recently_made"), obj(json!({"limit": -1}))).unwrap_err();
        assert!(err.to_string().starts_with("invalid arguments for recently_made"));
    }

    #[test]
    fn optional_fields_stay_absent() {
        let req = Request::build(spec("review_issues"), Map::new()).unwrap();
        assert_eq!(
            req,
            Request::Dashboard(DashboardRequest::ReviewIssues { issue_id: None })
        );
    }

    #[test]
    fn creations_and_equips_produce_recency() {
        let equip = CatalogRequest::Equip {
            name: "x".to_string(),
        };
        assert_eq!(equip.recency(), Some(Recency::Equipped("x".to_string())));
        assert_eq!(CatalogRequest::ListSkills.recency(), None);
    }
}
