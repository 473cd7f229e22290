//! Command router: maps `nav` / `jump` / `exec` commands onto the operation tree.

pub mod command;
pub mod registry;
pub mod request;
mod shell;

pub use command::Command;
pub use registry::{ArgKind, ArgSpec, Family, Node, OperationRegistry, OperationSpec, ROOT};
pub use request::{
    CatalogRequest, DashboardRequest, NewPersona, NewSkill, NewSkillset, Recency, Request,
};
pub use shell::{Shell, ShellResponse};
