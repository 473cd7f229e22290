//! Catalog engine seam: skills, equipped working memory, skillsets, and personas.
//!
//! The router hands every catalog request to a `SkillEngine`. `LocalCatalog` is the
//! filesystem-backed engine the binary ships with; other engines plug in through the
//! same trait.

mod loader;
mod local;

pub use loader::{load_skills, parse_skill_file, SkillEntry, SkillSource};
pub use local::{CatalogFile, LocalCatalog, Persona, Skillset};

use crate::error::Result;
use crate::router::CatalogRequest;

/// Executes catalog operations. Calls are blocking; the router runs them off the async runtime.
pub trait SkillEngine: Send + Sync {
    /// Run one request and return its rendered result text.
    fn execute(&self, request: &CatalogRequest) -> Result<String>;
}
