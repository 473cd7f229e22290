//! Load skills from dirs: each skill is a directory with SKILL.md (YAML frontmatter + markdown).
//! Frontmatter carries `name`, `description`, `domain`, and an optional `subdomain`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, ShellError};

/// Domain assigned to skills whose frontmatter names none.
pub const UNCATEGORIZED: &str = "uncategorized";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillEntry {
    pub name: String,
    pub description: String,
    pub domain: String,
    pub subdomain: Option<String>,
    pub source: SkillSource,
    pub path: PathBuf,
    /// Raw SKILL.md content, frontmatter included.
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillSource {
    /// The writable skills directory (e.g. ~/.skillshell/skills).
    Skills,
    /// From config.skills.extraDirs; read-only.
    Extra,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SkillFrontmatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subdomain: Option<String>,
}

/// Load every skill, keyed by name. Extra dirs load first; the primary dir wins on clashes.
pub fn load_skills(
    skills_dir: Option<&Path>,
    extra_dirs: &[PathBuf],
) -> Result<BTreeMap<String, SkillEntry>> {
    let mut merged = BTreeMap::new();
    for dir in extra_dirs {
        for e in load_skills_from_dir(dir, SkillSource::Extra) {
            merged.insert(e.name.clone(), e);
        }
    }
    if let Some(d) = skills_dir {
        for e in load_skills_from_dir(d, SkillSource::Skills) {
            merged.insert(e.name.clone(), e);
        }
    }
    Ok(merged)
}

fn load_skills_from_dir(dir: &Path, source: SkillSource) -> Vec<SkillEntry> {
    let mut out = Vec::new();
    let read_dir = match std::fs::read_dir(dir) {
        Ok(d) => d,
        Err(_) => return out,
    };
    for entry in read_dir.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let skill_md = path.join("SKILL.md");
        let content = match std::fs::read_to_string(&skill_md) {
            Ok(c) => c,
            Err(_) => continue,
        };
        let mut skill = parse_skill_file(&content, &path);
        skill.source = source;
        out.push(skill);
    }
    out
}

/// Parse a SKILL.md. Missing or unparsable frontmatter falls back to the directory name.
pub fn parse_skill_file(content: &str, skill_dir: &Path) -> SkillEntry {
    let mut entry = SkillEntry {
        name: skill_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string(),
        description: String::new(),
        domain: UNCATEGORIZED.to_string(),
        subdomain: None,
        source: SkillSource::Skills,
        path: skill_dir.to_path_buf(),
        content: content.to_string(),
    };

    if let Some((yaml, _)) = split_frontmatter(content) {
        match serde_yaml::from_str::<SkillFrontmatter>(yaml) {
            Ok(fm) => {
                if let Some(n) = fm.name.filter(|n| !n.trim().is_empty()) {
                    entry.name = n;
                }
                if let Some(d) = fm.description {
                    entry.description = d;
                }
                if let Some(d) = fm.domain.filter(|d| !d.trim().is_empty()) {
                    entry.domain = d;
                }
                entry.subdomain = fm.subdomain.filter(|s| !s.trim().is_empty());
            }
            Err(e) => log::warn!(
                "ignoring frontmatter in {}: {}",
                skill_dir.join("SKILL.md").display(),
                e
            ),
        }
    }
    entry
}

/// Markdown body without the frontmatter block.
pub fn skill_body(content: &str) -> &str {
    match split_frontmatter(content) {
        Some((_, body)) => body,
        None => content,
    }
}

fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---")?;
    let end = rest.find("\n---")?;
    let yaml = rest[..end].trim();
    let body = rest[end + 4..].trim_start_matches(['\r', '\n']);
    Some((yaml, body))
}

/// Write `<skills_dir>/<name>/SKILL.md`. Fails when the skill directory already exists.
pub fn write_skill(
    skills_dir: &Path,
    name: &str,
    description: &str,
    domain: &str,
    subdomain: Option<&str>,
    body: &str,
) -> Result<PathBuf> {
    let dir = skills_dir.join(name);
    if dir.exists() {
        return Err(ShellError::Validation(format!(
            "Skill '{}' already exists",
            name
        )));
    }
    let fm = SkillFrontmatter {
        name: Some(name.to_string()),
        description: Some(description.to_string()),
        domain: Some(domain.to_string()),
        subdomain: subdomain.map(str::to_string),
    };
    let yaml = serde_yaml::to_string(&fm)
        .map_err(|e| ShellError::Internal(format!("serializing frontmatter: {}", e)))?;
    let content = format!("---\n{}---\n\n{}\n", yaml, body.trim_end());
    let file = dir.join("SKILL.md");
    crate::persist::write_atomic(&file, content.as_bytes())
        .map_err(|e| ShellError::storage_write(&file, e))?;
    Ok(file)
}

/// A skill name becomes a directory name, so it must be a single plain path segment.
pub fn validate_skill_name(name: &str) -> Result<()> {
    let ok = !name.trim().is_empty()
        && name == name.trim()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\']);
    if ok {
        Ok(())
    } else {
        Err(ShellError::Validation(format!("invalid skill name '{}'", name)))
    }
}
