//! Filesystem-backed catalog engine.
//!
//! Skills are SKILL.md directories (see `loader`). Skillsets and personas live in one JSON
//! file next to the dashboard. Equipped skills and the active persona are working memory
//! and last as long as the engine does.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::loader::{self, SkillEntry};
use super::SkillEngine;
use crate::dashboard::parse_tags;
use crate::error::{Result, ShellError};
use crate::persist::{self, FileLock};
use crate::router::{CatalogRequest, NewPersona, NewSkill, NewSkillset};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skillset {
    pub name: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub frame: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skillset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carton_identity: Option<String>,
}

/// On-disk shape of `skill_catalog.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub skillsets: Vec<Skillset>,
    #[serde(default)]
    pub personas: Vec<Persona>,
}

#[derive(Debug, Default)]
struct WorkingMemory {
    equipped: Vec<String>,
    active_persona: Option<String>,
}

#[derive(Debug)]
pub struct LocalCatalog {
    skills_dir: PathBuf,
    extra_dirs: Vec<PathBuf>,
    catalog_path: PathBuf,
    memory: Mutex<WorkingMemory>,
    gate: Mutex<()>,
}

impl LocalCatalog {
    pub fn new(skills_dir: PathBuf, extra_dirs: Vec<PathBuf>, data_dir: &Path) -> Self {
        Self {
            skills_dir,
            extra_dirs,
            catalog_path: data_dir.join(crate::config::CATALOG_FILE),
            memory: Mutex::new(WorkingMemory::default()),
            gate: Mutex::new(()),
        }
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    fn skills(&self) -> Result<BTreeMap<String, SkillEntry>> {
        loader::load_skills(Some(&self.skills_dir), &self.extra_dirs)
    }

    fn memory(&self) -> MutexGuard<'_, WorkingMemory> {
        self.memory.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn load_catalog(&self) -> Result<CatalogFile> {
        let bytes = match std::fs::read(&self.catalog_path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CatalogFile::default()),
            Err(e) => {
                return Err(ShellError::CorruptState {
                    path: self.catalog_path.clone(),
                    reason: format!("unreadable: {}", e),
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|e| ShellError::CorruptState {
            path: self.catalog_path.clone(),
            reason: e.to_string(),
        })
    }

    /// Load, mutate, and save the catalog file under the process mutex and the file lock.
    /// `mutate` returning an error leaves the file untouched.
    fn update_catalog<T>(&self, mutate: impl FnOnce(&mut CatalogFile) -> Result<T>) -> Result<T> {
        let _guard = self.gate.lock().unwrap_or_else(|p| p.into_inner());
        let _lock = FileLock::acquire(&self.catalog_path)
            .map_err(|e| ShellError::storage_write(&self.catalog_path, e))?;
        let mut catalog = self.load_catalog()?;
        let out = mutate(&mut catalog)?;
        let mut bytes = serde_json::to_vec_pretty(&catalog)
            .map_err(|e| ShellError::Internal(format!("serializing catalog: {}", e)))?;
        bytes.push(b'\n');
        persist::write_atomic(&self.catalog_path, &bytes)
            .map_err(|e| ShellError::storage_write(&self.catalog_path, e))?;
        Ok(out)
    }

    fn list_skills(&self) -> Result<String> {
        let skills = self.skills()?;
        if skills.is_empty() {
            return Ok("No skills in catalog. Use create_skill to add one.".to_string());
        }
        let mut out = format!("=== Skills ({}) ===\n", skills.len());
        for s in skills.values() {
            let _ = writeln!(out, "- {} [{}]: {}", s.name, domain_label(&s.domain, s.subdomain.as_deref()), s.description);
        }
        Ok(out)
    }

    fn list_domains(&self) -> Result<String> {
        let skills = self.skills()?;
        let catalog = self.load_catalog()?;
        let mut counts: BTreeMap<&str, (usize, usize, usize)> = BTreeMap::new();
        for s in skills.values() {
            counts.entry(s.domain.as_str()).or_default().0 += 1;
        }
        for s in &catalog.skillsets {
            counts.entry(s.domain.as_str()).or_default().1 += 1;
        }
        for p in &catalog.personas {
            counts.entry(p.domain.as_str()).or_default().2 += 1;
        }
        if counts.is_empty() {
            return Ok("No domains yet.".to_string());
        }
        let mut out = String::from("=== Domains ===\n");
        for (domain, (skills, sets, personas)) in counts {
            let _ = writeln!(
                out,
                "- {} ({} skills, {} skillsets, {} personas)",
                domain, skills, sets, personas
            );
        }
        Ok(out)
    }

    fn list_by_domain(&self, domain: &str) -> Result<String> {
        let skills = self.skills()?;
        let catalog = self.load_catalog()?;
        let in_domain: Vec<&SkillEntry> = skills.values().filter(|s| s.domain == domain).collect();
        let sets: Vec<&Skillset> = catalog.skillsets.iter().filter(|s| s.domain == domain).collect();
        if in_domain.is_empty() && sets.is_empty() {
            return Ok(format!("No skills or skillsets in domain '{}'.", domain));
        }
        let mut out = format!("=== Domain: {} ===\n", domain);
        if !in_domain.is_empty() {
            out.push_str("\nSkills:\n");
            for s in in_domain {
                let _ = writeln!(out, "  - {}: {}", s.name, s.description);
            }
        }
        if !sets.is_empty() {
            out.push_str("\nSkillsets:\n");
            for s in sets {
                let _ = writeln!(out, "  - {}: {} ({})", s.name, s.description, s.skills.join(", "));
            }
        }
        Ok(out)
    }

    fn get_skill(&self, name: &str) -> Result<String> {
        let skills = self.skills()?;
        let skill = skills
            .get(name)
            .ok_or_else(|| ShellError::NotFound(format!("Skill '{}' not found", name)))?;
        Ok(skill.content.clone())
    }

    fn create_skill(&self, req: &NewSkill) -> Result<String> {
        loader::validate_skill_name(&req.name)?;
        if self.skills()?.contains_key(&req.name) {
            return Err(ShellError::Validation(format!(
                "Skill '{}' already exists",
                req.name
            )));
        }
        let path = loader::write_skill(
            &self.skills_dir,
            &req.name,
            &req.description,
            &req.domain,
            req.subdomain.as_deref(),
            &req.content,
        )?;
        log::info!("created skill {} at {}", req.name, path.display());
        Ok(format!(
            "Created skill '{}' in domain '{}'",
            req.name,
            domain_label(&req.domain, req.subdomain.as_deref())
        ))
    }

    fn search_skills(&self, query: &str, n_results: usize) -> Result<String> {
        let terms: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();
        if terms.is_empty() {
            return Err(ShellError::Validation("search query is empty".to_string()));
        }
        let skills = self.skills()?;
        let catalog = self.load_catalog()?;

        let mut hits: Vec<(usize, &str, &str, &str)> = Vec::new();
        for s in skills.values() {
            let score = score(&terms, &s.name, &s.domain, s.subdomain.as_deref(), &s.description);
            if score > 0 {
                hits.push((score, "skill", s.name.as_str(), s.description.as_str()));
            }
        }
        for s in &catalog.skillsets {
            let score = score(&terms, &s.name, &s.domain, s.subdomain.as_deref(), &s.description);
            if score > 0 {
                hits.push((score, "skillset", s.name.as_str(), s.description.as_str()));
            }
        }
        hits.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.2.cmp(b.2)));
        hits.truncate(n_results);

        if hits.is_empty() {
            return Ok(format!("No skills or skillsets match '{}'.", query));
        }
        let mut out = format!("=== Search results for '{}' ===\n", query);
        for (i, (score, kind, name, description)) in hits.iter().enumerate() {
            let _ = writeln!(out, "{}. {} ({}, score {}): {}", i + 1, name, kind, score, description);
        }
        Ok(out)
    }

    fn list_equipped(&self) -> String {
        let memory = self.memory();
        if memory.equipped.is_empty() {
            return "No skills equipped.".to_string();
        }
        let mut out = format!("=== Equipped Skills ({}) ===\n", memory.equipped.len());
        for name in &memory.equipped {
            let _ = writeln!(out, "- {}", name);
        }
        out
    }

    fn get_equipped_content(&self) -> Result<String> {
        let equipped = self.memory().equipped.clone();
        if equipped.is_empty() {
            return Ok("No skills equipped.".to_string());
        }
        let skills = self.skills()?;
        let mut out = String::new();
        for name in &equipped {
            let _ = writeln!(out, "=== {} ===", name);
            match skills.get(name) {
                Some(s) => {
                    out.push_str(loader::skill_body(&s.content).trim_end());
                    out.push_str("\n\n");
                }
                None => out.push_str("(no longer in catalog)\n\n"),
            }
        }
        Ok(out.trim_end().to_string())
    }

    fn equip(&self, name: &str) -> Result<String> {
        let skills = self.skills()?;
        if skills.contains_key(name) {
            let mut memory = self.memory();
            if memory.equipped.iter().any(|n| n == name) {
                return Ok(format!("'{}' is already equipped", name));
            }
            memory.equipped.push(name.to_string());
            return Ok(format!("Equipped skill '{}'", name));
        }
        let catalog = self.load_catalog()?;
        match catalog.skillsets.iter().find(|s| s.name == name) {
            Some(set) => Ok(self.equip_skillset(set, &skills)),
            None => Err(ShellError::NotFound(format!(
                "No skill or skillset named '{}'",
                name
            ))),
        }
    }

    fn equip_skillset(&self, set: &Skillset, skills: &BTreeMap<String, SkillEntry>) -> String {
        let (present, missing): (Vec<&String>, Vec<&String>) =
            set.skills.iter().partition(|s| skills.contains_key(s.as_str()));
        let mut memory = self.memory();
        for s in &present {
            if !memory.equipped.iter().any(|n| n == *s) {
                memory.equipped.push((*s).clone());
            }
        }
        let mut out = format!(
            "Equipped skillset '{}' ({} skill(s)): {}",
            set.name,
            present.len(),
            join(&present)
        );
        if !missing.is_empty() {
            let _ = write!(out, "\nMissing from catalog: {}", join(&missing));
        }
        out
    }

    fn unequip(&self, name: &str) -> String {
        let mut memory = self.memory();
        match memory.equipped.iter().position(|n| n == name) {
            Some(i) => {
                memory.equipped.remove(i);
                format!("Unequipped '{}'", name)
            }
            None => format!("'{}' is not equipped", name),
        }
    }

    fn unequip_all(&self) -> String {
        let mut memory = self.memory();
        let n = memory.equipped.len();
        memory.equipped.clear();
        format!("Unequipped {} skill(s)", n)
    }

    fn list_skillsets(&self) -> Result<String> {
        let catalog = self.load_catalog()?;
        if catalog.skillsets.is_empty() {
            return Ok("No skillsets yet. Use create_skillset to add one.".to_string());
        }
        let mut out = format!("=== Skillsets ({}) ===\n", catalog.skillsets.len());
        for s in &catalog.skillsets {
            let _ = writeln!(
                out,
                "- {} [{}]: {} (skills: {})",
                s.name,
                domain_label(&s.domain, s.subdomain.as_deref()),
                s.description,
                s.skills.join(", ")
            );
        }
        Ok(out)
    }

    fn create_skillset(&self, req: &NewSkillset) -> Result<String> {
        if req.name.trim().is_empty() {
            return Err(ShellError::Validation("skillset name is empty".to_string()));
        }
        let members = parse_tags(&req.skills);
        let skills = self.skills()?;
        let unknown: Vec<&String> = members.iter().filter(|m| !skills.contains_key(m.as_str())).collect();
        let count = members.len();
        self.update_catalog(|catalog| {
            if catalog.skillsets.iter().any(|s| s.name == req.name) {
                return Err(ShellError::Validation(format!(
                    "Skillset '{}' already exists",
                    req.name
                )));
            }
            catalog.skillsets.push(Skillset {
                name: req.name.clone(),
                domain: req.domain.clone(),
                subdomain: req.subdomain.clone(),
                description: req.description.clone(),
                skills: members.clone(),
            });
            Ok(())
        })?;
        let mut out = format!("Created skillset '{}' with {} skill(s)", req.name, count);
        if !unknown.is_empty() {
            let _ = write!(out, "\nNot yet in catalog: {}", join(&unknown));
        }
        Ok(out)
    }

    fn add_to_skillset(&self, skillset_name: &str, skill_name: &str) -> Result<String> {
        if !self.skills()?.contains_key(skill_name) {
            return Err(ShellError::NotFound(format!("Skill '{}' not found", skill_name)));
        }
        // Only a real addition is written back.
        let catalog = self.load_catalog()?;
        let set = catalog
            .skillsets
            .iter()
            .find(|s| s.name == skillset_name)
            .ok_or_else(|| ShellError::NotFound(format!("Skillset '{}' not found", skillset_name)))?;
        if set.skills.iter().any(|s| s == skill_name) {
            return Ok(format!("'{}' is already in skillset '{}'", skill_name, skillset_name));
        }
        self.update_catalog(|catalog| {
            let set = catalog
                .skillsets
                .iter_mut()
                .find(|s| s.name == skillset_name)
                .ok_or_else(|| ShellError::NotFound(format!("Skillset '{}' not found", skillset_name)))?;
            if !set.skills.iter().any(|s| s == skill_name) {
                set.skills.push(skill_name.to_string());
            }
            Ok(())
        })?;
        Ok(format!("Added '{}' to skillset '{}'", skill_name, skillset_name))
    }

    fn match_skilllog(&self, prediction: &str) -> Result<String> {
        let needle = prediction.trim().to_lowercase();
        if needle.is_empty() {
            return Err(ShellError::Validation("prediction is empty".to_string()));
        }
        let skills = self.skills()?;
        let catalog = self.load_catalog()?;
        let candidates: Vec<(&str, &str)> = skills
            .keys()
            .map(|n| ("skill", n.as_str()))
            .chain(catalog.skillsets.iter().map(|s| ("skillset", s.name.as_str())))
            .collect();

        if let Some((kind, name)) = candidates.iter().find(|(_, n)| n.to_lowercase() == needle) {
            return Ok(format!("Exact match: {} '{}'. Equip it with equip.", kind, name));
        }
        let partial: Vec<&(&str, &str)> = candidates
            .iter()
            .filter(|(_, n)| {
                let n = n.to_lowercase();
                n.contains(&needle) || needle.contains(&n)
            })
            .collect();
        if partial.is_empty() {
            return Ok(format!(
                "No match for '{}'. Consider creating it with create_skill.",
                prediction.trim()
            ));
        }
        let mut out = format!("Partial matches for '{}':\n", prediction.trim());
        for (kind, name) in partial {
            let _ = writeln!(out, "- {}: {}", kind, name);
        }
        Ok(out)
    }

    fn list_personas(&self) -> Result<String> {
        let catalog = self.load_catalog()?;
        if catalog.personas.is_empty() {
            return Ok("No personas yet. Use create_persona to add one.".to_string());
        }
        let active = self.memory().active_persona.clone();
        let mut out = format!("=== Personas ({}) ===\n", catalog.personas.len());
        for p in &catalog.personas {
            let marker = if active.as_deref() == Some(p.name.as_str()) { " (active)" } else { "" };
            let _ = writeln!(
                out,
                "- {}{} [{}]: {}",
                p.name,
                marker,
                domain_label(&p.domain, p.subdomain.as_deref()),
                p.description
            );
        }
        Ok(out)
    }

    fn create_persona(&self, req: &NewPersona) -> Result<String> {
        if req.name.trim().is_empty() {
            return Err(ShellError::Validation("persona name is empty".to_string()));
        }
        self.update_catalog(|catalog| {
            if catalog.personas.iter().any(|p| p.name == req.name) {
                return Err(ShellError::Validation(format!(
                    "Persona '{}' already exists",
                    req.name
                )));
            }
            catalog.personas.push(Persona {
                name: req.name.clone(),
                domain: req.domain.clone(),
                subdomain: req.subdomain.clone(),
                description: req.description.clone(),
                frame: req.frame.clone(),
                mcp_set: req.mcp_set.clone(),
                skillset: req.skillset.clone(),
                carton_identity: req.carton_identity.clone(),
            });
            Ok(())
        })?;
        Ok(format!("Created persona '{}'", req.name))
    }

    fn equip_persona(&self, name: &str) -> Result<String> {
        let catalog = self.load_catalog()?;
        let persona = catalog
            .personas
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ShellError::NotFound(format!("Persona '{}' not found", name)))?;

        self.memory().active_persona = Some(persona.name.clone());
        let mut out = format!("Equipped persona '{}'\n\nFrame:\n{}\n", persona.name, persona.frame);

        if let Some(set_name) = &persona.skillset {
            match catalog.skillsets.iter().find(|s| &s.name == set_name) {
                Some(set) => {
                    let skills = self.skills()?;
                    let _ = write!(out, "\n{}\n", self.equip_skillset(set, &skills));
                }
                None => {
                    let _ = write!(
                        out,
                        "\nSkillset '{}' not found; create it with create_skillset.\n",
                        set_name
                    );
                }
            }
        }
        if let Some(mcp_set) = &persona.mcp_set {
            let _ = write!(out, "\nRequires MCP set '{}'; enable it in your MCP client.\n", mcp_set);
        }
        if let Some(identity) = &persona.carton_identity {
            let _ = write!(out, "\nIdentity: {}\n", identity);
        }
        Ok(out.trim_end().to_string())
    }

    fn get_active_persona(&self) -> Result<String> {
        let Some(active) = self.memory().active_persona.clone() else {
            return Ok("No active persona.".to_string());
        };
        let catalog = self.load_catalog()?;
        match catalog.personas.iter().find(|p| p.name == active) {
            Some(p) => {
                let mut out = format!(
                    "Active persona: {} [{}]\n{}\n\nFrame:\n{}",
                    p.name,
                    domain_label(&p.domain, p.subdomain.as_deref()),
                    p.description,
                    p.frame
                );
                if let Some(set) = &p.skillset {
                    let _ = write!(out, "\nSkillset: {}", set);
                }
                if let Some(mcp) = &p.mcp_set {
                    let _ = write!(out, "\nMCP set: {}", mcp);
                }
                Ok(out)
            }
            None => Ok(format!("Active persona: {} (no longer in catalog)", active)),
        }
    }

    fn deactivate_persona(&self) -> String {
        let mut memory = self.memory();
        let n = memory.equipped.len();
        memory.equipped.clear();
        match memory.active_persona.take() {
            Some(name) => format!("Deactivated persona '{}' and unequipped {} skill(s)", name, n),
            None => format!("No active persona; unequipped {} skill(s)", n),
        }
    }
}

impl SkillEngine for LocalCatalog {
    fn execute(&self, request: &CatalogRequest) -> Result<String> {
        log::debug!("local catalog: {:?}", request);
        match request {
            CatalogRequest::ListSkills => self.list_skills(),
            CatalogRequest::ListDomains => self.list_domains(),
            CatalogRequest::ListByDomain { domain } => self.list_by_domain(domain),
            CatalogRequest::GetSkill { name } => self.get_skill(name),
            CatalogRequest::CreateSkill(req) => self.create_skill(req),
            CatalogRequest::SearchSkills { query, n_results } => self.search_skills(query, *n_results),
            CatalogRequest::ListEquipped => Ok(self.list_equipped()),
            CatalogRequest::GetEquippedContent => self.get_equipped_content(),
            CatalogRequest::Equip { name } => self.equip(name),
            CatalogRequest::Unequip { name } => Ok(self.unequip(name)),
            CatalogRequest::UnequipAll => Ok(self.unequip_all()),
            CatalogRequest::ListSkillsets => self.list_skillsets(),
            CatalogRequest::CreateSkillset(req) => self.create_skillset(req),
            CatalogRequest::AddToSkillset {
                skillset_name,
                skill_name,
            } => self.add_to_skillset(skillset_name, skill_name),
            CatalogRequest::MatchSkilllog { prediction } => self.match_skilllog(prediction),
            CatalogRequest::ListPersonas => self.list_personas(),
            CatalogRequest::CreatePersona(req) => self.create_persona(req),
            CatalogRequest::EquipPersona { name } => self.equip_persona(name),
            CatalogRequest::GetActivePersona => self.get_active_persona(),
            CatalogRequest::DeactivatePersona => Ok(self.deactivate_persona()),
        }
    }
}

fn domain_label(domain: &str, subdomain: Option<&str>) -> String {
    match subdomain {
        Some(sub) => format!("{}/{}", domain, sub),
        None => domain.to_string(),
    }
}

fn join(names: &[&String]) -> String {
    names.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}

/// Name hits weigh 3, domain hits 2, description hits 1, per query term.
fn score(terms: &[String], name: &str, domain: &str, subdomain: Option<&str>, description: &str) -> usize {
    let name = name.to_lowercase();
    let domain = format!("{} {}", domain, subdomain.unwrap_or("")).to_lowercase();
    let description = description.to_lowercase();
    let words: BTreeSet<&str> = description
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    terms
        .iter()
        .map(|t| {
            let mut s = 0;
            if name.contains(t.as_str()) {
                s += 3;
            }
            if domain.contains(t.as_str()) {
                s += 2;
            }
            if words.contains(t.as_str()) {
                s += 1;
            }
            s
        })
        .sum()
}
