//! The dashboard document: favorites, recency logs, and issues, persisted as one JSON object.

use serde::{Deserialize, Serialize};

/// Current on-disk schema version. Files without a version are read as version 1.
pub const SCHEMA_VERSION: u32 = 1;

/// Maximum entries kept in each recency log.
pub const RECENT_CAP: usize = 50;

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardDocument {
    #[serde(default = "schema_version")]
    pub version: u32,
    /// Bumped on every save made through the store's update paths.
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub favorite_skills: FavoriteSkills,
    #[serde(default)]
    pub favorite_personas: Vec<String>,
    #[serde(default)]
    pub recently_made: Vec<RecentEntry>,
    #[serde(default)]
    pub recently_equipped: Vec<RecentEntry>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// Last issue number handed out; 0 means "derive from the existing issues".
    #[serde(default)]
    pub next_issue_number: u64,
}

impl Default for DashboardDocument {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            revision: 0,
            favorite_skills: FavoriteSkills::default(),
            favorite_personas: Vec::new(),
            recently_made: Vec::new(),
            recently_equipped: Vec::new(),
            issues: Vec::new(),
            next_issue_number: 0,
        }
    }
}

/// One recency log record. Stored under `time`, the key existing dashboards use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEntry {
    pub name: String,
    #[serde(rename = "time", alias = "timestamp")]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created: String,
}

/// Category -> skill names, in insertion order. Serialized as a JSON object whose key
/// order is the category order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "serde_json::Map<String, serde_json::Value>",
    into = "serde_json::Map<String, serde_json::Value>"
)]
pub struct FavoriteSkills {
    categories: Vec<(String, Vec<String>)>,
}

impl FavoriteSkills {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Categories with their skills, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.categories
            .iter()
            .map(|(c, skills)| (c.as_str(), skills.as_slice()))
    }

    pub fn category(&self, name: &str) -> Option<&[String]> {
        self.categories
            .iter()
            .find(|(c, _)| c == name)
            .map(|(_, skills)| skills.as_slice())
    }

    /// Add `skill` under `category`, creating the category when absent. Returns false
    /// when the skill is already in that category.
    pub fn insert(&mut self, category: &str, skill: &str) -> bool {
        let idx = match self.categories.iter().position(|(c, _)| c == category) {
            Some(i) => i,
            None => {
                self.categories.push((category.to_string(), Vec::new()));
                self.categories.len() - 1
            }
        };
        let skills = &mut self.categories[idx].1;
        if skills.iter().any(|s| s == skill) {
            return false;
        }
        skills.push(skill.to_string());
        true
    }

    /// Remove `skill` from the first category (in order) that contains it. Emptied
    /// categories are kept. Returns the category it was removed from.
    pub fn remove_first(&mut self, skill: &str) -> Option<String> {
        for (category, skills) in &mut self.categories {
            if let Some(pos) = skills.iter().position(|s| s == skill) {
                skills.remove(pos);
                return Some(category.clone());
            }
        }
        None
    }
}

impl TryFrom<serde_json::Map<String, serde_json::Value>> for FavoriteSkills {
    type Error = String;

    fn try_from(map: serde_json::Map<String, serde_json::Value>) -> Result<Self, Self::Error> {
        let mut categories = Vec::with_capacity(map.len());
        for (category, value) in map {
            let skills: Vec<String> = serde_json::from_value(value)
                .map_err(|e| format!("favorite_skills.{}: {}", category, e))?;
            categories.push((category, skills));
        }
        Ok(Self { categories })
    }
}

impl From<FavoriteSkills> for serde_json::Map<String, serde_json::Value> {
    fn from(favs: FavoriteSkills) -> Self {
        favs.categories
            .into_iter()
            .map(|(category, skills)| {
                let skills = skills.into_iter().map(serde_json::Value::String).collect();
                (category, serde_json::Value::Array(skills))
            })
            .collect()
    }
}

impl DashboardDocument {
    /// Hand out the next issue id. Legacy documents without a counter continue after
    /// the larger of the issue count and the highest numeric `issue_<n>` suffix.
    /// Returns `None`, leaving the document unchanged, once the counter is exhausted.
    pub fn allocate_issue_id(&mut self) -> Option<String> {
        let floor = self
            .issues
            .iter()
            .filter_map(|i| i.id.strip_prefix("issue_"))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            .max(self.issues.len() as u64);
        self.next_issue_number = self.next_issue_number.max(floor).checked_add(1)?;
        Some(format!("issue_{}", self.next_issue_number))
    }
}

/// Append a record and keep only the newest `RECENT_CAP` entries.
pub fn push_recent(log: &mut Vec<RecentEntry>, name: &str, timestamp: String) {
    log.push(RecentEntry {
        name: name.to_string(),
        timestamp,
    });
    if log.len() > RECENT_CAP {
        let excess = log.len() - RECENT_CAP;
        log.drain(..excess);
    }
}

/// Split a comma-separated tag string: trimmed, empties and repeats dropped.
pub fn parse_tags(tags: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_document_fills_missing_keys() {
        let doc: DashboardDocument = serde_json::from_str(r#"{"issues": []}"#).unwrap();
        assert_eq!(doc.version, SCHEMA_VERSION);
        assert!(doc.favorite_skills.is_empty());
        assert!(doc.recently_made.is_empty());
    }

    #[test]
    fn recent_entries_read_time_and_timestamp() {
        let a: RecentEntry =
            serde_json::from_str(r#"{"name": "x", "time": "2024-01-01T00:00:00"}"#).unwrap();
        let b: RecentEntry =
            serde_json::from_str(r#"{"name": "x", "timestamp": "2024-01-01T00:00:00"}"#).unwrap();
        assert_eq!(a, b);
        let out = serde_json::to_value(&a).unwrap();
        assert!(out.get("time").is_some());
    }

    #[test]
    fn favorite_category_order_survives_round_trip() {
        let json = r#"{"favorite_skills": {"zeta": ["a"], "alpha": ["b"], "mid": []}}"#;
        let doc: DashboardDocument = serde_json::from_str(json).unwrap();
        let cats: Vec<&str> = doc.favorite_skills.iter().map(|(c, _)| c).collect();
        assert_eq!(cats, vec!["zeta", "alpha", "mid"]);
        let again: DashboardDocument =
            serde_json::from_str(&serde_json::to_string(&doc).unwrap()).unwrap();
        assert_eq!(again, doc);
    }

    #[test]
    fn favorite_skills_rejects_non_list_category() {
        let err = serde_json::from_str::<DashboardDocument>(r#"{"favorite_skills": {"a": 3}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("favorite_skills.a"));
    }

    #[test]
    fn remove_first_only_touches_first_category() {
        let mut favs = FavoriteSkills::default();
        favs.insert("a", "foo");
        favs.insert("b", "foo");
        assert_eq!(favs.remove_first("foo").as_deref(), Some("a"));
        assert_eq!(favs.category("a"), Some(&[][..]));
        assert_eq!(favs.category("b"), Some(&["foo".to_string()][..]));
    }

    #[test]
    fn push_recent_evicts_oldest() {
        let mut log = Vec::new();
        for i in 0..60 {
            push_recent(&mut log, &format!("s{}", i), String::new());
        }
        assert_eq!(log.len(), RECENT_CAP);
        assert_eq!(log[0].name, "s10");
        assert_eq!(log[RECENT_CAP - 1].name, "s59");
    }

    #[test]
    fn issue_ids_never_reuse_after_gaps() {
        let mut doc = DashboardDocument::default();
        assert_eq!(doc.allocate_issue_id().as_deref(), Some("issue_1"));
        doc.issues.push(Issue {
            id: "issue_7".to_string(),
            title: String::new(),
            body: String::new(),
            tags: Vec::new(),
            created: String::new(),
        });
        assert_eq!(doc.allocate_issue_id().as_deref(), Some("issue_8"));
        assert_eq!(doc.allocate_issue_id().as_deref(), Some("issue_9"));
    }

    #[test]
    fn exhausted_issue_counter_allocates_nothing() {
        let mut doc = DashboardDocument::default();
        doc.issues.push(Issue {
            id: format!("issue_{}", u64::MAX),
            title: String::new(),
            body: String::new(),
            tags: Vec::new(),
            created: String::new(),
        });
        let before = doc.clone();
        assert_eq!(doc.allocate_issue_id(), None);
        assert_eq!(doc, before);
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        assert_eq!(parse_tags("urgent, ui,,urgent"), vec!["urgent", "ui"]);
        assert!(parse_tags("").is_empty());
    }
}
