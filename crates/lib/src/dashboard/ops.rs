//! Favorites, recents, and issues. Every mutation is a single `DashboardStore::update`.
//! Absent entries are reported in the result text; store errors always propagate.

use std::fmt::Write as _;

use super::document::{parse_tags, push_recent, Issue};
use super::store::DashboardStore;
use crate::error::{Result, ShellError};

/// Default number of entries shown by the recency listings.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Default category for favorite skills.
pub const DEFAULT_CATEGORY: &str = "general";

#[derive(Debug)]
pub struct Dashboard {
    store: DashboardStore,
}

fn now_iso() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

impl Dashboard {
    pub fn new(store: DashboardStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DashboardStore {
        &self.store
    }

    pub fn fav_skills_list(&self) -> Result<String> {
        let doc = self.store.load()?;
        if doc.favorite_skills.is_empty() {
            return Ok("No favorite skills yet. Use fav_skills_add to add some.".to_string());
        }
        let mut out = String::from("=== Favorite Skills ===\n");
        for (category, skills) in doc.favorite_skills.iter() {
            let _ = write!(out, "\n[{}]\n", category);
            for s in skills {
                let _ = writeln!(out, "  - {}", s);
            }
        }
        Ok(out)
    }

    pub fn fav_skills_add(&self, skill_name: &str, category: &str) -> Result<String> {
        let added = self
            .store
            .update(|doc| doc.favorite_skills.insert(category, skill_name))?;
        if added {
            Ok(format!(
                "Added '{}' to favorites under '{}'",
                skill_name, category
            ))
        } else {
            Ok(format!("'{}' already in favorites", skill_name))
        }
    }

    pub fn fav_skills_remove(&self, skill_name: &str) -> Result<String> {
        let removed = self
            .store
            .update(|doc| doc.favorite_skills.remove_first(skill_name))?;
        match removed {
            Some(category) => {
                log::debug!("removed favorite {} from category {}", skill_name, category);
                Ok(format!("Removed '{}' from favorites", skill_name))
            }
            None => Ok(format!("'{}' not found in favorites", skill_name)),
        }
    }

    pub fn fav_personas_list(&self) -> Result<String> {
        let doc = self.store.load()?;
        if doc.favorite_personas.is_empty() {
            return Ok("No favorite personas yet.".to_string());
        }
        let lines: Vec<String> = doc
            .favorite_personas
            .iter()
            .map(|p| format!("  - {}", p))
            .collect();
        Ok(format!("=== Favorite Personas ===\n{}", lines.join("\n")))
    }

    pub fn fav_personas_add(&self, persona_name: &str) -> Result<String> {
        let added = self.store.update(|doc| {
            if doc.favorite_personas.iter().any(|p| p == persona_name) {
                return false;
            }
            doc.favorite_personas.push(persona_name.to_string());
            true
        })?;
        if added {
            Ok(format!("Added '{}' to favorite personas", persona_name))
        } else {
            Ok(format!("'{}' already in favorites", persona_name))
        }
    }

    pub fn fav_personas_remove(&self, persona_name: &str) -> Result<String> {
        let removed = self.store.update(|doc| {
            match doc.favorite_personas.iter().position(|p| p == persona_name) {
                Some(pos) => {
                    doc.favorite_personas.remove(pos);
                    true
                }
                None => false,
            }
        })?;
        if removed {
            Ok(format!("Removed '{}' from favorites", persona_name))
        } else {
            Ok(format!("'{}' not found", persona_name))
        }
    }

    pub fn recently_made(&self, limit: usize) -> Result<String> {
        let doc = self.store.load()?;
        Ok(render_recent(
            &doc.recently_made,
            limit,
            "=== Recently Made ===",
            "No recently made skills tracked.",
        ))
    }

    pub fn recently_equipped(&self, limit: usize) -> Result<String> {
        let doc = self.store.load()?;
        Ok(render_recent(
            &doc.recently_equipped,
            limit,
            "=== Recently Equipped ===",
            "No recently equipped items tracked.",
        ))
    }

    pub fn track_made(&self, name: &str) -> Result<()> {
        let ts = now_iso();
        self.store
            .update(|doc| push_recent(&mut doc.recently_made, name, ts.clone()))
    }

    pub fn track_equipped(&self, name: &str) -> Result<()> {
        let ts = now_iso();
        self.store
            .update(|doc| push_recent(&mut doc.recently_equipped, name, ts.clone()))
    }

    pub fn create_issue(&self, title: &str, body: &str, tags: &str) -> Result<String> {
        let created = now_iso();
        let id = self.store.update(|doc| {
            let id = doc.allocate_issue_id()?;
            doc.issues.push(Issue {
                id: id.clone(),
                title: title.to_string(),
                body: body.to_string(),
                tags: parse_tags(tags),
                created: created.clone(),
            });
            Some(id)
        })?;
        let id = id.ok_or_else(|| ShellError::CorruptState {
            path: self.store.path().to_path_buf(),
            reason: "issue id counter is exhausted".to_string(),
        })?;
        log::info!("created dashboard issue {}", id);
        Ok(format!("Created issue: {} - {}", id, title))
    }

    /// Without an id (or with an empty one) list every issue; with an id show its detail.
    pub fn review_issues(&self, issue_id: Option<&str>) -> Result<String> {
        let doc = self.store.load()?;
        if doc.issues.is_empty() {
            return Ok("No issues.".to_string());
        }
        let issue_id = issue_id.map(str::trim).filter(|s| !s.is_empty());
        let Some(issue_id) = issue_id else {
            let lines: Vec<String> = doc
                .issues
                .iter()
                .map(|i| {
                    let day: String = i.created.chars().take(10).collect();
                    format!("[{}] {} ({})", i.id, i.title, day)
                })
                .collect();
            return Ok(format!("=== Issues ===\n{}", lines.join("\n")));
        };
        match doc.issues.iter().find(|i| i.id == issue_id) {
            Some(i) => Ok(format!(
                "=== {} ===\nID: {}\nTags: {}\nCreated: {}\n\n{}",
                i.title,
                i.id,
                i.tags.join(", "),
                i.created,
                i.body
            )),
            None => Ok(format!("Issue '{}' not found", issue_id)),
        }
    }
}

fn render_recent(
    log: &[super::document::RecentEntry],
    limit: usize,
    header: &str,
    empty: &str,
) -> String {
    let start = log.len().saturating_sub(limit);
    let recents = &log[start..];
    if recents.is_empty() {
        return empty.to_string();
    }
    let lines: Vec<String> = recents
        .iter()
        .map(|r| format!("  - {} ({})", r.name, r.timestamp))
        .collect();
    format!("{}\n{}", header, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dashboard() -> (PathBuf, Dashboard) {
        let dir =
            std::env::temp_dir().join(format!("skillshell-dashboard-test-{}", uuid::Uuid::new_v4()));
        (dir.clone(), Dashboard::new(DashboardStore::in_dir(&dir)))
    }

    #[test]
    fn add_favorite_skill_is_idempotent() {
        let (dir, d) = temp_dashboard();
        assert_eq!(
            d.fav_skills_add("alpha", "core").unwrap(),
            "Added 'alpha' to favorites under 'core'"
        );
        let before = std::fs::read(d.store().path()).unwrap();
        assert_eq!(
            d.fav_skills_add("alpha", "core").unwrap(),
            "'alpha' already in favorites"
        );
        assert_eq!(std::fs::read(d.store().path()).unwrap(), before);
        let doc = d.store().load().unwrap();
        assert_eq!(doc.favorite_skills.category("core").unwrap(), ["alpha"]);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn list_favorite_skills_groups_by_category() {
        let (dir, d) = temp_dashboard();
        assert_eq!(
            d.fav_skills_list().unwrap(),
            "No favorite skills yet. Use fav_skills_add to add some."
        );
        d.fav_skills_add("alpha", "core").unwrap();
        d.fav_skills_add("beta", DEFAULT_CATEGORY).unwrap();
        assert_eq!(
            d.fav_skills_list().unwrap(),
            "=== Favorite Skills ===\n\n[core]\n  - alpha\n\n[general]\n  - beta\n"
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn remove_favorite_skill_only_from_first_category() {
        let (dir, d) = temp_dashboard();
        d.fav_skills_add("foo", "a").unwrap();
        d.fav_skills_add("foo", "b").unwrap();
        assert_eq!(d.fav_skills_remove("foo").unwrap(), "Removed 'foo' from favorites");
        let doc = d.store().load().unwrap();
        assert!(doc.favorite_skills.category("a").unwrap().is_empty());
        assert_eq!(doc.favorite_skills.category("b").unwrap(), ["foo"]);
        d.fav_skills_remove("foo").unwrap();
        assert_eq!(
            d.fav_skills_remove("foo").unwrap(),
            "'foo' not found in favorites"
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn removing_unknown_persona_leaves_store_untouched() {
        let (dir, d) = temp_dashboard();
        assert_eq!(d.fav_personas_remove("ghost").unwrap(), "'ghost' not found");
        assert_eq!(d.fav_skills_remove("ghost").unwrap(), "'ghost' not found in favorites");
        assert!(!dir.exists(), "lookups that change nothing must not create the data dir");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn persona_favorites_cycle() {
        let (dir, d) = temp_dashboard();
        assert_eq!(d.fav_personas_list().unwrap(), "No favorite personas yet.");
        d.fav_personas_add("sage").unwrap();
        assert_eq!(d.fav_personas_add("sage").unwrap(), "'sage' already in favorites");
        d.fav_personas_add("scout").unwrap();
        assert_eq!(
            d.fav_personas_list().unwrap(),
            "=== Favorite Personas ===\n  - sage\n  - scout"
        );
        assert_eq!(d.fav_personas_remove("sage").unwrap(), "Removed 'sage' from favorites");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn recency_log_is_bounded_fifo() {
        let (dir, d) = temp_dashboard();
        for i in 1..=53 {
            d.track_made(&format!("skill-{}", i)).unwrap();
        }
        let doc = d.store().load().unwrap();
        assert_eq!(doc.recently_made.len(), 50);
        assert_eq!(doc.recently_made[0].name, "skill-4");
        assert_eq!(doc.recently_made[49].name, "skill-53");
        let listing = d.recently_made(2).unwrap();
        assert!(listing.starts_with("=== Recently Made ===\n  - skill-52 ("));
        assert!(listing.contains("\n  - skill-53 ("));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn empty_recents_report_nothing_tracked() {
        let (dir, d) = temp_dashboard();
        assert_eq!(
            d.recently_made(DEFAULT_RECENT_LIMIT).unwrap(),
            "No recently made skills tracked."
        );
        assert_eq!(
            d.recently_equipped(DEFAULT_RECENT_LIMIT).unwrap(),
            "No recently equipped items tracked."
        );
        d.track_equipped("alpha").unwrap();
        assert!(d
            .recently_equipped(DEFAULT_RECENT_LIMIT)
            .unwrap()
            .starts_with("=== Recently Equipped ===\n  - alpha ("));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn zero_limit_reports_nothing_tracked() {
        let (dir, d) = temp_dashboard();
        d.track_made("alpha").unwrap();
        d.track_equipped("beta").unwrap();
        assert_eq!(d.recently_made(0).unwrap(), "No recently made skills tracked.");
        assert_eq!(
            d.recently_equipped(0).unwrap(),
            "No recently equipped items tracked."
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn issue_lifecycle() {
        let (dir, d) = temp_dashboard();
        assert_eq!(d.review_issues(None).unwrap(), "No issues.");
        let created = d.create_issue("Bug A", "desc", "urgent,ui").unwrap();
        assert_eq!(created, "Created issue: issue_1 - Bug A");
        let listing = d.review_issues(None).unwrap();
        assert!(listing.starts_with("=== Issues ===\n[issue_1] Bug A ("));
        let detail = d.review_issues(Some("issue_1")).unwrap();
        assert!(detail.starts_with("=== Bug A ===\nID: issue_1\nTags: urgent, ui\nCreated: "));
        assert!(detail.ends_with("\n\ndesc"));
        assert_eq!(
            d.review_issues(Some("issue_9")).unwrap(),
            "Issue 'issue_9' not found"
        );
        assert!(d
            .create_issue("Bug B", "", "")
            .unwrap()
            .starts_with("Created issue: issue_2"));
        let doc = d.store().load().unwrap();
        assert!(doc.issues[1].tags.is_empty());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn legacy_issue_count_drives_next_id() {
        let (dir, d) = temp_dashboard();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            d.store().path(),
            r#"{"favorite_skills": {}, "favorite_personas": [], "recently_made": [], "recently_equipped": [],
               "issues": [
                 {"id": "issue_1", "title": "a", "body": "", "tags": [], "created": "2024-05-01T10:00:00"},
                 {"id": "issue_2", "title": "b", "body": "", "tags": [], "created": "2024-05-02T10:00:00"}
               ]}"#,
        )
        .unwrap();
        assert_eq!(
            d.create_issue("c", "", "").unwrap(),
            "Created issue: issue_3 - c"
        );
        assert_eq!(
            d.review_issues(None).unwrap(),
            format!(
                "=== Issues ===\n[issue_1] a (2024-05-01)\n[issue_2] b (2024-05-02)\n[issue_3] c ({})",
                &d.store().load().unwrap().issues[2].created[..10]
            )
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn exhausted_issue_counter_is_corrupt_state() {
        let (dir, d) = temp_dashboard();
        std::fs::create_dir_all(&dir).unwrap();
        let legacy = r#"{"issues": [
            {"id": "issue_18446744073709551615", "title": "last", "body": "", "tags": [], "created": "2024-05-01T10:00:00"}
        ]}"#;
        std::fs::write(d.store().path(), legacy).unwrap();
        let err = d.create_issue("overflow", "", "").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::CorruptState);
        assert_eq!(std::fs::read_to_string(d.store().path()).unwrap(), legacy);
        let _ = std::fs::remove_dir_all(dir);
    }
}
