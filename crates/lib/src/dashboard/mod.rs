//! Dashboard: favorites, recency logs, and an issue tracker kept in one JSON document
//! (`<data-dir>/skill_dashboard.json`), independent of the catalog's own storage.

mod document;
mod ops;
mod store;

pub use document::{
    parse_tags, DashboardDocument, FavoriteSkills, Issue, RecentEntry, RECENT_CAP, SCHEMA_VERSION,
};
pub use ops::{Dashboard, DEFAULT_CATEGORY, DEFAULT_RECENT_LIMIT};
pub use store::DashboardStore;
