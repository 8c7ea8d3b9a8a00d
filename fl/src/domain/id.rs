//! Record id helpers
//!
//! Catalog entries get readable slug ids (`water-the-fern`); user-owned
//! records get time-ordered UUIDv7 ids from the store.

/// Slugify a title for use as a catalog id
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        // Strip apostrophes entirely, replace other non-alphanumeric with hyphens
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c == '\'' || c == '\u{2019}' || c == '\u{2018}' {
                None
            } else {
                Some('-')
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Generate a fresh id for a user-owned record
pub fn generate_id() -> String {
    docstore::new_id()
}
