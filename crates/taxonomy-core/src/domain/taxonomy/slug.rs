//! Identifier derivation
//!
//! Turns human-readable names into deterministic slugs. Derivation is pure:
//! the same input always yields the same id, on every machine. Distinct names
//! may collapse to one slug ("C++" and "C#" both become `c`), so anything
//! that creates records from a derived id must treat a clash as a collision
//! and pick a suffixed id instead of overwriting.

/// Prefix for derived skill identifiers
pub const SKILL_ID_PREFIX: &str = "skill";

/// Derive a slug from a name
///
/// Lower-cases, drops characters outside `[a-z0-9\s-]`, collapses runs of
/// whitespace and hyphens into a single `-`, and trims leading/trailing
/// hyphens.
pub fn derive(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else if c == '-' || c.is_whitespace() {
            pending_separator = true;
        }
        // anything else is stripped without acting as a separator
    }

    slug
}

/// Base identifier for a skill name: `skill-<slug>`, or `skill` when the
/// name has no sluggable characters
pub fn skill_id_base(name: &str) -> String {
    let slug = derive(name);
    if slug.is_empty() {
        SKILL_ID_PREFIX.to_string()
    } else {
        format!("{}-{}", SKILL_ID_PREFIX, slug)
    }
}

/// Apply the collision suffix policy: attempt 0 is the bare base, attempt
/// `n` is `base-n`
pub fn with_suffix(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}

/// Identifier for a child node that was declared without an explicit id
pub fn child_id(parent_id: &str, label: &str) -> String {
    let slug = derive(label);
    if slug.is_empty() {
        parent_id.to_string()
    } else {
        format!("{}-{}", parent_id, slug)
    }
}

/// Trim and collapse internal whitespace, preserving case
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Natural key used for case-insensitive skill matching
pub fn name_key(name: &str) -> String {
    normalize_name(name).to_lowercase()
}
