use crate::constants::DEFAULT_LOCATIONS;

/// Defaults first, then custom entries in store order. Membership against the
/// defaults is an exact, case-sensitive match.
pub fn build_pool(custom: &[String]) -> Vec<String> {
    let mut pool: Vec<String> = DEFAULT_LOCATIONS.iter().map(|name| name.to_string()).collect();
    for name in custom {
        if !pool.iter().any(|existing| existing == name) {
            pool.push(name.clone());
        }
    }
    pool
}

pub fn normalize_location_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_entries_follow_defaults() {
        let pool = build_pool(&["Moon Base".to_string()]);
        assert_eq!(pool.len(), DEFAULT_LOCATIONS.len() + 1);
        assert_eq!(pool[DEFAULT_LOCATIONS.len()], "Moon Base");
        assert_eq!(pool[0], DEFAULT_LOCATIONS[0]);
    }

    #[test]
    fn exact_default_duplicates_are_skipped_but_case_variants_kept() {
        let pool = build_pool(&["Beach 🏖️".to_string(), "beach 🏖️".to_string()]);
        assert_eq!(pool.len(), DEFAULT_LOCATIONS.len() + 1);
        assert_eq!(pool.last().map(String::as_str), Some("beach 🏖️"));
    }

    #[test]
    fn normalize_rejects_blank_names() {
        assert_eq!(normalize_location_name("   "), None);
        assert_eq!(normalize_location_name(""), None);
        assert_eq!(
            normalize_location_name("  Moon Base ").as_deref(),
            Some("Moon Base")
        );
    }
}
