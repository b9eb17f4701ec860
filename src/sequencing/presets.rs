//! Named pattern library.
//!
//! Presets are stored as pattern text so they go through the same parser as
//! user input. Categories group names for pickers; a name can appear in more
//! than one category.

/// Every preset as `(name, pattern text)`, in display order.
pub const PRESETS: &[(&str, &str)] = &[
    // Basic
    ("quarter", "0 1 2 3"),
    ("eighth", "0 0.5 1 1.5 2 2.5 3 3.5"),
    (
        "sixteenth",
        "0 0.25 0.5 0.75 1 1.25 1.5 1.75 2 2.25 2.5 2.75 3 3.25 3.5 3.75",
    ),
    ("offbeat", "0.5 1.5 2.5 3.5"),
    // Offbeat variations
    ("offbeatQuarter", "1 3"),
    ("offbeatTriple", "1 2 3"),
    ("lateOffbeat", "0.25 0.75 1.25 1.75 2.25 2.75 3.25 3.75"),
    // Drums
    ("kickSnare", "0 1 2 3"),
    ("house", "0 1 2 3"),
    ("jungle", "0 0.5 1 1.75 2 2.5 3 3.75"),
    ("hiphop", "0 1.66 2 3.66"),
    ("trap", "0 0.5 1 2 2.5 3"),
    // Rhythmic
    ("waltz", "0 1 2"),
    ("tresillo", "0 1.33 2.66"),
    ("clave", "0 1.5 2.66 4 5.5"),
    ("chachacha", "0 1 1.5 2.5 3"),
    ("swing", "0 0.66 1 1.66 2 2.66 3 3.66"),
    // Experimental
    ("sparse", "0 1.2 2.8"),
    ("fibonacci", "0 1 1.6 2.6 4.2"),
    ("primes", "0 1.1 1.7 2.3 2.9 3.7"),
    ("golden", "0 0.618 1.618 2.618"),
    ("random", "0.12 0.87 1.32 1.94 2.41 3.67"),
];

/// Preset names grouped for display.
pub const CATEGORIES: &[(&str, &[&str])] = &[
    ("basic", &["quarter", "eighth", "sixteenth", "offbeat"]),
    (
        "offbeat",
        &["offbeat", "offbeatQuarter", "offbeatTriple", "lateOffbeat"],
    ),
    ("drum", &["kickSnare", "house", "jungle", "hiphop", "trap"]),
    (
        "rhythmic",
        &["waltz", "tresillo", "clave", "chachacha", "swing"],
    ),
    (
        "experimental",
        &["sparse", "fibonacci", "primes", "golden", "random"],
    ),
];

/// Pattern text for a preset name. Lookup is exact.
pub fn get(name: &str) -> Option<&'static str> {
    PRESETS
        .iter()
        .find(|(preset, _)| *preset == name)
        .map(|(_, text)| *text)
}

/// All preset names, in display order.
pub fn names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|(name, _)| *name)
}

/// Preset names in a category, if it exists.
pub fn category(name: &str) -> Option<&'static [&'static str]> {
    CATEGORIES
        .iter()
        .find(|(category, _)| *category == name)
        .map(|(_, names)| *names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencing::pattern::parse;

    #[test]
    fn test_every_preset_parses_fully() {
        for (name, text) in PRESETS {
            let tokens = text.split_whitespace().count();
            assert_eq!(
                parse(text).len(),
                tokens,
                "preset {} should contain only numbers",
                name
            );
        }
    }

    #[test]
    fn test_categories_only_name_known_presets() {
        for (category, names) in CATEGORIES {
            for name in *names {
                assert!(
                    get(name).is_some(),
                    "category {} refers to unknown preset {}",
                    category,
                    name
                );
            }
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(get("offbeat"), Some("0.5 1.5 2.5 3.5"));
        assert_eq!(get("Offbeat"), None);
        assert_eq!(category("drum").map(|names| names.len()), Some(5));
        assert!(names().any(|name| name == "golden"));
    }
}
