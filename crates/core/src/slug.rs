//! Filesystem-safe slugs.

/// Maximum slug length in characters.
pub const MAX_SLUG_LEN: usize = 50;

/// Slug used when a name has no usable characters.
pub const FALLBACK_SLUG: &str = "business";

/// Lower-case ASCII alphanumeric runs of `name` joined by `-`.
///
/// ```
/// use aichatflows_core::slug::slugify;
///
/// assert_eq!(slugify("Joe's Café & Bar"), "joe-s-caf-bar");
/// assert_eq!(slugify("../../etc"), "etc");
/// assert_eq!(slugify("   "), "business");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len().min(MAX_SLUG_LEN));
    for word in name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let sep = usize::from(!slug.is_empty());
        if slug.len() + sep + word.len() > MAX_SLUG_LEN {
            let room = MAX_SLUG_LEN.saturating_sub(slug.len() + sep);
            if room > 0 {
                if sep == 1 {
                    slug.push('-');
                }
                slug.push_str(&word[..room].to_ascii_lowercase());
            }
            break;
        }
        if sep == 1 {
            slug.push('-');
        }
        slug.push_str(&word.to_ascii_lowercase());
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_names() {
        assert_eq!(slugify("Sunrise Coffee"), "sunrise-coffee");
        assert_eq!(slugify("  A--B  "), "a-b");
        assert_eq!(slugify("Cafe 42"), "cafe-42");
    }

    #[test]
    fn test_non_ascii_and_separators_are_dropped() {
        assert_eq!(slugify("Ünïcode"), "n-code");
        assert_eq!(slugify("a/b\\c"), "a-b-c");
        assert_eq!(slugify("🍕🍕"), FALLBACK_SLUG);
    }

    #[test]
    fn test_length_is_capped() {
        let slug = slugify(&"word ".repeat(40));
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));

        let slug = slugify(&"x".repeat(80));
        assert_eq!(slug.len(), MAX_SLUG_LEN);
    }
}
