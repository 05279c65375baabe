/// Tags that registries routinely re-point at new content.
pub const MUTABLE_TAGS: &[&str] = &[
    "latest", "main", "master", "dev", "develop", "edge", "nightly", "canary",
];

/// Whether a service on `tag` may be pulled forward automatically.
///
/// Rules, first match wins:
/// 1. a well-known moving tag (`latest`, `main`, ...) → yes
/// 2. major only (`7`) → yes
/// 3. major.minor (`1.25`) → yes
/// 4. starts with a full `[v]X.Y.Z` version → no
/// 5. contains `-` → decide on the part before the first `-` (`7-alpine` → `7`)
/// 6. anything else → yes
pub fn is_upgradeable(tag: &str) -> bool {
    let mut tag = tag;
    loop {
        if MUTABLE_TAGS.contains(&tag) {
            return true;
        }
        if is_number(tag) || is_major_minor(tag) {
            return true;
        }
        if starts_with_full_version(tag) {
            return false;
        }
        match tag.split_once('-') {
            Some((head, _)) => tag = head,
            None => return true,
        }
    }
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_major_minor(s: &str) -> bool {
    s.split_once('.')
        .is_some_and(|(major, minor)| is_number(major) && is_number(minor))
}

/// `^v?[0-9]+\.[0-9]+\.[0-9]+`, anything may follow the patch number.
fn starts_with_full_version(s: &str) -> bool {
    let mut rest = s.strip_prefix('v').unwrap_or(s);
    for component in 0..3 {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return false;
        }
        rest = &rest[digits..];
        if component < 2 {
            match rest.strip_prefix('.') {
                Some(next) => rest = next,
                None => return false,
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_tags_are_upgradeable() {
        for tag in MUTABLE_TAGS {
            assert!(is_upgradeable(tag), "{tag}");
        }
    }

    #[test]
    fn major_and_major_minor_are_upgradeable() {
        assert!(is_upgradeable("7"));
        assert!(is_upgradeable("16"));
        assert!(is_upgradeable("1.25"));
        assert!(is_upgradeable("3.19"));
    }

    #[test]
    fn full_semver_is_pinned() {
        assert!(!is_upgradeable("15.3.1"));
        assert!(!is_upgradeable("v1.2.3"));
        assert!(!is_upgradeable("1.2.3.4"));
        assert!(!is_upgradeable("2.4.59rc1"));
    }

    #[test]
    fn full_semver_with_suffix_is_pinned_before_suffix_rule() {
        assert!(!is_upgradeable("1.25.3-alpine"));
        assert!(!is_upgradeable("v2.10.0-rc.1"));
    }

    #[test]
    fn suffix_rule_recurses_on_prefix() {
        assert!(is_upgradeable("7-alpine"));
        assert!(is_upgradeable("1.25-bookworm"));
        assert!(is_upgradeable("latest-debian"));
        assert!(!is_upgradeable("3.12.1-slim-bookworm"));
    }

    #[test]
    fn suffix_rule_applies_repeatedly() {
        // "16-bullseye-slim" → "16"
        assert!(is_upgradeable("16-bullseye-slim"));
    }

    #[test]
    fn unrecognized_shapes_default_to_upgradeable() {
        assert!(is_upgradeable("stable"));
        assert!(is_upgradeable("v1"));
        assert!(is_upgradeable("1.2.x"));
        assert!(is_upgradeable("-weird"));
        assert!(is_upgradeable(""));
    }

    #[test]
    fn classification_is_idempotent() {
        for tag in ["latest", "7-alpine", "15.3.1", "stable", "1.25"] {
            assert_eq!(is_upgradeable(tag), is_upgradeable(tag));
        }
    }

    #[test]
    fn v_prefixed_major_minor_is_not_rule_three() {
        // Only rule 6 accepts it; rules 2-4 don't match "v1.2".
        assert!(is_upgradeable("v1.2"));
    }
}
