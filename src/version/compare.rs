use super::VersionAnalyzer;
use super::extract::has_digit;
use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

const MIN_VERSION_LEN: usize = 2;
const MAX_VERSION_LEN: usize = 20;

/// Substrings that mark a mis-extracted prose fragment or URL piece.
const INVALID_MARKERS: &[&str] = &[
    "only",
    "latest",
    "current",
    "version",
    "unknown",
    "null",
    "none",
    "description",
    "name",
    "title",
    "app",
    "package",
    "install",
    "download",
    "file",
    "url",
    "http",
    "www",
    "com",
    "org",
];

static SEPARATOR_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_]+").unwrap());

/// Structural split of a normalized version string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionParts {
    pub numeric: Vec<u128>,
    pub text: Vec<String>,
}

impl VersionParts {
    /// Split a normalized version on `.`.
    ///
    /// A segment's leading digits become a numeric component and whatever
    /// follows them a text component; a segment without leading digits is
    /// text as a whole. Empty segments are ignored.
    pub fn split(normalized: &str) -> Self {
        let mut parts = VersionParts::default();

        for segment in normalized.split('.').filter(|s| !s.is_empty()) {
            let digits_end = segment
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(segment.len());

            if digits_end == 0 {
                parts.text.push(segment.to_string());
                continue;
            }

            match segment[..digits_end].parse::<u128>() {
                Ok(number) => parts.numeric.push(number),
                // Longer than u128 can hold; keep it comparable as text.
                Err(_) => parts.text.push(segment[..digits_end].to_string()),
            }

            let suffix = &segment[digits_end..];
            if !suffix.is_empty() {
                parts.text.push(suffix.to_string());
            }
        }

        parts
    }

    fn numeric_at(&self, idx: usize) -> u128 {
        self.numeric.get(idx).copied().unwrap_or(0)
    }
}

impl VersionAnalyzer {
    /// Reject strings that cannot plausibly be a version.
    pub fn is_valid_version(version: &str) -> bool {
        let len = version.chars().count();
        if !(MIN_VERSION_LEN..=MAX_VERSION_LEN).contains(&len) || !has_digit(version) {
            return false;
        }

        let lower = version.to_lowercase();
        !INVALID_MARKERS.iter().any(|marker| lower.contains(marker))
    }

    /// Collapse `-`/`_` runs into `.` and drop a single leading `v`.
    pub fn normalize(version: &str) -> String {
        let dotted = SEPARATOR_RUN.replace_all(version, ".");
        match dotted.strip_prefix('v') {
            Some(rest) => rest.to_string(),
            None => dotted.into_owned(),
        }
    }

    /// Normalize then split into numeric and text components.
    pub fn split_parts(version: &str) -> VersionParts {
        VersionParts::split(&Self::normalize(version))
    }

    /// Check if `latest` is strictly newer than `current`.
    ///
    /// Strict semver ordering is tried first; anything semver cannot parse is
    /// compared with [`VersionAnalyzer::compare_semantic`]. Never fails: an
    /// undecidable pair is "not newer".
    pub fn is_newer(latest: &str, current: &str) -> bool {
        if latest.is_empty() || current.is_empty() || latest == current {
            return false;
        }

        if !Self::is_valid_version(latest) || !Self::is_valid_version(current) {
            return false;
        }

        match (
            semver::Version::parse(latest),
            semver::Version::parse(current),
        ) {
            (Ok(latest), Ok(current)) => latest > current,
            _ => {
                tracing::debug!(latest, current, "semver parse failed, using manual comparison");
                Self::compare_semantic(latest, current)
            }
        }
    }

    /// Manual ordering over normalized numeric/text parts.
    ///
    /// Missing numeric components count as `0`. When the numbers tie, text
    /// components only decide if both sides have some.
    pub fn compare_semantic(latest: &str, current: &str) -> bool {
        let latest = Self::split_parts(latest);
        let current = Self::split_parts(current);

        let width = latest.numeric.len().max(current.numeric.len());
        for idx in 0..width {
            match latest.numeric_at(idx).cmp(&current.numeric_at(idx)) {
                Ordering::Equal => continue,
                Ordering::Greater => return true,
                Ordering::Less => return false,
            }
        }

        if latest.text.is_empty() || current.text.is_empty() {
            return false;
        }

        latest.text > current.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rules() {
        assert!(!VersionAnalyzer::is_valid_version("only"));
        assert!(VersionAnalyzer::is_valid_version("1.0"));
        assert!(!VersionAnalyzer::is_valid_version(""));
        assert!(!VersionAnalyzer::is_valid_version("1"));
        assert!(!VersionAnalyzer::is_valid_version("1.2.3.4.5.6.7.8.9.10.11"));
        assert!(!VersionAnalyzer::is_valid_version("com.example"));
        assert!(!VersionAnalyzer::is_valid_version("Package Name 2"));
        assert!(!VersionAnalyzer::is_valid_version("http://x/1"));
        assert!(VersionAnalyzer::is_valid_version("2025.06.26-3"));
    }

    #[test]
    fn normalize_collapses_separators_and_leading_v() {
        assert_eq!(VersionAnalyzer::normalize("v1.2.3"), "1.2.3");
        assert_eq!(VersionAnalyzer::normalize("1.2.3-rc1"), "1.2.3.rc1");
        assert_eq!(VersionAnalyzer::normalize("1__2--3"), "1.2.3");
        assert_eq!(VersionAnalyzer::normalize("vv1"), "v1");
    }

    #[test]
    fn split_dash_build_increment() {
        let parts = VersionAnalyzer::split_parts("2025.06.26-3");
        assert_eq!(parts.numeric, vec![2025, 6, 26, 3]);
        assert!(parts.text.is_empty());
    }

    #[test]
    fn split_release_candidate_suffix() {
        let parts = VersionAnalyzer::split_parts("1.2.3-rc1");
        assert_eq!(parts.numeric, vec![1, 2, 3]);
        assert_eq!(parts.text, vec!["rc1".to_string()]);
    }

    #[test]
    fn split_mixed_segment() {
        let parts = VersionAnalyzer::split_parts("4.0b2");
        assert_eq!(parts.numeric, vec![4, 0]);
        assert_eq!(parts.text, vec!["b2".to_string()]);
    }

    #[test]
    fn split_is_idempotent() {
        let normalized = VersionAnalyzer::normalize("v3.1.4-beta_2");
        assert_eq!(
            VersionParts::split(&normalized),
            VersionParts::split(&normalized)
        );
    }

    #[test]
    fn same_version_is_not_newer() {
        for v in ["1.0", "1.2.3", "2025.06.26-3", "4.0b2"] {
            assert!(!VersionAnalyzer::is_newer(v, v), "{v}");
        }
    }

    #[test]
    fn semver_ordering() {
        assert!(VersionAnalyzer::is_newer("1.2.3", "1.2.2"));
        assert!(!VersionAnalyzer::is_newer("1.2.2", "1.2.3"));
        assert!(VersionAnalyzer::is_newer("2.3.0-beta", "2.1.0"));
        assert!(!VersionAnalyzer::is_newer("1.2.3-rc1", "1.2.3"));
    }

    #[test]
    fn dash_build_increment_is_newer() {
        assert!(VersionAnalyzer::is_newer("2025.06.26-3", "2025.06.26-2"));
        assert!(!VersionAnalyzer::is_newer("2025.06.26-2", "2025.06.26-3"));
    }

    #[test]
    fn fallback_treats_missing_components_as_zero() {
        assert!(VersionAnalyzer::is_newer("1.1", "1.0"));
        assert!(!VersionAnalyzer::is_newer("1.0.0.0", "1.0"));
        assert!(VersionAnalyzer::is_newer("1.0.1", "1.0"));
    }

    #[test]
    fn fallback_text_tiebreak_needs_both_sides() {
        assert!(VersionAnalyzer::compare_semantic("1.0.rc2", "1.0.rc1"));
        assert!(!VersionAnalyzer::compare_semantic("1.0.rc1", "1.0.rc2"));
        assert!(!VersionAnalyzer::compare_semantic("1.0.rc1", "1.0"));
        assert!(!VersionAnalyzer::compare_semantic("1.0", "1.0.rc1"));
    }

    #[test]
    fn invalid_inputs_are_never_newer() {
        assert!(!VersionAnalyzer::is_newer("", "1.0"));
        assert!(!VersionAnalyzer::is_newer("2.0", ""));
        assert!(!VersionAnalyzer::is_newer("latest", "1.0"));
        assert!(!VersionAnalyzer::is_newer("9.9", "none"));
    }

    #[test]
    fn oversized_numeric_segment_is_kept_as_text() {
        let huge = "999999999999999999999999999999999999999999.1";
        let parts = VersionAnalyzer::split_parts(huge);
        assert_eq!(parts.numeric, vec![1]);
        assert_eq!(parts.text.len(), 1);
        assert!(!VersionAnalyzer::compare_semantic(huge, "1.0"));
    }
}
