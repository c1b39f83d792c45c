use super::VersionAnalyzer;
use regex::Regex;
use std::sync::LazyLock;

const VERSION_LABEL: &str = "Version:";

/// Prose fragments that look lexically like a version after a `Version:` label.
const LABEL_BLOCKLIST: &[&str] = &[
    "only", "latest", "current", "version", "unknown", "null", "none",
];

const MAX_FALLBACK_DOTS: usize = 5;

static LABEL_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z.\-]+$").unwrap());

static LOOSE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v?\d+(?:\.\d+)*[\w.\-]*").unwrap());

impl VersionAnalyzer {
    /// Extract the latest version advertised in a repository tool's output.
    ///
    /// Labelled `Version:` lines win; when none of them yields a usable token the
    /// whole text is scanned for anything shaped like a dotted version.
    pub fn extract_latest_version(raw_text: &str) -> Option<String> {
        Self::labelled_candidates(raw_text)
            .into_iter()
            .next()
            .or_else(|| Self::loose_candidate(raw_text))
    }

    fn labelled_candidates(raw_text: &str) -> Vec<String> {
        raw_text
            .lines()
            .filter_map(|line| line.trim().strip_prefix(VERSION_LABEL))
            .filter_map(|rest| {
                let rest = rest.trim();
                let without_build = match rest.find('(') {
                    Some(idx) => &rest[..idx],
                    None => rest,
                };
                without_build.split_whitespace().next()
            })
            .filter(|candidate| Self::is_label_candidate(candidate))
            .map(str::to_string)
            .collect()
    }

    fn is_label_candidate(candidate: &str) -> bool {
        if !LABEL_CANDIDATE.is_match(candidate) || !has_digit(candidate) {
            return false;
        }

        let lower = candidate.to_lowercase();
        !LABEL_BLOCKLIST.iter().any(|token| lower.contains(token))
    }

    fn loose_candidate(raw_text: &str) -> Option<String> {
        raw_text
            .lines()
            .flat_map(|line| LOOSE_VERSION.find_iter(line))
            .map(|m| m.as_str())
            .find(|candidate| {
                candidate.len() >= 3
                    && candidate.contains('.')
                    && candidate.matches('.').count() <= MAX_FALLBACK_DOTS
                    && has_digit(candidate)
            })
            .map(str::to_string)
    }
}

pub(crate) fn has_digit(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_labelled_version_without_build_number() {
        assert_eq!(
            VersionAnalyzer::extract_latest_version("Version: 1.4.2 (99)\nOther: x"),
            Some("1.4.2".to_string())
        );
    }

    #[test]
    fn returns_none_for_unrelated_text() {
        assert_eq!(
            VersionAnalyzer::extract_latest_version("No version info here"),
            None
        );
    }

    #[test]
    fn labelled_line_may_be_indented() {
        let text = "Package: org.example.app\n    Version: 2.3.0-beta (12)\n";
        assert_eq!(
            VersionAnalyzer::extract_latest_version(text),
            Some("2.3.0-beta".to_string())
        );
    }

    #[test]
    fn first_accepted_label_wins() {
        let text = "Version: 3.0.1 (300)\nVersion: 2.9.0 (290)\n";
        assert_eq!(
            VersionAnalyzer::extract_latest_version(text),
            Some("3.0.1".to_string())
        );
    }

    #[test]
    fn blocklisted_label_is_skipped_for_later_label() {
        let text = "Version: latest2\nVersion: 5.1 (51)\n";
        assert_eq!(
            VersionAnalyzer::extract_latest_version(text),
            Some("5.1".to_string())
        );
    }

    #[test]
    fn label_without_digit_is_rejected() {
        let text = "Version: unknown\nsomething else";
        assert_eq!(VersionAnalyzer::extract_latest_version(text), None);
    }

    #[test]
    fn label_with_foreign_characters_falls_back_to_loose_scan() {
        let text = "Version: n/a\nChangelog mentions 1.2.7 release";
        assert_eq!(
            VersionAnalyzer::extract_latest_version(text),
            Some("1.2.7".to_string())
        );
    }

    #[test]
    fn loose_scan_keeps_leading_v_and_suffix() {
        let text = "Current release: v4.10.2-fdroid is out";
        assert_eq!(
            VersionAnalyzer::extract_latest_version(text),
            Some("v4.10.2-fdroid".to_string())
        );
    }

    #[test]
    fn loose_scan_requires_a_dot() {
        assert_eq!(
            VersionAnalyzer::extract_latest_version("Build 1234 published"),
            None
        );
    }

    #[test]
    fn loose_scan_rejects_too_many_dots() {
        let text = "addr 1.2.3.4.5.6.7 then 8.9";
        assert_eq!(
            VersionAnalyzer::extract_latest_version(text),
            Some("8.9".to_string())
        );
    }

    #[test]
    fn loose_scan_goes_top_to_bottom() {
        let text = "nothing\nfirst 1.0.0 and 2.0.0\nsecond 3.0.0";
        assert_eq!(
            VersionAnalyzer::extract_latest_version(text),
            Some("1.0.0".to_string())
        );
    }
}
