use super::VersionAnalyzer;
use serde::Serialize;
use std::fmt;

/// Markers in a version string that suggest a non-release build.
const SUSPICIOUS_MARKERS: &[&str] = &["only", "dev", "test", "debug", "alpha", "beta"];

const MAX_MAJOR_JUMP: i128 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Valid,
    Questionable,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::Valid => "valid",
            Classification::Questionable => "questionable",
        };
        f.write_str(label)
    }
}

/// Classification plus the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub classification: Classification,
    pub reason: String,
}

impl Verdict {
    pub fn valid() -> Self {
        Self {
            classification: Classification::Valid,
            reason: "regular upgrade".to_string(),
        }
    }

    fn questionable(reason: impl Into<String>) -> Self {
        Self {
            classification: Classification::Questionable,
            reason: reason.into(),
        }
    }

    pub fn is_questionable(&self) -> bool {
        self.classification == Classification::Questionable
    }
}

impl VersionAnalyzer {
    /// Classify an upgrade that already passed [`VersionAnalyzer::is_newer`].
    pub fn classify(current: &str, latest: &str) -> Verdict {
        let (current_major, latest_major) = match (major_of(current), major_of(latest)) {
            (Some(c), Some(l)) => (c, l),
            _ => return Verdict::questionable("major version is not a plain number"),
        };

        if latest_major - current_major > MAX_MAJOR_JUMP {
            return Verdict::questionable(format!(
                "major version jumps from {current_major} to {latest_major}"
            ));
        }

        // Can disagree with is_newer when a lower-order bump hides a major drop.
        if latest_major < current_major {
            return Verdict::questionable(format!(
                "major version drops from {current_major} to {latest_major}"
            ));
        }

        let lower = latest.to_lowercase();
        if let Some(marker) = SUSPICIOUS_MARKERS.iter().find(|m| lower.contains(*m)) {
            return Verdict::questionable(format!("looks like a pre-release build ('{marker}')"));
        }

        Verdict::valid()
    }

    pub fn is_questionable(current: &str, latest: &str) -> bool {
        Self::classify(current, latest).is_questionable()
    }
}

fn major_of(version: &str) -> Option<i128> {
    let head = version.split('.').next().unwrap_or(version);
    head.parse::<i128>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_major_jump_is_questionable() {
        assert!(VersionAnalyzer::is_questionable("1.0.0", "4.0.0"));
    }

    #[test]
    fn minor_bump_is_valid() {
        assert!(!VersionAnalyzer::is_questionable("1.0.0", "1.2.0"));
        assert!(!VersionAnalyzer::is_questionable("1.0.0", "3.0.0"));
    }

    #[test]
    fn pre_release_markers_are_questionable() {
        let verdict = VersionAnalyzer::classify("2.1.0", "2.3.0-beta");
        assert!(verdict.is_questionable());
        assert!(verdict.reason.contains("beta"));
        assert!(VersionAnalyzer::is_questionable("1.0", "1.1-DEBUG"));
    }

    #[test]
    fn unparseable_major_is_questionable() {
        assert!(VersionAnalyzer::is_questionable("v1.0", "v1.1"));
        assert!(VersionAnalyzer::is_questionable("1.0", "2-1"));
    }

    #[test]
    fn major_drop_is_questionable() {
        let verdict = VersionAnalyzer::classify("3.0", "2.9");
        assert_eq!(verdict.classification, Classification::Questionable);
        assert!(verdict.reason.contains("drops"));
    }

    #[test]
    fn date_style_versions_are_valid() {
        assert!(!VersionAnalyzer::is_questionable(
            "2025.06.26-2",
            "2025.06.26-3"
        ));
    }
}
