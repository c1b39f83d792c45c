use crate::version::{Classification, Verdict};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A detected upgrade for one installed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateRecord {
    pub package: String,
    pub current: String,
    pub latest: String,
}

impl fmt::Display for UpdateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.package, self.current, self.latest)
    }
}

/// Update record with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedUpdate {
    #[serde(flatten)]
    pub record: UpdateRecord,
    pub classification: Classification,
    pub reason: String,
}

impl ClassifiedUpdate {
    pub fn new(record: UpdateRecord, verdict: Verdict) -> Self {
        Self {
            record,
            classification: verdict.classification,
            reason: verdict.reason,
        }
    }

    pub fn is_questionable(&self) -> bool {
        self.classification == Classification::Questionable
    }
}

/// Why a package produced no update record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SkipReason {
    /// Device or repository lookup failed, timed out, or had no data.
    CollaboratorUnavailable,
    /// No version could be extracted from the repository output.
    ExtractionMiss,
    /// Installed or advertised version failed validation.
    ValidationFailure,
    /// Repository version is not newer than the installed one.
    NotNewer,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkipReason::CollaboratorUnavailable => "unavailable",
            SkipReason::ExtractionMiss => "no version found",
            SkipReason::ValidationFailure => "invalid version",
            SkipReason::NotNewer => "up to date",
        };
        f.write_str(label)
    }
}

/// Everything a scan of one device produced.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub updates: Vec<ClassifiedUpdate>,
    pub skipped: BTreeMap<SkipReason, usize>,
    pub scanned: usize,
    pub interrupted: bool,
}

impl ScanOutcome {
    pub fn record_skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn valid(&self) -> impl Iterator<Item = &ClassifiedUpdate> {
        self.updates.iter().filter(|u| !u.is_questionable())
    }

    pub fn questionable(&self) -> impl Iterator<Item = &ClassifiedUpdate> {
        self.updates.iter().filter(|u| u.is_questionable())
    }

    /// Valid updates, followed by the questionable ones `accept` keeps.
    pub fn into_plan<F>(self, mut accept: F) -> UpdatePlan
    where
        F: FnMut(&ClassifiedUpdate) -> bool,
    {
        let (questionable, valid): (Vec<_>, Vec<_>) =
            self.updates.into_iter().partition(|u| u.is_questionable());

        let mut plan = UpdatePlan {
            records: valid.into_iter().map(|u| u.record).collect(),
            declined: Vec::new(),
        };

        for update in questionable {
            if accept(&update) {
                plan.records.push(update.record);
            } else {
                plan.declined.push(update.record);
            }
        }

        plan
    }
}

/// Ordered list of updates to install.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePlan {
    pub records: Vec<UpdateRecord>,
    /// Questionable updates that were not opted in.
    pub declined: Vec<UpdateRecord>,
}

impl UpdatePlan {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
