//! Behavioral flags derived from trace event activity text
//!
//! Activity wording differs across Cassandra versions, so classification is
//! driven by a versioned pattern table rather than literal string matches.
//! All patterns are case-insensitive. Operators can extend the table from
//! `[tracing.flag_patterns]`.

use crate::error::ClassifierError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Version tag of the built-in pattern table
pub const PATTERN_TABLE_VERSION: &str = "c2.0-c4.1/1";

/// A behavior observed during a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    ReadRepair,
    Timeout,
    IndexUsed,
}

/// Set of flags carried by a session
pub type FlagSet = BTreeSet<Flag>;

impl Flag {
    pub const ALL: [Flag; 3] = [Flag::ReadRepair, Flag::Timeout, Flag::IndexUsed];

    /// Name used in configuration and JSON output
    pub fn name(&self) -> &'static str {
        match self {
            Flag::ReadRepair => "read_repair",
            Flag::Timeout => "timeout",
            Flag::IndexUsed => "index_used",
        }
    }

    /// Column heading for text output
    pub fn label(&self) -> &'static str {
        match self {
            Flag::ReadRepair => "Read Repair",
            Flag::Timeout => "Timeout",
            Flag::IndexUsed => "Index",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Flag {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Flag::ALL
            .into_iter()
            .find(|flag| flag.name() == s)
            .ok_or_else(|| ClassifierError::UnknownFlag(s.to_string()))
    }
}

const BUILTIN_PATTERNS: &[(Flag, &[&str])] = &[
    (Flag::ReadRepair, &[r"read[-_ ]?repair", r"digest mismatch"]),
    (Flag::Timeout, &[r"timed out", r"timeout"]),
    (
        Flag::IndexUsed,
        &[
            r"index(ed)? scan",
            r"secondary index",
            r"candidate index",
            r"scanning .* index",
            r"using index",
        ],
    ),
];

fn compile(flag: Flag, pattern: &str) -> Result<Regex, ClassifierError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| ClassifierError::Pattern {
            flag: flag.name().to_string(),
            source,
        })
}

static BUILTIN_RULES: LazyLock<Vec<(Flag, Regex)>> = LazyLock::new(|| {
    BUILTIN_PATTERNS
        .iter()
        .flat_map(|(flag, patterns)| {
            patterns
                .iter()
                .map(move |p| (*flag, compile(*flag, p).unwrap()))
        })
        .collect()
});

/// Maps event activity text to flags
#[derive(Debug, Clone)]
pub struct FlagClassifier {
    version: String,
    rules: Vec<(Flag, Regex)>,
}

impl FlagClassifier {
    /// Classifier using the built-in pattern table
    pub fn builtin() -> Self {
        Self {
            version: PATTERN_TABLE_VERSION.to_string(),
            rules: BUILTIN_RULES.clone(),
        }
    }

    /// Extend the table with operator-supplied patterns keyed by flag name
    pub fn with_extra_patterns(
        mut self,
        extra: &BTreeMap<String, Vec<String>>,
    ) -> Result<Self, ClassifierError> {
        let mut added = 0;
        for (name, patterns) in extra {
            let flag: Flag = name.parse()?;
            for pattern in patterns {
                self.rules.push((flag, compile(flag, pattern)?));
                added += 1;
            }
        }
        if added > 0 {
            self.version = format!("{}+{}", self.version, added);
        }
        Ok(self)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Flags whose patterns match `activity`
    pub fn classify(&self, activity: &str) -> FlagSet {
        let mut flags = FlagSet::new();
        for (flag, pattern) in &self.rules {
            if !flags.contains(flag) && pattern.is_match(activity) {
                flags.insert(*flag);
            }
        }
        flags
    }
}

impl Default for FlagClassifier {
    fn default() -> Self {
        Self::builtin()
    }
}
