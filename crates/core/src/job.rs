//! Job-level constants and the analysis mode enumeration.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Mission id recorded when intake does not supply one.
pub const DEFAULT_MISSION_ID: &str = "TEST-001";

/// Aircraft label recorded when intake does not supply one.
pub const DEFAULT_AIRCRAFT: &str = "UNKNOWN";

/// How the engine obtains its flight data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobMode {
    /// The engine synthesises a flight itself.
    Simulate,
    /// The engine analyses a CSV file uploaded at intake.
    CsvUpload,
}

impl JobMode {
    /// Return the mode name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simulate => "SIMULATE",
            Self::CsvUpload => "CSV_UPLOAD",
        }
    }

    /// Parse a stored mode name. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SIMULATE" => Some(Self::Simulate),
            "CSV_UPLOAD" => Some(Self::CsvUpload),
            _ => None,
        }
    }

    /// Parse a stored mode name, failing on unknown values.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::from_str(s).ok_or_else(|| CoreError::UnknownVariant {
            kind: "job mode",
            value: s.to_string(),
        })
    }

    /// Whether the engine needs an input file for this mode.
    pub fn requires_input(&self) -> bool {
        matches!(self, Self::CsvUpload)
    }

    /// All valid mode values.
    pub const ALL: &'static [&'static str] = &["SIMULATE", "CSV_UPLOAD"];
}

impl std::fmt::Display for JobMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn stored_names_round_trip() {
        for name in JobMode::ALL {
            let mode = JobMode::from_str(name).expect("known mode");
            assert_eq!(mode.as_str(), *name);
        }
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert_eq!(JobMode::from_str("simulate"), None);
        assert_matches!(
            JobMode::parse("BATCH"),
            Err(CoreError::UnknownVariant { kind: "job mode", .. })
        );
    }

    #[test]
    fn only_upload_requires_input() {
        assert!(JobMode::CsvUpload.requires_input());
        assert!(!JobMode::Simulate.requires_input());
    }
}
