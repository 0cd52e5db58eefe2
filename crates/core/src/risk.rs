//! Four-level risk / severity classification shared by sessions and
//! anomalies.
//!
//! The engine writes free-text labels; [`RiskClass::classify`] maps them
//! case-insensitively and falls back to the most lenient level. An
//! unparseable label is never escalated.

use serde::{Deserialize, Serialize};

/// Risk classification, ordered least to most severe.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskClass {
    #[default]
    Observation,
    Minor,
    Major,
    Critical,
}

impl RiskClass {
    /// Return the classification as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Observation => "OBSERVATION",
            Self::Minor => "MINOR",
            Self::Major => "MAJOR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Parse a stored classification. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "OBSERVATION" => Some(Self::Observation),
            "MINOR" => Some(Self::Minor),
            "MAJOR" => Some(Self::Major),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Map an engine label to a classification.
    ///
    /// Matching ignores case and surrounding whitespace. `None`, empty and
    /// unrecognised labels all map to [`RiskClass::Observation`].
    pub fn classify(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return Self::Observation;
        };
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "major" => Self::Major,
            "minor" => Self::Minor,
            _ => Self::Observation,
        }
    }

    /// All valid stored values.
    pub const ALL: &'static [&'static str] = &["OBSERVATION", "MINOR", "MAJOR", "CRITICAL"];
}

impl std::fmt::Display for RiskClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_ignores_case() {
        for label in ["Critical", "CRITICAL", "critical", " critical\n"] {
            assert_eq!(RiskClass::classify(Some(label)), RiskClass::Critical, "{label:?}");
        }
        assert_eq!(RiskClass::classify(Some("MaJoR")), RiskClass::Major);
        assert_eq!(RiskClass::classify(Some("minor")), RiskClass::Minor);
        assert_eq!(RiskClass::classify(Some("observation")), RiskClass::Observation);
    }

    #[test]
    fn unrecognised_labels_are_lenient() {
        for label in [Some("unknown"), Some(""), Some("severe"), Some("crit"), None] {
            assert_eq!(RiskClass::classify(label), RiskClass::Observation, "{label:?}");
        }
    }

    #[test]
    fn ordering_runs_least_to_most_severe() {
        assert!(RiskClass::Observation < RiskClass::Minor);
        assert!(RiskClass::Minor < RiskClass::Major);
        assert!(RiskClass::Major < RiskClass::Critical);
        assert_eq!(RiskClass::default(), RiskClass::Observation);
    }

    #[test]
    fn stored_names_round_trip() {
        for name in RiskClass::ALL {
            let class = RiskClass::from_str(name).expect("known class");
            assert_eq!(class.as_str(), *name);
        }
        assert_eq!(RiskClass::from_str("critical"), None);
    }
}
