//! Artifact kinds and the fixed file-name allowlist of an output directory.

use serde::{Deserialize, Serialize};

/// Embedded database the engine writes into every output directory.
pub const ENGINE_DB_FILE_NAME: &str = "test.db";

/// File name intake stores an uploaded CSV under.
pub const INPUT_FILE_NAME: &str = "input.csv";

/// Kind of a tracked output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactKind {
    Input,
    Db,
    Csv,
    Html,
    Pdf,
}

/// File names tracked as artifacts. Anything else in an output directory
/// is engine scratch output and is ignored.
pub const ARTIFACT_ALLOWLIST: &[(&str, ArtifactKind)] = &[
    (ENGINE_DB_FILE_NAME, ArtifactKind::Db),
    ("report.html", ArtifactKind::Html),
    ("report.pdf", ArtifactKind::Pdf),
    ("sim_flight.csv", ArtifactKind::Csv),
    (INPUT_FILE_NAME, ArtifactKind::Input),
];

impl ArtifactKind {
    /// Return the kind as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "INPUT",
            Self::Db => "DB",
            Self::Csv => "CSV",
            Self::Html => "HTML",
            Self::Pdf => "PDF",
        }
    }

    /// Parse a stored kind. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "INPUT" => Some(Self::Input),
            "DB" => Some(Self::Db),
            "CSV" => Some(Self::Csv),
            "HTML" => Some(Self::Html),
            "PDF" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Look up the kind of an allowlisted file name (exact match).
    pub fn for_file_name(file_name: &str) -> Option<Self> {
        ARTIFACT_ALLOWLIST
            .iter()
            .find(|(name, _)| *name == file_name)
            .map(|(_, kind)| *kind)
    }

    /// All valid stored values.
    pub const ALL: &'static [&'static str] = &["INPUT", "DB", "CSV", "HTML", "PDF"];
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlisted_names_map_to_kinds() {
        assert_eq!(ArtifactKind::for_file_name("test.db"), Some(ArtifactKind::Db));
        assert_eq!(ArtifactKind::for_file_name("report.html"), Some(ArtifactKind::Html));
        assert_eq!(ArtifactKind::for_file_name("report.pdf"), Some(ArtifactKind::Pdf));
        assert_eq!(ArtifactKind::for_file_name("sim_flight.csv"), Some(ArtifactKind::Csv));
        assert_eq!(ArtifactKind::for_file_name("input.csv"), Some(ArtifactKind::Input));
    }

    #[test]
    fn other_names_are_ignored() {
        for name in ["scratch.tmp", "REPORT.HTML", "test.db-journal", "", "sub/test.db"] {
            assert_eq!(ArtifactKind::for_file_name(name), None, "{name:?}");
        }
    }

    #[test]
    fn stored_names_round_trip() {
        for name in ArtifactKind::ALL {
            let kind = ArtifactKind::from_str(name).expect("known kind");
            assert_eq!(kind.as_str(), *name);
        }
    }
}
