//! Candidate library access.
//!
//! The library is owned by another part of the tracker; the wheel only reads
//! it. `CandidateSource` is the seam: the binary uses `JsonFileSource`, tests
//! use an in-memory `Library`.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use gamewheel::GameStatus;

/// A game as stored in the tracker library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryGame {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: GameStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    #[default]
    Open,
    Accepted,
    Rejected,
}

/// A viewer-submitted game suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,
    #[serde(default)]
    pub status: SuggestionStatus,
}

/// Library contents at one revision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Library {
    #[serde(default)]
    pub games: Vec<LibraryGame>,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

impl Library {
    pub fn game(&self, id: &str) -> Option<&LibraryGame> {
        self.games.iter().find(|g| g.id == id)
    }

    pub fn open_suggestions(&self) -> impl Iterator<Item = &Suggestion> {
        self.suggestions
            .iter()
            .filter(|s| s.status == SuggestionStatus::Open)
    }
}

/// Read-only access to the candidate library.
pub trait CandidateSource: Send {
    fn load(&self) -> anyhow::Result<Library>;

    /// Changes whenever the underlying data changes. Used as part of the
    /// idle sample cache key.
    fn revision(&self) -> u64;
}

impl CandidateSource for Library {
    fn load(&self) -> anyhow::Result<Library> {
        Ok(self.clone())
    }

    fn revision(&self) -> u64 {
        0
    }
}

/// Library stored as a JSON file (`{"games": [...], "suggestions": [...]}`).
/// The revision is the file's modification time in milliseconds.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CandidateSource for JsonFileSource {
    fn load(&self) -> anyhow::Result<Library> {
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading library {}", self.path.display()))?;
        let library = serde_json::from_str(&contents)
            .with_context(|| format!("parsing library {}", self.path.display()))?;
        Ok(library)
    }

    fn revision(&self) -> u64 {
        std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "games": [
            {"id": "g1", "title": "Chrono Trigger", "console": "SNES", "status": "completed"},
            {"id": "g2", "title": "Castlevania", "console": "NES"}
        ],
        "suggestions": [
            {"id": "s1", "title": "EarthBound", "console": "SNES", "requester": "viewer"},
            {"id": "s2", "title": "Mother 3", "status": "rejected"}
        ]
    }"#;

    #[test]
    fn parses_library_json() {
        let lib: Library = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(lib.games.len(), 2);
        assert_eq!(lib.game("g1").unwrap().status, GameStatus::Completed);
        assert_eq!(lib.game("g2").unwrap().status, GameStatus::NotStarted);
        let open: Vec<_> = lib.open_suggestions().map(|s| s.id.as_str()).collect();
        assert_eq!(open, vec!["s1"]);
    }

    #[test]
    fn file_source_loads_and_reports_revision() {
        let path = std::env::temp_dir().join(format!("gamewheel-lib-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, SAMPLE).unwrap();
        let source = JsonFileSource::new(path.clone());
        assert_eq!(source.load().unwrap().games.len(), 2);
        assert!(source.revision() > 0);
        std::fs::remove_file(&path).unwrap();
        assert!(source.load().is_err());
        assert_eq!(source.revision(), 0);
    }
}
