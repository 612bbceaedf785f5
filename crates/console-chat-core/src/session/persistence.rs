//! Transcript persistence - save and load the visible conversation
//!
//! Transcripts are pretty-printed JSON files named `<id>.json`. Only the
//! timeline is stored; attachment bytes never reach disk.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::types::{new_id, Message};
use crate::error::Result;

/// Saved conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTranscript {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SavedTranscript {
    pub fn new(project_id: Option<String>, messages: Vec<Message>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            project_id,
            messages,
            created_at: now,
            updated_at: now,
        }
    }

    /// First user message, shortened for listings
    pub fn title(&self) -> String {
        self.messages
            .iter()
            .find_map(|m| match m {
                Message::User(u) if !u.content.trim().is_empty() => Some(u.content.trim()),
                _ => None,
            })
            .map(|text| {
                let mut title: String = text.chars().take(60).collect();
                if text.chars().count() > 60 {
                    title.push('…');
                }
                title
            })
            .unwrap_or_else(|| "(empty)".to_string())
    }
}

/// Get the transcripts directory path
pub fn transcripts_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("console-chat"))
        .unwrap_or_else(|| PathBuf::from(".console-chat"))
        .join("transcripts")
}

fn transcript_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{}.json", id))
}

/// Write `transcript` into `dir`, replacing an earlier save with the same id
pub fn save_transcript_in(dir: &Path, transcript: &SavedTranscript) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = transcript_path(dir, &transcript.id);
    let json = serde_json::to_string_pretty(transcript)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Load a transcript by id, `None` if it does not exist
pub fn load_transcript_in(dir: &Path, id: &str) -> Result<Option<SavedTranscript>> {
    let path = transcript_path(dir, id);
    if !path.exists() {
        return Ok(None);
    }

    let json = std::fs::read_to_string(&path)?;
    let saved: SavedTranscript = serde_json::from_str(&json)?;
    Ok(Some(saved))
}

/// List transcripts in `dir`, most recently updated first
pub fn list_transcripts_in(dir: &Path) -> Result<Vec<SavedTranscript>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut transcripts = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            match std::fs::read_to_string(&path) {
                Ok(json) => match serde_json::from_str::<SavedTranscript>(&json) {
                    Ok(transcript) => transcripts.push(transcript),
                    Err(e) => warn!("Failed to parse transcript {:?}: {}", path, e),
                },
                Err(e) => warn!("Failed to read transcript {:?}: {}", path, e),
            }
        }
    }

    transcripts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(transcripts)
}

pub fn save_transcript(transcript: &SavedTranscript) -> Result<PathBuf> {
    save_transcript_in(&transcripts_dir(), transcript)
}

pub fn load_transcript(id: &str) -> Result<Option<SavedTranscript>> {
    load_transcript_in(&transcripts_dir(), id)
}

pub fn list_transcripts() -> Result<Vec<SavedTranscript>> {
    list_transcripts_in(&transcripts_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let transcript = SavedTranscript::new(
            Some("shop".to_string()),
            vec![Message::user("list databases", Vec::new()), Message::model("None yet.")],
        );

        save_transcript_in(dir.path(), &transcript).unwrap();
        let loaded = load_transcript_in(dir.path(), &transcript.id).unwrap().unwrap();
        assert_eq!(loaded, transcript);
    }

    #[test]
    fn test_load_missing() {
        let dir = TempDir::new().unwrap();
        assert!(load_transcript_in(dir.path(), "nope").unwrap().is_none());
    }

    #[test]
    fn test_list_most_recent_first_and_skips_garbage() {
        let dir = TempDir::new().unwrap();
        let mut older = SavedTranscript::new(None, vec![Message::user("older", Vec::new())]);
        older.updated_at = older.updated_at - Duration::hours(1);
        let newer = SavedTranscript::new(None, vec![Message::user("newer", Vec::new())]);

        save_transcript_in(dir.path(), &older).unwrap();
        save_transcript_in(dir.path(), &newer).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let listed = list_transcripts_in(dir.path()).unwrap();
        let titles: Vec<_> = listed.iter().map(|t| t.title()).collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }

    #[test]
    fn test_title_truncates() {
        let long = "x".repeat(80);
        let transcript = SavedTranscript::new(None, vec![Message::user(long, Vec::new())]);
        assert_eq!(transcript.title().chars().count(), 61);
        assert_eq!(SavedTranscript::new(None, Vec::new()).title(), "(empty)");
    }
}
