//! File-backed SessionStore implementation.
//!
//! One JSON file per patient under `sessions/`, plus a `last_patient.txt`
//! marker. Saves are write-to-temp-then-rename so an overwrite is atomic
//! and idempotent; deletes remove the file immediately.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use pharmachat_core::error::Result;
use pharmachat_core::session::{ChatMessage, SessionStore};
use pharmachat_core::PharmaError;

/// JSON-file session store keyed by patient id.
///
/// Directory structure:
/// ```text
/// base_dir/
/// ├── sessions/
/// │   ├── P001.json
/// │   └── P002.json
/// └── last_patient.txt
/// ```
pub struct JsonSessionStore {
    base_dir: PathBuf,
    sessions_dir: PathBuf,
}

impl JsonSessionStore {
    /// Creates a store at the default location (`~/.config/pharmachat`).
    pub async fn default_location() -> Result<Self> {
        let base_dir = crate::paths::PharmaPaths::config_dir()
            .map_err(|e| PharmaError::config(format!("failed to resolve config directory: {e}")))?;
        Self::new(base_dir).await
    }

    /// Creates a store rooted at `base_dir`, creating directories as needed.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let sessions_dir = base_dir.join("sessions");
        fs::create_dir_all(&sessions_dir)
            .await
            .map_err(|e| PharmaError::io(format!("failed to create sessions directory: {e}")))?;
        Ok(Self {
            base_dir,
            sessions_dir,
        })
    }

    /// Returns the directory session files live in.
    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn session_file(&self, patient_id: &str) -> PathBuf {
        // Patient ids are plain identifiers; strip path separators anyway.
        let safe: String = patient_id
            .chars()
            .map(|c| if c == '/' || c == '\\' || c == '.' { '_' } else { c })
            .collect();
        self.sessions_dir.join(format!("{safe}.json"))
    }

    fn last_patient_file(&self) -> PathBuf {
        self.base_dir.join("last_patient.txt")
    }
}

#[async_trait]
impl SessionStore for JsonSessionStore {
    async fn load_messages(&self, patient_id: &str) -> Result<Option<Vec<ChatMessage>>> {
        let path = self.session_file(patient_id);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PharmaError::data_access(format!(
                    "failed to read session snapshot for {patient_id}: {e}"
                )));
            }
        };

        let messages: Vec<ChatMessage> = serde_json::from_str(&raw)?;
        Ok(Some(messages))
    }

    async fn save_messages(&self, patient_id: &str, messages: &[ChatMessage]) -> Result<()> {
        let path = self.session_file(patient_id);
        let tmp = path.with_extension("json.tmp");
        let raw = serde_json::to_string_pretty(messages)?;

        fs::write(&tmp, raw)
            .await
            .map_err(|e| PharmaError::data_access(format!("failed to write snapshot: {e}")))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| PharmaError::data_access(format!("failed to commit snapshot: {e}")))?;

        tracing::debug!(patient_id, count = messages.len(), "session snapshot saved");
        Ok(())
    }

    async fn delete_messages(&self, patient_id: &str) -> Result<()> {
        let path = self.session_file(patient_id);
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(patient_id, "session snapshot removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PharmaError::data_access(format!(
                "failed to delete session snapshot for {patient_id}: {e}"
            ))),
        }
    }

    async fn last_selected_patient(&self) -> Result<Option<String>> {
        let path = self.last_patient_file();
        match fs::read_to_string(&path).await {
            Ok(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(trimmed.to_string()))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PharmaError::data_access(format!(
                "failed to read last selected patient: {e}"
            ))),
        }
    }

    async fn set_last_selected_patient(&self, patient_id: &str) -> Result<()> {
        fs::write(self.last_patient_file(), patient_id)
            .await
            .map_err(|e| PharmaError::data_access(format!("failed to record last patient: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_log() -> Vec<ChatMessage> {
        vec![
            ChatMessage::user(1, "I need Metformin 500mg, 60 tablets"),
            ChatMessage::assistant(2, "I've prepared your order preview.", None),
        ]
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSessionStore::new(temp_dir.path()).await.unwrap();

        let log = sample_log();
        store.save_messages("P001", &log).await.unwrap();

        let loaded = store.load_messages("P001").await.unwrap().unwrap();
        assert_eq!(loaded, log);
    }

    #[tokio::test]
    async fn test_load_missing_patient_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSessionStore::new(temp_dir.path()).await.unwrap();
        assert!(store.load_messages("P404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_is_idempotent_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSessionStore::new(temp_dir.path()).await.unwrap();

        store.save_messages("P001", &sample_log()).await.unwrap();
        let shorter = vec![ChatMessage::user(1, "hello")];
        store.save_messages("P001", &shorter).await.unwrap();

        let loaded = store.load_messages("P001").await.unwrap().unwrap();
        assert_eq!(loaded, shorter);
    }

    #[tokio::test]
    async fn test_delete_is_immediate_and_repeatable() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSessionStore::new(temp_dir.path()).await.unwrap();

        store.save_messages("P001", &sample_log()).await.unwrap();
        store.delete_messages("P001").await.unwrap();
        assert!(store.load_messages("P001").await.unwrap().is_none());

        // Deleting again is not an error.
        store.delete_messages("P001").await.unwrap();
    }

    #[tokio::test]
    async fn test_last_selected_patient() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSessionStore::new(temp_dir.path()).await.unwrap();

        assert_eq!(store.last_selected_patient().await.unwrap(), None);
        store.set_last_selected_patient("P002").await.unwrap();
        assert_eq!(
            store.last_selected_patient().await.unwrap(),
            Some("P002".to_string())
        );
    }

    #[tokio::test]
    async fn test_patient_id_cannot_escape_sessions_dir() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonSessionStore::new(temp_dir.path()).await.unwrap();

        store
            .save_messages("../sneaky", &sample_log())
            .await
            .unwrap();
        let loaded = store.load_messages("../sneaky").await.unwrap();
        assert!(loaded.is_some());
        // Nothing was written outside the sessions directory.
        assert!(!temp_dir.path().join("sneaky.json").exists());
    }
}
