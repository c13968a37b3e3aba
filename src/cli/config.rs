use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gate::TokenStore;

/// On-disk stand-in for browser storage. The token lives under the same
/// `token` key the web client uses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_at: Option<DateTime<Utc>>,
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("TRILHA_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("trilha").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// File-backed [`TokenStore`] used by the CLI.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Self::new(get_config_dir()?.join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<SessionFile> {
        if !self.path.exists() {
            return Ok(SessionFile::default());
        }

        let content = fs::read_to_string(&self.path)?;
        let session: SessionFile = serde_json::from_str(&content)?;
        Ok(session)
    }

    pub fn save(&self, session: &SessionFile) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        match self.load() {
            Ok(session) => session.token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!("Unreadable session file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn set(&self, token: &str) {
        let session = SessionFile {
            token: Some(token.to_string()),
            stored_at: Some(Utc::now()),
        };
        if let Err(e) = self.save(&session) {
            tracing::warn!("Failed to store session token: {}", e);
        }
    }

    fn remove(&self) {
        if let Err(e) = self.save(&SessionFile::default()) {
            tracing::warn!("Failed to clear session token: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_store() -> FileTokenStore {
        let dir = std::env::temp_dir().join(format!("trilha-cli-{}", uuid::Uuid::new_v4().simple()));
        fs::create_dir_all(&dir).unwrap();
        FileTokenStore::new(dir.join("session.json"))
    }

    #[test]
    fn missing_file_means_anonymous() {
        let store = scratch_store();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn token_survives_reopen() {
        let store = scratch_store();
        store.set("abc.def.ghi");

        let reopened = FileTokenStore::new(store.path().to_path_buf());
        assert_eq!(reopened.get().as_deref(), Some("abc.def.ghi"));

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"token\""));
    }

    #[test]
    fn remove_clears_token() {
        let store = scratch_store();
        store.set("abc.def.ghi");
        store.remove();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn corrupt_file_reads_as_anonymous() {
        let store = scratch_store();
        fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.get(), None);
    }
}
