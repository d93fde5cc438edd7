use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::model::TokenEntry;
use crate::error::{ContentServiceError, Result};
use crate::metrics::InteractorMetrics;

pub const TOKEN_LENGTH: usize = 16;

pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

fn is_token(candidate: &str) -> bool {
    candidate.len() == TOKEN_LENGTH && candidate.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Uploads kept on disk as `<dir>/<token>.json`.
#[derive(Debug, Clone)]
pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, token: &str) -> PathBuf {
        self.dir.join(format!("{}.json", token))
    }

    /// Persists `entry` under a fresh token and returns the token.
    pub async fn save(&self, entry: &TokenEntry) -> Result<String> {
        fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec(entry)?;
        let token = loop {
            let token = generate_token();
            if !fs::try_exists(self.path(&token)).await? {
                break token;
            }
        };
        let tmp = self.dir.join(format!("{}.json.tmp", token));
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, self.path(&token)).await?;
        info!("Stored {} bytes under token {}", bytes.len(), token);
        Ok(token)
    }

    pub async fn load(&self, token: &str) -> Result<TokenEntry> {
        let not_found = || ContentServiceError::not_found(format!("Token {} not found", token));
        if !is_token(token) {
            InteractorMetrics::record_token_lookup(false);
            return Err(not_found());
        }
        let bytes = match fs::read(self.path(token)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Token {} not on disk (expired or never issued)", token);
                InteractorMetrics::record_token_lookup(false);
                return Err(not_found());
            }
            Err(e) => return Err(e.into()),
        };
        InteractorMetrics::record_token_lookup(true);
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactors::model::CustomPsicquic;
    use chrono::Utc;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_tokens_are_alphanumeric() {
        let token = generate_token();
        assert!(is_token(&token));
        assert_ne!(token, generate_token());
        assert!(!is_token("../../etc/passwd"));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("tokens"));
        let entry = TokenEntry::Psicquic(CustomPsicquic {
            name: "local".into(),
            url: "http://localhost/psicquic/".into(),
            created: Utc::now(),
        });
        let token = assert_ok!(store.save(&entry).await);
        assert!(dir.path().join("tokens").join(format!("{token}.json")).exists());
        assert_eq!(assert_ok!(store.load(&token).await), entry);
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path());
        assert!(matches!(
            store.load("AAAAAAAAAAAAAAAA").await,
            Err(ContentServiceError::NotFound(_))
        ));
        assert_err!(store.load("short").await);
    }
}
