//! Durable storage for the session credential
//!
//! One bearer token lives in a JSON file: written on successful
//! authentication, overwritten on re-authentication, nulled on logout.
//! Writes use atomic temp-file + rename to prevent corruption on crash, and
//! a tokio Mutex keeps the in-memory slot consistent with the file.
//!
//! The store is pure storage: no token-shape validation, no expiry tracking.
//! Expiry is only ever discovered by a request failing upstream.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use paydeck_transport::CredentialSource;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// On-disk shape of the credential slot. The file holds either `null`
/// (no session) or this object.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCredential {
    access: String,
}

/// File-backed single-slot token store.
///
/// Implements `CredentialSource` so the request pipeline reads the current
/// token at request time without knowing about files.
pub struct TokenStore {
    path: PathBuf,
    state: Mutex<Option<String>>,
}

impl TokenStore {
    /// Load the credential slot from the given file path.
    ///
    /// A missing file is a first run: the slot is created as `null`.
    /// A malformed file degrades to "no credential" with a warning — a
    /// corrupt slot must never prevent the SDK from starting.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            match serde_json::from_str::<Option<StoredCredential>>(&contents) {
                Ok(stored) => {
                    debug!(path = %path.display(), present = stored.is_some(), "loaded credential slot");
                    stored.map(|c| c.access)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "malformed credential file, treating as absent");
                    None
                }
            }
        } else {
            info!(path = %path.display(), "credential file not found, starting unauthenticated");
            write_atomic(&path, &None).await?;
            None
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// The current token, if any.
    pub async fn get(&self) -> Option<String> {
        self.state.lock().await.clone()
    }

    /// Store a token, replacing any previous one, and persist.
    pub async fn set(&self, token: String) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = Some(token.clone());
        write_atomic(&self.path, &Some(StoredCredential { access: token })).await?;
        debug!("credential stored");
        Ok(())
    }

    /// Remove the token and persist the empty slot.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = None;
        write_atomic(&self.path, &None).await?;
        debug!("credential cleared");
        Ok(())
    }
}

impl CredentialSource for TokenStore {
    fn bearer(&self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>> {
        Box::pin(self.get())
    }
}

/// Write the credential slot atomically (temp file + rename) with 0600
/// permissions, since the file holds a live bearer token.
async fn write_atomic(path: &Path, data: &Option<StoredCredential>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing credential: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".credential.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    Ok(())
}
