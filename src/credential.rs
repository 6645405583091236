use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::client::AuthorizedUser;
use crate::error::{CacheMiss, WriteError};
use crate::secret::ClientSecretBundle;

/// User grant in the `authorized_user` format Google client libraries read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Credential {
    #[serde(rename = "type")]
    pub kind: AuthorizedUser,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl Credential {
    pub fn new(bundle: &ClientSecretBundle, refresh_token: &str) -> Self {
        Self {
            kind: AuthorizedUser::new(),
            client_id: bundle.client_id.clone(),
            client_secret: bundle.client_secret.clone(),
            refresh_token: refresh_token.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedCredential {
    Present(Credential),
    Absent,
}

impl CachedCredential {
    pub fn into_option(self) -> Option<Credential> {
        match self {
            Self::Present(credential) => Some(credential),
            Self::Absent => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[tracing::instrument(skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> CachedCredential {
        match self.try_load().await {
            Ok(credential) => {
                tracing::debug!("loaded cached credential");
                CachedCredential::Present(credential)
            }
            Err(CacheMiss::Missing) => {
                tracing::debug!("no cached credential");
                CachedCredential::Absent
            }
            Err(miss) => {
                let err = &miss as &(dyn std::error::Error + 'static);
                tracing::warn!(err, "ignoring cached credential");
                CachedCredential::Absent
            }
        }
    }

    async fn try_load(&self) -> Result<Credential, CacheMiss> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(CacheMiss::Missing),
            Err(e) => return Err(CacheMiss::Unreadable(e)),
        };
        serde_json::from_slice(&content).map_err(CacheMiss::Malformed)
    }

    /// Replaces the persisted credential. The content goes to a sibling
    /// temporary file first and is renamed over the target, so a reader
    /// never sees a partial write and concurrent writers end with the last
    /// rename.
    #[tracing::instrument(skip_all, fields(path = %self.path.display()))]
    pub async fn save(
        &self,
        bundle: &ClientSecretBundle,
        refresh_token: &str,
    ) -> Result<Credential, WriteError> {
        let credential = Credential::new(bundle, refresh_token);
        let payload = serde_json::to_vec(&credential).map_err(|e| self.write_error(e.into()))?;
        let tmp = self.temp_path();
        if let Err(e) = write_private(&tmp, &payload).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.write_error(e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.write_error(e));
        }
        tracing::info!("saved credential");
        Ok(credential)
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let suffix: u32 = rand::random();
        self.path
            .with_file_name(format!(".{name}.{}.{suffix:08x}.tmp", std::process::id()))
    }

    fn write_error(&self, source: io::Error) -> WriteError {
        WriteError {
            path: self.path.clone(),
            source,
        }
    }
}

async fn write_private(path: &Path, payload: &[u8]) -> io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options.open(path).await?;
    file.write_all(payload).await?;
    file.sync_all().await
}
