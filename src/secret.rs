use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Client secret file as downloaded from the Google Cloud console.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ClientSecret {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed: Option<ClientSecretBundle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<ClientSecretBundle>,
}

/// Identity of the OAuth application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ClientSecretBundle {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ClientSecret {
    #[tracing::instrument(skip_all)]
    pub async fn read_from_file<F>(mut file: F) -> anyhow::Result<Self>
    where
        F: tokio::io::AsyncRead + Unpin,
    {
        use tokio::io::AsyncReadExt;

        let mut buf = String::new();
        let len = file.read_to_string(&mut buf).await?;
        tracing::debug!("read {len} bytes");
        let s: Self = serde_json::from_str(&buf)?;
        Ok(s)
    }

    /// `installed` wins over `web` when a file carries both.
    pub fn into_bundle(self) -> Option<ClientSecretBundle> {
        let Self { installed, web } = self;
        installed.or(web)
    }
}

impl ClientSecretBundle {
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, AuthError> {
        let client_secret = |source: anyhow::Error| AuthError::ClientSecret {
            path: path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| client_secret(e.into()))?;
        let secret = ClientSecret::read_from_file(file)
            .await
            .map_err(client_secret)?;
        secret
            .into_bundle()
            .ok_or_else(|| {
                client_secret(anyhow::anyhow!("neither `installed` nor `web` is present"))
            })
    }
}
