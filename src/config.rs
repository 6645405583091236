use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Persisted user credential.
    pub token_path: PathBuf,
    /// Client secret downloaded from the Google Cloud console.
    pub credentials_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Self::DEFAULT_PORT,
            token_path: Self::DEFAULT_TOKEN_PATH.into(),
            credentials_path: Self::DEFAULT_CREDENTIALS_PATH.into(),
        }
    }
}

impl Config {
    pub const DEFAULT_PORT: u16 = 5000;
    pub const DEFAULT_TOKEN_PATH: &'static str = "token.json";
    pub const DEFAULT_CREDENTIALS_PATH: &'static str = "credentials.json";

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let port = match lookup("PORT") {
            Some(port) => port
                .parse()
                .with_context(|| format!("PORT is not a valid port: {port}"))?,
            None => default.port,
        };
        let token_path = lookup("TOKEN_PATH").map_or(default.token_path, PathBuf::from);
        let credentials_path =
            lookup("CREDENTIALS_PATH").map_or(default.credentials_path, PathBuf::from);
        Ok(Self {
            port,
            token_path,
            credentials_path,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}
