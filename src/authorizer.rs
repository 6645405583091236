use std::path::PathBuf;
use std::sync::Arc;

use crate::client::AuthorizedClient;
use crate::credential::{CachedCredential, CredentialStore};
use crate::error::AuthError;
use crate::flow::InteractiveFlow;
use crate::scope::{MeetingsSpaceCreated, Scope};
use crate::secret::ClientSecretBundle;

/// Produces an [`AuthorizedClient`], from the cached credential when one is
/// usable and from the interactive flow otherwise.
#[derive(Clone)]
pub struct Authorizer {
    store: CredentialStore,
    client_secret_path: PathBuf,
    flow: Arc<dyn InteractiveFlow>,
}

impl Authorizer {
    pub fn new<F>(store: CredentialStore, client_secret_path: impl Into<PathBuf>, flow: F) -> Self
    where
        F: InteractiveFlow,
    {
        Self {
            store,
            client_secret_path: client_secret_path.into(),
            flow: Arc::new(flow),
        }
    }

    #[inline]
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// A cached credential is returned as is, even if Google has revoked
    /// it since; that surfaces when the client first mints an access token.
    ///
    /// A fresh grant is persisted when it carries a refresh token. Failing
    /// to write it is logged and otherwise ignored, but failing to read the
    /// client secret needed to write it fails the whole call.
    #[tracing::instrument(skip_all)]
    pub async fn authorize(&self) -> Result<AuthorizedClient, AuthError> {
        if let CachedCredential::Present(credential) = self.store.load().await {
            return Ok(AuthorizedClient::from_credential(credential));
        }

        tracing::info!("no usable cached credential, starting interactive authorization");
        let client = self.flow.run(MeetingsSpaceCreated.space_delimited()).await?;
        let Some(refresh_token) = client.refresh_token() else {
            tracing::debug!("grant carries no refresh token, skip persisting");
            return Ok(client);
        };
        let bundle = ClientSecretBundle::load(&self.client_secret_path).await?;
        if let Err(err) = self.store.save(&bundle, refresh_token).await {
            let err = &err as &(dyn std::error::Error + 'static);
            tracing::warn!(err, "could not persist credential");
        }
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::flow::fake::FakeFlow;

    const CLIENT_SECRET: &str = r#"{ "installed": { "client_id": "A", "client_secret": "B" } }"#;
    const CACHED: &str =
        r#"{"type":"authorized_user","client_id":"A","client_secret":"B","refresh_token":"cached"}"#;

    fn authorizer(dir: &Path, token_path: PathBuf, flow: &FakeFlow) -> Authorizer {
        let secret_path = dir.join("credentials.json");
        Authorizer::new(CredentialStore::new(token_path), secret_path, flow.clone())
    }

    fn write_client_secret(dir: &Path) {
        std::fs::write(dir.join("credentials.json"), CLIENT_SECRET).unwrap();
    }

    #[tokio::test]
    async fn test_cache_hit_skips_flow() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        std::fs::write(&token_path, CACHED).unwrap();
        let flow = FakeFlow::granting("fresh");

        let client = authorizer(dir.path(), token_path.clone(), &flow)
            .authorize()
            .await
            .unwrap();

        assert_eq!(flow.calls(), 0);
        assert_eq!(client.refresh_token(), Some("cached"));
        assert!(client.token().is_none());
        assert_eq!(std::fs::read_to_string(&token_path).unwrap(), CACHED);
    }

    #[tokio::test]
    async fn test_cache_miss_runs_flow_once() {
        let dir = tempfile::tempdir().unwrap();
        write_client_secret(dir.path());
        let flow = FakeFlow::granting("fresh");

        authorizer(dir.path(), dir.path().join("token.json"), &flow)
            .authorize()
            .await
            .unwrap();

        assert_eq!(flow.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_cache_runs_flow_once() {
        let dir = tempfile::tempdir().unwrap();
        write_client_secret(dir.path());
        let token_path = dir.path().join("token.json");
        std::fs::write(&token_path, r#"{"type":"authorized_user","#).unwrap();
        let flow = FakeFlow::granting("fresh");

        authorizer(dir.path(), token_path, &flow)
            .authorize()
            .await
            .unwrap();

        assert_eq!(flow.calls(), 1);
    }

    #[tokio::test]
    async fn test_fresh_grant_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        write_client_secret(dir.path());
        let token_path = dir.path().join("token.json");
        let flow = FakeFlow::granting("fresh");

        let client = authorizer(dir.path(), token_path.clone(), &flow)
            .authorize()
            .await
            .unwrap();

        assert_eq!(client.refresh_token(), Some("fresh"));
        let written = std::fs::read_to_string(&token_path).unwrap();
        assert_eq!(
            written,
            r#"{"type":"authorized_user","client_id":"A","client_secret":"B","refresh_token":"fresh"}"#
        );
    }

    #[tokio::test]
    async fn test_second_call_uses_persisted_grant() {
        let dir = tempfile::tempdir().unwrap();
        write_client_secret(dir.path());
        let flow = FakeFlow::granting("fresh");
        let authorizer = authorizer(dir.path(), dir.path().join("token.json"), &flow);

        authorizer.authorize().await.unwrap();
        let client = authorizer.authorize().await.unwrap();

        assert_eq!(flow.calls(), 1);
        assert!(client.token().is_none());
        assert_eq!(client.refresh_token(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_unreadable_client_secret_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        let flow = FakeFlow::granting("fresh");

        let err = authorizer(dir.path(), token_path.clone(), &flow)
            .authorize()
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::ClientSecret { .. }));
        assert!(!token_path.exists());
    }

    #[tokio::test]
    async fn test_write_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_client_secret(dir.path());
        let token_path = dir.path().join("missing").join("token.json");
        let flow = FakeFlow::granting("fresh");

        let client = authorizer(dir.path(), token_path.clone(), &flow)
            .authorize()
            .await
            .unwrap();

        assert_eq!(client.refresh_token(), Some("fresh"));
        assert!(!token_path.exists());
    }

    #[tokio::test]
    async fn test_grant_without_refresh_token_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        let flow = FakeFlow::default();

        let client = authorizer(dir.path(), token_path.clone(), &flow)
            .authorize()
            .await
            .unwrap();

        assert_eq!(flow.calls(), 1);
        assert!(client.token().is_some());
        assert!(!token_path.exists());
    }

    #[tokio::test]
    async fn test_declined_flow() {
        let dir = tempfile::tempdir().unwrap();
        write_client_secret(dir.path());
        let flow = FakeFlow {
            declined: true,
            ..Default::default()
        };

        let err = authorizer(dir.path(), dir.path().join("token.json"), &flow)
            .authorize()
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Declined(_)));
        assert_eq!(flow.calls(), 1);
    }
}
