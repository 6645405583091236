//! Runs the authorization once so the server starts with a cached
//! credential.

use google_meet_link::{Authorizer, Config, CredentialStore, LoopbackFlow};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    google_meet_link::init_tracing();

    let config = Config::from_env()?;
    let flow = LoopbackFlow::new(&config.credentials_path);
    let authorizer = Authorizer::new(
        CredentialStore::new(&config.token_path),
        &config.credentials_path,
        flow,
    );
    let client = authorizer.authorize().await?;
    let client = client.ready().await?;
    if client.refresh_token().is_none() {
        anyhow::bail!("Google granted no refresh token; nothing was cached");
    }
    let cached = authorizer.store().load().await.into_option().is_some();
    println!(
        "authorized client {}; credential cached at {}: {cached}",
        client.client_id(),
        config.token_path.display(),
    );
    Ok(())
}
