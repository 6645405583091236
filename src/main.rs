use google_meet_link::{
    make_router, AppState, Authorizer, Config, CredentialStore, GoogleMeet, LoopbackFlow,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

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
    let state = AppState::new(authorizer, GoogleMeet);

    let addr = config.addr();
    tracing::info!("listening on {addr}");
    let layer = tower::ServiceBuilder::new().layer(TraceLayer::new_for_http());
    let router = make_router(state).layer(layer);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutting down"),
        Err(e) => tracing::error!(%e, "could not listen for ctrl-c"),
    }
}
