//! Interactive consent flow for installed applications.
//!
//! The user is sent to Google's consent page with a loopback redirect URI.
//! A short-lived callback server on `127.0.0.1` receives the redirect and
//! hands the authorization code back to the flow, which exchanges it for a
//! token.

use std::future::IntoFuture;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::{routing, Router};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

use crate::client::{AuthorizedClient, UnauthorizedClient};
use crate::error::AuthError;
use crate::scope::SpaceDelimitedScope;
use crate::secret::ClientSecretBundle;

/// Obtains a fresh grant with the user's consent.
pub trait InteractiveFlow: Send + Sync + 'static {
    fn run(&self, scope: SpaceDelimitedScope)
        -> BoxFuture<'_, Result<AuthorizedClient, AuthError>>;
}

#[derive(Debug, Clone)]
pub struct LoopbackFlow {
    client_secret_path: PathBuf,
    open_browser: bool,
}

impl LoopbackFlow {
    pub fn new(client_secret_path: impl Into<PathBuf>) -> Self {
        Self {
            client_secret_path: client_secret_path.into(),
            open_browser: true,
        }
    }

    /// Only log the consent URL instead of launching a browser.
    pub fn without_browser(self) -> Self {
        Self {
            open_browser: false,
            ..self
        }
    }

    #[tracing::instrument(skip_all)]
    async fn authorize(&self, scope: SpaceDelimitedScope) -> Result<AuthorizedClient, AuthError> {
        let secret = ClientSecretBundle::load(&self.client_secret_path).await?;
        let server = CallbackServer::bind().await?;
        let client = UnauthorizedClient::builder()
            .scope(scope)
            .redirect_uri(server.redirect_uri())
            .secret(&secret)
            .build()?;
        let state = random_state();
        let url = client.generate_url(&state);
        tracing::info!("authorize url: {url}");
        if self.open_browser {
            if let Err(e) = open::that_detached(&url) {
                tracing::warn!(%e, "could not open a browser; open the authorize url manually");
            }
        }
        let code = server.wait_for_code(&state).await?;
        client.authorize_with_code(code).await
    }
}

impl InteractiveFlow for LoopbackFlow {
    fn run(
        &self,
        scope: SpaceDelimitedScope,
    ) -> BoxFuture<'_, Result<AuthorizedClient, AuthError>> {
        Box::pin(self.authorize(scope))
    }
}

fn random_state() -> String {
    let bytes: [u8; 16] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// One-shot HTTP server receiving the consent redirect.
pub struct CallbackServer {
    listener: TcpListener,
    addr: SocketAddr,
}

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<str>,
    code_tx: mpsc::UnboundedSender<Result<String, AuthError>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct CallbackParam {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl CallbackParam {
    fn into_code(self, expected_state: &str) -> Result<String, AuthError> {
        let Self { code, state, error } = self;
        if let Some(error) = error {
            return Err(AuthError::Declined(error));
        }
        if state.as_deref() != Some(expected_state) {
            return Err(AuthError::StateMismatch);
        }
        code.ok_or_else(|| AuthError::Flow("redirect carried no authorization code".to_string()))
    }
}

impl CallbackServer {
    pub const PATH: &'static str = "/oauth2callback";

    pub async fn bind() -> Result<Self, AuthError> {
        let bind_error =
            |e: std::io::Error| AuthError::Flow(format!("could not bind callback listener: {e}"));
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .map_err(bind_error)?;
        let addr = listener.local_addr().map_err(bind_error)?;
        tracing::debug!(%addr, "callback listener bound");
        Ok(Self { listener, addr })
    }

    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}{}", self.addr.port(), Self::PATH)
    }

    /// Serves until the first redirect reaches [`Self::PATH`], then shuts
    /// down and returns the code it carried.
    #[tracing::instrument(skip_all, fields(addr = %self.addr))]
    pub async fn wait_for_code(self, expected_state: &str) -> Result<String, AuthError> {
        let (code_tx, mut code_rx) = mpsc::unbounded_channel();
        let state = CallbackState {
            expected_state: Arc::from(expected_state),
            code_tx,
        };
        let layer =
            tower::ServiceBuilder::new().layer(tower_http::trace::TraceLayer::new_for_http());
        let router = Router::new()
            .route(Self::PATH, routing::get(callback))
            .with_state(state)
            .layer(layer);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let serve = axum::serve(self.listener, router).with_graceful_shutdown(async move {
            match shutdown_rx.await {
                Ok(()) => {}
                Err(e) => tracing::error!(%e, "shutdown signal error"),
            }
        });
        let serve = tokio::spawn(serve.into_future());

        let code = code_rx.recv().await;
        if let Err(()) = shutdown_tx.send(()) {
            tracing::error!("failed to send shutdown");
        }
        match serve.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(%e, "callback server error"),
            Err(e) => tracing::warn!(%e, "callback server task failed"),
        }
        code.unwrap_or_else(|| {
            Err(AuthError::Flow(
                "callback server stopped before a redirect".to_string(),
            ))
        })
    }
}

#[tracing::instrument(skip_all)]
async fn callback(
    State(state): State<CallbackState>,
    Query(param): Query<CallbackParam>,
) -> (http::StatusCode, &'static str) {
    let code = param.into_code(&state.expected_state);
    let response = match &code {
        Ok(_) => (
            http::StatusCode::OK,
            "Authorization complete. You can close this window.",
        ),
        Err(e) => {
            let error = e as &(dyn std::error::Error + 'static);
            tracing::warn!(error, "rejected redirect");
            (
                http::StatusCode::BAD_REQUEST,
                "Authorization failed. You can close this window.",
            )
        }
    };
    let Ok(()) = state.code_tx.send(code) else {
        tracing::error!("mpsc channel error");
        return (http::StatusCode::INTERNAL_SERVER_ERROR, "channel error");
    };
    response
}
