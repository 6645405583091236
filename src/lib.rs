pub mod authorizer;
pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod flow;
mod route;
pub mod scope;
mod secret;
mod telemetry;

pub use authorizer::Authorizer;
pub use client::meet::{CreateSpace, GoogleMeet, Space};
pub use client::{AuthorizedClient, Token, UnauthorizedClient};
pub use config::Config;
pub use credential::{CachedCredential, Credential, CredentialStore};
pub use error::{AuthError, Error, UpstreamError, WriteError};
pub use flow::{InteractiveFlow, LoopbackFlow};
pub use route::{make_router, AppState, CreateMeetResponse};
pub use scope::Scope;
pub use secret::{ClientSecret, ClientSecretBundle};
pub use telemetry::init_tracing;
