use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::error::{AuthError, UpstreamError};
use crate::scope::{Scope, SpaceDelimitedScope};
use crate::secret::{ClientSecretBundle, DEFAULT_TOKEN_URI};

pub mod meet;
mod misc;

pub use misc::{AuthorizationCode, AuthorizedUser, Bearer, RefreshToken};

macro_rules! urlencoded {
    [ $($i:ident),+ ] => {
        [$(
            format!(
                concat!(stringify!($i), "={}"),
                ::percent_encoding::utf8_percent_encode(& $i, ::percent_encoding::NON_ALPHANUMERIC)
            )
        ),+].join("&")
    };
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub redirect_uri: String,
    pub scope: SpaceDelimitedScope,
}

/// Client holding only the application identity; turns a consent
/// redirect into an [`AuthorizedClient`].
#[derive(Clone)]
pub struct UnauthorizedClient {
    secret: ClientSecretBundle,
    config: ClientConfig,
    client: reqwest::Client,
}

impl UnauthorizedClient {
    pub fn new(secret: ClientSecretBundle, config: ClientConfig) -> Self {
        Self {
            secret,
            config,
            client: Default::default(),
        }
    }

    pub fn builder() -> UnauthorizedClientBuilder {
        UnauthorizedClientBuilder::default()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn generate_url(&self, state: &str) -> String {
        let Self { secret, config, .. } = self;
        let ClientSecretBundle {
            client_id,
            auth_uri,
            ..
        } = secret;
        let ClientConfig {
            redirect_uri,
            scope,
        } = config;
        let scope = scope.to_string();
        let response_type = "code";
        let access_type = "offline";
        let prompt = "consent";
        let query = urlencoded![
            client_id,
            redirect_uri,
            scope,
            response_type,
            access_type,
            prompt,
            state
        ];
        format!("{auth_uri}?{query}")
    }

    #[tracing::instrument(skip_all)]
    pub async fn acquire_token_with<'a, S>(&'a self, code: S) -> Result<Token, AuthError>
    where
        S: Into<Cow<'a, str>>,
    {
        let Self {
            secret,
            config: ClientConfig { redirect_uri, .. },
            client,
        } = self;
        let ClientSecretBundle {
            client_id,
            token_uri,
            client_secret,
            ..
        } = secret;
        let code = code.into();
        let grant_type = AuthorizationCode::new().to_string();
        let body = urlencoded![client_id, client_secret, code, grant_type, redirect_uri];
        let exchange = |e: reqwest::Error| AuthError::Exchange(e.into());
        let response = client
            .post(token_uri)
            .header(
                http::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .map_err(exchange)?;
        let token: Token = check_status(response)
            .await
            .map_err(AuthError::Exchange)?
            .json()
            .await
            .map_err(exchange)?;
        tracing::info!(
            refresh_token = token.refresh_token.is_some(),
            "exchanged authorization code"
        );
        Ok(token)
    }

    pub async fn authorize_with_code<'a, S>(
        &'a self,
        code: S,
    ) -> Result<AuthorizedClient, AuthError>
    where
        S: Into<Cow<'a, str>>,
    {
        let token = self.acquire_token_with(code).await?;
        Ok(self.authorize_with_token(token))
    }

    #[inline]
    pub fn authorize_with_token(&self, token: Token) -> AuthorizedClient {
        AuthorizedClient::new(&self.secret, token)
    }
}

#[derive(Clone, Default)]
pub struct UnauthorizedClientBuilder {
    redirect_uri: Option<String>,
    scope: SpaceDelimitedScope,
    secret: Option<ClientSecretBundle>,
}

impl UnauthorizedClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirect_uri<'s, S>(self, uri: S) -> Self
    where
        S: Into<Cow<'s, str>>,
    {
        let uri = uri.into().into_owned();
        Self {
            redirect_uri: Some(uri),
            ..self
        }
    }

    /// Replaces the requested scope.
    pub fn scope(self, scope: SpaceDelimitedScope) -> Self {
        Self { scope, ..self }
    }

    pub fn add_scope<S: Scope>(self, scope: S) -> Self {
        let added = scope.space_delimited();
        let scope = self
            .scope
            .iter()
            .chain(added.iter())
            .map(String::from)
            .collect();
        Self { scope, ..self }
    }

    pub fn secret(self, secret: &ClientSecretBundle) -> Self {
        let secret = secret.clone();
        Self {
            secret: Some(secret),
            ..self
        }
    }

    pub fn build(self) -> Result<UnauthorizedClient, AuthError> {
        let Self {
            redirect_uri,
            scope,
            secret,
        } = self;
        let redirect_uri =
            redirect_uri.ok_or_else(|| AuthError::Flow("redirect_uri is required".to_string()))?;
        let secret = secret.ok_or_else(|| AuthError::Flow("secret is required".to_string()))?;
        if scope.is_empty() {
            return Err(AuthError::Flow("at least one scope is required".to_string()));
        }
        let config = ClientConfig {
            redirect_uri,
            scope,
        };
        Ok(UnauthorizedClient::new(secret, config))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Token {
    access_token: String,
    expires_in: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: SpaceDelimitedScope,
    token_type: Bearer,
}

impl Token {
    #[inline]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    #[inline]
    pub fn expires_in(&self) -> u32 {
        self.expires_in
    }

    #[inline]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    #[inline]
    pub fn scope(&self) -> &SpaceDelimitedScope {
        &self.scope
    }

    /// Refresh responses usually omit the refresh token; keep ours then.
    pub fn refresh_with(self, other: Token) -> Self {
        let Self { refresh_token, .. } = self;
        Self {
            refresh_token: other.refresh_token.or(refresh_token),
            ..other
        }
    }
}

#[derive(Debug, Clone)]
struct ClientKeys {
    client_id: String,
    client_secret: String,
    token_uri: String,
}

/// Client making bearer-authenticated calls to Google APIs.
///
/// A client built from a cached [`Credential`] holds no access token until
/// [`AuthorizedClient::ready`] mints one from the refresh token.
#[derive(Clone)]
pub struct AuthorizedClient {
    keys: ClientKeys,
    refresh_token: Option<String>,
    token: Option<Token>,
    base_url: String,
    inner: reqwest::Client,
}

impl fmt::Debug for AuthorizedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedClient")
            .field("client_id", &self.keys.client_id)
            .field("base_url", &self.base_url)
            .field("has_access_token", &self.token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

macro_rules! request_fn {
    (
        $(#[$m:meta])*
        $v:vis $n:ident
    ) => { ::paste::paste! {
        $(#[$m])*
        $v fn [< $n:snake:lower >] (&self, uri: &str) -> ::reqwest::RequestBuilder {
            self.request(::http::Method::[< $n:snake:upper >], uri)
        }
    } };
}

impl AuthorizedClient {
    pub const BASE_URL: &'static str = "https://meet.googleapis.com";

    pub fn new(secret: &ClientSecretBundle, token: Token) -> Self {
        let keys = ClientKeys {
            client_id: secret.client_id.clone(),
            client_secret: secret.client_secret.clone(),
            token_uri: secret.token_uri.clone(),
        };
        Self {
            keys,
            refresh_token: token.refresh_token.clone(),
            token: Some(token),
            base_url: Self::BASE_URL.to_string(),
            inner: reqwest::Client::new(),
        }
    }

    pub fn from_credential(credential: Credential) -> Self {
        let Credential {
            client_id,
            client_secret,
            refresh_token,
            ..
        } = credential;
        let keys = ClientKeys {
            client_id,
            client_secret,
            token_uri: DEFAULT_TOKEN_URI.to_string(),
        };
        Self {
            keys,
            refresh_token: Some(refresh_token),
            token: None,
            base_url: Self::BASE_URL.to_string(),
            inner: reqwest::Client::new(),
        }
    }

    pub fn with_base_url<'s, S>(self, base_url: S) -> Self
    where
        S: Into<Cow<'s, str>>,
    {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, ..self }
    }

    pub fn with_token_uri<'s, S>(mut self, token_uri: S) -> Self
    where
        S: Into<Cow<'s, str>>,
    {
        self.keys.token_uri = token_uri.into().into_owned();
        self
    }

    #[inline]
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    #[inline]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    #[inline]
    pub fn client_id(&self) -> &str {
        &self.keys.client_id
    }

    /// Requests built before [`AuthorizedClient::ready`] carry no
    /// `Authorization` header.
    pub fn request(&self, method: http::Method, uri: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{uri}", self.base_url);
        let req = self.inner.request(method, url);
        self.decorate_request(req)
    }

    request_fn! {pub get}
    request_fn! {pub post}

    #[inline]
    pub(crate) fn decorate_request(
        &self,
        request: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(&token.access_token),
            None => request,
        }
    }

    pub async fn ready(self) -> Result<Self, UpstreamError> {
        if self.token.is_some() {
            return Ok(self);
        }
        self.refresh().await
    }

    #[tracing::instrument(skip_all)]
    pub async fn refresh(self) -> Result<Self, UpstreamError> {
        let Self {
            keys,
            refresh_token,
            token,
            base_url,
            inner,
        } = self;
        let Some(refresh_token) = refresh_token else {
            return Err(UpstreamError::NoRefreshToken);
        };
        let ClientKeys {
            client_id,
            client_secret,
            token_uri,
        } = &keys;
        let grant_type = RefreshToken::new().to_string();
        let body = urlencoded![client_id, client_secret, refresh_token, grant_type];
        let response = inner
            .post(token_uri)
            .header(
                http::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .inspect_err(|err| {
                let err = err as &(dyn std::error::Error + 'static);
                tracing::error!(err, "could not send request");
            })
            .map_err(|e| UpstreamError::Refresh(Box::new(e.into())))?;
        let response = check_status(response)
            .await
            .map_err(|e| UpstreamError::Refresh(Box::new(e)))?;
        let response: Token = response
            .json()
            .await
            .inspect_err(|err| {
                let err = err as &(dyn std::error::Error + 'static);
                tracing::error!(err, "could not parse response body as JSON");
            })
            .map_err(|e| UpstreamError::Refresh(Box::new(e.into())))?;
        let token = match token {
            Some(token) => token.refresh_with(response),
            None => Token {
                refresh_token: Some(refresh_token.clone()),
                ..response
            },
        };
        tracing::debug!(expires_in = token.expires_in, "minted access token");
        Ok(Self {
            keys,
            refresh_token: token.refresh_token.clone().or(Some(refresh_token)),
            token: Some(token),
            base_url,
            inner,
        })
    }
}

pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(%status, body, "Google returned an error");
    Err(UpstreamError::Status { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{MeetingsSpaceCreated, MeetingsSpaceReadonly};

    fn secret() -> ClientSecretBundle {
        serde_json::from_str(r#"{"client_id":"id 1","client_secret":"s"}"#).unwrap()
    }

    fn token(refresh_token: Option<&str>) -> Token {
        Token {
            access_token: "at".to_string(),
            expires_in: 3599,
            refresh_token: refresh_token.map(String::from),
            scope: MeetingsSpaceCreated.space_delimited(),
            token_type: Bearer::new(),
        }
    }

    #[test]
    fn test_generate_url() {
        let client = UnauthorizedClient::builder()
            .add_scope(MeetingsSpaceCreated)
            .add_scope(MeetingsSpaceReadonly)
            .redirect_uri("http://localhost:8085/oauth2callback")
            .secret(&secret())
            .build()
            .unwrap();
        let url = client.generate_url("xyz");
        let url = url::Url::parse(&url).unwrap();
        assert_eq!(url.host_str(), Some("accounts.google.com"));
        let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(query["client_id"], "id 1");
        assert_eq!(query["redirect_uri"], "http://localhost:8085/oauth2callback");
        assert_eq!(
            query["scope"],
            format!("{} {}", MeetingsSpaceCreated::STR, MeetingsSpaceReadonly::STR)
        );
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["access_type"], "offline");
        assert_eq!(query["state"], "xyz");
    }

    #[test]
    fn test_build_requires_redirect_uri() {
        let result = UnauthorizedClient::builder()
            .add_scope(MeetingsSpaceCreated)
            .secret(&secret())
            .build();
        assert!(matches!(result, Err(AuthError::Flow(_))));
    }

    #[test]
    fn test_build_requires_scope_and_secret() {
        let builder = UnauthorizedClient::builder().redirect_uri("http://localhost/");
        let no_scope = builder.clone().secret(&secret()).build();
        assert!(matches!(no_scope, Err(AuthError::Flow(_))));
        let no_secret = builder.add_scope(MeetingsSpaceCreated).build();
        assert!(matches!(no_secret, Err(AuthError::Flow(_))));
    }

    #[test]
    fn test_add_scope_dedups() {
        let client = UnauthorizedClient::builder()
            .add_scope(MeetingsSpaceCreated)
            .add_scope(MeetingsSpaceCreated)
            .redirect_uri("http://localhost/")
            .secret(&secret())
            .build()
            .unwrap();
        assert_eq!(client.config().scope, MeetingsSpaceCreated.space_delimited());
    }

    #[test]
    fn test_token_de() {
        let payload = format!(
            r#"{{"access_token":"at","expires_in":3599,"refresh_token":"rt","scope":"{}","token_type":"Bearer","id_token":"ignored"}}"#,
            MeetingsSpaceCreated::STR
        );
        let token: Token = serde_json::from_str(&payload).unwrap();
        assert_eq!(token, self::token(Some("rt")));
    }

    #[test]
    fn test_refresh_with_keeps_refresh_token() {
        let refreshed = token(Some("rt")).refresh_with(token(None));
        assert_eq!(refreshed.refresh_token(), Some("rt"));
    }

    #[test]
    fn test_client_from_token() {
        let client = UnauthorizedClient::builder()
            .add_scope(MeetingsSpaceCreated)
            .redirect_uri("http://localhost/")
            .secret(&secret())
            .build()
            .unwrap()
            .authorize_with_token(token(Some("rt")));
        assert_eq!(client.refresh_token(), Some("rt"));
        assert_eq!(client.client_id(), "id 1");
        assert_eq!(client.token().map(Token::access_token), Some("at"));
    }

    #[test]
    fn test_client_from_credential_has_no_token() {
        let credential = Credential::new(&secret(), "rt");
        let client = AuthorizedClient::from_credential(credential);
        assert!(client.token().is_none());
        assert_eq!(client.refresh_token(), Some("rt"));
        let request = client.post("/v2/spaces").build().unwrap();
        assert_eq!(request.url().as_str(), "https://meet.googleapis.com/v2/spaces");
        assert!(request.headers().get(http::header::AUTHORIZATION).is_none());
    }
}
