use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::{InsufficientScopeError, UpstreamError};
use crate::scope::{MeetingsSpaceCreated, MeetingsSpaceSettings};

use super::{check_status, AuthorizedClient};

#[derive(Clone, Copy)]
pub struct MeetClient<'a> {
    inner: &'a AuthorizedClient,
}

impl AuthorizedClient {
    #[inline]
    pub fn meet(&self) -> MeetClient<'_> {
        MeetClient { inner: self }
    }
}

impl<'a> MeetClient<'a> {
    pub const BASE_PATH: &'static str = "/v2";

    pub(crate) fn request(&self, method: http::Method, uri: &str) -> reqwest::RequestBuilder {
        let uri = format!("{}{}", Self::BASE_PATH, uri);
        self.inner.request(method, &uri)
    }

    #[inline]
    pub fn spaces(&self) -> SpacesClient<'a> {
        SpacesClient { inner: *self }
    }
}

#[derive(Clone, Copy)]
pub struct SpacesClient<'a> {
    inner: MeetClient<'a>,
}

impl<'a> SpacesClient<'a> {
    pub const BASE_PATH: &'static str = "/spaces";

    pub(crate) fn request(&self, method: http::Method, uri: &str) -> reqwest::RequestBuilder {
        let uri = format!("{}{}", Self::BASE_PATH, uri);
        self.inner.request(method, &uri)
    }

    /// Fails when the held token is known not to grant a scope that allows
    /// creating spaces. A client that has not minted a token yet is let
    /// through and left to the API to judge.
    pub fn create(&self) -> Result<create::Request<'a>, InsufficientScopeError> {
        if let Some(token) = self.inner.inner.token() {
            let scope = token.scope();
            if !scope.is_empty()
                && !scope.grants(&MeetingsSpaceCreated)
                && !scope.grants(&MeetingsSpaceSettings)
            {
                return Err(InsufficientScopeError::new());
            }
        }
        Ok(create::Request::new(*self))
    }
}

pub mod create {
    use super::*;

    /// https://developers.google.com/workspace/meet/api/reference/rest/v2/spaces/create
    #[derive(Clone)]
    pub struct Request<'a> {
        client: SpacesClient<'a>,
        body: Space,
    }

    impl<'a> Request<'a> {
        pub(super) fn new(client: SpacesClient<'a>) -> Self {
            Self {
                client,
                body: Space::default(),
            }
        }

        pub fn access_type(self, value: AccessType) -> Self {
            let Self { client, mut body } = self;
            body.config.get_or_insert_with(Default::default).access_type = Some(value);
            Self { client, body }
        }

        pub fn entry_point_access(self, value: EntryPointAccess) -> Self {
            let Self { client, mut body } = self;
            body.config.get_or_insert_with(Default::default).entry_point_access = Some(value);
            Self { client, body }
        }

        #[tracing::instrument(skip_all)]
        pub async fn send(self) -> Result<Space, UpstreamError> {
            let Self { client, body } = self;
            let response = client.request(http::Method::POST, "").json(&body).send().await?;
            let space: Space = check_status(response).await?.json().await?;
            tracing::info!(name = %space.name, "created meeting space");
            Ok(space)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_uri: Option<url::Url>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub meeting_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SpaceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_conference: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_type: Option<AccessType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point_access: Option<EntryPointAccess>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessType {
    AccessTypeUnspecified,
    Open,
    Trusted,
    Restricted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryPointAccess {
    EntryPointAccessUnspecified,
    All,
    CreatorAppOnly,
}

/// Creates meeting spaces on behalf of an authorized user.
pub trait CreateSpace: Send + Sync + 'static {
    fn create_space(&self, client: AuthorizedClient) -> BoxFuture<'_, Result<Space, UpstreamError>>;
}

/// [`CreateSpace`] backed by the Meet REST API.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoogleMeet;

impl CreateSpace for GoogleMeet {
    fn create_space(
        &self,
        client: AuthorizedClient,
    ) -> BoxFuture<'_, Result<Space, UpstreamError>> {
        Box::pin(async move {
            let client = client.ready().await?;
            let space = client.meet().spaces().create()?.send().await?;
            Ok(space)
        })
    }
}
