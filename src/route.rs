use std::sync::Arc;

use axum::extract::State;
use axum::{routing, Json, Router};
use serde::{Deserialize, Serialize};

use crate::authorizer::Authorizer;
use crate::client::meet::CreateSpace;
use crate::error::{Error, UpstreamError};

#[derive(Clone)]
pub struct AppState {
    pub authorizer: Arc<Authorizer>,
    pub meet: Arc<dyn CreateSpace>,
}

impl AppState {
    pub fn new<M: CreateSpace>(authorizer: Authorizer, meet: M) -> Self {
        Self {
            authorizer: Arc::new(authorizer),
            meet: Arc::new(meet),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetResponse {
    pub meet_link: url::Url,
}

pub fn make_router(state: AppState) -> Router {
    Router::new()
        .route("/create-meet", routing::post(create_meet))
        .with_state(state)
}

#[tracing::instrument(skip_all)]
async fn create_meet(State(state): State<AppState>) -> Result<Json<CreateMeetResponse>, Error> {
    let client = state.authorizer.authorize().await?;
    let space = state.meet.create_space(client).await?;
    let meet_link = space
        .meeting_uri
        .ok_or(UpstreamError::MissingField("meetingUri"))?;
    tracing::info!(%meet_link, "created Meet link");
    Ok(Json(CreateMeetResponse { meet_link }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use futures::future::BoxFuture;
    use http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::client::meet::Space;
    use crate::client::AuthorizedClient;
    use crate::credential::CredentialStore;
    use crate::flow::fake::FakeFlow;

    const CACHED: &str =
        r#"{"type":"authorized_user","client_id":"A","client_secret":"B","refresh_token":"cached"}"#;

    struct FakeMeet(Option<&'static str>);

    impl CreateSpace for FakeMeet {
        fn create_space(
            &self,
            client: AuthorizedClient,
        ) -> BoxFuture<'_, Result<Space, UpstreamError>> {
            assert_eq!(client.refresh_token(), Some("cached"));
            let result = match self.0 {
                Some(uri) => Ok(Space {
                    name: "spaces/abc".to_string(),
                    meeting_uri: Some(uri.parse().unwrap()),
                    meeting_code: "abc-defg-hij".to_string(),
                    ..Default::default()
                }),
                None => Err(UpstreamError::Status {
                    status: StatusCode::FORBIDDEN,
                    body: "PERMISSION_DENIED".to_string(),
                }),
            };
            Box::pin(async move { result })
        }
    }

    fn router(dir: &std::path::Path, cached: bool, meet: FakeMeet, flow: &FakeFlow) -> Router {
        let token_path = dir.join("token.json");
        if cached {
            std::fs::write(&token_path, CACHED).unwrap();
        }
        let authorizer = Authorizer::new(
            CredentialStore::new(token_path),
            dir.join("credentials.json"),
            flow.clone(),
        );
        make_router(AppState::new(authorizer, meet))
    }

    async fn post_create_meet(router: Router) -> (StatusCode, String) {
        let request = Request::builder()
            .method(http::Method::POST)
            .uri("/create-meet")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_create_meet() {
        let dir = tempfile::tempdir().unwrap();
        let flow = FakeFlow::default();
        let meet = FakeMeet(Some("https://meet.google.com/abc-defg-hij"));
        let (status, body) = post_create_meet(router(dir.path(), true, meet, &flow)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"meetLink":"https://meet.google.com/abc-defg-hij"}"#);
        assert_eq!(flow.calls(), 0);
    }

    #[tokio::test]
    async fn test_create_meet_upstream_failure() {
        let dir = tempfile::tempdir().unwrap();
        let flow = FakeFlow::default();
        let router = router(dir.path(), true, FakeMeet(None), &flow);
        let (status, body) = post_create_meet(router).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"error":"Internal Server Error"}"#);
    }

    #[tokio::test]
    async fn test_create_meet_auth_failure() {
        let dir = tempfile::tempdir().unwrap();
        let flow = FakeFlow {
            declined: true,
            ..Default::default()
        };
        let meet = FakeMeet(Some("https://meet.google.com/abc-defg-hij"));
        let (status, body) = post_create_meet(router(dir.path(), false, meet, &flow)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"error":"Internal Server Error"}"#);
        assert_eq!(flow.calls(), 1);
    }

    #[tokio::test]
    async fn test_only_post_is_routed() {
        let dir = tempfile::tempdir().unwrap();
        let flow = FakeFlow::default();
        let router = router(dir.path(), true, FakeMeet(None), &flow);
        let request = Request::builder()
            .uri("/create-meet")
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let request = Request::builder()
            .method(http::Method::POST)
            .uri("/ping")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
