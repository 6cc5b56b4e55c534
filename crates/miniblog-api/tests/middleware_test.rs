//! Authentication and authorization middleware behaviour.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::header::AUTHORIZATION;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::routing::get;
use tower::ServiceExt;

use miniblog_api::error::ApiErrorResponse;
use miniblog_api::extractors::AuthUser;
use miniblog_api::handlers::user::{OWNER_ACTIONS, owner_objects};
use miniblog_api::router::protect;
use miniblog_auth::{
    Authorizer, ManualClock, MemoryPolicyAdapter, PolicyEngine, PolicyModel, SigningConfig,
    TokenService,
};
use miniblog_core::types::PolicyRule;

const KEY: &str = "middleware-test-signing-key";

struct Harness {
    app: Router,
    tokens: Arc<TokenService>,
    clock: Arc<ManualClock>,
    policy: Arc<PolicyEngine>,
    hits: Arc<AtomicUsize>,
}

async fn harness(rules: Vec<PolicyRule>) -> Harness {
    let clock = Arc::new(ManualClock::starting_now());
    let tokens = Arc::new(
        TokenService::new(SigningConfig::new(KEY, "username").unwrap())
            .with_clock(clock.clone()),
    );
    let adapter = Arc::new(MemoryPolicyAdapter::with_rules(rules));
    let policy = Arc::new(PolicyEngine::load(PolicyModel::acl(), adapter).await.unwrap());
    let hits = Arc::new(AtomicUsize::new(0));

    let handler = {
        let hits = Arc::clone(&hits);
        move |auth: AuthUser| {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                auth.username().to_string()
            }
        }
    };

    let routes = Router::new()
        .route("/v1/users/{name}", get(handler.clone()))
        .route("/v1/users/{name}/change-password", axum::routing::put(handler));
    let app = protect(
        routes,
        Arc::clone(&tokens),
        Arc::clone(&policy) as Arc<dyn Authorizer>,
    );

    Harness {
        app,
        tokens,
        clock,
        policy,
        hits,
    }
}

fn request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn error_code(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: ApiErrorResponse = serde_json::from_slice(&bytes).unwrap();
    body.error
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn alice_rules() -> Vec<PolicyRule> {
    owner_objects("alice")
        .into_iter()
        .map(|object| PolicyRule::new("alice", object, OWNER_ACTIONS))
        .collect()
}

#[tokio::test]
async fn test_owner_reaches_handler_with_identity() {
    let h = harness(alice_rules()).await;
    let token = h.tokens.issue("alice").unwrap();

    let response = h
        .app
        .clone()
        .oneshot(request(Method::GET, "/v1/users/alice", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "alice");
    assert_eq!(h.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_owner_may_change_own_password() {
    let h = harness(alice_rules()).await;
    let token = h.tokens.issue("alice").unwrap();

    let response = h
        .app
        .clone()
        .oneshot(request(
            Method::PUT,
            "/v1/users/alice/change-password",
            Some(&token),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_header_short_circuits() {
    let h = harness(alice_rules()).await;

    let response = h
        .app
        .clone()
        .oneshot(request(Method::GET, "/v1/users/alice", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "AuthFailure.MissingCredential");
    assert_eq!(h.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_non_bearer_scheme_is_missing_credential() {
    let h = harness(alice_rules()).await;
    let req = Request::builder()
        .uri("/v1/users/alice")
        .header(AUTHORIZATION, "Basic YWxpY2U6c2VjcmV0")
        .body(Body::empty())
        .unwrap();

    let response = h.app.clone().oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "AuthFailure.MissingCredential");
}

#[tokio::test]
async fn test_other_users_resource_is_forbidden() {
    let h = harness(alice_rules()).await;
    let token = h.tokens.issue("bob").unwrap();

    let response = h
        .app
        .clone()
        .oneshot(request(Method::GET, "/v1/users/alice", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(response).await, "AuthFailure.Unauthorized");
    assert_eq!(h.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let h = harness(alice_rules()).await;
    let token = h.tokens.issue("alice").unwrap();
    h.clock.advance(Duration::from_secs(31 * 60));

    let response = h
        .app
        .clone()
        .oneshot(request(Method::GET, "/v1/users/alice", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "AuthFailure.TokenExpired");
}

#[tokio::test]
async fn test_token_signed_with_other_key_rejected() {
    let h = harness(alice_rules()).await;
    let forged = TokenService::new(SigningConfig::new("not-the-key", "username").unwrap())
        .issue("alice")
        .unwrap();

    let response = h
        .app
        .clone()
        .oneshot(request(Method::GET, "/v1/users/alice", Some(&forged)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "AuthFailure.TokenInvalid");
}

#[tokio::test]
async fn test_rule_added_at_runtime_takes_effect() {
    let h = harness(alice_rules()).await;
    let token = h.tokens.issue("bob").unwrap();

    let denied = h
        .app
        .clone()
        .oneshot(request(Method::GET, "/v1/users/bob", Some(&token)))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    assert!(h
        .policy
        .add_rule("bob", "/v1/users/bob", OWNER_ACTIONS)
        .await
        .unwrap());

    let allowed = h
        .app
        .clone()
        .oneshot(request(Method::GET, "/v1/users/bob", Some(&token)))
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_exact_rule_alone_does_not_cover_subpaths() {
    let h = harness(vec![PolicyRule::new("alice", "/v1/users/alice", OWNER_ACTIONS)]).await;
    let token = h.tokens.issue("alice").unwrap();

    let response = h
        .app
        .clone()
        .oneshot(request(
            Method::PUT,
            "/v1/users/alice/change-password",
            Some(&token),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(h.hits.load(Ordering::SeqCst), 0);
}
