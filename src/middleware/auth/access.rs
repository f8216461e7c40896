//! access token 検証 → AccessToken を extensions に入れる
//!
//! token の取り出し順 (最初に見つかったものを使う。混ぜない)：
//! 1. `Authorization: Bearer <token>` (scheme は大文字小文字を区別しない)
//! 2. body の `access_token` (form-urlencoded / JSON)
//! 3. query の `access_token`
//!
//! 判定そのものは `TokenGate` 側で行う。ここは HTTP からの抽出と response への変換だけ。

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{FromRequest, State, rejection::BytesRejection},
    http::{HeaderMap, Request, StatusCode, header},
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::GateError;
use crate::services::auth::gate::token_fingerprint;
use crate::state::AppState;

const BEARER_SCHEME: &str = "bearer";
const TOKEN_FIELD: &str = "access_token";

/// 保護したい Router に token gate を掛ける。
///
/// 例：
/// ```ignore
/// let protected = middleware::auth::access::apply(protected, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let (candidate, mut req) = extract_candidate(req).await?;

    let token = match state.gate.authorize(candidate.as_deref()).await {
        Ok(token) => token,
        Err(err) => {
            let fingerprint = candidate.as_deref().map(token_fingerprint);
            match &err {
                GateError::Store(store_err) => tracing::error!(
                    error = %store_err,
                    token = ?fingerprint,
                    backend = state.gate.store().backend_name(),
                    "access token lookup failed"
                ),
                _ => tracing::warn!(
                    reason = %err,
                    token = ?fingerprint,
                    "access token rejected"
                ),
            }
            return Err(err.into());
        }
    };

    tracing::debug!(
        client_id = %token.client_id,
        sub = %token.subject_id,
        "access token accepted"
    );

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(token);

    Ok(next.run(req).await)
}

/// Pull the candidate token out of the request.
///
/// The body is only buffered when the header carries no bearer token and the
/// content type is one we can read; the request is rebuilt with the same bytes.
/// Buffering honours the router's `DefaultBodyLimit`.
async fn extract_candidate(
    req: Request<Body>,
) -> Result<(Option<String>, Request<Body>), AppError> {
    if let Some(token) = bearer_token(req.headers()).map(str::to_string) {
        return Ok((Some(token), req));
    }

    let req = match body_kind(req.headers()) {
        Some(kind) => {
            let (parts, body) = req.into_parts();
            let bytes = Bytes::from_request(Request::from_parts(parts.clone(), body), &())
                .await
                .map_err(body_error)?;

            if let Some(token) = body_token(kind, &bytes) {
                return Ok((Some(token), Request::from_parts(parts, Body::from(bytes))));
            }
            Request::from_parts(parts, Body::from(bytes))
        }
        None => req,
    };

    let token = req.uri().query().and_then(form_field);
    Ok((token, req))
}

fn body_error(rejection: BytesRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::bad_request("INVALID_BODY", rejection.body_text())
    }
}

/// Token after the `Bearer` scheme, verbatim.
///
/// Once the scheme matches the header is authoritative: an empty token is
/// returned as `Some("")` so the request fails instead of falling through.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let scheme = value.get(..BEARER_SCHEME.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }

    match &value[BEARER_SCHEME.len()..] {
        "" => Some(""),
        rest => rest.strip_prefix(' '),
    }
}

#[derive(Debug, Clone, Copy)]
enum BodyKind {
    Form,
    Json,
}

fn body_kind(headers: &HeaderMap) -> Option<BodyKind> {
    let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();

    match essence.as_str() {
        "application/x-www-form-urlencoded" => Some(BodyKind::Form),
        "application/json" => Some(BodyKind::Json),
        _ => None,
    }
}

fn body_token(kind: BodyKind, bytes: &Bytes) -> Option<String> {
    match kind {
        BodyKind::Form => std::str::from_utf8(bytes).ok().and_then(form_field),
        BodyKind::Json => serde_json::from_slice::<serde_json::Value>(bytes)
            .ok()?
            .get(TOKEN_FIELD)?
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    }
}

fn form_field(encoded: &str) -> Option<String> {
    url::form_urlencoded::parse(encoded.as_bytes())
        .find(|(key, _)| key == TOKEN_FIELD)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        Extension,
        extract::DefaultBodyLimit,
        http::Method,
        routing::{get, post},
    };
    use tokio::sync::mpsc::Receiver;
    use tower::ServiceExt;

    use super::*;
    use crate::repos::{AccessToken, MemoryTokenRepo, StoreResult, TokenStore};
    use crate::services::auth::cleanup::{CleanupQueue, ExpiredToken};
    use crate::services::auth::{
        PasswordAuthenticator, RedirectPolicy, TokenGate, UserDirectory,
    };
    use crate::services::cache::CacheError;

    fn token(access_token: &str, expires_at: i64) -> AccessToken {
        AccessToken {
            access_token: access_token.into(),
            expires_at,
            client_id: "idora".into(),
            scope: vec!["authenticate_user".into()],
            username: access_token.into(),
            subject_id: format!("sub-{access_token}"),
        }
    }

    fn far_future() -> i64 {
        chrono::Utc::now().timestamp_millis() + 3_600_000
    }

    async fn app_with(
        store: Arc<dyn TokenStore>,
        tokens: &[AccessToken],
    ) -> (Router, Receiver<ExpiredToken>) {
        for t in tokens {
            store.insert(t).await.unwrap();
        }
        let (queue, rx) = CleanupQueue::channel();
        let state = AppState::new(
            Arc::new(TokenGate::new(store, queue)),
            Arc::new(PasswordAuthenticator::new(UserDirectory::default())),
            Arc::new(RedirectPolicy::default()),
        );

        async fn whoami(Extension(token): Extension<AccessToken>) -> String {
            token.username
        }

        async fn echo(Extension(token): Extension<AccessToken>, body: String) -> String {
            format!("{}|{}", token.username, body)
        }

        let protected = Router::new()
            .route("/protected", get(whoami))
            .route("/echo", post(echo));
        let router = apply(protected, state.clone()).with_state(state);
        (router, rx)
    }

    async fn body_text(res: Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get_req(uri: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    struct BrokenStore;

    #[async_trait]
    impl TokenStore for BrokenStore {
        fn backend_name(&self) -> &'static str {
            "broken"
        }

        async fn find_one(&self, _: &str) -> StoreResult<Option<AccessToken>> {
            Err(CacheError::BackendCommand("READONLY".into()).into())
        }

        async fn remove(&self, _: &str, _: &str) -> StoreResult<u64> {
            Ok(0)
        }

        async fn insert(&self, _: &AccessToken) -> StoreResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn bearer_header_passes_and_attaches_token() {
        let (app, _rx) =
            app_with(Arc::new(MemoryTokenRepo::new()), &[token("alice", far_future())]).await;

        let res = app
            .oneshot(get_req("/protected", Some("Bearer alice")))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_text(res).await, "alice");
    }

    #[tokio::test]
    async fn bearer_scheme_is_case_insensitive() {
        let (app, _rx) =
            app_with(Arc::new(MemoryTokenRepo::new()), &[token("alice", far_future())]).await;

        let res = app
            .oneshot(get_req("/protected", Some("bEaReR alice")))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn query_parameter_is_used_last() {
        let (app, _rx) =
            app_with(Arc::new(MemoryTokenRepo::new()), &[token("alice", far_future())]).await;

        let res = app
            .oneshot(get_req("/protected?access_token=alice", None))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_text(res).await, "alice");
    }

    #[tokio::test]
    async fn header_wins_over_body_and_body_is_preserved() {
        let live = far_future();
        let (app, _rx) = app_with(
            Arc::new(MemoryTokenRepo::new()),
            &[token("alice", live), token("bob", live)],
        )
        .await;

        let req = Request::builder()
            .method(Method::POST)
            .uri("/echo")
            .header(header::AUTHORIZATION, "Bearer alice")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("access_token=bob"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_text(res).await, "alice|access_token=bob");
    }

    #[tokio::test]
    async fn form_body_wins_over_query() {
        let live = far_future();
        let (app, _rx) = app_with(
            Arc::new(MemoryTokenRepo::new()),
            &[token("alice", live), token("bob", live)],
        )
        .await;

        let req = Request::builder()
            .method(Method::POST)
            .uri("/echo?access_token=alice")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded; charset=utf-8")
            .body(Body::from("access_token=bob&x=1"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_text(res).await, "bob|access_token=bob&x=1");
    }

    #[tokio::test]
    async fn json_body_is_read() {
        let (app, _rx) =
            app_with(Arc::new(MemoryTokenRepo::new()), &[token("bob", far_future())]).await;

        let req = Request::builder()
            .method(Method::POST)
            .uri("/echo")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"access_token":"bob"}"#))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_text(res).await, r#"bob|{"access_token":"bob"}"#);
    }

    #[tokio::test]
    async fn missing_and_unknown_tokens_are_401_without_cleanup() {
        let (app, mut rx) =
            app_with(Arc::new(MemoryTokenRepo::new()), &[token("alice", far_future())]).await;

        let res = app
            .clone()
            .oneshot(get_req("/protected", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app
            .oneshot(get_req("/protected", Some("Bearer mallory")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn non_bearer_authorization_falls_through_to_query() {
        let (app, _rx) =
            app_with(Arc::new(MemoryTokenRepo::new()), &[token("alice", far_future())]).await;

        let res = app
            .oneshot(get_req(
                "/protected?access_token=alice",
                Some("Basic YWxpY2U6cHc="),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_bearer_does_not_fall_through_to_query() {
        let (app, _rx) =
            app_with(Arc::new(MemoryTokenRepo::new()), &[token("alice", far_future())]).await;

        for authorization in ["Bearer ", "Bearer", "bearer "] {
            let res = app
                .clone()
                .oneshot(get_req("/protected?access_token=alice", Some(authorization)))
                .await
                .unwrap();

            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{authorization:?}");
        }
    }

    #[tokio::test]
    async fn bearer_lookalike_scheme_is_not_bearer() {
        let (app, _rx) =
            app_with(Arc::new(MemoryTokenRepo::new()), &[token("alice", far_future())]).await;

        let res = app
            .oneshot(get_req("/protected?access_token=alice", Some("Bearerx bob")))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn oversized_body_without_content_length_is_413() {
        let (app, _rx) =
            app_with(Arc::new(MemoryTokenRepo::new()), &[token("bob", far_future())]).await;
        let app = app.layer(DefaultBodyLimit::max(8));

        let req = Request::builder()
            .method(Method::POST)
            .uri("/echo")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("access_token=bob&padding=0123456789"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body_text(res).await.contains("PAYLOAD_TOO_LARGE"));
    }

    #[tokio::test]
    async fn expired_token_is_401_and_queued_for_removal() {
        let (app, mut rx) =
            app_with(Arc::new(MemoryTokenRepo::new()), &[token("stale", 1_000)]).await;

        let res = app
            .oneshot(get_req("/protected", Some("Bearer stale")))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            rx.try_recv().unwrap(),
            ExpiredToken {
                access_token: "stale".into(),
                client_id: "idora".into(),
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn store_failure_is_500() {
        let (app, _rx) = app_with(Arc::new(BrokenStore), &[]).await;

        let res = app
            .oneshot(get_req("/protected", Some("Bearer alice")))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
