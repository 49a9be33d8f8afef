//! Router-level tests for the HTTP API.
//!
//! Requests go through the full middleware stack via `tower::ServiceExt`.
//! Only paths that finish before touching `PostgreSQL` are covered.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use tanam_api::kv::KeyValueStore;
use tanam_api::services::catalog::{ProductCacheKey, ProductPage, ProductQuery};
use tanam_api::services::auth::MAX_CODE_GUESSES;
use tanam_api::services::throttle::{LoginThrottle, MAX_LOGIN_ATTEMPTS};
use tanam_integration_tests::{TEST_API_KEY, TestApp, product};

fn post_json(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-api-key", TEST_API_KEY)
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.router().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

fn json_request(uri: &str, body: &Value) -> Request<Body> {
    post_json(uri)
        .body(Body::from(body.to_string()))
        .unwrap()
}

// =============================================================================
// Health and API key
// =============================================================================

#[tokio::test]
async fn test_health_needs_no_key() {
    let app = TestApp::new(vec![]);
    let request = Request::get("/health").body(Body::empty()).unwrap();

    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_missing_api_key_is_forbidden() {
    let app = TestApp::new(vec![]);
    let request = Request::post("/api/tanam/getproduct")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["data"], "Invalid API Key");
}

#[tokio::test]
async fn test_wrong_api_key_is_forbidden() {
    let app = TestApp::new(vec![]);
    let request = Request::post("/api/tanam/login")
        .header("x-api-key", "not-the-key")
        .body(Body::empty())
        .unwrap();

    let (status, _, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

// =============================================================================
// Login throttle
// =============================================================================

fn login_request(email: &str) -> Request<Body> {
    Request::post("/api/tanam/login")
        .header("x-api-key", TEST_API_KEY)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "user_email={}&user_password=wrong-password",
            email.replace('@', "%40").replace(' ', "+")
        )))
        .unwrap()
}

#[tokio::test]
async fn test_login_locked_out_after_limit() {
    let app = TestApp::new(vec![]);
    let throttle = LoginThrottle::new(app.store.clone());
    for _ in 1..MAX_LOGIN_ATTEMPTS {
        throttle.record_attempt("siti@tanam.test").await.unwrap();
    }

    let (status, _, body) = send(&app, login_request("siti@tanam.test")).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["data"], "Maximum login attempts exceeded");

    let record = throttle.attempts("siti@tanam.test").await.unwrap().unwrap();
    assert_eq!(record.count, MAX_LOGIN_ATTEMPTS);
}

#[tokio::test]
async fn test_login_email_is_trimmed_before_throttling() {
    let app = TestApp::new(vec![]);
    let throttle = LoginThrottle::new(app.store.clone());
    for _ in 1..MAX_LOGIN_ATTEMPTS {
        throttle.record_attempt("siti@tanam.test").await.unwrap();
    }

    let (status, _, _) = send(&app, login_request("  siti@tanam.test ")).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    let record = throttle.attempts("siti@tanam.test").await.unwrap().unwrap();
    assert_eq!(record.count, MAX_LOGIN_ATTEMPTS);
    assert!(throttle.attempts("  siti@tanam.test ").await.unwrap().is_none());
}

#[tokio::test]
async fn test_login_with_empty_fields_is_bad_request() {
    let app = TestApp::new(vec![]);
    let request = Request::post("/api/tanam/login")
        .header("x-api-key", TEST_API_KEY)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("user_email=&user_password="))
        .unwrap();

    let (status, _, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.store.is_empty().await);
}

// =============================================================================
// Product listing
// =============================================================================

#[tokio::test]
async fn test_getproduct_serves_cache_aside() {
    let app = TestApp::new(vec![
        product(1, "Cangkul", "Tools", 7, "85000"),
        product(2, "Benih Padi", "Seeds", 8, "30000"),
    ]);
    let body = json!({ "current_page": 1, "product_category": "Tools" });

    let (status, _, first) = send(&app, json_request("/api/tanam/getproduct", &body)).await;
    let (_, _, second) = send(&app, json_request("/api/tanam/getproduct", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(first["status"], "success");
    assert_eq!(first["totalPage"], 1);
    assert_eq!(first["data"][0]["product_name"], "Cangkul");
    assert_eq!(first["data"][0]["product_price"], "85000");
    assert_eq!(app.catalog.count_calls(), 1);
}

#[tokio::test]
async fn test_getproduct_returns_preloaded_page() {
    let app = TestApp::new(vec![]);
    let query = ProductQuery {
        current_page: Some(3),
        ..ProductQuery::default()
    };
    let planted = ProductPage {
        products: vec![product(40, "Traktor", "Tools", 2, "9000000")],
        total_pages: 5,
    };
    app.store
        .set(
            ProductCacheKey::new(&query).as_str(),
            &serde_json::to_string(&planted).unwrap(),
            std::time::Duration::from_secs(60),
        )
        .await
        .unwrap();

    let (status, _, body) = send(
        &app,
        json_request("/api/tanam/getproduct", &json!({ "current_page": 3 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalPage"], 5);
    assert_eq!(body["data"][0]["product_id"], 40);
    assert_eq!(app.catalog.count_calls(), 0);
}

#[tokio::test]
async fn test_getproduct_rejects_malformed_body() {
    let app = TestApp::new(vec![]);
    let request = post_json("/api/tanam/getproduct")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"], "Failed to parse request body");
}

// =============================================================================
// Authenticated routes
// =============================================================================

#[tokio::test]
async fn test_insertproduct_requires_access_cookie() {
    let app = TestApp::new(vec![]);
    let request = Request::post("/api/tanam/insertproduct")
        .header("x-api-key", TEST_API_KEY)
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "failed");
}

#[tokio::test]
async fn test_cart_requires_access_cookie() {
    let app = TestApp::new(vec![]);

    let (status, _, _) = send(&app, json_request("/api/tanam/cart", &json!({}))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = TestApp::new(vec![]);
    let refresh = app.state.tokens().issue_refresh("siti@tanam.test").unwrap();
    let request = post_json("/api/tanam/cart")
        .header(header::COOKIE, format!("access_token={}", refresh.token))
        .body(Body::from("{}"))
        .unwrap();

    let (status, _, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cart_validates_before_lookup() {
    let app = TestApp::new(vec![]);
    let access = app.state.tokens().issue_access("siti@tanam.test").unwrap();
    let body = json!({
        "product_id": "3",
        "cart_quantity": "2",
        "cart_price": "free",
        "buyer_id": "4",
        "seller_id": "7",
    });
    let request = post_json("/api/tanam/cart")
        .header(header::COOKIE, format!("access_token={}", access.token))
        .body(Body::from(body.to_string()))
        .unwrap();

    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"], "Invalid product price");
}

#[tokio::test]
async fn test_refresh_sets_new_access_cookie() {
    let app = TestApp::new(vec![]);
    let refresh = app.state.tokens().issue_refresh("siti@tanam.test").unwrap();
    let request = Request::post("/api/tanam/refresh")
        .header("x-api-key", TEST_API_KEY)
        .header(header::COOKIE, format!("refresh_token={}", refresh.token))
        .body(Body::empty())
        .unwrap();

    let (status, headers, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "Token refreshed");
    let cookie = headers
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("access_token="));

    let token = cookie
        .trim_start_matches("access_token=")
        .split(';')
        .next()
        .unwrap();
    let claims = app
        .state
        .tokens()
        .verify(token, tanam_api::services::tokens::TokenKind::Access)
        .unwrap();
    assert_eq!(claims.email, "siti@tanam.test");
}

#[tokio::test]
async fn test_refresh_without_cookie_is_unauthorized() {
    let app = TestApp::new(vec![]);
    let request = Request::post("/api/tanam/refresh")
        .header("x-api-key", TEST_API_KEY)
        .body(Body::empty())
        .unwrap();

    let (status, _, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Verification and password reset
// =============================================================================

#[tokio::test]
async fn test_verify_with_wrong_code_is_rejected() {
    let app = TestApp::new(vec![]);
    app.state.codes().issue("siti@tanam.test").await.unwrap();

    let (status, _, body) = send(
        &app,
        json_request(
            "/api/tanam/verify",
            &json!({ "user_email": "siti@tanam.test", "otp": "000000x" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"], "Invalid or expired verification code");
}

#[tokio::test]
async fn test_verify_guesses_are_throttled() {
    let app = TestApp::new(vec![]);
    let code = app.state.codes().issue("siti@tanam.test").await.unwrap();
    let guess = |otp: &str| {
        json_request(
            "/api/tanam/verify",
            &json!({ "user_email": "siti@tanam.test", "otp": otp }),
        )
    };

    for _ in 1..MAX_CODE_GUESSES {
        let (status, _, _) = send(&app, guess("000000x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _, body) = send(&app, guess("000000x")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["data"], "Too many verification attempts");

    // Refused before the code is compared, so even the right code is rejected.
    let (status, _, _) = send(&app, guess(&code)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_forgot_password_without_webhook_is_unavailable() {
    let app = TestApp::new(vec![]);

    let (status, _, _) = send(
        &app,
        json_request(
            "/api/tanam/forgotpassword",
            &json!({ "user_email": "siti@tanam.test" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// Images
// =============================================================================

#[tokio::test]
async fn test_uploaded_images_are_public() {
    let app = TestApp::new(vec![]);
    let dir = &app.state.config().upload_dir;
    std::fs::write(dir.join("Cangkul123.png"), b"\x89PNG").unwrap();

    let request = Request::get("/api/tanam/loadimage/uploads/Cangkul123.png")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
