use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use envizion_api::{build_app, build_router, ApiConfig, ApiState};
use envizion_core::SiteCatalog;
use envizion_payments::{PaymentError, PaymentGateway, PaymentIntent, PaymentIntentRequest};
use serde_json::{json, Value};
use tower::ServiceExt;

struct FakeGateway;

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        assert_eq!(request.currency, "inr");
        assert_eq!(request.description, "ENVIZION Donation");
        Ok(PaymentIntent {
            id: "pi_test".to_string(),
            client_secret: format!("pi_test_secret_{}", request.amount),
        })
    }
}

fn static_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../static")
}

fn test_config() -> ApiConfig {
    ApiConfig {
        static_dir: static_dir(),
        ..ApiConfig::default()
    }
}

fn app_with_gateway(config: ApiConfig) -> Router {
    let state = ApiState::new(
        config,
        Arc::new(SiteCatalog::builtin()),
        Arc::new(FakeGateway),
    );
    build_router(state)
}

async fn app() -> Router {
    build_app(test_config()).await.expect("app should build")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json_from(uri: &str, body: Value, peer: &str) -> Request<Body> {
    let mut request = post_json(uri, body);
    let addr: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

fn limited_config(max: usize) -> ApiConfig {
    ApiConfig {
        rate_limit_window: Duration::from_secs(60),
        rate_limit_max: max,
        ..test_config()
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn text_body(response: axum::response::Response) -> String {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

fn record_ids(payload: &Value) -> Vec<u64> {
    payload["ngos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|ngo| ngo["id"].as_u64().unwrap())
        .collect()
}

#[tokio::test]
async fn health_reports_service_identity() {
    let response = app().await.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload = json_body(response).await;
    assert_eq!(payload["status"], "healthy");
    assert_eq!(payload["service"], "ENVIZION Web Interface");
    assert_eq!(payload["version"], "1.0.0");
    assert!(payload["timestamp"].is_string());
    assert_eq!(payload["capabilities"]["payments"], false);
}

#[tokio::test]
async fn pages_render_with_titles() {
    let app = app().await;
    let cases = [
        ("/", "ENVIZION - AI for Social Equity"),
        ("/chatbot", "AI Assistant - ENVIZION"),
        ("/gallery", "Gallery - ENVIZION"),
        ("/donation", "Donate - ENVIZION"),
        ("/presentation", "Presentation - ENVIZION"),
    ];

    for (uri, title) in cases {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let html = text_body(response).await;
        assert!(html.contains(&format!("<title>{title}</title>")), "{uri}");
    }
}

#[tokio::test]
async fn home_page_shows_records_and_gallery_shows_captions() {
    let app = app().await;

    let html = text_body(app.clone().oneshot(get("/")).await.unwrap()).await;
    assert!(html.contains("Food For All NGO"));
    assert!(html.contains("Shruti"));

    let html = text_body(app.oneshot(get("/gallery")).await.unwrap()).await;
    assert!(html.contains("Sanitation Project"));
    assert!(html.contains("Clean water initiative"));
}

#[tokio::test]
async fn chat_classifies_and_returns_matching_records() {
    let response = app()
        .await
        .oneshot(post_json(
            "/api/chat",
            json!({ "message": "My child needs school books" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload = json_body(response).await;
    assert_eq!(payload["success"], true);
    assert_eq!(payload["intent"], "education");
    assert_eq!(
        payload["response"],
        "I found educational NGOs that can help with schooling and mid-day meals."
    );
    assert_eq!(record_ids(&payload), vec![1]);
    assert_eq!(payload["ngos"][0]["category"], "education");
    assert!(payload["ngos"][0]["address"].is_string());
    assert!(payload["timestamp"].is_string());
}

#[tokio::test]
async fn chat_general_returns_first_three_records() {
    let payload = json_body(
        app()
            .await
            .oneshot(post_json("/api/chat", json!({ "message": "Hello there" })))
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(payload["intent"], "general");
    assert_eq!(
        payload["response"],
        "I can help you connect with NGOs for various services."
    );
    assert_eq!(record_ids(&payload), vec![1, 2, 3]);
}

#[tokio::test]
async fn chat_precedence_and_empty_matches() {
    let app = app().await;

    let payload = json_body(
        app.clone()
            .oneshot(post_json(
                "/api/chat",
                json!({ "message": "I need a doctor for my sick child and also a school" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(payload["intent"], "education");

    let payload = json_body(
        app.oneshot(post_json(
            "/api/chat",
            json!({ "message": "we need a shelter for the night" }),
        ))
        .await
        .unwrap(),
    )
    .await;
    assert_eq!(payload["intent"], "housing");
    assert_eq!(payload["success"], true);
    assert!(record_ids(&payload).is_empty());
}

#[tokio::test]
async fn chat_rejects_blank_message() {
    let app = app().await;

    for body in [json!({ "message": "   " }), json!({ "message": "" }), json!({})] {
        let response = app
            .clone()
            .oneshot(post_json("/api/chat", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "success": false, "error": "Message is required" })
        );
    }
}

#[tokio::test]
async fn chat_unreadable_body_returns_apology() {
    let app = app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let payload = json_body(app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(payload["success"], false);
    assert!(payload["error"].is_string());
    assert_eq!(
        payload["response"],
        "Sorry, I encountered an error. Please try again."
    );

    let payload = json_body(
        app.oneshot(post_json("/api/chat", json!({ "message": 42 })))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(payload["success"], false);
    assert_eq!(
        payload["response"],
        "Sorry, I encountered an error. Please try again."
    );
}

#[tokio::test]
async fn stats_expose_site_figures() {
    let payload = json_body(app().await.oneshot(get("/api/stats")).await.unwrap()).await;

    assert_eq!(payload["success"], true);
    assert_eq!(
        payload["stats"]["education"]["labels"],
        json!(["Currently Attending", "Never Attended", "Dropped Out"])
    );
    assert_eq!(payload["stats"]["sanitation"]["colors"][1], "#9C27B0");
    assert_eq!(payload["stats"]["impact"]["families"], 12500);
    assert_eq!(payload["stats"]["impact"]["success_rate"], 98);
}

#[tokio::test]
async fn contact_submission_is_acknowledged() {
    let response = app()
        .await
        .oneshot(post_json(
            "/api/contact",
            json!({ "name": "Asha", "email": "asha@example.com", "message": "How can I volunteer?" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload = json_body(response).await;
    assert_eq!(payload["success"], true);
    assert_eq!(
        payload["message"],
        "Thank you for your message! We will get back to you soon."
    );
}

#[tokio::test]
async fn donation_without_processor_is_unavailable() {
    let response = app()
        .await
        .oneshot(post_json("/api/donate", json!({ "amount": 5000 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let payload = json_body(response).await;
    assert_eq!(payload["success"], false);
    assert_eq!(payload["error"], "Payment processing is not configured");
}

#[tokio::test]
async fn donation_returns_client_secret() {
    let app = app_with_gateway(test_config());

    let payload = json_body(
        app.clone()
            .oneshot(post_json("/api/donate", json!({ "amount": 5000 })))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(payload["success"], true);
    assert_eq!(payload["clientSecret"], "pi_test_secret_5000");

    let payload = json_body(
        app.oneshot(post_json("/api/donate", json!({})))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(payload["clientSecret"], "pi_test_secret_2000");
}

#[tokio::test]
async fn donation_rejects_non_positive_amount() {
    let response = app_with_gateway(test_config())
        .oneshot(post_json("/api/donate", json!({ "amount": 0 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["success"], false);
}

#[tokio::test]
async fn app_redirect_points_at_web_app() {
    let response = app().await.oneshot(get("/app-redirect")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://envizion-479663f5.base44.app/"
    );
}

#[tokio::test]
async fn static_assets_are_served() {
    let response = app()
        .await
        .oneshot(get("/static/css/site.css"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .starts_with("text/css"));
}

#[tokio::test]
async fn favicon_is_missing_without_logo() {
    let config = ApiConfig {
        static_dir: std::env::temp_dir().join("envizion-no-static-here"),
        ..ApiConfig::default()
    };
    let response = build_app(config)
        .await
        .unwrap()
        .oneshot(get("/favicon.ico"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_posts_are_rate_limited_per_client() {
    let config = ApiConfig {
        rate_limit_window: Duration::from_secs(60),
        rate_limit_max: 2,
        ..test_config()
    };
    let app = build_app(config).await.unwrap();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_json("/api/chat", json!({ "message": "rice" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(post_json("/api/chat", json!({ "message": "rice" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get(header::RETRY_AFTER).is_some());

    let response = app.oneshot(get("/api/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn responses_carry_security_and_request_id_headers() {
    let response = app().await.oneshot(get("/health")).await.unwrap();
    let headers = response.headers();

    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    let csp = headers
        .get("content-security-policy")
        .and_then(|value| value.to_str().ok())
        .unwrap();
    assert!(csp.contains("https://hooks.stripe.com"));
    assert!(csp.contains("https://*.js.stripe.com"));
    assert!(headers.get("x-request-id").is_some());
}

#[tokio::test]
async fn direct_clients_are_limited_separately() {
    let app = build_app(limited_config(2)).await.unwrap();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_json_from(
                "/api/chat",
                json!({ "message": "rice" }),
                "192.0.2.10:40000",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(post_json_from(
            "/api/chat",
            json!({ "message": "rice" }),
            "192.0.2.10:40001",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = app
        .oneshot(post_json_from(
            "/api/chat",
            json!({ "message": "school" }),
            "198.51.100.20:40000",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["intent"], "education");
}

#[tokio::test]
async fn forwarded_header_does_not_escape_the_limit_by_default() {
    let app = build_app(limited_config(2)).await.unwrap();

    let mut statuses = Vec::new();
    for hop in ["203.0.113.1", "203.0.113.2", "203.0.113.3"] {
        let mut request = post_json_from(
            "/api/chat",
            json!({ "message": "rice" }),
            "192.0.2.10:40000",
        );
        request
            .headers_mut()
            .insert("x-forwarded-for", hop.parse().unwrap());
        statuses.push(app.clone().oneshot(request).await.unwrap().status());
    }

    assert_eq!(
        statuses,
        vec![
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );
}

#[tokio::test]
async fn trusted_forwarded_header_keys_the_limit() {
    let config = ApiConfig {
        trust_forwarded_for: true,
        ..limited_config(1)
    };
    let app = build_app(config).await.unwrap();

    for hop in ["203.0.113.1", "203.0.113.2"] {
        let mut request = post_json_from(
            "/api/chat",
            json!({ "message": "rice" }),
            "10.0.0.1:8080",
        );
        request
            .headers_mut()
            .insert("x-forwarded-for", hop.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{hop}");
    }
}

#[tokio::test]
async fn rate_limited_response_carries_cors_headers() {
    let app = build_app(limited_config(1)).await.unwrap();

    let mut statuses = Vec::new();
    let mut last = None;
    for _ in 0..2 {
        let mut request = post_json("/api/chat", json!({ "message": "rice" }));
        request
            .headers_mut()
            .insert(header::ORIGIN, "https://partner.example".parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        statuses.push(response.status());
        last = Some(response);
    }

    assert_eq!(statuses[1], StatusCode::TOO_MANY_REQUESTS);
    let response = last.unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
    assert_eq!(
        json_body(response).await["error"],
        "Too many requests. Please wait and try again."
    );
}

#[tokio::test]
async fn metrics_endpoint_exports_counters() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(post_json("/api/chat", json!({ "message": "toilet" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = text_body(response).await;
    assert!(body.contains("envizion_chat_requests_total{intent=\"sanitation\"}"));
}
