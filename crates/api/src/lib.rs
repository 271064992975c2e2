pub mod config;
mod pages;
mod rate_limit;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Json, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use envizion_core::{ChatError, ChatReply, IntentCategory, Responder, SiteCatalog};
use envizion_observability::{install_metrics_recorder, AppMetrics, PrometheusHandle};
use envizion_payments::{
    PaymentError, PaymentGateway, PaymentIntentRequest, StripeGateway, UnconfiguredGateway,
    DEFAULT_DONATION_AMOUNT,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use crate::config::{ApiConfig, StripeConfig};
use crate::pages::{
    ChatbotPage, DonationPage, GalleryPage, HomePage, PresentationPage, CHATBOT_TITLE,
    DONATION_TITLE, GALLERY_TITLE, HOME_TITLE, PRESENTATION_TITLE,
};
use crate::rate_limit::IpRateLimiter;

pub const SERVICE_NAME: &str = "ENVIZION Web Interface";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CHAT_APOLOGY: &str = "Sorry, I encountered an error. Please try again.";
pub const CONTACT_THANKS: &str = "Thank you for your message! We will get back to you soon.";

const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;
const FAVICON_PATH: &str = "assets/logo/logo.jpg";

#[derive(Clone)]
pub struct ApiState {
    pub responder: Responder,
    pub catalog: Arc<SiteCatalog>,
    pub metrics: Arc<AppMetrics>,
    pub payments: Arc<dyn PaymentGateway>,
    pub limiter: IpRateLimiter,
    pub config: Arc<ApiConfig>,
    pub prometheus: Option<PrometheusHandle>,
}

impl ApiState {
    pub fn new(
        config: ApiConfig,
        catalog: Arc<SiteCatalog>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            responder: Responder::new(catalog.clone()),
            catalog,
            metrics: AppMetrics::shared(),
            payments,
            limiter: IpRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
            config: Arc::new(config),
            prometheus: install_metrics_recorder(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
    metrics: envizion_observability::MetricsSnapshot,
    capabilities: HealthCapabilities,
}

#[derive(Debug, Serialize)]
struct HealthCapabilities {
    payments: bool,
    custom_catalog: bool,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatSuccess {
    success: bool,
    #[serde(flatten)]
    reply: ChatReply,
}

#[derive(Debug, Deserialize)]
struct DonationRequest {
    #[serde(default = "default_donation_amount")]
    amount: i64,
}

fn default_donation_amount() -> i64 {
    DEFAULT_DONATION_AMOUNT
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DonationResponse {
    success: bool,
    client_secret: String,
}

pub async fn build_app(config: ApiConfig) -> Result<Router> {
    let catalog = match config.catalog_path.as_ref() {
        Some(path) => SiteCatalog::from_json_file(path)
            .with_context(|| format!("failed loading site catalog from {}", path.display()))?,
        None => SiteCatalog::builtin(),
    };

    let payments: Arc<dyn PaymentGateway> = match config.stripe.secret_key.as_ref() {
        Some(secret_key) => {
            let http = Client::builder()
                .connect_timeout(Duration::from_secs(6))
                .timeout(Duration::from_secs(20))
                .build()
                .context("failed to build HTTP client")?;
            Arc::new(StripeGateway::new(
                http,
                secret_key.clone(),
                config.stripe.api_base.clone(),
            ))
        }
        None => {
            warn!("STRIPE_SECRET_KEY is not set; donations are disabled");
            Arc::new(UnconfiguredGateway)
        }
    };

    info!(
        records = catalog.records.len(),
        team_members = catalog.team_members.len(),
        gallery_images = catalog.gallery_images.len(),
        custom_catalog = config.catalog_path.is_some(),
        "site catalog loaded"
    );

    let state = ApiState::new(config, Arc::new(catalog), payments);
    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(home))
        .route("/chatbot", get(chatbot))
        .route("/gallery", get(gallery))
        .route("/donation", get(donation))
        .route("/presentation", get(presentation))
        .route("/app-redirect", get(app_redirect))
        .route("/favicon.ico", get(favicon))
        .route("/health", get(health))
        .route("/metrics", get(metrics_export))
        .route("/api/chat", post(chat_api))
        .route("/api/donate", post(create_donation))
        .route("/api/contact", post(contact_submit))
        .route("/api/stats", get(stats_api))
        .nest_service("/static", static_files)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(build_cors_layer(&state.config.allowed_origins))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .with_state(state)
}

async fn home(State(state): State<ApiState>) -> Response {
    pages::render(&HomePage {
        title: HOME_TITLE,
        ngos: &state.catalog.records,
        team_members: &state.catalog.team_members,
    })
}

async fn chatbot() -> Response {
    pages::render(&ChatbotPage {
        title: CHATBOT_TITLE,
    })
}

async fn gallery(State(state): State<ApiState>) -> Response {
    pages::render(&GalleryPage {
        title: GALLERY_TITLE,
        gallery_images: &state.catalog.gallery_images,
    })
}

async fn donation(State(state): State<ApiState>) -> Response {
    pages::render(&DonationPage {
        title: DONATION_TITLE,
        stripe_key: state
            .config
            .stripe
            .publishable_key
            .as_deref()
            .unwrap_or_default(),
    })
}

async fn presentation(State(state): State<ApiState>) -> Response {
    pages::render(&PresentationPage {
        title: PRESENTATION_TITLE,
        app_url: &state.config.app_url,
    })
}

async fn app_redirect(State(state): State<ApiState>) -> Response {
    match HeaderValue::from_str(&state.config.app_url) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(error) => {
            warn!(%error, app_url = %state.config.app_url, "app url is not a valid location");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn favicon(State(state): State<ApiState>) -> Response {
    let path = state.config.static_dir.join(FAVICON_PATH);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("image/vnd.microsoft.icon"),
            )],
            bytes,
        )
            .into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: SERVICE_VERSION,
        timestamp: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
        capabilities: HealthCapabilities {
            payments: state.payments.is_configured(),
            custom_catalog: state.config.catalog_path.is_some(),
        },
    };
    (StatusCode::OK, Json(payload))
}

async fn metrics_export(State(state): State<ApiState>) -> Response {
    match state.prometheus.as_ref() {
        Some(handle) => (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn chat_api(
    State(state): State<ApiState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "chat request could not be read");
            return Json(serde_json::json!({
                "success": false,
                "error": rejection.body_text(),
                "response": CHAT_APOLOGY
            }))
            .into_response();
        }
    };

    match state.responder.respond(&request.message) {
        Ok(reply) => {
            state.metrics.inc_chat(reply.intent.as_str());
            if reply.intent == IntentCategory::General {
                state.metrics.inc_general_fallback();
            }
            state.metrics.add_records_returned(reply.records.len());
            state.metrics.observe_chat_latency(started.elapsed());
            info!(
                intent = %reply.intent,
                records = reply.records.len(),
                "chat reply composed"
            );

            Json(ChatSuccess {
                success: true,
                reply,
            })
            .into_response()
        }
        Err(error @ ChatError::EmptyMessage) => {
            state.metrics.inc_chat_rejected();
            Json(serde_json::json!({
                "success": false,
                "error": error.to_string()
            }))
            .into_response()
        }
    }
}

async fn create_donation(
    State(state): State<ApiState>,
    payload: Result<Json<DonationRequest>, JsonRejection>,
) -> Response {
    let amount = match payload {
        Ok(Json(request)) => request.amount,
        Err(rejection) => {
            state.metrics.inc_donation_failed();
            return donation_error(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let result = match PaymentIntentRequest::donation(amount) {
        Ok(request) => state.payments.create_payment_intent(&request).await,
        Err(error) => Err(error),
    };

    match result {
        Ok(intent) => {
            state.metrics.inc_donation_created();
            info!(amount, payment_intent = %intent.id, "donation payment intent created");
            (
                StatusCode::OK,
                Json(DonationResponse {
                    success: true,
                    client_secret: intent.client_secret,
                }),
            )
                .into_response()
        }
        Err(error) => {
            state.metrics.inc_donation_failed();
            warn!(amount, %error, "donation payment intent failed");
            donation_error(payment_error_status(&error), error.to_string())
        }
    }
}

fn payment_error_status(error: &PaymentError) -> StatusCode {
    match error {
        PaymentError::InvalidAmount(_) | PaymentError::Rejected { .. } => StatusCode::BAD_REQUEST,
        PaymentError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        PaymentError::Network(_) | PaymentError::MalformedResponse => StatusCode::BAD_GATEWAY,
    }
}

fn donation_error(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "error": message
        })),
    )
        .into_response()
}

async fn contact_submit(
    State(state): State<ApiState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(submission)) => {
            state.metrics.inc_contact_submission();
            info!(%submission, "contact form submission");
            Json(serde_json::json!({
                "success": true,
                "message": CONTACT_THANKS
            }))
            .into_response()
        }
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "contact submission could not be read");
            Json(serde_json::json!({
                "success": false,
                "error": rejection.body_text()
            }))
            .into_response()
        }
    }
}

async fn stats_api(State(state): State<ApiState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "stats": state.catalog.stats
    }))
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !is_rate_limited_endpoint(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let ip = client_key(&request, state.config.trust_forwarded_for);
    if let Err(retry_after) = state.limiter.check(&ip) {
        warn!(%ip, path = %request.uri().path(), "rate limit exceeded");
        let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "success": false,
                "error": "Too many requests. Please wait and try again."
            })),
        )
            .into_response();
        if let Ok(value) = HeaderValue::from_str(&seconds.max(1).to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }

    next.run(request).await
}

fn is_rate_limited_endpoint(method: &Method, path: &str) -> bool {
    method == Method::POST && path.starts_with("/api/")
}

/// Peer address of the connection, or the first `x-forwarded-for` hop when
/// the deployment says that header can be trusted.
fn client_key(request: &Request<Body>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(forwarded) = forwarded {
            return forwarded.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "local".to_string())
}

async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    response.headers_mut().insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response.headers_mut().insert(
        header::HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    response.headers_mut().insert(
        header::HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    // Stripe.js needs its script, frame and API origins.
    response.headers_mut().insert(
        header::HeaderName::from_static("content-security-policy"),
        HeaderValue::from_static(
            "default-src 'self'; script-src 'self' https://js.stripe.com https://*.js.stripe.com; \
             frame-src https://js.stripe.com https://*.js.stripe.com https://hooks.stripe.com; \
             connect-src 'self' https://api.stripe.com; \
             img-src 'self' data:; frame-ancestors 'none'; base-uri 'none'",
        ),
    );

    response
}
