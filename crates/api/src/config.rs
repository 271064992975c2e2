use std::env;
use std::path::PathBuf;
use std::time::Duration;

use envizion_payments::DEFAULT_STRIPE_API_BASE;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_APP_URL: &str = "https://envizion-479663f5.base44.app/";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: String,
    pub static_dir: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
    pub app_url: String,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
    /// Key the rate limiter on `x-forwarded-for` instead of the peer address.
    /// Only safe behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
    pub stripe: StripeConfig,
}

#[derive(Clone, Default)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub publishable_key: Option<String>,
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("publishable_key", &self.publishable_key)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: format!("0.0.0.0:{DEFAULT_PORT}"),
            static_dir: PathBuf::from("static"),
            catalog_path: None,
            allowed_origins: Vec::new(),
            app_url: DEFAULT_APP_URL.to_string(),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 60,
            trust_forwarded_for: false,
            stripe: StripeConfig {
                api_base: DEFAULT_STRIPE_API_BASE.to_string(),
                ..StripeConfig::default()
            },
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind = non_empty_var("ENVIZION_BIND").unwrap_or_else(|| {
            let port = env::var("PORT")
                .ok()
                .and_then(|value| value.trim().parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT);
            format!("0.0.0.0:{port}")
        });
        let static_dir = non_empty_var("ENVIZION_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.static_dir);
        let catalog_path = non_empty_var("ENVIZION_CATALOG_PATH").map(PathBuf::from);
        let allowed_origins = env::var("ENVIZION_ALLOWED_ORIGINS")
            .ok()
            .map(|value| parse_origin_list(&value))
            .unwrap_or_default();
        let app_url = non_empty_var("ENVIZION_APP_URL").unwrap_or(defaults.app_url);
        let rate_limit_window = env::var("ENVIZION_API_RATE_LIMIT_WINDOW_SECONDS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.rate_limit_window);
        let rate_limit_max = env::var("ENVIZION_API_RATE_LIMIT_MAX")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(defaults.rate_limit_max);
        let trust_forwarded_for = non_empty_var("ENVIZION_TRUST_FORWARDED_FOR")
            .map(|value| parse_flag(&value))
            .unwrap_or(defaults.trust_forwarded_for);

        let stripe = StripeConfig {
            secret_key: non_empty_var("STRIPE_SECRET_KEY"),
            publishable_key: non_empty_var("STRIPE_PUBLISHABLE_KEY"),
            api_base: non_empty_var("STRIPE_API_BASE")
                .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.to_string()),
        };

        Self {
            bind,
            static_dir,
            catalog_path,
            allowed_origins,
            app_url,
            rate_limit_window,
            rate_limit_max,
            trust_forwarded_for,
            stripe,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_origin_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}
