use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
pub const DEFAULT_DONATION_AMOUNT: i64 = 2000;
pub const DONATION_CURRENCY: &str = "inr";
pub const DONATION_DESCRIPTION: &str = "ENVIZION Donation";
pub const DONATION_PROJECT: &str = "ENVIZION Social Platform";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("donation amount must be a positive number of paise, got {0}")]
    InvalidAmount(i64),
    #[error("Payment processing is not configured")]
    NotConfigured,
    #[error("payment processor unreachable: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("payment processor returned an unexpected response")]
    MalformedResponse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentRequest {
    /// Minor currency units (paise for INR).
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub metadata: Vec<(String, String)>,
}

impl PaymentIntentRequest {
    pub fn donation(amount: i64) -> Result<Self, PaymentError> {
        if amount <= 0 {
            return Err(PaymentError::InvalidAmount(amount));
        }

        Ok(Self {
            amount,
            currency: DONATION_CURRENCY.to_string(),
            description: DONATION_DESCRIPTION.to_string(),
            metadata: vec![("project".to_string(), DONATION_PROJECT.to_string())],
        })
    }

    fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("amount".to_string(), self.amount.to_string()),
            ("currency".to_string(), self.currency.clone()),
            ("description".to_string(), self.description.clone()),
        ];
        fields.extend(
            self.metadata
                .iter()
                .map(|(key, value)| (format!("metadata[{key}]"), value.clone())),
        );
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn is_configured(&self) -> bool {
        true
    }

    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError>;
}

/// Stand-in used when no secret key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredGateway {
    fn is_configured(&self) -> bool {
        false
    }

    async fn create_payment_intent(
        &self,
        _request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        Err(PaymentError::NotConfigured)
    }
}

#[derive(Clone)]
pub struct StripeGateway {
    http: Client,
    secret_key: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntentResponse {
    id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(http: Client, secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http,
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl std::fmt::Debug for StripeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeGateway")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, request), fields(amount = request.amount, currency = %request.currency))]
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(self.secret_key.as_str())
            .form(&request.form_fields())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or_else(|| format!("payment processor returned status {}", status.as_u16()));
            warn!(status = status.as_u16(), %message, "payment intent rejected");
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: StripePaymentIntentResponse =
            serde_json::from_str(&body).map_err(|_| PaymentError::MalformedResponse)?;
        match (parsed.id, parsed.client_secret) {
            (Some(id), Some(client_secret)) if !client_secret.is_empty() => {
                info!(payment_intent = %id, "payment intent created");
                Ok(PaymentIntent { id, client_secret })
            }
            _ => Err(PaymentError::MalformedResponse),
        }
    }
}
