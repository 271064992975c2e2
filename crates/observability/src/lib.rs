use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

pub use metrics_exporter_prometheus::PrometheusHandle;

static TRACING_INIT: OnceCell<()> = OnceCell::new();
static PROMETHEUS: OnceCell<Option<PrometheusHandle>> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    chat_requests_total: AtomicU64,
    chat_rejected_total: AtomicU64,
    general_fallback_total: AtomicU64,
    records_returned_total: AtomicU64,
    donations_created_total: AtomicU64,
    donations_failed_total: AtomicU64,
    contact_submissions_total: AtomicU64,
    total_latency_micros: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub chat_requests_total: u64,
    pub chat_rejected_total: u64,
    pub general_fallback_total: u64,
    pub records_returned_total: u64,
    pub donations_created_total: u64,
    pub donations_failed_total: u64,
    pub contact_submissions_total: u64,
    pub avg_chat_latency_micros: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_chat(&self, intent: &'static str) {
        self.chat_requests_total.fetch_add(1, Ordering::Relaxed);
        counter!("envizion_chat_requests_total", "intent" => intent).increment(1);
    }

    pub fn inc_chat_rejected(&self) {
        self.chat_rejected_total.fetch_add(1, Ordering::Relaxed);
        counter!("envizion_chat_rejected_total").increment(1);
    }

    pub fn inc_general_fallback(&self) {
        self.general_fallback_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_records_returned(&self, records: usize) {
        self.records_returned_total
            .fetch_add(records as u64, Ordering::Relaxed);
        counter!("envizion_records_returned_total").increment(records as u64);
    }

    pub fn inc_donation_created(&self) {
        self.donations_created_total.fetch_add(1, Ordering::Relaxed);
        counter!("envizion_donations_total", "outcome" => "created").increment(1);
    }

    pub fn inc_donation_failed(&self) {
        self.donations_failed_total.fetch_add(1, Ordering::Relaxed);
        counter!("envizion_donations_total", "outcome" => "failed").increment(1);
    }

    pub fn inc_contact_submission(&self) {
        self.contact_submissions_total
            .fetch_add(1, Ordering::Relaxed);
        counter!("envizion_contact_submissions_total").increment(1);
    }

    pub fn observe_chat_latency(&self, duration: Duration) {
        self.total_latency_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.chat_requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_micros.load(Ordering::Relaxed);

        MetricsSnapshot {
            chat_requests_total: requests,
            chat_rejected_total: self.chat_rejected_total.load(Ordering::Relaxed),
            general_fallback_total: self.general_fallback_total.load(Ordering::Relaxed),
            records_returned_total: self.records_returned_total.load(Ordering::Relaxed),
            donations_created_total: self.donations_created_total.load(Ordering::Relaxed),
            donations_failed_total: self.donations_failed_total.load(Ordering::Relaxed),
            contact_submissions_total: self.contact_submissions_total.load(Ordering::Relaxed),
            avg_chat_latency_micros: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

/// Installs the process-wide Prometheus recorder behind the `counter!`
/// mirrors. Later calls return the same handle; `None` when some other
/// recorder was installed first.
pub fn install_metrics_recorder() -> Option<PrometheusHandle> {
    PROMETHEUS
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(error) => {
                tracing::warn!(%error, "prometheus recorder not installed");
                None
            }
        })
        .clone()
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,envizion_api=info,tower_http=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
