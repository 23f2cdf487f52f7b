use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Principal resolution
    pub principal_resolutions: IntCounterVec,
    pub principal_resolution_failures: IntCounterVec,
    pub tokeninfo_duration: Histogram,

    // Tokens / handshakes
    pub token_fetches: IntCounter,
    pub token_fetch_failures: IntCounter,
    pub handshake_starts: IntCounter,

    // Config
    pub parse_failures: IntCounter,
    pub config_validation_errors: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("gcpsaslplain".into()), None).unwrap_or_default();

        let metrics: Arc<Metrics> = Arc::new(Self {
            principal_resolutions: IntCounterVec::new(Opts::new("principal_resolutions_total", "Principal email resolutions by branch"), &["branch"]).expect("valid metric"),
            principal_resolution_failures: IntCounterVec::new(Opts::new("principal_resolution_failures_total", "Principal email resolution failures by reason"), &["reason"]).expect("valid metric"),
            tokeninfo_duration: Histogram::with_opts(HistogramOpts::new("tokeninfo_request_duration_seconds", "Token info lookup duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])).expect("valid metric"),

            token_fetches: IntCounter::new("token_fetch_total", "Access token fetches for handshakes").expect("valid metric"),
            token_fetch_failures: IntCounter::new("token_fetch_failures_total", "Failed access token fetches for handshakes").expect("valid metric"),
            handshake_starts: IntCounter::new("handshake_starts_total", "PLAIN handshakes started").expect("valid metric"),

            parse_failures: IntCounter::new("config_parse_failures_total", "Config files that failed to parse").expect("valid metric"),
            config_validation_errors: IntCounter::new("config_validation_errors_total", "Config files rejected by validation").expect("valid metric"),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(metrics.principal_resolutions.clone()),
            Box::new(metrics.principal_resolution_failures.clone()),
            Box::new(metrics.tokeninfo_duration.clone()),
            Box::new(metrics.token_fetches.clone()),
            Box::new(metrics.token_fetch_failures.clone()),
            Box::new(metrics.handshake_starts.clone()),
            Box::new(metrics.parse_failures.clone()),
            Box::new(metrics.config_validation_errors.clone()),
        ];
        for collector in collectors {
            if let Err(e) = reg.register(collector) {
                warn!("failed to register metric: {}", e);
            }
        }

        metrics
    }

    /// Prometheus text exposition of the registry.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            warn!("failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
