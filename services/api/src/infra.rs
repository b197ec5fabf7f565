use agazh::config::AppConfig;
use agazh::marketplace::{
    HiringNotice, HiringNotifier, InMemoryMarketplaceRepository, MarketplaceService, NotifyError,
    TokenIssuer,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type AppService = MarketplaceService<InMemoryMarketplaceRepository, LoggingNotifier>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Writes each new hiring request to the log, addressed to the operations desk.
#[derive(Debug, Clone, Default)]
pub(crate) struct LoggingNotifier {
    recipient: Option<String>,
}

impl LoggingNotifier {
    pub(crate) fn new(recipient: Option<String>) -> Self {
        Self { recipient }
    }
}

impl HiringNotifier for LoggingNotifier {
    fn hiring_created(&self, notice: HiringNotice) -> Result<(), NotifyError> {
        let recipient = self.recipient.as_deref().unwrap_or("operations desk");
        info!(
            to = recipient,
            subject = notice.subject(),
            hiring_id = %notice.hiring.id,
            body = %notice.body(),
            "hiring notification"
        );
        Ok(())
    }
}

pub(crate) fn build_service(config: &AppConfig) -> Arc<AppService> {
    Arc::new(MarketplaceService::new(
        Arc::new(InMemoryMarketplaceRepository::default()),
        Arc::new(LoggingNotifier::new(
            config.notifications.admin_email.clone(),
        )),
        TokenIssuer::new(&config.auth),
    ))
}
