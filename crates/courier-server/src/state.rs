use crate::gateway::{MockGateway, PayPalGateway, PaymentGateway};
use crate::hub::SubscriptionHub;
use crate::mirror::{AirtableMirror, NoopMirror, OrderMirror};
use crate::scheduler::{ProgressContext, ProgressScheduler};
use crate::storage::{AttachmentStore, LocalAttachmentStore, SupabaseAttachmentStore};
use courier_core::config::{Config, GatewayBackend, MirrorBackend, StorageBackend};
use courier_core::store::{
    MemoryOrderStore, MemoryPaymentStore, MemoryRiderPool, OrderStore, PaymentStore, RiderPool,
};
use std::sync::Arc;

/// Pluggable outbound services. `from_config` picks them from the config;
/// tests hand in their own.
pub struct Backends {
    pub gateway: Arc<dyn PaymentGateway>,
    pub attachments: Arc<dyn AttachmentStore>,
    pub mirror: Arc<dyn OrderMirror>,
}

impl Backends {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;

        let gateway: Arc<dyn PaymentGateway> = match config.payments.gateway {
            GatewayBackend::Mock => Arc::new(MockGateway::default()),
            GatewayBackend::Paypal => {
                Arc::new(PayPalGateway::new(client.clone(), &config.payments.paypal)?)
            }
        };
        let attachments: Arc<dyn AttachmentStore> = match config.storage.backend {
            StorageBackend::Local => Arc::new(LocalAttachmentStore::new(
                &config.storage.local_dir,
                &config.storage.public_base,
            )),
            StorageBackend::Supabase => Arc::new(SupabaseAttachmentStore::new(
                client.clone(),
                &config.storage.supabase,
            )?),
        };
        let mirror: Arc<dyn OrderMirror> = match config.mirror.backend {
            MirrorBackend::None => Arc::new(NoopMirror),
            MirrorBackend::Airtable => {
                Arc::new(AirtableMirror::new(client, &config.mirror.airtable)?)
            }
        };
        Ok(Self {
            gateway,
            attachments,
            mirror,
        })
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orders: Arc<dyn OrderStore>,
    pub riders: Arc<dyn RiderPool>,
    pub payments: Arc<dyn PaymentStore>,
    pub hub: SubscriptionHub,
    pub progress: ProgressScheduler,
    pub gateway: Arc<dyn PaymentGateway>,
    pub attachments: Arc<dyn AttachmentStore>,
    pub mirror: Arc<dyn OrderMirror>,
}

impl AppState {
    /// In-memory stores seeded from `config.riders`, plus a running progress
    /// scheduler. Must be called inside a Tokio runtime.
    pub fn new(config: Config, backends: Backends) -> Self {
        let orders: Arc<dyn OrderStore> = Arc::new(MemoryOrderStore::new());
        let riders: Arc<dyn RiderPool> = Arc::new(MemoryRiderPool::new(config.riders.clone()));
        let payments: Arc<dyn PaymentStore> = Arc::new(MemoryPaymentStore::new());
        let hub = SubscriptionHub::new();

        let ctx = ProgressContext {
            orders: Arc::clone(&orders),
            riders: Arc::clone(&riders),
            hub: hub.clone(),
            mirror: Arc::clone(&backends.mirror),
        };
        let (progress, _task) = ProgressScheduler::spawn(ctx, config.progress.timings());

        Self {
            config: Arc::new(config),
            orders,
            riders,
            payments,
            hub,
            progress,
            gateway: backends.gateway,
            attachments: backends.attachments,
            mirror: backends.mirror,
        }
    }

    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let backends = Backends::from_config(&config)?;
        tracing::info!(
            gateway = backends.gateway.name(),
            storage = backends.attachments.name(),
            mirror = backends.mirror.name(),
            "backends ready"
        );
        Ok(Self::new(config, backends))
    }

    /// Gateway redirect target under this server's public URL.
    pub fn callback_url(&self, path: &str) -> String {
        format!(
            "{}{}",
            self.config.server.app_url.trim_end_matches('/'),
            path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn default_config_builds_mock_and_local_backends() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.local_dir = dir.path().join("uploads");
        let state = AppState::from_config(config).unwrap();
        assert_eq!(state.gateway.name(), "mock");
        assert_eq!(state.attachments.name(), "local");
        assert_eq!(state.mirror.name(), "none");
        assert_eq!(state.riders.list().len(), 3);
    }

    #[tokio::test]
    async fn paypal_without_credentials_fails() {
        let mut config = Config::default();
        config.payments.gateway = GatewayBackend::Paypal;
        assert!(AppState::from_config(config).is_err());
    }

    #[tokio::test]
    async fn callback_url_joins_app_url() {
        let mut config = Config::default();
        config.server.app_url = "https://courier.example/".into();
        let state = AppState::from_config(config).unwrap();
        assert_eq!(
            state.callback_url("/api/paypal/capture"),
            "https://courier.example/api/paypal/capture"
        );
    }
}
