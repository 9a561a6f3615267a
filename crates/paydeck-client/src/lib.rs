//! Paydeck platform client SDK
//!
//! The `Paydeck` container wires the whole client stack: one request
//! pipeline shared by every endpoint facade, durable credential and
//! cooldown storage, the session manager that owns login flows, and the
//! push channel whose lifetime follows the session. Construct it from a
//! `Config` and keep it for the lifetime of the application.
//!
//! Authentication state drives everything: facades work unauthenticated
//! where the platform allows it, the push channel exists only while a
//! session is active, and subscriptions registered at any time are
//! serviced whenever a channel is open.

pub mod catalog;
pub mod config;
pub mod customers;
pub mod loyalty;
pub mod payments;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use paydeck_auth::{CooldownLedger, SessionManager, TokenStore};
use paydeck_events::{ChannelConfig, SubscriptionRegistry, spawn_driver};
use paydeck_transport::Transport;
use tokio::task::JoinHandle;
use tracing::info;

pub use config::Config;
pub use paydeck_auth::{AuthenticatedUser, Error, SessionEvent, SessionState};
pub use paydeck_events::{Notification, NotificationKind, TransactionStatus};
pub use paydeck_transport::RequestError;

use crate::catalog::CatalogApi;
use crate::customers::CustomersApi;
use crate::loyalty::LoyaltyApi;
use crate::payments::PaymentsApi;

const AUTH_PATH: &str = "/client/auth";
const CREDENTIAL_FILE: &str = "credential.json";
const COOLDOWN_FILE: &str = "cooldowns.json";

/// The assembled SDK.
pub struct Paydeck {
    pub session: Arc<SessionManager>,
    pub customers: CustomersApi,
    pub payments: PaymentsApi,
    pub catalog: CatalogApi,
    pub loyalty: LoyaltyApi,
    events: Arc<SubscriptionRegistry>,
    driver: JoinHandle<()>,
}

impl Paydeck {
    /// Build the SDK from configuration: load the durable stores, share one
    /// transport across the facades, and start the push-channel driver.
    pub async fn new(config: Config) -> paydeck_auth::Result<Self> {
        tokio::fs::create_dir_all(&config.storage.dir)
            .await
            .map_err(|e| paydeck_auth::Error::Io(format!("creating storage dir: {e}")))?;

        let tokens = Arc::new(TokenStore::load(config.storage.dir.join(CREDENTIAL_FILE)).await?);
        let cooldowns = CooldownLedger::load(config.storage.dir.join(COOLDOWN_FILE)).await?;

        let transport = Arc::new(Transport::new(
            config.api.base_url.clone(),
            Duration::from_secs(config.api.timeout_secs),
            tokens.clone(),
        ));

        let session = Arc::new(SessionManager::new(
            transport.clone(),
            tokens,
            cooldowns,
            AUTH_PATH,
        ));

        let events = Arc::new(SubscriptionRegistry::new());
        let driver = spawn_driver(
            ChannelConfig {
                url: config.events.url.clone(),
                max_reconnect_attempts: config.events.max_reconnect_attempts,
                reconnect_delay: config.events.reconnect_delay(),
                connect_timeout: config.events.connect_timeout(),
            },
            session.subscribe(),
            events.clone(),
        );

        info!(base_url = %config.api.base_url, "paydeck client assembled");

        Ok(Self {
            customers: CustomersApi::new(transport.clone()),
            payments: PaymentsApi::new(transport.clone()),
            catalog: CatalogApi::new(transport.clone()),
            loyalty: LoyaltyApi::new(transport),
            session,
            events,
            driver,
        })
    }

    /// Register a handler for a push-notification kind. Valid in any
    /// session state; the handler fires whenever a channel is open and a
    /// matching notification arrives.
    pub fn subscribe<F>(&self, kind: NotificationKind, handler: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.events.subscribe(kind, handler);
    }

    /// Stop the push-channel driver. The facades and session remain usable;
    /// no further notifications are delivered.
    pub fn shutdown(&self) {
        self.driver.abort();
    }
}

impl Drop for Paydeck {
    fn drop(&mut self) {
        self.driver.abort();
    }
}
