//! Session-scoped websocket driver
//!
//! One driver task consumes Session Manager lifecycle events. Each
//! `Authenticated` aborts any live connection before opening the next, so
//! at most one channel exists even across rapid re-authentication;
//! `LoggedOut` aborts immediately, which also cancels any reconnection
//! backoff in progress — nothing is delivered after the session ends.
//!
//! The channel authenticates like the request pipeline does, with the same
//! credential, but as a connection query parameter rather than a header.

use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use futures_util::{SinkExt, StreamExt};
use paydeck_auth::SessionEvent;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ChannelError, Result};
use crate::notification::Notification;
use crate::registry::SubscriptionRegistry;

/// Push-channel settings.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Websocket base, e.g. `wss://pay.example.com/events`. The customer
    /// scope segment is appended by the driver.
    pub url: String,
    /// Consecutive failed connection attempts tolerated before the channel
    /// stays closed until the next authentication.
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
}

/// Spawn the driver task that ties channel lifetime to session lifecycle.
pub fn spawn_driver(
    config: ChannelConfig,
    mut sessions: broadcast::Receiver<SessionEvent>,
    registry: Arc<SubscriptionRegistry>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut connection: Option<JoinHandle<()>> = None;
        loop {
            match sessions.recv().await {
                Ok(SessionEvent::Authenticated { token, .. }) => {
                    // Never two live channels: tear down before reopening.
                    if let Some(live) = connection.take() {
                        live.abort();
                    }
                    let config = config.clone();
                    let registry = Arc::clone(&registry);
                    connection = Some(tokio::spawn(run_channel(config, token, registry)));
                }
                Ok(SessionEvent::LoggedOut) => {
                    if let Some(live) = connection.take() {
                        live.abort();
                        debug!("push channel closed on logout");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "session event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    if let Some(live) = connection.take() {
                        live.abort();
                    }
                    break;
                }
            }
        }
    })
}

/// Connect, pump, and reconnect until aborted or attempts run out.
///
/// The attempt counter tracks consecutive failures to *establish* a
/// connection; any successfully opened channel resets it. Exhaustion leaves
/// the channel closed — the session itself stays usable over plain requests.
async fn run_channel(config: ChannelConfig, token: Secret<String>, registry: Arc<SubscriptionRegistry>) {
    let mut attempts = 0u32;
    loop {
        match open_and_pump(&config, &token, &registry).await {
            Ok(()) => {
                attempts = 0;
                debug!("push channel connection ended");
            }
            Err(e) => {
                attempts += 1;
                warn!(error = %e, attempt = attempts, "push channel connection failed");
                metrics::counter!("sdk_channel_failures_total").increment(1);
            }
        }

        if attempts > config.max_reconnect_attempts {
            warn!(
                attempts,
                "push channel reconnect attempts exhausted, staying closed until next login"
            );
            return;
        }

        let jitter = Duration::from_millis(rand::random_range(0..250));
        tokio::time::sleep(config.reconnect_delay + jitter).await;
        debug!("reconnecting push channel");
    }
}

/// One connection lifetime: open under a timeout, then dispatch frames
/// until the stream ends. A frame that fails to decode is logged and
/// skipped; the frames behind it are unaffected.
async fn open_and_pump(
    config: &ChannelConfig,
    token: &Secret<String>,
    registry: &SubscriptionRegistry,
) -> Result<()> {
    let url = channel_url(&config.url, token.expose())?;

    let (stream, _) = tokio::time::timeout(config.connect_timeout, connect_async(url.as_str()))
        .await
        .map_err(|_| ChannelError::Connect("connect timed out".into()))?
        .map_err(|e| ChannelError::Connect(e.to_string()))?;
    info!("push channel connected");

    let (mut write, mut read) = stream.split();
    while let Some(message) = read.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "push channel read error, connection dropped");
                break;
            }
        };
        match message {
            Message::Text(text) => match Notification::parse(&text) {
                Ok(notification) => {
                    let delivered = registry.dispatch(&notification);
                    debug!(kind = ?notification.kind(), delivered, "notification dispatched");
                    metrics::counter!("sdk_notifications_total").increment(1);
                }
                Err(e) => {
                    warn!(error = %e, "undecodable notification skipped");
                    metrics::counter!("sdk_notification_decode_failures_total").increment(1);
                }
            },
            Message::Ping(payload) => {
                let _ = write.send(Message::Pong(payload)).await;
            }
            Message::Close(_) => {
                info!("push channel closed by server");
                break;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Build the connection URL: customer scope segment plus the credential as
/// a query parameter.
fn channel_url(base: &str, token: &str) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| ChannelError::Url(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| ChannelError::Url(format!("cannot-be-a-base url: {base}")))?
        .pop_if_empty()
        .push("client");
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}
