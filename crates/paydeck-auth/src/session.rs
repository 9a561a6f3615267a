//! Login flows and session lifecycle
//!
//! The Session Manager owns every credential transition. Transitions are
//! serialized by holding the state Mutex across the whole flow, so a logout
//! issued while a code exchange is still in flight queues behind it instead
//! of interleaving with the channel open/close signals.
//!
//! "Authenticated" is derived, never assumed: a token is stored first (so
//! the identity probe itself carries it), then the probe must resolve a
//! non-null user. A probe that resolves nothing — or fails outright — rolls
//! the stored token back, so no orphaned credential survives an unconfirmed
//! identity.

use std::sync::Arc;

use common::Secret;
use paydeck_transport::{Transport, decode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::cooldown::CooldownLedger;
use crate::credentials::TokenStore;
use crate::error::{Error, Result};

/// The identity resolved by a successful probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub card: Option<String>,
}

/// Session lifecycle states.
#[derive(Debug, Clone)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated(AuthenticatedUser),
}

/// Lifecycle notifications broadcast on every committed transition.
///
/// The push channel driver consumes these: `Authenticated` carries the
/// credential it needs as a connection parameter, `LoggedOut` tears the
/// channel down.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Authenticated {
        user: AuthenticatedUser,
        token: Secret<String>,
    },
    LoggedOut,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenResponse {
    access_token: String,
}

/// Orchestrates login flows over injected stores.
///
/// Both stores arrive by injection rather than through global slots, so
/// tests substitute tempdir-backed instances freely.
pub struct SessionManager {
    transport: Arc<Transport>,
    tokens: Arc<TokenStore>,
    cooldowns: CooldownLedger,
    auth_path: String,
    /// Doubles as the transition lock: held across the full exchange.
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<Transport>,
        tokens: Arc<TokenStore>,
        cooldowns: CooldownLedger,
        auth_path: impl Into<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            transport,
            tokens,
            cooldowns,
            auth_path: auth_path.into(),
            state: Mutex::new(SessionState::Anonymous),
            events,
        }
    }

    /// Subscribe to lifecycle notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Current state snapshot. Blocks while a transition is in flight.
    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Request a verification code for `phone`.
    ///
    /// The local cooldown guard runs first: while a previous code is still
    /// cooling down, no request reaches the server and no duplicate SMS is
    /// sent. On success the server-announced cooldown is recorded and
    /// returned. No session state changes.
    pub async fn request_code(&self, phone: &str) -> Result<u64> {
        self.cooldowns.try_issue(phone).await?;

        let value = self
            .transport
            .post(&format!("{}/get-code", self.auth_path), &json!({ "phone": phone }))
            .await?;
        let cooldown_seconds: u64 = decode(value)?;

        self.cooldowns.record(phone, cooldown_seconds).await?;
        info!(phone, cooldown_seconds, "verification code requested");
        Ok(cooldown_seconds)
    }

    /// Exchange a received verification code for a session.
    ///
    /// Returns `Ok(None)` when the exchange succeeded but no identity
    /// resolved — a normal outcome, not an error: the session stays
    /// `Anonymous` and the issued token is rolled back.
    pub async fn submit_code(&self, phone: &str, code: &str) -> Result<Option<AuthenticatedUser>> {
        let mut state = self.state.lock().await;
        *state = SessionState::Authenticating;
        let outcome = self
            .exchange(
                &format!("{}/use-code", self.auth_path),
                json!({ "phone": phone, "code": code }),
            )
            .await;
        self.commit(&mut state, outcome).await
    }

    /// Open a session with a username and password.
    pub async fn login_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AuthenticatedUser>> {
        let mut state = self.state.lock().await;
        *state = SessionState::Authenticating;
        let path = self.auth_path.clone();
        let outcome = self
            .exchange(&path, json!({ "username": username, "password": password }))
            .await;
        self.commit(&mut state, outcome).await
    }

    /// End the session: clear the credential and signal channel teardown.
    ///
    /// Cooldowns are per-phone, not per-identity — they survive logout.
    pub async fn logout(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.tokens.clear().await?;
        *state = SessionState::Anonymous;
        let _ = self.events.send(SessionEvent::LoggedOut);
        info!("session terminated");
        Ok(())
    }

    /// Fresh identity probe. Absence of a user is `Ok(None)`, never an
    /// error; safe to call in any state.
    pub async fn current_user(&self) -> Result<Option<AuthenticatedUser>> {
        self.probe().await
    }

    /// Identity probe for callers that demand a user.
    pub async fn require_user(&self) -> Result<AuthenticatedUser> {
        self.probe().await?.ok_or(Error::NotAuthenticated)
    }

    /// Exchange credentials for a token, persist it, and confirm the
    /// identity. The token is stored *before* the probe so the probe
    /// request carries it; any non-confirmation rolls it back.
    async fn exchange(
        &self,
        path: &str,
        params: serde_json::Value,
    ) -> Result<Option<(AuthenticatedUser, String)>> {
        let value = self.transport.post(path, &params).await?;
        let token: AccessTokenResponse = decode(value)?;
        self.tokens.set(token.access_token.clone()).await?;

        match self.probe().await {
            Ok(Some(user)) => Ok(Some((user, token.access_token))),
            Ok(None) => {
                debug!("token issued but no identity resolved, rolling back");
                self.tokens.clear().await?;
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "identity probe failed after token exchange, rolling back");
                self.tokens.clear().await?;
                Err(e)
            }
        }
    }

    /// Apply an exchange outcome to the held state and emit lifecycle events.
    async fn commit(
        &self,
        state: &mut SessionState,
        outcome: Result<Option<(AuthenticatedUser, String)>>,
    ) -> Result<Option<AuthenticatedUser>> {
        match outcome {
            Ok(Some((user, token))) => {
                *state = SessionState::Authenticated(user.clone());
                // A fresh session no longer needs phone-verification
                // throttling; a failure here degrades nothing but compaction.
                if let Err(e) = self.cooldowns.clear().await {
                    warn!(error = %e, "failed to clear cooldown ledger");
                }
                let _ = self.events.send(SessionEvent::Authenticated {
                    user: user.clone(),
                    token: Secret::new(token),
                });
                info!(user_id = user.id, "session authenticated");
                Ok(Some(user))
            }
            Ok(None) => {
                *state = SessionState::Anonymous;
                Ok(None)
            }
            Err(e) => {
                *state = SessionState::Anonymous;
                Err(e)
            }
        }
    }

    async fn probe(&self) -> Result<Option<AuthenticatedUser>> {
        let value = self.transport.get(&format!("{}/", self.auth_path)).await?;
        Ok(decode::<Option<AuthenticatedUser>>(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::http::HeaderMap;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use paydeck_transport::RequestError;
    use serde_json::{Value, json};
    use std::time::Duration;

    /// Mock auth backend. Accepts code "1234" (token `tok_ok`), a "ghost"
    /// phone (token `tok_ghost`, which probes to null), and password login
    /// for "kim"/"secret". Probing with `tok_broken` returns 500.
    fn auth_router() -> axum::Router {
        axum::Router::new()
            .route("/client/auth/get-code", post(|| async { Json(json!(60)) }))
            .route(
                "/client/auth/use-code",
                post(|Json(body): Json<Value>| async move {
                    if body["phone"] == "ghost" {
                        return Json(json!({ "accessToken": "tok_ghost" }));
                    }
                    if body["phone"] == "broken" {
                        return Json(json!({ "accessToken": "tok_broken" }));
                    }
                    if body["code"] == "1234" {
                        Json(json!({ "accessToken": "tok_ok" }))
                    } else {
                        Json(json!({ "error": "CODE_MISMATCH" }))
                    }
                }),
            )
            .route(
                "/client/auth",
                post(|Json(body): Json<Value>| async move {
                    if body["username"] == "kim" && body["password"] == "secret" {
                        Json(json!({ "accessToken": "tok_ok" }))
                    } else {
                        Json(json!({ "error": "BAD_CREDENTIALS" }))
                    }
                }),
            )
            .route(
                "/client/auth/",
                get(|headers: HeaderMap| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("");
                    match auth {
                        "Bearer tok_ok" => Json(json!({
                            "id": 7,
                            "firstName": "Kim",
                            "lastName": "Soldatova",
                            "phone": "70000000001",
                            "email": null,
                            "card": "4276000011112222"
                        }))
                        .into_response(),
                        "Bearer tok_broken" => {
                            (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
                        }
                        _ => Json(json!(null)).into_response(),
                    }
                }),
            )
    }

    async fn serve() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, auth_router()).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn manager(dir: &tempfile::TempDir, base_url: &str) -> SessionManager {
        let tokens = Arc::new(
            TokenStore::load(dir.path().join("credential.json"))
                .await
                .unwrap(),
        );
        let cooldowns = CooldownLedger::load(dir.path().join("cooldowns.json"))
            .await
            .unwrap();
        let transport = Arc::new(Transport::new(
            base_url,
            Duration::from_secs(2),
            tokens.clone(),
        ));
        SessionManager::new(transport, tokens, cooldowns, "/client/auth")
    }

    #[tokio::test]
    async fn code_flow_authenticates_and_persists_token() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve().await;
        let session = manager(&dir, &url).await;

        let cooldown = session.request_code("70000000001").await.unwrap();
        assert_eq!(cooldown, 60);

        let user = session
            .submit_code("70000000001", "1234")
            .await
            .unwrap()
            .expect("identity should resolve");
        assert_eq!(user.first_name, "Kim");

        assert!(matches!(
            session.state().await,
            SessionState::Authenticated(_)
        ));
        assert_eq!(session.tokens.get().await.as_deref(), Some("tok_ok"));
    }

    #[tokio::test]
    async fn second_code_request_hits_the_local_guard() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve().await;
        let session = manager(&dir, &url).await;

        session.request_code("70000000001").await.unwrap();
        let err = session.request_code("70000000001").await.unwrap_err();
        match err {
            Error::AlreadyCoolingDown { remaining_secs } => {
                assert!((59..=60).contains(&remaining_secs));
            }
            other => panic!("expected AlreadyCoolingDown, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn successful_authentication_clears_cooldowns() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve().await;
        let session = manager(&dir, &url).await;

        session.request_code("70000000001").await.unwrap();
        session.submit_code("70000000001", "1234").await.unwrap();

        // Guard is gone: the same phone may request a code again.
        session.cooldowns.try_issue("70000000001").await.unwrap();
    }

    #[tokio::test]
    async fn null_identity_leaves_anonymous_with_no_token() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve().await;
        let session = manager(&dir, &url).await;

        let outcome = session.submit_code("ghost", "1234").await.unwrap();
        assert!(outcome.is_none());
        assert!(matches!(session.state().await, SessionState::Anonymous));
        assert!(session.tokens.get().await.is_none(), "token must roll back");
    }

    #[tokio::test]
    async fn probe_failure_rolls_back_the_stored_token() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve().await;
        let session = manager(&dir, &url).await;

        let err = session.submit_code("broken", "1234").await.unwrap_err();
        assert!(
            matches!(err, Error::Request(RequestError::Protocol(500))),
            "got {err:?}"
        );
        assert!(session.tokens.get().await.is_none());
        assert!(matches!(session.state().await, SessionState::Anonymous));
    }

    #[tokio::test]
    async fn wrong_code_surfaces_the_application_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve().await;
        let session = manager(&dir, &url).await;

        let err = session.submit_code("70000000001", "9999").await.unwrap_err();
        match err {
            Error::Request(RequestError::Application(code)) => {
                assert_eq!(code, "CODE_MISMATCH");
            }
            other => panic!("expected Application failure, got {other:?}"),
        }
        assert!(matches!(session.state().await, SessionState::Anonymous));
    }

    #[tokio::test]
    async fn logout_clears_token_but_keeps_cooldowns() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve().await;
        let session = manager(&dir, &url).await;

        session.submit_code("70000000001", "1234").await.unwrap();
        // A cooldown recorded after authentication belongs to whichever
        // phone asked, not to the departing identity.
        session.request_code("70000000099").await.unwrap();

        session.logout().await.unwrap();

        assert!(session.tokens.get().await.is_none());
        assert!(matches!(session.state().await, SessionState::Anonymous));
        let err = session.cooldowns.try_issue("70000000099").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyCoolingDown { .. }));
    }

    #[tokio::test]
    async fn current_user_without_session_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve().await;
        let session = manager(&dir, &url).await;

        assert!(session.current_user().await.unwrap().is_none());

        let err = session.require_user().await.unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));
    }

    #[tokio::test]
    async fn current_user_resolves_after_login_and_clears_after_logout() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve().await;
        let session = manager(&dir, &url).await;

        session.submit_code("70000000001", "1234").await.unwrap();
        let user = session.current_user().await.unwrap().unwrap();
        assert_eq!(user.id, 7);

        session.logout().await.unwrap();
        assert!(session.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn password_flow_authenticates() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve().await;
        let session = manager(&dir, &url).await;

        let user = session
            .login_password("kim", "secret")
            .await
            .unwrap()
            .expect("identity should resolve");
        assert_eq!(user.last_name, "Soldatova");
    }

    #[tokio::test]
    async fn lifecycle_events_are_broadcast_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve().await;
        let session = manager(&dir, &url).await;
        let mut events = session.subscribe();

        session.submit_code("70000000001", "1234").await.unwrap();
        session.logout().await.unwrap();

        match events.recv().await.unwrap() {
            SessionEvent::Authenticated { user, token } => {
                assert_eq!(user.id, 7);
                assert_eq!(token.expose(), "tok_ok");
            }
            other => panic!("expected Authenticated, got {other:?}"),
        }
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::LoggedOut
        ));
    }
}
