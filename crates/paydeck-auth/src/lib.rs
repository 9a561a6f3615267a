//! Session layer for the Paydeck SDK
//!
//! Owns the durable client-side state (one bearer credential, one
//! verification-code cooldown ledger) and the login flows that mutate it.
//! The Session Manager is the only writer of the credential; the request
//! pipeline reads it through the `CredentialSource` seam.
//!
//! Session flow:
//! 1. `SessionManager::request_code()` — local cooldown guard, then the
//!    code-request endpoint, then a recorded cooldown
//! 2. `SessionManager::submit_code()` / `login_password()` — exchange for a
//!    token, persist it, probe the identity, commit or roll back
//! 3. `SessionEvent::Authenticated` broadcast — consumed by the push channel
//! 4. `SessionManager::logout()` — credential cleared, `LoggedOut` broadcast

pub mod cooldown;
pub mod credentials;
pub mod error;
pub mod session;

pub use cooldown::{CooldownEntry, CooldownLedger};
pub use credentials::TokenStore;
pub use error::{Error, Result};
pub use session::{AuthenticatedUser, SessionEvent, SessionManager, SessionState};
