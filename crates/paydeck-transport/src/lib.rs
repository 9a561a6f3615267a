//! Request execution layer for the Paydeck SDK
//!
//! One request in, one classified outcome out. The pipeline attaches the
//! current credential when one exists, performs the round-trip, and sorts
//! every failure into exactly one of four kinds (transport, protocol,
//! decode, application) so callers can tell "no network" from "server
//! rejected" from "server misbehaved" from "business error". It never
//! retries and never touches credential storage.

pub mod error;
pub mod pipeline;

pub use error::{RequestError, Result};
pub use pipeline::{Anonymous, CredentialSource, Transport, decode};
