//! Wishlist Auth Core
//!
//! A stateless, cross-domain authentication core: dual-token bearer auth
//! (access + refresh), an in-memory one-time handoff broker for
//! web-to-mobile session transfer, guest reservation tokens, and the
//! admission policies (origin allow-list, per-endpoint-class rate limiting)
//! that sit in front of all of it.
//!
//! ## Module Organization
//!
//! - [`secret`] — the deployment signing secret, zeroized on drop.
//! - [`clock`] — the injected wall-clock seam, for deterministic boundary tests.
//! - [`identity`] — the external collaborator seam: user lookup/verify.
//! - [`auth`] — token lifecycle (Mint, Verifier), the handoff Broker, and the
//!   Session Orchestrator composing both.
//! - [`admission`] — origin and rate policy, applied before any auth handler runs.
//! - [`gate`] — the Axum extractor guarding handlers that require an access token.
//! - [`config`] — typed configuration assembled from the process environment.
//! - [`error`] — the crate-wide error taxonomy and its uniform HTTP rendering.

pub mod admission;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod health;
pub mod identity;
pub mod secret;

pub use clock::{Clock, SystemClock};
pub use config::AuthConfig;
pub use error::{AuthError, Result};
pub use identity::{IdentityStore, UserRecord};
pub use secret::Secret;
