//! Component E — Admission Filter.
//!
//! Two orthogonal sub-filters, run in this order on every inbound request
//! (`spec.md` §4.E): origin policy, then rate policy.

pub mod origin;
pub mod rate;

pub use origin::OriginPolicy;
pub use rate::{EndpointClass, RateLimit, RateLimiter};
