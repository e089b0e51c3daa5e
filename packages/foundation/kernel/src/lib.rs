//! AgentKern-Kernel: the shared ambient stack used by every pillar —
//! structured logging, the RLS session-scoped tenancy binding, the
//! HTTP/JSON error surface, and CORS.
//!
//! Nothing here is pillar-specific; pillars depend on this crate, never the
//! other way around.

pub mod auth;
pub mod config;
pub mod cors;
pub mod error;
pub mod logging;
pub mod tenancy;

pub use auth::{LicenseValidator, StaticLicenseValidator};
pub use config::GatewayConfig;
pub use error::{ApiError, ErrorCode};
pub use tenancy::{with_tenancy, TenancyError};
