//! netprobe Common Library
//!
//! Payload contract primitives shared by the probe harness: the provider
//! enumeration, the validated entity, the schema validator and the provider
//! whitelist policy. Everything here is synchronous and side-effect free.

pub mod error;
pub mod policy;
pub mod schema;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SchemaViolation, ViolationKind};
pub use policy::{is_authorized, AuthorizationPolicy, AUTHORIZED_PROVIDERS};
pub use schema::validate;
pub use types::{ImageMetadata, Provider, QualityTier, ValidatedEntity};

/// netprobe version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
