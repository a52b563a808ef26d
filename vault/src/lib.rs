//! DevOps Secrets Vault secure store.
//!
//! Authenticates with OAuth2 client credentials, caches bearer tokens per
//! client id, and creates, reads, updates and deletes secrets addressed by
//! normalized slugs.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod broker;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod path;
pub mod store;
pub mod token;
pub mod transport;

pub use broker::{BrokerSession, SecretBroker};
pub use config::{ConfigError, StoreConfig};
pub use context::VaultContext;
pub use error::{ErrorKind, StoreError, StoreResult, TransportError};
pub use http::HttpTransport;
pub use store::SecureStore;
pub use token::{CachedToken, TokenCache, TokenResponse, TokenService};
pub use transport::{ApiSession, Credential, SecretData, SecretPayload, SecretRecord, SecretService};
