//! Shared test utilities for the DevOps Secrets Vault secure store.
//!
//! This crate provides:
//! - In-memory token and secret services with call recording
//! - Proptest generators for paths, keys and credentials
//! - Context fixtures

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
pub use mocks::{MockSecretService, MockTokenService, SecretCall, SecretOp};
