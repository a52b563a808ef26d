//! Vault context fixtures.

use serde_json::json;

/// Client id used by the fixtures.
pub const CLIENT_ID: &str = "0f3c9a52-7d1e-4b8a-9c3f-2e6d8b1a4f70";
/// Client secret used by the fixtures.
pub const CLIENT_SECRET: &str = "fixture-client-secret";
/// Tenant URL used when no server is involved.
pub const TENANT_URL: &str = "https://tenant.secretsvaultcloud.com";

/// Serialized context for `url` with the default base path prefix.
#[must_use]
pub fn context_json(url: &str) -> String {
    context_for(url, CLIENT_ID)
}

/// Serialized context for `url` authenticating as `client_id`.
#[must_use]
pub fn context_for(url: &str, client_id: &str) -> String {
    json!({
        "DevOpsVaultUrl": url,
        "ClientId": client_id,
        "ClientSecret": CLIENT_SECRET,
    })
    .to_string()
}

/// Serialized context for `url` with an explicit base path prefix.
#[must_use]
pub fn context_json_with_prefix(url: &str, prefix: &str) -> String {
    json!({
        "DevOpsVaultUrl": url,
        "ClientId": CLIENT_ID,
        "ClientSecret": CLIENT_SECRET,
        "BasePathPrefix": prefix,
    })
    .to_string()
}

/// Context for [`TENANT_URL`].
#[must_use]
pub fn tenant_context() -> String {
    context_json(TENANT_URL)
}
