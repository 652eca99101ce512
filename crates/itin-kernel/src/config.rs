//! Env-based configuration: provider credentials, document-store
//! endpoint, model endpoint, and the serve port. No field here changes
//! what actually gets wired up today — every provider is still the fixed
//! fake from `itin-providers` — but reading them now means a future
//! transport layer doesn't need a second config pass.

use std::env;

#[derive(Debug, Clone)]
pub struct KernelConfig {
    pub port: u16,
    pub model_endpoint: Option<String>,
    pub document_store_endpoint: Option<String>,
    pub places_api_key: Option<String>,
    pub payment_api_key: Option<String>,
}

impl KernelConfig {
    /// Reads configuration from the process environment. Never fails:
    /// every field is optional or has a sane default, matching the
    /// boundary contract ("environment supplies ... port").
    #[must_use]
    pub fn from_env() -> Self {
        let port = env::var("ITIN_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(8080);

        Self {
            port,
            model_endpoint: env::var("ITIN_MODEL_ENDPOINT").ok(),
            document_store_endpoint: env::var("ITIN_STORE_ENDPOINT").ok(),
            places_api_key: env::var("ITIN_PLACES_API_KEY").ok(),
            payment_api_key: env::var("ITIN_PAYMENT_API_KEY").ok(),
        }
    }

    /// Warns for any endpoint/credential that was supplied but that this
    /// build has no real client for yet — every collaborator is wired to
    /// its fixed fake regardless.
    pub fn warn_unused(&self) {
        if self.model_endpoint.is_some() {
            tracing::warn!("ITIN_MODEL_ENDPOINT set but no real model client is wired; using the fixed fake");
        }
        if self.document_store_endpoint.is_some() {
            tracing::warn!("ITIN_STORE_ENDPOINT set but no real document store is wired; using the in-memory store");
        }
        if self.places_api_key.is_some() {
            tracing::warn!("ITIN_PLACES_API_KEY set but no real places provider is wired; using the fixed fake");
        }
        if self.payment_api_key.is_some() {
            tracing::warn!("ITIN_PAYMENT_API_KEY set but no real payment gateway is wired; using the declining fake");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_port_8080_when_unset() {
        env::remove_var("ITIN_PORT");
        assert_eq!(KernelConfig::from_env().port, 8080);
    }
}
