//! Credential lookup.
//!
//! The engine never reads credentials itself: the caller resolves them once
//! through a [`CredentialSource`] and passes the result in [`SyncConfig`].
//!
//! [`SyncConfig`]: super::SyncConfig

use std::collections::HashMap;

/// Names of the values a credential store can supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    BrazeApiKey,
    BrazeRestEndpoint,
    TransifexApiToken,
    TransifexOrganizationSlug,
    TransifexProjectSlug,
    TransifexApiBaseUrl,
}

impl CredentialKey {
    /// Environment variable holding this value.
    #[must_use]
    pub const fn env_var(&self) -> &'static str {
        match self {
            Self::BrazeApiKey => "BRAZE_API_KEY",
            Self::BrazeRestEndpoint => "BRAZE_REST_ENDPOINT",
            Self::TransifexApiToken => "TRANSIFEX_API_TOKEN",
            Self::TransifexOrganizationSlug => "TRANSIFEX_ORGANIZATION_SLUG",
            Self::TransifexProjectSlug => "TRANSIFEX_PROJECT_SLUG",
            Self::TransifexApiBaseUrl => "TRANSIFEX_API_BASE_URL",
        }
    }

    /// Human-readable setting name.
    #[must_use]
    pub const fn setting(&self) -> &'static str {
        match self {
            Self::BrazeApiKey => "Braze API key",
            Self::BrazeRestEndpoint => "Braze REST endpoint",
            Self::TransifexApiToken => "Transifex API token",
            Self::TransifexOrganizationSlug => "Transifex organization slug",
            Self::TransifexProjectSlug => "Transifex project slug",
            Self::TransifexApiBaseUrl => "Transifex API base URL",
        }
    }
}

/// Supplies credentials and endpoints on demand.
pub trait CredentialSource {
    /// Look up a value; `None` if the store has nothing for it.
    fn get(&self, key: CredentialKey) -> Option<String>;
}

/// Reads credentials from process environment variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, key: CredentialKey) -> Option<String> {
        std::env::var(key.env_var())
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Fixed in-memory credentials, for embedding callers and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials(HashMap<CredentialKey, String>);

impl StaticCredentials {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: CredentialKey, value: impl Into<String>) -> Self {
        self.0.insert(key, value.into());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn get(&self, key: CredentialKey) -> Option<String> {
        self.0.get(&key).cloned()
    }
}

/// A secret value that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw secret. Only for building request headers.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}
