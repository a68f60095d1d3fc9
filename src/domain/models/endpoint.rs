use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Base URL of an OpenAI-compatible server, without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(DomainError::invalid_input("Please enter an endpoint URL"));
        }

        let url = Url::parse(trimmed)
            .map_err(|e| DomainError::invalid_input(format!("Invalid endpoint URL '{trimmed}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DomainError::invalid_input(format!(
                "Unsupported scheme '{}' (expected http or https)",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(DomainError::invalid_input(format!(
                "Endpoint URL '{trimmed}' has no host"
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_https(&self) -> bool {
        self.0.starts_with("https://")
    }

    /// Joins an absolute API path such as `/v1/models`.
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
