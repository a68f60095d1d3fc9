use std::sync::Arc;

use tracing::{info, warn};

use crate::application::{InferenceClient, InferenceClientFactory};
use crate::domain::{DomainError, Endpoint};

/// An endpoint that answered the connection probe, with its client.
#[derive(Clone)]
pub struct Connection {
    pub endpoint: Endpoint,
    pub client: Arc<dyn InferenceClient>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Use case for validating an endpoint and probing the server behind it.
pub struct ConnectUseCase {
    factory: Arc<dyn InferenceClientFactory>,
}

impl ConnectUseCase {
    pub fn new(factory: Arc<dyn InferenceClientFactory>) -> Self {
        Self { factory }
    }

    pub async fn execute(&self, raw_endpoint: &str) -> Result<Connection, DomainError> {
        let endpoint = Endpoint::parse(raw_endpoint)?;
        let client = self.factory.create(&endpoint);

        if !client.test_connection().await {
            warn!("Connection test failed for {}", endpoint);
            return Err(DomainError::connection(format!(
                "Failed to connect to {endpoint}"
            )));
        }

        info!("Connected to {}", endpoint);
        Ok(Connection { endpoint, client })
    }
}
