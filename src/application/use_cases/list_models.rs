use std::sync::Arc;

use tracing::debug;

use crate::application::InferenceClient;
use crate::domain::{ChatSession, DomainError, ModelInfo};

pub struct ListModelsUseCase {
    client: Arc<dyn InferenceClient>,
}

impl ListModelsUseCase {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self { client }
    }

    /// Models advertised by the server, sorted by id.
    pub async fn execute(&self) -> Result<Vec<ModelInfo>, DomainError> {
        let mut models = self.client.list_models().await?;
        models.sort_by(|a, b| a.id().cmp(b.id()));
        models.dedup_by(|a, b| a.id() == b.id());
        debug!("Server at {} lists {} models", self.client.endpoint(), models.len());
        Ok(models)
    }

    /// Refreshes the session's model list. When nothing is selected yet the
    /// first model is picked.
    pub async fn load_into(&self, session: &mut ChatSession) -> Result<usize, DomainError> {
        let models = self.execute().await?;
        let count = models.len();
        let first = models.first().map(|m| m.id().to_string());
        session.set_models(models);
        if session.selected_model().is_none() {
            if let Some(id) = first {
                session.select_model(id);
            }
        }
        Ok(count)
    }
}
