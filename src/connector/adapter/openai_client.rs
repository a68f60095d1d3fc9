use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::application::{ChatRequest, InferenceClient, InferenceClientFactory};
use crate::domain::{DomainError, Endpoint, ModelInfo, StreamDecoder, StreamEvent};

/// Default target: LM Studio running locally on its standard port.
pub const DEFAULT_BASE_URL: &str = "http://localhost:1234";
const MODELS_PATH: &str = "/v1/models";
const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for an OpenAI-compatible server.
///
/// | Variable          | Default                 | Purpose                      |
/// |-------------------|-------------------------|------------------------------|
/// | `LMCHAT_BASE_URL` | `http://localhost:1234` | LM Studio / any server       |
/// | `LMCHAT_MODEL`    | (none)                  | Model selected on startup    |
/// | `LMCHAT_API_KEY`  | (none)                  | Bearer token, rarely needed  |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: None,
            api_key: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            base_url: non_empty("LMCHAT_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: non_empty("LMCHAT_MODEL"),
            api_key: non_empty("LMCHAT_API_KEY"),
        }
    }

    /// Applies command-line overrides on top of the environment.
    pub fn with_overrides(
        mut self,
        base_url: Option<String>,
        model: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        if let Some(url) = base_url {
            self.base_url = url;
        }
        if model.is_some() {
            self.model = model;
        }
        if api_key.is_some() {
            self.api_key = api_key;
        }
        self
    }
}

#[derive(Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

/// HTTP client for OpenAI-compatible servers such as LM Studio, llama.cpp's
/// server, or vLLM.
///
/// Chat completions are requested with `stream: true` and decoded frame by
/// frame as the body arrives, so there is no overall request timeout; only
/// connecting is bounded. The connection probe uses a separate client with
/// a short timeout.
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    probe_client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    models_url: String,
    chat_url: String,
}

impl OpenAiCompatClient {
    pub fn new(endpoint: &Endpoint, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            probe_client: reqwest::Client::builder()
                .connect_timeout(PROBE_TIMEOUT)
                .timeout(PROBE_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key,
            base_url: endpoint.as_str().to_string(),
            models_url: endpoint.join(MODELS_PATH),
            chat_url: endpoint.join(CHAT_COMPLETIONS_PATH),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, DomainError> {
        let endpoint = Endpoint::parse(&config.base_url)?;
        Ok(Self::new(&endpoint, config.api_key.clone()))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl InferenceClient for OpenAiCompatClient {
    async fn test_connection(&self) -> bool {
        match self.authorize(self.probe_client.get(&self.models_url)).send().await {
            Ok(response) => {
                let ok = response.status() == reqwest::StatusCode::OK;
                if !ok {
                    debug!("Probe of {} returned {}", self.models_url, response.status());
                }
                ok
            }
            Err(e) => {
                debug!("Probe of {} failed: {e}", self.models_url);
                false
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, DomainError> {
        let response = self
            .authorize(self.client.get(&self.models_url))
            .send()
            .await
            .map_err(|e| DomainError::connection(format!("Failed to load models: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("GET {} returned {status}: {body}", self.models_url);
            return Err(DomainError::api(status.as_u16(), "Failed to load models"));
        }

        let models: ModelsResponse = response
            .json()
            .await
            .map_err(|e| DomainError::stream(format!("Failed to parse model list: {e}")))?;

        Ok(models.data.into_iter().map(|m| ModelInfo::new(m.id)).collect())
    }

    async fn chat(
        &self,
        request: &ChatRequest,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, DomainError> {
        let response = self
            .authorize(self.client.post(&self.chat_url))
            .json(request)
            .send()
            .await
            .map_err(|e| DomainError::connection(format!("Chat request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("POST {} returned {status}: {body}", self.chat_url);
            return Err(DomainError::api(
                status.as_u16(),
                "Failed to get response from API",
            ));
        }

        let mut decoder = StreamDecoder::new();
        let mut reply = String::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let bytes = chunk.map_err(|e| DomainError::stream(format!("Failed to read response body: {e}")))?;
            for event in decoder.push(&bytes) {
                handle_event(event, &mut reply, on_chunk)?;
            }
        }
        for event in decoder.finish() {
            handle_event(event, &mut reply, on_chunk)?;
        }

        if !decoder.is_finished() {
            debug!("Stream from {} ended without [DONE]", self.chat_url);
        }
        Ok(reply)
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}

fn handle_event(
    event: StreamEvent,
    reply: &mut String,
    on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
) -> Result<(), DomainError> {
    match event {
        StreamEvent::Content(text) => {
            on_chunk(&text);
            reply.push_str(&text);
        }
        StreamEvent::Done => debug!("Received [DONE]"),
        StreamEvent::Malformed(payload) => warn!("Failed to parse stream frame: {payload}"),
        StreamEvent::ServerError(message) => {
            return Err(DomainError::stream(format!("Server reported an error: {message}")));
        }
    }
    Ok(())
}

/// Creates [`OpenAiCompatClient`]s for endpoints entered at runtime,
/// reusing the configured API key.
pub struct OpenAiCompatClientFactory {
    api_key: Option<String>,
}

impl OpenAiCompatClientFactory {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }
}

impl InferenceClientFactory for OpenAiCompatClientFactory {
    fn create(&self, endpoint: &Endpoint) -> Arc<dyn InferenceClient> {
        Arc::new(OpenAiCompatClient::new(endpoint, self.api_key.clone()))
    }
}
