//! OpenAI-compatible chat backend, covering the public API and Azure
//! deployments.

use super::client::ChatBackend;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::info;

/// API version pinned for Azure deployments.
const AZURE_API_VERSION: &str = "2023-07-01-preview";

/// Where a chat request goes and how it is authenticated.
enum Endpoint {
    /// Public OpenAI API, bearer auth.
    OpenAi { base_url: String },
    /// Azure OpenAI deployment, `api-key` header auth.
    Azure {
        endpoint: String,
        deployment: String,
    },
}

/// Chat-completions backend used for translation requests.
pub struct OpenAiBackend {
    client: Client,
    endpoint: Endpoint,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    /// Backend against the public OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url("https://api.openai.com", api_key, model)
    }

    /// Public-API backend against a custom base URL. Tests point this at a
    /// local mock server.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: Endpoint::OpenAi {
                base_url: base_url.into(),
            },
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Backend against an Azure OpenAI deployment.
    pub fn azure(
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: Endpoint::Azure {
                endpoint: endpoint.into(),
                deployment: deployment.into(),
            },
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Pick Azure when `AZURE_DEPLOYMENT_ID` and `AZURE_ENDPOINT` are both
    /// set, the public API otherwise. `OPENAI_API_KEY` is required either
    /// way.
    pub fn from_env(model: &str) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
        match (
            std::env::var("AZURE_DEPLOYMENT_ID"),
            std::env::var("AZURE_ENDPOINT"),
        ) {
            (Ok(deployment), Ok(endpoint)) => {
                info!("using azure deployment {deployment}");
                Ok(Self::azure(endpoint, deployment, api_key, model))
            }
            _ => Ok(Self::openai(api_key, model)),
        }
    }

    fn request_url(&self) -> String {
        match &self.endpoint {
            Endpoint::OpenAi { base_url } => format!("{base_url}/v1/chat/completions"),
            Endpoint::Azure {
                endpoint,
                deployment,
            } => format!(
                "{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={AZURE_API_VERSION}"
            ),
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    /// One chat request per call; the caller decides whether to retry.
    async fn chat_complete(&self, system: &str, user: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });
        let mut request = self.client.post(self.request_url()).json(&body);
        request = match self.endpoint {
            Endpoint::OpenAi { .. } => request.bearer_auth(&self.api_key),
            Endpoint::Azure { .. } => request.header("api-key", self.api_key.as_str()),
        };
        let response = request.send().await?.error_for_status()?;
        let value: Value = response.json().await?;
        let content = value["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("chat response has no message content"))?;
        Ok(content.to_string())
    }
}
