use crate::config::AnalyzerConfig;
use crate::utils::error::{FocusError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Minimal client for a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f64,
    status_timeout: Duration,
}

impl OllamaClient {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            status_timeout: Duration::from_secs(config.status_timeout_secs),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// 只要伺服器有回應就算在線，不檢查狀態碼
    pub async fn is_online(&self) -> bool {
        match self
            .client
            .get(&self.base_url)
            .timeout(self.status_timeout)
            .send()
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Ollama status check failed: {}", e);
                false
            }
        }
    }

    pub async fn generate(&self, prompt: &str, num_predict: u32) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict,
            },
        };

        tracing::debug!("POST {} (model {})", url, self.model);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: GenerateResponse = response.json().await.map_err(|e| FocusError::LlmError {
            message: format!("Unexpected response body: {}", e),
        })?;
        Ok(body.response)
    }
}
