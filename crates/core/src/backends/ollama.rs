use crate::config::GenerationConfig;
use crate::error::GenerationError;
use crate::models::SamplingOptions;
use crate::traits::TextGenerator;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const BACKEND: &str = "ollama";

/// Client for an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaGenerator {
    client: Arc<Client>,
    base_url: Url,
    model: String,
}

impl OllamaGenerator {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        // a missing trailing slash would make `join` drop the last path segment
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
            model: model.into(),
        })
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self, GenerationError> {
        Self::new(
            &config.base_url,
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn generate_url(&self) -> Result<Url, GenerationError> {
        Ok(self.base_url.join("api/generate")?)
    }

    /// Lists installed models; any 2xx answer counts as healthy.
    pub async fn health_check(&self) -> Result<(), GenerationError> {
        let response = self
            .client
            .get(self.base_url.join("api/tags")?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::BackendResponse {
                backend: BACKEND.to_string(),
                details: format!("health check returned {}", response.status()),
            });
        }

        Ok(())
    }
}

pub(crate) fn generate_payload(model: &str, prompt: &str, options: &SamplingOptions) -> Value {
    json!({
        "model": model,
        "prompt": prompt,
        "stream": false,
        "options": {
            "temperature": options.temperature,
            "num_predict": options.num_predict,
            "top_k": options.top_k,
            "top_p": options.top_p,
        }
    })
}

pub(crate) fn response_text(parsed: &Value) -> Result<String, GenerationError> {
    parsed
        .pointer("/response")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GenerationError::BackendResponse {
            backend: BACKEND.to_string(),
            details: "response field missing".to_string(),
        })
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(
        &self,
        prompt: &str,
        options: &SamplingOptions,
    ) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(self.generate_url()?)
            .json(&generate_payload(&self.model, prompt, options))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::BackendResponse {
                backend: BACKEND.to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        response_text(&parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatMode;

    #[test]
    fn payload_matches_generate_contract() {
        let options = SamplingOptions::for_mode(ChatMode::Strict);
        let payload = generate_payload("llama3.2", "hola", &options);

        assert_eq!(payload["model"], "llama3.2");
        assert_eq!(payload["prompt"], "hola");
        assert_eq!(payload["stream"], false);
        assert_eq!(payload["options"]["num_predict"], 512);
        assert_eq!(payload["options"]["top_k"], 40);
        assert!(payload["options"]["temperature"].as_f64().is_some());
        assert!(payload["options"]["top_p"].as_f64().is_some());
    }

    #[test]
    fn response_field_is_required() {
        let text = response_text(&json!({ "response": "El colibri vive en Caldas." }))
            .expect("response field present");
        assert_eq!(text, "El colibri vive en Caldas.");

        assert!(matches!(
            response_text(&json!({ "done": true })),
            Err(GenerationError::BackendResponse { .. })
        ));
    }

    #[test]
    fn base_url_keeps_its_path_prefix() -> Result<(), GenerationError> {
        let generator = OllamaGenerator::new(
            "http://localhost:11434/proxy",
            "llama3.2",
            Duration::from_secs(5),
        )?;
        assert_eq!(
            generator.generate_url()?.as_str(),
            "http://localhost:11434/proxy/api/generate"
        );

        let generator =
            OllamaGenerator::new("http://localhost:11434", "llama3.2", Duration::from_secs(5))?;
        assert_eq!(
            generator.generate_url()?.as_str(),
            "http://localhost:11434/api/generate"
        );
        Ok(())
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            OllamaGenerator::new("not a url", "llama3.2", Duration::from_secs(5)),
            Err(GenerationError::Url(_))
        ));
    }
}
