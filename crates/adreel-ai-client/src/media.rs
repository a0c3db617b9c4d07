//! Media generation service client.
//!
//! Generation is slow (minutes) and billable; the service responds with
//! a short-lived download URL for the rendered clip, which this client
//! fetches before returning.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{AiError, AiResult};
use crate::types::{GeneratedClip, GenerationRequest};

/// Client for the media generation service.
pub struct MediaGenerationClient {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    clip_url: String,
}

impl MediaGenerationClient {
    /// Create a new client.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        // Generation holds the request open while rendering
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> AiResult<Self> {
        let base_url = std::env::var("MEDIA_SERVICE_URL")
            .map_err(|_| AiError::config_error("MEDIA_SERVICE_URL not set"))?;
        let api_key = std::env::var("MEDIA_SERVICE_API_KEY")
            .map_err(|_| AiError::config_error("MEDIA_SERVICE_API_KEY not set"))?;
        Ok(Self::new(base_url, api_key))
    }

    /// Render one scene clip from a description.
    ///
    /// One attempt; the caller owns the retry policy.
    pub async fn generate(&self, request: &GenerationRequest) -> AiResult<GeneratedClip> {
        let url = format!("{}/v1/generations", self.base_url);
        debug!("Requesting scene generation from {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerationResponse = response.json().await?;
        let clip = self.download(&body.clip_url).await?;
        info!("Scene generation succeeded ({} bytes)", clip.bytes.len());
        Ok(clip)
    }

    /// Fetch the rendered clip from the service-issued URL.
    async fn download(&self, clip_url: &str) -> AiResult<GeneratedClip> {
        let response = self.client.get(clip_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Api {
                status: status.as_u16(),
                message: format!("clip download failed: {clip_url}"),
            });
        }

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(AiError::invalid_response("generated clip is empty"));
        }

        Ok(GeneratedClip { bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> GenerationRequest {
        GenerationRequest {
            description: "bright product shot".to_string(),
            duration_secs: 5.0,
            style_context: "minimal".to_string(),
        }
    }

    #[tokio::test]
    async fn test_generate_downloads_clip() {
        let server = MockServer::start().await;
        let clip_url = format!("{}/clips/abc.mp4", server.uri());

        Mock::given(method("POST"))
            .and(path("/v1/generations"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "clip_url": clip_url })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/clips/abc.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4-bytes".to_vec()))
            .mount(&server)
            .await;

        let client = MediaGenerationClient::new(server.uri(), "key");
        let clip = client.generate(&request()).await.unwrap();
        assert_eq!(clip.bytes, b"mp4-bytes");
    }

    #[tokio::test]
    async fn test_empty_clip_rejected() {
        let server = MockServer::start().await;
        let clip_url = format!("{}/clips/empty.mp4", server.uri());

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "clip_url": clip_url })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = MediaGenerationClient::new(server.uri(), "key");
        let err = client.generate(&request()).await.unwrap_err();
        assert!(matches!(err, AiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_overloaded_service_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529))
            .mount(&server)
            .await;

        let client = MediaGenerationClient::new(server.uri(), "key");
        let err = client.generate(&request()).await.unwrap_err();
        assert!(err.is_transient());
    }
}
