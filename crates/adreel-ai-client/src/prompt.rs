//! Prompt mutation service client.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AiError, AiResult};
use crate::types::{MutatedPrompt, PromptMutationRequest};

/// Client for the prompt mutation service.
pub struct PromptMutationClient {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct MutationResponse {
    revised_description: String,
    change_summary: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    detail: String,
}

impl PromptMutationClient {
    /// Create a new client.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: Client::new(),
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> AiResult<Self> {
        let base_url = std::env::var("PROMPT_SERVICE_URL")
            .map_err(|_| AiError::config_error("PROMPT_SERVICE_URL not set"))?;
        let api_key = std::env::var("PROMPT_SERVICE_API_KEY")
            .map_err(|_| AiError::config_error("PROMPT_SERVICE_API_KEY not set"))?;
        Ok(Self::new(base_url, api_key))
    }

    /// Request a revised description for one scene.
    ///
    /// One attempt; the caller owns the retry policy.
    pub async fn mutate(&self, request: &PromptMutationRequest) -> AiResult<MutatedPrompt> {
        let url = format!("{}/v1/mutations", self.base_url);
        debug!("Requesting prompt mutation from {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .map(|b| b.detail)
                .unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: MutationResponse = response.json().await?;
        if body.revised_description.trim().is_empty() {
            return Err(AiError::invalid_response("empty revised description"));
        }

        info!("Prompt mutation succeeded");
        Ok(MutatedPrompt {
            revised_description: body.revised_description,
            change_summary: body.change_summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> PromptMutationRequest {
        PromptMutationRequest {
            original_description: "product on a table".to_string(),
            instruction: "make it brighter".to_string(),
            style_context: "minimal, airy".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mutate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/mutations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "revised_description": "product on a table, bright daylight",
                "change_summary": "Brightened the lighting"
            })))
            .mount(&server)
            .await;

        let client = PromptMutationClient::new(server.uri(), "key");
        let mutated = client.mutate(&request()).await.unwrap();
        assert_eq!(mutated.change_summary, "Brightened the lighting");
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = PromptMutationClient::new(server.uri(), "key");
        let err = client.mutate(&request()).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_client_error_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(serde_json::json!({"detail": "instruction rejected"})),
            )
            .mount(&server)
            .await;

        let client = PromptMutationClient::new(server.uri(), "key");
        let err = client.mutate(&request()).await.unwrap_err();
        assert!(!err.is_transient());
        assert!(matches!(err, AiError::Api { status: 422, .. }));
    }

    #[tokio::test]
    async fn test_empty_revision_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "revised_description": "  ",
                "change_summary": "nothing"
            })))
            .mount(&server)
            .await;

        let client = PromptMutationClient::new(server.uri(), "key");
        let err = client.mutate(&request()).await.unwrap_err();
        assert!(matches!(err, AiError::InvalidResponse(_)));
    }
}
