use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::web::models::ErrorResponse;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("No prompt provided")]
    InvalidInput,

    /// The tool exited non-zero. Its stdout is never inspected.
    #[error("Image generation failed")]
    GenerationFailed { code: Option<i32>, stderr: String },

    #[error("No image URL in response")]
    MissingResult,

    #[error("Image generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("{0:#}")]
    Unexpected(#[from] anyhow::Error),
}

impl ResponseError for GenerateError {
    fn status_code(&self) -> StatusCode {
        match self {
            GenerateError::InvalidInput => StatusCode::BAD_REQUEST,
            GenerateError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GenerateError::GenerationFailed { .. }
            | GenerateError::MissingResult
            | GenerateError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use serde_json::json;

    async fn body_of(err: GenerateError) -> (StatusCode, serde_json::Value) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn invalid_input_is_a_client_error() {
        let (status, body) = body_of(GenerateError::InvalidInput).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No prompt provided" }));
    }

    #[actix_web::test]
    async fn tool_failures_are_server_errors() {
        let failed = GenerateError::GenerationFailed {
            code: Some(3),
            stderr: "boom".into(),
        };
        let (status, body) = body_of(failed).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Image generation failed");

        let (status, body) = body_of(GenerateError::MissingResult).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "No image URL in response");
    }

    #[actix_web::test]
    async fn unexpected_carries_the_cause() {
        let err = GenerateError::from(anyhow::anyhow!("disk full"));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "disk full");
    }

    #[actix_web::test]
    async fn unexpected_keeps_the_whole_chain() {
        let cause = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err = GenerateError::from(anyhow::Error::new(cause).context("Failed to start image tool"));
        let (_, body) = body_of(err).await;
        assert_eq!(body["error"], "Failed to start image tool: permission denied");
    }

    #[actix_web::test]
    async fn timeout_maps_to_gateway_timeout() {
        let (status, body) = body_of(GenerateError::Timeout(Duration::from_secs(30))).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"], "Image generation timed out after 30s");
    }
}
