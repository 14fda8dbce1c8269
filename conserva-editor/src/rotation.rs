//! Image rotation boundary.
//!
//! The editor rotates the artifact photograph visually; baking the rotation
//! into the stored image is delegated to a [`RotationService`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default request timeout for the HTTP rotation client.
pub const DEFAULT_ROTATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when baking a rotation.
#[derive(Debug, Error)]
pub enum RotationError {
    /// The configured base URL is invalid.
    #[error("invalid rotation service URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed (connection, timeout, etc.).
    #[error("rotation request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service answered with an error status.
    #[error("rotation rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },
}

impl RotationError {
    /// Returns true if retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::InvalidUrl(_) => false,
        }
    }
}

/// A request to rotate a stored artifact image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationRequest {
    /// Artifact the image belongs to.
    pub artifact_id: String,
    /// Path of the image in artifact storage.
    pub image_path: String,
    /// Clockwise rotation in degrees.
    pub degrees: f64,
}

/// Service that rotates stored images.
#[async_trait]
pub trait RotationService: Send + Sync {
    /// Rotate the image in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable or refuses the request.
    async fn rotate(&self, request: &RotationRequest) -> Result<(), RotationError>;
}

/// Configuration for [`HttpRotationClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRotationConfig {
    /// Base URL of the rotation service.
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpRotationConfig {
    /// Parse a base URL and use the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::InvalidUrl`] if the URL is malformed.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, RotationError> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| RotationError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            base_url,
            timeout: DEFAULT_ROTATION_TIMEOUT,
        })
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Rotation service reached over HTTP.
///
/// Posts the [`RotationRequest`] as JSON. A base URL without a path is
/// given the default `/images/rotate` endpoint.
#[derive(Debug, Clone)]
pub struct HttpRotationClient {
    http: Client,
    endpoint: Url,
}

impl HttpRotationClient {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::InvalidUrl`] for a base URL that cannot carry
    /// a path, or [`RotationError::Http`] if the HTTP client fails to build.
    pub fn new(config: HttpRotationConfig) -> Result<Self, RotationError> {
        let mut endpoint = config.base_url;
        if endpoint.cannot_be_a_base() {
            return Err(RotationError::InvalidUrl(endpoint.to_string()));
        }
        if endpoint.path().is_empty() || endpoint.path() == "/" {
            endpoint.set_path("/images/rotate");
        }

        let http = Client::builder()
            .user_agent(concat!("conserva-editor/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;

        Ok(Self { http, endpoint })
    }

    /// The URL requests are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RotationService for HttpRotationClient {
    async fn rotate(&self, request: &RotationRequest) -> Result<(), RotationError> {
        tracing::debug!(
            artifact = %request.artifact_id,
            image = %request.image_path,
            degrees = request.degrees,
            "Requesting image rotation"
        );
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("unknown").to_string()
        } else {
            body
        };
        tracing::warn!(status = status.as_u16(), %message, "Image rotation rejected");
        Err(RotationError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> RotationRequest {
        RotationRequest {
            artifact_id: "ART-1".to_string(),
            image_path: "artifacts/ART-1/before.jpg".to_string(),
            degrees: 90.0,
        }
    }

    #[test]
    fn test_default_endpoint_path() {
        let config = HttpRotationConfig::new("http://localhost:8080").expect("config");
        let client = HttpRotationClient::new(config).expect("client");
        assert_eq!(client.endpoint().path(), "/images/rotate");

        let config = HttpRotationConfig::new("http://localhost:8080/api/rotate").expect("config");
        let client = HttpRotationClient::new(config).expect("client");
        assert_eq!(client.endpoint().path(), "/api/rotate");
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            HttpRotationConfig::new("not a url"),
            Err(RotationError::InvalidUrl(_))
        ));
        let config = HttpRotationConfig::new("mailto:someone@example.com").expect("parses");
        assert!(matches!(
            HttpRotationClient::new(config),
            Err(RotationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let value = serde_json::to_value(request()).expect("serialize");
        assert_eq!(value["artifactId"], "ART-1");
        assert_eq!(value["imagePath"], "artifacts/ART-1/before.jpg");
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_rotate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/rotate"))
            .and(body_json(json!({
                "artifactId": "ART-1",
                "imagePath": "artifacts/ART-1/before.jpg",
                "degrees": 90.0
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let config = HttpRotationConfig::new(server.uri()).expect("config");
        let client = HttpRotationClient::new(config).expect("client");
        client.rotate(&request()).await.expect("rotated");
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_rotate_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let config = HttpRotationConfig::new(server.uri()).expect("config");
        let client = HttpRotationClient::new(config).expect("client");
        let err = client.rotate(&request()).await.unwrap_err();
        assert!(matches!(
            &err,
            RotationError::Rejected { status: 503, message } if message == "busy"
        ));
        assert!(err.is_retryable());
    }
}
