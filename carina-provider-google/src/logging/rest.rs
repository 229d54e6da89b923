//! REST client for the Cloud Logging v2 API

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use gcp_auth::TokenProvider;
use log::{debug, error};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;

use super::api::{ApiError, ApiResult, LogExclusion, LoggingApi};

/// Base URL of the Logging v2 REST API
pub const DEFAULT_ENDPOINT: &str = "https://logging.googleapis.com/v2";

/// OAuth scope required for managing exclusions
pub const LOGGING_SCOPES: &[&str] = &["https://www.googleapis.com/auth/logging.admin"];

/// Maximum length of an error body kept in messages and logs
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Source of bearer tokens for API calls
#[derive(Clone)]
pub enum Credentials {
    /// Tokens from a `gcp_auth` provider (ADC or a service account key)
    Provider(Arc<dyn TokenProvider>),
    /// A fixed access token
    Static(String),
}

impl Credentials {
    /// Application Default Credentials
    pub async fn application_default() -> ApiResult<Self> {
        let provider = gcp_auth::provider()
            .await
            .map_err(|e| ApiError::Auth(e.to_string()))?;
        Ok(Self::Provider(provider))
    }

    /// Service account key file
    pub fn from_key_file(path: impl AsRef<Path>) -> ApiResult<Self> {
        let account = gcp_auth::CustomServiceAccount::from_file(path.as_ref())
            .map_err(|e| ApiError::Auth(e.to_string()))?;
        Ok(Self::Provider(Arc::new(account)))
    }

    async fn token(&self) -> ApiResult<String> {
        match self {
            Credentials::Provider(provider) => {
                let token = provider
                    .token(LOGGING_SCOPES)
                    .await
                    .map_err(|e| ApiError::Auth(e.to_string()))?;
                Ok(token.as_str().to_string())
            }
            Credentials::Static(token) => Ok(token.clone()),
        }
    }
}

/// Error envelope returned by Google APIs
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Logging API client over HTTPS
#[derive(Clone)]
pub struct RestLoggingClient {
    http: Client,
    endpoint: String,
    credentials: Credentials,
}

impl RestLoggingClient {
    pub fn new(credentials: Credentials) -> ApiResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("carina-provider-google/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials,
        })
    }

    /// Use a different base URL (e.g. a regional endpoint or a test server)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let url = format!("{}/{}", self.endpoint, path);
        debug!("{} {}", method, url);
        let token = self.credentials.token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    /// Send a request and return the body of a successful response
    async fn execute(&self, request: RequestBuilder, name: &str) -> ApiResult<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(name.to_string()));
        }

        let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => match envelope.error.status {
                Some(code) => format!("{} ({})", envelope.error.message, code),
                None => envelope.error.message,
            },
            Err(_) => truncate(&body),
        };
        error!("Logging API error for {}: {} - {}", name, status, message);

        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn execute_json(&self, request: RequestBuilder, name: &str) -> ApiResult<LogExclusion> {
        let body = self.execute(request, name).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn truncate(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let cut = (0..=MAX_ERROR_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    }
}

#[async_trait]
impl LoggingApi for RestLoggingClient {
    async fn create_exclusion(
        &self,
        parent: &str,
        exclusion: &LogExclusion,
    ) -> ApiResult<LogExclusion> {
        let request = self
            .request(Method::POST, &format!("{}/exclusions", parent))
            .await?
            .json(exclusion);
        self.execute_json(request, parent).await
    }

    async fn get_exclusion(&self, name: &str) -> ApiResult<LogExclusion> {
        let request = self.request(Method::GET, name).await?;
        self.execute_json(request, name).await
    }

    async fn patch_exclusion(
        &self,
        name: &str,
        exclusion: &LogExclusion,
        update_mask: &str,
    ) -> ApiResult<LogExclusion> {
        let request = self
            .request(Method::PATCH, name)
            .await?
            .query(&[("updateMask", update_mask)])
            .json(&exclusion.masked_body(update_mask));
        self.execute_json(request, name).await
    }

    async fn delete_exclusion(&self, name: &str) -> ApiResult<()> {
        let request = self.request(Method::DELETE, name).await?;
        self.execute(request, name).await?;
        Ok(())
    }
}
