//! Person client implementation
//! Makes the actual HTTP requests to a person server's `/persons` routes

use async_trait::async_trait;
use reqwest::{header::ACCEPT, header::HeaderValue, Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use url::Url;

use super::PersonLookup;
use crate::config::ClientSettings;
use crate::models::Person;
use crate::{PocError, Result};

/// Endpoint the slow call goes to
pub const SLOW_ACTION: &str = "servicesync";

/// HTTP client for a person server
#[derive(Debug, Clone)]
pub struct PersonClient {
    client: Client,
    base_url: Url,
}

impl PersonClient {
    /// Create a client for `base_url` with no request timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Create a client from the `[client]` settings
    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: parse_base_url(&settings.base_url)?,
        })
    }

    /// Same connection pool, different server
    pub fn with_base_url(&self, base_url: &str) -> Result<Self> {
        Ok(Self {
            client: self.client.clone(),
            base_url: parse_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /persons/{id}/servicesync`
    pub async fn retrieve_slow_endpoint(&self, id: i64) -> Result<Person> {
        self.retrieve_via_action(id, SLOW_ACTION).await
    }

    /// `GET /persons/{id}/{action}`
    pub async fn retrieve_via_action(&self, id: i64, action: &str) -> Result<Person> {
        self.get_json(&format!("/persons/{}/{}", id, action)).await
    }

    /// `GET /persons{endpoint}`, body returned as untyped JSON
    ///
    /// `endpoint` starts with `/`, e.g. `/3/service`.
    pub async fn retrieve_via_endpoint(&self, endpoint: &str) -> Result<serde_json::Value> {
        self.get_json(&format!("/persons{}", endpoint)).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url_for(path)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| {
                error!("GET {} failed: {}", url, e);
                PocError::from(e)
            })?;

        let response = check_status(response).await?;
        let body = response.bytes().await?;
        let value = serde_json::from_slice(&body)?;
        debug!("GET {} done", url);
        Ok(value)
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        // Join onto the base path rather than replacing it
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{}{}", base, path))
            .map_err(|e| PocError::InvalidInput(format!("Bad request path {:?}: {}", path, e)))
    }
}

#[async_trait]
impl PersonLookup for PersonClient {
    async fn fetch(&self, id: i64) -> Result<Person> {
        self.retrieve_slow_endpoint(id).await
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url)
        .map_err(|e| PocError::Config(format!("Invalid base URL {:?}: {}", base_url, e)))?;
    if url.cannot_be_a_base() {
        return Err(PocError::Config(format!("{:?} cannot be a base URL", base_url)));
    }
    Ok(url)
}

/// Turn a non-2xx response into [`PocError::Upstream`]
///
/// The message is the upstream error's `error.message` when the body is one of
/// our JSON errors, otherwise the raw body text.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!("Could not read {} error body: {}", status, e);
            String::new()
        }
    };
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);

    error!("Upstream returned {}: {}", status, message);
    Err(PocError::Upstream {
        status: status.as_u16(),
        message,
    })
}
