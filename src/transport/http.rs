//! reqwest-backed transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

use crate::common::config::TargetConfig;
use crate::common::{Error, Result};

use super::{Body, RawResponse, RequestEnvelope, SendOptions, Transport};

/// HTTP client for the service under test
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
    fail_on_status: bool,
}

impl HttpTransport {
    /// Create a client with the configured headers and default timeout
    pub fn new(target: &TargetConfig, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &target.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("Invalid header name '{}': {}", name, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("Invalid value for header '{}': {}", name, e)))?;
            headers.insert(header_name, header_value);
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("gqlcheck/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            timeout,
            fail_on_status: target.fail_on_status,
        })
    }

    async fn post(&self, url: reqwest::Url, operation: &str) -> RawResponse {
        let response = match self
            .client
            .post(url)
            .json(&RequestEnvelope { query: operation })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Request failed before a response arrived: {}", e);
                return RawResponse::unreachable(e.to_string());
            }
        };

        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(bytes) => RawResponse::new(status, Body::from_bytes(&bytes)),
            Err(e) => {
                warn!("Failed to read response body (status {}): {}", status, e);
                RawResponse::new(status, Body::Empty)
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        endpoint: &str,
        operation: &str,
        options: &SendOptions,
    ) -> Result<RawResponse> {
        let endpoint = options.endpoint.as_deref().unwrap_or(endpoint);
        let url = reqwest::Url::parse(endpoint).map_err(|e| Error::InvalidEndpoint {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let timeout = options.timeout.unwrap_or(self.timeout);

        debug!(endpoint = %url, timeout_secs = timeout.as_secs_f64(), "POST {}", operation);

        let response = match tokio::time::timeout(timeout, self.post(url, operation)).await {
            Ok(response) => response,
            Err(_) => {
                warn!("Request to {} timed out after {:?}", endpoint, timeout);
                return Ok(RawResponse::timed_out());
            }
        };

        debug!(status = response.status, "Response received");

        let fail_on_status = options.fail_on_status.unwrap_or(self.fail_on_status);
        if fail_on_status && response.status != super::NO_STATUS && !response.is_success_status()
        {
            return Err(Error::UnexpectedStatus {
                status: response.status,
                body: response.body.to_text(),
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_rejects_invalid_header() {
        let mut headers = BTreeMap::new();
        headers.insert("Bad Header".to_string(), "x".to_string());
        let target = TargetConfig {
            endpoint: None,
            headers,
            fail_on_status: false,
        };
        let err = HttpTransport::new(&target, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_an_error() {
        let transport =
            HttpTransport::new(&TargetConfig::default(), Duration::from_secs(1)).unwrap();
        let err = transport
            .send("not a url", "query { a }", &SendOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint { .. }));
    }
}
