//! HTTP client for the query endpoint.

use reqwest::StatusCode;
use std::time::Duration;

use crate::models::EmailRecord;

/// Environment variable the dashboard binary reads its base URL from.
pub const API_URL_VAR: &str = "INBOX_API_URL";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
}

/// Fetches records from a running API server.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    http: reqwest::Client,
    base_url: String,
}

impl DashboardClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|source| ClientError::Http {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self { http, base_url })
    }

    pub fn emails_url(&self) -> String {
        format!("{}/api/emails", self.base_url)
    }

    /// One GET of the recent-records endpoint.
    pub async fn fetch_emails(&self) -> Result<Vec<EmailRecord>, ClientError> {
        let url = self.emails_url();
        let http_error = |source| ClientError::Http {
            url: url.clone(),
            source,
        };

        let response = self.http.get(&url).send().await.map_err(http_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                url: url.clone(),
                status,
                body,
            });
        }

        response.json::<Vec<EmailRecord>>().await.map_err(http_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_base_url() {
        let client = DashboardClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.emails_url(), "http://localhost:8000/api/emails");
    }

    #[tokio::test]
    async fn unreachable_server_is_an_http_error() {
        let client = DashboardClient::new("http://127.0.0.1:1").unwrap();
        let err = client.fetch_emails().await.unwrap_err();
        assert!(matches!(err, ClientError::Http { .. }));
    }
}
