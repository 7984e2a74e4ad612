//! `reqwest`-backed [`HttpFetch`].

use std::io::Read;

use reqwest::blocking::Client;

use super::HttpFetch;
use crate::error::RsprovisionError;

/// Blocking HTTP client for artifact downloads and reachability probes.
///
/// Requests are never timed out; a stalled transfer blocks the caller.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, RsprovisionError> {
        let client = Client::builder()
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|e| RsprovisionError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl HttpFetch for ReqwestFetcher {
    fn open(&self, url: &str) -> Result<Box<dyn Read>, RsprovisionError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| RsprovisionError::fetch(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RsprovisionError::fetch(url, format!("HTTP status {}", status)));
        }
        Ok(Box::new(response))
    }

    fn exists(&self, url: &str) -> Result<bool, RsprovisionError> {
        match self.client.head(url).send() {
            Ok(response) => {
                let status = response.status();
                tracing::debug!(url, %status, "HEAD probe");
                Ok(status.is_success() || status.is_redirection())
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "HEAD probe failed");
                Ok(false)
            }
        }
    }
}
