//! Remote rainfall snapshot sources.

use std::future::Future;

use tracing::debug;

use super::config::RainfallConfig;
use super::error::RainfallError;

/// Anything that can produce the raw text of a rainfall snapshot by key.
///
/// This abstraction allows the provider to be tested with mock data.
pub trait RainfallSource: Send + Sync {
    /// Retrieve the raw body for a `YYYYMMDDHHMM` key.
    fn fetch_raw(&self, key: &str) -> impl Future<Output = Result<String, RainfallError>> + Send;
}

/// Fetches snapshots over HTTP from `<prefix><key>.txt`.
#[derive(Debug, Clone)]
pub struct HttpRainfallSource {
    http: reqwest::Client,
    source_prefix: String,
}

impl HttpRainfallSource {
    /// Create a source with the prefix and timeout from `config`.
    pub fn new(config: &RainfallConfig) -> Result<Self, RainfallError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            source_prefix: config.source_prefix.clone(),
        })
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}{}.txt", self.source_prefix, key)
    }
}

impl RainfallSource for HttpRainfallSource {
    async fn fetch_raw(&self, key: &str) -> Result<String, RainfallError> {
        let url = self.url_for(key);
        debug!(%url, "fetching rainfall snapshot");

        let response = self.http.get(&url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RainfallError::Status {
                status: status.as_u16(),
                url,
            });
        }

        response.text().await.map_err(classify)
    }
}

fn classify(err: reqwest::Error) -> RainfallError {
    if err.is_timeout() {
        RainfallError::Timeout
    } else {
        RainfallError::Http(err)
    }
}
