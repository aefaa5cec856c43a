//! HTTP client for a twin's `/admin` control plane.

use std::time::Duration;

use serde_json::Value;

use crate::error::{Result, WonderTwinError};

const ADMIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Client bound to one twin's admin port.
#[derive(Debug, Clone)]
pub struct AdminClient {
    base: String,
    client: reqwest::Client,
}

impl AdminClient {
    /// Client for a twin serving its admin plane on `port`.
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            base: format!("http://127.0.0.1:{port}/admin"),
            client: reqwest::Client::builder()
                .timeout(ADMIN_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// `GET /admin/health`, true on 200.
    pub async fn health(&self) -> bool {
        match self.client.get(format!("{}/health", self.base)).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// `POST /admin/reset`.
    ///
    /// # Errors
    ///
    /// Transport failure or non-2xx status.
    pub async fn reset(&self) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/reset", self.base))
            .send()
            .await?;
        ensure_success("reset", &response)?;
        Ok(())
    }

    /// `POST /admin/state` with raw body bytes.
    ///
    /// # Errors
    ///
    /// Transport failure or non-2xx status.
    pub async fn seed(&self, body: Vec<u8>) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/state", self.base))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await?;
        ensure_success("seed", &response)?;
        Ok(())
    }

    /// `GET /admin/<resource>`, returning the raw body text.
    ///
    /// # Errors
    ///
    /// Transport failure or non-2xx status.
    pub async fn get(&self, resource: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/{resource}", self.base))
            .send()
            .await?;
        ensure_success(resource, &response)?;
        Ok(response.text().await?)
    }

    /// `POST /admin/<resource>` with a JSON body, returning the body text.
    ///
    /// # Errors
    ///
    /// Transport failure or non-2xx status.
    pub async fn post(&self, resource: &str, body: &Value) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/{resource}", self.base))
            .json(body)
            .send()
            .await?;
        ensure_success(resource, &response)?;
        Ok(response.text().await?)
    }
}

fn ensure_success(what: &str, response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(WonderTwinError::Failed(format!(
            "admin {what} returned {status}"
        )))
    }
}
