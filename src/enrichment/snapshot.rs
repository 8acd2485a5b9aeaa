use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use crate::config::DeviceConfig;

use super::{SnapshotImage, SnapshotSource};

/// Device endpoint returning a JPEG of the main stream.
pub const SNAPSHOT_PATH: &str = "/ISAPI/Streaming/channels/101/picture";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Failed to reach {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to get image from {url}: {status}")]
    Status { url: String, status: StatusCode },
}

/// Takes snapshots over the device's HTTP API with Basic authentication.
///
/// Each call is a single attempt bounded by the configured timeout.
pub struct HttpSnapshotFetcher {
    client: Client,
    device: DeviceConfig,
}

impl HttpSnapshotFetcher {
    pub fn new(device: DeviceConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(device.timeout))
            .timeout(device.timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client, device })
    }

    pub fn snapshot_url(&self, device_ip: Option<&str>) -> String {
        let host = device_ip.unwrap_or(&self.device.default_ip);
        format!("http://{host}{SNAPSHOT_PATH}")
    }
}

#[async_trait::async_trait]
impl SnapshotSource for HttpSnapshotFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, device_ip: Option<&str>) -> Result<SnapshotImage, FetchError> {
        let url = self.snapshot_url(device_ip);
        debug!(%url, "Requesting snapshot");

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.device.username, Some(&self.device.password))
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport { url, source })?;
        Ok(SnapshotImage::new(bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::testing::{FAKE_JPEG, spawn_fake_device, unreachable_device};

    fn device_config(password: &str, default_ip: &str) -> DeviceConfig {
        DeviceConfig {
            username: "admin".to_string(),
            password: password.to_string(),
            default_ip: default_ip.to_string(),
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_snapshot_url() {
        let fetcher = HttpSnapshotFetcher::new(device_config("secret", "192.168.3.68")).unwrap();
        assert_eq!(
            fetcher.snapshot_url(Some("10.0.0.5")),
            "http://10.0.0.5/ISAPI/Streaming/channels/101/picture"
        );
        assert_eq!(
            fetcher.snapshot_url(None),
            "http://192.168.3.68/ISAPI/Streaming/channels/101/picture"
        );
    }

    #[tokio::test]
    async fn test_fetch_with_credentials() {
        let device = spawn_fake_device().await;
        let fetcher = HttpSnapshotFetcher::new(device_config("secret", "192.0.2.1")).unwrap();

        let image = fetcher.fetch(Some(device.as_str())).await.unwrap();
        assert_eq!(image.as_bytes(), FAKE_JPEG);
    }

    #[tokio::test]
    async fn test_fetch_uses_default_device() {
        let device = spawn_fake_device().await;
        let fetcher = HttpSnapshotFetcher::new(device_config("secret", &device)).unwrap();

        let image = fetcher.fetch(None).await.unwrap();
        assert_eq!(image.as_bytes(), FAKE_JPEG);
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let device = spawn_fake_device().await;
        let fetcher = HttpSnapshotFetcher::new(device_config("wrong", "192.0.2.1")).unwrap();

        let error = fetcher.fetch(Some(device.as_str())).await.unwrap_err();
        assert!(
            matches!(error, FetchError::Status { status, .. } if status == StatusCode::UNAUTHORIZED)
        );
    }

    #[tokio::test]
    async fn test_unreachable_device() {
        let device = unreachable_device().await;
        let fetcher = HttpSnapshotFetcher::new(device_config("secret", "192.0.2.1")).unwrap();

        let error = fetcher.fetch(Some(device.as_str())).await.unwrap_err();
        assert!(matches!(error, FetchError::Transport { .. }));
    }
}
