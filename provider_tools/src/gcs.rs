use std::sync::Arc;

use admission_engine::traits::{DocumentStorage, StorageError};
use log::*;
use reqwest::{Client, Url};

use crate::{config::StorageConfig, ProviderApiError};

/// Stores admission documents in a Cloud Storage bucket through the JSON API.
#[derive(Clone)]
pub struct GcsStorage {
    config: Arc<StorageConfig>,
    client: Arc<Client>,
}

impl GcsStorage {
    pub fn new(config: StorageConfig) -> Result<Self, ProviderApiError> {
        if config.bucket.is_empty() {
            return Err(ProviderApiError::Initialization("No storage bucket configured".into()));
        }
        let client = Client::builder().build().map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config: Arc::new(config), client: Arc::new(client) })
    }

    /// The full object name in the bucket, including the configured path prefix.
    pub fn object_path(&self, name: &str) -> String {
        format!("{}{name}", self.config.path)
    }

    pub fn upload_url(&self, name: &str) -> Result<Url, ProviderApiError> {
        let base = self.config.base_url.trim_end_matches('/');
        let bucket = &self.config.bucket;
        let path = self.object_path(name);
        Url::parse_with_params(&format!("{base}/upload/storage/v1/b/{bucket}/o"), &[
            ("uploadType", "media"),
            ("name", path.as_str()),
        ])
        .map_err(|e| ProviderApiError::RestRequestError(e.to_string()))
    }

    pub fn object_url(&self, name: &str) -> Result<Url, ProviderApiError> {
        let mut url = Url::parse(self.config.base_url.trim_end_matches('/'))
            .map_err(|e| ProviderApiError::RestRequestError(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ProviderApiError::RestRequestError(format!("{} cannot be a base URL", self.config.base_url)))?
            .pop_if_empty()
            .extend(["storage", "v1", "b", self.config.bucket.as_str(), "o", self.object_path(name).as_str()]);
        Ok(url)
    }

    async fn put_object(&self, name: &str, content: Vec<u8>) -> Result<(), ProviderApiError> {
        let response = self
            .client
            .post(self.upload_url(name)?)
            .bearer_auth(self.config.token.reveal())
            .header("Content-Type", "application/octet-stream")
            .body(content)
            .send()
            .await
            .map_err(|e| ProviderApiError::RestRequestError(e.to_string()))?;
        check_status(response).await
    }

    async fn delete_object(&self, name: &str) -> Result<(), ProviderApiError> {
        let response = self
            .client
            .delete(self.object_url(name)?)
            .bearer_auth(self.config.token.reveal())
            .send()
            .await
            .map_err(|e| ProviderApiError::RestRequestError(e.to_string()))?;
        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<(), ProviderApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let message = response.text().await.map_err(|e| ProviderApiError::RestResponseError(e.to_string()))?;
    Err(ProviderApiError::QueryError { status: status.as_u16(), message })
}

impl DocumentStorage for GcsStorage {
    async fn upload(&self, name: &str, content: Vec<u8>) -> Result<(), StorageError> {
        let size = content.len();
        self.put_object(name, content).await.map_err(|e| StorageError::UploadFailed {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        debug!("🗂️ Uploaded {name} ({size} bytes) to {}", self.config.bucket);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        self.delete_object(name).await.map_err(|e| StorageError::DeleteFailed {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        debug!("🗂️ Deleted {name} from {}", self.config.bucket);
        Ok(())
    }
}
