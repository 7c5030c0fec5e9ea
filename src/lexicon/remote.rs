use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{
    Deserialize,
    Serialize,
};

use super::{
    record::Field,
    Category,
};
use crate::{
    core::{
        Result,
        ZhquizError,
    },
    settings::CacheConfig,
};

/// What the cache asks the remote side for. `exclude` lists keys already held
/// locally so a remote that supports narrowing can skip them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchRequest {
    pub category: Category,
    pub entries: Vec<String>,
    pub exclude: Vec<String>,
    pub select: Vec<Field>,
}

/// Anything that can hand back raw records for a set of entry keys.
/// Records come back untyped; the cache decodes and validates each one.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<serde_json::Value>>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T> {
        if let Some(error) = self.error {
            return Err(ZhquizError::Remote(error));
        }
        self.result.ok_or_else(|| ZhquizError::Remote("response had no result".to_string()))
    }
}

/// Dictionary lookup service reached over HTTP with a JSON body.
#[derive(Debug, Clone)]
pub struct HttpRemoteSource {
    client: Client,
    url: String,
}

impl HttpRemoteSource {
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.remote_timeout_secs))
            .build()
            .map_err(|e| ZhquizError::Custom(format!("HTTP client build failed: {e}")))?;
        Ok(Self { client, url: config.remote_url.clone() })
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<serde_json::Value>> {
        let response = self.client.post(&self.url).json(request).send().await?;
        if !response.status().is_success() {
            return Err(ZhquizError::Remote(format!(
                "HTTP error {} from {}",
                response.status(),
                response.url()
            )));
        }

        let body: ApiResponse<Vec<serde_json::Value>> = response.json().await?;
        body.into_result()
    }
}
