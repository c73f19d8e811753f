use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncReadExt;

use crate::error::FareError;
use crate::query::SearchParams;

/// Boundary to the flight-offer provider. Implementations hand back the raw
/// response body; the engine never retries a failed fetch.
#[async_trait]
pub trait OfferSource: Send + Sync {
    async fn fetch(&self, params: &SearchParams) -> Result<Value, FareError>;
}

/// A raw payload already held in memory.
#[derive(Debug, Clone)]
pub struct StaticSource {
    body: Value,
}

impl StaticSource {
    pub fn new(body: Value) -> Self {
        Self { body }
    }
}

#[async_trait]
impl OfferSource for StaticSource {
    async fn fetch(&self, _params: &SearchParams) -> Result<Value, FareError> {
        Ok(self.body.clone())
    }
}

/// Reads one payload file per fetch. A path of `-` reads stdin.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Reads a raw JSON payload from `path`, or from stdin when `path` is `-`.
pub async fn read_payload(path: &std::path::Path) -> Result<Value, FareError> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FareError::Source(format!("{}: {e}", path.display())))?
    };
    Ok(serde_json::from_str(&text)?)
}

#[async_trait]
impl OfferSource for FileSource {
    async fn fetch(&self, _params: &SearchParams) -> Result<Value, FareError> {
        read_payload(&self.path).await
    }
}

/// Resolves `<dir>/<FROM>-<TO>.json` for each search.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn payload_path(&self, params: &SearchParams) -> PathBuf {
        self.dir.join(format!("{}-{}.json", params.from, params.to))
    }
}

#[async_trait]
impl OfferSource for DirectorySource {
    async fn fetch(&self, params: &SearchParams) -> Result<Value, FareError> {
        read_payload(&self.payload_path(params)).await
    }
}
