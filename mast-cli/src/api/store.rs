//! Record store abstraction used by the upload pipeline

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use super::client::MastClient;
use super::operation::{Operation, Resource};

/// The subset of the API the upload pipeline needs
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List records of a collection matching an optional filter object
    async fn list(&self, resource: Resource, filter: Option<&Value>) -> Result<Vec<Value>>;

    /// Execute a create, update or delete and return the response body
    async fn execute(&self, operation: &Operation) -> Result<Value>;

    /// Upload files as a multipart form to `path`
    async fn upload_files(&self, path: &str, files: &[PathBuf]) -> Result<Value>;
}

#[async_trait]
impl RecordStore for MastClient {
    async fn list(&self, resource: Resource, filter: Option<&Value>) -> Result<Vec<Value>> {
        MastClient::list(self, resource, filter).await
    }

    async fn execute(&self, operation: &Operation) -> Result<Value> {
        MastClient::execute(self, operation).await
    }

    async fn upload_files(&self, path: &str, files: &[PathBuf]) -> Result<Value> {
        MastClient::upload_files(self, path, files).await
    }
}
