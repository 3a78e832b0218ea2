//! HTTP client for the MAST REST API

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use reqwest::{Client, Method, RequestBuilder, Response, multipart};
use serde_json::Value;

use super::operation::{Operation, Resource};

pub const DEFAULT_API_URL: &str = "https://mast-dev.epfl.ch/api";
const API_KEY_HEADER: &str = "X-Api-Key";
const FILES_FIELD: &str = "files";

/// Thin wrapper around `reqwest::Client` bound to one API base URL
///
/// Reads are anonymous. Every mutation carries the `X-Api-Key` header and is
/// refused before any network traffic when no key is configured.
#[derive(Debug, Clone)]
pub struct MastClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl MastClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            anyhow!("No API key configured. Pass --key, set MAST_API_KEY or run `mast config --set-key`")
        })
    }

    fn request(&self, method: Method, path: &str, authenticated: bool) -> Result<RequestBuilder> {
        let mut request = self.http.request(method, self.url(path));
        if authenticated {
            request = request.header(API_KEY_HEADER, self.api_key()?);
        } else if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        Ok(request)
    }

    /// GET a path, with an optional `filter` query object
    pub async fn get(&self, path: &str, filter: Option<&Value>) -> Result<Value> {
        let mut request = self.request(Method::GET, path, false)?;
        if let Some(filter) = filter {
            request = request.query(&[("filter", filter.to_string())]);
        }

        log::debug!("GET {} filter={:?}", path, filter.map(|f| f.to_string()));
        let response = request
            .send()
            .await
            .with_context(|| format!("Request failed: GET {}", self.url(path)))?;
        read_response(response, &Method::GET, path).await
    }

    /// List the records of a collection
    pub async fn list(&self, resource: Resource, filter: Option<&Value>) -> Result<Vec<Value>> {
        let body = self.get(resource.path(), filter).await?;
        into_records(body).with_context(|| format!("Unexpected response listing {}", resource))
    }

    /// Fetch one record by server id
    pub async fn fetch(&self, resource: Resource, id: i64) -> Result<Value> {
        self.get(&resource.item_path(id), None).await
    }

    /// Execute a mutation and return the response body
    pub async fn execute(&self, operation: &Operation) -> Result<Value> {
        let method = operation.http_method();
        let path = operation.path();

        let mut request = self.request(method.clone(), &path, true)?;
        if let Some(body) = operation.body() {
            request = request.json(body);
        }

        log::debug!(
            "{} {} ({} {})",
            method,
            path,
            operation.operation_type(),
            operation.resource().singular()
        );
        let response = request
            .send()
            .await
            .with_context(|| format!("Request failed: {} {}", method, self.url(&path)))?;
        read_response(response, &method, &path).await
    }

    /// POST files as a multipart form, one `files` part per file
    pub async fn upload_files(&self, path: &str, files: &[PathBuf]) -> Result<Value> {
        let mut form = multipart::Form::new();
        for file in files {
            form = form.part(FILES_FIELD, file_part(file).await?);
        }

        let request = self.request(Method::POST, path, true)?.multipart(form);

        log::debug!("POST {} ({} files)", path, files.len());
        let response = request
            .send()
            .await
            .with_context(|| format!("Upload failed: POST {}", self.url(path)))?;
        read_response(response, &Method::POST, path).await
    }

    /// DELETE an arbitrary path (e.g. the file repository of an experiment)
    pub async fn delete_path(&self, path: &str) -> Result<Value> {
        let request = self.request(Method::DELETE, path, true)?;

        log::debug!("DELETE {}", path);
        let response = request
            .send()
            .await
            .with_context(|| format!("Request failed: DELETE {}", self.url(path)))?;
        read_response(response, &Method::DELETE, path).await
    }
}

async fn file_part(path: &Path) -> Result<multipart::Part> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    Ok(multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("application/octet-stream")?)
}

async fn read_response(response: Response, method: &Method, path: &str) -> Result<Value> {
    let status = response.status();
    let text = response
        .text()
        .await
        .with_context(|| format!("Failed to read response of {} {}", method, path))?;

    if !status.is_success() {
        bail!("{} {} failed with {}: {}", method, path, status, error_detail(&text));
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON returned by {} {}", method, path))
}

/// Human-readable error from a failed response body
///
/// The API reports errors as `{"detail": ...}`; anything else is shown as is.
pub fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            Some(detail) => detail.to_string(),
            None => body.trim().to_string(),
        },
        _ => body.trim().to_string(),
    }
}

/// Accept either a bare array or a `{"data": [...]}` envelope
pub fn into_records(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => bail!("expected a list of records"),
        },
        Value::Null => Ok(Vec::new()),
        _ => bail!("expected a list of records"),
    }
}

/// Server id of a created or fetched record
pub fn record_id(record: &Value) -> Result<i64> {
    match record.get("id") {
        Some(Value::Number(n)) => n.as_i64().context("Record id is not an integer"),
        Some(Value::String(s)) => s
            .parse()
            .with_context(|| format!("Record id '{}' is not an integer", s)),
        _ => bail!("Response has no record id: {}", record),
    }
}
