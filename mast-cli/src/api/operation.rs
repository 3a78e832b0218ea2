//! Core Operation types for MAST record mutations

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record collections exposed by the MAST API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    References,
    Experiments,
    RunResults,
    Files,
}

impl Resource {
    /// Collection path relative to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            Self::References => "/references",
            Self::Experiments => "/experiments",
            Self::RunResults => "/run_results",
            Self::Files => "/files",
        }
    }

    /// Path of a single record
    pub fn item_path(&self, id: i64) -> String {
        format!("{}/{}", self.path(), id)
    }

    /// Singular name used in log lines
    pub fn singular(&self) -> &'static str {
        match self {
            Self::References => "reference",
            Self::Experiments => "experiment",
            Self::RunResults => "run result",
            Self::Files => "file",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path().trim_start_matches('/'))
    }
}

/// A single mutating request against the MAST API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operation {
    /// Create a new record
    Create {
        resource: Resource,
        /// Record data as JSON
        data: Value,
    },
    /// Replace an existing record
    Update {
        resource: Resource,
        /// Server id
        id: i64,
        /// Record data as JSON
        data: Value,
    },
    /// Delete a record
    Delete { resource: Resource, id: i64 },
}

impl Operation {
    /// Create a new Create operation
    pub fn create(resource: Resource, data: Value) -> Self {
        Self::Create { resource, data }
    }

    /// Create a new Update operation
    pub fn update(resource: Resource, id: i64, data: Value) -> Self {
        Self::Update { resource, id, data }
    }

    /// Create a new Delete operation
    pub fn delete(resource: Resource, id: i64) -> Self {
        Self::Delete { resource, id }
    }

    /// Get the resource this operation targets
    pub fn resource(&self) -> Resource {
        match self {
            Self::Create { resource, .. } => *resource,
            Self::Update { resource, .. } => *resource,
            Self::Delete { resource, .. } => *resource,
        }
    }

    /// Get the request path for this operation
    pub fn path(&self) -> String {
        match self {
            Self::Create { resource, .. } => resource.path().to_string(),
            Self::Update { resource, id, .. } => resource.item_path(*id),
            Self::Delete { resource, id } => resource.item_path(*id),
        }
    }

    /// Get the HTTP method for this operation
    pub fn http_method(&self) -> reqwest::Method {
        match self {
            Self::Create { .. } => reqwest::Method::POST,
            Self::Update { .. } => reqwest::Method::PUT,
            Self::Delete { .. } => reqwest::Method::DELETE,
        }
    }

    /// Get the request body, if any
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Create { data, .. } | Self::Update { data, .. } => Some(data),
            Self::Delete { .. } => None,
        }
    }

    /// Get the operation type as a string
    pub fn operation_type(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}
