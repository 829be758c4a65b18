//! # Remote API Client
//!
//! Contract between the lifecycle handlers and whatever talks to the Proxmox VE
//! API. The crate never speaks HTTP itself: embedders implement [`RemoteApi`]
//! (or use the in-memory backend in [`memory`]) and hand clients over through a
//! [`ClientSet`].
//!
//! Requests are flat field maps plus an optional delete list and rename
//! instruction. Responses are flat JSON objects; the field reconciler decodes
//! them.

mod clients;
pub mod memory;

pub use clients::{Capability, ClientFactory, ClientSet};

use crate::error::ApiError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Addressable collection of remote objects
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Version,
    Storage,
    AcmeAccounts,
    AcmePlugins,
    FirewallAliases,
    FirewallGroups,
    FirewallIpSets,
    /// Entries (CIDRs) of one ipset
    FirewallIpSet { name: String },
    FirewallRefs,
    Pools,
}

impl Collection {
    /// API path of the collection
    pub fn path(&self) -> String {
        match self {
            Self::Version => "/version".to_string(),
            Self::Storage => "/storage".to_string(),
            Self::AcmeAccounts => "/cluster/acme/account".to_string(),
            Self::AcmePlugins => "/cluster/acme/plugins".to_string(),
            Self::FirewallAliases => "/cluster/firewall/aliases".to_string(),
            Self::FirewallGroups => "/cluster/firewall/groups".to_string(),
            Self::FirewallIpSets => "/cluster/firewall/ipset".to_string(),
            Self::FirewallIpSet { name } => format!("/cluster/firewall/ipset/{name}"),
            Self::FirewallRefs => "/cluster/firewall/refs".to_string(),
            Self::Pools => "/pools".to_string(),
        }
    }

    /// API path of one object in the collection
    pub fn item_path(&self, id: &str) -> String {
        format!("{}/{id}", self.path())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// One value of a write request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    Integer(i64),
    /// Repeated value, sent natively rather than joined
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Create or update request for one remote object
#[derive(Clone, Default, PartialEq, Serialize)]
pub struct WriteRequest {
    pub fields: BTreeMap<String, FieldValue>,
    /// Fields to clear on the remote (update only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub delete: Vec<String>,
    /// New identifier; the request itself is addressed by the old one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    /// Field names whose values must not show up in logs
    #[serde(skip)]
    pub sensitive: BTreeSet<String>,
}

impl WriteRequest {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    pub fn deletes(&self, field: &str) -> bool {
        self.delete.iter().any(|name| name == field)
    }
}

impl fmt::Debug for WriteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: BTreeMap<&str, String> = self
            .fields
            .iter()
            .map(|(name, value)| {
                let shown = if self.sensitive.contains(name) {
                    "<redacted>".to_string()
                } else {
                    format!("{value:?}")
                };
                (name.as_str(), shown)
            })
            .collect();
        f.debug_struct("WriteRequest")
            .field("fields", &fields)
            .field("delete", &self.delete)
            .field("rename", &self.rename)
            .finish_non_exhaustive()
    }
}

/// Flat object returned by a read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteObject(Map<String, Value>);

impl RemoteObject {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a JSON value; anything but an object is a response error
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(ApiError::Response(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|value| !value.is_null())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for RemoteObject {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Authenticated access to the Proxmox VE API
///
/// Implementations translate calls onto the HTTP API (`POST` to the collection
/// path for create, `GET`/`PUT`/`DELETE` on the item path). Errors keep the
/// remote message verbatim; handlers match not-found patterns against it.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Create an object; returns the task id when the remote runs the
    /// creation as a background task
    async fn create(
        &self,
        collection: &Collection,
        request: &WriteRequest,
    ) -> Result<Option<String>, ApiError>;

    async fn read(&self, collection: &Collection, id: &str) -> Result<RemoteObject, ApiError>;

    /// Read a singleton endpoint such as `/version`
    async fn get(&self, collection: &Collection) -> Result<RemoteObject, ApiError>;

    async fn update(
        &self,
        collection: &Collection,
        id: &str,
        request: &WriteRequest,
    ) -> Result<(), ApiError>;

    async fn delete(&self, collection: &Collection, id: &str) -> Result<(), ApiError>;

    async fn list(&self, collection: &Collection) -> Result<Vec<RemoteObject>, ApiError>;
}
