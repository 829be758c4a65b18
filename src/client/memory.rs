//! # In-Memory Backend
//!
//! A [`RemoteApi`] that keeps objects in memory and answers the way a Proxmox
//! VE node does: same not-found messages, booleans reported as `0`/`1`, lists
//! reported comma-joined, ACME plugin data reported decoded.
//!
//! Useful for tests and dry runs. Besides the API itself it can:
//!
//! - delay convergence of newly written objects by a number of reads
//! - inject a failure into the next call of a given method
//! - remove or seed objects behind the provider's back
//! - report every call it received
//!
//! Data does not persist; clones share the same store.

use super::{Collection, FieldValue, RemoteApi, RemoteObject, WriteRequest};
use crate::error::ApiError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

const DEFAULT_ACME_DIRECTORY: &str = "https://acme-v02.api.letsencrypt.org/directory";
const DEFAULT_ACME_TOS: &str = "https://letsencrypt.org/documents/LE-SA-v1.4-April-3-2024.pdf";

/// Remote API method, for call records and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Create,
    Read,
    Get,
    Update,
    Delete,
    List,
}

/// One call received by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: Method,
    pub collection: Collection,
    pub id: Option<String>,
    pub request: Option<WriteRequest>,
}

/// How an update treats fields the request leaves out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateMode {
    /// Keep them
    Merge,
    /// Drop them; the request describes the whole entry
    Replace,
}

#[derive(Debug, Default)]
struct Backend {
    objects: HashMap<Collection, BTreeMap<String, Map<String, Value>>>,
    /// Reads left before a written object converges
    pending: HashMap<(Collection, String), u32>,
    delays: HashMap<Collection, u32>,
    failures: HashMap<Method, VecDeque<ApiError>>,
    calls: Vec<Call>,
    version: Map<String, Value>,
    revision: u64,
}

/// In-memory stand-in for a Proxmox VE cluster
#[derive(Debug, Clone)]
pub struct InMemoryPve {
    backend: Arc<RwLock<Backend>>,
}

impl Default for InMemoryPve {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire field holding the identifier of objects in `collection`
fn identifier_field(collection: &Collection) -> &'static str {
    match collection {
        Collection::Storage => "storage",
        Collection::AcmePlugins => "id",
        Collection::FirewallGroups => "group",
        Collection::FirewallIpSet { .. } => "cidr",
        Collection::Pools => "poolid",
        Collection::AcmeAccounts
        | Collection::FirewallAliases
        | Collection::FirewallIpSets
        | Collection::Version
        | Collection::FirewallRefs => "name",
    }
}

/// Field the object reports its identifier under
fn stored_identifier_field(collection: &Collection) -> &'static str {
    match collection {
        Collection::AcmePlugins => "plugin",
        other => identifier_field(other),
    }
}

fn update_mode(collection: &Collection) -> UpdateMode {
    match collection {
        Collection::FirewallAliases
        | Collection::FirewallGroups
        | Collection::FirewallIpSets
        | Collection::FirewallIpSet { .. } => UpdateMode::Replace,
        _ => UpdateMode::Merge,
    }
}

fn not_found(collection: &Collection, id: &str) -> ApiError {
    let message = match collection {
        Collection::Storage => format!("storage '{id}' does not exist"),
        Collection::AcmeAccounts => format!("ACME account config file '{id}' does not exist"),
        Collection::AcmePlugins => format!("ACME plugin '{id}' does not exist"),
        Collection::FirewallAliases => format!("no such alias '{id}'"),
        Collection::FirewallGroups => format!("no such security group '{id}'"),
        Collection::FirewallIpSets => format!("no such IPSet '{id}'"),
        Collection::FirewallIpSet { .. } => "no such IP/Network".to_string(),
        Collection::Pools => format!("pool '{id}' does not exist"),
        Collection::Version | Collection::FirewallRefs => {
            return ApiError::status(501, format!("Method not implemented on {collection}"))
        }
    };
    ApiError::status(500, message)
}

fn wire_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(text) => Value::String(text.clone()),
        FieldValue::Flag(flag) => json!(u8::from(*flag)),
        FieldValue::Integer(number) => json!(number),
        FieldValue::List(items) => Value::String(items.join(",")),
    }
}

fn contact_list(contact: &str) -> Value {
    Value::Array(
        contact
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| Value::String(format!("mailto:{item}")))
            .collect(),
    )
}

impl Backend {
    fn record(
        &mut self,
        method: Method,
        collection: &Collection,
        id: Option<&str>,
        request: Option<&WriteRequest>,
    ) -> Result<(), ApiError> {
        self.calls.push(Call {
            method,
            collection: collection.clone(),
            id: id.map(ToString::to_string),
            request: request.cloned(),
        });
        match self.failures.get_mut(&method).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next_digest(&mut self) -> String {
        self.revision += 1;
        format!("{:016x}", self.revision.wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }

    fn require_parent(&self, collection: &Collection) -> Result<(), ApiError> {
        if let Collection::FirewallIpSet { name } = collection {
            let exists = self
                .objects
                .get(&Collection::FirewallIpSets)
                .is_some_and(|sets| sets.contains_key(name));
            if !exists {
                return Err(ApiError::status(500, format!("no such IPSet '{name}'")));
            }
        }
        Ok(())
    }

    /// Stored form of a request's fields for `collection`
    fn apply_fields(
        &mut self,
        collection: &Collection,
        object: &mut Map<String, Value>,
        request: &WriteRequest,
    ) -> Result<(), ApiError> {
        for (field, value) in &request.fields {
            match (collection, field.as_str()) {
                (Collection::AcmeAccounts, "contact") => {
                    let contact = value.as_text().unwrap_or_default();
                    object.insert("account".to_string(), json!({ "contact": contact_list(contact) }));
                }
                (Collection::AcmeAccounts, "tos_url") => {
                    object.insert("tos".to_string(), wire_value(value));
                }
                (Collection::AcmePlugins, "data") => {
                    let encoded = value.as_text().unwrap_or_default();
                    let decoded = STANDARD.decode(encoded).map_err(|err| {
                        ApiError::status(400, format!("data: invalid base64 value: {err}"))
                    })?;
                    object.insert(
                        "data".to_string(),
                        Value::String(String::from_utf8_lossy(&decoded).into_owned()),
                    );
                }
                (Collection::AcmePlugins, "id") => {
                    object.insert("plugin".to_string(), wire_value(value));
                }
                _ => {
                    object.insert(field.clone(), wire_value(value));
                }
            }
        }
        for field in &request.delete {
            object.remove(field);
        }
        match collection {
            Collection::FirewallAliases
            | Collection::FirewallGroups
            | Collection::FirewallIpSets
            | Collection::FirewallIpSet { .. }
            | Collection::Storage
            | Collection::AcmePlugins => {
                let digest = self.next_digest();
                object.insert("digest".to_string(), Value::String(digest));
            }
            _ => {}
        }
        Ok(())
    }

    fn converge_acme_account(&mut self, object: &mut Map<String, Value>) {
        if !object.contains_key("directory") {
            object.insert("directory".to_string(), json!(DEFAULT_ACME_DIRECTORY));
        }
        if !object.contains_key("tos") {
            object.insert("tos".to_string(), json!(DEFAULT_ACME_TOS));
        }
        if !object.contains_key("location") {
            let directory = object
                .get("directory")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_ACME_DIRECTORY);
            let base = directory.trim_end_matches("/directory");
            self.revision += 1;
            object.insert(
                "location".to_string(),
                Value::String(format!("{base}/acme/acct/{}", self.revision)),
            );
        }
    }

    fn mark_pending(&mut self, collection: &Collection, id: &str) {
        if let Some(&reads) = self.delays.get(collection) {
            if reads > 0 {
                self.pending.insert((collection.clone(), id.to_string()), reads);
            }
        }
    }

    /// Current view of an object, counting the read against its convergence
    fn observe(&mut self, collection: &Collection, id: &str) -> Result<RemoteObject, ApiError> {
        self.require_parent(collection)?;
        let stored = self
            .objects
            .get(collection)
            .and_then(|objects| objects.get(id))
            .cloned()
            .ok_or_else(|| not_found(collection, id))?;

        let key = (collection.clone(), id.to_string());
        if let Some(left) = self.pending.get_mut(&key) {
            *left -= 1;
            if *left == 0 {
                self.pending.remove(&key);
            }
            debug!(%collection, id, "Object has not converged yet");
            return match collection {
                // Registration still running: the account is there but incomplete
                Collection::AcmeAccounts => {
                    let mut partial = stored;
                    partial.remove("location");
                    partial.remove("tos");
                    Ok(RemoteObject::new(partial))
                }
                _ => Err(not_found(collection, id)),
            };
        }

        let mut object = stored;
        if matches!(collection, Collection::Pools) {
            // The item endpoint does not repeat the pool id
            object.remove("poolid");
        }
        Ok(RemoteObject::new(object))
    }

    fn refs(&self) -> Vec<RemoteObject> {
        let entries = |collection: &Collection, ref_type: &str, prefix: &str| {
            self.objects
                .get(collection)
                .into_iter()
                .flat_map(|objects| objects.iter())
                .map(|(name, object)| {
                    let mut entry = Map::new();
                    entry.insert("name".to_string(), json!(name));
                    entry.insert("ref".to_string(), json!(format!("{prefix}{name}")));
                    entry.insert("type".to_string(), json!(ref_type));
                    if let Some(comment) = object.get("comment") {
                        entry.insert("comment".to_string(), comment.clone());
                    }
                    RemoteObject::new(entry)
                })
                .collect::<Vec<_>>()
        };
        let mut refs = entries(&Collection::FirewallAliases, "alias", "");
        refs.extend(entries(&Collection::FirewallIpSets, "ipset", "+"));
        refs
    }
}

impl InMemoryPve {
    pub fn new() -> Self {
        let mut version = Map::new();
        version.insert("version".to_string(), json!("8.2.4"));
        version.insert("release".to_string(), json!("8.2"));
        version.insert("repoid".to_string(), json!("faa83925c9641325"));
        Self {
            backend: Arc::new(RwLock::new(Backend {
                version,
                ..Backend::default()
            })),
        }
    }

    /// Objects written to `collection` stay unconverged for `reads` reads
    #[must_use]
    pub fn with_convergence_delay(self, collection: Collection, reads: u32) -> Self {
        if let Ok(mut backend) = self.backend.try_write() {
            backend.delays.insert(collection, reads);
        }
        self
    }

    /// Fail the next call of `method` with `err`
    pub async fn fail_next(&self, method: Method, err: ApiError) {
        self.backend
            .write()
            .await
            .failures
            .entry(method)
            .or_default()
            .push_back(err);
    }

    /// Store an object directly, as if created outside the provider
    pub async fn insert(&self, collection: Collection, id: &str, object: Value) {
        let mut fields = match object {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        fields.insert(
            stored_identifier_field(&collection).to_string(),
            Value::String(id.to_string()),
        );
        self.backend
            .write()
            .await
            .objects
            .entry(collection)
            .or_default()
            .insert(id.to_string(), fields);
    }

    /// Delete an object outside the provider; false when it did not exist
    pub async fn remove(&self, collection: &Collection, id: &str) -> bool {
        self.backend
            .write()
            .await
            .objects
            .get_mut(collection)
            .is_some_and(|objects| objects.remove(id).is_some())
    }

    /// Raw stored fields of an object, bypassing convergence
    pub async fn object(&self, collection: &Collection, id: &str) -> Option<Map<String, Value>> {
        self.backend
            .read()
            .await
            .objects
            .get(collection)
            .and_then(|objects| objects.get(id))
            .cloned()
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.backend.read().await.calls.clone()
    }

    /// Calls of `method` received so far
    pub async fn count(&self, method: Method) -> usize {
        self.backend
            .read()
            .await
            .calls
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    pub async fn set_version(&self, version: Value) {
        if let Value::Object(fields) = version {
            self.backend.write().await.version = fields;
        }
    }
}

#[async_trait]
impl RemoteApi for InMemoryPve {
    async fn create(
        &self,
        collection: &Collection,
        request: &WriteRequest,
    ) -> Result<Option<String>, ApiError> {
        let mut backend = self.backend.write().await;
        backend.record(Method::Create, collection, None, Some(request))?;
        backend.require_parent(collection)?;

        let wire = identifier_field(collection);
        let id = request
            .text(wire)
            .ok_or_else(|| ApiError::status(400, format!("{wire}: property is missing")))?
            .to_string();
        if backend
            .objects
            .get(collection)
            .is_some_and(|objects| objects.contains_key(&id))
        {
            return Err(ApiError::status(500, format!("'{id}' already exists")));
        }

        let mut object = Map::new();
        backend.apply_fields(collection, &mut object, request)?;
        match collection {
            Collection::AcmeAccounts => backend.converge_acme_account(&mut object),
            Collection::Pools => {
                object.insert("members".to_string(), Value::Array(Vec::new()));
            }
            _ => {}
        }

        debug!(%collection, id = %id, "Created object");
        backend.objects.entry(collection.clone()).or_default().insert(id.clone(), object);
        backend.mark_pending(collection, &id);

        Ok(match collection {
            Collection::AcmeAccounts => Some(format!("UPID:pve:acmeregister:{id}:root@pam:")),
            _ => None,
        })
    }

    async fn read(&self, collection: &Collection, id: &str) -> Result<RemoteObject, ApiError> {
        let mut backend = self.backend.write().await;
        backend.record(Method::Read, collection, Some(id), None)?;
        backend.observe(collection, id)
    }

    async fn get(&self, collection: &Collection) -> Result<RemoteObject, ApiError> {
        let mut backend = self.backend.write().await;
        backend.record(Method::Get, collection, None, None)?;
        match collection {
            Collection::Version => Ok(RemoteObject::new(backend.version.clone())),
            other => Err(ApiError::status(
                501,
                format!("Method 'GET {other}' not implemented"),
            )),
        }
    }

    async fn update(
        &self,
        collection: &Collection,
        id: &str,
        request: &WriteRequest,
    ) -> Result<(), ApiError> {
        let mut backend = self.backend.write().await;
        backend.record(Method::Update, collection, Some(id), Some(request))?;
        backend.require_parent(collection)?;

        let mut object = backend
            .objects
            .get(collection)
            .and_then(|objects| objects.get(id))
            .cloned()
            .ok_or_else(|| not_found(collection, id))?;

        let key_field = stored_identifier_field(collection);
        if update_mode(collection) == UpdateMode::Replace {
            object.retain(|field, _| field == key_field);
        }
        backend.apply_fields(collection, &mut object, request)?;

        let new_id = match &request.rename {
            Some(new_id) if new_id != id => {
                if backend
                    .objects
                    .get(collection)
                    .is_some_and(|objects| objects.contains_key(new_id))
                {
                    return Err(ApiError::status(500, format!("'{new_id}' already exists")));
                }
                object.insert(key_field.to_string(), Value::String(new_id.clone()));
                new_id.clone()
            }
            _ => id.to_string(),
        };

        let objects = backend.objects.entry(collection.clone()).or_default();
        objects.remove(id);
        objects.insert(new_id.clone(), object);
        if new_id != id {
            if let Collection::FirewallIpSets = collection {
                let entries = backend
                    .objects
                    .remove(&Collection::FirewallIpSet { name: id.to_string() });
                if let Some(entries) = entries {
                    backend
                        .objects
                        .insert(Collection::FirewallIpSet { name: new_id.clone() }, entries);
                }
            }
        }
        backend.mark_pending(collection, &new_id);
        debug!(%collection, id, new_id = %new_id, "Updated object");
        Ok(())
    }

    async fn delete(&self, collection: &Collection, id: &str) -> Result<(), ApiError> {
        let mut backend = self.backend.write().await;
        backend.record(Method::Delete, collection, Some(id), None)?;
        backend.require_parent(collection)?;
        let removed = backend
            .objects
            .get_mut(collection)
            .and_then(|objects| objects.remove(id));
        if removed.is_none() {
            return Err(not_found(collection, id));
        }
        backend.pending.remove(&(collection.clone(), id.to_string()));
        if let Collection::FirewallIpSets = collection {
            backend
                .objects
                .remove(&Collection::FirewallIpSet { name: id.to_string() });
        }
        Ok(())
    }

    async fn list(&self, collection: &Collection) -> Result<Vec<RemoteObject>, ApiError> {
        let mut backend = self.backend.write().await;
        backend.record(Method::List, collection, None, None)?;
        backend.require_parent(collection)?;
        if let Collection::FirewallRefs = collection {
            return Ok(backend.refs());
        }
        Ok(backend
            .objects
            .get(collection)
            .map(|objects| objects.values().cloned().map(RemoteObject::new).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(fields: &[(&str, FieldValue)]) -> WriteRequest {
        WriteRequest {
            fields: fields
                .iter()
                .map(|(name, value)| ((*name).to_string(), value.clone()))
                .collect(),
            ..WriteRequest::default()
        }
    }

    fn text(value: &str) -> FieldValue {
        FieldValue::Text(value.to_string())
    }

    #[tokio::test]
    async fn test_stores_flags_and_lists_like_the_remote() {
        let pve = InMemoryPve::new();
        pve.create(
            &Collection::Storage,
            &request(&[
                ("storage", text("local")),
                ("disable", FieldValue::Flag(true)),
                ("content", FieldValue::List(vec!["iso".into(), "backup".into()])),
            ]),
        )
        .await
        .unwrap();

        let object = pve.read(&Collection::Storage, "local").await.unwrap();
        assert_eq!(object.get("disable"), Some(&json!(1)));
        assert_eq!(object.get("content"), Some(&json!("iso,backup")));
    }

    #[tokio::test]
    async fn test_missing_objects_use_remote_messages() {
        let pve = InMemoryPve::new();
        let err = pve.read(&Collection::FirewallAliases, "office").await.unwrap_err();
        assert_eq!(err.message(), "no such alias 'office'");

        let err = pve
            .read(&Collection::FirewallIpSet { name: "missing".into() }, "10.0.0.0/8")
            .await
            .unwrap_err();
        assert_eq!(err.message(), "no such IPSet 'missing'");
    }

    #[tokio::test]
    async fn test_replace_update_drops_omitted_fields() {
        let pve = InMemoryPve::new();
        pve.create(
            &Collection::FirewallAliases,
            &request(&[
                ("name", text("office")),
                ("cidr", text("10.0.0.1")),
                ("comment", text("old")),
            ]),
        )
        .await
        .unwrap();
        pve.update(
            &Collection::FirewallAliases,
            "office",
            &request(&[("cidr", text("10.0.0.2"))]),
        )
        .await
        .unwrap();

        let object = pve.object(&Collection::FirewallAliases, "office").await.unwrap();
        assert_eq!(object.get("cidr"), Some(&json!("10.0.0.2")));
        assert!(!object.contains_key("comment"));
        assert_eq!(object.get("name"), Some(&json!("office")));
    }

    #[tokio::test]
    async fn test_rename_moves_the_object() {
        let pve = InMemoryPve::new();
        pve.insert(Collection::FirewallIpSets, "blocklist", json!({})).await;
        pve.insert(
            Collection::FirewallIpSet { name: "blocklist".into() },
            "10.0.0.0/8",
            json!({}),
        )
        .await;

        let mut rename = request(&[]);
        rename.rename = Some("denylist".to_string());
        pve.update(&Collection::FirewallIpSets, "blocklist", &rename)
            .await
            .unwrap();

        assert!(pve.object(&Collection::FirewallIpSets, "blocklist").await.is_none());
        let moved = pve.list(&Collection::FirewallIpSets).await.unwrap();
        assert_eq!(moved[0].get("name"), Some(&json!("denylist")));
        let entries = pve
            .list(&Collection::FirewallIpSet { name: "denylist".into() })
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_hits_once() {
        let pve = InMemoryPve::new();
        pve.fail_next(Method::Get, ApiError::status(503, "unavailable"))
            .await;
        assert!(pve.get(&Collection::Version).await.is_err());
        assert!(pve.get(&Collection::Version).await.is_ok());
        assert_eq!(pve.count(Method::Get).await, 2);
    }

    #[tokio::test]
    async fn test_pending_plugin_reads_as_missing() {
        let pve = InMemoryPve::new().with_convergence_delay(Collection::AcmePlugins, 2);
        pve.create(
            &Collection::AcmePlugins,
            &request(&[("id", text("test")), ("type", text("dns")), ("data", text("Zm9vYmFy"))]),
        )
        .await
        .unwrap();

        for _ in 0..2 {
            let err = pve.read(&Collection::AcmePlugins, "test").await.unwrap_err();
            assert_eq!(err.message(), "ACME plugin 'test' does not exist");
        }
        let object = pve.read(&Collection::AcmePlugins, "test").await.unwrap();
        assert_eq!(object.get("plugin"), Some(&json!("test")));
        assert_eq!(object.get("data"), Some(&json!("foobar")));
    }

    #[tokio::test]
    async fn test_refs_list_aliases_and_ipsets() {
        let pve = InMemoryPve::new();
        pve.insert(Collection::FirewallAliases, "office", json!({"cidr": "10.0.0.1"}))
            .await;
        pve.insert(Collection::FirewallIpSets, "blocklist", json!({"comment": "bad"}))
            .await;

        let refs = pve.list(&Collection::FirewallRefs).await.unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[1].get("ref"), Some(&json!("+blocklist")));
        assert_eq!(refs[1].get("comment"), Some(&json!("bad")));
    }
}
