//! # Field Reconciler
//!
//! Maps between typed configuration/state documents and flat remote objects.
//!
//! ## Write direction
//!
//! [`RequestBuilder`] applies each field's role from the kind's descriptor:
//!
//! - required: must be known and non-null, otherwise the request fails before
//!   it is sent
//! - optional: known values are sent; null is omitted on create and, on
//!   update, either omitted or put on the delete list; unknown fails. An
//!   empty set is written the same way as null
//! - computed: asking for one is a bug in the handler and fails the request
//!
//! The builder keeps the first error and reports it from [`RequestBuilder::build`].
//!
//! ## Read direction
//!
//! [`FieldReader`] decodes remote fields into attributes. Absent fields
//! become null: state is replaced wholesale on every read and never keeps a
//! value the remote no longer reports.

use super::descriptor::{Presence, ResourceDescriptor, Role, SetEncoding};
use crate::client::{FieldValue, RemoteObject, WriteRequest};
use crate::error::ResourceError;
use crate::model::{Attr, StringSet};
use serde_json::Value;

/// Conversion of a known attribute value into a wire value
pub trait IntoFieldValue {
    fn into_field_value(&self, encoding: SetEncoding) -> FieldValue;

    /// Written the same way as null
    fn is_blank(&self) -> bool {
        false
    }
}

impl IntoFieldValue for String {
    fn into_field_value(&self, _encoding: SetEncoding) -> FieldValue {
        FieldValue::Text(self.clone())
    }
}

impl IntoFieldValue for bool {
    fn into_field_value(&self, _encoding: SetEncoding) -> FieldValue {
        FieldValue::Flag(*self)
    }
}

impl IntoFieldValue for i64 {
    fn into_field_value(&self, _encoding: SetEncoding) -> FieldValue {
        FieldValue::Integer(*self)
    }
}

impl IntoFieldValue for StringSet {
    fn into_field_value(&self, encoding: SetEncoding) -> FieldValue {
        match encoding {
            SetEncoding::Joined => FieldValue::Text(join_set(self)),
            SetEncoding::Repeated => FieldValue::List(self.iter().cloned().collect()),
        }
    }

    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

/// Canonical comma-joined form of a set
pub fn join_set(set: &StringSet) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

/// Split a comma-joined list into a set, dropping blanks
pub fn split_set(joined: &str) -> StringSet {
    joined
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Value of the identifier attribute `name`, which must be known
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn known_identifier(name: &str, value: &Attr<String>) -> Result<String, ResourceError> {
    match value {
        Attr::Known(id) if !id.is_empty() => Ok(id.clone()),
        Attr::Known(_) => Err(ResourceError::configuration(name, "cannot be empty")),
        Attr::Null => Err(ResourceError::configuration(name, "is required")),
        Attr::Unknown => Err(ResourceError::configuration(name, "must be known before apply")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Create,
    Update,
}

/// Builds a create or update request from configuration values
#[derive(Debug)]
pub struct RequestBuilder {
    descriptor: &'static ResourceDescriptor,
    mode: WriteMode,
    request: WriteRequest,
    /// Attributes handed to the builder so far
    supplied: Vec<&'static str>,
    error: Option<ResourceError>,
}

impl RequestBuilder {
    pub fn create(descriptor: &'static ResourceDescriptor) -> Self {
        Self::new(descriptor, WriteMode::Create)
    }

    pub fn update(descriptor: &'static ResourceDescriptor) -> Self {
        Self::new(descriptor, WriteMode::Update)
    }

    fn new(descriptor: &'static ResourceDescriptor, mode: WriteMode) -> Self {
        Self {
            descriptor,
            mode,
            request: WriteRequest::default(),
            supplied: Vec::new(),
            error: None,
        }
    }

    /// Add the attribute `name` according to its role
    #[must_use]
    pub fn field<T: IntoFieldValue>(mut self, name: &str, value: &Attr<T>) -> Self {
        if self.error.is_some() {
            return self;
        }
        if let Err(err) = self.apply(name, value) {
            self.error = Some(err);
        }
        self
    }

    /// Check a required attribute that is carried in the collection path
    /// instead of the request body
    #[must_use]
    pub fn addressed(mut self, name: &str, value: &Attr<String>) -> Self {
        if self.error.is_some() {
            return self;
        }
        match known_identifier(name, value) {
            Ok(_) => self.supply(name),
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Send a fixed wire value that does not come from configuration
    #[must_use]
    pub fn constant(mut self, wire: &str, value: FieldValue) -> Self {
        self.request.fields.insert(wire.to_string(), value);
        self
    }

    /// Keep the value of wire field `wire` out of logs
    #[must_use]
    pub fn sensitive(mut self, wire: &str) -> Self {
        self.request.sensitive.insert(wire.to_string());
        self
    }

    /// Rename from `prior` to `desired` when they differ and the kind allows it
    #[must_use]
    pub fn rename(mut self, prior: &str, desired: &Attr<String>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let identifier = self.descriptor.identifier;
        match desired {
            Attr::Known(desired) if desired != prior => {
                if self.descriptor.rename {
                    self.request.rename = Some(desired.clone());
                } else {
                    self.error = Some(ResourceError::configuration(
                        identifier,
                        format!(
                            "cannot change from '{prior}' to '{desired}' in place; {} does not support renames",
                            self.descriptor.type_name
                        ),
                    ));
                }
            }
            Attr::Known(_) => {}
            Attr::Null | Attr::Unknown => {
                self.error = Some(ResourceError::configuration(
                    identifier,
                    "must be known before apply",
                ));
            }
        }
        self
    }

    /// Finish the request, or report the first problem found
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub fn build(self) -> Result<WriteRequest, ResourceError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.mode == WriteMode::Create {
            if let Some(missing) = self
                .descriptor
                .required()
                .find(|spec| !self.supplied.contains(&spec.name))
            {
                return Err(ResourceError::configuration(missing.name, "is required"));
            }
        }
        Ok(self.request)
    }

    fn supply(&mut self, name: &str) {
        if let Some(spec) = self.descriptor.field(name) {
            self.supplied.push(spec.name);
        }
    }

    fn apply<T: IntoFieldValue>(&mut self, name: &str, value: &Attr<T>) -> Result<(), ResourceError> {
        let descriptor = self.descriptor;
        let spec = descriptor.field(name).ok_or_else(|| {
            ResourceError::configuration(
                name,
                format!("is not an attribute of {}", descriptor.type_name),
            )
        })?;
        self.supplied.push(spec.name);

        match (spec.role, value) {
            (Role::Computed, _) => Err(ResourceError::configuration(
                name,
                "is computed by the remote and cannot be written",
            )),
            (_, Attr::Unknown) => Err(ResourceError::configuration(
                name,
                "must be known before apply",
            )),
            (Role::Required, Attr::Null) => {
                Err(ResourceError::configuration(name, "is required"))
            }
            (Role::Required, Attr::Known(known)) if known.is_blank() => {
                Err(ResourceError::configuration(name, "cannot be empty"))
            }
            (Role::Optional(presence), Attr::Known(known)) if known.is_blank() => {
                self.unset(spec.wire, presence);
                Ok(())
            }
            (_, Attr::Known(known)) => {
                self.request
                    .fields
                    .insert(spec.wire.to_string(), known.into_field_value(spec.encoding));
                Ok(())
            }
            (Role::Optional(presence), Attr::Null) => {
                self.unset(spec.wire, presence);
                Ok(())
            }
        }
    }

    fn unset(&mut self, wire: &str, presence: Presence) {
        if self.mode == WriteMode::Update && presence == Presence::DeleteIfNull {
            self.request.delete.push(wire.to_string());
        }
    }
}

/// Decodes remote fields into attributes
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    object: &'a RemoteObject,
    descriptor: &'static ResourceDescriptor,
}

impl<'a> FieldReader<'a> {
    pub fn new(object: &'a RemoteObject, descriptor: &'static ResourceDescriptor) -> Self {
        Self { object, descriptor }
    }

    pub fn object(&self) -> &'a RemoteObject {
        self.object
    }

    /// Optional text field; numbers are rendered as text
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub fn text(&self, wire: &str) -> Result<Attr<String>, ResourceError> {
        match self.object.get(wire) {
            None => Ok(Attr::Null),
            Some(Value::String(text)) => Ok(Attr::Known(text.clone())),
            Some(Value::Number(number)) => Ok(Attr::Known(number.to_string())),
            Some(other) => Err(self.mismatch(wire, "a string", other)),
        }
    }

    /// Text field the remote always reports
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub fn required_text(&self, wire: &str) -> Result<String, ResourceError> {
        self.text(wire)?.into_option().ok_or_else(|| {
            ResourceError::decode(self.attribute(wire), "missing from the remote object")
        })
    }

    /// Optional boolean; accepts JSON booleans, `0`/`1` and `"0"`/`"1"`
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub fn flag(&self, wire: &str) -> Result<Attr<bool>, ResourceError> {
        let Some(value) = self.object.get(wire) else {
            return Ok(Attr::Null);
        };
        let decoded = match value {
            Value::Bool(flag) => Some(*flag),
            Value::Number(number) => match number.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            Value::String(text) => match text.as_str() {
                "0" => Some(false),
                "1" => Some(true),
                _ => None,
            },
            _ => None,
        };
        decoded
            .map(Attr::Known)
            .ok_or_else(|| self.mismatch(wire, "a boolean", value))
    }

    /// Optional set; accepts a comma-joined string or a list of strings.
    /// An empty set decodes to null in either form.
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub fn set(&self, wire: &str) -> Result<Attr<StringSet>, ResourceError> {
        match self.object.get(wire) {
            None => Ok(Attr::Null),
            Some(Value::String(joined)) => {
                let set = split_set(joined);
                Ok(if set.is_empty() {
                    Attr::Null
                } else {
                    Attr::Known(set)
                })
            }
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(text) => Ok(text.clone()),
                    other => Err(self.mismatch(wire, "a list of strings", other)),
                })
                .collect::<Result<StringSet, _>>()
                .map(|set| {
                    if set.is_empty() {
                        Attr::Null
                    } else {
                        Attr::Known(set)
                    }
                }),
            Some(other) => Err(self.mismatch(wire, "a list", other)),
        }
    }

    fn attribute(&self, wire: &str) -> String {
        self.descriptor
            .attribute_for_wire(wire)
            .unwrap_or(wire)
            .to_string()
    }

    fn mismatch(&self, wire: &str, expected: &str, got: &Value) -> ResourceError {
        ResourceError::decode(self.attribute(wire), format!("expected {expected}, got {got}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Capability;
    use crate::model::string_set;
    use crate::reconciler::descriptor::{Convergence, FieldSpec, Lookup};
    use serde_json::json;

    static PLUGIN: ResourceDescriptor = ResourceDescriptor {
        type_name: "proxmoxve_acme_plugin",
        identifier: "name",
        fields: &[
            FieldSpec::required("name").wire("id"),
            FieldSpec::required("type"),
            FieldSpec::optional("api").delete_if_null(),
            FieldSpec::optional("disable").delete_if_null(),
            FieldSpec::optional("nodes").delete_if_null(),
            FieldSpec::optional("comment"),
            FieldSpec::optional("content").repeated(),
            FieldSpec::computed("digest"),
        ],
        convergence: Convergence::Immediate,
        capability: Capability::Privileged,
        lookup: Lookup::Item,
        rename: false,
        not_found: &[],
    };

    static RENAMABLE: ResourceDescriptor = ResourceDescriptor {
        type_name: "proxmoxve_firewall_alias",
        identifier: "name",
        fields: &[FieldSpec::required("name"), FieldSpec::required("cidr")],
        convergence: Convergence::Immediate,
        capability: Capability::Token,
        lookup: Lookup::Item,
        rename: true,
        not_found: &[],
    };

    fn text(value: &str) -> Attr<String> {
        Attr::Known(value.to_string())
    }

    fn object(value: serde_json::Value) -> RemoteObject {
        RemoteObject::from_value(value).unwrap()
    }

    #[test]
    fn test_create_omits_null_optionals() {
        let request = RequestBuilder::create(&PLUGIN)
            .field("name", &text("dns"))
            .field("type", &text("dns"))
            .field::<String>("api", &Attr::Null)
            .field::<bool>("disable", &Attr::Null)
            .build()
            .unwrap();

        assert_eq!(request.text("id"), Some("dns"));
        assert!(request.get("api").is_none());
        assert!(request.delete.is_empty());
    }

    #[test]
    fn test_update_deletes_only_delete_if_null_fields() {
        let request = RequestBuilder::update(&PLUGIN)
            .field::<String>("api", &Attr::Null)
            .field::<bool>("disable", &Attr::Null)
            .field::<String>("comment", &Attr::Null)
            .field("nodes", &string_set(["pve2", "pve1"]))
            .build()
            .unwrap();

        assert_eq!(request.delete, vec!["api".to_string(), "disable".to_string()]);
        assert_eq!(request.text("nodes"), Some("pve1,pve2"));
        assert!(!request.deletes("comment"));
    }

    #[test]
    fn test_repeated_sets_are_sent_as_lists() {
        let request = RequestBuilder::create(&PLUGIN)
            .field("name", &text("dns"))
            .field("type", &text("dns"))
            .field("content", &string_set(["iso", "backup"]))
            .build()
            .unwrap();
        assert_eq!(
            request.get("content"),
            Some(&FieldValue::List(vec!["backup".to_string(), "iso".to_string()]))
        );
    }

    #[test]
    fn test_empty_set_is_written_like_null() {
        let empty = Attr::Known(StringSet::new());
        let created = RequestBuilder::create(&PLUGIN)
            .field("name", &text("dns"))
            .field("type", &text("dns"))
            .field("nodes", &empty)
            .field("content", &empty)
            .build()
            .unwrap();
        assert!(created.get("nodes").is_none());
        assert!(created.get("content").is_none());

        let updated = RequestBuilder::update(&PLUGIN)
            .field("nodes", &empty)
            .build()
            .unwrap();
        assert!(updated.deletes("nodes"));
        assert!(updated.get("nodes").is_none());
    }

    #[test]
    fn test_unknown_and_missing_required_values_fail_fast() {
        let err = RequestBuilder::create(&PLUGIN)
            .field::<String>("name", &Attr::Unknown)
            .field("type", &text("dns"))
            .build()
            .unwrap_err();
        assert_eq!(err.attribute(), Some("name"));

        let err = RequestBuilder::create(&PLUGIN)
            .field("name", &text("dns"))
            .field::<String>("type", &Attr::Null)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("'type' is required"));

        let err = RequestBuilder::update(&PLUGIN)
            .field::<String>("api", &Attr::Unknown)
            .build()
            .unwrap_err();
        assert_eq!(err.attribute(), Some("api"));
    }

    #[test]
    fn test_create_without_a_required_attribute_fails() {
        let err = RequestBuilder::create(&PLUGIN)
            .field("name", &text("dns"))
            .field("api", &text("cf"))
            .build()
            .unwrap_err();
        assert_eq!(err.attribute(), Some("type"));
        assert!(err.to_string().contains("'type' is required"));

        // Updates carry only what changes
        assert!(RequestBuilder::update(&PLUGIN)
            .field("api", &text("cf"))
            .build()
            .is_ok());
    }

    #[test]
    fn test_path_attribute_counts_as_supplied() {
        let request = RequestBuilder::create(&RENAMABLE)
            .addressed("name", &text("office"))
            .field("cidr", &text("10.0.0.0/8"))
            .build()
            .unwrap();
        assert!(request.get("name").is_none());

        let err = RequestBuilder::create(&RENAMABLE)
            .addressed("name", &Attr::Unknown)
            .field("cidr", &text("10.0.0.0/8"))
            .build()
            .unwrap_err();
        assert_eq!(err.attribute(), Some("name"));
    }

    #[test]
    fn test_computed_fields_are_never_written() {
        let err = RequestBuilder::update(&PLUGIN)
            .field("digest", &text("abc"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("computed"));
    }

    #[test]
    fn test_rename_only_when_identifier_changes() {
        let unchanged = RequestBuilder::update(&RENAMABLE)
            .rename("office", &text("office"))
            .build()
            .unwrap();
        assert!(unchanged.rename.is_none());

        let renamed = RequestBuilder::update(&RENAMABLE)
            .rename("office", &text("hq"))
            .field("cidr", &text("10.0.0.0/8"))
            .build()
            .unwrap();
        assert_eq!(renamed.rename.as_deref(), Some("hq"));

        let refused = RequestBuilder::update(&PLUGIN)
            .rename("dns", &text("dns2"))
            .build()
            .unwrap_err();
        assert!(refused.to_string().contains("does not support renames"));
    }

    #[test]
    fn test_reader_decodes_pve_shapes() {
        let remote = object(json!({
            "id": "dns",
            "disable": 1,
            "shared": "0",
            "enabled": true,
            "nodes": "pve2, pve1",
            "content": ["iso", "images"],
            "maxfiles": 3,
        }));
        let reader = FieldReader::new(&remote, &PLUGIN);

        assert_eq!(reader.required_text("id").unwrap(), "dns");
        assert_eq!(reader.flag("disable").unwrap(), Attr::Known(true));
        assert_eq!(reader.flag("shared").unwrap(), Attr::Known(false));
        assert_eq!(reader.flag("enabled").unwrap(), Attr::Known(true));
        assert_eq!(reader.set("nodes").unwrap(), string_set(["pve1", "pve2"]));
        assert_eq!(reader.set("content").unwrap(), string_set(["images", "iso"]));
        assert_eq!(reader.text("maxfiles").unwrap(), text("3"));
        assert_eq!(reader.text("api").unwrap(), Attr::Null);
        assert_eq!(reader.flag("missing").unwrap(), Attr::Null);
    }

    #[test]
    fn test_reader_decodes_empty_sets_to_null() {
        let remote = object(json!({ "nodes": "", "content": [] }));
        let reader = FieldReader::new(&remote, &PLUGIN);
        assert_eq!(reader.set("nodes").unwrap(), Attr::Null);
        assert_eq!(reader.set("content").unwrap(), Attr::Null);
    }

    #[test]
    fn test_reader_reports_mismatches_by_attribute() {
        let remote = object(json!({ "id": ["a"], "disable": 2 }));
        let reader = FieldReader::new(&remote, &PLUGIN);

        let err = reader.text("id").unwrap_err();
        assert_eq!(err.attribute(), Some("name"));
        assert!(reader.flag("disable").is_err());
        assert!(reader.required_text("type").is_err());
    }
}
