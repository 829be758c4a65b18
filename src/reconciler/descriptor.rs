//! # Resource Descriptors
//!
//! Static description of one managed resource kind: its fields and their
//! roles, how it converges, which client it needs and how "does not exist"
//! looks on the wire.

use crate::client::Capability;
use crate::config::ConvergenceTimeouts;
use crate::constants::TYPE_NAME_PREFIX;
use crate::error::ApiError;

/// Role of a field in write requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Must be known and non-null before any remote call
    Required,
    /// May be null; `Presence` decides what null means on update
    Optional(Presence),
    /// Owned by the remote; never read from configuration
    Computed,
}

/// What an explicitly-null optional field means on update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Left out of the request; the remote keeps its value
    OmitIfNull,
    /// Listed in the request's delete list; the remote clears it
    DeleteIfNull,
}

/// Wire encoding of a set-valued field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetEncoding {
    /// Canonical comma-joined string, sorted
    Joined,
    /// Native repeated value
    Repeated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Attribute name in the declarative model
    pub name: &'static str,
    /// Field name on the wire
    pub wire: &'static str,
    pub role: Role,
    pub encoding: SetEncoding,
}

impl FieldSpec {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            wire: name,
            role: Role::Required,
            encoding: SetEncoding::Joined,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            wire: name,
            role: Role::Optional(Presence::OmitIfNull),
            encoding: SetEncoding::Joined,
        }
    }

    pub const fn computed(name: &'static str) -> Self {
        Self {
            name,
            wire: name,
            role: Role::Computed,
            encoding: SetEncoding::Joined,
        }
    }

    /// Mark an optional field delete-if-null
    #[must_use]
    pub const fn delete_if_null(mut self) -> Self {
        self.role = Role::Optional(Presence::DeleteIfNull);
        self
    }

    #[must_use]
    pub const fn wire(mut self, wire: &'static str) -> Self {
        self.wire = wire;
        self
    }

    #[must_use]
    pub const fn repeated(mut self) -> Self {
        self.encoding = SetEncoding::Repeated;
        self
    }
}

/// How a kind's object reaches a readable state after a mutating call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// Readable as soon as the call returns
    Immediate,
    /// Applied by a background task on the remote; reads are polled
    Eventual(ConvergenceTimeouts),
}

/// How a kind's object is read back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// `GET` on the item path
    Item,
    /// List the collection and pick the entry whose `key` matches
    Scan { key: &'static str },
}

#[derive(Debug)]
pub struct ResourceDescriptor {
    pub type_name: &'static str,
    /// Attribute holding the remote identifier
    pub identifier: &'static str,
    pub fields: &'static [FieldSpec],
    pub convergence: Convergence,
    pub capability: Capability,
    pub lookup: Lookup,
    /// Whether an identifier change is sent as a rename instead of a replacement
    pub rename: bool,
    /// Not-found message patterns; `{id}` is replaced by the remote identifier
    pub not_found: &'static [&'static str],
}

impl ResourceDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    /// Attribute name for a wire field, if the field is described
    pub fn attribute_for_wire(&self, wire: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|spec| spec.wire == wire)
            .map(|spec| spec.name)
    }

    /// Attributes every create request must carry
    pub fn required(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields
            .iter()
            .filter(|spec| spec.role == Role::Required)
    }

    /// Whether `err` reports that the object `id` does not exist
    pub fn is_not_found(&self, id: &str, err: &ApiError) -> bool {
        self.not_found
            .iter()
            .any(|pattern| err.mentions(&pattern.replace("{id}", id)))
    }

    /// Instance address used in logs and errors
    pub fn address(&self, id: &str) -> String {
        format!("{}.{id}", self.type_name)
    }

    /// Kind name without the provider prefix, used as a metrics label
    pub fn kind(&self) -> &'static str {
        self.type_name
            .strip_prefix(TYPE_NAME_PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(self.type_name)
    }
}
