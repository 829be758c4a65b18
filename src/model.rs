//! # Document Model
//!
//! Tri-state attribute values as the declarative engine hands them over.
//!
//! Every attribute of a configuration or state document is either known,
//! explicitly null, or unknown (its value depends on something not yet applied).
//! Unknown values can never be sent to the remote API and can never be
//! persisted; `Attr::settle` turns them into nulls where a best-effort state
//! has to be written.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;

/// A single attribute value of a configuration or state document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Attr<T> {
    /// Explicitly absent
    #[default]
    Null,
    /// Not yet known at plan time
    Unknown,
    /// Present with a value
    Known(T),
}

/// Set-valued attribute, normalized to an order-independent set
pub type StringSet = BTreeSet<String>;

impl<T> Attr<T> {
    pub fn known(value: impl Into<T>) -> Self {
        Self::Known(value.into())
    }

    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Known)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn as_known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Null | Self::Unknown => None,
        }
    }

    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Null | Self::Unknown => None,
        }
    }

    /// Replace an unknown value with null, keeping known and null values
    #[must_use]
    pub fn settle(self) -> Self {
        match self {
            Self::Unknown => Self::Null,
            other => other,
        }
    }
}

impl Attr<StringSet> {
    /// Keep an empty set from `addressed` where the remote reported none
    #[must_use]
    pub fn or_empty_like(self, addressed: &Self) -> Self {
        match (self, addressed) {
            (Self::Null, Self::Known(set)) if set.is_empty() => Self::Known(StringSet::new()),
            (other, _) => other,
        }
    }
}

impl Attr<String> {
    pub fn as_deref(&self) -> Option<&str> {
        self.as_known().map(String::as_str)
    }
}

impl<T> From<Option<T>> for Attr<T> {
    fn from(value: Option<T>) -> Self {
        Self::from_option(value)
    }
}

impl From<&str> for Attr<String> {
    fn from(value: &str) -> Self {
        Self::Known(value.to_string())
    }
}

impl From<String> for Attr<String> {
    fn from(value: String) -> Self {
        Self::Known(value)
    }
}

impl From<bool> for Attr<bool> {
    fn from(value: bool) -> Self {
        Self::Known(value)
    }
}

impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(value) => serializer.serialize_some(value),
            Self::Null => serializer.serialize_none(),
            Self::Unknown => Err(serde::ser::Error::custom(
                "unknown attribute values cannot be persisted",
            )),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Attr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from_option)
    }
}

/// Build a set attribute from string slices
pub fn string_set<I, S>(values: I) -> Attr<StringSet>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Attr::Known(values.into_iter().map(Into::into).collect())
}
