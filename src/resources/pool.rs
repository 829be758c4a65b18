//! # Resource Pool
//!
//! Groups guests and storage for permission management (`/pools`). Members
//! are assigned elsewhere and only reported here.

use crate::client::{Capability, Collection, RemoteObject, WriteRequest};
use crate::error::ResourceError;
use crate::model::{Attr, StringSet};
use crate::reconciler::descriptor::{Convergence, FieldSpec, Lookup, ResourceDescriptor};
use crate::reconciler::fields::{known_identifier, FieldReader, RequestBuilder};
use crate::reconciler::ResourceKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    type_name: "proxmoxve_pool",
    identifier: "pool_id",
    fields: &[
        FieldSpec::required("pool_id").wire("poolid"),
        FieldSpec::optional("comment"),
        FieldSpec::computed("id"),
        FieldSpec::computed("members"),
    ],
    convergence: Convergence::Immediate,
    capability: Capability::Token,
    lookup: Lookup::Item,
    rename: false,
    not_found: &["pool '{id}' does not exist"],
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolModel {
    #[serde(default)]
    pub id: Attr<String>,
    #[serde(default)]
    pub pool_id: Attr<String>,
    #[serde(default)]
    pub comment: Attr<String>,
    /// Member ids such as `qemu/100` or `storage/pve1/local`
    #[serde(default)]
    pub members: Attr<StringSet>,
}

/// Member ids listed under `members[].id`
pub(crate) fn member_ids(
    reader: &FieldReader<'_>,
) -> Result<Attr<StringSet>, ResourceError> {
    match reader.object().get("members") {
        None => Ok(Attr::Null),
        Some(Value::Array(members)) => members
            .iter()
            .map(|member| {
                member
                    .get("id")
                    .and_then(Value::as_str)
                    .map(ToString::to_string)
                    .ok_or_else(|| ResourceError::decode("members", "member without an id"))
            })
            .collect::<Result<StringSet, _>>()
            .map(Attr::Known),
        Some(other) => Err(ResourceError::decode(
            "members",
            format!("expected a list, got {other}"),
        )),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Pool;

impl ResourceKind for Pool {
    type Model = PoolModel;

    fn descriptor() -> &'static ResourceDescriptor {
        &DESCRIPTOR
    }

    fn collection(_model: &PoolModel) -> Result<Collection, ResourceError> {
        Ok(Collection::Pools)
    }

    fn remote_id(model: &PoolModel) -> Result<String, ResourceError> {
        known_identifier("pool_id", &model.pool_id)
    }

    fn create_request(config: &PoolModel) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::create(&DESCRIPTOR)
            .field("pool_id", &config.pool_id)
            .field("comment", &config.comment)
            .build()
    }

    fn update_request(prior: &PoolModel, config: &PoolModel) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::update(&DESCRIPTOR)
            .rename(&Self::remote_id(prior)?, &config.pool_id)
            .field("comment", &config.comment)
            .build()
    }

    fn decode(object: &RemoteObject, addressed: &PoolModel) -> Result<PoolModel, ResourceError> {
        let reader = FieldReader::new(object, &DESCRIPTOR);
        // The item endpoint omits the pool id; the list endpoint reports it
        let pool_id = match reader.text("poolid")? {
            Attr::Known(pool_id) => pool_id,
            _ => known_identifier("pool_id", &addressed.pool_id)?,
        };
        Ok(PoolModel {
            id: Attr::Known(pool_id.clone()),
            pool_id: Attr::Known(pool_id),
            comment: reader.text("comment")?,
            members: member_ids(&reader)?,
        })
    }

    fn provisional(config: &PoolModel) -> PoolModel {
        PoolModel {
            id: config.pool_id.clone().settle(),
            pool_id: config.pool_id.clone().settle(),
            comment: config.comment.clone().settle(),
            members: Attr::Null,
        }
    }

    fn from_import_id(id: &str) -> Result<PoolModel, ResourceError> {
        Ok(PoolModel {
            pool_id: Attr::Known(id.to_string()),
            ..PoolModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::string_set;
    use serde_json::json;

    #[test]
    fn test_decode_collects_member_ids() {
        let object = RemoteObject::from_value(json!({
            "comment": "production",
            "members": [
                {"id": "qemu/100", "type": "qemu", "vmid": 100},
                {"id": "storage/pve1/local", "type": "storage"},
            ],
        }))
        .unwrap();
        let addressed = Pool::from_import_id("prod").unwrap();
        let state = Pool::decode(&object, &addressed).unwrap();
        assert_eq!(state.id, Attr::known("prod"));
        assert_eq!(state.members, string_set(["qemu/100", "storage/pve1/local"]));
    }

    #[test]
    fn test_member_without_id_is_a_decode_error() {
        let object = RemoteObject::from_value(json!({"members": [{"type": "qemu"}]})).unwrap();
        let err = Pool::decode(&object, &Pool::from_import_id("prod").unwrap()).unwrap_err();
        assert!(matches!(err, ResourceError::Decode { .. }));
    }

    #[test]
    fn test_pool_id_goes_out_as_poolid() {
        let config = PoolModel {
            pool_id: "prod".into(),
            ..PoolModel::default()
        };
        let request = Pool::create_request(&config).unwrap();
        assert_eq!(request.text("poolid"), Some("prod"));
        assert!(request.get("comment").is_none());
    }
}
