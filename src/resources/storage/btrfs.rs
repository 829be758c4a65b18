use super::{CommonFields, NOT_FOUND};
use crate::client::{Capability, Collection, FieldValue, RemoteObject, WriteRequest};
use crate::error::ResourceError;
use crate::model::{Attr, StringSet};
use crate::reconciler::descriptor::{Convergence, FieldSpec, Lookup, ResourceDescriptor};
use crate::reconciler::fields::{known_identifier, FieldReader, RequestBuilder};
use crate::reconciler::ResourceKind;
use serde::{Deserialize, Serialize};

static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    type_name: "proxmoxve_storage_btrfs",
    identifier: "name",
    fields: &[
        FieldSpec::required("name").wire("storage"),
        FieldSpec::required("path"),
        FieldSpec::optional("content").repeated(),
        FieldSpec::optional("nodes").repeated(),
        FieldSpec::optional("disable"),
        FieldSpec::optional("preallocation"),
        FieldSpec::computed("id"),
        FieldSpec::computed("type"),
        FieldSpec::computed("prune_backups").wire("prune-backups"),
    ],
    convergence: Convergence::Immediate,
    capability: Capability::Token,
    lookup: Lookup::Item,
    rename: false,
    not_found: NOT_FOUND,
};

/// BTRFS storage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageBtrfsModel {
    #[serde(default)]
    pub id: Attr<String>,
    #[serde(default)]
    pub name: Attr<String>,
    #[serde(default)]
    pub path: Attr<String>,
    #[serde(default)]
    pub content: Attr<StringSet>,
    #[serde(default)]
    pub nodes: Attr<StringSet>,
    #[serde(default)]
    pub disable: Attr<bool>,
    #[serde(default)]
    pub preallocation: Attr<String>,
    #[serde(default, rename = "type")]
    pub storage_type: Attr<String>,
    #[serde(default)]
    pub prune_backups: Attr<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StorageBtrfs;

impl ResourceKind for StorageBtrfs {
    type Model = StorageBtrfsModel;

    fn descriptor() -> &'static ResourceDescriptor {
        &DESCRIPTOR
    }

    fn collection(_model: &StorageBtrfsModel) -> Result<Collection, ResourceError> {
        Ok(Collection::Storage)
    }

    fn remote_id(model: &StorageBtrfsModel) -> Result<String, ResourceError> {
        known_identifier("name", &model.name)
    }

    fn create_request(config: &StorageBtrfsModel) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::create(&DESCRIPTOR)
            .constant("type", FieldValue::Text("btrfs".to_string()))
            .field("name", &config.name)
            .field("path", &config.path)
            .field("content", &config.content)
            .field("nodes", &config.nodes)
            .field("disable", &config.disable)
            .field("preallocation", &config.preallocation)
            .build()
    }

    fn update_request(
        prior: &StorageBtrfsModel,
        config: &StorageBtrfsModel,
    ) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::update(&DESCRIPTOR)
            .rename(&Self::remote_id(prior)?, &config.name)
            .field("content", &config.content)
            .field("nodes", &config.nodes)
            .field("disable", &config.disable)
            .field("preallocation", &config.preallocation)
            .build()
    }

    fn decode(
        object: &RemoteObject,
        addressed: &StorageBtrfsModel,
    ) -> Result<StorageBtrfsModel, ResourceError> {
        let reader = FieldReader::new(object, &DESCRIPTOR);
        let common = CommonFields::decode(&reader)?;
        Ok(StorageBtrfsModel {
            id: Attr::Known(common.name.clone()),
            name: Attr::Known(common.name),
            path: reader.text("path")?,
            content: common.content.or_empty_like(&addressed.content),
            nodes: common.nodes.or_empty_like(&addressed.nodes),
            disable: common.disable,
            preallocation: common.preallocation,
            storage_type: common.storage_type,
            prune_backups: common.prune_backups,
        })
    }

    fn provisional(config: &StorageBtrfsModel) -> StorageBtrfsModel {
        StorageBtrfsModel {
            id: config.name.clone().settle(),
            name: config.name.clone().settle(),
            path: config.path.clone().settle(),
            content: config.content.clone().settle(),
            nodes: config.nodes.clone().settle(),
            disable: config.disable.clone().settle(),
            preallocation: config.preallocation.clone().settle(),
            storage_type: Attr::Known("btrfs".to_string()),
            prune_backups: Attr::Null,
        }
    }

    fn from_import_id(id: &str) -> Result<StorageBtrfsModel, ResourceError> {
        Ok(StorageBtrfsModel {
            name: Attr::Known(id.to_string()),
            ..StorageBtrfsModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::string_set;
    use serde_json::json;

    fn config() -> StorageBtrfsModel {
        StorageBtrfsModel {
            name: "pool".into(),
            path: "/mnt/pool".into(),
            content: string_set(["images", "rootdir"]),
            preallocation: "metadata".into(),
            id: Attr::Unknown,
            storage_type: Attr::Unknown,
            prune_backups: Attr::Unknown,
            ..StorageBtrfsModel::default()
        }
    }

    #[test]
    fn test_create_request_sends_type_and_lists() {
        let request = StorageBtrfs::create_request(&config()).unwrap();
        assert_eq!(request.text("type"), Some("btrfs"));
        assert_eq!(request.text("storage"), Some("pool"));
        assert_eq!(request.text("path"), Some("/mnt/pool"));
        assert_eq!(
            request.get("content"),
            Some(&FieldValue::List(vec![
                "images".to_string(),
                "rootdir".to_string()
            ]))
        );
        assert_eq!(request.text("preallocation"), Some("metadata"));
        assert!(request.get("nodes").is_none());
        assert!(request.get("prune-backups").is_none());
    }

    #[test]
    fn test_update_request_never_sends_fixed_fields() {
        let request = StorageBtrfs::update_request(&config(), &config()).unwrap();
        assert!(request.get("path").is_none());
        assert!(request.get("storage").is_none());
        assert!(request.get("type").is_none());
        assert!(request.rename.is_none());
    }

    #[test]
    fn test_name_change_is_not_an_in_place_update() {
        let mut renamed = config();
        renamed.name = "scratch".into();
        let err = StorageBtrfs::update_request(&config(), &renamed).unwrap_err();
        assert_eq!(err.attribute(), Some("name"));
    }

    #[test]
    fn test_decode_replaces_everything() {
        let object = RemoteObject::from_value(json!({
            "storage": "pool",
            "type": "btrfs",
            "path": "/mnt/pool",
            "content": "rootdir,images",
            "nodes": "pve1",
            "prune-backups": "keep-last=3",
            "digest": "c0ffee",
        }))
        .unwrap();

        let state = StorageBtrfs::decode(&object, &config()).unwrap();
        assert_eq!(state.id, Attr::known("pool"));
        assert_eq!(state.storage_type, Attr::known("btrfs"));
        assert_eq!(state.content, string_set(["images", "rootdir"]));
        assert_eq!(state.nodes, string_set(["pve1"]));
        // Not reported, so null even though configuration set it
        assert_eq!(state.preallocation, Attr::Null);
        assert_eq!(state.prune_backups, Attr::known("keep-last=3"));
    }

    #[test]
    fn test_provisional_state_is_btrfs() {
        let state = StorageBtrfs::provisional(&config());
        assert_eq!(state.id, Attr::known("pool"));
        assert_eq!(state.storage_type, Attr::known("btrfs"));
        assert_eq!(state.prune_backups, Attr::Null);
    }
}
