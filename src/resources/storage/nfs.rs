use super::{CommonFields, NOT_FOUND};
use crate::client::{Capability, Collection, FieldValue, RemoteObject, WriteRequest};
use crate::error::ResourceError;
use crate::model::{Attr, StringSet};
use crate::reconciler::descriptor::{Convergence, FieldSpec, Lookup, ResourceDescriptor};
use crate::reconciler::fields::{known_identifier, FieldReader, RequestBuilder};
use crate::reconciler::ResourceKind;
use serde::{Deserialize, Serialize};

static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    type_name: "proxmoxve_storage_nfs",
    identifier: "name",
    fields: &[
        FieldSpec::required("name").wire("storage"),
        FieldSpec::required("server"),
        FieldSpec::required("export"),
        FieldSpec::optional("content").repeated(),
        FieldSpec::optional("nodes").repeated(),
        FieldSpec::optional("disable"),
        FieldSpec::optional("preallocation"),
        FieldSpec::optional("mount_options").wire("options"),
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

/// NFS storage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageNfsModel {
    #[serde(default)]
    pub id: Attr<String>,
    #[serde(default)]
    pub name: Attr<String>,
    #[serde(default)]
    pub server: Attr<String>,
    #[serde(default)]
    pub export: Attr<String>,
    #[serde(default)]
    pub content: Attr<StringSet>,
    #[serde(default)]
    pub nodes: Attr<StringSet>,
    #[serde(default)]
    pub disable: Attr<bool>,
    #[serde(default)]
    pub preallocation: Attr<String>,
    /// NFS mount options, e.g. `vers=4.2`
    #[serde(default)]
    pub mount_options: Attr<String>,
    #[serde(default, rename = "type")]
    pub storage_type: Attr<String>,
    #[serde(default)]
    pub prune_backups: Attr<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StorageNfs;

impl ResourceKind for StorageNfs {
    type Model = StorageNfsModel;

    fn descriptor() -> &'static ResourceDescriptor {
        &DESCRIPTOR
    }

    fn collection(_model: &StorageNfsModel) -> Result<Collection, ResourceError> {
        Ok(Collection::Storage)
    }

    fn remote_id(model: &StorageNfsModel) -> Result<String, ResourceError> {
        known_identifier("name", &model.name)
    }

    fn create_request(config: &StorageNfsModel) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::create(&DESCRIPTOR)
            .constant("type", FieldValue::Text("nfs".to_string()))
            .field("name", &config.name)
            .field("server", &config.server)
            .field("export", &config.export)
            .field("content", &config.content)
            .field("nodes", &config.nodes)
            .field("disable", &config.disable)
            .field("preallocation", &config.preallocation)
            .field("mount_options", &config.mount_options)
            .build()
    }

    fn update_request(
        prior: &StorageNfsModel,
        config: &StorageNfsModel,
    ) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::update(&DESCRIPTOR)
            .rename(&Self::remote_id(prior)?, &config.name)
            .field("content", &config.content)
            .field("nodes", &config.nodes)
            .field("disable", &config.disable)
            .field("preallocation", &config.preallocation)
            .field("mount_options", &config.mount_options)
            .build()
    }

    fn decode(
        object: &RemoteObject,
        addressed: &StorageNfsModel,
    ) -> Result<StorageNfsModel, ResourceError> {
        let reader = FieldReader::new(object, &DESCRIPTOR);
        let common = CommonFields::decode(&reader)?;
        Ok(StorageNfsModel {
            id: Attr::Known(common.name.clone()),
            name: Attr::Known(common.name),
            server: reader.text("server")?,
            export: reader.text("export")?,
            content: common.content.or_empty_like(&addressed.content),
            nodes: common.nodes.or_empty_like(&addressed.nodes),
            disable: common.disable,
            preallocation: common.preallocation,
            mount_options: reader.text("options")?,
            storage_type: common.storage_type,
            prune_backups: common.prune_backups,
        })
    }

    fn provisional(config: &StorageNfsModel) -> StorageNfsModel {
        StorageNfsModel {
            id: config.name.clone().settle(),
            name: config.name.clone().settle(),
            server: config.server.clone().settle(),
            export: config.export.clone().settle(),
            content: config.content.clone().settle(),
            nodes: config.nodes.clone().settle(),
            disable: config.disable.clone().settle(),
            preallocation: config.preallocation.clone().settle(),
            mount_options: config.mount_options.clone().settle(),
            storage_type: Attr::Known("nfs".to_string()),
            prune_backups: Attr::Null,
        }
    }

    fn from_import_id(id: &str) -> Result<StorageNfsModel, ResourceError> {
        Ok(StorageNfsModel {
            name: Attr::Known(id.to_string()),
            ..StorageNfsModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mount_options_use_wire_name() {
        let config = StorageNfsModel {
            name: "isos".into(),
            server: "10.0.0.5".into(),
            export: "/export/isos".into(),
            mount_options: "vers=4.2".into(),
            ..StorageNfsModel::default()
        };
        let request = StorageNfs::create_request(&config).unwrap();
        assert_eq!(request.text("options"), Some("vers=4.2"));
        assert_eq!(request.text("type"), Some("nfs"));
        assert_eq!(request.text("server"), Some("10.0.0.5"));
    }

    #[test]
    fn test_missing_export_fails_before_request() {
        let config = StorageNfsModel {
            name: "isos".into(),
            server: "10.0.0.5".into(),
            export: Attr::Unknown,
            ..StorageNfsModel::default()
        };
        let err = StorageNfs::create_request(&config).unwrap_err();
        assert_eq!(err.attribute(), Some("export"));
    }

    #[test]
    fn test_decode_nfs_fields() {
        let object = RemoteObject::from_value(json!({
            "storage": "isos",
            "type": "nfs",
            "server": "10.0.0.5",
            "export": "/export/isos",
            "options": "vers=4.2",
            "content": "iso",
        }))
        .unwrap();
        let state = StorageNfs::decode(&object, &StorageNfsModel::default()).unwrap();
        assert_eq!(state.mount_options, Attr::known("vers=4.2"));
        assert_eq!(state.storage_type, Attr::known("nfs"));
        assert_eq!(state.nodes, Attr::Null);
    }
}
