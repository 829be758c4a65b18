use super::{CommonFields, NOT_FOUND};
use crate::client::{Capability, Collection, FieldValue, RemoteObject, WriteRequest};
use crate::error::ResourceError;
use crate::model::{Attr, StringSet};
use crate::reconciler::descriptor::{Convergence, FieldSpec, Lookup, ResourceDescriptor};
use crate::reconciler::fields::{known_identifier, FieldReader, RequestBuilder};
use crate::reconciler::ResourceKind;
use serde::{Deserialize, Serialize};

static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    type_name: "proxmoxve_storage_dir",
    identifier: "name",
    fields: &[
        FieldSpec::required("name").wire("storage"),
        FieldSpec::required("path"),
        FieldSpec::optional("content").repeated(),
        FieldSpec::optional("nodes").repeated(),
        FieldSpec::optional("disable"),
        FieldSpec::optional("shared"),
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

/// Directory storage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageDirModel {
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
    pub shared: Attr<bool>,
    #[serde(default)]
    pub preallocation: Attr<String>,
    #[serde(default, rename = "type")]
    pub storage_type: Attr<String>,
    #[serde(default)]
    pub prune_backups: Attr<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StorageDir;

impl ResourceKind for StorageDir {
    type Model = StorageDirModel;

    fn descriptor() -> &'static ResourceDescriptor {
        &DESCRIPTOR
    }

    fn collection(_model: &StorageDirModel) -> Result<Collection, ResourceError> {
        Ok(Collection::Storage)
    }

    fn remote_id(model: &StorageDirModel) -> Result<String, ResourceError> {
        known_identifier("name", &model.name)
    }

    fn create_request(config: &StorageDirModel) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::create(&DESCRIPTOR)
            .constant("type", FieldValue::Text("dir".to_string()))
            .field("name", &config.name)
            .field("path", &config.path)
            .field("content", &config.content)
            .field("nodes", &config.nodes)
            .field("disable", &config.disable)
            .field("shared", &config.shared)
            .field("preallocation", &config.preallocation)
            .build()
    }

    fn update_request(
        prior: &StorageDirModel,
        config: &StorageDirModel,
    ) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::update(&DESCRIPTOR)
            .rename(&Self::remote_id(prior)?, &config.name)
            .field("content", &config.content)
            .field("nodes", &config.nodes)
            .field("disable", &config.disable)
            .field("shared", &config.shared)
            .field("preallocation", &config.preallocation)
            .build()
    }

    fn decode(
        object: &RemoteObject,
        addressed: &StorageDirModel,
    ) -> Result<StorageDirModel, ResourceError> {
        let reader = FieldReader::new(object, &DESCRIPTOR);
        let common = CommonFields::decode(&reader)?;
        Ok(StorageDirModel {
            id: Attr::Known(common.name.clone()),
            name: Attr::Known(common.name),
            path: reader.text("path")?,
            content: common.content.or_empty_like(&addressed.content),
            nodes: common.nodes.or_empty_like(&addressed.nodes),
            disable: common.disable,
            shared: reader.flag("shared")?,
            preallocation: common.preallocation,
            storage_type: common.storage_type,
            prune_backups: common.prune_backups,
        })
    }

    fn provisional(config: &StorageDirModel) -> StorageDirModel {
        StorageDirModel {
            id: config.name.clone().settle(),
            name: config.name.clone().settle(),
            path: config.path.clone().settle(),
            content: config.content.clone().settle(),
            nodes: config.nodes.clone().settle(),
            disable: config.disable.clone().settle(),
            shared: config.shared.clone().settle(),
            preallocation: config.preallocation.clone().settle(),
            storage_type: Attr::Known("dir".to_string()),
            prune_backups: Attr::Null,
        }
    }

    fn from_import_id(id: &str) -> Result<StorageDirModel, ResourceError> {
        Ok(StorageDirModel {
            name: Attr::Known(id.to_string()),
            ..StorageDirModel::default()
        })
    }
}
