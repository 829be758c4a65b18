use super::DataSourceKind;
use crate::client::{Capability, Collection, RemoteApi};
use crate::error::{Operation, ResourceError};
use crate::model::{Attr, StringSet};
use crate::reconciler::descriptor::{Convergence, FieldSpec, Lookup, ResourceDescriptor};
use crate::reconciler::fields::known_identifier;
use crate::reconciler::FieldReader;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    type_name: "proxmoxve_storage",
    identifier: "name",
    fields: &[
        FieldSpec::required("name").wire("storage"),
        FieldSpec::computed("id"),
        FieldSpec::computed("type"),
        FieldSpec::computed("content"),
        FieldSpec::computed("nodes"),
        FieldSpec::computed("path"),
        FieldSpec::computed("shared"),
        FieldSpec::computed("enabled"),
        FieldSpec::computed("prune_backups").wire("prune-backups"),
        FieldSpec::computed("preallocation"),
    ],
    convergence: Convergence::Immediate,
    capability: Capability::Token,
    lookup: Lookup::Item,
    rename: false,
    not_found: &[],
};

/// Any storage definition, whatever its backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageDataModel {
    #[serde(default)]
    pub name: Attr<String>,
    #[serde(default)]
    pub id: Attr<String>,
    #[serde(default, rename = "type")]
    pub storage_type: Attr<String>,
    #[serde(default)]
    pub content: Attr<StringSet>,
    #[serde(default)]
    pub nodes: Attr<StringSet>,
    #[serde(default)]
    pub path: Attr<String>,
    #[serde(default)]
    pub shared: Attr<bool>,
    #[serde(default)]
    pub enabled: Attr<bool>,
    #[serde(default)]
    pub prune_backups: Attr<String>,
    #[serde(default)]
    pub preallocation: Attr<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StorageData;

#[async_trait]
impl DataSourceKind for StorageData {
    type Model = StorageDataModel;

    fn descriptor() -> &'static ResourceDescriptor {
        &DESCRIPTOR
    }

    fn address(config: &StorageDataModel) -> Result<String, ResourceError> {
        Ok(DESCRIPTOR.address(&known_identifier("name", &config.name)?))
    }

    async fn fetch(
        client: &dyn RemoteApi,
        config: &StorageDataModel,
        address: &str,
    ) -> Result<StorageDataModel, ResourceError> {
        let name = known_identifier("name", &config.name)?;
        let object = client
            .read(&Collection::Storage, &name)
            .await
            .map_err(|err| ResourceError::remote(Operation::Read, address, err))?;
        let reader = FieldReader::new(&object, &DESCRIPTOR);
        // The remote leaves `disable` out for enabled storage
        let enabled = match reader.flag("disable")? {
            Attr::Known(disable) => !disable,
            Attr::Null | Attr::Unknown => true,
        };
        Ok(StorageDataModel {
            id: Attr::Known(name.clone()),
            name: Attr::Known(name),
            storage_type: reader.text("type")?,
            content: reader.set("content")?,
            nodes: reader.set("nodes")?,
            path: reader.text("path")?,
            shared: reader.flag("shared")?,
            enabled: Attr::Known(enabled),
            prune_backups: reader.text("prune-backups")?,
            preallocation: reader.text("preallocation")?,
        })
    }
}
