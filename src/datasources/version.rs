use super::DataSourceKind;
use crate::client::{Capability, Collection, RemoteApi};
use crate::error::{Operation, ResourceError};
use crate::model::Attr;
use crate::reconciler::descriptor::{Convergence, FieldSpec, Lookup, ResourceDescriptor};
use crate::reconciler::FieldReader;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    type_name: "proxmoxve_version",
    identifier: "id",
    fields: &[
        FieldSpec::computed("id"),
        FieldSpec::computed("version"),
        FieldSpec::computed("release"),
        FieldSpec::computed("repoid"),
    ],
    convergence: Convergence::Immediate,
    capability: Capability::Token,
    lookup: Lookup::Item,
    rename: false,
    not_found: &[],
};

/// API version of the cluster node answering the request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionModel {
    #[serde(default)]
    pub id: Attr<String>,
    #[serde(default)]
    pub version: Attr<String>,
    #[serde(default)]
    pub release: Attr<String>,
    #[serde(default)]
    pub repoid: Attr<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Version;

#[async_trait]
impl DataSourceKind for Version {
    type Model = VersionModel;

    fn descriptor() -> &'static ResourceDescriptor {
        &DESCRIPTOR
    }

    fn address(_config: &VersionModel) -> Result<String, ResourceError> {
        Ok(DESCRIPTOR.type_name.to_string())
    }

    async fn fetch(
        client: &dyn RemoteApi,
        _config: &VersionModel,
        address: &str,
    ) -> Result<VersionModel, ResourceError> {
        let object = client
            .get(&Collection::Version)
            .await
            .map_err(|err| ResourceError::remote(Operation::Read, address, err))?;
        let reader = FieldReader::new(&object, &DESCRIPTOR);
        let version = reader.required_text("version")?;
        Ok(VersionModel {
            id: Attr::Known(version.clone()),
            version: Attr::Known(version),
            release: reader.text("release")?,
            repoid: reader.text("repoid")?,
        })
    }
}
