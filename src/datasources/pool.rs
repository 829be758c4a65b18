use super::DataSourceKind;
use crate::client::{Capability, Collection, RemoteApi};
use crate::error::{Operation, ResourceError};
use crate::model::{Attr, StringSet};
use crate::reconciler::descriptor::{Convergence, FieldSpec, Lookup, ResourceDescriptor};
use crate::reconciler::fields::known_identifier;
use crate::reconciler::FieldReader;
use crate::resources::pool::member_ids;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    type_name: "proxmoxve_pool",
    identifier: "pool_id",
    fields: &[
        FieldSpec::required("pool_id").wire("poolid"),
        FieldSpec::computed("id"),
        FieldSpec::computed("comment"),
        FieldSpec::computed("members"),
    ],
    convergence: Convergence::Immediate,
    capability: Capability::Token,
    lookup: Lookup::Item,
    rename: false,
    not_found: &[],
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolDataModel {
    #[serde(default)]
    pub pool_id: Attr<String>,
    #[serde(default)]
    pub id: Attr<String>,
    #[serde(default)]
    pub comment: Attr<String>,
    #[serde(default)]
    pub members: Attr<StringSet>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PoolData;

#[async_trait]
impl DataSourceKind for PoolData {
    type Model = PoolDataModel;

    fn descriptor() -> &'static ResourceDescriptor {
        &DESCRIPTOR
    }

    fn address(config: &PoolDataModel) -> Result<String, ResourceError> {
        Ok(DESCRIPTOR.address(&known_identifier("pool_id", &config.pool_id)?))
    }

    async fn fetch(
        client: &dyn RemoteApi,
        config: &PoolDataModel,
        address: &str,
    ) -> Result<PoolDataModel, ResourceError> {
        let pool_id = known_identifier("pool_id", &config.pool_id)?;
        let object = client
            .read(&Collection::Pools, &pool_id)
            .await
            .map_err(|err| ResourceError::remote(Operation::Read, address, err))?;
        let reader = FieldReader::new(&object, &DESCRIPTOR);
        Ok(PoolDataModel {
            id: Attr::Known(pool_id.clone()),
            pool_id: Attr::Known(pool_id),
            comment: reader.text("comment")?,
            members: member_ids(&reader)?,
        })
    }
}
