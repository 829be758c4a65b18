use crate::client::{Capability, Collection, RemoteObject, WriteRequest};
use crate::error::ResourceError;
use crate::model::Attr;
use crate::reconciler::descriptor::{Convergence, FieldSpec, Lookup, ResourceDescriptor};
use crate::reconciler::fields::{known_identifier, FieldReader, RequestBuilder};
use crate::reconciler::ResourceKind;
use serde::{Deserialize, Serialize};

static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    type_name: "proxmoxve_firewall_alias",
    identifier: "name",
    fields: &[
        FieldSpec::required("name"),
        FieldSpec::required("cidr"),
        FieldSpec::optional("comment"),
        FieldSpec::computed("id"),
        FieldSpec::computed("digest"),
    ],
    convergence: Convergence::Immediate,
    capability: Capability::Token,
    lookup: Lookup::Item,
    rename: true,
    not_found: &["no such alias '{id}'"],
};

/// Named IP address or network usable in firewall rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallAliasModel {
    #[serde(default)]
    pub id: Attr<String>,
    #[serde(default)]
    pub name: Attr<String>,
    #[serde(default)]
    pub cidr: Attr<String>,
    #[serde(default)]
    pub comment: Attr<String>,
    #[serde(default)]
    pub digest: Attr<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FirewallAlias;

impl ResourceKind for FirewallAlias {
    type Model = FirewallAliasModel;

    fn descriptor() -> &'static ResourceDescriptor {
        &DESCRIPTOR
    }

    fn collection(_model: &FirewallAliasModel) -> Result<Collection, ResourceError> {
        Ok(Collection::FirewallAliases)
    }

    fn remote_id(model: &FirewallAliasModel) -> Result<String, ResourceError> {
        known_identifier("name", &model.name)
    }

    fn create_request(config: &FirewallAliasModel) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::create(&DESCRIPTOR)
            .field("name", &config.name)
            .field("cidr", &config.cidr)
            .field("comment", &config.comment)
            .build()
    }

    fn update_request(
        prior: &FirewallAliasModel,
        config: &FirewallAliasModel,
    ) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::update(&DESCRIPTOR)
            .rename(&Self::remote_id(prior)?, &config.name)
            .field("cidr", &config.cidr)
            .field("comment", &config.comment)
            .build()
    }

    fn decode(
        object: &RemoteObject,
        _addressed: &FirewallAliasModel,
    ) -> Result<FirewallAliasModel, ResourceError> {
        let reader = FieldReader::new(object, &DESCRIPTOR);
        let name = reader.required_text("name")?;
        Ok(FirewallAliasModel {
            id: Attr::Known(name.clone()),
            name: Attr::Known(name),
            cidr: reader.text("cidr")?,
            comment: reader.text("comment")?,
            digest: reader.text("digest")?,
        })
    }

    fn provisional(config: &FirewallAliasModel) -> FirewallAliasModel {
        FirewallAliasModel {
            id: config.name.clone().settle(),
            name: config.name.clone().settle(),
            cidr: config.cidr.clone().settle(),
            comment: config.comment.clone().settle(),
            digest: Attr::Null,
        }
    }

    fn from_import_id(id: &str) -> Result<FirewallAliasModel, ResourceError> {
        Ok(FirewallAliasModel {
            name: Attr::Known(id.to_string()),
            ..FirewallAliasModel::default()
        })
    }
}
