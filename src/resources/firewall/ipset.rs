use crate::client::{Capability, Collection, RemoteObject, WriteRequest};
use crate::error::ResourceError;
use crate::model::Attr;
use crate::reconciler::descriptor::{Convergence, FieldSpec, Lookup, ResourceDescriptor};
use crate::reconciler::fields::{known_identifier, FieldReader, RequestBuilder};
use crate::reconciler::ResourceKind;
use serde::{Deserialize, Serialize};

static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    type_name: "proxmoxve_firewall_ipset",
    identifier: "name",
    fields: &[
        FieldSpec::required("name"),
        FieldSpec::optional("comment"),
        FieldSpec::computed("id"),
        FieldSpec::computed("digest"),
    ],
    convergence: Convergence::Immediate,
    capability: Capability::Token,
    lookup: Lookup::Scan { key: "name" },
    rename: true,
    not_found: &["no such IPSet '{id}'"],
};

/// Named set of addresses; members are `proxmoxve_firewall_ipset_cidr`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallIpSetModel {
    #[serde(default)]
    pub id: Attr<String>,
    #[serde(default)]
    pub name: Attr<String>,
    #[serde(default)]
    pub comment: Attr<String>,
    #[serde(default)]
    pub digest: Attr<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FirewallIpSet;

impl ResourceKind for FirewallIpSet {
    type Model = FirewallIpSetModel;

    fn descriptor() -> &'static ResourceDescriptor {
        &DESCRIPTOR
    }

    fn collection(_model: &FirewallIpSetModel) -> Result<Collection, ResourceError> {
        Ok(Collection::FirewallIpSets)
    }

    fn remote_id(model: &FirewallIpSetModel) -> Result<String, ResourceError> {
        known_identifier("name", &model.name)
    }

    fn create_request(config: &FirewallIpSetModel) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::create(&DESCRIPTOR)
            .field("name", &config.name)
            .field("comment", &config.comment)
            .build()
    }

    fn update_request(
        prior: &FirewallIpSetModel,
        config: &FirewallIpSetModel,
    ) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::update(&DESCRIPTOR)
            .rename(&Self::remote_id(prior)?, &config.name)
            .field("comment", &config.comment)
            .build()
    }

    fn decode(
        object: &RemoteObject,
        _addressed: &FirewallIpSetModel,
    ) -> Result<FirewallIpSetModel, ResourceError> {
        let reader = FieldReader::new(object, &DESCRIPTOR);
        let name = reader.required_text("name")?;
        Ok(FirewallIpSetModel {
            id: Attr::Known(name.clone()),
            name: Attr::Known(name),
            comment: reader.text("comment")?,
            digest: reader.text("digest")?,
        })
    }

    fn provisional(config: &FirewallIpSetModel) -> FirewallIpSetModel {
        FirewallIpSetModel {
            id: config.name.clone().settle(),
            name: config.name.clone().settle(),
            comment: config.comment.clone().settle(),
            digest: Attr::Null,
        }
    }

    fn from_import_id(id: &str) -> Result<FirewallIpSetModel, ResourceError> {
        Ok(FirewallIpSetModel {
            name: Attr::Known(id.to_string()),
            ..FirewallIpSetModel::default()
        })
    }
}
