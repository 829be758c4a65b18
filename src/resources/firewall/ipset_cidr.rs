use crate::client::{Capability, Collection, RemoteObject, WriteRequest};
use crate::error::ResourceError;
use crate::model::Attr;
use crate::reconciler::descriptor::{Convergence, FieldSpec, Lookup, ResourceDescriptor};
use crate::reconciler::fields::{known_identifier, FieldReader, RequestBuilder};
use crate::reconciler::ResourceKind;
use serde::{Deserialize, Serialize};

const IMPORT_FORMAT: &str = "<ipset_name>/<cidr>";

static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    type_name: "proxmoxve_firewall_ipset_cidr",
    identifier: "cidr",
    fields: &[
        // Addressed through the collection path, never sent as a field
        FieldSpec::required("ipset_name"),
        FieldSpec::required("cidr"),
        FieldSpec::optional("no_match").wire("nomatch"),
        FieldSpec::optional("comment"),
        FieldSpec::computed("id"),
        FieldSpec::computed("digest"),
    ],
    convergence: Convergence::Immediate,
    capability: Capability::Token,
    lookup: Lookup::Item,
    rename: false,
    not_found: &["no such IP/Network", "no such IPSet"],
};

/// One address or network inside an IP set
///
/// The `id` is `<ipset_name>/<cidr>`, which is also the import format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallIpSetCidrModel {
    #[serde(default)]
    pub id: Attr<String>,
    #[serde(default)]
    pub ipset_name: Attr<String>,
    #[serde(default)]
    pub cidr: Attr<String>,
    /// Exclude the network from the set instead of including it
    #[serde(default)]
    pub no_match: Attr<bool>,
    #[serde(default)]
    pub comment: Attr<String>,
    #[serde(default)]
    pub digest: Attr<String>,
}

fn compound_id(ipset_name: &str, cidr: &str) -> String {
    format!("{ipset_name}/{cidr}")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FirewallIpSetCidr;

impl ResourceKind for FirewallIpSetCidr {
    type Model = FirewallIpSetCidrModel;

    fn descriptor() -> &'static ResourceDescriptor {
        &DESCRIPTOR
    }

    fn collection(model: &FirewallIpSetCidrModel) -> Result<Collection, ResourceError> {
        Ok(Collection::FirewallIpSet {
            name: known_identifier("ipset_name", &model.ipset_name)?,
        })
    }

    fn remote_id(model: &FirewallIpSetCidrModel) -> Result<String, ResourceError> {
        known_identifier("cidr", &model.cidr)
    }

    // The same network can sit in several sets
    fn address(model: &FirewallIpSetCidrModel) -> Result<String, ResourceError> {
        let ipset_name = known_identifier("ipset_name", &model.ipset_name)?;
        Ok(DESCRIPTOR.address(&compound_id(&ipset_name, &Self::remote_id(model)?)))
    }

    fn create_request(config: &FirewallIpSetCidrModel) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::create(&DESCRIPTOR)
            .addressed("ipset_name", &config.ipset_name)
            .field("cidr", &config.cidr)
            .field("no_match", &config.no_match)
            .field("comment", &config.comment)
            .build()
    }

    fn update_request(
        prior: &FirewallIpSetCidrModel,
        config: &FirewallIpSetCidrModel,
    ) -> Result<WriteRequest, ResourceError> {
        let prior_set = known_identifier("ipset_name", &prior.ipset_name)?;
        let desired_set = known_identifier("ipset_name", &config.ipset_name)?;
        if prior_set != desired_set {
            return Err(ResourceError::configuration(
                "ipset_name",
                format!("cannot move an entry from '{prior_set}' to '{desired_set}' in place"),
            ));
        }
        RequestBuilder::update(&DESCRIPTOR)
            .rename(&Self::remote_id(prior)?, &config.cidr)
            .field("no_match", &config.no_match)
            .field("comment", &config.comment)
            .build()
    }

    fn decode(
        object: &RemoteObject,
        addressed: &FirewallIpSetCidrModel,
    ) -> Result<FirewallIpSetCidrModel, ResourceError> {
        let reader = FieldReader::new(object, &DESCRIPTOR);
        let ipset_name = known_identifier("ipset_name", &addressed.ipset_name)?;
        let cidr = reader.required_text("cidr")?;
        Ok(FirewallIpSetCidrModel {
            id: Attr::Known(compound_id(&ipset_name, &cidr)),
            ipset_name: Attr::Known(ipset_name),
            cidr: Attr::Known(cidr),
            no_match: reader.flag("nomatch")?,
            comment: reader.text("comment")?,
            digest: reader.text("digest")?,
        })
    }

    fn provisional(config: &FirewallIpSetCidrModel) -> FirewallIpSetCidrModel {
        let id = match (config.ipset_name.as_deref(), config.cidr.as_deref()) {
            (Some(ipset_name), Some(cidr)) => Attr::Known(compound_id(ipset_name, cidr)),
            _ => Attr::Null,
        };
        FirewallIpSetCidrModel {
            id,
            ipset_name: config.ipset_name.clone().settle(),
            cidr: config.cidr.clone().settle(),
            no_match: config.no_match.clone().settle(),
            comment: config.comment.clone().settle(),
            digest: Attr::Null,
        }
    }

    fn from_import_id(id: &str) -> Result<FirewallIpSetCidrModel, ResourceError> {
        let invalid = || ResourceError::InvalidImportId {
            id: id.to_string(),
            expected: IMPORT_FORMAT,
        };
        // CIDRs contain a slash themselves, so only the first one separates
        let (ipset_name, cidr) = id.split_once('/').ok_or_else(invalid)?;
        if ipset_name.is_empty() || cidr.is_empty() {
            return Err(invalid());
        }
        Ok(FirewallIpSetCidrModel {
            ipset_name: Attr::Known(ipset_name.to_string()),
            cidr: Attr::Known(cidr.to_string()),
            ..FirewallIpSetCidrModel::default()
        })
    }
}
