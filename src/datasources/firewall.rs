use super::DataSourceKind;
use crate::client::{Capability, Collection, RemoteApi, RemoteObject};
use crate::error::{Operation, ResourceError};
use crate::model::Attr;
use crate::reconciler::descriptor::{Convergence, FieldSpec, Lookup, ResourceDescriptor};
use crate::reconciler::fields::known_identifier;
use crate::reconciler::FieldReader;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

static ALIAS: ResourceDescriptor = ResourceDescriptor {
    type_name: "proxmoxve_firewall_alias",
    identifier: "name",
    fields: &[
        FieldSpec::required("name"),
        FieldSpec::computed("id"),
        FieldSpec::computed("cidr"),
        FieldSpec::computed("comment"),
        FieldSpec::computed("digest"),
    ],
    convergence: Convergence::Immediate,
    capability: Capability::Token,
    lookup: Lookup::Item,
    rename: false,
    not_found: &[],
};

static REFS: ResourceDescriptor = ResourceDescriptor {
    type_name: "proxmoxve_firewall_refs",
    identifier: "id",
    fields: &[
        FieldSpec::optional("type"),
        FieldSpec::computed("id"),
        FieldSpec::computed("refs"),
    ],
    convergence: Convergence::Immediate,
    capability: Capability::Token,
    lookup: Lookup::Item,
    rename: false,
    not_found: &[],
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallAliasDataModel {
    #[serde(default)]
    pub name: Attr<String>,
    #[serde(default)]
    pub id: Attr<String>,
    #[serde(default)]
    pub cidr: Attr<String>,
    #[serde(default)]
    pub comment: Attr<String>,
    #[serde(default)]
    pub digest: Attr<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FirewallAliasData;

#[async_trait]
impl DataSourceKind for FirewallAliasData {
    type Model = FirewallAliasDataModel;

    fn descriptor() -> &'static ResourceDescriptor {
        &ALIAS
    }

    fn address(config: &FirewallAliasDataModel) -> Result<String, ResourceError> {
        Ok(ALIAS.address(&known_identifier("name", &config.name)?))
    }

    async fn fetch(
        client: &dyn RemoteApi,
        config: &FirewallAliasDataModel,
        address: &str,
    ) -> Result<FirewallAliasDataModel, ResourceError> {
        let name = known_identifier("name", &config.name)?;
        let object = client
            .read(&Collection::FirewallAliases, &name)
            .await
            .map_err(|err| ResourceError::remote(Operation::Read, address, err))?;
        let reader = FieldReader::new(&object, &ALIAS);
        Ok(FirewallAliasDataModel {
            id: Attr::Known(name.clone()),
            name: Attr::Known(name),
            cidr: reader.text("cidr")?,
            comment: reader.text("comment")?,
            digest: reader.text("digest")?,
        })
    }
}

/// Alias or IP set that firewall rules can reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRef {
    pub name: String,
    /// Reference as written in a rule, e.g. `+blocklist`
    #[serde(rename = "ref")]
    pub reference: String,
    /// `alias` or `ipset`
    #[serde(rename = "type")]
    pub ref_type: String,
    #[serde(default)]
    pub comment: Attr<String>,
}

impl FirewallRef {
    fn decode(object: &RemoteObject) -> Result<Self, ResourceError> {
        let reader = FieldReader::new(object, &REFS);
        Ok(Self {
            name: reader.required_text("name")?,
            reference: reader.required_text("ref")?,
            ref_type: reader.required_text("type")?,
            comment: reader.text("comment")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallRefsModel {
    /// Time of the read; the list has no natural identifier
    #[serde(default)]
    pub id: Attr<String>,
    /// Only list references of this type (`alias` or `ipset`)
    #[serde(default, rename = "type")]
    pub ref_type: Attr<String>,
    #[serde(default)]
    pub refs: Vec<FirewallRef>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FirewallRefs;

#[async_trait]
impl DataSourceKind for FirewallRefs {
    type Model = FirewallRefsModel;

    fn descriptor() -> &'static ResourceDescriptor {
        &REFS
    }

    fn address(_config: &FirewallRefsModel) -> Result<String, ResourceError> {
        Ok(REFS.type_name.to_string())
    }

    async fn fetch(
        client: &dyn RemoteApi,
        config: &FirewallRefsModel,
        address: &str,
    ) -> Result<FirewallRefsModel, ResourceError> {
        let filter = match &config.ref_type {
            Attr::Known(ref_type) => Some(ref_type.as_str()),
            Attr::Null => None,
            Attr::Unknown => {
                return Err(ResourceError::configuration(
                    "type",
                    "must be known before apply",
                ))
            }
        };
        let objects = client
            .list(&Collection::FirewallRefs)
            .await
            .map_err(|err| ResourceError::remote(Operation::Read, address, err))?;

        let mut refs = Vec::with_capacity(objects.len());
        for object in &objects {
            let entry = FirewallRef::decode(object)?;
            if filter.is_none_or(|wanted| entry.ref_type == wanted) {
                refs.push(entry);
            }
        }

        Ok(FirewallRefsModel {
            id: Attr::Known(chrono::Utc::now().to_rfc3339()),
            ref_type: config.ref_type.clone(),
            refs,
        })
    }
}
