use crate::client::{Capability, Collection, RemoteObject, WriteRequest};
use crate::error::ResourceError;
use crate::model::Attr;
use crate::reconciler::descriptor::{Convergence, FieldSpec, Lookup, ResourceDescriptor};
use crate::reconciler::fields::{known_identifier, FieldReader, RequestBuilder};
use crate::reconciler::ResourceKind;
use serde::{Deserialize, Serialize};

static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    type_name: "proxmoxve_firewall_group",
    identifier: "name",
    fields: &[
        FieldSpec::required("name").wire("group"),
        FieldSpec::optional("comment"),
        FieldSpec::computed("id"),
        FieldSpec::computed("digest"),
    ],
    convergence: Convergence::Immediate,
    capability: Capability::Token,
    lookup: Lookup::Scan { key: "group" },
    rename: true,
    not_found: &["no such security group '{id}'"],
};

/// Security group; its rules are managed elsewhere
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallGroupModel {
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
pub struct FirewallGroup;

impl ResourceKind for FirewallGroup {
    type Model = FirewallGroupModel;

    fn descriptor() -> &'static ResourceDescriptor {
        &DESCRIPTOR
    }

    fn collection(_model: &FirewallGroupModel) -> Result<Collection, ResourceError> {
        Ok(Collection::FirewallGroups)
    }

    fn remote_id(model: &FirewallGroupModel) -> Result<String, ResourceError> {
        known_identifier("name", &model.name)
    }

    fn create_request(config: &FirewallGroupModel) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::create(&DESCRIPTOR)
            .field("name", &config.name)
            .field("comment", &config.comment)
            .build()
    }

    fn update_request(
        prior: &FirewallGroupModel,
        config: &FirewallGroupModel,
    ) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::update(&DESCRIPTOR)
            .rename(&Self::remote_id(prior)?, &config.name)
            .field("comment", &config.comment)
            .build()
    }

    fn decode(
        object: &RemoteObject,
        _addressed: &FirewallGroupModel,
    ) -> Result<FirewallGroupModel, ResourceError> {
        let reader = FieldReader::new(object, &DESCRIPTOR);
        let name = reader.required_text("group")?;
        Ok(FirewallGroupModel {
            id: Attr::Known(name.clone()),
            name: Attr::Known(name),
            comment: reader.text("comment")?,
            digest: reader.text("digest")?,
        })
    }

    fn provisional(config: &FirewallGroupModel) -> FirewallGroupModel {
        FirewallGroupModel {
            id: config.name.clone().settle(),
            name: config.name.clone().settle(),
            comment: config.comment.clone().settle(),
            digest: Attr::Null,
        }
    }

    fn from_import_id(id: &str) -> Result<FirewallGroupModel, ResourceError> {
        Ok(FirewallGroupModel {
            name: Attr::Known(id.to_string()),
            ..FirewallGroupModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_name_goes_out_as_group() {
        let config = FirewallGroupModel {
            name: "web".into(),
            comment: "frontends".into(),
            ..FirewallGroupModel::default()
        };
        let request = FirewallGroup::create_request(&config).unwrap();
        assert_eq!(request.text("group"), Some("web"));
        assert_eq!(request.text("comment"), Some("frontends"));
        assert!(request.get("name").is_none());
    }

    #[test]
    fn test_decode_list_entry() {
        let object = RemoteObject::from_value(json!({
            "group": "web",
            "digest": "0a1b",
        }))
        .unwrap();
        let state = FirewallGroup::decode(&object, &FirewallGroupModel::default()).unwrap();
        assert_eq!(state.id, Attr::known("web"));
        assert_eq!(state.comment, Attr::Null);
        assert_eq!(state.digest, Attr::known("0a1b"));
    }
}
