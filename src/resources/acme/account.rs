use crate::client::{Capability, Collection, RemoteObject, WriteRequest};
use crate::config::ConvergenceTimeouts;
use crate::constants::{ACME_ACCOUNT_CREATE_TIMEOUT_SECS, DEFAULT_READ_CONVERGENCE_TIMEOUT_SECS};
use crate::error::ResourceError;
use crate::model::Attr;
use crate::reconciler::descriptor::{Convergence, FieldSpec, Lookup, ResourceDescriptor};
use crate::reconciler::fields::{known_identifier, FieldReader, RequestBuilder};
use crate::reconciler::ResourceKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const MAILTO: &str = "mailto:";

static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    type_name: "proxmoxve_acme_account",
    identifier: "name",
    fields: &[
        FieldSpec::required("name"),
        FieldSpec::required("contact"),
        FieldSpec::optional("directory"),
        FieldSpec::optional("tos_url"),
        FieldSpec::computed("id"),
        FieldSpec::computed("location"),
    ],
    convergence: Convergence::Eventual(ConvergenceTimeouts {
        create: Duration::from_secs(ACME_ACCOUNT_CREATE_TIMEOUT_SECS),
        read: Duration::from_secs(DEFAULT_READ_CONVERGENCE_TIMEOUT_SECS),
    }),
    capability: Capability::Privileged,
    lookup: Lookup::Item,
    rename: false,
    not_found: &["ACME account config file '{id}' does not exist"],
};

/// ACME account registered with a certificate authority
///
/// Registration happens in a background task; until it finishes the remote
/// reports the account without directory, location or terms of service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcmeAccountModel {
    #[serde(default)]
    pub id: Attr<String>,
    #[serde(default)]
    pub name: Attr<String>,
    /// Contact e-mail address(es), comma-separated, without `mailto:`
    #[serde(default)]
    pub contact: Attr<String>,
    /// ACME directory URL; the remote picks Let's Encrypt when unset
    #[serde(default)]
    pub directory: Attr<String>,
    /// Terms of service URL the account agreed to
    #[serde(default)]
    pub tos_url: Attr<String>,
    #[serde(default)]
    pub location: Attr<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AcmeAccount;

/// Contacts listed under `account.contact`, with the `mailto:` prefix removed
fn contacts(object: &RemoteObject) -> Option<Vec<String>> {
    let list = object.get("account")?.get("contact")?.as_array()?;
    Some(
        list.iter()
            .filter_map(Value::as_str)
            .map(|contact| contact.strip_prefix(MAILTO).unwrap_or(contact).to_string())
            .collect(),
    )
}

fn non_empty(object: &RemoteObject, field: &str) -> bool {
    object
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|value| !value.is_empty())
}

impl ResourceKind for AcmeAccount {
    type Model = AcmeAccountModel;

    fn descriptor() -> &'static ResourceDescriptor {
        &DESCRIPTOR
    }

    fn collection(_model: &AcmeAccountModel) -> Result<Collection, ResourceError> {
        Ok(Collection::AcmeAccounts)
    }

    fn remote_id(model: &AcmeAccountModel) -> Result<String, ResourceError> {
        known_identifier("name", &model.name)
    }

    fn create_request(config: &AcmeAccountModel) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::create(&DESCRIPTOR)
            .field("name", &config.name)
            .field("contact", &config.contact)
            .field("directory", &config.directory)
            .field("tos_url", &config.tos_url)
            .build()
    }

    fn update_request(
        prior: &AcmeAccountModel,
        config: &AcmeAccountModel,
    ) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::update(&DESCRIPTOR)
            .rename(&Self::remote_id(prior)?, &config.name)
            .field("contact", &config.contact)
            .build()
    }

    fn decode(
        object: &RemoteObject,
        addressed: &AcmeAccountModel,
    ) -> Result<AcmeAccountModel, ResourceError> {
        let reader = FieldReader::new(object, &DESCRIPTOR);
        let name = known_identifier("name", &addressed.name)?;
        let contact = match contacts(object) {
            Some(list) if !list.is_empty() => Attr::Known(list.join(",")),
            Some(_) | None => Attr::Null,
        };
        Ok(AcmeAccountModel {
            id: Attr::Known(name.clone()),
            name: Attr::Known(name),
            contact,
            directory: reader.text("directory")?,
            tos_url: reader.text("tos")?,
            location: reader.text("location")?,
        })
    }

    fn converged(object: &RemoteObject) -> bool {
        non_empty(object, "directory")
            && non_empty(object, "location")
            && non_empty(object, "tos")
            && contacts(object).is_some()
    }

    fn provisional(config: &AcmeAccountModel) -> AcmeAccountModel {
        AcmeAccountModel {
            id: config.name.clone().settle(),
            name: config.name.clone().settle(),
            contact: config.contact.clone().settle(),
            directory: config.directory.clone().settle(),
            tos_url: config.tos_url.clone().settle(),
            location: Attr::Null,
        }
    }

    fn from_import_id(id: &str) -> Result<AcmeAccountModel, ResourceError> {
        Ok(AcmeAccountModel {
            name: Attr::Known(id.to_string()),
            ..AcmeAccountModel::default()
        })
    }
}
