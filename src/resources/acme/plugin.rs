use crate::client::{Capability, Collection, RemoteObject, WriteRequest};
use crate::config::ConvergenceTimeouts;
use crate::constants::{ACME_PLUGIN_CREATE_TIMEOUT_SECS, DEFAULT_READ_CONVERGENCE_TIMEOUT_SECS};
use crate::error::ResourceError;
use crate::model::{Attr, StringSet};
use crate::reconciler::descriptor::{Convergence, FieldSpec, Lookup, ResourceDescriptor};
use crate::reconciler::fields::{known_identifier, FieldReader, RequestBuilder};
use crate::reconciler::ResourceKind;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;

static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    type_name: "proxmoxve_acme_plugin",
    identifier: "name",
    fields: &[
        FieldSpec::required("name").wire("id"),
        FieldSpec::required("type"),
        FieldSpec::optional("api").delete_if_null(),
        FieldSpec::optional("data").delete_if_null(),
        FieldSpec::optional("disable").delete_if_null(),
        FieldSpec::optional("nodes").delete_if_null(),
        FieldSpec::computed("id"),
    ],
    convergence: Convergence::Eventual(ConvergenceTimeouts {
        create: Duration::from_secs(ACME_PLUGIN_CREATE_TIMEOUT_SECS),
        read: Duration::from_secs(DEFAULT_READ_CONVERGENCE_TIMEOUT_SECS),
    }),
    capability: Capability::Privileged,
    lookup: Lookup::Item,
    rename: false,
    not_found: &["ACME plugin '{id}' does not exist"],
};

/// ACME DNS challenge plugin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcmePluginModel {
    #[serde(default)]
    pub id: Attr<String>,
    #[serde(default)]
    pub name: Attr<String>,
    #[serde(default, rename = "type")]
    pub plugin_type: Attr<String>,
    /// DNS API the plugin talks to, e.g. `cf`
    #[serde(default)]
    pub api: Attr<String>,
    /// Base64-encoded plugin configuration (credentials and such)
    #[serde(default)]
    pub data: Attr<String>,
    #[serde(default)]
    pub disable: Attr<bool>,
    #[serde(default)]
    pub nodes: Attr<StringSet>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AcmePlugin;

impl ResourceKind for AcmePlugin {
    type Model = AcmePluginModel;

    fn descriptor() -> &'static ResourceDescriptor {
        &DESCRIPTOR
    }

    fn collection(_model: &AcmePluginModel) -> Result<Collection, ResourceError> {
        Ok(Collection::AcmePlugins)
    }

    fn remote_id(model: &AcmePluginModel) -> Result<String, ResourceError> {
        known_identifier("name", &model.name)
    }

    fn create_request(config: &AcmePluginModel) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::create(&DESCRIPTOR)
            .field("name", &config.name)
            .field("type", &config.plugin_type)
            .field("api", &config.api)
            .field("data", &config.data)
            .field("disable", &config.disable)
            .field("nodes", &config.nodes)
            .sensitive("data")
            .build()
    }

    fn update_request(
        prior: &AcmePluginModel,
        config: &AcmePluginModel,
    ) -> Result<WriteRequest, ResourceError> {
        RequestBuilder::update(&DESCRIPTOR)
            .rename(&Self::remote_id(prior)?, &config.name)
            .field("api", &config.api)
            .field("data", &config.data)
            .field("disable", &config.disable)
            .field("nodes", &config.nodes)
            .sensitive("data")
            .build()
    }

    fn decode(
        object: &RemoteObject,
        addressed: &AcmePluginModel,
    ) -> Result<AcmePluginModel, ResourceError> {
        let reader = FieldReader::new(object, &DESCRIPTOR);
        let name = match reader.text("plugin")? {
            Attr::Known(name) => name,
            _ => known_identifier("name", &addressed.name)?,
        };
        // The remote hands back the decoded configuration
        let data = match reader.text("data")? {
            Attr::Known(plain) => Attr::Known(STANDARD.encode(plain.as_bytes())),
            other => other,
        };
        Ok(AcmePluginModel {
            id: Attr::Known(name.clone()),
            name: Attr::Known(name),
            plugin_type: reader.text("type")?,
            api: reader.text("api")?,
            data,
            disable: reader.flag("disable")?,
            nodes: reader.set("nodes")?.or_empty_like(&addressed.nodes),
        })
    }

    fn provisional(config: &AcmePluginModel) -> AcmePluginModel {
        AcmePluginModel {
            id: config.name.clone().settle(),
            name: config.name.clone().settle(),
            plugin_type: config.plugin_type.clone().settle(),
            api: config.api.clone().settle(),
            data: config.data.clone().settle(),
            disable: config.disable.clone().settle(),
            nodes: config.nodes.clone().settle(),
        }
    }

    fn from_import_id(id: &str) -> Result<AcmePluginModel, ResourceError> {
        Ok(AcmePluginModel {
            name: Attr::Known(id.to_string()),
            ..AcmePluginModel::default()
        })
    }
}
