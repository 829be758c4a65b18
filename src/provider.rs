//! # Provider
//!
//! Entry point for the engine: resolves the provider block, builds the
//! capability-scoped clients once, and hands out resource and data source
//! handlers bound to them.

use crate::client::{ClientFactory, ClientSet};
use crate::config::{ConfigError, PollSettings, ProviderConfig};
use crate::constants::TYPE_NAME_PREFIX;
use crate::datasources::{
    DataSourceHandler, DataSourceKind, FirewallAliasData, FirewallRefs, PoolData, StorageData,
    Version,
};
use crate::diagnostics::Diagnostics;
use crate::error::ResourceError;
use crate::reconciler::{ResourceHandler, ResourceKind};
use crate::resources::{
    AcmeAccount, AcmePlugin, FirewallAlias, FirewallGroup, FirewallIpSet, FirewallIpSetCidr, Pool,
    StorageBtrfs, StorageDir, StorageNfs,
};
use std::sync::LazyLock;
use tracing::{info, warn};

/// Version reported to the engine, including the commit it was built from
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

static RESOURCE_TYPES: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    vec![
        StorageDir::descriptor().type_name,
        StorageNfs::descriptor().type_name,
        StorageBtrfs::descriptor().type_name,
        AcmeAccount::descriptor().type_name,
        AcmePlugin::descriptor().type_name,
        FirewallAlias::descriptor().type_name,
        FirewallIpSet::descriptor().type_name,
        FirewallIpSetCidr::descriptor().type_name,
        FirewallGroup::descriptor().type_name,
        Pool::descriptor().type_name,
    ]
});

static DATA_SOURCE_TYPES: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    vec![
        Version::descriptor().type_name,
        StorageData::descriptor().type_name,
        FirewallAliasData::descriptor().type_name,
        FirewallRefs::descriptor().type_name,
        PoolData::descriptor().type_name,
    ]
});

/// Configured provider
#[derive(Debug, Clone)]
pub struct Provider {
    clients: ClientSet,
    poll: PollSettings,
}

impl Default for Provider {
    fn default() -> Self {
        Self::unconfigured()
    }
}

impl Provider {
    /// Provider whose handlers all fail with "provider is not configured"
    pub fn unconfigured() -> Self {
        Self {
            clients: ClientSet::new(),
            poll: PollSettings::default(),
        }
    }

    pub fn with_clients(clients: ClientSet, poll: PollSettings) -> Self {
        Self { clients, poll }
    }

    /// Resolve the provider block against the process environment
    pub fn configure(
        config: ProviderConfig,
        factory: &dyn ClientFactory,
        poll: PollSettings,
    ) -> (Self, Diagnostics) {
        Self::configure_with(config, crate::config::process_env, factory, poll)
    }

    /// Resolve the provider block with `lookup` standing in for the environment
    ///
    /// Never fails outright: problems are returned as diagnostics next to a
    /// provider that is as configured as the input allows. Missing credentials
    /// for one capability only disable the handlers that need it.
    pub fn configure_with<F>(
        config: ProviderConfig,
        lookup: F,
        factory: &dyn ClientFactory,
        poll: PollSettings,
    ) -> (Self, Diagnostics)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut diagnostics = Diagnostics::new();
        let settings = match config.resolve_with(lookup) {
            Ok(settings) => settings,
            Err(err @ ConfigError::UnknownValue { attribute }) => {
                // Typical during planning; the engine configures again once known
                warn!(attribute, "Provider configuration not known yet");
                diagnostics.add_attribute_error(
                    attribute,
                    "Unknown provider configuration value",
                    err.to_string(),
                );
                return (Self::with_clients(ClientSet::new(), poll), diagnostics);
            }
            Err(err @ ConfigError::MissingBaseUrl) => {
                diagnostics.add_attribute_error(
                    "base_url",
                    "Missing Proxmox VE API base URL",
                    err.to_string(),
                );
                return (Self::with_clients(ClientSet::new(), poll), diagnostics);
            }
            Err(err @ ConfigError::InvalidBool { .. }) => {
                diagnostics.add_attribute_error(
                    "tls_insecure",
                    "Invalid TLS setting",
                    err.to_string(),
                );
                return (Self::with_clients(ClientSet::new(), poll), diagnostics);
            }
        };

        let clients = ClientSet::connect(&settings, factory);
        info!(
            version = VERSION,
            base_url = %settings.endpoint.base_url,
            "Provider configured"
        );
        (Self::with_clients(clients, poll), diagnostics)
    }

    pub fn type_name(&self) -> &'static str {
        TYPE_NAME_PREFIX
    }

    pub fn version(&self) -> &'static str {
        VERSION
    }

    pub fn clients(&self) -> &ClientSet {
        &self.clients
    }

    pub fn poll_settings(&self) -> &PollSettings {
        &self.poll
    }

    /// Handler for resource kind `K`
    ///
    /// # Errors
    ///
    /// [`ResourceError::MissingCapability`] when the client `K` needs is not
    /// available.
    pub fn resource<K: ResourceKind>(&self) -> Result<ResourceHandler<K>, ResourceError> {
        ResourceHandler::new(&self.clients, &self.poll)
    }

    /// Handler for data source kind `D`
    ///
    /// # Errors
    ///
    /// [`ResourceError::MissingCapability`] when the client `D` needs is not
    /// available.
    pub fn data_source<D: DataSourceKind>(&self) -> Result<DataSourceHandler<D>, ResourceError> {
        DataSourceHandler::new(&self.clients)
    }

    pub fn resource_types() -> &'static [&'static str] {
        &RESOURCE_TYPES
    }

    pub fn data_source_types() -> &'static [&'static str] {
        &DATA_SOURCE_TYPES
    }
}
