//! Capability-scoped client injection.

use super::RemoteApi;
use crate::config::{Endpoint, ProviderSettings, SessionCredentials, TokenCredentials};
use crate::error::ResourceError;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which credentials a handler's calls must be made with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// API token; enough for storage, firewall and pool endpoints
    Token,
    /// Password session as `root@pam`; required by the ACME endpoints
    Privileged,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token => f.write_str("API token"),
            Self::Privileged => f.write_str("root session"),
        }
    }
}

/// Builds concrete clients from resolved provider settings
///
/// Implemented by the embedder; the crate itself ships no HTTP client.
pub trait ClientFactory: Send + Sync {
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    fn token_client(
        &self,
        endpoint: &Endpoint,
        credentials: &TokenCredentials,
    ) -> anyhow::Result<Arc<dyn RemoteApi>>;

    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    fn session_client(
        &self,
        endpoint: &Endpoint,
        credentials: &SessionCredentials,
    ) -> anyhow::Result<Arc<dyn RemoteApi>>;
}

#[derive(Clone)]
enum Slot {
    Ready(Arc<dyn RemoteApi>),
    Unavailable(String),
}

impl Slot {
    fn unconfigured() -> Self {
        Self::Unavailable("provider is not configured".to_string())
    }
}

/// Clients available to handlers, one per capability
///
/// A capability whose credentials are missing keeps the reason, and handlers
/// requiring it fail with that reason when they are constructed.
#[derive(Clone)]
pub struct ClientSet {
    token: Slot,
    privileged: Slot,
}

impl Default for ClientSet {
    fn default() -> Self {
        Self {
            token: Slot::unconfigured(),
            privileged: Slot::unconfigured(),
        }
    }
}

impl fmt::Debug for ClientSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSet")
            .field("token", &self.is_available(Capability::Token))
            .field("privileged", &self.is_available(Capability::Privileged))
            .finish()
    }
}

impl ClientSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the same client for every capability
    pub fn single(client: Arc<dyn RemoteApi>) -> Self {
        Self {
            token: Slot::Ready(Arc::clone(&client)),
            privileged: Slot::Ready(client),
        }
    }

    #[must_use]
    pub fn with_client(mut self, capability: Capability, client: Arc<dyn RemoteApi>) -> Self {
        *self.slot_mut(capability) = Slot::Ready(client);
        self
    }

    #[must_use]
    pub fn with_unavailable(mut self, capability: Capability, reason: impl Into<String>) -> Self {
        *self.slot_mut(capability) = Slot::Unavailable(reason.into());
        self
    }

    /// Build both clients from resolved settings
    ///
    /// Failures are kept per capability instead of failing the whole
    /// provider: a configuration with only an API token can still manage
    /// storage and firewall objects.
    pub fn connect(settings: &ProviderSettings, factory: &dyn ClientFactory) -> Self {
        let token = match &settings.token {
            Ok(credentials) => match factory.token_client(&settings.endpoint, credentials) {
                Ok(client) => Slot::Ready(client),
                Err(err) => Slot::Unavailable(format!(
                    "unable to create Proxmox VE client with API token:\n\n{err:#}"
                )),
            },
            Err(reason) => Slot::Unavailable(reason.clone()),
        };

        let privileged = match &settings.session {
            Ok(credentials) => match factory.session_client(&settings.endpoint, credentials) {
                Ok(client) => Slot::Ready(client),
                Err(err) => Slot::Unavailable(format!(
                    "unable to create Proxmox VE client with {} user and password:\n\n{err:#}",
                    credentials.user
                )),
            },
            Err(reason) => Slot::Unavailable(reason.clone()),
        };

        let set = Self { token, privileged };
        for capability in [Capability::Token, Capability::Privileged] {
            if let Slot::Unavailable(reason) = set.slot(capability) {
                warn!(%capability, reason = %reason, "Client unavailable; handlers requiring it will fail");
            } else {
                debug!(%capability, base_url = %settings.endpoint.base_url, "Client ready");
            }
        }
        set
    }

    /// Client for `capability`, or the reason it is missing
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub fn client(&self, capability: Capability) -> Result<Arc<dyn RemoteApi>, ResourceError> {
        match self.slot(capability) {
            Slot::Ready(client) => Ok(Arc::clone(client)),
            Slot::Unavailable(reason) => Err(ResourceError::MissingCapability {
                capability,
                reason: reason.clone(),
            }),
        }
    }

    pub fn is_available(&self, capability: Capability) -> bool {
        matches!(self.slot(capability), Slot::Ready(_))
    }

    fn slot(&self, capability: Capability) -> &Slot {
        match capability {
            Capability::Token => &self.token,
            Capability::Privileged => &self.privileged,
        }
    }

    fn slot_mut(&mut self, capability: Capability) -> &mut Slot {
        match capability {
            Capability::Token => &mut self.token,
            Capability::Privileged => &mut self.privileged,
        }
    }
}
