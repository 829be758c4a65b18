//! Proxmox VE Provider Library
//!
//! Reconciliation core that exposes Proxmox VE storage, firewall, ACME and
//! resource pool configuration as declarative resources and data sources.
//!
//! The crate does not speak HTTP. The engine side configures a [`Provider`]
//! with a [`ClientFactory`](client::ClientFactory) that builds
//! [`RemoteApi`](client::RemoteApi) clients, then drives the lifecycle of each
//! resource type through [`Resource`](reconciler::Resource) handlers.
//!
//! ```no_run
//! use proxmoxve_provider::client::memory::InMemoryPve;
//! use proxmoxve_provider::client::ClientSet;
//! use proxmoxve_provider::config::PollSettings;
//! use proxmoxve_provider::reconciler::OperationContext;
//! use proxmoxve_provider::resources::{FirewallAlias, FirewallAliasModel};
//! use proxmoxve_provider::Provider;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), proxmoxve_provider::ResourceError> {
//! let provider = Provider::with_clients(
//!     ClientSet::single(Arc::new(InMemoryPve::new())),
//!     PollSettings::default(),
//! );
//! let aliases = provider.resource::<FirewallAlias>()?;
//! let state = aliases
//!     .create(
//!         &OperationContext::new(),
//!         &FirewallAliasModel {
//!             name: "office".into(),
//!             cidr: "192.0.2.0/24".into(),
//!             ..FirewallAliasModel::default()
//!         },
//!     )
//!     .await?;
//! assert_eq!(state.id.as_deref(), Some("office"));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod datasources;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod observability;
pub mod provider;
pub mod reconciler;
pub mod resources;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{ApiError, Operation, ResourceError};
pub use model::{Attr, StringSet};
pub use provider::Provider;
