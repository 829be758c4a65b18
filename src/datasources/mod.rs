//! # Data Sources
//!
//! Read-only lookups of remote objects. A data source is never stored or
//! refreshed against prior state: every read is a fresh query from its
//! configuration, and an object that does not exist is an error rather than
//! an erased state.

mod firewall;
mod pool;
mod storage;
mod version;

pub use firewall::{
    FirewallAliasData, FirewallAliasDataModel, FirewallRef, FirewallRefs, FirewallRefsModel,
};
pub use pool::{PoolData, PoolDataModel};
pub use storage::{StorageData, StorageDataModel};
pub use version::{Version, VersionModel};

use crate::client::{ClientSet, RemoteApi};
use crate::error::{Operation, ResourceError};
use crate::observability::metrics;
use crate::reconciler::{OperationContext, ResourceDescriptor, Response};
use async_trait::async_trait;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, warn, Instrument};

/// Query and decoding for one data source type
#[async_trait]
pub trait DataSourceKind: Send + Sync + 'static {
    type Model: Clone + fmt::Debug + Send + Sync + 'static;

    fn descriptor() -> &'static ResourceDescriptor;

    /// Address used in logs and errors, e.g. `proxmoxve_storage.local`
    fn address(config: &Self::Model) -> Result<String, ResourceError>;

    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    async fn fetch(
        client: &dyn RemoteApi,
        config: &Self::Model,
        address: &str,
    ) -> Result<Self::Model, ResourceError>;
}

/// Runs one data source kind against the client for its capability
pub struct DataSourceHandler<D: DataSourceKind> {
    client: Arc<dyn RemoteApi>,
    _kind: PhantomData<fn() -> D>,
}

impl<D: DataSourceKind> fmt::Debug for DataSourceHandler<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceHandler")
            .field("type_name", &D::descriptor().type_name)
            .finish_non_exhaustive()
    }
}

impl<D: DataSourceKind> DataSourceHandler<D> {
    /// # Errors
    ///
    /// [`ResourceError::MissingCapability`] when the provider has no client
    /// for the capability the data source requires.
    pub fn new(clients: &ClientSet) -> Result<Self, ResourceError> {
        let client = clients.client(D::descriptor().capability)?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Arc<dyn RemoteApi>) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }

    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub async fn read(
        &self,
        _ctx: &OperationContext,
        config: &D::Model,
    ) -> Result<D::Model, ResourceError> {
        let address = D::address(config)?;
        let kind = D::descriptor().kind();
        let span = info_span!("data_source", address = %address);
        let start = Instant::now();

        let result = D::fetch(self.client.as_ref(), config, &address)
            .instrument(span)
            .await;

        let duration = start.elapsed().as_secs_f64();
        match &result {
            Ok(_) => {
                debug!(address = %address, duration_secs = duration, "read finished");
                metrics::record_lifecycle_operation(kind, Operation::Read.as_str(), "success", duration);
            }
            Err(err) => {
                warn!(address = %address, error = %err, "read failed");
                metrics::record_lifecycle_operation(kind, Operation::Read.as_str(), "error", duration);
            }
        }
        result
    }
}

/// Engine-facing read of one data source type
#[async_trait]
pub trait DataSource: Send + Sync {
    type Model: Send + Sync;

    fn type_name(&self) -> &'static str;

    async fn read(
        &self,
        ctx: &OperationContext,
        config: &Self::Model,
        response: &mut Response<Self::Model>,
    );
}

#[async_trait]
impl<D: DataSourceKind> DataSource for DataSourceHandler<D> {
    type Model = D::Model;

    fn type_name(&self) -> &'static str {
        D::descriptor().type_name
    }

    async fn read(
        &self,
        ctx: &OperationContext,
        config: &D::Model,
        response: &mut Response<D::Model>,
    ) {
        match DataSourceHandler::read(self, ctx, config).await {
            Ok(state) => response.state = Some(state),
            Err(err) => {
                response
                    .diagnostics
                    .add_resource_error(Operation::Read, self.type_name(), &err);
            }
        }
    }
}
