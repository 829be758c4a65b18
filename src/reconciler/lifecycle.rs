//! # Resource Lifecycle
//!
//! Generic create/read/update/delete/import orchestration shared by every
//! resource kind. A kind supplies its descriptor and the conversions between
//! its model and the wire ([`ResourceKind`]); [`ResourceHandler`] runs the
//! protocol:
//!
//! - **Create**: build the request (fails before any remote call), create,
//!   then read back. Eventually-consistent kinds get a short best-effort poll;
//!   if it times out or is cancelled the state is the configuration with
//!   unknowns settled to null and the next read fills in the rest.
//! - **Read**: a not-found answer erases the state instead of failing.
//! - **Update**: addressed by the prior identifier, renamed in the same call
//!   where supported, then re-read by the new identifier. The re-read must find
//!   the object.
//! - **Delete**: by the stored identifier.
//! - **Import**: identifier to minimal model, then Read.

use super::descriptor::{Convergence, Lookup, ResourceDescriptor};
use super::poller::{EventualReader, PollError, PollTarget};
use crate::client::{ClientSet, Collection, RemoteApi, RemoteObject, WriteRequest};
use crate::config::{ConvergenceTimeouts, PollSettings};
use crate::diagnostics::Diagnostics;
use crate::error::{ApiError, Operation, ResourceError};
use crate::observability::metrics;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Per-call context handed down by the engine
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    cancellation: CancellationToken,
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Conversions between one kind's model and the remote API
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub trait ResourceKind: Send + Sync + 'static {
    type Model: Clone + fmt::Debug + Send + Sync + 'static;

    fn descriptor() -> &'static ResourceDescriptor;

    /// Collection the object lives in
    fn collection(model: &Self::Model) -> Result<Collection, ResourceError>;

    /// Remote identifier of the object the model describes
    fn remote_id(model: &Self::Model) -> Result<String, ResourceError>;

    /// Instance address used in logs, errors and metrics
    fn address(model: &Self::Model) -> Result<String, ResourceError> {
        Ok(Self::descriptor().address(&Self::remote_id(model)?))
    }

    fn create_request(config: &Self::Model) -> Result<WriteRequest, ResourceError>;

    /// Update request addressed by `prior`'s identifier
    fn update_request(
        prior: &Self::Model,
        config: &Self::Model,
    ) -> Result<WriteRequest, ResourceError>;

    /// Full state from a remote object; `addressed` is the model used to find it
    fn decode(object: &RemoteObject, addressed: &Self::Model)
        -> Result<Self::Model, ResourceError>;

    /// Whether the object has finished converging
    fn converged(_object: &RemoteObject) -> bool {
        true
    }

    /// State written when the create-time refresh ends before convergence
    fn provisional(config: &Self::Model) -> Self::Model;

    /// Minimal model addressing the object named by an import identifier
    fn from_import_id(id: &str) -> Result<Self::Model, ResourceError>;
}

enum Observed {
    Present(RemoteObject),
    Missing,
}

/// Lifecycle handler for one resource kind
pub struct ResourceHandler<K: ResourceKind> {
    client: Arc<dyn RemoteApi>,
    reader: EventualReader,
    settings: PollSettings,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind> fmt::Debug for ResourceHandler<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandler")
            .field("type_name", &K::descriptor().type_name)
            .field("reader", &self.reader)
            .finish_non_exhaustive()
    }
}

impl<K: ResourceKind> ResourceHandler<K> {
    /// Handler using the client for the kind's capability
    ///
    /// # Errors
    ///
    /// [`ResourceError::MissingCapability`] when the provider has no client
    /// for the capability the kind requires.
    pub fn new(clients: &ClientSet, settings: &PollSettings) -> Result<Self, ResourceError> {
        let client = clients.client(K::descriptor().capability)?;
        Ok(Self::with_client(client, settings))
    }

    pub fn with_client(client: Arc<dyn RemoteApi>, settings: &PollSettings) -> Self {
        Self {
            client,
            reader: EventualReader::new(settings),
            settings: settings.clone(),
            _kind: PhantomData,
        }
    }

    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        K::descriptor()
    }

    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub async fn create(
        &self,
        ctx: &OperationContext,
        config: &K::Model,
    ) -> Result<K::Model, ResourceError> {
        let request = K::create_request(config)?;
        let collection = K::collection(config)?;
        let id = K::remote_id(config)?;
        let address = K::address(config)?;

        self.instrument(Operation::Create, &address, async {
            debug!(?request, "Sending create request");
            let task = self
                .client
                .create(&collection, &request)
                .await
                .map_err(|err| ResourceError::remote(Operation::Create, &address, err))?;
            if let Some(task) = task {
                debug!(task = %task, "Remote started background task");
            }

            match K::descriptor().convergence {
                Convergence::Immediate => {
                    match self.fetch(&collection, &id).await.map_err(|err| {
                        ResourceError::remote(Operation::Create, &address, err)
                    })? {
                        Observed::Present(object) => K::decode(&object, config),
                        Observed::Missing => Err(ResourceError::Vanished {
                            operation: Operation::Create,
                            address: address.clone(),
                        }),
                    }
                }
                Convergence::Eventual(defaults) => {
                    let timeout = self.timeouts(defaults).create;
                    match self.poll(ctx, &collection, &id, &address, timeout).await {
                        Ok(object) => K::decode(&object, config),
                        Err(PollError::Timeout {
                            elapsed,
                            last_error,
                            ..
                        }) => {
                            warn!(
                                ?elapsed,
                                last_error = ?last_error,
                                "Created but not converged yet; next read will refresh the state"
                            );
                            Ok(K::provisional(config))
                        }
                        // The object exists remotely; state must still be written
                        Err(PollError::Cancelled { attempts }) => {
                            warn!(
                                attempts,
                                "Created but refresh was cancelled; next read will refresh the state"
                            );
                            Ok(K::provisional(config))
                        }
                    }
                }
            }
        })
        .await
    }

    /// Refresh state; `Ok(None)` means the object is gone and state is erased
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub async fn read(
        &self,
        ctx: &OperationContext,
        state: &K::Model,
    ) -> Result<Option<K::Model>, ResourceError> {
        let collection = K::collection(state)?;
        let id = K::remote_id(state)?;
        let address = K::address(state)?;

        self.instrument(Operation::Read, &address, async {
            match self.observe(ctx, Operation::Read, &collection, &id, &address).await? {
                Observed::Present(object) => K::decode(&object, state).map(Some),
                Observed::Missing => {
                    warn!("Object no longer exists on the remote; removing it from state");
                    metrics::increment_out_of_band_deletions(K::descriptor().kind());
                    Ok(None)
                }
            }
        })
        .await
    }

    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub async fn update(
        &self,
        ctx: &OperationContext,
        prior: &K::Model,
        config: &K::Model,
    ) -> Result<K::Model, ResourceError> {
        let request = K::update_request(prior, config)?;
        let collection = K::collection(prior)?;
        let prior_id = K::remote_id(prior)?;
        let desired_collection = K::collection(config)?;
        let desired_id = K::remote_id(config)?;
        let desired_address = K::address(config)?;
        let address = K::address(prior)?;

        self.instrument(Operation::Update, &address, async {
            debug!(?request, "Sending update request");
            self.client
                .update(&collection, &prior_id, &request)
                .await
                .map_err(|err| ResourceError::remote(Operation::Update, &address, err))?;

            if desired_id != prior_id {
                info!(renamed_to = %desired_address, "Renamed");
            }
            match self
                .observe(
                    ctx,
                    Operation::Update,
                    &desired_collection,
                    &desired_id,
                    &desired_address,
                )
                .await?
            {
                Observed::Present(object) => K::decode(&object, config),
                Observed::Missing => Err(ResourceError::Vanished {
                    operation: Operation::Update,
                    address: desired_address,
                }),
            }
        })
        .await
    }

    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub async fn delete(&self, _ctx: &OperationContext, state: &K::Model) -> Result<(), ResourceError> {
        let collection = K::collection(state)?;
        let id = K::remote_id(state)?;
        let address = K::address(state)?;

        self.instrument(Operation::Delete, &address, async {
            self.client
                .delete(&collection, &id)
                .await
                .map_err(|err| ResourceError::remote(Operation::Delete, &address, err))
        })
        .await
    }

    /// Read the object named by `id`; `Ok(None)` when it does not exist
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub async fn import(
        &self,
        ctx: &OperationContext,
        id: &str,
    ) -> Result<Option<K::Model>, ResourceError> {
        let addressed = K::from_import_id(id)?;
        info!(
            address = %K::address(&addressed)?,
            "Importing existing object"
        );
        self.read(ctx, &addressed).await
    }

    fn timeouts(&self, defaults: ConvergenceTimeouts) -> ConvergenceTimeouts {
        self.settings
            .timeouts_for(K::descriptor().type_name, defaults)
    }

    /// Current remote view; polled for eventually-consistent kinds
    async fn observe(
        &self,
        ctx: &OperationContext,
        operation: Operation,
        collection: &Collection,
        id: &str,
        address: &str,
    ) -> Result<Observed, ResourceError> {
        let descriptor = K::descriptor();
        match descriptor.convergence {
            Convergence::Immediate => self
                .fetch(collection, id)
                .await
                .map_err(|err| ResourceError::remote(operation, address, err)),
            Convergence::Eventual(defaults) => {
                let timeout = self.timeouts(defaults).read;
                match self.poll(ctx, collection, id, address, timeout).await {
                    Ok(object) => Ok(Observed::Present(object)),
                    Err(PollError::Timeout {
                        last_error: Some(err),
                        ..
                    }) if descriptor.is_not_found(id, &err) => Ok(Observed::Missing),
                    Err(PollError::Timeout { last_error, .. }) => Err(ResourceError::Timeout {
                        address: address.to_string(),
                        timeout,
                        last_error,
                    }),
                    Err(PollError::Cancelled { .. }) => Err(ResourceError::Cancelled {
                        operation,
                        address: address.to_string(),
                    }),
                }
            }
        }
    }

    /// One direct lookup, with not-found answers turned into `Missing`
    async fn fetch(&self, collection: &Collection, id: &str) -> Result<Observed, ApiError> {
        let descriptor = K::descriptor();
        match descriptor.lookup {
            Lookup::Item => match self.client.read(collection, id).await {
                Ok(object) => Ok(Observed::Present(object)),
                Err(err) if descriptor.is_not_found(id, &err) => Ok(Observed::Missing),
                Err(err) => Err(err),
            },
            Lookup::Scan { key } => {
                let found = self
                    .client
                    .list(collection)
                    .await?
                    .into_iter()
                    .find(|object| object.get(key).and_then(Value::as_str) == Some(id));
                Ok(found.map_or(Observed::Missing, Observed::Present))
            }
        }
    }

    async fn poll(
        &self,
        ctx: &OperationContext,
        collection: &Collection,
        id: &str,
        address: &str,
        timeout: Duration,
    ) -> Result<RemoteObject, PollError<ApiError>> {
        let target = PollTarget {
            address,
            kind: K::descriptor().kind(),
            timeout,
        };
        self.reader
            .wait_for(
                target,
                ctx.cancellation(),
                || self.client.read(collection, id),
                K::converged,
            )
            .await
            .map(|converged| converged.value)
    }

    async fn instrument<T, Fut>(
        &self,
        operation: Operation,
        address: &str,
        work: Fut,
    ) -> Result<T, ResourceError>
    where
        Fut: Future<Output = Result<T, ResourceError>>,
    {
        let kind = K::descriptor().kind();
        let span = info_span!("lifecycle", operation = operation.as_str(), address = %address);
        let start = Instant::now();

        let result = work.instrument(span).await;

        let duration = start.elapsed().as_secs_f64();
        match &result {
            Ok(_) => {
                info!(address = %address, duration_secs = duration, "{} finished", operation.as_str());
                metrics::record_lifecycle_operation(kind, operation.as_str(), "success", duration);
            }
            Err(err) => {
                warn!(address = %address, duration_secs = duration, error = %err, "{} failed", operation.as_str());
                metrics::record_lifecycle_operation(kind, operation.as_str(), "error", duration);
            }
        }
        result
    }
}

/// Result sink for one engine-facing operation
#[derive(Debug)]
pub struct Response<M> {
    /// State to store; `None` erases it
    pub state: Option<M>,
    pub diagnostics: Diagnostics,
}

impl<M> Default for Response<M> {
    fn default() -> Self {
        Self {
            state: None,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Engine-facing lifecycle of one resource type
///
/// Failures are reported as diagnostics. On failure the stored state is left
/// as it was: absent for create and import, the prior state otherwise.
#[async_trait]
pub trait Resource: Send + Sync {
    type Model: Send + Sync;

    fn type_name(&self) -> &'static str;

    async fn create(
        &self,
        ctx: &OperationContext,
        config: &Self::Model,
        response: &mut Response<Self::Model>,
    );

    async fn read(
        &self,
        ctx: &OperationContext,
        state: &Self::Model,
        response: &mut Response<Self::Model>,
    );

    async fn update(
        &self,
        ctx: &OperationContext,
        prior: &Self::Model,
        config: &Self::Model,
        response: &mut Response<Self::Model>,
    );

    async fn delete(
        &self,
        ctx: &OperationContext,
        state: &Self::Model,
        response: &mut Response<Self::Model>,
    );

    async fn import(&self, ctx: &OperationContext, id: &str, response: &mut Response<Self::Model>);
}

#[async_trait]
impl<K: ResourceKind> Resource for ResourceHandler<K> {
    type Model = K::Model;

    fn type_name(&self) -> &'static str {
        K::descriptor().type_name
    }

    async fn create(
        &self,
        ctx: &OperationContext,
        config: &K::Model,
        response: &mut Response<K::Model>,
    ) {
        match ResourceHandler::create(self, ctx, config).await {
            Ok(state) => response.state = Some(state),
            Err(err) => {
                response
                    .diagnostics
                    .add_resource_error(Operation::Create, self.type_name(), &err);
            }
        }
    }

    async fn read(&self, ctx: &OperationContext, state: &K::Model, response: &mut Response<K::Model>) {
        match ResourceHandler::read(self, ctx, state).await {
            Ok(refreshed) => response.state = refreshed,
            Err(err) => {
                response.state = Some(state.clone());
                response
                    .diagnostics
                    .add_resource_error(Operation::Read, self.type_name(), &err);
            }
        }
    }

    async fn update(
        &self,
        ctx: &OperationContext,
        prior: &K::Model,
        config: &K::Model,
        response: &mut Response<K::Model>,
    ) {
        match ResourceHandler::update(self, ctx, prior, config).await {
            Ok(state) => response.state = Some(state),
            Err(err) => {
                response.state = Some(prior.clone());
                response
                    .diagnostics
                    .add_resource_error(Operation::Update, self.type_name(), &err);
            }
        }
    }

    async fn delete(&self, ctx: &OperationContext, state: &K::Model, response: &mut Response<K::Model>) {
        match ResourceHandler::delete(self, ctx, state).await {
            Ok(()) => response.state = None,
            Err(err) => {
                response.state = Some(state.clone());
                response
                    .diagnostics
                    .add_resource_error(Operation::Delete, self.type_name(), &err);
            }
        }
    }

    async fn import(&self, ctx: &OperationContext, id: &str, response: &mut Response<K::Model>) {
        match ResourceHandler::import(self, ctx, id).await {
            Ok(Some(state)) => response.state = Some(state),
            Ok(None) => response.diagnostics.add_error(
                format!("Error importing {}", self.type_name()),
                format!("Cannot import non-existent remote object '{id}'"),
            ),
            Err(err) => {
                response
                    .diagnostics
                    .add_resource_error(Operation::Import, self.type_name(), &err);
            }
        }
    }
}
