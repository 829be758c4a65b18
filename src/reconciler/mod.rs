//! # Reconciler
//!
//! Eventual-consistency reconciliation shared by every resource kind.
//!
//! - `descriptor`: static per-kind field roles, convergence mode and not-found patterns
//! - `backoff`: warm-up then steady wait schedule
//! - `poller`: convergence polling with timeout and cancellation
//! - `fields`: request construction and response decoding
//! - `lifecycle`: create/read/update/delete/import orchestration

pub mod backoff;
pub mod descriptor;
pub mod fields;
pub mod lifecycle;
pub mod poller;

pub use descriptor::{Convergence, FieldSpec, Lookup, Presence, ResourceDescriptor, Role, SetEncoding};
pub use fields::{FieldReader, RequestBuilder};
pub use lifecycle::{OperationContext, Resource, ResourceHandler, ResourceKind, Response};
pub use poller::{EventualReader, PollError};
