//! Common test utilities for lifecycle integration tests
//!
//! Provides shared tracing setup and a provider wired to the in-memory
//! backend.

#![allow(dead_code, reason = "Not every test binary uses every helper")]

use proxmoxve_provider::client::memory::InMemoryPve;
use proxmoxve_provider::client::ClientSet;
use proxmoxve_provider::config::PollSettings;
use proxmoxve_provider::reconciler::OperationContext;
use proxmoxve_provider::Provider;
use std::sync::{Arc, Once};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing once for the whole test binary
///
/// Honors `RUST_LOG`, so failing tests can be rerun with lifecycle logs.
pub fn init_tracing() {
    TRACING_INIT.call_once(proxmoxve_provider::observability::init_tracing);
}

/// Provider whose clients for every capability talk to `pve`
pub fn provider(pve: &InMemoryPve) -> Provider {
    init_tracing();
    Provider::with_clients(
        ClientSet::single(Arc::new(pve.clone())),
        PollSettings::default(),
    )
}

pub fn ctx() -> OperationContext {
    OperationContext::new()
}
