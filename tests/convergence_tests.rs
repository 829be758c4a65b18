//! # Convergence Integration Tests
//!
//! ACME kinds are applied by the remote in the background; these tests drive
//! the poller through delayed objects on a paused clock.

mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{ctx, provider};
use proxmoxve_provider::client::memory::{InMemoryPve, Method};
use proxmoxve_provider::client::Collection;
use proxmoxve_provider::model::{string_set, StringSet};
use proxmoxve_provider::reconciler::{OperationContext, Resource, Response};
use proxmoxve_provider::resources::{AcmeAccount, AcmeAccountModel, AcmePlugin, AcmePluginModel};
use proxmoxve_provider::{Attr, ResourceError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn plugin() -> AcmePluginModel {
    AcmePluginModel {
        name: "test".into(),
        plugin_type: "dns".into(),
        api: "cf".into(),
        data: STANDARD.encode("foobar").into(),
        nodes: string_set(["foobar"]),
        ..AcmePluginModel::default()
    }
}

fn account() -> AcmeAccountModel {
    AcmeAccountModel {
        name: "default".into(),
        contact: "admin@example.com".into(),
        ..AcmeAccountModel::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_plugin_create_waits_for_convergence() {
    let pve = InMemoryPve::new().with_convergence_delay(Collection::AcmePlugins, 2);
    let plugins = provider(&pve).resource::<AcmePlugin>().unwrap();

    let state = plugins.create(&ctx(), &plugin()).await.unwrap();
    assert_eq!(state.id, Attr::known("test"));
    assert_eq!(state.plugin_type, Attr::known("dns"));
    assert_eq!(state.data, Attr::known("Zm9vYmFy"));
    assert_eq!(state.nodes, string_set(["foobar"]));
    assert_eq!(state.disable, Attr::Null);
    // Two unconverged reads, then the converged one
    assert_eq!(pve.count(Method::Read).await, 3);

    // The remote keeps the decoded configuration
    let stored = pve.object(&Collection::AcmePlugins, "test").await.unwrap();
    assert_eq!(stored.get("data").and_then(|data| data.as_str()), Some("foobar"));
}

#[tokio::test(start_paused = true)]
async fn test_cleared_field_is_deleted_on_the_remote() {
    let pve = InMemoryPve::new().with_convergence_delay(Collection::AcmePlugins, 1);
    let plugins = provider(&pve).resource::<AcmePlugin>().unwrap();
    let prior = plugins.create(&ctx(), &plugin()).await.unwrap();
    assert_eq!(prior.api, Attr::known("cf"));

    let mut cleared = plugin();
    cleared.api = Attr::Null;
    let state = plugins.update(&ctx(), &prior, &cleared).await.unwrap();
    assert_eq!(state.api, Attr::Null);
    assert_eq!(state.data, Attr::known("Zm9vYmFy"));

    let update = pve
        .calls()
        .await
        .into_iter()
        .find(|call| call.method == Method::Update)
        .and_then(|call| call.request)
        .unwrap();
    assert!(update.deletes("api"));
    assert!(!update.deletes("data"));

    let refreshed = plugins.read(&ctx(), &state).await.unwrap().unwrap();
    assert_eq!(refreshed, state);
}

#[tokio::test(start_paused = true)]
async fn test_empty_node_list_matches_state() {
    let pve = InMemoryPve::new();
    let plugins = provider(&pve).resource::<AcmePlugin>().unwrap();
    let mut config = plugin();
    config.nodes = Attr::Known(StringSet::new());

    let state = plugins.create(&ctx(), &config).await.unwrap();
    assert_eq!(state.nodes, config.nodes);
    let stored = pve.object(&Collection::AcmePlugins, "test").await.unwrap();
    assert!(stored.get("nodes").is_none());

    let refreshed = plugins.read(&ctx(), &state).await.unwrap().unwrap();
    assert_eq!(refreshed, state);

    // Going from an empty list to a real one and back clears it remotely
    let mut restricted = config.clone();
    restricted.nodes = string_set(["pve1"]);
    let state = plugins.update(&ctx(), &refreshed, &restricted).await.unwrap();
    assert_eq!(state.nodes, string_set(["pve1"]));
    let state = plugins.update(&ctx(), &state, &config).await.unwrap();
    assert_eq!(state.nodes, config.nodes);
    let stored = pve.object(&Collection::AcmePlugins, "test").await.unwrap();
    assert!(stored.get("nodes").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_slow_account_registration_returns_provisional_state() {
    let pve = InMemoryPve::new().with_convergence_delay(Collection::AcmeAccounts, 3);
    let accounts = provider(&pve).resource::<AcmeAccount>().unwrap();

    let provisional = accounts.create(&ctx(), &account()).await.unwrap();
    assert_eq!(provisional.id, Attr::known("default"));
    assert_eq!(provisional.contact, Attr::known("admin@example.com"));
    assert_eq!(provisional.location, Attr::Null);
    assert_eq!(provisional.directory, Attr::Null);

    let state = accounts.read(&ctx(), &provisional).await.unwrap().unwrap();
    assert_eq!(state.contact, Attr::known("admin@example.com"));
    assert!(state
        .location
        .as_deref()
        .is_some_and(|location| location.contains("/acme/acct/")));
    assert!(state.directory.as_known().is_some());
    assert!(state.tos_url.as_known().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_account_that_never_converges_times_out() {
    let pve = InMemoryPve::new().with_convergence_delay(Collection::AcmeAccounts, 20);
    let accounts = provider(&pve).resource::<AcmeAccount>().unwrap();
    let provisional = accounts.create(&ctx(), &account()).await.unwrap();

    let err = accounts.read(&ctx(), &provisional).await.unwrap_err();
    assert!(matches!(err, ResourceError::Timeout { .. }));

    let mut response = Response::default();
    Resource::read(&accounts, &ctx(), &provisional, &mut response).await;
    assert_eq!(response.state, Some(provisional));
    let error = response.diagnostics.errors().next().unwrap();
    assert_eq!(error.summary, "Error reading proxmoxve_acme_account");
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_read_stops_polling() {
    let pve = InMemoryPve::new();
    let plugins = provider(&pve).resource::<AcmePlugin>().unwrap();
    let state = plugins.create(&ctx(), &plugin()).await.unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let err = plugins
        .read(&OperationContext::with_cancellation(token), &state)
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::Cancelled { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_create_cancelled_during_refresh_keeps_state() {
    let pve = InMemoryPve::new().with_convergence_delay(Collection::AcmePlugins, 3);
    let plugins = provider(&pve).resource::<AcmePlugin>().unwrap();

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        canceller.cancel();
    });

    let mut response = Response::default();
    Resource::create(
        &plugins,
        &OperationContext::with_cancellation(token),
        &plugin(),
        &mut response,
    )
    .await;
    assert!(response.diagnostics.is_empty());
    let state = response.state.unwrap();
    assert_eq!(state.id, Attr::known("test"));
    assert_eq!(state.data, Attr::known("Zm9vYmFy"));
    assert!(pve.object(&Collection::AcmePlugins, "test").await.is_some());
    assert_eq!(pve.count(Method::Create).await, 1);

    let refreshed = plugins.read(&ctx(), &state).await.unwrap().unwrap();
    assert_eq!(refreshed.nodes, string_set(["foobar"]));
}

#[tokio::test(start_paused = true)]
async fn test_plugin_removed_out_of_band_is_erased_after_timeout() {
    let pve = InMemoryPve::new();
    let plugins = provider(&pve).resource::<AcmePlugin>().unwrap();
    let state = plugins.create(&ctx(), &plugin()).await.unwrap();
    assert!(pve.remove(&Collection::AcmePlugins, "test").await);

    let reads_before = pve.count(Method::Read).await;
    assert_eq!(plugins.read(&ctx(), &state).await.unwrap(), None);
    // Kept polling for the whole read window before giving up
    assert!(pve.count(Method::Read).await - reads_before > 1);
}

#[tokio::test(start_paused = true)]
async fn test_plugin_import_decodes_remote_object() {
    let pve = InMemoryPve::new();
    let plugins = provider(&pve).resource::<AcmePlugin>().unwrap();
    let created = plugins.create(&ctx(), &plugin()).await.unwrap();

    let imported = plugins.import(&ctx(), "test").await.unwrap().unwrap();
    assert_eq!(imported, created);
}
