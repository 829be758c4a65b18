//! # Provider Configuration Integration Tests
//!
//! Resolution of the provider block into clients, with a factory that records
//! what it was asked to build.

mod common;

use common::{ctx, init_tracing};
use proxmoxve_provider::client::memory::InMemoryPve;
use proxmoxve_provider::client::{Capability, ClientFactory, RemoteApi};
use proxmoxve_provider::config::{
    ConvergenceTimeouts, Endpoint, PollSettings, ProviderConfig, SessionCredentials,
    TokenCredentials,
};
use proxmoxve_provider::resources::{
    AcmeAccount, AcmePlugin, AcmePluginModel, FirewallAlias, StorageDir,
};
use proxmoxve_provider::{Attr, Provider, ResourceError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingFactory {
    pve: InMemoryPve,
    endpoints: Mutex<Vec<Endpoint>>,
    token_ids: Mutex<Vec<String>>,
    session_users: Mutex<Vec<(String, bool)>>,
}

impl ClientFactory for RecordingFactory {
    fn token_client(
        &self,
        endpoint: &Endpoint,
        credentials: &TokenCredentials,
    ) -> anyhow::Result<Arc<dyn RemoteApi>> {
        self.endpoints.lock().unwrap().push(endpoint.clone());
        self.token_ids
            .lock()
            .unwrap()
            .push(credentials.token_id.clone());
        Ok(Arc::new(self.pve.clone()))
    }

    fn session_client(
        &self,
        endpoint: &Endpoint,
        credentials: &SessionCredentials,
    ) -> anyhow::Result<Arc<dyn RemoteApi>> {
        self.endpoints.lock().unwrap().push(endpoint.clone());
        self.session_users
            .lock()
            .unwrap()
            .push((credentials.user.clone(), credentials.totp_seed.is_some()));
        Ok(Arc::new(self.pve.clone()))
    }
}

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_environment_supplies_unset_attributes() {
    init_tracing();
    let factory = RecordingFactory::default();
    let config = ProviderConfig {
        token_id: "terraform@pve!declared".into(),
        ..ProviderConfig::default()
    };

    let (provider, diagnostics) = Provider::configure_with(
        config,
        env(&[
            ("PROXMOXVE_BASE_URL", "https://pve.example.com:8006"),
            ("PROXMOXVE_TOKEN_ID", "terraform@pve!from-env"),
            ("PROXMOXVE_SECRET", "s3cr3t"),
            ("PROXMOXVE_ROOT_PASSWORD", "hunter2"),
            ("PROXMOXVE_TOTPSEED", "JBSWY3DPEHPK3PXP"),
            ("PROXMOXVE_TLS_INSECURE", "1"),
        ]),
        &factory,
        PollSettings::default(),
    );

    assert!(diagnostics.is_empty());
    assert!(provider.clients().is_available(Capability::Token));
    assert!(provider.clients().is_available(Capability::Privileged));

    // Declared attributes win over the environment
    assert_eq!(
        *factory.token_ids.lock().unwrap(),
        vec!["terraform@pve!declared".to_string()]
    );
    assert_eq!(
        *factory.session_users.lock().unwrap(),
        vec![("root@pam".to_string(), true)]
    );
    for endpoint in factory.endpoints.lock().unwrap().iter() {
        assert_eq!(endpoint.base_url, "https://pve.example.com:8006");
        assert!(endpoint.tls_insecure);
    }
}

#[test]
fn test_token_only_configuration_disables_acme_handlers() {
    init_tracing();
    let factory = RecordingFactory::default();
    let config = ProviderConfig {
        base_url: "https://pve.example.com:8006".into(),
        token_id: "terraform@pve!ci".into(),
        secret: "s3cr3t".into(),
        ..ProviderConfig::default()
    };

    let (provider, diagnostics) =
        Provider::configure_with(config, env(&[]), &factory, PollSettings::default());
    assert!(!diagnostics.has_error());
    assert!(factory.session_users.lock().unwrap().is_empty());

    assert!(provider.resource::<StorageDir>().is_ok());
    assert!(provider.resource::<FirewallAlias>().is_ok());
    for err in [
        provider.resource::<AcmeAccount>().unwrap_err(),
        provider.resource::<AcmePlugin>().unwrap_err(),
    ] {
        assert!(matches!(
            err,
            ResourceError::MissingCapability {
                capability: Capability::Privileged,
                ..
            }
        ));
        assert!(err.detail().contains("root_password cannot be empty"));
    }
}

#[test]
fn test_password_only_configuration_disables_token_handlers() {
    init_tracing();
    let factory = RecordingFactory::default();
    let config = ProviderConfig {
        base_url: "https://pve.example.com:8006".into(),
        root_password: "hunter2".into(),
        ..ProviderConfig::default()
    };

    let (provider, _) =
        Provider::configure_with(config, env(&[]), &factory, PollSettings::default());
    assert!(provider.resource::<AcmePlugin>().is_ok());
    let err = provider.resource::<StorageDir>().unwrap_err();
    assert!(err.detail().contains("token_id cannot be empty"));
}

#[test]
fn test_invalid_tls_variable_is_reported() {
    init_tracing();
    let factory = RecordingFactory::default();
    let config = ProviderConfig {
        base_url: "https://pve.example.com:8006".into(),
        ..ProviderConfig::default()
    };

    let (provider, diagnostics) = Provider::configure_with(
        config,
        env(&[("PROXMOXVE_TLS_INSECURE", "sometimes")]),
        &factory,
        PollSettings::default(),
    );
    let error = diagnostics.errors().next().unwrap();
    assert_eq!(error.attribute.as_deref(), Some("tls_insecure"));
    assert!(error.detail.contains("PROXMOXVE_TLS_INSECURE"));
    assert!(!provider.clients().is_available(Capability::Token));
    assert!(factory.endpoints.lock().unwrap().is_empty());
}

#[test]
fn test_unknown_base_url_defers_configuration() {
    init_tracing();
    let factory = RecordingFactory::default();
    let config = ProviderConfig {
        base_url: Attr::Unknown,
        ..ProviderConfig::default()
    };

    let (provider, diagnostics) = Provider::configure_with(
        config,
        env(&[("PROXMOXVE_BASE_URL", "https://pve.example.com:8006")]),
        &factory,
        PollSettings::default(),
    );
    assert_eq!(
        diagnostics
            .errors()
            .next()
            .and_then(|error| error.attribute.as_deref()),
        Some("base_url")
    );
    let err = provider.resource::<StorageDir>().unwrap_err();
    assert!(err.detail().contains("provider is not configured"));
}

#[test]
fn test_poll_settings_from_environment() {
    let settings = PollSettings::from_lookup(env(&[
        ("PROXMOXVE_POLL_WARMUP_SECS", "2"),
        ("PROXMOXVE_POLL_STEADY_INTERVAL_SECS", "10"),
    ]));
    assert_eq!(settings.warmup, Duration::from_secs(2));
    assert_eq!(settings.warmup_interval, Duration::from_secs(1));
    assert_eq!(settings.steady_interval, Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_override_applies_to_one_kind() {
    init_tracing();
    let pve = InMemoryPve::new()
        .with_convergence_delay(proxmoxve_provider::client::Collection::AcmePlugins, 3);
    let factory = RecordingFactory {
        pve: pve.clone(),
        ..RecordingFactory::default()
    };
    let poll = PollSettings::default().with_timeouts(
        "proxmoxve_acme_plugin",
        ConvergenceTimeouts {
            create: Duration::from_secs(1),
            read: Duration::from_secs(5),
        },
    );
    let config = ProviderConfig {
        base_url: "https://pve.example.com:8006".into(),
        root_password: "hunter2".into(),
        ..ProviderConfig::default()
    };
    let (provider, _) = Provider::configure_with(config, env(&[]), &factory, poll);
    let plugins = provider.resource::<AcmePlugin>().unwrap();

    // Create gives up after the shortened window and keeps the configuration
    let state = plugins
        .create(
            &ctx(),
            &AcmePluginModel {
                name: "slow".into(),
                plugin_type: "standalone".into(),
                ..AcmePluginModel::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(state.id, Attr::known("slow"));
    assert_eq!(state.plugin_type, Attr::known("standalone"));
    assert_eq!(state.api, Attr::Null);

    let refreshed = plugins.read(&ctx(), &state).await.unwrap().unwrap();
    assert_eq!(refreshed.plugin_type, Attr::known("standalone"));
}
