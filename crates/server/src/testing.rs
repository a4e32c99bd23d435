//! Shared test fixtures: sample data, fake signers and push senders, and a
//! fully wired router over in-memory stores.

#![allow(clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use secrecy::SecretString;
use tempfile::TempDir;

use glowpass_core::{CustomerId, PassTypeId, PushToken};

use crate::config::{ApnsConfig, PassConfig, WalletConfig};
use crate::db::memory::{InMemoryCustomerStore, InMemoryRegistrationStore};
use crate::models::Customer;
use crate::pass::{PassBuilder, SignError, Signer, TEMPLATE_RESOURCES, ZipArchiver};
use crate::push::{PushError, PushSender};
use crate::state::AppState;

/// A sample customer with the given id and visit count.
pub fn customer(id: &str, visits: u32) -> Customer {
    Customer {
        id: CustomerId::new(id),
        name: "Ana Torres".to_owned(),
        email: None,
        visits,
        next_reward: Some("Free facial".to_owned()),
        redeemed_rewards: vec![],
        wallet_link: None,
        last_pass_update: None,
    }
}

/// A pass configuration with placeholder paths. Tests that build containers
/// get real directories from [`builder_with_signer`].
pub fn pass_config() -> PassConfig {
    PassConfig {
        pass_type_id: PassTypeId::new("pass.com.glowpass"),
        team_id: "TEAM123456".to_owned(),
        organization_name: "Glow Studio".to_owned(),
        template_dir: PathBuf::from("/nonexistent/template"),
        artifacts_dir: PathBuf::from("/nonexistent/artifacts"),
        certificate_path: PathBuf::from("/nonexistent/pass.pem"),
        private_key_path: PathBuf::from("/nonexistent/pass.key"),
        wwdr_certificate_path: PathBuf::from("/nonexistent/wwdr.pem"),
        signing_timeout: Duration::from_secs(1),
    }
}

fn wallet_config(pass: PassConfig) -> WalletConfig {
    WalletConfig {
        database_url: SecretString::from("postgres://unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "https://glowpass.test".to_owned(),
        pass,
        apns: ApnsConfig {
            endpoint: "https://api.sandbox.push.apple.com".to_owned(),
            push_timeout: Duration::from_secs(1),
        },
        sentry_dsn: None,
    }
}

/// Temp directories backing a builder; dropped with the test.
pub struct TestDirs {
    pub template: TempDir,
    pub artifacts: TempDir,
}

/// A builder over fresh temp directories, with template images in place.
pub fn builder_with_signer(signer: Arc<dyn Signer>) -> (PassBuilder, TestDirs) {
    let dirs = TestDirs {
        template: TempDir::new().unwrap(),
        artifacts: TempDir::new().unwrap(),
    };
    for name in TEMPLATE_RESOURCES {
        std::fs::write(
            dirs.template.path().join(name),
            format!("png-bytes-{name}"),
        )
        .unwrap();
    }

    let mut config = pass_config();
    config.template_dir = dirs.template.path().to_path_buf();
    config.artifacts_dir = dirs.artifacts.path().to_path_buf();

    let builder = PassBuilder::new(
        config,
        "https://glowpass.test",
        signer,
        Arc::new(ZipArchiver),
    );
    (builder, dirs)
}

/// Deterministic signer: the "signature" is a tagged copy of the input hash.
pub struct FakeSigner;

impl FakeSigner {
    /// The signature [`FakeSigner`] produces for `manifest_bytes`.
    pub fn signature_for(manifest_bytes: &[u8]) -> Vec<u8> {
        let mut signature = b"fake-signature:".to_vec();
        signature.extend_from_slice(crate::pass::manifest::sha1_hex(manifest_bytes).as_bytes());
        signature
    }
}

#[async_trait]
impl Signer for FakeSigner {
    async fn sign(&self, manifest_bytes: &[u8]) -> Result<Vec<u8>, SignError> {
        Ok(Self::signature_for(manifest_bytes))
    }
}

/// Signer that fails its first `failures` calls with a transient tool error.
pub struct FlakySigner {
    failures: u32,
    attempts: AtomicU32,
}

impl FlakySigner {
    pub const fn failing(failures: u32) -> Self {
        Self {
            failures,
            attempts: AtomicU32::new(0),
        }
    }

    /// Total sign attempts observed.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Signer for FlakySigner {
    async fn sign(&self, manifest_bytes: &[u8]) -> Result<Vec<u8>, SignError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(SignError::Tool {
                status: 1,
                stderr: "simulated tool failure".to_owned(),
            });
        }
        Ok(FakeSigner::signature_for(manifest_bytes))
    }
}

type FailureFactory = Box<dyn Fn() -> PushError + Send + Sync>;
type OnSend = Box<dyn Fn() + Send + Sync>;

/// Push sender that records sent tokens instead of talking to a gateway.
#[derive(Default)]
pub struct RecordingPushSender {
    sent: Mutex<Vec<PushToken>>,
    failure: Option<FailureFactory>,
    on_send: Mutex<Option<OnSend>>,
}

impl RecordingPushSender {
    /// A sender whose every send fails with the produced error.
    pub fn failing_with(factory: impl Fn() -> PushError + Send + Sync + 'static) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(Box::new(factory)),
            on_send: Mutex::new(None),
        }
    }

    /// Tokens sent so far, in order.
    pub fn sent(&self) -> Vec<PushToken> {
        self.sent.lock().unwrap().clone()
    }

    /// Install a hook invoked at the instant of each send.
    pub fn set_on_send(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_send.lock().unwrap() = Some(Box::new(hook));
    }
}

#[async_trait]
impl PushSender for RecordingPushSender {
    async fn send_silent(&self, token: &PushToken, _topic: &PassTypeId) -> Result<(), PushError> {
        if let Some(hook) = self.on_send.lock().unwrap().as_ref() {
            hook();
        }
        self.sent.lock().unwrap().push(token.clone());
        match &self.failure {
            Some(factory) => Err(factory()),
            None => Ok(()),
        }
    }
}

/// A wired-up application over in-memory stores, for route tests.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub customers: Arc<InMemoryCustomerStore>,
    pub registrations: Arc<InMemoryRegistrationStore>,
    pub push: Arc<RecordingPushSender>,
    _dirs: TestDirs,
}

/// Build a [`TestApp`] seeded with `customers`.
pub fn app(customers: Vec<Customer>) -> TestApp {
    let push = Arc::new(RecordingPushSender::default());
    let customers = Arc::new(InMemoryCustomerStore::with_customers(customers));
    let registrations = Arc::new(InMemoryRegistrationStore::default());
    let (builder, dirs) = builder_with_signer(Arc::new(FakeSigner));

    let mut config = wallet_config(pass_config());
    config.pass.template_dir = dirs.template.path().to_path_buf();
    config.pass.artifacts_dir = dirs.artifacts.path().to_path_buf();

    let state = AppState::from_parts(
        config,
        customers.clone(),
        registrations.clone(),
        Arc::new(builder),
        push.clone(),
    );
    let router = crate::routes::routes().with_state(state.clone());

    TestApp {
        router,
        state,
        customers,
        registrations,
        push,
        _dirs: dirs,
    }
}
