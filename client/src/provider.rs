//! Wallet provider adapters.
//!
//! Three providers can produce an identity usable for service calls: a
//! web-based identity provider (login flow, delegated principal), a
//! browser-extension wallet (permission request against an injected global),
//! and a developer-mode provider with a deterministic identity for local
//! replicas. All sit behind the [`WalletProvider`] capability trait and are
//! selected by availability probing, never by duplicated call sites.

use crate::ports::KvStore;
use crate::{Error, Result};
use aptc_types::{AccountId, Identity, Principal};
use async_trait::async_trait;
use commonware_utils::hex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use url::Url;

/// Well-known identity provider for production deployments.
pub const DEFAULT_IDENTITY_PROVIDER: &str = "https://identity.ic0.app";

/// KV key under which the identity-provider session is persisted.
const SESSION_KEY: &str = "identity-session";

/// Session data produced by a successful connect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionInfo {
    pub principal: Principal,
    pub account: AccountId,
    /// Lock state reported by the extension wallet; `None` for providers
    /// that have no lock concept.
    pub locked: Option<bool>,
}

/// Capability interface shared by both wallet providers.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Establish a session. Absence of the provider is the distinguished
    /// [`Error::Unavailable`]; a declined request is [`Error::Declined`].
    async fn connect(&self) -> Result<SessionInfo>;

    /// Tear down the session. Best-effort on the provider side; local state
    /// is always cleared.
    async fn disconnect(&self) -> Result<()>;

    /// Re-query the provider; never short-circuited by stale local state.
    async fn is_connected(&self) -> bool;

    /// The principal usable for subsequent service calls, if connected.
    fn identity(&self) -> Option<Principal>;
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
struct StoredSession {
    principal: Principal,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    session_key: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    principal: Principal,
}

/// Identity-provider variant: web login flow with durable session reuse.
///
/// An existing authenticated session (in memory or in the KV port) is
/// returned directly with no network round trip; otherwise a login request
/// carrying a fresh session public key is sent to the provider.
pub struct IdentityProviderConnector {
    http: reqwest::Client,
    provider_url: Url,
    kv: Arc<dyn KvStore>,
    session: Mutex<Option<StoredSession>>,
}

impl IdentityProviderConnector {
    pub fn new(provider_url: &str, kv: Arc<dyn KvStore>) -> Result<Self> {
        let provider_url = Url::parse(provider_url)?;
        match provider_url.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::InvalidScheme(scheme.to_string())),
        }
        Ok(Self {
            http: reqwest::Client::new(),
            provider_url,
            kv,
            session: Mutex::new(None),
        })
    }

    async fn stored_session(&self) -> Result<Option<StoredSession>> {
        if let Some(session) = self.session.lock().unwrap().clone() {
            return Ok(Some(session));
        }
        let Some(raw) = self.kv.get(SESSION_KEY).await? else {
            return Ok(None);
        };
        let session: StoredSession =
            serde_json::from_str(&raw).map_err(|err| Error::CorruptRecord(err.to_string()))?;
        *self.session.lock().unwrap() = Some(session.clone());
        Ok(Some(session))
    }

    async fn login(&self) -> Result<StoredSession> {
        // Fresh session key per login; the provider binds the delegation to it.
        let session_identity = Identity::from_seed(rand::thread_rng().gen());
        let session_key = hex(session_identity.public_key().as_ref());
        let url = self.provider_url.join("login")?;
        debug!(%url, "identity provider login");
        let response = self
            .http
            .post(url)
            .json(&LoginRequest {
                session_key: &session_key,
            })
            .send()
            .await?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Declined(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::FailedWithBody { status, body });
        }
        let login: LoginResponse = response.json().await?;
        let session = StoredSession {
            principal: login.principal,
        };
        let raw = serde_json::to_string(&session).map_err(|err| Error::Storage(err.to_string()))?;
        self.kv.set(SESSION_KEY, &raw).await?;
        *self.session.lock().unwrap() = Some(session.clone());
        info!(principal = %session.principal, "identity provider session established");
        Ok(session)
    }

    fn session_info(session: &StoredSession) -> SessionInfo {
        SessionInfo {
            principal: session.principal.clone(),
            account: session.principal.account_id(),
            locked: None,
        }
    }
}

#[async_trait]
impl WalletProvider for IdentityProviderConnector {
    async fn connect(&self) -> Result<SessionInfo> {
        if let Some(session) = self.stored_session().await? {
            debug!(principal = %session.principal, "reusing authenticated session");
            return Ok(Self::session_info(&session));
        }
        let session = self.login().await?;
        Ok(Self::session_info(&session))
    }

    async fn disconnect(&self) -> Result<()> {
        *self.session.lock().unwrap() = None;
        self.kv.remove(SESSION_KEY).await?;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        matches!(self.stored_session().await, Ok(Some(_)))
    }

    fn identity(&self) -> Option<Principal> {
        self.session
            .lock()
            .unwrap()
            .as_ref()
            .map(|session| session.principal.clone())
    }
}

/// Session data exposed by the extension wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionSession {
    pub principal: Principal,
    pub account: AccountId,
    pub locked: bool,
}

/// State changes pushed by the extension outside any call of ours.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtensionEvent {
    Disconnected,
    LockChanged(bool),
}

/// The browser-injected wallet global, abstracted as a port.
#[async_trait]
pub trait ExtensionTransport: Send + Sync {
    /// Permission request against an allow-list of canister ids and a host.
    /// A declined request surfaces as [`Error::Declined`].
    async fn request_connect(&self, whitelist: &[String], host: &str) -> Result<()>;

    async fn is_connected(&self) -> bool;

    async fn disconnect(&self);

    /// Current session data, if the extension holds an approved session.
    fn session(&self) -> Option<ExtensionSession>;
}

/// Extension-wallet variant.
///
/// `transport: None` models the extension not being injected at all; that is
/// the "unavailable" state rendered as an install call-to-action, distinct
/// from available-but-declined.
pub struct ExtensionConnector {
    transport: Option<Arc<dyn ExtensionTransport>>,
    whitelist: Vec<String>,
    host: String,
}

impl ExtensionConnector {
    pub fn new(
        transport: Option<Arc<dyn ExtensionTransport>>,
        whitelist: Vec<String>,
        host: &str,
    ) -> Self {
        Self {
            transport,
            whitelist,
            host: host.to_string(),
        }
    }

    pub fn available(&self) -> bool {
        self.transport.is_some()
    }

    fn transport(&self) -> Result<&Arc<dyn ExtensionTransport>> {
        self.transport.as_ref().ok_or(Error::Unavailable {
            provider: "extension wallet",
        })
    }
}

#[async_trait]
impl WalletProvider for ExtensionConnector {
    async fn connect(&self) -> Result<SessionInfo> {
        let transport = self.transport()?;
        if let Err(err) = transport.request_connect(&self.whitelist, &self.host).await {
            warn!(error = %err, "extension connect failed");
            return Err(err);
        }
        if !transport.is_connected().await {
            return Err(Error::Declined("extension reported not connected".into()));
        }
        let session = transport.session().ok_or_else(|| {
            Error::Declined("extension connected without session data".into())
        })?;
        Ok(SessionInfo {
            principal: session.principal,
            account: session.account,
            locked: Some(session.locked),
        })
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some(transport) = &self.transport {
            transport.disconnect().await;
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        match &self.transport {
            Some(transport) => transport.is_connected().await,
            None => false,
        }
    }

    fn identity(&self) -> Option<Principal> {
        self.transport
            .as_ref()
            .and_then(|transport| transport.session())
            .map(|session| session.principal)
    }
}

/// KV key for the developer-mode connected flag.
const DEV_STATE_KEY: &str = "dev-wallet-state";

/// Developer-mode variant: no external provider at all.
///
/// Uses a deterministic identity and persists only a connected flag, so the
/// rest of the stack can be exercised against a local replica without any
/// wallet installed.
pub struct DevConnector {
    identity: Identity,
    kv: Arc<dyn KvStore>,
}

impl DevConnector {
    pub fn new(seed: u64, kv: Arc<dyn KvStore>) -> Self {
        Self {
            identity: Identity::from_seed(seed),
            kv,
        }
    }
}

#[async_trait]
impl WalletProvider for DevConnector {
    async fn connect(&self) -> Result<SessionInfo> {
        self.kv.set(DEV_STATE_KEY, "connected").await?;
        info!(principal = %self.identity.principal(), "dev wallet connected");
        Ok(SessionInfo {
            principal: self.identity.principal(),
            account: self.identity.account_id(),
            locked: None,
        })
    }

    async fn disconnect(&self) -> Result<()> {
        self.kv.set(DEV_STATE_KEY, "disconnected").await?;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        matches!(
            self.kv.get(DEV_STATE_KEY).await,
            Ok(Some(state)) if state == "connected"
        )
    }

    fn identity(&self) -> Option<Principal> {
        Some(self.identity.principal())
    }
}

/// Tagged variant over the providers.
pub enum Connector {
    IdentityProvider(IdentityProviderConnector),
    Extension(ExtensionConnector),
    Dev(DevConnector),
}

impl Connector {
    /// Select a provider by availability: the extension wallet when its
    /// global is injected, the identity provider otherwise.
    pub fn probe(
        extension: Option<Arc<dyn ExtensionTransport>>,
        whitelist: Vec<String>,
        host: &str,
        provider_url: &str,
        kv: Arc<dyn KvStore>,
    ) -> Result<Connector> {
        if extension.is_some() {
            return Ok(Connector::Extension(ExtensionConnector::new(
                extension, whitelist, host,
            )));
        }
        Ok(Connector::IdentityProvider(IdentityProviderConnector::new(
            provider_url,
            kv,
        )?))
    }

    /// Localhost aliases are rewritten to the loopback IP for the
    /// identity-provider variant only.
    pub fn normalizes_host(&self) -> bool {
        matches!(self, Connector::IdentityProvider(_))
    }
}

#[async_trait]
impl WalletProvider for Connector {
    async fn connect(&self) -> Result<SessionInfo> {
        match self {
            Connector::IdentityProvider(provider) => provider.connect().await,
            Connector::Extension(extension) => extension.connect().await,
            Connector::Dev(dev) => dev.connect().await,
        }
    }

    async fn disconnect(&self) -> Result<()> {
        match self {
            Connector::IdentityProvider(provider) => provider.disconnect().await,
            Connector::Extension(extension) => extension.disconnect().await,
            Connector::Dev(dev) => dev.disconnect().await,
        }
    }

    async fn is_connected(&self) -> bool {
        match self {
            Connector::IdentityProvider(provider) => provider.is_connected().await,
            Connector::Extension(extension) => extension.is_connected().await,
            Connector::Dev(dev) => dev.is_connected().await,
        }
    }

    fn identity(&self) -> Option<Principal> {
        match self {
            Connector::IdentityProvider(provider) => provider.identity(),
            Connector::Extension(extension) => extension.identity(),
            Connector::Dev(dev) => dev.identity(),
        }
    }
}
