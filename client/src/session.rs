//! Wallet session lifecycle.
//!
//! The [`SessionManager`] owns exactly one provider connector and the actor
//! cache, publishes session changes through a watch channel, and guarantees
//! the cache is invalidated on every disconnect path (user-initiated or
//! pushed by the extension).

use crate::actor::{normalize_host, ActorCache, CasinoActor};
use crate::provider::{Connector, ExtensionEvent, WalletProvider};
use crate::Result;
use aptc_types::{AccountId, Principal};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Connection state, published to subscribers.
///
/// An account identifier exists only while connected; the enum makes the
/// invariant unrepresentable rather than checked.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected {
        principal: Principal,
        account: AccountId,
        locked: Option<bool>,
    },
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected { .. })
    }

    pub fn account(&self) -> Option<&AccountId> {
        match self {
            SessionState::Connected { account, .. } => Some(account),
            SessionState::Disconnected => None,
        }
    }
}

pub struct SessionManager {
    connector: Connector,
    cache: Arc<ActorCache>,
    canister_id: String,
    host: String,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    /// The cache is handed in at construction and scoped to the application
    /// lifetime; the manager never reaches for a global.
    pub fn new(connector: Connector, cache: Arc<ActorCache>, canister_id: &str, host: &str) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            connector,
            cache,
            canister_id: canister_id.to_string(),
            host: host.to_string(),
            state,
        }
    }

    /// Observe session changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    fn service_host(&self) -> String {
        if self.connector.normalizes_host() {
            normalize_host(&self.host)
        } else {
            self.host.clone()
        }
    }

    /// Connect through the provider and return the service actor.
    ///
    /// On failure the state is reset to disconnected and the error
    /// propagates; nothing is retried automatically.
    pub async fn connect(&self) -> Result<Arc<CasinoActor>> {
        let info = match self.connector.connect().await {
            Ok(info) => info,
            Err(err) => {
                self.state.send_replace(SessionState::Disconnected);
                return Err(err);
            }
        };
        let actor = match self.cache.get_or_create(
            &self.canister_id,
            &self.service_host(),
            Some(info.principal.clone()),
        ) {
            Ok(actor) => actor,
            Err(err) => {
                self.state.send_replace(SessionState::Disconnected);
                return Err(err);
            }
        };
        info!(principal = %info.principal, "wallet connected");
        self.state.send_replace(SessionState::Connected {
            principal: info.principal,
            account: info.account,
            locked: info.locked,
        });
        Ok(actor)
    }

    /// The cached actor for the current session (created if needed).
    pub fn actor(&self) -> Result<Arc<CasinoActor>> {
        self.cache.get_or_create(
            &self.canister_id,
            &self.service_host(),
            self.connector.identity(),
        )
    }

    /// Disconnect and clear all local session state.
    ///
    /// Provider-side failures are logged, not propagated: the local session
    /// and actor cache are cleared regardless.
    pub async fn disconnect(&self) {
        if let Err(err) = self.connector.disconnect().await {
            warn!(error = %err, "provider disconnect failed");
        }
        self.cache.invalidate();
        self.state.send_replace(SessionState::Disconnected);
        info!("wallet disconnected");
    }

    /// Re-query the provider; stale published state is never trusted.
    pub async fn is_connected(&self) -> bool {
        self.connector.is_connected().await
    }

    /// Apply a state change pushed by the extension wallet.
    pub fn apply_extension_event(&self, event: ExtensionEvent) {
        match event {
            ExtensionEvent::Disconnected => {
                debug!("extension reported external disconnect");
                self.cache.invalidate();
                self.state.send_replace(SessionState::Disconnected);
            }
            ExtensionEvent::LockChanged(new_locked) => {
                self.state.send_if_modified(|state| match state {
                    SessionState::Connected { locked, .. } if *locked != Some(new_locked) => {
                        *locked = Some(new_locked);
                        true
                    }
                    _ => false,
                });
            }
        }
    }

    /// Drain extension events until the transport drops its sender.
    pub async fn listen(&self, mut events: mpsc::UnboundedReceiver<ExtensionEvent>) {
        while let Some(event) = events.recv().await {
            self.apply_extension_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockExtension;
    use crate::provider::{ExtensionConnector, ExtensionSession, ExtensionTransport};
    use aptc_types::Identity;

    const CANISTER: &str = "aaaaa-aa";
    const HOST: &str = "https://icp0.io";

    fn manager_with_extension() -> (SessionManager, Arc<MockExtension>) {
        let identity = Identity::from_seed(4);
        let transport = Arc::new(MockExtension::new(ExtensionSession {
            principal: identity.principal(),
            account: identity.account_id(),
            locked: false,
        }));
        let connector = Connector::Extension(ExtensionConnector::new(
            Some(transport.clone()),
            vec![CANISTER.to_string()],
            HOST,
        ));
        let manager = SessionManager::new(connector, Arc::new(ActorCache::new()), CANISTER, HOST);
        (manager, transport)
    }

    #[tokio::test]
    async fn connect_publishes_connected_state() {
        let (manager, _) = manager_with_extension();
        let mut updates = manager.subscribe();
        assert_eq!(manager.state(), SessionState::Disconnected);

        manager.connect().await.unwrap();
        updates.changed().await.unwrap();
        let state = updates.borrow().clone();
        assert!(state.is_connected());
        assert!(state.account().is_some());
    }

    #[tokio::test]
    async fn disconnect_clears_state_and_cache_and_requeries_provider() {
        let (manager, transport) = manager_with_extension();
        manager.connect().await.unwrap();
        assert!(manager.is_connected().await);

        manager.disconnect().await;
        assert_eq!(manager.state(), SessionState::Disconnected);
        assert_eq!(manager.state().account(), None);
        // The provider is actually asked again, not short-circuited.
        assert!(!manager.is_connected().await);
        assert!(!transport.is_connected().await);
    }

    #[tokio::test]
    async fn external_disconnect_clears_session() {
        let (manager, transport) = manager_with_extension();
        let actor = manager.connect().await.unwrap();

        transport.force_disconnect();
        manager.apply_extension_event(ExtensionEvent::Disconnected);

        assert_eq!(manager.state(), SessionState::Disconnected);
        // The cache was invalidated; a new actor is a distinct proxy.
        let fresh = manager.actor().unwrap();
        assert!(!Arc::ptr_eq(&actor, &fresh));
    }

    #[tokio::test]
    async fn lock_changes_update_state_in_place() {
        let (manager, _) = manager_with_extension();
        manager.connect().await.unwrap();

        manager.apply_extension_event(ExtensionEvent::LockChanged(true));
        let SessionState::Connected { locked, .. } = manager.state() else {
            panic!("expected connected state");
        };
        assert_eq!(locked, Some(true));

        // Lock events while disconnected are ignored.
        manager.apply_extension_event(ExtensionEvent::Disconnected);
        manager.apply_extension_event(ExtensionEvent::LockChanged(false));
        assert_eq!(manager.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn connect_failure_resets_to_disconnected() {
        let (manager, transport) = manager_with_extension();
        transport
            .decline
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, crate::Error::Declined(_)));
        assert_eq!(manager.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn actor_creation_failure_after_provider_connect_resets_state() {
        let identity = Identity::from_seed(4);
        let transport = Arc::new(MockExtension::new(ExtensionSession {
            principal: identity.principal(),
            account: identity.account_id(),
            locked: false,
        }));
        // The provider accepts the connection, but the service host has an
        // unusable scheme so actor creation fails afterwards.
        let connector = Connector::Extension(ExtensionConnector::new(
            Some(transport.clone()),
            vec![CANISTER.to_string()],
            "ftp://icp0.io",
        ));
        let manager = SessionManager::new(
            connector,
            Arc::new(ActorCache::new()),
            CANISTER,
            "ftp://icp0.io",
        );
        let mut updates = manager.subscribe();

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, crate::Error::InvalidScheme(_)));
        assert!(transport.is_connected().await);
        // No connected state was published; the failed attempt explicitly
        // reset to disconnected.
        assert_eq!(manager.state(), SessionState::Disconnected);
        assert!(updates.has_changed().unwrap());
    }

    #[tokio::test]
    async fn listen_applies_events_until_sender_drops() {
        let (manager, _) = manager_with_extension();
        manager.connect().await.unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ExtensionEvent::LockChanged(true)).unwrap();
        tx.send(ExtensionEvent::Disconnected).unwrap();
        drop(tx);

        manager.listen(rx).await;
        assert_eq!(manager.state(), SessionState::Disconnected);
    }
}
