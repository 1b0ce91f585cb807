//! Cached balance with publish/subscribe change notifications.
//!
//! The remote ledger owns the authoritative balance; this tracker holds a
//! best-effort local copy in the durable KV port and publishes every write
//! through a watch channel, so flows that need to react to a balance change
//! subscribe instead of polling local storage.

use crate::actor::CasinoActor;
use crate::ports::KvStore;
use crate::Result;
use aptc_types::{AccountId, Amount};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

fn cache_key(account: &AccountId) -> String {
    format!("balance:{account}")
}

pub struct BalanceTracker {
    kv: Arc<dyn KvStore>,
    sender: watch::Sender<Amount>,
}

impl BalanceTracker {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        let (sender, _) = watch::channel(Amount::ZERO);
        Self { kv, sender }
    }

    /// Observe balance writes. The receiver yields the current value
    /// immediately and every adopted value afterwards.
    pub fn subscribe(&self) -> watch::Receiver<Amount> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> Amount {
        *self.sender.borrow()
    }

    /// Authoritative refresh: remote query, cached locally on success. On
    /// remote failure the last locally cached value is returned instead and
    /// the error is logged, not propagated; the caller keeps a usable value.
    pub async fn refresh(&self, actor: &CasinoActor, account: &AccountId) -> Result<Amount> {
        match actor.balance(account).await {
            Ok(balance) => {
                self.adopt(account, balance).await?;
                Ok(balance)
            }
            Err(err) => {
                warn!(%account, error = %err, "balance refresh failed, using cached value");
                self.cached(account).await
            }
        }
    }

    /// Local-only read, for the refresh affordance that cannot reach the
    /// network. Falls back to zero when nothing was ever cached.
    pub async fn cached(&self, account: &AccountId) -> Result<Amount> {
        let Some(raw) = self.kv.get(&cache_key(account)).await? else {
            return Ok(Amount::ZERO);
        };
        let units = raw.parse::<u64>().unwrap_or_else(|_| {
            warn!(%account, raw, "discarding unparseable cached balance");
            0
        });
        Ok(Amount::from_minor_units(units))
    }

    /// Adopt an authoritative value received in a service response (deposit
    /// settlement, withdraw, mint): persist it and notify subscribers.
    pub async fn adopt(&self, account: &AccountId, balance: Amount) -> Result<()> {
        self.kv
            .set(&cache_key(account), &balance.minor_units().to_string())
            .await?;
        self.sender.send_replace(balance);
        debug!(%account, %balance, "balance adopted");
        Ok(())
    }

    /// Forget the cached value (disconnect path).
    pub async fn clear(&self, account: &AccountId) -> Result<()> {
        self.kv.remove(&cache_key(account)).await?;
        self.sender.send_replace(Amount::ZERO);
        Ok(())
    }
}
