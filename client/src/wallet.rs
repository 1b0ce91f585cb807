//! High-level wallet actions.
//!
//! [`Wallet`] is the boundary the UI calls into: connect/disconnect plus
//! deposit, withdraw, and mint, with client-side validation before any
//! remote call. Every failure comes back as one [`Error`](crate::Error) the
//! UI renders as a notification; nothing here retries on its own.

use crate::actor::{ActorCache, CasinoActor};
use crate::balance::BalanceTracker;
use crate::deposit::{DepositFlow, Settlement};
use crate::ports::{Clock, KvStore, Navigator};
use crate::provider::Connector;
use crate::session::{SessionManager, SessionState};
use crate::{Error, Result};
use aptc_types::{AccountId, Amount, PendingDeposit};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub struct Wallet {
    session: SessionManager,
    balance: Arc<BalanceTracker>,
    deposits: DepositFlow,
}

impl Wallet {
    pub fn new(
        connector: Connector,
        cache: Arc<ActorCache>,
        kv: Arc<dyn KvStore>,
        navigator: Arc<dyn Navigator>,
        canister_id: &str,
        host: &str,
        transfer_base: Url,
    ) -> Self {
        let balance = Arc::new(BalanceTracker::new(kv.clone()));
        let deposits = DepositFlow::new(balance.clone(), kv, navigator, transfer_base);
        Self {
            session: SessionManager::new(connector, cache, canister_id, host),
            balance,
            deposits,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn balance(&self) -> &BalanceTracker {
        &self.balance
    }

    pub fn deposits(&self) -> &DepositFlow {
        &self.deposits
    }

    fn account(&self) -> Result<AccountId> {
        match self.session.state() {
            SessionState::Connected { account, .. } => Ok(account),
            SessionState::Disconnected => Err(Error::NotConnected),
        }
    }

    fn actor(&self) -> Result<Arc<CasinoActor>> {
        self.session.actor()
    }

    /// Connect and refresh the balance for the new session.
    pub async fn connect(&self) -> Result<Amount> {
        let actor = self.session.connect().await?;
        let account = self.account()?;
        self.balance.refresh(&actor, &account).await
    }

    pub async fn disconnect(&self) {
        self.session.disconnect().await;
    }

    /// Authoritative balance refresh (falls back to the cached value when
    /// the service is unreachable).
    pub async fn refresh_balance(&self) -> Result<Amount> {
        let account = self.account()?;
        let actor = self.actor()?;
        self.balance.refresh(&actor, &account).await
    }

    /// Local-only balance read.
    pub async fn cached_balance(&self) -> Result<Amount> {
        let account = self.account()?;
        self.balance.cached(&account).await
    }

    /// Issue a deposit intent and open the pre-filled transfer page.
    pub async fn deposit(&self, amount: Amount) -> Result<PendingDeposit> {
        let account = self.account()?;
        let actor = self.actor()?;
        self.deposits.request(&actor, &account, amount).await
    }

    /// Manual settlement check for the pending deposit.
    pub async fn check_deposit(&self) -> Result<Settlement> {
        let actor = self.actor()?;
        self.deposits.check(&actor).await
    }

    /// Bounded settlement polling (fixed attempts, fixed delay).
    pub async fn wait_for_deposit(
        &self,
        clock: &dyn Clock,
        attempts: usize,
        interval: Duration,
    ) -> Result<Amount> {
        let actor = self.actor()?;
        self.deposits
            .wait_for_settlement(&actor, clock, attempts, interval)
            .await
    }

    /// Withdraw an exact amount, validated against the cached balance before
    /// any remote call is issued.
    pub async fn withdraw(&self, amount: Amount) -> Result<Amount> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        let account = self.account()?;
        let available = self.balance.cached(&account).await?;
        if amount > available {
            return Err(Error::InsufficientFunds {
                requested: amount,
                available,
            });
        }
        let actor = self.actor()?;
        let balance = actor.withdraw(&account, amount).await?;
        self.balance.adopt(&account, balance).await?;
        Ok(balance)
    }

    /// Withdraw the full balance; refused client-side when it is empty.
    pub async fn withdraw_all(&self) -> Result<Amount> {
        let account = self.account()?;
        let available = self.balance.cached(&account).await?;
        if available.is_zero() {
            return Err(Error::EmptyBalance);
        }
        let actor = self.actor()?;
        let balance = actor.withdraw_all(&account).await?;
        self.balance.adopt(&account, balance).await?;
        Ok(balance)
    }

    /// Mint test tokens to the connected account (dev deployments only).
    pub async fn mint(&self, amount: Amount) -> Result<Amount> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        let account = self.account()?;
        let actor = self.actor()?;
        let balance = actor.mint(&account, amount).await?;
        self.balance.adopt(&account, balance).await?;
        Ok(balance)
    }
}
