//! Deposit reconciliation.
//!
//! A deposit is an off-chain transfer the user performs on an external page;
//! the service hands out a (nonce, counterparty address) pair, the client
//! records it durably, and settlement is discovered by asking the service
//! whether the nonce has settled. Settlement is polled, not pushed, and a
//! pending record persists until confirmed or cleared.

use crate::actor::CasinoActor;
use crate::balance::BalanceTracker;
use crate::ports::{Clock, KvStore, Navigator};
use crate::{Error, Result};
use aptc_types::{AccountId, Amount, PendingDeposit};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// KV key under which the pending-deposit record is persisted.
const PENDING_KEY: &str = "pending-deposit";

/// Outcome of a settlement check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// Settled; the authoritative post-deposit balance has been adopted.
    Settled(Amount),
    /// Not settled yet; the pending record is left untouched.
    Pending,
}

/// Build the pre-filled external transfer URL for a pending deposit.
///
/// The amount is decimal text preserving the full 8-digit precision of the
/// recorded minor units; the memo is the correlating nonce.
pub fn transfer_url(base: &Url, record: &PendingDeposit) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("to", &record.deposit_address)
        .append_pair("amount", &record.amount.to_string())
        .append_pair("memo", &record.nonce.to_string());
    url
}

pub struct DepositFlow {
    balance: Arc<BalanceTracker>,
    kv: Arc<dyn KvStore>,
    navigator: Arc<dyn Navigator>,
    transfer_base: Url,
}

impl DepositFlow {
    pub fn new(
        balance: Arc<BalanceTracker>,
        kv: Arc<dyn KvStore>,
        navigator: Arc<dyn Navigator>,
        transfer_base: Url,
    ) -> Self {
        Self {
            balance,
            kv,
            navigator,
            transfer_base,
        }
    }

    /// The locally tracked pending deposit, if any.
    pub async fn pending(&self) -> Result<Option<PendingDeposit>> {
        let Some(raw) = self.kv.get(PENDING_KEY).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| Error::CorruptRecord(err.to_string()))
    }

    /// Issue a deposit request for `amount` and open the transfer page.
    ///
    /// Zero amounts are refused before any remote call. Only one deposit may
    /// be outstanding at a time; settle or clear the previous one first.
    pub async fn request(
        &self,
        actor: &CasinoActor,
        account: &AccountId,
        amount: Amount,
    ) -> Result<PendingDeposit> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        if let Some(existing) = self.pending().await? {
            return Err(Error::DepositInProgress {
                nonce: existing.nonce,
            });
        }

        let intent = actor.request_deposit(account, amount).await?;
        let record = PendingDeposit {
            nonce: intent.nonce,
            amount,
            account: account.clone(),
            deposit_address: intent.deposit_address,
        };
        let raw = serde_json::to_string(&record).map_err(|err| Error::Storage(err.to_string()))?;
        self.kv.set(PENDING_KEY, &raw).await?;
        info!(nonce = record.nonce, %amount, "deposit requested");

        self.navigator.open(&transfer_url(&self.transfer_base, &record))?;
        Ok(record)
    }

    /// Ask the service whether the pending deposit has settled.
    ///
    /// On settlement the authoritative balance is adopted and the record
    /// cleared; otherwise the record stays untouched for a later retry.
    pub async fn check(&self, actor: &CasinoActor) -> Result<Settlement> {
        let record = self.pending().await?.ok_or(Error::NoPendingDeposit)?;
        let status = actor.deposit_status(record.nonce).await?;
        if !status.settled {
            debug!(nonce = record.nonce, "deposit not settled yet");
            return Ok(Settlement::Pending);
        }
        self.balance.adopt(&record.account, status.balance).await?;
        self.kv.remove(PENDING_KEY).await?;
        info!(
            nonce = record.nonce,
            balance = %status.balance,
            "deposit settled"
        );
        Ok(Settlement::Settled(status.balance))
    }

    /// Poll settlement with a fixed attempt count and fixed delay.
    pub async fn wait_for_settlement(
        &self,
        actor: &CasinoActor,
        clock: &dyn Clock,
        attempts: usize,
        interval: Duration,
    ) -> Result<Amount> {
        for attempt in 0..attempts {
            if attempt > 0 {
                clock.sleep(interval).await;
            }
            if let Settlement::Settled(balance) = self.check(actor).await? {
                return Ok(balance);
            }
        }
        Err(Error::SettlementTimeout { attempts })
    }

    /// Drop the pending record without settling it.
    pub async fn clear(&self) -> Result<()> {
        self.kv.remove(PENDING_KEY).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aptc_types::Identity;

    #[test]
    fn transfer_url_carries_full_precision_and_memo() {
        let base = Url::parse("https://transfer.example/send").unwrap();
        let record = PendingDeposit {
            nonce: 42,
            amount: Amount::parse("1.23456789").unwrap(),
            account: Identity::from_seed(1).account_id(),
            deposit_address: "abc-def".to_string(),
        };
        let url = transfer_url(&base, &record);
        assert_eq!(
            url.as_str(),
            "https://transfer.example/send?to=abc-def&amount=1.23456789&memo=42"
        );
    }

    #[test]
    fn transfer_url_preserves_sub_unit_amounts() {
        let base = Url::parse("https://transfer.example/send").unwrap();
        let record = PendingDeposit {
            nonce: 7,
            amount: Amount::from_minor_units(1),
            account: Identity::from_seed(1).account_id(),
            deposit_address: "abc-def".to_string(),
        };
        let url = transfer_url(&base, &record);
        assert!(url.as_str().contains("amount=0.00000001"));
    }
}
