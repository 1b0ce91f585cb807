//! Wallet session and ledger SDK for the APTC casino service.
//!
//! The hard accounting (balances, randomness, game outcomes) lives in the
//! remote canister service; this crate mediates user actions against it:
//! wallet connect/disconnect across two providers, a cached call proxy per
//! (canister, host), deposit reconciliation against the external ledger via
//! nonce/memo matching, and a locally cached balance with change
//! notifications.

pub mod actor;
pub mod balance;
pub mod deposit;
pub mod ports;
pub mod provider;
pub mod session;
pub mod wallet;

pub use actor::{ActorCache, CasinoActor};
pub use balance::BalanceTracker;
pub use deposit::{DepositFlow, Settlement};
pub use provider::{Connector, DevConnector, WalletProvider};
pub use session::{SessionManager, SessionState};
pub use wallet::Wallet;

use aptc_types::Amount;
use thiserror::Error;

/// Error type for wallet operations.
///
/// Every failure surfaces once at the action boundary; nothing is retried
/// automatically.
#[derive(Error, Debug)]
pub enum Error {
    /// The required provider is not present. Rendered as an install/setup
    /// call-to-action, not as a failure.
    #[error("{provider} is not available")]
    Unavailable { provider: &'static str },
    /// The user declined or cancelled; state is reset to disconnected.
    #[error("connection declined: {0}")]
    Declined(String),
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {0}")]
    Failed(reqwest::StatusCode),
    #[error("failed: {status}: {body}")]
    FailedWithBody {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to create actor: {message}")]
    ActorCreation { message: String },
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
    #[error("invalid amount: {0}")]
    Amount(#[from] aptc_types::ParseAmountError),
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("balance is empty")]
    EmptyBalance,
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Amount,
        available: Amount,
    },
    #[error("wallet is not connected")]
    NotConnected,
    #[error("no pending deposit")]
    NoPendingDeposit,
    #[error("deposit with nonce {nonce} is still pending; settle or clear it first")]
    DepositInProgress { nonce: u64 },
    #[error("deposit not settled after {attempts} attempts")]
    SettlementTimeout { attempts: usize },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("corrupt durable record: {0}")]
    CorruptRecord(String),
}

/// Result type for wallet operations.
pub type Result<T> = std::result::Result<T, Error>;
