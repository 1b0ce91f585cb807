//! JSON exchanges of the remote casino service.
//!
//! The wire schema is owned by the service; the client only carries typed
//! request/response bodies. Amounts travel as u64 minor units.

use crate::{AccountId, Amount};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: Amount,
}

/// Ask the service for a deposit intent sized to `amount`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositIntentRequest {
    pub account: AccountId,
    pub amount: Amount,
}

/// A (nonce, counterparty address) pair correlating an external transfer to
/// a pending deposit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositIntentResponse {
    pub nonce: u64,
    pub deposit_address: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositStatusResponse {
    pub settled: bool,
    /// Authoritative balance once settled; the last known balance otherwise.
    pub balance: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub to: AccountId,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawAllRequest {
    pub to: AccountId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawResponse {
    pub balance: Amount,
}

/// Test-token faucet request (dev deployments only).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    pub to: AccountId,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintResponse {
    pub balance: Amount,
}
