//! Durable pending-deposit record.

use crate::{AccountId, Amount};
use serde::{Deserialize, Serialize};

/// Local record of one outstanding deposit, persisted until the service
/// reports the matching transfer settled (or the user clears it).
///
/// The nonce doubles as the transfer memo and is the correlation key the
/// service uses to match the external transfer to this record. At most one
/// pending deposit is tracked at a time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDeposit {
    pub nonce: u64,
    pub amount: Amount,
    pub account: AccountId,
    pub deposit_address: String,
}
