//! Domain types shared by the APTC casino wallet SDK.
//!
//! Defines fixed-point token amounts, identities/principals, the durable
//! pending-deposit record, and the JSON exchanges of the casino service.

pub mod amount;
pub mod api;
pub mod deposit;
pub mod identity;

pub use amount::{Amount, ParseAmountError};
pub use deposit::PendingDeposit;
pub use identity::{AccountId, Identity, ParsePrincipalError, Principal};
