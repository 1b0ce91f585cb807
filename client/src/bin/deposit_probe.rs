//! Deposit flow probe: issues a deposit intent and polls settlement.
//!
//! Intended against a dev deployment where the operator settles the transfer
//! out-of-band while this tool polls.

use anyhow::Result;
use aptc_client::actor::{normalize_host, CasinoActor};
use aptc_client::balance::BalanceTracker;
use aptc_client::deposit::DepositFlow;
use aptc_client::ports::{MemoryStore, TokioClock, TracingNavigator};
use aptc_types::{Amount, Identity};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

fn base_url() -> String {
    env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

fn canister_id() -> String {
    env::var("CANISTER_ID").unwrap_or_else(|_| "aaaaa-aa".to_string())
}

fn amount() -> String {
    env::var("AMOUNT").unwrap_or_else(|_| "1".to_string())
}

fn attempts() -> usize {
    env::var("ATTEMPTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30)
}

fn interval() -> Duration {
    let millis = env::var("INTERVAL_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(2_000);
    Duration::from_millis(millis)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let identity = Identity::from_seed(
        env::var("SEED").ok().and_then(|v| v.parse().ok()).unwrap_or(0),
    );
    let account = identity.account_id();
    let amount = Amount::parse(&amount())?;

    let actor = CasinoActor::new(
        &canister_id(),
        &normalize_host(&base_url()),
        Some(identity.principal()),
    )?;

    let kv = Arc::new(MemoryStore::new());
    let balance = Arc::new(BalanceTracker::new(kv.clone()));
    let flow = DepositFlow::new(
        balance,
        kv,
        Arc::new(TracingNavigator),
        Url::parse("https://transfer.icp0.io/send")?,
    );

    let record = flow.request(&actor, &account, amount).await?;
    println!(
        "deposit requested: nonce={} address={} amount={}",
        record.nonce, record.deposit_address, record.amount
    );

    let settled = flow
        .wait_for_settlement(&actor, &TokioClock, attempts(), interval())
        .await?;
    println!("settled, balance: {settled}");

    Ok(())
}
