//! Casino wallet operations tool.
//!
//! Usage:
//!   cargo run --bin casino-wallet -- --seed 1 balance
//!   cargo run --bin casino-wallet -- --seed 1 deposit 1.23456789
//!   cargo run --bin casino-wallet -- --seed 1 check-deposit --nonce 42
//!   cargo run --bin casino-wallet -- --seed 1 withdraw 0.5

use anyhow::Result;
use aptc_client::actor::{normalize_host, CasinoActor};
use aptc_client::deposit::transfer_url;
use aptc_types::{Amount, Identity, PendingDeposit};
use clap::{Parser, Subcommand};
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about = "Operate an APTC casino wallet from the command line")]
struct Args {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(long, default_value = "aaaaa-aa")]
    canister: String,

    /// Deterministic identity seed.
    #[arg(long, default_value = "0")]
    seed: u64,

    /// External transfer page for deposits.
    #[arg(long, default_value = "https://transfer.icp0.io/send")]
    transfer_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query the authoritative balance.
    Balance,
    /// Request a deposit intent and print the pre-filled transfer URL.
    Deposit { amount: String },
    /// Ask the service whether a deposit nonce has settled.
    CheckDeposit {
        #[arg(long)]
        nonce: u64,
    },
    /// Withdraw an exact amount.
    Withdraw { amount: String },
    /// Withdraw the full balance.
    WithdrawAll,
    /// Mint test tokens (dev deployments only).
    Mint { amount: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let identity = Identity::from_seed(args.seed);
    let account = identity.account_id();
    let actor = CasinoActor::new(
        &args.canister,
        &normalize_host(&args.url),
        Some(identity.principal()),
    )?;

    match args.command {
        Command::Balance => {
            let balance = actor.balance(&account).await?;
            println!("balance: {balance} ({} minor units)", balance.minor_units());
        }
        Command::Deposit { amount } => {
            let amount = Amount::parse(&amount)?;
            let intent = actor.request_deposit(&account, amount).await?;
            let record = PendingDeposit {
                nonce: intent.nonce,
                amount,
                account,
                deposit_address: intent.deposit_address,
            };
            let base = Url::parse(&args.transfer_url)?;
            println!("nonce: {}", record.nonce);
            println!("deposit address: {}", record.deposit_address);
            println!("transfer page: {}", transfer_url(&base, &record));
        }
        Command::CheckDeposit { nonce } => {
            let status = actor.deposit_status(nonce).await?;
            if status.settled {
                println!("settled, balance: {}", status.balance);
            } else {
                println!("not settled yet");
            }
        }
        Command::Withdraw { amount } => {
            let amount = Amount::parse(&amount)?;
            let balance = actor.withdraw(&account, amount).await?;
            println!("withdrew {amount}, balance: {balance}");
        }
        Command::WithdrawAll => {
            let balance = actor.withdraw_all(&account).await?;
            println!("withdrew everything, balance: {balance}");
        }
        Command::Mint { amount } => {
            let amount = Amount::parse(&amount)?;
            let balance = actor.mint(&account, amount).await?;
            println!("minted {amount}, balance: {balance}");
        }
    }

    Ok(())
}
