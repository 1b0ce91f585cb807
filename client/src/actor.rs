//! Remote casino actor and actor cache.
//!
//! A [`CasinoActor`] is the typed call proxy for one (canister, host) pair.
//! The [`ActorCache`] hands out shared proxies and is invalidated on every
//! disconnect path so a proxy never outlives the identity it was built for.

use crate::{Error, Result};
use aptc_types::{
    api::{
        BalanceResponse, DepositIntentRequest, DepositIntentResponse, DepositStatusResponse,
        MintRequest, MintResponse, WithdrawAllRequest, WithdrawRequest, WithdrawResponse,
    },
    AccountId, Amount, Principal,
};
use reqwest::Response;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use url::Url;

/// Header carrying the caller principal on authenticated calls.
const PRINCIPAL_HEADER: &str = "x-aptc-principal";

/// Rewrite localhost aliases to the loopback IP the local replica listens on.
pub fn normalize_host(host: &str) -> String {
    host.replace("localhost", "127.0.0.1")
}

/// Typed call proxy for the casino service.
///
/// All operations are plain request/response; there is no streaming and no
/// automatic retry. Failures surface once and the caller re-triggers.
#[derive(Clone, Debug)]
pub struct CasinoActor {
    http: reqwest::Client,
    base_url: Url,
    canister_id: String,
    principal: Option<Principal>,
}

impl CasinoActor {
    /// Create a proxy for `canister_id` served at `host`.
    ///
    /// The host must be an http or https URL. Creation failures are wrapped
    /// with the underlying message preserved.
    pub fn new(canister_id: &str, host: &str, identity: Option<Principal>) -> Result<Self> {
        if canister_id.is_empty() {
            return Err(Error::ActorCreation {
                message: "missing canister id".to_string(),
            });
        }
        let base_url = Url::parse(host)?;
        match base_url.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::InvalidScheme(scheme.to_string())),
        }
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| Error::ActorCreation {
                message: err.to_string(),
            })?;
        Ok(Self {
            http,
            base_url,
            canister_id: canister_id.to_string(),
            principal: identity,
        })
    }

    pub fn canister_id(&self) -> &str {
        &self.canister_id
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self
            .base_url
            .join(&format!("canister/{}/{path}", self.canister_id))?)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(%status, body, "casino service call failed");
        if body.is_empty() {
            Err(Error::Failed(status))
        } else {
            Err(Error::FailedWithBody { status, body })
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!(%url, "casino service query");
        let mut request = self.http.get(url);
        if let Some(principal) = &self.principal {
            request = request.header(PRINCIPAL_HEADER, principal.as_str());
        }
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!(%url, "casino service call");
        let mut request = self.http.post(url).json(body);
        if let Some(principal) = &self.principal {
            request = request.header(PRINCIPAL_HEADER, principal.as_str());
        }
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Authoritative balance query for `account`.
    pub async fn balance(&self, account: &AccountId) -> Result<Amount> {
        let response: BalanceResponse = self.get_json(&format!("balance/{account}")).await?;
        Ok(response.balance)
    }

    /// Ask the service for a (nonce, counterparty address) pair sized to
    /// `amount`.
    pub async fn request_deposit(
        &self,
        account: &AccountId,
        amount: Amount,
    ) -> Result<DepositIntentResponse> {
        self.post_json(
            "deposit/intent",
            &DepositIntentRequest {
                account: account.clone(),
                amount,
            },
        )
        .await
    }

    /// Is the external transfer identified by `nonce` settled?
    pub async fn deposit_status(&self, nonce: u64) -> Result<DepositStatusResponse> {
        self.get_json(&format!("deposit/status/{nonce}")).await
    }

    pub async fn withdraw(&self, to: &AccountId, amount: Amount) -> Result<Amount> {
        let response: WithdrawResponse = self
            .post_json("withdraw", &WithdrawRequest { to: to.clone(), amount })
            .await?;
        Ok(response.balance)
    }

    pub async fn withdraw_all(&self, to: &AccountId) -> Result<Amount> {
        let response: WithdrawResponse = self
            .post_json("withdraw_all", &WithdrawAllRequest { to: to.clone() })
            .await?;
        Ok(response.balance)
    }

    /// Mint test tokens (dev deployments only).
    pub async fn mint(&self, to: &AccountId, amount: Amount) -> Result<Amount> {
        let response: MintResponse = self
            .post_json("mint", &MintRequest { to: to.clone(), amount })
            .await?;
        Ok(response.balance)
    }
}

/// One proxy per distinct (canister, host) pair.
///
/// The entry is created while holding the map lock, so concurrent callers
/// for the same key observe the same proxy. Entries are never mutated, only
/// dropped wholesale by [`ActorCache::invalidate`]. The key deliberately
/// excludes the identity: a proxy built for one identity would be reused
/// after an identity switch, which is why every disconnect path invalidates.
#[derive(Debug, Default)]
pub struct ActorCache {
    entries: Mutex<HashMap<String, Arc<CasinoActor>>>,
}

impl ActorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(
        &self,
        canister_id: &str,
        host: &str,
        identity: Option<Principal>,
    ) -> Result<Arc<CasinoActor>> {
        let key = format!("{canister_id}@{host}");
        let mut entries = self.entries.lock().unwrap();
        if let Some(actor) = entries.get(&key) {
            return Ok(actor.clone());
        }
        let actor = Arc::new(CasinoActor::new(canister_id, host, identity)?);
        entries.insert(key, actor.clone());
        Ok(actor)
    }

    /// Drop all cached proxies. Called on every disconnect path.
    pub fn invalidate(&self) {
        let mut entries = self.entries.lock().unwrap();
        let dropped = entries.len();
        entries.clear();
        debug!(dropped, "actor cache invalidated");
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}
