//! Bitshares chain access.
//!
//! The Bitshares wire protocol is not part of this crate; implementations
//! of [`BitsharesChain`] wrap a WebSocket client for a Bitshares node and
//! sign with the key they were constructed with. An implementation owns
//! its connection and releases it when dropped, so connection lifetime is
//! scoped to the swap that created it.

use crate::{asset, Secret, SecretHash};
use async_trait::async_trait;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to query the chain source")]
    Query(#[source] anyhow::Error),
    #[error("no matching object found")]
    NotFound,
    #[error("operation was rejected by the network: {reason}")]
    Rejected { reason: String },
}

impl Error {
    /// Transient errors are treated as "not yet" inside polling loops.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Query(_) | Error::NotFound)
    }
}

/// A Bitshares object id, e.g. `1.16.124`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HtlcId(pub String);

impl fmt::Display for HtlcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Bitshares account id, e.g. `1.2.12345`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId(pub String);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything needed to create an HTLC locking funds of the signing
/// account.
#[derive(Debug, Clone)]
pub struct CreateHtlc {
    pub amount: asset::Bitshares,
    pub to: AccountId,
    pub secret_hash: SecretHash,
    pub expiry_secs: u64,
}

/// The exact parameter tuple identifying a counterparty's HTLC.
#[derive(Debug, Clone)]
pub struct HtlcQuery {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: asset::Bitshares,
    pub secret_hash: SecretHash,
    pub expiry_secs: u64,
}

#[async_trait]
pub trait BitsharesChain: Send + Sync {
    /// The account the connector signs for.
    fn account(&self) -> &AccountId;

    /// Resolves an account name to its id.
    async fn account_id(&self, name: &str) -> Result<AccountId, Error>;

    /// Creates an HTLC locking `amount` from the signing account,
    /// redeemable against the preimage of `secret_hash` within
    /// `expiry_secs` seconds.
    async fn create_htlc(&self, htlc: &CreateHtlc) -> Result<HtlcId, Error>;

    /// Attempts to redeem an HTLC paying the signing account.
    ///
    /// Returns `false` while no matching contract exists; this is the
    /// poll primitive of the proposer's happy path, so "not there yet"
    /// is a value, not an error.
    async fn redeem_htlc(&self, amount: asset::Bitshares, secret: Secret) -> Result<bool, Error>;

    /// Looks up an HTLC matching the exact parameter tuple.
    async fn find_htlc(&self, query: &HtlcQuery) -> Result<Option<HtlcId>, Error>;

    /// The preimage revealed by the counterparty's redemption of the HTLC
    /// from `from` to `to`, once it happened.
    async fn preimage_of(
        &self,
        from: &AccountId,
        to: &AccountId,
        secret_hash: SecretHash,
    ) -> Result<Option<Secret>, Error>;
}
