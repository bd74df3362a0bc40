//! The Bitshares half of a swap.
//!
//! Bitshares has HTLCs as a native chain operation, so this side needs no
//! script machinery: the module only fixes the parameter tuple both
//! parties agree on and wraps the connector calls into protocol events.
//! An expired contract refunds by protocol, without anyone acting.

use crate::{
    asset,
    connector::bitshares::{AccountId, BitsharesChain, CreateHtlc, Error, HtlcId, HtlcQuery},
    SecretHash,
};

/// Everything both parties know about the Bitshares side of a swap.
#[derive(Debug, Clone)]
pub struct Params {
    pub asset: asset::Bitshares,
    pub redeem_account: AccountId,
    pub refund_account: AccountId,
    pub expiry_secs: u64,
    pub secret_hash: SecretHash,
}

impl Params {
    fn create_operation(&self) -> CreateHtlc {
        CreateHtlc {
            amount: self.asset,
            to: self.redeem_account.clone(),
            secret_hash: self.secret_hash,
            expiry_secs: self.expiry_secs,
        }
    }

    /// The exact tuple the counterparty uses to recognise this contract.
    pub fn query(&self) -> HtlcQuery {
        HtlcQuery {
            from: self.refund_account.clone(),
            to: self.redeem_account.clone(),
            amount: self.asset,
            secret_hash: self.secret_hash,
            expiry_secs: self.expiry_secs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Created {
    pub id: HtlcId,
}

pub async fn create<C>(connector: &C, params: &Params) -> Result<Created, Error>
where
    C: BitsharesChain,
{
    let id = connector.create_htlc(&params.create_operation()).await?;
    tracing::info!("bitshares contract {} created", id);

    Ok(Created { id })
}
