//! Poll-loop combinators shared by the four swap flows.
//!
//! Transport failures and "not there yet" answers are expected while
//! waiting for the counterparty, so they are swallowed and retried;
//! structural errors end the loop. Every loop is bounded, either by a
//! seconds budget or by the refund horizon of a funded contract.

use crate::{
    connector::{bitcoin, bitshares},
    timelock::RelativeLock,
};
use ::bitcoin::Txid;
use std::{future::Future, time::Duration};

pub(crate) trait Swallow {
    fn swallow(&self) -> bool;
}

impl Swallow for bitcoin::Error {
    fn swallow(&self) -> bool {
        self.is_transient()
    }
}

impl Swallow for bitshares::Error {
    fn swallow(&self) -> bool {
        self.is_transient()
    }
}

/// Polls `probe` every `interval` until it yields a value or the seconds
/// budget is used up.
pub(crate) async fn poll_countdown<T, E, F, Fut>(
    budget: Duration,
    interval: Duration,
    mut probe: F,
) -> anyhow::Result<Option<T>>
where
    E: Swallow + Into<anyhow::Error> + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let ticks = budget.as_secs() / interval.as_secs().max(1);

    for _ in 0..ticks {
        match probe().await {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => {}
            Err(e) if e.swallow() => tracing::trace!("swallowing chain error while polling: {}", e),
            Err(e) => return Err(e.into()),
        }

        tokio::time::sleep(interval).await;
    }

    Ok(None)
}

/// The refund horizon of a funded contract: `timelock` blocks on top of
/// the funding confirmation height.
#[derive(Debug)]
pub(crate) struct FundingHorizon {
    txid: Txid,
    observed_height: Option<u64>,
    lock_blocks: u64,
}

impl FundingHorizon {
    pub fn new(txid: Txid, observed_height: Option<u64>, timelock: RelativeLock) -> Self {
        Self {
            txid,
            observed_height,
            lock_blocks: timelock.as_blocks(),
        }
    }

    /// Whether the refund path has opened. Unconfirmed funding or a
    /// failing tip query both count as "not yet".
    pub async fn passed<C>(&mut self, connector: &C) -> bool
    where
        C: bitcoin::BitcoinChain,
    {
        if self.observed_height.is_none() {
            self.observed_height = connector.block_height_of(self.txid).await.ok().flatten();
        }

        match (self.observed_height, connector.chain_tip().await) {
            (Some(funded_at), Ok(tip)) => tip.height >= funded_at + self.lock_blocks,
            _ => false,
        }
    }
}

/// Polls `probe` every `interval` until it yields a value or the refund
/// horizon of the funded contract passes.
pub(crate) async fn poll_until_horizon<C, T, E, F, Fut>(
    connector: &C,
    horizon: &mut FundingHorizon,
    interval: Duration,
    mut probe: F,
) -> anyhow::Result<Option<T>>
where
    C: bitcoin::BitcoinChain,
    E: Swallow + Into<anyhow::Error> + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    loop {
        if horizon.passed(connector).await {
            return Ok(None);
        }

        match probe().await {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => {}
            Err(e) if e.swallow() => tracing::trace!("swallowing chain error while polling: {}", e),
            Err(e) => return Err(e.into()),
        }

        tokio::time::sleep(interval).await;
    }
}
