//! The swap direction where the proposer gives bitcoin and takes the
//! Bitshares asset.
//!
//! The proposer funds the Bitcoin contract first, with the full
//! confirmation horizon as timelock. The accepter answers with a
//! Bitshares contract locked for half that horizon in seconds. The
//! proposer's redemption of the Bitshares contract reveals the preimage,
//! with which the accepter then takes the bitcoin.

use crate::{
    connector::{bitcoin::BitcoinChain, bitshares::BitsharesChain},
    hbit, hbts,
    swap::{poll, Finish, InvalidInput, SwapConfig},
    Secret,
};
use anyhow::Context;
use std::time::Duration;

pub async fn proposer<BC, BS>(
    bitcoin: &BC,
    bitshares: &BS,
    config: &SwapConfig,
) -> anyhow::Result<Finish>
where
    BC: BitcoinChain,
    BS: BitsharesChain,
{
    let secret = config
        .lock
        .secret()
        .context("the proposer role requires the secret preimage")?;

    let params = hbit::Params {
        network: config.network,
        asset: config.bitcoin_amount,
        redeem_identity: config.counterparty_bitcoin_identity,
        refund_identity: config.our_bitcoin_identity(),
        timelock: config.horizon.blocks(),
        secret_hash: config.secret_hash(),
    };

    let fee = hbit::Fee::calculate(bitcoin, config.priority, hbit::HTLC_SPEND_VSIZE)
        .await
        .context("failed to estimate fees")?;

    let funded = hbit::fund(
        bitcoin,
        &params,
        &config.bitcoin_key.key,
        config.funding_transaction,
        fee,
    )
    .await
    .context("failed to fund the bitcoin contract")?;

    // From here on our bitcoin is locked; on any failure the best we can
    // do is attempt the refund before surfacing the original error.
    match redeem_bitshares_or_refund(bitcoin, bitshares, config, &params, &funded, secret).await {
        Ok(finish) => Ok(finish),
        Err(error) => {
            if let Err(refund_error) = hbit::broadcast_refund(bitcoin, &funded).await {
                tracing::error!("refund attempt also failed: {:#}", refund_error);
            }
            Err(error)
        }
    }
}

async fn redeem_bitshares_or_refund<BC, BS>(
    bitcoin: &BC,
    bitshares: &BS,
    config: &SwapConfig,
    params: &hbit::Params,
    funded: &hbit::Funded,
    secret: Secret,
) -> anyhow::Result<Finish>
where
    BC: BitcoinChain,
    BS: BitsharesChain,
{
    let mut horizon =
        poll::FundingHorizon::new(funded.location.txid, funded.block_height, params.timelock);

    // Redeeming doubles as the poll: the connector answers `false` for as
    // long as the counterparty's contract does not exist.
    let redeemed = poll::poll_until_horizon(bitcoin, &mut horizon, config.check_interval, || {
        let amount = config.bitshares_amount;
        async move {
            let done = bitshares.redeem_htlc(amount, secret).await?;
            Ok::<_, crate::connector::bitshares::Error>(done.then(|| ()))
        }
    })
    .await?;

    match redeemed {
        Some(()) => {
            tracing::info!("bitshares contract redeemed; the preimage is now public");
            Ok(Finish::Swapped)
        }
        None => {
            tracing::warn!("counterparty never delivered; refunding the bitcoin contract");
            hbit::broadcast_refund(bitcoin, funded)
                .await
                .context("failed to broadcast the refund transaction")?;

            Ok(Finish::Refunded)
        }
    }
}

pub async fn accepter<BC, BS>(
    bitcoin: &BC,
    bitshares: &BS,
    config: &SwapConfig,
) -> anyhow::Result<Finish>
where
    BC: BitcoinChain,
    BS: BitsharesChain,
{
    let secret_hash = config.secret_hash();

    let params = hbit::Params {
        network: config.network,
        asset: config.bitcoin_amount,
        redeem_identity: config.our_bitcoin_identity(),
        refund_identity: config.counterparty_bitcoin_identity,
        timelock: config.horizon.blocks(),
        secret_hash,
    };

    let fee = hbit::Fee::calculate(bitcoin, config.priority, hbit::HTLC_SPEND_VSIZE)
        .await
        .context("failed to estimate fees")?;

    let address = params.compute_address();
    tracing::debug!("waiting for the counterparty to fund {}", address);

    let payment = poll::poll_countdown(config.fund_wait, config.check_interval, || {
        let address = address.clone();
        async move { bitcoin.last_payment_to(&address).await.map(Some) }
    })
    .await?
    .context("counterparty did not fund the bitcoin contract within the configured window")?;

    // The proposer deducts their spend fee from the agreed amount; any
    // deduction beyond the upper fee bound means we are being shorted.
    let required = config.bitcoin_amount.as_sat().saturating_sub(fee.max.as_sat());
    if payment.value.as_sat() < required {
        return Err(InvalidInput::Shortfall {
            available: payment.value,
            required: crate::asset::Bitcoin::from_sat(required),
        }
        .into());
    }

    let (location, locked) = hbit::locate_output(bitcoin, &params, payment.txid)
        .await
        .context("failed to inspect the funding transaction")?
        .context("funding transaction does not pay the contract address")?;

    // Act-second rule: our own leg only stays locked for half as long.
    let expiry_secs = config
        .horizon
        .seconds(bitcoin)
        .await
        .context("failed to derive the bitshares timelock")?
        / 2;

    let counterparty_account = bitshares
        .account_id(&config.counterparty_bitshares_account)
        .await
        .context("failed to resolve the counterparty account")?;

    let bts_params = hbts::Params {
        asset: config.bitshares_amount,
        redeem_account: counterparty_account.clone(),
        refund_account: bitshares.account().clone(),
        expiry_secs,
        secret_hash,
    };
    hbts::create(bitshares, &bts_params)
        .await
        .context("failed to create the bitshares contract")?;

    let our_account = bitshares.account().clone();
    let secret = poll::poll_countdown(
        Duration::from_secs(expiry_secs),
        config.check_interval,
        || {
            let from = our_account.clone();
            let to = counterparty_account.clone();
            async move { bitshares.preimage_of(&from, &to, secret_hash).await }
        },
    )
    .await?;

    match secret {
        Some(secret) => {
            if !secret_hash.matches(secret) {
                anyhow::bail!("counterparty revealed a preimage that does not match the agreed hash");
            }

            hbit::redeem(
                bitcoin,
                &params,
                location,
                locked,
                &config.bitcoin_key.key,
                secret,
                fee,
            )
            .await
            .context("failed to redeem the bitcoin contract")?;

            Ok(Finish::Swapped)
        }
        None => {
            tracing::warn!(
                "counterparty never redeemed; the bitshares contract refunds by protocol on expiry"
            );

            Ok(Finish::Refunded)
        }
    }
}
