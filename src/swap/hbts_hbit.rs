//! The swap direction where the proposer gives the Bitshares asset and
//! takes bitcoin.
//!
//! The proposer creates the Bitshares contract first, locked for the full
//! horizon in seconds. The accepter answers with a Bitcoin contract whose
//! timelock is half the horizon in blocks. The proposer's redemption of
//! the bitcoin reveals the preimage in the transaction witness, from
//! which the accepter extracts it to take the Bitshares asset.

use crate::{
    connector::{bitcoin::BitcoinChain, bitshares::BitsharesChain},
    hbit, hbts,
    swap::{poll, Finish, InvalidInput, SwapConfig},
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
    let secret_hash = config.secret_hash();

    let fee = hbit::Fee::calculate(bitcoin, config.priority, hbit::HTLC_SPEND_VSIZE)
        .await
        .context("failed to estimate fees")?;

    let expiry_secs = config
        .horizon
        .seconds(bitcoin)
        .await
        .context("failed to derive the bitshares timelock")?;

    let counterparty_account = bitshares
        .account_id(&config.counterparty_bitshares_account)
        .await
        .context("failed to resolve the counterparty account")?;

    let bts_params = hbts::Params {
        asset: config.bitshares_amount,
        redeem_account: counterparty_account,
        refund_account: bitshares.account().clone(),
        expiry_secs,
        secret_hash,
    };
    hbts::create(bitshares, &bts_params)
        .await
        .context("failed to create the bitshares contract")?;

    // The accepter acts second, so their bitcoin leg uses half our
    // horizon.
    let params = hbit::Params {
        network: config.network,
        asset: config.bitcoin_amount,
        redeem_identity: config.our_bitcoin_identity(),
        refund_identity: config.counterparty_bitcoin_identity,
        timelock: config.horizon.halved().blocks(),
        secret_hash,
    };
    let address = params.compute_address();
    tracing::debug!("waiting for the counterparty to fund {}", address);

    let payment = poll::poll_countdown(
        Duration::from_secs(expiry_secs),
        config.check_interval,
        || {
            let address = address.clone();
            async move { bitcoin.last_payment_to(&address).await.map(Some) }
        },
    )
    .await?;

    let payment = match payment {
        Some(payment) => payment,
        None => {
            // The bitcoin leg is the counterparty's to reclaim, not ours;
            // our contract refunds by protocol once it expires.
            tracing::warn!(
                "counterparty never funded; the bitshares contract refunds by protocol on expiry"
            );
            return Ok(Finish::Refunded);
        }
    };

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

    // Redeeming reveals the preimage in our witness; from here the
    // counterparty can help themselves to the bitshares contract.
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

    let fee = hbit::Fee::calculate(bitcoin, config.priority, hbit::HTLC_SPEND_VSIZE)
        .await
        .context("failed to estimate fees")?;

    let expiry_secs = config
        .horizon
        .seconds(bitcoin)
        .await
        .context("failed to derive the bitshares timelock")?;

    let counterparty_account = bitshares
        .account_id(&config.counterparty_bitshares_account)
        .await
        .context("failed to resolve the counterparty account")?;

    let bts_params = hbts::Params {
        asset: config.bitshares_amount,
        redeem_account: bitshares.account().clone(),
        refund_account: counterparty_account,
        expiry_secs,
        secret_hash,
    };

    // Never lock anything before the proposer's contract is on-chain
    // with exactly the agreed parameters.
    let contract = poll::poll_countdown(config.fund_wait, config.check_interval, || {
        let query = bts_params.query();
        async move { bitshares.find_htlc(&query).await }
    })
    .await?
    .context("counterparty's bitshares contract did not appear within the configured window")?;
    tracing::info!("found counterparty contract {}", contract);

    let params = hbit::Params {
        network: config.network,
        asset: config.bitcoin_amount,
        redeem_identity: config.counterparty_bitcoin_identity,
        refund_identity: config.our_bitcoin_identity(),
        timelock: config.horizon.halved().blocks(),
        secret_hash,
    };

    let funded = hbit::fund(
        bitcoin,
        &params,
        &config.bitcoin_key.key,
        config.funding_transaction,
        fee,
    )
    .await
    .context("failed to fund the bitcoin contract")?;

    match redeem_bitshares_or_refund(bitcoin, bitshares, config, &params, &funded, expiry_secs)
        .await
    {
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
    expiry_secs: u64,
) -> anyhow::Result<Finish>
where
    BC: BitcoinChain,
    BS: BitsharesChain,
{
    let secret_hash = config.secret_hash();
    let address = params.compute_address();

    let mut horizon =
        poll::FundingHorizon::new(funded.location.txid, funded.block_height, params.timelock);

    // Wait for the proposer to spend our contract, which puts the
    // preimage into the witness of the spending transaction.
    let secret = poll::poll_until_horizon(bitcoin, &mut horizon, config.check_interval, || {
        let address = address.clone();
        async move { bitcoin.preimage_of_spend(&address).await.map(Some) }
    })
    .await?;

    match secret {
        Some(secret) => {
            if !secret_hash.matches(secret) {
                anyhow::bail!("spend revealed a preimage that does not match the agreed hash");
            }
            tracing::info!("extracted the preimage from the counterparty's spend");

            let redeemed = poll::poll_countdown(
                Duration::from_secs(expiry_secs),
                config.check_interval,
                || {
                    let amount = config.bitshares_amount;
                    async move {
                        let done = bitshares.redeem_htlc(amount, secret).await?;
                        Ok::<_, crate::connector::bitshares::Error>(done.then(|| ()))
                    }
                },
            )
            .await?;

            match redeemed {
                Some(()) => Ok(Finish::Swapped),
                None => Err(anyhow::anyhow!(
                    "bitshares redemption never matched the counterparty's contract"
                )),
            }
        }
        None => {
            tracing::warn!("counterparty never redeemed; refunding the bitcoin contract");
            hbit::broadcast_refund(bitcoin, funded)
                .await
                .context("failed to broadcast the refund transaction")?;

            Ok(Finish::Refunded)
        }
    }
}
