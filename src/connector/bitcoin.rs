//! Bitcoin chain access, with an implementation for Esplora-compatible
//! REST APIs such as the one served at `https://blockstream.info/api`.

use crate::{asset, Secret};
use async_trait::async_trait;
use bitcoin::{Address, BlockHash, Script, Txid};
use serde::Deserialize;
use std::{collections::HashMap, convert::TryFrom, str::FromStr};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to query the chain source")]
    Query(#[source] anyhow::Error),
    #[error("no matching transaction found")]
    NotFound,
    #[error("transaction was rejected by the network: {reason}")]
    Broadcast { reason: String },
    #[error("witness does not have the shape of a contract redemption")]
    MalformedWitness,
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Query(e.into())
    }
}

impl Error {
    /// Transient errors are treated as "not yet" inside polling loops.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Query(_) | Error::NotFound)
    }
}

/// An output of a confirmed or unconfirmed transaction.
#[derive(Debug, Clone)]
pub struct TxOutput {
    pub vout: u32,
    pub value: asset::Bitcoin,
    pub script_pubkey: Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainTip {
    pub height: u64,
    pub hash: BlockHash,
}

/// The most recent transaction paying a given address.
#[derive(Debug, Clone, Copy)]
pub struct Payment {
    pub txid: Txid,
    pub value: asset::Bitcoin,
}

/// Confirmation urgency chosen by the user; maps onto fee estimation
/// targets of 1, 3 and 6 blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Fast,
    Medium,
    Slow,
}

impl TryFrom<u8> for Priority {
    type Error = UnknownPriority;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Priority::Fast),
            1 => Ok(Priority::Medium),
            2 => Ok(Priority::Slow),
            other => Err(UnknownPriority(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("priority must be 0, 1 or 2, got {0}")]
pub struct UnknownPriority(u8);

/// Fee rates in sat/vB for the three supported priorities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeEstimates {
    pub fast: f64,
    pub medium: f64,
    pub slow: f64,
}

impl FeeEstimates {
    pub fn at(&self, priority: Priority) -> f64 {
        match priority {
            Priority::Fast => self.fast,
            Priority::Medium => self.medium,
            Priority::Slow => self.slow,
        }
    }

    pub fn highest(&self) -> f64 {
        self.fast.max(self.medium).max(self.slow)
    }
}

#[async_trait]
pub trait BitcoinChain: Send + Sync {
    /// All outputs of the given transaction.
    async fn transaction_outputs(&self, txid: Txid) -> Result<Vec<TxOutput>, Error>;

    /// A fresh fee estimate; every call is an independent query.
    async fn fee_estimates(&self) -> Result<FeeEstimates, Error>;

    async fn chain_tip(&self) -> Result<ChainTip, Error>;

    /// The height the transaction was confirmed at, if any.
    async fn block_height_of(&self, txid: Txid) -> Result<Option<u64>, Error>;

    /// The most recent transaction funding `address`.
    async fn last_payment_to(&self, address: &Address) -> Result<Payment, Error>;

    /// The preimage revealed by the most recent transaction spending from
    /// `address`. Fails with [`Error::NotFound`] while no spend exists and
    /// with [`Error::MalformedWitness`] if the spend is not shaped like a
    /// contract redemption.
    async fn preimage_of_spend(&self, address: &Address) -> Result<Secret, Error>;

    /// Timestamps of the most recent blocks, newest first.
    async fn recent_block_timestamps(&self, count: usize) -> Result<Vec<u64>, Error>;

    /// Publishes a raw transaction, returning its id.
    async fn broadcast(&self, transaction_hex: String) -> Result<Txid, Error>;
}

/// Extracts the preimage from a redeem-path witness stack.
///
/// The redeem witness is `[signature, public key, preimage, 0x01, script]`;
/// anything else (in particular the four-element refund witness) is
/// malformed for the purposes of preimage extraction.
pub fn preimage_from_redeem_witness(items: &[Vec<u8>]) -> Result<Secret, Error> {
    match items {
        [_sig, _pk, preimage, selector, _script] if selector.as_slice() == [1u8] => {
            Secret::from_vec(preimage).map_err(|_| Error::MalformedWitness)
        }
        _ => Err(Error::MalformedWitness),
    }
}

/// A connector for any Esplora-compatible REST backend.
#[derive(Debug, Clone)]
pub struct EsploraConnector {
    client: reqwest::Client,
    base_url: Url,
}

impl EsploraConnector {
    pub fn new(mut base_url: Url) -> Self {
        // Url::join treats "api" and "api/" differently; only the latter
        // keeps the base path when joining relative segments.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Query(anyhow::Error::new(e).context(format!("bad path {}", path))))
    }

    async fn get_json<T>(&self, path: &str) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .get(self.url(path)?)
            .send()
            .await?
            .error_for_status()?;

        let value = response.json::<T>().await?;

        Ok(value)
    }

    async fn get_text(&self, path: &str) -> Result<String, Error> {
        let response = self
            .client
            .get(self.url(path)?)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }

    async fn transactions_of(&self, address: &Address) -> Result<Vec<TxResponse>, Error> {
        self.get_json(&format!("address/{}/txs", address)).await
    }
}

#[async_trait]
impl BitcoinChain for EsploraConnector {
    async fn transaction_outputs(&self, txid: Txid) -> Result<Vec<TxOutput>, Error> {
        let tx = self.get_json::<TxResponse>(&format!("tx/{}", txid)).await?;

        tx.outputs()
    }

    async fn fee_estimates(&self) -> Result<FeeEstimates, Error> {
        let tiers = self.get_json::<HashMap<String, f64>>("fee-estimates").await?;

        let tier = |target: &str| {
            tiers.get(target).copied().ok_or_else(|| {
                Error::Query(anyhow::anyhow!("fee estimate for target {} missing", target))
            })
        };

        Ok(FeeEstimates {
            fast: tier("1")?,
            medium: tier("3")?,
            slow: tier("6")?,
        })
    }

    async fn chain_tip(&self) -> Result<ChainTip, Error> {
        let height = self.get_text("blocks/tip/height").await?;
        let height = height
            .trim()
            .parse::<u64>()
            .map_err(|e| Error::Query(e.into()))?;

        let hash = self.get_text("blocks/tip/hash").await?;
        let hash = BlockHash::from_str(hash.trim()).map_err(|e| Error::Query(e.into()))?;

        Ok(ChainTip { height, hash })
    }

    async fn block_height_of(&self, txid: Txid) -> Result<Option<u64>, Error> {
        let tx = self.get_json::<TxResponse>(&format!("tx/{}", txid)).await?;

        Ok(tx.status.block_height)
    }

    async fn last_payment_to(&self, address: &Address) -> Result<Payment, Error> {
        let needle = address.to_string();

        for tx in self.transactions_of(address).await? {
            let paying_output = tx
                .vout
                .iter()
                .find(|out| out.scriptpubkey_address.as_deref() == Some(needle.as_str()));

            if let Some(output) = paying_output {
                let txid = Txid::from_str(&tx.txid).map_err(|e| Error::Query(e.into()))?;

                return Ok(Payment {
                    txid,
                    value: asset::Bitcoin::from_sat(output.value),
                });
            }
        }

        Err(Error::NotFound)
    }

    async fn preimage_of_spend(&self, address: &Address) -> Result<Secret, Error> {
        let needle = address.to_string();

        for tx in self.transactions_of(address).await? {
            let spending_input = tx.vin.iter().find(|input| {
                input
                    .prevout
                    .as_ref()
                    .and_then(|prevout| prevout.scriptpubkey_address.as_deref())
                    == Some(needle.as_str())
            });

            if let Some(input) = spending_input {
                let items = input
                    .witness
                    .iter()
                    .map(|item| hex::decode(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| Error::MalformedWitness)?;

                return preimage_from_redeem_witness(&items);
            }
        }

        Err(Error::NotFound)
    }

    async fn recent_block_timestamps(&self, count: usize) -> Result<Vec<u64>, Error> {
        let mut timestamps = Vec::with_capacity(count);
        let mut next_start: Option<u64> = None;

        while timestamps.len() < count {
            let path = match next_start {
                None => "blocks".to_string(),
                Some(height) => format!("blocks/{}", height),
            };

            let page = self.get_json::<Vec<BlockSummary>>(&path).await?;
            let lowest = match page.last() {
                Some(block) => block.height,
                None => break,
            };

            timestamps.extend(page.iter().map(|block| block.timestamp));

            if lowest == 0 {
                break;
            }
            next_start = Some(lowest - 1);
        }

        timestamps.truncate(count);

        Ok(timestamps)
    }

    async fn broadcast(&self, transaction_hex: String) -> Result<Txid, Error> {
        let response = self
            .client
            .post(self.url("tx")?)
            .body(transaction_hex)
            .send()
            .await?;

        if !response.status().is_success() {
            let reason = response.text().await.unwrap_or_else(|e| e.to_string());
            return Err(Error::Broadcast { reason });
        }

        let txid = response.text().await?;
        let txid = Txid::from_str(txid.trim()).map_err(|e| Error::Query(e.into()))?;

        Ok(txid)
    }
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    txid: String,
    status: TxStatus,
    #[serde(default)]
    vin: Vec<TxInEntry>,
    #[serde(default)]
    vout: Vec<TxOutEntry>,
}

impl TxResponse {
    fn outputs(&self) -> Result<Vec<TxOutput>, Error> {
        self.vout
            .iter()
            .enumerate()
            .map(|(index, out)| {
                let script = hex::decode(&out.scriptpubkey)
                    .map_err(|e| Error::Query(anyhow::Error::new(e).context("bad script hex")))?;

                Ok(TxOutput {
                    vout: u32::try_from(index)
                        .map_err(|_| Error::Query(anyhow::anyhow!("output index out of range")))?,
                    value: asset::Bitcoin::from_sat(out.value),
                    script_pubkey: Script::from(script),
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct TxStatus {
    #[allow(dead_code)]
    confirmed: bool,
    #[serde(default)]
    block_height: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TxInEntry {
    #[serde(default)]
    prevout: Option<PrevOut>,
    #[serde(default)]
    witness: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PrevOut {
    #[serde(default)]
    scriptpubkey_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TxOutEntry {
    scriptpubkey: String,
    #[serde(default)]
    scriptpubkey_address: Option<String>,
    value: u64,
}

#[derive(Debug, Deserialize)]
struct BlockSummary {
    height: u64,
    timestamp: u64,
}
