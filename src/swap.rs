//! Execute a swap.
//!
//! A swap is one Bitcoin HTLC and one Bitshares HTLC sharing a SHA-256
//! lock. Four flows exist, one per role and direction; [`run`] selects
//! the right one. The party acting second always halves its own timelock
//! so that its refund window opens strictly before the counterparty's.

pub mod hbit_hbts;
pub mod hbts_hbit;
mod poll;

use crate::{
    asset,
    config::Settings,
    connector::{
        bitcoin::{BitcoinChain, Priority, UnknownPriority},
        bitshares::BitsharesChain,
    },
    identity, ledger,
    timelock::Horizon,
    Secret, SecretHash, SECP,
};
use bitcoin::{PrivateKey, Txid};
use std::{convert::TryFrom, str::FromStr, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Proposer,
    Accepter,
}

impl FromStr for Mode {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proposer" => Ok(Mode::Proposer),
            "accepter" => Ok(Mode::Accepter),
            other => Err(InvalidInput::Mode(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Bitcoin,
    Bitshares,
}

impl FromStr for Currency {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BTC" => Ok(Currency::Bitcoin),
            "BTS" => Ok(Currency::Bitshares),
            other => Err(InvalidInput::Currency(other.to_owned())),
        }
    }
}

/// The raw, unvalidated user input of a swap, as collected by a CLI or
/// other front-end.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SwapFields {
    pub mode: String,
    pub network: String,
    pub currency_to_give: String,
    pub amount_to_send: String,
    pub rate: f64,
    pub amount_to_receive: String,
    pub bitcoin_private_key: String,
    /// Consumed by the Bitshares connector the embedder constructs; only
    /// checked for presence here.
    pub bitshares_private_key: String,
    pub counterparty_bitcoin_public_key: String,
    pub counterparty_bitshares_account: String,
    pub bitcoin_transaction_id: String,
    pub priority: u8,
    /// Proposer only; generated when absent.
    pub secret: Option<String>,
    /// Accepter only.
    pub secret_hash: Option<String>,
}

/// The hash lock of the swap, from the perspective of one party.
#[derive(Debug, Clone, Copy)]
pub enum HashLock {
    /// We generated the preimage, so we act as proposer.
    Preimage(Secret),
    /// We only know the digest until the counterparty reveals.
    DigestOnly(SecretHash),
}

impl HashLock {
    pub fn secret_hash(&self) -> SecretHash {
        match self {
            HashLock::Preimage(secret) => SecretHash::new(*secret),
            HashLock::DigestOnly(hash) => *hash,
        }
    }

    pub fn secret(&self) -> Option<Secret> {
        match self {
            HashLock::Preimage(secret) => Some(*secret),
            HashLock::DigestOnly(_) => None,
        }
    }
}

/// A validated swap, ready to run.
#[derive(Debug, Clone)]
pub struct SwapConfig {
    pub mode: Mode,
    pub give: Currency,
    pub network: ledger::Bitcoin,
    pub bitcoin_amount: asset::Bitcoin,
    pub bitshares_amount: asset::Bitshares,
    pub bitcoin_key: PrivateKey,
    pub counterparty_bitcoin_identity: identity::Bitcoin,
    pub counterparty_bitshares_account: String,
    pub funding_transaction: Txid,
    pub priority: Priority,
    pub horizon: Horizon,
    pub check_interval: Duration,
    pub fund_wait: Duration,
    pub lock: HashLock,
}

impl SwapConfig {
    /// Validates raw user input, failing fast before any chain I/O.
    pub fn parse(fields: SwapFields, settings: &Settings) -> Result<SwapConfig, InvalidInput> {
        let mode = Mode::from_str(&fields.mode)?;
        let give = Currency::from_str(&fields.currency_to_give)?;
        let network = ledger::Bitcoin::from_str(&fields.network)?;

        if !fields.rate.is_finite() || fields.rate <= 0.0 {
            return Err(InvalidInput::Rate);
        }

        let (btc_str, bts_str) = match give {
            Currency::Bitcoin => (&fields.amount_to_send, &fields.amount_to_receive),
            Currency::Bitshares => (&fields.amount_to_receive, &fields.amount_to_send),
        };
        let bitcoin_amount = asset::Bitcoin::from_btc_str(btc_str)?;
        let bitshares_amount = asset::Bitshares::from_bts_str(bts_str)?;

        if bitcoin_amount.as_sat() == 0 || bitshares_amount.as_mini() == 0 {
            return Err(InvalidInput::ZeroAmount);
        }

        let bitcoin_key = PrivateKey::from_wif(&fields.bitcoin_private_key)
            .map_err(|e| InvalidInput::BitcoinKey(e.to_string()))?;
        if !bitcoin_key.compressed {
            return Err(InvalidInput::BitcoinKey(
                "only compressed keys are supported".to_owned(),
            ));
        }
        if !wif_matches_network(bitcoin_key.network.into(), network) {
            return Err(InvalidInput::KeyNetwork(network));
        }

        if fields.bitshares_private_key.is_empty() {
            return Err(InvalidInput::EmptyBitsharesKey);
        }
        if fields.counterparty_bitshares_account.is_empty() {
            return Err(InvalidInput::EmptyAccount);
        }

        let counterparty_bitcoin_identity =
            identity::Bitcoin::from_str(&fields.counterparty_bitcoin_public_key)
                .map_err(|e| InvalidInput::BitcoinPublicKey(e.to_string()))?;

        let funding_transaction = Txid::from_str(&fields.bitcoin_transaction_id)
            .map_err(|e| InvalidInput::TransactionId(e.to_string()))?;

        let priority = Priority::try_from(fields.priority)?;

        let lock = match mode {
            Mode::Proposer => {
                let secret = match &fields.secret {
                    Some(hex) => Secret::from_str(hex)
                        .map_err(|e| InvalidInput::Secret(e.to_string()))?,
                    None => Secret::random(),
                };
                HashLock::Preimage(secret)
            }
            Mode::Accepter => {
                let hash = fields
                    .secret_hash
                    .as_deref()
                    .ok_or(InvalidInput::MissingSecretHash)?;
                let hash = SecretHash::from_str(hash)
                    .map_err(|e| InvalidInput::Secret(e.to_string()))?;
                HashLock::DigestOnly(hash)
            }
        };

        Ok(SwapConfig {
            mode,
            give,
            network,
            bitcoin_amount,
            bitshares_amount,
            bitcoin_key,
            counterparty_bitcoin_identity,
            counterparty_bitshares_account: fields.counterparty_bitshares_account,
            funding_transaction,
            priority,
            horizon: settings.swap.horizon(),
            check_interval: settings.swap.check_interval(),
            fund_wait: settings.swap.fund_wait(),
            lock,
        })
    }

    pub fn our_bitcoin_identity(&self) -> identity::Bitcoin {
        identity::Bitcoin::from_secret_key(&SECP, &self.bitcoin_key.key)
    }

    pub fn secret_hash(&self) -> SecretHash {
        self.lock.secret_hash()
    }
}

/// WIF encodes mainnet vs testnet only; a testnet key is also valid on
/// regtest.
fn wif_matches_network(key_network: ledger::Bitcoin, network: ledger::Bitcoin) -> bool {
    key_network == network
        || (key_network == ledger::Bitcoin::Testnet && network == ledger::Bitcoin::Regtest)
}

#[derive(Debug, thiserror::Error)]
pub enum InvalidInput {
    #[error("unknown mode: {0}")]
    Mode(String),
    #[error("unknown currency: {0}")]
    Currency(String),
    #[error(transparent)]
    Network(#[from] ledger::UnknownNetwork),
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error(transparent)]
    Amount(#[from] asset::ParseError),
    #[error("rate must be a positive number")]
    Rate,
    #[error("invalid bitcoin private key: {0}")]
    BitcoinKey(String),
    #[error("bitcoin private key does not match network {0:?}")]
    KeyNetwork(ledger::Bitcoin),
    #[error("invalid counterparty public key: {0}")]
    BitcoinPublicKey(String),
    #[error("bitshares account name must not be empty")]
    EmptyAccount,
    #[error("bitshares private key must not be empty")]
    EmptyBitsharesKey,
    #[error("invalid funding transaction id: {0}")]
    TransactionId(String),
    #[error(transparent)]
    Priority(#[from] UnknownPriority),
    #[error("invalid secret: {0}")]
    Secret(String),
    #[error("the accepter needs the counterparty's secret hash")]
    MissingSecretHash,
    #[error("counterparty locked {available}, expected at least {required}")]
    Shortfall {
        available: asset::Bitcoin,
        required: asset::Bitcoin,
    },
}

/// How a completed swap ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    /// Both legs were redeemed.
    Swapped,
    /// The swap timed out; our funds returned (or will return) to us.
    Refunded,
}

/// Runs the flow selected by the swap's role and direction.
pub async fn run<BC, BS>(
    bitcoin: &BC,
    bitshares: &BS,
    config: &SwapConfig,
) -> anyhow::Result<Finish>
where
    BC: BitcoinChain,
    BS: BitsharesChain,
{
    match (config.mode, config.give) {
        (Mode::Proposer, Currency::Bitcoin) => hbit_hbts::proposer(bitcoin, bitshares, config).await,
        (Mode::Proposer, Currency::Bitshares) => {
            hbts_hbit::proposer(bitcoin, bitshares, config).await
        }
        (Mode::Accepter, Currency::Bitshares) => {
            hbit_hbts::accepter(bitcoin, bitshares, config).await
        }
        (Mode::Accepter, Currency::Bitcoin) => hbts_hbit::accepter(bitcoin, bitshares, config).await,
    }
}

/// The exit code an embedding CLI should terminate with.
pub fn exit_code(outcome: &anyhow::Result<Finish>) -> i32 {
    match outcome {
        Ok(Finish::Swapped) => 0,
        Ok(Finish::Refunded) => 3,
        Err(e) if e.downcast_ref::<InvalidInput>().is_some() => 1,
        Err(_) => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn fields() -> SwapFields {
        SwapFields {
            mode: "proposer".to_owned(),
            network: "testnet".to_owned(),
            currency_to_give: "BTC".to_owned(),
            amount_to_send: "1.0".to_owned(),
            rate: 50_000.0,
            amount_to_receive: "50000".to_owned(),
            bitcoin_private_key: "cVt4o7BGAig1UXywgGSmARhxMdzP5qvQsxKkSsc1XEkw3tDTQFpy".to_owned(),
            bitshares_private_key: "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3".to_owned(),
            counterparty_bitcoin_public_key:
                "02c2a8efce029526d364c2cf39d89e3cdda05e5df7b2cbfc098b4e3d02b70b5275".to_owned(),
            counterparty_bitshares_account: "counterparty".to_owned(),
            bitcoin_transaction_id:
                "ad067ee417ee5518122374307d1fa494c67e30c75d38c7061d944b59e56fe024".to_owned(),
            priority: 1,
            secret: None,
            secret_hash: None,
        }
    }

    #[test]
    fn valid_fields_parse_into_a_config() {
        let config = SwapConfig::parse(fields(), &Settings::testnet()).unwrap();

        assert_eq!(config.mode, Mode::Proposer);
        assert_eq!(config.give, Currency::Bitcoin);
        assert_eq!(config.bitcoin_amount, asset::Bitcoin::from_sat(100_000_000));
        assert_eq!(
            config.bitshares_amount,
            asset::Bitshares::from_mini(5_000_000_000)
        );
        assert_eq!(config.priority, Priority::Medium);
        assert!(config.lock.secret().is_some());
    }

    #[test]
    fn proposer_without_a_secret_gets_a_fresh_one() {
        let one = SwapConfig::parse(fields(), &Settings::testnet()).unwrap();
        let two = SwapConfig::parse(fields(), &Settings::testnet()).unwrap();

        assert_ne!(one.secret_hash(), two.secret_hash());
    }

    #[test]
    fn accepter_requires_the_secret_hash() {
        let mut accepter = fields();
        accepter.mode = "accepter".to_owned();

        let result = SwapConfig::parse(accepter, &Settings::testnet());

        assert!(matches!(result, Err(InvalidInput::MissingSecretHash)));
    }

    #[test]
    fn out_of_range_priority_is_rejected() {
        let mut bad = fields();
        bad.priority = 3;

        let result = SwapConfig::parse(bad, &Settings::testnet());

        assert!(matches!(result, Err(InvalidInput::Priority(_))));
    }

    #[test]
    fn unknown_network_is_rejected() {
        let mut bad = fields();
        bad.network = "signet".to_owned();

        let result = SwapConfig::parse(bad, &Settings::testnet());

        assert!(matches!(result, Err(InvalidInput::Network(_))));
    }

    #[test]
    fn mainnet_key_is_rejected_on_testnet() {
        let mut bad = fields();
        // a mainnet WIF
        bad.bitcoin_private_key =
            "L4nZrdzNnawCtaEcYGWuPqagQA3dJxVPgN8ARTXaMLCxiYCy89wm".to_owned();

        let result = SwapConfig::parse(bad, &Settings::testnet());

        assert!(matches!(result, Err(InvalidInput::KeyNetwork(_))));
    }

    #[test]
    fn garbled_rate_is_rejected() {
        let mut bad = fields();
        bad.rate = f64::NAN;

        assert!(matches!(
            SwapConfig::parse(bad, &Settings::testnet()),
            Err(InvalidInput::Rate)
        ));
    }

    #[test]
    fn exit_codes_follow_the_cli_contract() {
        assert_eq!(exit_code(&Ok(Finish::Swapped)), 0);
        assert_eq!(exit_code(&Ok(Finish::Refunded)), 3);
        assert_eq!(exit_code(&Err(InvalidInput::Rate.into())), 1);
        assert_eq!(exit_code(&Err(anyhow::anyhow!("broadcast failed"))), 2);
    }
}
