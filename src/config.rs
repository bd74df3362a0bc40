//! Deployment settings: chain endpoints and orchestration intervals.
//!
//! Defaults exist per network; everything can be overridden from a TOML
//! file.

use crate::{ledger, timelock::Horizon};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use url::Url;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub bitcoin: Bitcoin,
    pub bitshares: Bitshares,
    #[serde(default)]
    pub swap: Swap,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bitcoin {
    pub network: ledger::Bitcoin,
    pub esplora_url: Url,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bitshares {
    pub network: ledger::Bitshares,
    pub node_url: Url,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Swap {
    /// Seconds between two polls of either chain.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// How long a party waits for the counterparty's first move.
    #[serde(default = "default_fund_wait")]
    pub fund_wait_secs: u64,
    /// The confirmation horizon in Bitcoin blocks; the acting-first
    /// party's timelock.
    #[serde(default = "default_horizon")]
    pub confirmation_horizon: u16,
}

impl Swap {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn fund_wait(&self) -> Duration {
        Duration::from_secs(self.fund_wait_secs)
    }

    pub fn horizon(&self) -> Horizon {
        Horizon::new(self.confirmation_horizon)
    }
}

impl Default for Swap {
    fn default() -> Self {
        Swap {
            check_interval_secs: default_check_interval(),
            fund_wait_secs: default_fund_wait(),
            confirmation_horizon: default_horizon(),
        }
    }
}

fn default_check_interval() -> u64 {
    4
}

fn default_fund_wait() -> u64 {
    1800
}

fn default_horizon() -> u16 {
    6
}

impl Settings {
    pub fn mainnet() -> Self {
        Settings {
            bitcoin: Bitcoin {
                network: ledger::Bitcoin::Mainnet,
                esplora_url: "https://blockstream.info/api/"
                    .parse()
                    .expect("a valid url"),
            },
            bitshares: Bitshares {
                network: ledger::Bitshares::Mainnet,
                node_url: "wss://api.dex.trading/".parse().expect("a valid url"),
            },
            swap: Swap::default(),
        }
    }

    pub fn testnet() -> Self {
        Settings {
            bitcoin: Bitcoin {
                network: ledger::Bitcoin::Testnet,
                esplora_url: "https://blockstream.info/testnet/api/"
                    .parse()
                    .expect("a valid url"),
            },
            bitshares: Bitshares {
                network: ledger::Bitshares::Testnet,
                node_url: "wss://testnet.dex.trading/".parse().expect("a valid url"),
            },
            swap: Swap::default(),
        }
    }

    pub fn for_network(network: ledger::Bitcoin) -> Self {
        match network {
            ledger::Bitcoin::Mainnet => Settings::mainnet(),
            ledger::Bitcoin::Testnet | ledger::Bitcoin::Regtest => Settings::testnet(),
        }
    }

    pub fn read(path: &Path) -> anyhow::Result<Settings> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let settings = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_deserializes_correctly() {
        let contents = r#"
            [bitcoin]
            network = "testnet"
            esplora_url = "https://blockstream.info/testnet/api/"

            [bitshares]
            network = "testnet"
            node_url = "wss://testnet.dex.trading/"

            [swap]
            check_interval_secs = 2
            fund_wait_secs = 600
            confirmation_horizon = 3
        "#;

        let settings = toml::from_str::<Settings>(contents).unwrap();

        assert_eq!(settings.bitcoin.network, ledger::Bitcoin::Testnet);
        assert_eq!(settings.swap.check_interval(), Duration::from_secs(2));
        assert_eq!(settings.swap.fund_wait(), Duration::from_secs(600));
        assert_eq!(settings.swap.horizon(), Horizon::new(3));
    }

    #[test]
    fn swap_section_is_optional() {
        let contents = r#"
            [bitcoin]
            network = "mainnet"
            esplora_url = "https://blockstream.info/api/"

            [bitshares]
            network = "mainnet"
            node_url = "wss://api.dex.trading/"
        "#;

        let settings = toml::from_str::<Settings>(contents).unwrap();

        assert_eq!(settings.swap, Swap::default());
        assert_eq!(settings, Settings::mainnet());
    }

    #[test]
    fn settings_roundtrip_through_toml() {
        let settings = Settings::testnet();

        let serialized = toml::to_string(&settings).unwrap();
        let deserialized = toml::from_str::<Settings>(&serialized).unwrap();

        assert_eq!(deserialized, settings);
    }
}
