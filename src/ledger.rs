use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bitcoin {
    Mainnet,
    Testnet,
    Regtest,
}

impl Default for Bitcoin {
    fn default() -> Self {
        Self::Testnet
    }
}

impl From<Bitcoin> for ::bitcoin::Network {
    fn from(bitcoin: Bitcoin) -> ::bitcoin::Network {
        match bitcoin {
            Bitcoin::Mainnet => ::bitcoin::Network::Bitcoin,
            Bitcoin::Testnet => ::bitcoin::Network::Testnet,
            Bitcoin::Regtest => ::bitcoin::Network::Regtest,
        }
    }
}

impl From<::bitcoin::Network> for Bitcoin {
    fn from(network: ::bitcoin::Network) -> Self {
        match network {
            ::bitcoin::Network::Bitcoin => Bitcoin::Mainnet,
            ::bitcoin::Network::Testnet => Bitcoin::Testnet,
            ::bitcoin::Network::Regtest => Bitcoin::Regtest,
            ::bitcoin::Network::Signet => unreachable!("signet is not a supported network"),
        }
    }
}

impl FromStr for Bitcoin {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Bitcoin::Mainnet),
            "testnet" => Ok(Bitcoin::Testnet),
            "regtest" => Ok(Bitcoin::Regtest),
            other => Err(UnknownNetwork(other.to_owned())),
        }
    }
}

impl Serialize for Bitcoin {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let str = match self {
            Bitcoin::Mainnet => "mainnet",
            Bitcoin::Testnet => "testnet",
            Bitcoin::Regtest => "regtest",
        };

        serializer.serialize_str(str)
    }
}

impl<'de> Deserialize<'de> for Bitcoin {
    fn deserialize<D>(deserializer: D) -> Result<Bitcoin, D::Error>
    where
        D: Deserializer<'de>,
    {
        let network = String::deserialize(deserializer)?;

        Bitcoin::from_str(&network).map_err(D::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bitshares {
    Mainnet,
    Testnet,
}

impl Default for Bitshares {
    fn default() -> Self {
        Self::Testnet
    }
}

impl FromStr for Bitshares {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Bitshares::Mainnet),
            "testnet" => Ok(Bitshares::Testnet),
            other => Err(UnknownNetwork(other.to_owned())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("unknown network: {0}")]
pub struct UnknownNetwork(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitcoin_network_deserializes_from_config_string() {
        let network = serde_json::from_str::<Bitcoin>("\"testnet\"").unwrap();

        assert_eq!(network, Bitcoin::Testnet);
    }

    #[test]
    fn unknown_bitcoin_network_is_rejected() {
        let result = serde_json::from_str::<Bitcoin>("\"signet\"");

        assert!(result.is_err());
    }
}
