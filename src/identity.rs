//! Wrapper types for on-chain identities so that the rest of the crate can
//! refer to them in an ergonomic fashion, e.g. `identity::Bitcoin`.

use crate::ledger;
use bitcoin::{
    hashes::{hash160, Hash},
    secp256k1, Address,
};
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::{fmt, str::FromStr};

/// A compressed secp256k1 public key identifying one side of a Bitcoin HTLC.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bitcoin(bitcoin::PublicKey);

impl Bitcoin {
    pub fn from_secret_key<C>(
        secp: &secp256k1::Secp256k1<C>,
        secret_key: &secp256k1::SecretKey,
    ) -> Self
    where
        C: secp256k1::Signing,
    {
        secp256k1::PublicKey::from_secret_key(secp, secret_key).into()
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.0.to_bytes()
    }

    /// HASH160 of the serialized key, as it appears in the redeem script.
    pub fn pubkey_hash(&self) -> hash160::Hash {
        hash160::Hash::hash(&self.0.to_bytes())
    }

    /// The P2WPKH address funds are paid out to for this identity.
    pub fn p2wpkh_address(&self, network: ledger::Bitcoin) -> Address {
        Address::p2wpkh(&self.0, network.into()).expect("key is always compressed")
    }
}

impl From<secp256k1::PublicKey> for Bitcoin {
    fn from(key: secp256k1::PublicKey) -> Self {
        Self(bitcoin::PublicKey {
            compressed: true, // we always serialize public keys in compressed form
            key,
        })
    }
}

impl From<Bitcoin> for bitcoin::PublicKey {
    fn from(identity: Bitcoin) -> bitcoin::PublicKey {
        identity.0
    }
}

impl fmt::Display for Bitcoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("only compressed public keys are supported")]
pub struct NotCompressed;

impl FromStr for Bitcoin {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = bitcoin::PublicKey::from_str(s)?;
        if !key.compressed {
            return Err(NotCompressed.into());
        }

        Ok(Self(key))
    }
}

impl Serialize for Bitcoin {
    fn serialize<S>(&self, serializer: S) -> Result<<S as Serializer>::Ok, <S as Serializer>::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Bitcoin {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdentityVisitor;

        impl<'de> Visitor<'de> for IdentityVisitor {
            type Value = Bitcoin;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "a hex-encoded, compressed public key")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(IdentityVisitor)
    }
}
