//! The Bitcoin half of a swap: a P2WSH output whose witness script pays
//! the redeemer against the secret preimage, or the funder back after a
//! BIP-68 relative timelock.

use crate::{
    asset,
    connector::bitcoin::{BitcoinChain, Error as ChainError, Priority, TxOutput},
    identity, ledger,
    timelock::RelativeLock,
    Secret, SecretHash, SECP,
};
use bitcoin::{
    blockdata::{opcodes, script::Builder},
    consensus::encode,
    secp256k1::{Message, SecretKey},
    util::bip143::SigHashCache,
    OutPoint, Script, SigHashType, Transaction, TxIn, TxOut, Txid,
};

/// Virtual size of the contract spend: one P2WSH input, one P2WPKH
/// output. Using the consistent size avoids an estimate-sign-reestimate
/// loop; any slack is absorbed as miner fee.
pub const HTLC_SPEND_VSIZE: u64 = 140;

/// Everything both parties know about the Bitcoin side of a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    pub network: ledger::Bitcoin,
    pub asset: asset::Bitcoin,
    pub redeem_identity: identity::Bitcoin,
    pub refund_identity: identity::Bitcoin,
    pub timelock: RelativeLock,
    pub secret_hash: SecretHash,
}

impl Params {
    /// The witness script of the contract.
    ///
    /// Byte-deterministic in all four parameters, which is what allows the
    /// counterparty to recognise the contract on-chain.
    pub fn redeem_script(&self) -> Script {
        let redeem_pkh = self.redeem_identity.pubkey_hash();
        let refund_pkh = self.refund_identity.pubkey_hash();

        Builder::new()
            .push_opcode(opcodes::all::OP_IF)
            .push_opcode(opcodes::all::OP_SHA256)
            .push_slice(self.secret_hash.as_raw())
            .push_opcode(opcodes::all::OP_EQUALVERIFY)
            .push_opcode(opcodes::all::OP_DUP)
            .push_opcode(opcodes::all::OP_HASH160)
            .push_slice(&redeem_pkh[..])
            .push_opcode(opcodes::all::OP_ELSE)
            .push_int(i64::from(self.timelock.as_u16()))
            .push_opcode(opcodes::all::OP_CSV)
            .push_opcode(opcodes::all::OP_DROP)
            .push_opcode(opcodes::all::OP_DUP)
            .push_opcode(opcodes::all::OP_HASH160)
            .push_slice(&refund_pkh[..])
            .push_opcode(opcodes::all::OP_ENDIF)
            .push_opcode(opcodes::all::OP_EQUALVERIFY)
            .push_opcode(opcodes::all::OP_CHECKSIG)
            .into_script()
    }

    pub fn compute_address(&self) -> bitcoin::Address {
        bitcoin::Address::p2wsh(&self.redeem_script(), self.network.into())
    }
}

/// The absolute fee attached to a contract transaction.
///
/// `want` is what we deduct ourselves; `max` bounds what we accept as the
/// counterparty's deduction when verifying their funding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fee {
    pub want: asset::Bitcoin,
    pub max: asset::Bitcoin,
}

impl Fee {
    /// Two independent fee queries: the configured priority of the first
    /// one yields `want`, the highest tier of the second yields `max`.
    pub async fn calculate<C>(connector: &C, priority: Priority, vsize: u64) -> Result<Fee, ChainError>
    where
        C: BitcoinChain,
    {
        let desired = connector.fee_estimates().await?;
        let upper_bound = connector.fee_estimates().await?;

        Ok(Fee::from_rates(
            desired.at(priority),
            upper_bound.highest(),
            vsize,
        ))
    }

    pub fn from_rates(want_rate: f64, max_rate: f64, vsize: u64) -> Fee {
        Fee {
            want: asset::Bitcoin::from_sat(ceil_multiply(vsize, want_rate)),
            max: asset::Bitcoin::from_sat(ceil_multiply(vsize, max_rate)),
        }
    }
}

// Rates are a few hundred sat/vB at the very worst, far below any range
// where the f64 round-trip loses integer precision.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn ceil_multiply(vsize: u64, rate: f64) -> u64 {
    (vsize as f64 * rate).ceil() as u64
}

/// The contract has been funded on-chain.
///
/// Carries the pre-signed refund transaction so that the timeout path
/// does not need access to the signing key anymore.
#[derive(Debug, Clone)]
pub struct Funded {
    pub location: OutPoint,
    pub asset: asset::Bitcoin,
    pub block_height: Option<u64>,
    pub refund_hex: String,
}

#[derive(Debug, Clone)]
pub struct Redeemed {
    pub transaction: Transaction,
    pub secret: Secret,
}

#[derive(Debug, Clone, Copy)]
pub struct Refunded {
    pub txid: Txid,
}

#[derive(Debug, thiserror::Error)]
pub enum FundError {
    #[error("available funds of {available} do not cover {required}")]
    InsufficientFunds {
        available: asset::Bitcoin,
        required: asset::Bitcoin,
    },
    #[error("transaction {0} has no outputs spendable by this key")]
    NoSpendableOutputs(Txid),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

#[derive(Debug, thiserror::Error)]
pub enum RedeemError {
    #[error("contract value of {available} does not cover the spend fee of {fee}")]
    ValueBelowFee {
        available: asset::Bitcoin,
        fee: asset::Bitcoin,
    },
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Funds the contract from the funder's outputs of `funding_source`.
///
/// The fee is deducted from the contract amount, the remainder of the
/// consumed outputs returns to the funder as change. The refund
/// transaction is built and signed before anything is broadcast.
pub async fn fund<C>(
    connector: &C,
    params: &Params,
    funder: &SecretKey,
    funding_source: Txid,
    fee: Fee,
) -> Result<Funded, FundError>
where
    C: BitcoinChain,
{
    let funder_identity = identity::Bitcoin::from_secret_key(&SECP, funder);
    let funder_script = funder_identity
        .p2wpkh_address(params.network)
        .script_pubkey();

    let outputs = connector.transaction_outputs(funding_source).await?;
    let spendable: Vec<TxOutput> = outputs
        .into_iter()
        .filter(|out| out.script_pubkey == funder_script)
        .collect();

    if spendable.is_empty() {
        return Err(FundError::NoSpendableOutputs(funding_source));
    }

    let (transaction, locked) =
        funding_transaction(params, funding_source, &spendable, funder, fee)?;

    let location = OutPoint {
        txid: transaction.txid(),
        vout: 0,
    };
    let refund = refund_transaction(params, location, locked, funder, fee)?;

    let txid = connector
        .broadcast(encode::serialize_hex(&transaction))
        .await?;
    tracing::info!("contract funded in transaction {}", txid);

    let block_height = connector.block_height_of(txid).await.unwrap_or(None);

    Ok(Funded {
        location,
        asset: locked,
        block_height,
        refund_hex: encode::serialize_hex(&refund),
    })
}

/// Spends the contract along the secret path and broadcasts the spend.
pub async fn redeem<C>(
    connector: &C,
    params: &Params,
    location: OutPoint,
    locked: asset::Bitcoin,
    redeemer: &SecretKey,
    secret: Secret,
    fee: Fee,
) -> Result<Redeemed, RedeemError>
where
    C: BitcoinChain,
{
    let transaction = redeem_transaction(params, location, locked, redeemer, secret, fee)?;

    let txid = connector
        .broadcast(encode::serialize_hex(&transaction))
        .await?;
    tracing::info!("contract redeemed in transaction {}", txid);

    Ok(Redeemed {
        transaction,
        secret,
    })
}

/// Broadcasts the refund transaction pre-signed during funding.
///
/// If the network rejects it, the raw hex is included in the error so the
/// user can still recover manually.
pub async fn broadcast_refund<C>(connector: &C, funded: &Funded) -> Result<Refunded, ChainError>
where
    C: BitcoinChain,
{
    match connector.broadcast(funded.refund_hex.clone()).await {
        Ok(txid) => {
            tracing::info!("contract refunded in transaction {}", txid);
            Ok(Refunded { txid })
        }
        Err(ChainError::Broadcast { reason }) => Err(ChainError::Broadcast {
            reason: format!(
                "{}; raw refund transaction for manual recovery: {}",
                reason, funded.refund_hex
            ),
        }),
        Err(e) => Err(e),
    }
}

/// Finds the contract output inside the given transaction, if present.
pub async fn locate_output<C>(
    connector: &C,
    params: &Params,
    txid: Txid,
) -> Result<Option<(OutPoint, asset::Bitcoin)>, ChainError>
where
    C: BitcoinChain,
{
    let script = params.compute_address().script_pubkey();
    let outputs = connector.transaction_outputs(txid).await?;

    Ok(outputs
        .into_iter()
        .find(|out| out.script_pubkey == script)
        .map(|out| {
            (
                OutPoint {
                    txid,
                    vout: out.vout,
                },
                out.value,
            )
        }))
}

/// Scans a transaction's witnesses for the preimage of `secret_hash`.
pub fn extract_secret(transaction: &Transaction, secret_hash: &SecretHash) -> Option<Secret> {
    transaction.input.iter().find_map(|txin| {
        txin.witness
            .iter()
            .find_map(|item| match Secret::from_vec(item) {
                Ok(secret) if SecretHash::new(secret) == *secret_hash => Some(secret),
                _ => None,
            })
    })
}

fn funding_transaction(
    params: &Params,
    funding_source: Txid,
    spendable: &[TxOutput],
    funder: &SecretKey,
    fee: Fee,
) -> Result<(Transaction, asset::Bitcoin), FundError> {
    let total: u64 = spendable.iter().map(|out| out.value.as_sat()).sum();
    let amount = params.asset.as_sat();
    let want = fee.want.as_sat();

    if total < amount {
        return Err(FundError::InsufficientFunds {
            available: asset::Bitcoin::from_sat(total),
            required: params.asset,
        });
    }
    // The contract output pays the funding fee, the eventual spend pays
    // once more; anything at or below twice the fee is unspendable.
    if amount <= want.saturating_mul(2) {
        return Err(FundError::InsufficientFunds {
            available: params.asset,
            required: asset::Bitcoin::from_sat(want.saturating_mul(2)),
        });
    }

    let locked = amount - want;
    let change = total - amount;

    let funder_identity = identity::Bitcoin::from_secret_key(&SECP, funder);
    let funder_script = funder_identity
        .p2wpkh_address(params.network)
        .script_pubkey();

    let mut output = vec![TxOut {
        value: locked,
        script_pubkey: params.compute_address().script_pubkey(),
    }];
    if change > 0 {
        output.push(TxOut {
            value: change,
            script_pubkey: funder_script,
        });
    }

    let mut transaction = Transaction {
        version: 2,
        lock_time: 0,
        input: spendable
            .iter()
            .map(|out| TxIn {
                previous_output: OutPoint {
                    txid: funding_source,
                    vout: out.vout,
                },
                script_sig: Script::new(),
                sequence: 0xffff_ffff,
                witness: Vec::new(),
            })
            .collect(),
        output,
    };

    let script_code = p2pkh_script_code(&funder_identity);
    let witnesses: Vec<Vec<Vec<u8>>> = spendable
        .iter()
        .enumerate()
        .map(|(index, out)| {
            let signature =
                sign_input(&transaction, index, &script_code, out.value.as_sat(), funder);
            vec![signature, funder_identity.to_bytes()]
        })
        .collect();
    for (input, witness) in transaction.input.iter_mut().zip(witnesses) {
        input.witness = witness;
    }

    Ok((transaction, asset::Bitcoin::from_sat(locked)))
}

fn refund_transaction(
    params: &Params,
    location: OutPoint,
    locked: asset::Bitcoin,
    funder: &SecretKey,
    fee: Fee,
) -> Result<Transaction, FundError> {
    let payout = locked
        .checked_sub(fee.want)
        .filter(|payout| payout.as_sat() > 0)
        .ok_or(FundError::InsufficientFunds {
            available: locked,
            required: fee.want,
        })?;

    let funder_identity = identity::Bitcoin::from_secret_key(&SECP, funder);
    let script = params.redeem_script();

    let mut transaction = Transaction {
        version: 2, // nSequence only encodes a relative timelock from version 2 on
        lock_time: 0,
        input: vec![TxIn {
            previous_output: location,
            script_sig: Script::new(),
            sequence: params.timelock.as_u32(),
            witness: Vec::new(),
        }],
        output: vec![TxOut {
            value: payout.as_sat(),
            script_pubkey: funder_identity
                .p2wpkh_address(params.network)
                .script_pubkey(),
        }],
    };

    let signature = sign_input(&transaction, 0, &script, locked.as_sat(), funder);
    transaction.input[0].witness = vec![
        signature,
        funder_identity.to_bytes(),
        vec![], // empty item selects the OP_ELSE branch
        script.to_bytes(),
    ];

    Ok(transaction)
}

fn redeem_transaction(
    params: &Params,
    location: OutPoint,
    locked: asset::Bitcoin,
    redeemer: &SecretKey,
    secret: Secret,
    fee: Fee,
) -> Result<Transaction, RedeemError> {
    let payout = locked
        .checked_sub(fee.want)
        .filter(|payout| payout.as_sat() > 0)
        .ok_or(RedeemError::ValueBelowFee {
            available: locked,
            fee: fee.want,
        })?;

    let redeemer_identity = identity::Bitcoin::from_secret_key(&SECP, redeemer);
    let script = params.redeem_script();

    let mut transaction = Transaction {
        version: 2,
        lock_time: 0,
        input: vec![TxIn {
            previous_output: location,
            script_sig: Script::new(),
            sequence: 0xffff_ffff,
            witness: Vec::new(),
        }],
        output: vec![TxOut {
            value: payout.as_sat(),
            script_pubkey: redeemer_identity
                .p2wpkh_address(params.network)
                .script_pubkey(),
        }],
    };

    let signature = sign_input(&transaction, 0, &script, locked.as_sat(), redeemer);
    transaction.input[0].witness = vec![
        signature,
        redeemer_identity.to_bytes(),
        secret.into_raw_secret().to_vec(),
        vec![1u8], // select the OP_IF branch
        script.to_bytes(),
    ];

    Ok(transaction)
}

/// BIP-143: a P2WPKH input commits to the legacy P2PKH locking script of
/// the same key hash.
fn p2pkh_script_code(identity: &identity::Bitcoin) -> Script {
    Builder::new()
        .push_opcode(opcodes::all::OP_DUP)
        .push_opcode(opcodes::all::OP_HASH160)
        .push_slice(&identity.pubkey_hash()[..])
        .push_opcode(opcodes::all::OP_EQUALVERIFY)
        .push_opcode(opcodes::all::OP_CHECKSIG)
        .into_script()
}

fn sign_input(
    transaction: &Transaction,
    index: usize,
    script_code: &Script,
    value: u64,
    key: &SecretKey,
) -> Vec<u8> {
    let mut cache = SigHashCache::new(transaction);
    let sighash = cache.signature_hash(index, script_code, value, SigHashType::All);

    let message =
        Message::from_slice(&sighash[..]).expect("a SHA-256 digest is a valid message");
    let signature = SECP.sign(&message, key);

    let mut serialized = signature.serialize_der().as_ref().to_vec();
    serialized.push(SigHashType::All as u8);

    serialized
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::{
        blockdata::script::{read_scriptint, Instruction},
        consensus::encode::deserialize,
    };
    use spectral::prelude::*;
    use std::{convert::TryFrom, str::FromStr};

    const REDEEM_PUBKEY: &str =
        "0298e113cc06bc862ac205f2c0f27ee8c0de98d0716537bbf74e2ea6f38a84d5dc";
    const REFUND_PUBKEY: &str =
        "020c04eb8cb87485501e30b656f37439ea7866d7c58b3c38161e5793b68e712356";
    const SECRET_HASH: &str = "51a488e06e9c69c555b8ad5e2c4629bb3135b96accd1f23451af75e06d3aee9c";

    fn params(timelock: u16) -> Params {
        Params {
            network: ledger::Bitcoin::Regtest,
            asset: asset::Bitcoin::from_sat(100_000_000),
            redeem_identity: identity::Bitcoin::from_str(REDEEM_PUBKEY).unwrap(),
            refund_identity: identity::Bitcoin::from_str(REFUND_PUBKEY).unwrap(),
            timelock: RelativeLock::from(timelock),
            secret_hash: SecretHash::from_str(SECRET_HASH).unwrap(),
        }
    }

    fn funder() -> SecretKey {
        SecretKey::from_str("01010101010101010001020304050607ffff0000ffff00006363636363636363")
            .unwrap()
    }

    fn redeemer() -> SecretKey {
        SecretKey::from_str("7070707070707070707070707070707070707070707070707070707070707070")
            .unwrap()
    }

    /// Reads back `(secret hash, timelock, redeem pkh, refund pkh)` from a
    /// witness script.
    fn decompose(script: &Script) -> Option<(Vec<u8>, i64, Vec<u8>, Vec<u8>)> {
        let items: Vec<Instruction<'_>> = script.instructions().collect::<Result<_, _>>().ok()?;

        match items.as_slice() {
            [Instruction::Op(_if), Instruction::Op(_sha256), Instruction::PushBytes(hash), Instruction::Op(_equalverify), Instruction::Op(_dup), Instruction::Op(_hash160), Instruction::PushBytes(redeem_pkh), Instruction::Op(_else), Instruction::PushBytes(lock), Instruction::Op(_csv), Instruction::Op(_drop), Instruction::Op(_dup2), Instruction::Op(_hash160_2), Instruction::PushBytes(refund_pkh), Instruction::Op(_endif), Instruction::Op(_equalverify2), Instruction::Op(_checksig)] => {
                Some((
                    hash.to_vec(),
                    read_scriptint(lock).ok()?,
                    redeem_pkh.to_vec(),
                    refund_pkh.to_vec(),
                ))
            }
            _ => None,
        }
    }

    #[test]
    fn witness_script_matches_known_bytes() {
        let script = params(900).redeem_script();

        assert_eq!(
            hex::encode(script.to_bytes()),
            "63a82051a488e06e9c69c555b8ad5e2c4629bb3135b96accd1f2345\
             1af75e06d3aee9c8876a914c021f17be99c6adfbcba5d38ee0d292c0399d2f\
             567028403b27576a9141925a274ac004373bb5429553bdb55c40e57b1246888ac"
        );
    }

    #[test]
    fn contract_address_matches_known_address() {
        let address = params(900).compute_address();

        assert_eq!(
            address.to_string(),
            "bcrt1qs2aderg3whgu0m8uadn6dwxjf7j3wx97kk2qqtrum89pmfcxknhsf89pj0"
        );
    }

    #[test]
    fn witness_script_is_deterministic() {
        assert_eq!(
            params(6).redeem_script().to_bytes(),
            params(6).redeem_script().to_bytes()
        );
    }

    #[test]
    fn decomposing_the_script_returns_the_inputs() {
        for timelock in &[0u16, 900, 65_535] {
            let params = params(*timelock);
            let script = params.redeem_script();

            let (hash, lock, redeem_pkh, refund_pkh) = decompose(&script).unwrap();

            assert_eq!(hash, params.secret_hash.as_raw().to_vec());
            assert_eq!(lock, i64::from(*timelock));
            assert_eq!(redeem_pkh, params.redeem_identity.pubkey_hash()[..].to_vec());
            assert_eq!(refund_pkh, params.refund_identity.pubkey_hash()[..].to_vec());
        }
    }

    #[test]
    fn funding_transaction_pays_the_contract_first() {
        let params = params(6);
        let funder = funder();
        let funder_script = identity::Bitcoin::from_secret_key(&SECP, &funder)
            .p2wpkh_address(params.network)
            .script_pubkey();
        let fee = Fee::from_rates(10.0, 35.0, HTLC_SPEND_VSIZE);

        let spendable = vec![TxOutput {
            vout: 1,
            value: asset::Bitcoin::from_sat(150_000_000),
            script_pubkey: funder_script.clone(),
        }];

        let (transaction, locked) = funding_transaction(
            &params,
            Txid::default(),
            &spendable,
            &funder,
            fee,
        )
        .unwrap();

        assert_eq!(locked, asset::Bitcoin::from_sat(100_000_000 - 1_400));
        assert_eq!(
            transaction.output[0].script_pubkey,
            params.compute_address().script_pubkey()
        );
        assert_eq!(transaction.output[0].value, locked.as_sat());
        assert_eq!(transaction.output[1].script_pubkey, funder_script);
        assert_eq!(transaction.output[1].value, 50_000_000);
        assert_eq!(transaction.input[0].previous_output.vout, 1);
        assert_eq!(transaction.input[0].witness.len(), 2);
    }

    #[test]
    fn funding_fails_when_outputs_do_not_cover_the_amount() {
        let params = params(6);
        let funder = funder();
        let funder_script = identity::Bitcoin::from_secret_key(&SECP, &funder)
            .p2wpkh_address(params.network)
            .script_pubkey();
        let fee = Fee::from_rates(10.0, 35.0, HTLC_SPEND_VSIZE);

        let spendable = vec![TxOutput {
            vout: 0,
            value: asset::Bitcoin::from_sat(99_999_999),
            script_pubkey: funder_script,
        }];

        let result = funding_transaction(&params, Txid::default(), &spendable, &funder, fee);

        assert!(matches!(
            result,
            Err(FundError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn funding_fails_when_the_fee_eats_the_amount() {
        let mut params = params(6);
        params.asset = asset::Bitcoin::from_sat(2_000);
        let funder = funder();
        let funder_script = identity::Bitcoin::from_secret_key(&SECP, &funder)
            .p2wpkh_address(params.network)
            .script_pubkey();
        // 10 sat/vB over 140 vB = 1400 sat; twice that exceeds the amount
        let fee = Fee::from_rates(10.0, 35.0, HTLC_SPEND_VSIZE);

        let spendable = vec![TxOutput {
            vout: 0,
            value: asset::Bitcoin::from_sat(1_000_000),
            script_pubkey: funder_script,
        }];

        let result = funding_transaction(&params, Txid::default(), &spendable, &funder, fee);

        assert!(matches!(
            result,
            Err(FundError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn refund_transaction_uses_the_script_timelock_as_sequence() {
        let params = params(900);
        let fee = Fee::from_rates(10.0, 35.0, HTLC_SPEND_VSIZE);
        let location = OutPoint {
            txid: Txid::default(),
            vout: 0,
        };

        let refund = refund_transaction(
            &params,
            location,
            asset::Bitcoin::from_sat(99_998_600),
            &funder(),
            fee,
        )
        .unwrap();

        assert_eq!(refund.version, 2);
        assert_eq!(refund.input[0].sequence, 900);
        assert_eq!(refund.input[0].witness.len(), 4);
        assert!(refund.input[0].witness[2].is_empty());
        assert_eq!(
            refund.input[0].witness[3],
            params.redeem_script().to_bytes()
        );
        assert_eq!(refund.output[0].value, 99_998_600 - 1_400);
    }

    #[test]
    fn redeem_transaction_reveals_the_preimage() {
        let params = params(6);
        let fee = Fee::from_rates(10.0, 35.0, HTLC_SPEND_VSIZE);
        let secret = Secret::from(*b"This is our favourite passphrase");
        let location = OutPoint {
            txid: Txid::default(),
            vout: 0,
        };

        let redeem = redeem_transaction(
            &params,
            location,
            asset::Bitcoin::from_sat(99_998_600),
            &redeemer(),
            secret,
            fee,
        )
        .unwrap();

        assert_eq!(redeem.input[0].witness.len(), 5);
        assert_eq!(
            redeem.input[0].witness[2],
            secret.into_raw_secret().to_vec()
        );
        assert_eq!(redeem.input[0].witness[3], vec![1u8]);
        assert_eq!(
            redeem.input[0].witness[4],
            params.redeem_script().to_bytes()
        );

        let extracted = extract_secret(&redeem, &SecretHash::new(secret));
        assert_that!(extracted).is_some().is_equal_to(&secret);
    }

    #[test]
    fn redeeming_a_dust_contract_fails() {
        let params = params(6);
        let fee = Fee::from_rates(10.0, 35.0, HTLC_SPEND_VSIZE);

        let result = redeem_transaction(
            &params,
            OutPoint {
                txid: Txid::default(),
                vout: 0,
            },
            asset::Bitcoin::from_sat(1_000),
            &redeemer(),
            Secret::random(),
            fee,
        );

        assert!(matches!(result, Err(RedeemError::ValueBelowFee { .. })));
    }

    #[test]
    fn extract_correct_secret_from_mainnet_transaction() {
        let hex_tx = hex::decode("0200000000010124e06fe5594b941d06c7385dc7307ec694a41f7d307423121855ee17e47e06ad0100000000ffffffff0137aa0b000000000017a914050377baa6e8c5a07aed125d0ef262c6d5b67a038705483045022100d780139514f39ed943179e4638a519101bae875ec1220b226002bcbcb147830b0220273d1efb1514a77ee3dd4adee0e896b7e76be56c6d8e73470ae9bd91c91d700c01210344f8f459494f74ebb87464de9b74cdba3709692df4661159857988966f94262f20ec9e9fb3c669b2354ea026ab3da82968a2e7ab9398d5cbed4e78e47246f2423e01015b63a82091d6a24697ed31932537ae598d3de3131e1fcd0641b9ac4be7afcb376386d71e8876a9149f4a0cf348b478336cb1d87ea4c8313a7ca3de1967029000b27576a91465252e57f727a27f32c77098e14d88d8dbec01816888ac00000000").unwrap();
        let transaction: Transaction = deserialize(&hex_tx).unwrap();
        let secret = Secret::from_str(
            "ec9e9fb3c669b2354ea026ab3da82968a2e7ab9398d5cbed4e78e47246f2423e",
        )
        .unwrap();

        let extracted = extract_secret(&transaction, &SecretHash::new(secret));

        assert_that!(extracted).is_some().is_equal_to(&secret);
    }

    #[test]
    fn extract_secret_rejects_wrong_hash() {
        let params = params(6);
        let fee = Fee::from_rates(10.0, 35.0, HTLC_SPEND_VSIZE);
        let secret = Secret::from(*b"This is our favourite passphrase");

        let redeem = redeem_transaction(
            &params,
            OutPoint {
                txid: Txid::default(),
                vout: 0,
            },
            asset::Bitcoin::from_sat(99_998_600),
            &redeemer(),
            secret,
            fee,
        )
        .unwrap();

        let other_hash = SecretHash::from_str(
            "bfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbfbf",
        )
        .unwrap();

        assert_that!(extract_secret(&redeem, &other_hash)).is_none();
    }

    #[test]
    fn fee_is_rounded_up_per_virtual_byte() {
        let fee = Fee::from_rates(10.5, 20.25, 141);

        assert_eq!(fee.want, asset::Bitcoin::from_sat(1_481));
        assert_eq!(fee.max, asset::Bitcoin::from_sat(2_856));
    }

    #[test]
    fn relative_lock_is_at_most_16_bits() {
        assert!(RelativeLock::try_from(70_000u32).is_err());
    }
}
