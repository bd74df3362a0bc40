#![warn(
    unused_extern_crates,
    missing_debug_implementations,
    rust_2018_idioms,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::fallible_impl_from,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap,
    clippy::dbg_macro
)]
#![forbid(unsafe_code)]

pub mod asset;
pub mod config;
pub mod connector;
pub mod hbit;
pub mod hbts;
pub mod identity;
pub mod ledger;
mod secret;
mod secret_hash;
pub mod swap;
pub mod timelock;

pub use self::{secret::Secret, secret_hash::SecretHash};

use conquer_once::Lazy;

pub static SECP: Lazy<::bitcoin::secp256k1::Secp256k1<::bitcoin::secp256k1::All>> =
    Lazy::new(::bitcoin::secp256k1::Secp256k1::new);
