use bitcoin::util::amount::Denomination;
use std::fmt;

/// An amount of bitcoin, stored in satoshi.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct Bitcoin(bitcoin::Amount);

impl Bitcoin {
    pub fn from_sat(sat: u64) -> Bitcoin {
        Bitcoin(bitcoin::Amount::from_sat(sat))
    }

    pub fn as_sat(self) -> u64 {
        bitcoin::Amount::as_sat(self.0)
    }

    /// Parses a decimal BTC string, e.g. "0.5".
    pub fn from_btc_str(btc: &str) -> Result<Bitcoin, ParseError> {
        let amount = bitcoin::Amount::from_str_in(btc, Denomination::Bitcoin)
            .map_err(|_| ParseError(btc.to_owned()))?;

        Ok(Bitcoin(amount))
    }

    pub fn checked_sub(self, rhs: Bitcoin) -> Option<Bitcoin> {
        self.0.checked_sub(rhs.0).map(Bitcoin)
    }
}

impl From<Bitcoin> for bitcoin::Amount {
    fn from(bitcoin: Bitcoin) -> Self {
        bitcoin.0
    }
}

impl fmt::Display for Bitcoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let bitcoin = self.0.to_string_in(Denomination::Bitcoin);
        write!(f, "{} BTC", bitcoin)
    }
}

/// The number of mini-units in one BTS.
const MINI_PER_BTS: u64 = 100_000;

/// An amount of the Bitshares-issued asset, stored in 10⁻⁵ mini-units.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct Bitshares(u64);

impl Bitshares {
    pub fn from_mini(mini: u64) -> Bitshares {
        Bitshares(mini)
    }

    pub fn as_mini(self) -> u64 {
        self.0
    }

    /// Parses a decimal BTS string, e.g. "50000.5", truncating anything
    /// beyond the fifth decimal place.
    pub fn from_bts_str(bts: &str) -> Result<Bitshares, ParseError> {
        let err = || ParseError(bts.to_owned());

        let mut parts = bts.splitn(2, '.');
        let whole = parts.next().ok_or_else(err)?;
        let whole: u64 = whole.parse().map_err(|_| err())?;

        let frac = match parts.next() {
            None | Some("") => 0,
            Some(frac) => {
                let digits: String = frac.chars().chain("00000".chars()).take(5).collect();
                if !digits.chars().all(|c| c.is_ascii_digit()) {
                    return Err(err());
                }
                digits.parse::<u64>().map_err(|_| err())?
            }
        };

        whole
            .checked_mul(MINI_PER_BTS)
            .and_then(|mini| mini.checked_add(frac))
            .map(Bitshares)
            .ok_or_else(err)
    }
}

impl fmt::Display for Bitshares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "{}.{:05} BTS",
            self.0 / MINI_PER_BTS,
            self.0 % MINI_PER_BTS
        )
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("failed to parse amount: {0}")]
pub struct ParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_bitcoin() {
        assert_eq!(
            Bitcoin::from_sat(900_000_000_000).to_string(),
            "9000.00000000 BTC"
        );
    }

    #[test]
    fn parse_bitcoin_from_decimal_string() {
        assert_eq!(
            Bitcoin::from_btc_str("1.0").unwrap(),
            Bitcoin::from_sat(100_000_000)
        );
        assert_eq!(
            Bitcoin::from_btc_str("0.00000001").unwrap(),
            Bitcoin::from_sat(1)
        );
        assert!(Bitcoin::from_btc_str("-1").is_err());
        assert!(Bitcoin::from_btc_str("one").is_err());
    }

    #[test]
    fn display_bitshares() {
        assert_eq!(
            Bitshares::from_mini(5_000_000_000).to_string(),
            "50000.00000 BTS"
        );
        assert_eq!(Bitshares::from_mini(1).to_string(), "0.00001 BTS");
    }

    #[test]
    fn parse_bitshares_from_decimal_string() {
        assert_eq!(
            Bitshares::from_bts_str("50000").unwrap(),
            Bitshares::from_mini(5_000_000_000)
        );
        assert_eq!(
            Bitshares::from_bts_str("0.5").unwrap(),
            Bitshares::from_mini(50_000)
        );
        assert_eq!(
            Bitshares::from_bts_str("1.00001").unwrap(),
            Bitshares::from_mini(100_001)
        );
        assert!(Bitshares::from_bts_str("abc").is_err());
        assert!(Bitshares::from_bts_str("1.2.3").is_err());
    }
}
