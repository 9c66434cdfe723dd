//! Native-currency amounts held in base units.
//!
//! Every amount that flows through the staking session is an exact integer number of wei. User
//! input is parsed straight into base units so that comparisons against on-chain balances never go
//! through floating point.

use std::{fmt, str::FromStr};

use alloy_primitives::{utils as units, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of decimal places between one whole unit of the native currency and one wei.
pub const NATIVE_DECIMALS: usize = 18;

/// `10^18`, the number of wei in one whole unit.
const WEI_PER_UNIT: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Errors that can occur while parsing a decimal string into an [`EthAmount`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
    /// The input was empty or only whitespace.
    #[error("amount is empty")]
    Empty,

    /// The input contained something other than digits and a single decimal point.
    #[error("invalid character {0:?} in amount")]
    InvalidCharacter(char),

    /// The input contained more than one decimal point.
    #[error("amount contains more than one decimal point")]
    MultipleDecimalPoints,

    /// The input had no digits on either side of the decimal point.
    #[error("amount has no digits")]
    NoDigits,

    /// The input had more fractional digits than the currency supports.
    #[error("amount has more than 18 decimal places")]
    TooManyDecimals,

    /// The input does not fit in 256 bits of wei.
    #[error("amount is too large")]
    Overflow,

    /// The unit conversion rejected the input.
    #[error("amount could not be converted to wei: {0}")]
    Units(String),
}

/// An amount of the chain's native currency, stored in wei.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EthAmount(U256);

impl EthAmount {
    /// The zero amount.
    pub const ZERO: Self = Self(U256::ZERO);

    /// Wraps a raw wei value.
    pub const fn from_wei(wei: U256) -> Self {
        Self(wei)
    }

    /// Returns the raw wei value.
    pub const fn wei(&self) -> U256 {
        self.0
    }

    /// Returns `true` if this amount is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtracts `rhs`, clamping at zero.
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Adds `rhs`, clamping at the maximum representable amount.
    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Parses a decimal string denominated in whole units (e.g. `"1.5"`) into wei.
    ///
    /// Accepts `digits`, `digits.`, `.digits` and `digits.digits`. Surrounding whitespace is
    /// ignored. Signs, exponents, separators and digits past the 18th decimal place are rejected
    /// rather than interpreted or truncated.
    pub fn parse_ether(s: &str) -> Result<Self, AmountParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountParseError::Empty);
        }

        if let Some(c) = s.chars().find(|c| !c.is_ascii_digit() && *c != '.') {
            return Err(AmountParseError::InvalidCharacter(c));
        }

        let (whole, frac) = match s.split_once('.') {
            Some((_, rest)) if rest.contains('.') => {
                return Err(AmountParseError::MultipleDecimalPoints)
            }
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(AmountParseError::NoDigits);
        }
        if frac.len() > NATIVE_DECIMALS {
            return Err(AmountParseError::TooManyDecimals);
        }

        // the scaled value must fit with room for a full fractional part
        let whole = match whole {
            "" => U256::ZERO,
            digits => U256::from_str_radix(digits, 10).map_err(|_| AmountParseError::Overflow)?,
        };
        whole
            .checked_add(U256::from(1u8))
            .and_then(|bound| bound.checked_mul(WEI_PER_UNIT))
            .ok_or(AmountParseError::Overflow)?;

        units::parse_ether(s)
            .map(Self)
            .map_err(|err| AmountParseError::Units(err.to_string()))
    }

    /// Formats the amount with exactly `places` fractional digits, rounding half up.
    ///
    /// `places` larger than [`NATIVE_DECIMALS`] is clamped.
    pub fn to_fixed(&self, places: usize) -> String {
        let places = places.min(NATIVE_DECIMALS);
        let step = pow10(NATIVE_DECIMALS - places);
        let half = step / U256::from(2u8);

        // ties round away from zero; the sum only saturates for values near U256::MAX
        let scaled = self.0.saturating_add(half) / step;

        if places == 0 {
            return scaled.to_string();
        }

        let unit = pow10(places);
        let whole = scaled / unit;
        let frac = scaled % unit;
        format!("{whole}.{frac:0>places$}", frac = frac.to_string())
    }
}

impl fmt::Display for EthAmount {
    /// Formats as whole units with trailing fractional zeros trimmed, keeping at least one
    /// fractional digit (`1.0`, `0.25`, `1.000000000000000001`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let padded = units::format_ether(self.0);
        let trimmed = padded.trim_end_matches('0');
        if trimmed.ends_with('.') {
            write!(f, "{trimmed}0")
        } else {
            f.write_str(trimmed)
        }
    }
}

impl FromStr for EthAmount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_ether(s)
    }
}

impl From<U256> for EthAmount {
    fn from(wei: U256) -> Self {
        Self(wei)
    }
}

impl From<EthAmount> for U256 {
    fn from(amount: EthAmount) -> Self {
        amount.0
    }
}

fn pow10(exp: usize) -> U256 {
    U256::from(10u8).pow(U256::from(exp))
}
