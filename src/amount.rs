// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token quantities in base units and display form.
//!
//! An [`Amount`] always stores the integer base-unit value (`raw`, e.g. wei)
//! together with the token's decimal precision. The human-readable value is
//! derived from `raw` on demand, so the two representations cannot drift.
//! Comparisons and scaling go through `raw`; [`Amount::to_decimal`] exists
//! only for presentation and price estimation.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::U256;
use rust_decimal::Decimal;

/// Largest exponent for which `10^decimals` still fits in a `U256`.
pub const MAX_DECIMALS: u8 = 77;

/// Errors raised when constructing an [`Amount`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount must not be negative: {0}")]
    Negative(Decimal),

    #[error("unsupported decimals: {0} (max {MAX_DECIMALS})")]
    Decimals(u8),

    #[error("amount does not fit in 256 bits")]
    Overflow,

    #[error("invalid amount format: {0}")]
    Format(String),

    #[error("amount has {actual} decimals, expected {expected}")]
    Precision { expected: u8, actual: u8 },

    #[error("slippage must be within 0..=100 percent, got {0}")]
    Slippage(Decimal),
}

/// A token quantity with a fixed decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Amount {
    raw: U256,
    decimals: u8,
}

impl Amount {
    /// Build from base units (wei for the native coin).
    pub fn from_raw(raw: U256, decimals: u8) -> Result<Self, AmountError> {
        check_decimals(decimals)?;
        Ok(Self { raw, decimals })
    }

    /// Build from a human-readable value, rounding half away from zero to
    /// the nearest base unit.
    pub fn from_display(value: Decimal, decimals: u8) -> Result<Self, AmountError> {
        check_decimals(decimals)?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative(value));
        }

        // value = mantissa / 10^scale, mantissa is non-negative here
        let mantissa = U256::from(value.mantissa().unsigned_abs());
        let scale = value.scale();
        let decimals_u32 = u32::from(decimals);

        let raw = if decimals_u32 >= scale {
            mantissa
                .checked_mul(pow10(decimals_u32 - scale)?)
                .ok_or(AmountError::Overflow)?
        } else {
            let divisor = pow10(scale - decimals_u32)?;
            let quotient = mantissa / divisor;
            let remainder = mantissa % divisor;
            if remainder * U256::from(2u8) >= divisor {
                quotient + U256::from(1u8)
            } else {
                quotient
            }
        };

        Ok(Self { raw, decimals })
    }

    /// Parse a display string such as `"2.5"`.
    pub fn parse(value: &str, decimals: u8) -> Result<Self, AmountError> {
        let value = Decimal::from_str(value.trim())
            .map_err(|e| AmountError::Format(format!("{value:?}: {e}")))?;
        Self::from_display(value, decimals)
    }

    /// Zero in the given precision.
    pub fn zero(decimals: u8) -> Result<Self, AmountError> {
        Self::from_raw(U256::ZERO, decimals)
    }

    /// `2^256 - 1` base units: the "unlimited" allowance of native coins.
    pub fn unlimited(decimals: u8) -> Result<Self, AmountError> {
        Self::from_raw(U256::MAX, decimals)
    }

    /// Base-unit value.
    pub fn raw(&self) -> U256 {
        self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// Display value as a `Decimal`.
    ///
    /// Fails with [`AmountError::Overflow`] when the value exceeds the 96-bit
    /// mantissa of `Decimal` (e.g. the unlimited sentinel).
    pub fn to_decimal(&self) -> Result<Decimal, AmountError> {
        let mantissa: i128 = u128::try_from(self.raw)
            .ok()
            .and_then(|v| i128::try_from(v).ok())
            .ok_or(AmountError::Overflow)?;

        let mut scale = u32::from(self.decimals);
        let mut mantissa = mantissa;
        // Decimal supports at most 28 fractional digits
        while scale > 28 {
            mantissa /= 10;
            scale -= 1;
        }
        Decimal::try_from_i128_with_scale(mantissa, scale).map_err(|_| AmountError::Overflow)
    }

    /// Fail unless this amount is expressed in `decimals`.
    ///
    /// Base units of different precisions are never mixed; callers convert
    /// through the display form instead.
    pub fn require_decimals(&self, decimals: u8) -> Result<(), AmountError> {
        if self.decimals != decimals {
            return Err(AmountError::Precision {
                expected: decimals,
                actual: self.decimals,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_amount(self.raw, self.decimals))
    }
}

fn check_decimals(decimals: u8) -> Result<(), AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::Decimals(decimals));
    }
    Ok(())
}

fn pow10(exp: u32) -> Result<U256, AmountError> {
    U256::from(10u8)
        .checked_pow(U256::from(exp))
        .ok_or(AmountError::Overflow)
}

/// Format base units as a decimal string without trailing zeros.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }
    if decimals == 0 {
        return amount.to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        format!("{}.{}", whole, trimmed)
    }
}
