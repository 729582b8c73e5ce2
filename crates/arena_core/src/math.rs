//! Fixed-point math utilities for deterministic simulation.
//!
//! All combat math uses fixed-point arithmetic to ensure
//! deterministic behavior across platforms. Floating-point
//! operations can produce different results on different CPUs.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Build a fixed-point fraction `numerator / denominator` from integers.
///
/// Used for constants like `0.2` (`ratio(1, 5)`) so no float literal ever
/// enters the simulation.
#[must_use]
pub fn ratio(numerator: i32, denominator: i32) -> Fixed {
    Fixed::from_num(numerator) / Fixed::from_num(denominator)
}

/// Floor a non-negative fixed-point value to an integer amount.
///
/// Negative values floor to zero.
#[must_use]
pub fn floor_u32(value: Fixed) -> u32 {
    if value <= Fixed::ZERO {
        0
    } else {
        value.floor().to_num::<u32>()
    }
}

/// Ceil a fixed-point value to a tick count, never below one.
#[must_use]
pub fn ceil_ticks(value: Fixed) -> u32 {
    if value <= Fixed::ONE {
        1
    } else {
        value.ceil().to_num::<u32>()
    }
}

/// Convert `numerator / denominator` seconds to whole ticks, rounding down.
///
/// Integer math, so `1/5` of a second at 60 tps is exactly 12 ticks.
#[must_use]
pub const fn seconds_to_ticks(numerator: u32, denominator: u32, ticks_per_second: u32) -> u32 {
    if denominator == 0 {
        return 0;
    }
    ticks_per_second.saturating_mul(numerator) / denominator
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for hand-authored fixed-point values.
///
/// Content files are written by people, so values like `0.05` are read as
/// decimal numbers and converted once at load time. The conversion is exact
/// rounding of the parsed decimal, which is the same on every platform.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| D::Error::custom(format!("value {value} is out of fixed-point range")))
    }
}
