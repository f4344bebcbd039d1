//! Fixed-point math for movement costs and budgets.
//!
//! Movement costs are summed along every explored path, so they use
//! fixed-point arithmetic: equal-cost paths compare equal on every platform
//! and tie-breaking stays deterministic. Combat probabilities stay `f64`
//! because they only ever feed seeded dice rolls.

use fixed::types::I32F32;

/// Fixed-point number type for movement math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Round a movement budget to the nearest whole point (halves round up).
#[must_use]
pub fn round_budget(value: Fixed) -> Fixed {
    value.round()
}

/// Convert a fixed-point value to `f64` for display and wire structures.
#[must_use]
pub fn to_f64(value: Fixed) -> f64 {
    value.to_num::<f64>()
}

/// Serde support for fixed-point numbers written as plain decimals.
///
/// Rules files and saved states are hand-edited, so costs appear as `1.5`
/// rather than raw bits. Parsing a decimal literal into fixed-point is exact
/// for the halves and quarters the rule sets use.
pub mod decimal_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as an `f64`.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from an `f64`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("value {raw} out of range")))
    }
}

/// Serde support for `Option<Fixed>` written as plain decimals.
pub mod option_decimal_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize an optional fixed-point number.
    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.map(|v| v.to_num::<f64>()).serialize(serializer)
    }

    /// Deserialize an optional fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<f64>::deserialize(deserializer)? {
            Some(raw) => Fixed::checked_from_num(raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("value {raw} out of range"))),
            None => Ok(None),
        }
    }
}
