//! Parameters for the two range proving systems.
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Parameters for the legacy range prover.
///
/// The proven range is `min + [0, 2^mantissa) * 10^exp`, where the mantissa is
/// at least `min_bits`, but gets widened to fit the value.
/// An `exp` of -1 produces an exact value proof, with `min == max == value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeProofConfig {
    pub exp: i8,
    pub min_bits: u8,
}

impl Default for RangeProofConfig {
    fn default() -> Self {
        Self {
            exp: 0,
            min_bits: 64,
        }
    }
}

impl RangeProofConfig {
    pub fn validate(&self) -> Result<()> {
        if !(-1..=18).contains(&self.exp) {
            return Err(Error::BadParameters(format!(
                "exponent must be in -1..=18, found {}",
                self.exp
            )));
        }
        if self.min_bits > 64 {
            return Err(Error::BadParameters(format!(
                "minimum bits must be at most 64, found {}",
                self.min_bits
            )));
        }
        Ok(())
    }
}

/// Parameters for the bulletproof prover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletProofConfig {
    /// The number of bits in the proven range, `[min, min + 2^bits)`.
    pub bits: usize,
}

impl Default for BulletProofConfig {
    fn default() -> Self {
        Self { bits: 64 }
    }
}

impl BulletProofConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.bits.is_power_of_two() || !(8..=64).contains(&self.bits) {
            return Err(Error::BadParameters(format!(
                "bit size must be a power of two in 8..=64, found {}",
                self.bits
            )));
        }
        Ok(())
    }
}
