//! Fee Estimator
//!
//! Linear transaction-size model used by the input selector. Sizes are in
//! bytes for legacy P2PKH spends; the fee is size times the byte fee.

use serde::{Deserialize, Serialize};

/// Fixed transaction overhead (version, counts, lock time)
pub const TX_OVERHEAD_BYTES: u64 = 10;
/// Signed P2PKH input
pub const INPUT_BYTES: u64 = 148;
/// P2PKH output
pub const OUTPUT_BYTES: u64 = 34;

/// `(base + per_input * inputs + per_output * outputs) * byte_fee`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCalculator {
    pub base: u64,
    pub per_input: u64,
    pub per_output: u64,
}

impl Default for FeeCalculator {
    fn default() -> Self {
        Self {
            base: TX_OVERHEAD_BYTES,
            per_input: INPUT_BYTES,
            per_output: OUTPUT_BYTES,
        }
    }
}

impl FeeCalculator {
    /// Flat per-input cost with no overhead or output component
    pub fn per_input_only(per_input: u64) -> Self {
        Self { base: 0, per_input, per_output: 0 }
    }

    pub fn estimate_size(&self, inputs: usize, outputs: usize) -> u64 {
        self.base
            .saturating_add(self.per_input.saturating_mul(inputs as u64))
            .saturating_add(self.per_output.saturating_mul(outputs as u64))
    }

    pub fn fee(&self, inputs: usize, outputs: usize, byte_fee: u64) -> u64 {
        self.estimate_size(inputs, outputs).saturating_mul(byte_fee)
    }

    /// Cost of adding one input; UTXOs worth less are not worth spending
    pub fn single_input_fee(&self, byte_fee: u64) -> u64 {
        self.per_input.saturating_mul(byte_fee)
    }
}

/// Dust threshold used for both input filtering and change suppression
pub fn dust_threshold(chain_dust: u64, calculator: &FeeCalculator, byte_fee: u64) -> u64 {
    chain_dust.max(calculator.single_input_fee(byte_fee))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model() {
        let calc = FeeCalculator::default();
        assert_eq!(calc.estimate_size(1, 2), 10 + 148 + 68);
        assert_eq!(calc.fee(2, 2, 10), (10 + 296 + 68) * 10);
        assert_eq!(calc.single_input_fee(3), 444);
    }

    #[test]
    fn test_flat_model() {
        let calc = FeeCalculator::per_input_only(200);
        assert_eq!(calc.fee(3, 5, 1), 600);
    }

    #[test]
    fn test_dust_threshold_takes_larger_bound() {
        let calc = FeeCalculator::default();
        assert_eq!(dust_threshold(546, &calc, 1), 546);
        assert_eq!(dust_threshold(546, &calc, 10), 1480);
    }

    #[test]
    fn test_saturates_instead_of_overflowing() {
        let calc = FeeCalculator::default();
        assert_eq!(calc.fee(1, 1, u64::MAX), u64::MAX);
    }
}
