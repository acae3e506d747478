//! UTXO Selection
//!
//! Picks the inputs for a spend, computes the fee and decides whether the
//! leftover becomes a change output or is folded into the fee.

use crate::error::{ErrorCode, SignerError, SignerResult};
use crate::fees::FeeCalculator;
use crate::script::Script;
use crate::tx::{OutPoint, SEQUENCE_FINAL};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// =============================================================================
// Types
// =============================================================================

/// A spendable output owned by the signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub outpoint: OutPoint,
    /// Script the output is locked with
    pub script: Script,
    pub amount: u64,
    #[serde(default)]
    pub sequence: Option<u32>,
}

impl Utxo {
    pub fn new(outpoint: OutPoint, script: Script, amount: u64) -> Self {
        Self {
            outpoint,
            script,
            amount,
            sequence: None,
        }
    }

    pub fn sequence(&self) -> u32 {
        self.sequence.unwrap_or(SEQUENCE_FINAL)
    }

    /// Deterministic selection order: amount, then txid bytes, then index
    fn selection_order(&self, other: &Self) -> Ordering {
        self.amount
            .cmp(&other.amount)
            .then_with(|| self.outpoint.hash.cmp(&other.outpoint.hash))
            .then_with(|| self.outpoint.index.cmp(&other.outpoint.index))
    }
}

/// Everything the selector needs besides the UTXOs themselves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionParams {
    pub target: u64,
    pub extra_outputs_amount: u64,
    pub extra_output_count: usize,
    pub byte_fee: u64,
    pub dust_threshold: u64,
    pub max_utxos: usize,
    pub use_max_amount: bool,
    pub use_max_utxo: bool,
    pub disable_dust_filter: bool,
    pub has_op_return: bool,
}

impl SelectionParams {
    /// Main output, extra outputs and the data carrier
    fn outputs_without_change(&self) -> usize {
        1 + self.extra_output_count + usize::from(self.has_op_return)
    }
}

/// Result of input selection
///
/// `available_amount == amount + extra_outputs_amount + fee + change`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionPlan {
    pub amount: u64,
    pub available_amount: u64,
    pub fee: u64,
    pub change: u64,
    pub utxos: Vec<Utxo>,
    pub extra_outputs_amount: u64,
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub output_op_return: Vec<u8>,
    /// Leftover below the dust threshold went to the fee instead of change
    pub change_folded: bool,
}

impl TransactionPlan {
    /// Check the amount identity a plan must satisfy
    pub fn is_balanced(&self) -> bool {
        let spent = self
            .amount
            .checked_add(self.extra_outputs_amount)
            .and_then(|v| v.checked_add(self.fee))
            .and_then(|v| v.checked_add(self.change));
        let selected = total_amount(&self.utxos).ok();
        spent == Some(self.available_amount) && selected == Some(self.available_amount)
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Select inputs and compute the plan
pub fn select_utxos(
    utxos: &[Utxo],
    params: &SelectionParams,
    calculator: &FeeCalculator,
) -> SignerResult<TransactionPlan> {
    if utxos.is_empty() {
        return Err(SignerError::new(ErrorCode::NoUtxos, "No UTXOs to spend"));
    }
    if params.target == 0 && !params.use_max_amount {
        return Err(SignerError::new(ErrorCode::InvalidAmount, "Amount must be greater than zero"));
    }

    let mut sorted = utxos.to_vec();
    sorted.sort_by(Utxo::selection_order);

    let eligible: Vec<Utxo> = if params.disable_dust_filter {
        sorted
    } else {
        sorted
            .into_iter()
            .filter(|u| u.amount >= params.dust_threshold)
            .collect()
    };

    if eligible.is_empty() {
        return Err(SignerError::new(
            ErrorCode::DustInputsOnly,
            format!("Every UTXO is below the dust threshold of {}", params.dust_threshold),
        ));
    }

    if params.use_max_utxo && eligible.len() > params.max_utxos {
        return Err(utxo_limit_exceeded(eligible.len(), params.max_utxos));
    }

    let candidates = &eligible[..eligible.len().min(params.max_utxos)];

    if params.use_max_amount {
        return max_amount_plan(candidates, params, calculator);
    }

    let count = if params.use_max_utxo {
        candidates.len()
    } else {
        match covering_prefix(candidates, params, calculator) {
            Some(count) => count,
            None if candidates.len() < eligible.len()
                && covering_prefix(&eligible, params, calculator).is_some() =>
            {
                return Err(utxo_limit_exceeded(eligible.len(), params.max_utxos));
            }
            None => {
                let available = eligible.iter().fold(0u64, |acc, u| acc.saturating_add(u.amount));
                return Err(SignerError::insufficient_funds(format!(
                    "Need {} plus fees, have {}",
                    params.target.saturating_add(params.extra_outputs_amount),
                    available
                )));
            }
        }
    };

    let selected = candidates[..count].to_vec();
    plan_with_change(selected, params, calculator)
}

/// Smallest prefix of `candidates` whose sum covers target, extras and fee
fn covering_prefix(candidates: &[Utxo], params: &SelectionParams, calculator: &FeeCalculator) -> Option<usize> {
    let outputs = params.outputs_without_change();
    let mut total: u64 = 0;

    for (i, utxo) in candidates.iter().enumerate() {
        total = total.saturating_add(utxo.amount);
        let needed = params
            .target
            .saturating_add(params.extra_outputs_amount)
            .saturating_add(calculator.fee(i + 1, outputs, params.byte_fee));
        if total >= needed {
            return Some(i + 1);
        }
    }
    None
}

fn plan_with_change(
    selected: Vec<Utxo>,
    params: &SelectionParams,
    calculator: &FeeCalculator,
) -> SignerResult<TransactionPlan> {
    let n = selected.len();
    let total = total_amount(&selected)?;
    let outputs = params.outputs_without_change();

    let fee_without_change = calculator.fee(n, outputs, params.byte_fee);
    let fee_with_change = calculator.fee(n, outputs + 1, params.byte_fee);

    let remainder = total
        .checked_sub(params.target)
        .and_then(|v| v.checked_sub(params.extra_outputs_amount))
        .filter(|v| *v >= fee_without_change)
        .ok_or_else(|| SignerError::insufficient_funds(format!("Selected {} does not cover the spend", total)))?;

    let change = remainder.saturating_sub(fee_with_change);
    let keep_change = remainder >= fee_with_change
        && if params.disable_dust_filter {
            change > 0
        } else {
            change >= params.dust_threshold
        };

    let (fee, change, change_folded) = if keep_change {
        (fee_with_change, change, false)
    } else {
        (remainder, 0, remainder > fee_without_change)
    };

    if change_folded {
        crate::log_debug!(
            "utxo",
            "Change below dust folded into fee",
            folded = remainder - fee_without_change,
            threshold = params.dust_threshold
        );
    }

    Ok(TransactionPlan {
        amount: params.target,
        available_amount: total,
        fee,
        change,
        utxos: selected,
        extra_outputs_amount: params.extra_outputs_amount,
        output_op_return: Vec::new(),
        change_folded,
    })
}

fn max_amount_plan(
    candidates: &[Utxo],
    params: &SelectionParams,
    calculator: &FeeCalculator,
) -> SignerResult<TransactionPlan> {
    let total = total_amount(candidates)?;
    let fee = calculator.fee(candidates.len(), params.outputs_without_change(), params.byte_fee);
    let reserved = params.extra_outputs_amount.saturating_add(fee);

    if total <= reserved {
        return Err(SignerError::insufficient_funds(format!(
            "Balance {} does not cover fee {} and extra outputs {}",
            total, fee, params.extra_outputs_amount
        )));
    }

    Ok(TransactionPlan {
        amount: total - reserved,
        available_amount: total,
        fee,
        change: 0,
        utxos: candidates.to_vec(),
        extra_outputs_amount: params.extra_outputs_amount,
        output_op_return: Vec::new(),
        change_folded: false,
    })
}

/// Sum of UTXO amounts; overflowing `u64` is an invalid amount
fn total_amount(utxos: &[Utxo]) -> SignerResult<u64> {
    utxos
        .iter()
        .try_fold(0u64, |acc, u| acc.checked_add(u.amount))
        .ok_or_else(|| SignerError::new(ErrorCode::InvalidAmount, "UTXO amounts overflow u64"))
}

fn utxo_limit_exceeded(eligible: usize, max_utxos: usize) -> SignerError {
    SignerError::new(
        ErrorCode::UtxoLimitExceeded,
        format!("Spend needs more than {} of {} UTXOs", max_utxos, eligible),
    )
}
