//! Transaction Builder
//!
//! Lays out the unsigned transaction for a plan. Output order is fixed:
//! main, change, data carrier, then extra outputs in caller order.

use super::{SigningInput, Transaction, TransactionInput, TransactionOutput};
use crate::error::{SignerError, SignerResult};
use crate::script::Script;
use crate::types::ChainParams;
use crate::wallet::address::script_for_address;
use crate::wallet::utxo::TransactionPlan;

/// Largest data-carrier payload relayed by standard nodes
pub const MAX_OP_RETURN_BYTES: usize = 80;

/// Reject data-carrier payloads above the relay limit
pub fn check_op_return(data: &[u8]) -> SignerResult<()> {
    if data.len() > MAX_OP_RETURN_BYTES {
        return Err(SignerError::invalid_input(format!(
            "OP_RETURN payload is {} bytes, limit is {}",
            data.len(),
            MAX_OP_RETURN_BYTES
        )));
    }
    Ok(())
}

/// Build the unsigned transaction for `plan`
pub fn build_transaction(
    plan: &TransactionPlan,
    input: &SigningInput,
    params: &ChainParams,
) -> SignerResult<Transaction> {
    check_op_return(&plan.output_op_return)?;

    let mut tx = Transaction::new(
        params.tx_version,
        input.lock_time,
        input.hash_algorithm.unwrap_or(params.hash_algorithm),
        params.fork_id,
    );

    // Main output
    let to_script = script_for_address(&input.to_address, params)?;
    tx.outputs.push(TransactionOutput::new(plan.amount, to_script));

    if plan.change > 0 {
        if input.change_address.is_empty() {
            return Err(SignerError::invalid_address("Plan has change but no change address"));
        }
        let change_script = script_for_address(&input.change_address, params)?;
        tx.outputs.push(TransactionOutput::new(plan.change, change_script));
    }

    for utxo in &plan.utxos {
        tx.inputs.push(TransactionInput::new(utxo.outpoint, utxo.sequence()));
    }

    if !plan.output_op_return.is_empty() {
        tx.outputs
            .push(TransactionOutput::new(0, Script::op_return(&plan.output_op_return)));
    }

    for extra in &input.extra_outputs {
        let script = script_for_address(&extra.address, params)?;
        tx.outputs.push(TransactionOutput::new(extra.amount, script));
    }

    Ok(tx)
}
