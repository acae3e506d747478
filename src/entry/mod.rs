//! Coin Entry Dispatch
//!
//! One method set for every supported chain. `CoinEntry::for_chain` picks
//! the pipeline variant; each variant plans, builds and signs through the
//! same stages and differs only in its sighash and address policy.

pub mod json;

use crate::error::{ErrorCode, SignerError, SignerResult};
use crate::fees::dust_threshold;
use crate::signing::{collect_pre_image_hashes, compile_transaction, ExternalSignature, PreImageOutput};
use crate::tx::{
    build_transaction, check_op_return, sign_transaction, SigHashType, SigningInput, SigningOutput, Transaction,
};
use crate::types::{Chain, ChainParams};
use crate::utils::config::SignerSettings;
use crate::wallet::address::{decode_address, derive_address, validate_address, AddressKind};
use crate::wallet::keys::KeyStore;
use crate::wallet::utxo::{select_utxos, SelectionParams, TransactionPlan};
use crate::{log_info, log_warn};

// =============================================================================
// Dispatch
// =============================================================================

/// Pipeline variant for a chain
#[derive(Debug, Clone)]
pub enum CoinEntry {
    /// Bitcoin-family chains
    Utxo(UtxoEntry),
    /// Replay-protected chains signing every input with the fork-id digest
    ForkId(ForkIdEntry),
}

impl CoinEntry {
    pub fn for_chain(chain: Chain) -> Self {
        Self::build(chain, SignerSettings::standard())
    }

    /// Entry with explicit settings; invalid settings are rejected
    pub fn with_settings(chain: Chain, settings: SignerSettings) -> SignerResult<Self> {
        let problems = settings.validate();
        if !problems.is_empty() {
            return Err(SignerError::invalid_input("Invalid signer settings").with_details(problems.join("; ")));
        }
        Ok(Self::build(chain, settings))
    }

    fn build(chain: Chain, settings: SignerSettings) -> Self {
        let core = EntryCore {
            chain,
            params: chain.params(),
            settings,
        };
        if core.params.fork_id.is_some() {
            CoinEntry::ForkId(ForkIdEntry { core })
        } else {
            CoinEntry::Utxo(UtxoEntry { core })
        }
    }

    fn core(&self) -> &EntryCore {
        match self {
            CoinEntry::Utxo(entry) => &entry.core,
            CoinEntry::ForkId(entry) => &entry.core,
        }
    }

    pub fn chain(&self) -> Chain {
        self.core().chain
    }

    pub fn validate_address(&self, address: &str) -> bool {
        validate_address(address, &self.core().params)
    }

    pub fn derive_address(&self, public_key: &[u8], kind: AddressKind) -> SignerResult<String> {
        match self {
            CoinEntry::Utxo(entry) => entry.derive_address(public_key, kind),
            CoinEntry::ForkId(entry) => entry.derive_address(public_key, kind),
        }
    }

    /// Hash or witness program an address commits to
    pub fn address_to_data(&self, address: &str) -> SignerResult<Vec<u8>> {
        Ok(decode_address(address, &self.core().params)?.data())
    }

    pub fn plan(&self, input: &SigningInput) -> SignerResult<TransactionPlan> {
        self.core().plan(input)
    }

    pub fn sign(&self, input: &SigningInput) -> SignerResult<SigningOutput> {
        let hash_type = self.hash_type(input)?;
        logged(self.chain(), "sign", self.core().sign(input, hash_type))
    }

    pub fn pre_image_hashes(&self, input: &SigningInput) -> SignerResult<PreImageOutput> {
        let hash_type = self.hash_type(input)?;
        logged(self.chain(), "pre_image_hashes", self.core().pre_image_hashes(input, hash_type))
    }

    pub fn compile(&self, input: &SigningInput, signatures: Vec<ExternalSignature>) -> SignerResult<SigningOutput> {
        let hash_type = self.hash_type(input)?;
        logged(self.chain(), "compile", self.core().compile(input, hash_type, signatures))
    }

    fn hash_type(&self, input: &SigningInput) -> SignerResult<SigHashType> {
        match self {
            CoinEntry::Utxo(entry) => entry.hash_type(input),
            CoinEntry::ForkId(entry) => entry.hash_type(input),
        }
    }
}

fn logged<T>(chain: Chain, operation: &str, result: SignerResult<T>) -> SignerResult<T> {
    if let Err(e) = &result {
        log_warn!("entry", "Operation failed", chain = chain, operation = operation, code = format!("{:?}", e.code));
    }
    result
}

// =============================================================================
// Variants
// =============================================================================

#[derive(Debug, Clone)]
pub struct UtxoEntry {
    core: EntryCore,
}

impl UtxoEntry {
    fn hash_type(&self, input: &SigningInput) -> SignerResult<SigHashType> {
        if input.hash_type.has_fork_id() {
            return Err(SignerError::new(
                ErrorCode::InvalidSigHashType,
                format!("{} does not use fork-id signatures", self.core.chain),
            ));
        }
        Ok(input.hash_type)
    }

    fn derive_address(&self, public_key: &[u8], kind: AddressKind) -> SignerResult<String> {
        Ok(derive_address(public_key, &self.core.params, kind)?)
    }
}

#[derive(Debug, Clone)]
pub struct ForkIdEntry {
    core: EntryCore,
}

impl ForkIdEntry {
    fn hash_type(&self, input: &SigningInput) -> SignerResult<SigHashType> {
        Ok(input.hash_type.with_fork_id())
    }

    /// Legacy Base58 addresses only
    fn derive_address(&self, public_key: &[u8], kind: AddressKind) -> SignerResult<String> {
        if kind == AddressKind::Segwit {
            return Err(SignerError::invalid_address(format!(
                "{} has no segwit addresses",
                self.core.chain
            )));
        }
        Ok(derive_address(public_key, &self.core.params, AddressKind::Legacy)?)
    }
}

// =============================================================================
// Shared pipeline
// =============================================================================

#[derive(Debug, Clone)]
struct EntryCore {
    chain: Chain,
    params: ChainParams,
    settings: SignerSettings,
}

impl EntryCore {
    fn check_chain(&self, input: &SigningInput) -> SignerResult<()> {
        if input.chain != self.chain {
            return Err(SignerError::new(
                ErrorCode::UnsupportedChain,
                format!("Input for {} sent to the {} entry", input.chain, self.chain),
            ));
        }
        Ok(())
    }

    fn plan(&self, input: &SigningInput) -> SignerResult<TransactionPlan> {
        self.check_chain(input)?;
        check_op_return(&input.output_op_return)?;

        if let Some(plan) = &input.plan {
            return Ok(plan.clone());
        }

        let calculator = self.params.fee_calculator;
        let params = SelectionParams {
            target: input.amount,
            extra_outputs_amount: input.extra_outputs_amount(),
            extra_output_count: input.extra_outputs.len(),
            byte_fee: input.byte_fee,
            dust_threshold: dust_threshold(self.params.dust_threshold, &calculator, input.byte_fee),
            max_utxos: self.settings.max_utxos,
            use_max_amount: input.use_max_amount,
            use_max_utxo: input.use_max_utxo,
            disable_dust_filter: input.disable_dust_filter,
            has_op_return: !input.output_op_return.is_empty(),
        };

        let mut plan = select_utxos(&input.utxos, &params, &calculator)?;
        plan.output_op_return = input.output_op_return.clone();

        log_info!(
            "entry",
            "Planned spend",
            chain = self.chain,
            inputs = plan.utxos.len(),
            amount = plan.amount,
            fee = plan.fee,
            change = plan.change,
        );
        Ok(plan)
    }

    fn unsigned(&self, input: &SigningInput) -> SignerResult<(TransactionPlan, Transaction)> {
        let plan = self.plan(input)?;
        let unsigned = build_transaction(&plan, input, &self.params)?;
        Ok((plan, unsigned))
    }

    fn sign(&self, input: &SigningInput, hash_type: SigHashType) -> SignerResult<SigningOutput> {
        let (plan, unsigned) = self.unsigned(input)?;
        let keys = KeyStore::new(&input.private_keys)?;

        let signed = sign_transaction(&unsigned, &plan.utxos, &input.scripts, hash_type, &keys)?;
        let output = SigningOutput::new(signed, plan.fee);

        log_info!(
            "entry",
            "Signed transaction",
            chain = self.chain,
            txid = output.transaction_id,
            vsize = output.vsize,
            fee = output.fee,
        );
        Ok(output)
    }

    fn pre_image_hashes(&self, input: &SigningInput, hash_type: SigHashType) -> SignerResult<PreImageOutput> {
        let (plan, unsigned) = self.unsigned(input)?;
        let hashes = collect_pre_image_hashes(&unsigned, &plan.utxos, &input.scripts, hash_type)?;

        log_info!("entry", "Computed pre-image hashes", chain = self.chain, count = hashes.len());
        Ok(PreImageOutput { hashes, plan })
    }

    fn compile(
        &self,
        input: &SigningInput,
        hash_type: SigHashType,
        signatures: Vec<ExternalSignature>,
    ) -> SignerResult<SigningOutput> {
        let (plan, unsigned) = self.unsigned(input)?;
        let signed = compile_transaction(
            &unsigned,
            &plan.utxos,
            &input.scripts,
            hash_type,
            signatures,
            self.settings.verify_external_signatures,
        )?;
        let output = SigningOutput::new(signed, plan.fee);

        log_info!("entry", "Compiled transaction", chain = self.chain, txid = output.transaction_id);
        Ok(output)
    }
}
