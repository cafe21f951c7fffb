//! ABI-driven invocation engine - deploy artifacts and call recorded contracts
//!
//! Given an ABI fragment and raw string arguments, the engine coerces each
//! argument to its declared type, then dispatches on the fragment's
//! mutability: pure/view functions run as state-read calls with their return
//! values decoded synchronously, everything else is submitted as a signed
//! transaction and awaited for one confirmation.

pub mod coerce;

use std::collections::BTreeMap;
use std::time::Duration;

use alloy::rpc::types::{TransactionInput, TransactionRequest};
use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_json_abi::{Function, Param};
use alloy_primitives::{Address, Bytes, TxKind, B256};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::abi::{constructor_inputs, resolve_function, FunctionKind, FunctionLookupError};
use crate::domain::contract::DeployedContractRecord;
use crate::engine::coerce::{coerce_value, format_value, parse_param_type};
use crate::infrastructure::artifacts::Artifact;
use crate::infrastructure::wallet::{await_receipt, ProviderError, TxReceipt, WalletProvider};
use crate::session::Signer;
use crate::store::{ContractRegistry, StoreError};

#[derive(Debug, Error)]
pub enum InvokeError {
    /// A raw string could not be parsed as the parameter's declared type;
    /// raised before anything is submitted, so no gas is wasted.
    #[error("argument '{param}' ({ty}): {reason}")]
    ArgumentCoercion {
        param: String,
        ty: String,
        reason: String,
    },

    /// FunctionNotFound / AmbiguousOverload
    #[error(transparent)]
    FunctionLookup(#[from] FunctionLookupError),

    #[error("call reverted: {0}")]
    CallReverted(String),

    #[error("deployment reverted: {0}")]
    DeploymentReverted(String),

    /// The confirmation wait was abandoned. The transaction was already
    /// broadcast and may still be included later.
    #[error("transaction not confirmed within {0:?} (it may still land later)")]
    TransactionTimeout(Duration),

    #[error("failed to decode return data: {0}")]
    ReturnDecode(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One decoded return value of a read invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnValue {
    /// Output name, or "out{n}" when the ABI leaves it unnamed
    pub name: String,
    /// Solidity type
    pub kind: String,
    /// Display-formatted value
    pub value: String,
}

/// Outcome of an invocation; `Read` carries decoded values, `Write` carries
/// the confirmed transaction hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationResult {
    Read { values: Vec<ReturnValue> },
    Write { tx_hash: B256 },
}

impl InvocationResult {
    pub fn is_write(&self) -> bool {
        matches!(self, InvocationResult::Write { .. })
    }
}

/// Outcome of a successful deployment
#[derive(Debug, Clone)]
pub struct DeploymentOutcome {
    pub address: Address,
    pub tx_hash: B256,
    pub record: DeployedContractRecord,
}

/// How long to wait for one confirmation, and how often to poll
#[derive(Debug, Clone, Copy)]
pub struct ConfirmPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Default)]
pub struct InvocationEngine {
    confirm: ConfirmPolicy,
}

impl InvocationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_confirm(confirm: ConfirmPolicy) -> Self {
        Self { confirm }
    }

    /// Deploy an artifact: coerce constructor arguments, submit the
    /// creation transaction, wait for inclusion, and record the deployment
    /// in the registry under (deployer, chain).
    pub async fn deploy(
        &self,
        signer: &Signer,
        registry: &mut ContractRegistry,
        artifact: &Artifact,
        raw_args: &BTreeMap<String, String>,
    ) -> Result<DeploymentOutcome, InvokeError> {
        // An absent constructor implies zero arguments.
        let inputs = constructor_inputs(&artifact.abi);
        let values = coerce_arguments(inputs, raw_args)?;

        let mut data = artifact.bytecode.to_vec();
        if !values.is_empty() {
            data.extend(DynSolValue::Tuple(values).abi_encode_params());
        }

        let request = TransactionRequest {
            to: Some(TxKind::Create),
            input: TransactionInput::new(Bytes::from(data)),
            ..Default::default()
        };

        let tx_hash = signer.send(request).await.map_err(deploy_send_error)?;
        info!(%tx_hash, artifact = %artifact.name, "deployment submitted");

        let receipt = self.wait_for_confirmation(signer.provider(), tx_hash).await?;
        if !receipt.success {
            return Err(InvokeError::DeploymentReverted(
                "transaction reverted on chain".to_string(),
            ));
        }
        let address = receipt.contract_address.ok_or_else(|| {
            InvokeError::DeploymentReverted("receipt carries no contract address".to_string())
        })?;

        let record = DeployedContractRecord {
            address,
            name: artifact.name.clone(),
            abi: artifact.abi.clone(),
            chain_id: signer.chain_id(),
            deployer: signer.account(),
            deployed_at: Utc::now().timestamp(),
        };
        registry.add(record.clone())?;
        info!(%address, artifact = %artifact.name, "deployment confirmed and recorded");

        Ok(DeploymentOutcome {
            address,
            tx_hash,
            record,
        })
    }

    /// Invoke a named function on a recorded contract.
    pub async fn invoke(
        &self,
        signer: &Signer,
        record: &DeployedContractRecord,
        function_name: &str,
        raw_args: &BTreeMap<String, String>,
    ) -> Result<InvocationResult, InvokeError> {
        let function = resolve_function(&record.abi, function_name)?;
        let values = coerce_arguments(&function.inputs, raw_args)?;
        let calldata = encode_call(function, values);

        let request = TransactionRequest {
            to: Some(TxKind::Call(record.address)),
            input: TransactionInput::new(Bytes::from(calldata)),
            ..Default::default()
        };

        match FunctionKind::of(function) {
            FunctionKind::Read => {
                let mut request = request;
                request.from = Some(signer.account());
                debug!(function = function_name, contract = %record.address, "state-read call");
                let returned = signer
                    .provider()
                    .call(request)
                    .await
                    .map_err(call_revert_error)?;
                let values = decode_returns(function, &returned)?;
                Ok(InvocationResult::Read { values })
            }
            FunctionKind::Write => {
                let tx_hash = signer.send(request).await.map_err(call_revert_error)?;
                info!(%tx_hash, function = function_name, contract = %record.address, "transaction submitted");

                let receipt = self.wait_for_confirmation(signer.provider(), tx_hash).await?;
                if !receipt.success {
                    return Err(InvokeError::CallReverted(
                        "transaction reverted on chain".to_string(),
                    ));
                }
                Ok(InvocationResult::Write { tx_hash })
            }
        }
    }

    async fn wait_for_confirmation(
        &self,
        provider: &dyn WalletProvider,
        tx_hash: B256,
    ) -> Result<TxReceipt, InvokeError> {
        await_receipt(
            provider,
            tx_hash,
            self.confirm.timeout,
            self.confirm.poll_interval,
        )
        .await?
        .ok_or(InvokeError::TransactionTimeout(self.confirm.timeout))
    }
}

/// Coerce every declared parameter from the raw-args map.
///
/// A missing map entry behaves as the empty string, which in turn coerces
/// to the type's zero value - parameters are mandatory, not optional.
fn coerce_arguments(
    params: &[Param],
    raw_args: &BTreeMap<String, String>,
) -> Result<Vec<DynSolValue>, InvokeError> {
    params
        .iter()
        .map(|param| {
            let ty = parse_param_type(param).map_err(|err| coercion_error(param, err.0))?;
            let raw = raw_args
                .get(&param.name)
                .map(String::as_str)
                .unwrap_or_default();
            coerce_value(&ty, raw).map_err(|err| coercion_error(param, err.0))
        })
        .collect()
}

fn coercion_error(param: &Param, reason: String) -> InvokeError {
    InvokeError::ArgumentCoercion {
        param: if param.name.is_empty() {
            "<unnamed>".to_string()
        } else {
            param.name.clone()
        },
        ty: param.selector_type().to_string(),
        reason,
    }
}

/// selector ++ abi-encoded arguments
fn encode_call(function: &Function, values: Vec<DynSolValue>) -> Vec<u8> {
    let mut calldata = function.selector().to_vec();
    if !values.is_empty() {
        calldata.extend(DynSolValue::Tuple(values).abi_encode_params());
    }
    calldata
}

/// Decode return data against the fragment's output parameters
fn decode_returns(function: &Function, data: &[u8]) -> Result<Vec<ReturnValue>, InvokeError> {
    if function.outputs.is_empty() {
        return Ok(Vec::new());
    }

    let types = function
        .outputs
        .iter()
        .map(|output| {
            parse_param_type(output)
                .map_err(|err| InvokeError::ReturnDecode(err.0))
        })
        .collect::<Result<Vec<DynSolType>, _>>()?;

    let decoded = DynSolType::Tuple(types)
        .abi_decode(data)
        .map_err(|err| InvokeError::ReturnDecode(err.to_string()))?;
    let decoded_values = match decoded {
        DynSolValue::Tuple(values) => values,
        single => vec![single],
    };

    Ok(function
        .outputs
        .iter()
        .zip(decoded_values.iter())
        .enumerate()
        .map(|(index, (output, value))| ReturnValue {
            name: if output.name.trim().is_empty() {
                format!("out{index}")
            } else {
                output.name.clone()
            },
            kind: output.selector_type().to_string(),
            value: format_value(value),
        })
        .collect())
}

fn deploy_send_error(err: ProviderError) -> InvokeError {
    match err {
        ProviderError::Rpc(message) => InvokeError::DeploymentReverted(message),
        other => InvokeError::Provider(other),
    }
}

/// The node's error message (including any revert reason it surfaces) is
/// passed through verbatim.
fn call_revert_error(err: ProviderError) -> InvokeError {
    match err {
        ProviderError::Rpc(message) => InvokeError::CallReverted(message),
        other => InvokeError::Provider(other),
    }
}
