//! Donation planner - gas-bounded native and ERC-20 transfers
//!
//! The hard part of "donate everything" is computing a safe maximum under a
//! gas cost that can move between estimation and broadcast: the planner
//! estimates gas for a representative minimal transfer, reads the current
//! gas price (explicit price, then fee estimate, then a fixed 20 gwei
//! default), and reserves `gas * price * 1.5` before deciding the amount.
//! Token transfers pay gas in native currency only, so the token amount
//! itself is never reduced.

pub mod units;

use std::time::Duration;

use alloy::rpc::types::{TransactionInput, TransactionRequest};
use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{keccak256, Address, Bytes, TxKind, B256, U256};
use thiserror::Error;
use tracing::info;

use crate::engine::ConfirmPolicy;
use crate::infrastructure::wallet::{await_receipt, ProviderError, WalletProvider};
use crate::session::Signer;

/// Default donation recipient
pub const DEFAULT_RECIPIENT: Address =
    alloy_primitives::address!("5244361b12ed6716b3ad9ba46dd23252a72d22c7");

/// Fixed fallback when the provider reports no fee data at all: 20 gwei
pub const DEFAULT_GAS_PRICE: u128 = 20_000_000_000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DonationError {
    #[error("insufficient funds: balance {balance} cannot cover {required}")]
    InsufficientFunds { balance: U256, required: U256 },

    #[error("donation transaction reverted")]
    Reverted,

    #[error("donation not confirmed within {0:?} (it may still land later)")]
    Timeout(Duration),

    #[error("unexpected token response: {0}")]
    Token(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// A planned native-currency transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeTransferPlan {
    pub recipient: Address,
    pub amount: U256,
    pub gas_limit: u64,
    pub gas_price: u128,
    /// `gas_limit * gas_price * 1.5`, the reserve kept back for fees
    pub buffered_cost: U256,
}

/// A planned fungible-token transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransferPlan {
    pub recipient: Address,
    pub token: Address,
    pub amount: U256,
}

/// Symbol, decimals and holder balance of a token, read in one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    pub balance: U256,
}

pub struct DonationPlanner<'a> {
    provider: &'a dyn WalletProvider,
    recipient: Address,
    confirm: ConfirmPolicy,
}

impl<'a> DonationPlanner<'a> {
    pub fn new(provider: &'a dyn WalletProvider, recipient: Address) -> Self {
        Self {
            provider,
            recipient,
            confirm: ConfirmPolicy::default(),
        }
    }

    pub fn with_confirm(mut self, confirm: ConfirmPolicy) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn recipient(&self) -> Address {
        self.recipient
    }

    /// Plan a native transfer from `account`. With no requested amount the
    /// plan moves everything the gas reserve leaves behind; with one, the
    /// balance must cover the amount plus the reserve.
    pub async fn plan_native(
        &self,
        account: Address,
        requested: Option<U256>,
    ) -> Result<NativeTransferPlan, DonationError> {
        let balance = self.provider.get_balance(account).await?;

        // Representative minimal transfer for the estimate; when donating
        // all, a small probe value stands in for the final amount.
        let probe_value = requested.unwrap_or_else(|| U256::from(1_000_000_000_000_000u64));
        let gas_limit = self
            .provider
            .estimate_gas(TransactionRequest {
                from: Some(account),
                to: Some(TxKind::Call(self.recipient)),
                value: Some(probe_value),
                ..Default::default()
            })
            .await?;

        let fee_data = self.provider.fee_data().await?;
        let gas_price = fee_data
            .gas_price
            .or(fee_data.max_fee_per_gas)
            .unwrap_or(DEFAULT_GAS_PRICE);

        let buffered_cost = buffered_cost(gas_limit, gas_price);
        let amount = native_amount(balance, buffered_cost, requested)?;

        Ok(NativeTransferPlan {
            recipient: self.recipient,
            amount,
            gas_limit,
            gas_price,
            buffered_cost,
        })
    }

    /// Submit a planned native transfer and wait for one confirmation.
    pub async fn execute_native(
        &self,
        signer: &Signer,
        plan: &NativeTransferPlan,
    ) -> Result<B256, DonationError> {
        let tx_hash = signer
            .send(TransactionRequest {
                to: Some(TxKind::Call(plan.recipient)),
                value: Some(plan.amount),
                ..Default::default()
            })
            .await?;
        info!(%tx_hash, amount = %plan.amount, "native donation submitted");
        self.confirm_or_fail(tx_hash).await
    }

    /// Read symbol, decimals and the holder's balance of a token.
    pub async fn token_info(
        &self,
        token: Address,
        account: Address,
    ) -> Result<TokenInfo, DonationError> {
        let symbol = self.read_symbol(token).await?;
        let decimals = self.read_decimals(token).await?;
        let balance = self.read_balance_of(token, account).await?;
        Ok(TokenInfo {
            address: token,
            symbol,
            decimals,
            balance,
        })
    }

    /// Plan a token transfer. Gas is paid in native currency, so nothing is
    /// deducted from the token amount; the requested amount only has to fit
    /// within the token balance.
    pub async fn plan_token(
        &self,
        token: Address,
        account: Address,
        requested: Option<U256>,
    ) -> Result<TokenTransferPlan, DonationError> {
        let balance = self.read_balance_of(token, account).await?;

        let amount = match requested {
            Some(amount) => {
                if amount > balance {
                    return Err(DonationError::InsufficientFunds {
                        balance,
                        required: amount,
                    });
                }
                amount
            }
            None => {
                if balance.is_zero() {
                    return Err(DonationError::InsufficientFunds {
                        balance,
                        required: U256::from(1u64),
                    });
                }
                balance
            }
        };

        Ok(TokenTransferPlan {
            recipient: self.recipient,
            token,
            amount,
        })
    }

    /// Submit a planned token transfer and wait for one confirmation.
    pub async fn execute_token(
        &self,
        signer: &Signer,
        plan: &TokenTransferPlan,
    ) -> Result<B256, DonationError> {
        let calldata = encode_with_args(
            "transfer(address,uint256)",
            vec![
                DynSolValue::Address(plan.recipient),
                DynSolValue::Uint(plan.amount, 256),
            ],
        );
        let tx_hash = signer
            .send(TransactionRequest {
                to: Some(TxKind::Call(plan.token)),
                input: TransactionInput::new(Bytes::from(calldata)),
                ..Default::default()
            })
            .await?;
        info!(%tx_hash, token = %plan.token, amount = %plan.amount, "token donation submitted");
        self.confirm_or_fail(tx_hash).await
    }

    async fn confirm_or_fail(&self, tx_hash: B256) -> Result<B256, DonationError> {
        let receipt = await_receipt(
            self.provider,
            tx_hash,
            self.confirm.timeout,
            self.confirm.poll_interval,
        )
        .await?
        .ok_or(DonationError::Timeout(self.confirm.timeout))?;

        if !receipt.success {
            return Err(DonationError::Reverted);
        }
        Ok(tx_hash)
    }

    async fn read_balance_of(
        &self,
        token: Address,
        account: Address,
    ) -> Result<U256, DonationError> {
        let returned = self
            .token_call(
                token,
                encode_with_args("balanceOf(address)", vec![DynSolValue::Address(account)]),
            )
            .await?;
        match decode_single(&DynSolType::Uint(256), &returned)? {
            DynSolValue::Uint(balance, _) => Ok(balance),
            other => Err(DonationError::Token(format!(
                "balanceOf returned {other:?}"
            ))),
        }
    }

    async fn read_decimals(&self, token: Address) -> Result<u8, DonationError> {
        let returned = self
            .token_call(token, encode_with_args("decimals()", Vec::new()))
            .await?;
        match decode_single(&DynSolType::Uint(8), &returned)? {
            DynSolValue::Uint(decimals, _) => Ok(decimals.to::<u8>()),
            other => Err(DonationError::Token(format!("decimals returned {other:?}"))),
        }
    }

    async fn read_symbol(&self, token: Address) -> Result<String, DonationError> {
        let returned = self
            .token_call(token, encode_with_args("symbol()", Vec::new()))
            .await?;
        match decode_single(&DynSolType::String, &returned)? {
            DynSolValue::String(symbol) => Ok(symbol),
            other => Err(DonationError::Token(format!("symbol returned {other:?}"))),
        }
    }

    async fn token_call(&self, token: Address, calldata: Vec<u8>) -> Result<Bytes, DonationError> {
        self.provider
            .call(TransactionRequest {
                to: Some(TxKind::Call(token)),
                input: TransactionInput::new(Bytes::from(calldata)),
                ..Default::default()
            })
            .await
            .map_err(DonationError::Provider)
    }
}

/// `gas * price`, widened to 256 bits, with the 50% safety margin applied.
/// Gas prices move between estimation and broadcast; the margin is fixed.
pub fn buffered_cost(gas_limit: u64, gas_price: u128) -> U256 {
    U256::from(gas_limit) * U256::from(gas_price) * U256::from(150u64) / U256::from(100u64)
}

/// The amount a native plan moves, or why it cannot.
fn native_amount(
    balance: U256,
    buffered_cost: U256,
    requested: Option<U256>,
) -> Result<U256, DonationError> {
    match requested {
        None => {
            let amount = balance.saturating_sub(buffered_cost);
            if amount.is_zero() {
                return Err(DonationError::InsufficientFunds {
                    balance,
                    required: buffered_cost,
                });
            }
            Ok(amount)
        }
        Some(amount) => {
            let required = amount.saturating_add(buffered_cost);
            if required > balance {
                return Err(DonationError::InsufficientFunds { balance, required });
            }
            Ok(amount)
        }
    }
}

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn encode_with_args(signature: &str, values: Vec<DynSolValue>) -> Vec<u8> {
    let mut calldata = selector(signature).to_vec();
    if !values.is_empty() {
        calldata.extend(DynSolValue::Tuple(values).abi_encode_params());
    }
    calldata
}

fn decode_single(ty: &DynSolType, data: &[u8]) -> Result<DynSolValue, DonationError> {
    let decoded = DynSolType::Tuple(vec![ty.clone()])
        .abi_decode(data)
        .map_err(|err| DonationError::Token(err.to_string()))?;
    match decoded {
        DynSolValue::Tuple(mut values) if values.len() == 1 => Ok(values.remove(0)),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_cost_is_one_and_a_half_times() {
        // 21000 * 20 gwei * 1.5
        assert_eq!(
            buffered_cost(21_000, 20_000_000_000),
            U256::from(630_000_000_000_000u64)
        );
        assert_eq!(buffered_cost(0, 20_000_000_000), U256::ZERO);
    }

    #[test]
    fn test_native_amount_donate_all() {
        let balance = U256::from(1_000_000_000_000_000_000u64);
        let buffered = U256::from(630_000_000_000_000u64);
        assert_eq!(
            native_amount(balance, buffered, None).unwrap(),
            U256::from(999_370_000_000_000_000u64)
        );
    }

    #[test]
    fn test_native_amount_all_insufficient() {
        let err = native_amount(U256::from(100u64), U256::from(100u64), None).unwrap_err();
        assert!(matches!(err, DonationError::InsufficientFunds { .. }));
    }

    #[test]
    fn test_native_amount_requested_exceeds_balance() {
        // fails regardless of the gas buffer
        let err =
            native_amount(U256::from(500u64), U256::ZERO, Some(U256::from(1000u64))).unwrap_err();
        assert!(matches!(err, DonationError::InsufficientFunds { .. }));
    }

    #[test]
    fn test_native_amount_requested_within_balance() {
        let balance = U256::from(1_000_000u64);
        let buffered = U256::from(1_000u64);
        assert_eq!(
            native_amount(balance, buffered, Some(U256::from(999_000u64))).unwrap(),
            U256::from(999_000u64)
        );
        // amount + buffer exactly one over the balance fails
        assert!(native_amount(balance, buffered, Some(U256::from(999_001u64))).is_err());
    }

    #[test]
    fn test_erc20_selectors() {
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(selector("decimals()"), [0x31, 0x3c, 0xe5, 0x67]);
        assert_eq!(selector("symbol()"), [0x95, 0xd8, 0x9b, 0x41]);
    }
}
