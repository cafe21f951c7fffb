//! Wallet provider capability interface
//!
//! Everything the application needs from the host wallet is expressed by the
//! [`WalletProvider`] trait: account authorization, the active chain, raw
//! calls and gas/fee estimation, transaction submission, chain switching, and
//! the two change notifications. The wallet itself (key management, signing,
//! broadcast) stays behind this boundary, so tests substitute a mock and the
//! shipped binding talks JSON-RPC to an unlocked dev node.

mod rpc;

use std::time::Duration;

use alloy::rpc::types::TransactionRequest;
use alloy_primitives::{Address, Bytes, B256, U256};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::ChainDescriptor;

pub use rpc::RpcWallet;

/// Errors surfaced by a wallet provider
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// No wallet is reachable at all
    #[error("wallet provider unavailable")]
    Unavailable,

    /// The user declined the request in the wallet
    #[error("request rejected by user")]
    UserRejected,

    /// The wallet does not know the requested chain (EIP-3326 code 4902)
    #[error("chain {0} is unknown to the wallet")]
    UnknownChain(u64),

    /// Any other provider-reported failure, message kept verbatim
    #[error("{0}")]
    Rpc(String),
}

/// Current fee information as reported by the provider.
///
/// Either field may be absent; callers fall back in the order
/// `gas_price` → `max_fee_per_gas` → a fixed default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeData {
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
}

/// Transaction receipt reduced to the fields this application consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    /// Execution status: true on success, false on revert
    pub success: bool,
    /// Address of the created contract, for deployment transactions
    pub contract_address: Option<Address>,
    pub block_number: u64,
}

/// The consumed wallet capability interface.
///
/// All operations are asynchronous suspension points; callers await them
/// sequentially, and no two state-changing submissions are issued
/// concurrently against one session.
#[async_trait::async_trait]
pub trait WalletProvider: Send + Sync + 'static {
    /// Ask the wallet for authorized accounts
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// The wallet's currently active chain id
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// Native-currency balance of an account
    async fn get_balance(&self, address: Address) -> Result<U256, ProviderError>;

    /// Execute a state-read call (eth_call)
    async fn call(&self, request: TransactionRequest) -> Result<Bytes, ProviderError>;

    /// Estimate gas for a transaction
    async fn estimate_gas(&self, request: TransactionRequest) -> Result<u64, ProviderError>;

    /// Current fee information
    async fn fee_data(&self) -> Result<FeeData, ProviderError>;

    /// Sign and broadcast a transaction, returning its hash.
    ///
    /// Once this returns, the transaction cannot be withdrawn; abandoning
    /// the confirmation wait does not cancel it.
    async fn sign_and_send(&self, request: TransactionRequest) -> Result<B256, ProviderError>;

    /// Fetch the receipt for a transaction, if it has been included
    async fn get_receipt(&self, hash: B256) -> Result<Option<TxReceipt>, ProviderError>;

    /// Ask the wallet to activate a chain it already knows
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError>;

    /// Ask the wallet to register a chain from its full connection parameters
    async fn add_chain(&self, descriptor: &ChainDescriptor) -> Result<(), ProviderError>;

    /// Subscribe to account-list changes. Dropping the receiver ends the
    /// subscription.
    fn subscribe_accounts(&self) -> mpsc::UnboundedReceiver<Vec<Address>>;

    /// Subscribe to active-chain changes. Dropping the receiver ends the
    /// subscription.
    fn subscribe_chain(&self) -> mpsc::UnboundedReceiver<u64>;
}

/// Poll for a receipt until `timeout` elapses.
///
/// Returns `Ok(None)` when the deadline passes without inclusion; the
/// transaction may still land later.
pub async fn await_receipt(
    provider: &dyn WalletProvider,
    hash: B256,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Option<TxReceipt>, ProviderError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(receipt) = provider.get_receipt(hash).await? {
            return Ok(Some(receipt));
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(poll_interval).await;
    }
}
