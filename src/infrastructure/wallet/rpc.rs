//! JSON-RPC wallet binding for unlocked dev nodes (Anvil/Hardhat style)
//!
//! The node holds the keys: account discovery goes through `eth_accounts`
//! and submission through `eth_sendTransaction`, so the node signs. Browser
//! wallet semantics (user prompts, chain registration) map onto the same
//! RPC methods where the node supports them; a dev node never pushes
//! account/chain notifications, so the subscription channels stay silent.

use std::sync::Mutex;

use alloy::network::Ethereum;
use alloy::providers::{
    fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
    Identity, Provider, ProviderBuilder, RootProvider,
};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::{RpcError, TransportErrorKind};
use alloy_primitives::{Address, Bytes, B256, U256};
use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::domain::ChainDescriptor;
use crate::infrastructure::wallet::{FeeData, ProviderError, TxReceipt, WalletProvider};

type HttpFillProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider,
    Ethereum,
>;

/// Wallet provider backed by an HTTP JSON-RPC node with unlocked accounts
pub struct RpcWallet {
    provider: HttpFillProvider,
    endpoint: String,
    accounts_subscribers: Mutex<Vec<mpsc::UnboundedSender<Vec<Address>>>>,
    chain_subscribers: Mutex<Vec<mpsc::UnboundedSender<u64>>>,
}

impl RpcWallet {
    pub fn new(endpoint: &str) -> Result<Self> {
        let rpc_url = endpoint.parse().context("Invalid HTTP URL")?;
        let provider = ProviderBuilder::new().connect_http(rpc_url);
        Ok(Self {
            provider,
            endpoint: endpoint.to_string(),
            accounts_subscribers: Mutex::new(Vec::new()),
            chain_subscribers: Mutex::new(Vec::new()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Map a transport-level error to the provider taxonomy.
///
/// EIP-1193 user rejection is code 4001, EIP-3326 unknown chain is 4902;
/// `chain_hint` supplies the chain id for the latter.
fn map_rpc_error(err: RpcError<TransportErrorKind>, chain_hint: Option<u64>) -> ProviderError {
    if let Some(payload) = err.as_error_resp() {
        return match payload.code {
            4001 => ProviderError::UserRejected,
            4902 => ProviderError::UnknownChain(chain_hint.unwrap_or_default()),
            _ => ProviderError::Rpc(format!("{}", payload.message)),
        };
    }
    if matches!(err, RpcError::Transport(_)) {
        return ProviderError::Unavailable;
    }
    ProviderError::Rpc(err.to_string())
}

#[async_trait::async_trait]
impl WalletProvider for RpcWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.provider
            .get_accounts()
            .await
            .map_err(|err| map_rpc_error(err, None))
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|err| map_rpc_error(err, None))
    }

    async fn get_balance(&self, address: Address) -> Result<U256, ProviderError> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|err| map_rpc_error(err, None))
    }

    async fn call(&self, request: TransactionRequest) -> Result<Bytes, ProviderError> {
        self.provider
            .call(request)
            .await
            .map_err(|err| map_rpc_error(err, None))
    }

    async fn estimate_gas(&self, request: TransactionRequest) -> Result<u64, ProviderError> {
        self.provider
            .estimate_gas(request)
            .await
            .map_err(|err| map_rpc_error(err, None))
    }

    async fn fee_data(&self) -> Result<FeeData, ProviderError> {
        // Legacy gas price and EIP-1559 estimates are both optional; a node
        // may support either, and the caller has its own final fallback.
        let gas_price = self.provider.get_gas_price().await.ok();
        let max_fee_per_gas = self
            .provider
            .estimate_eip1559_fees()
            .await
            .ok()
            .map(|estimate| estimate.max_fee_per_gas);
        Ok(FeeData {
            gas_price,
            max_fee_per_gas,
        })
    }

    async fn sign_and_send(&self, request: TransactionRequest) -> Result<B256, ProviderError> {
        // The node signs: unlocked-account submission via eth_sendTransaction
        self.provider
            .raw_request("eth_sendTransaction".into(), (request,))
            .await
            .map_err(|err| map_rpc_error(err, None))
    }

    async fn get_receipt(&self, hash: B256) -> Result<Option<TxReceipt>, ProviderError> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|err| map_rpc_error(err, None))?;

        Ok(receipt.map(|receipt| TxReceipt {
            transaction_hash: receipt.transaction_hash,
            success: receipt.status(),
            contract_address: receipt.contract_address,
            block_number: receipt.block_number.unwrap_or_default(),
        }))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        let params = serde_json::json!({ "chainId": format!("0x{chain_id:x}") });
        let _: serde_json::Value = self
            .provider
            .raw_request("wallet_switchEthereumChain".into(), (params,))
            .await
            .map_err(|err| map_rpc_error(err, Some(chain_id)))?;
        Ok(())
    }

    async fn add_chain(&self, descriptor: &ChainDescriptor) -> Result<(), ProviderError> {
        let params = serde_json::json!({
            "chainId": format!("0x{:x}", descriptor.id),
            "chainName": descriptor.name,
            "nativeCurrency": {
                "name": descriptor.symbol,
                "symbol": descriptor.symbol,
                "decimals": descriptor.decimals,
            },
            "rpcUrls": [descriptor.rpc_url],
            "blockExplorerUrls": descriptor
                .explorer_url
                .as_ref()
                .map(|url| vec![url.clone()])
                .unwrap_or_default(),
        });
        let _: serde_json::Value = self
            .provider
            .raw_request("wallet_addEthereumChain".into(), (params,))
            .await
            .map_err(|err| map_rpc_error(err, Some(descriptor.id)))?;
        Ok(())
    }

    fn subscribe_accounts(&self) -> mpsc::UnboundedReceiver<Vec<Address>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.accounts_subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .push(tx);
        rx
    }

    fn subscribe_chain(&self) -> mpsc::UnboundedReceiver<u64> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.chain_subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .push(tx);
        rx
    }
}
