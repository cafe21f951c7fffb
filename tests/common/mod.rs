//! Shared mock wallet provider for component tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use alloy::rpc::types::TransactionRequest;
use alloy_primitives::{address, keccak256, Address, Bytes, TxKind, B256, U256};
use tokio::sync::mpsc;

use conjure::domain::ChainDescriptor;
use conjure::infrastructure::wallet::{FeeData, ProviderError, TxReceipt, WalletProvider};

pub const ALICE: Address = address!("00000000000000000000000000000000000a11ce");
pub const BOB: Address = address!("0000000000000000000000000000000000000b0b");
pub const CONTRACT: Address = address!("00000000000000000000000000000000000c0de0");
pub const RECIPIENT: Address = address!("5244361b12ed6716b3ad9ba46dd23252a72d22c7");

/// Programmable provider state plus a log of every observed interaction
pub struct MockState {
    pub accounts: Vec<Address>,
    pub chain_id: u64,
    pub unavailable: bool,
    pub user_rejects: bool,

    pub balances: HashMap<Address, U256>,
    pub gas_estimate: u64,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,

    /// Canned eth_call responses keyed by 4-byte selector
    pub call_responses: HashMap<[u8; 4], Bytes>,
    /// When set, every call fails with this message
    pub call_failure: Option<String>,
    /// When set, every submission fails with this message
    pub send_failure: Option<String>,
    /// Receipts report a revert
    pub revert_receipts: bool,
    /// Receipts are never produced (transaction never confirms)
    pub withhold_receipts: bool,
    /// Contract address stamped on creation receipts
    pub next_contract_address: Option<Address>,

    pub chains_known: Vec<u64>,
    pub accept_add_chain: bool,
    /// Whether a successful add_chain actually registers the chain
    pub register_on_add: bool,
    /// When set, switch_chain fails with this message instead of 4902
    pub switch_failure: Option<String>,

    // observed interactions
    pub sent: Vec<TransactionRequest>,
    pub calls: Vec<TransactionRequest>,
    pub gas_requests: Vec<TransactionRequest>,
    pub switch_requests: Vec<u64>,
    pub added_chains: Vec<ChainDescriptor>,
    pub receipts: HashMap<B256, TxReceipt>,

    tx_counter: u64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            accounts: vec![ALICE],
            chain_id: 31337,
            unavailable: false,
            user_rejects: false,
            balances: HashMap::new(),
            gas_estimate: 21_000,
            gas_price: Some(1_000_000_000),
            max_fee_per_gas: None,
            call_responses: HashMap::new(),
            call_failure: None,
            send_failure: None,
            revert_receipts: false,
            withhold_receipts: false,
            next_contract_address: Some(CONTRACT),
            chains_known: vec![31337],
            accept_add_chain: true,
            register_on_add: true,
            switch_failure: None,
            sent: Vec::new(),
            calls: Vec::new(),
            gas_requests: Vec::new(),
            switch_requests: Vec::new(),
            added_chains: Vec::new(),
            receipts: HashMap::new(),
            tx_counter: 0,
        }
    }
}

pub struct MockWallet {
    state: Mutex<MockState>,
    accounts_subscribers: Mutex<Vec<mpsc::UnboundedSender<Vec<Address>>>>,
    chain_subscribers: Mutex<Vec<mpsc::UnboundedSender<u64>>>,
}

impl MockWallet {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            accounts_subscribers: Mutex::new(Vec::new()),
            chain_subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Emit an accounts-changed notification
    pub fn push_accounts(&self, accounts: Vec<Address>) {
        for subscriber in self.accounts_subscribers.lock().unwrap().iter() {
            let _ = subscriber.send(accounts.clone());
        }
    }

    /// Emit a chain-changed notification
    pub fn push_chain(&self, chain_id: u64) {
        for subscriber in self.chain_subscribers.lock().unwrap().iter() {
            let _ = subscriber.send(chain_id);
        }
    }
}

fn is_creation(request: &TransactionRequest) -> bool {
    matches!(request.to, None | Some(TxKind::Create))
}

fn request_selector(request: &TransactionRequest) -> Option<[u8; 4]> {
    let input = request.input.input()?;
    if input.len() < 4 {
        return None;
    }
    Some([input[0], input[1], input[2], input[3]])
}

#[async_trait::async_trait]
impl WalletProvider for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let state = self.lock();
        if state.unavailable {
            return Err(ProviderError::Unavailable);
        }
        if state.user_rejects {
            return Err(ProviderError::UserRejected);
        }
        Ok(state.accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        Ok(self.lock().chain_id)
    }

    async fn get_balance(&self, address: Address) -> Result<U256, ProviderError> {
        Ok(self
            .lock()
            .balances
            .get(&address)
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn call(&self, request: TransactionRequest) -> Result<Bytes, ProviderError> {
        let mut state = self.lock();
        state.calls.push(request.clone());
        if let Some(message) = &state.call_failure {
            return Err(ProviderError::Rpc(message.clone()));
        }
        let response = request_selector(&request)
            .and_then(|selector| state.call_responses.get(&selector).cloned())
            .unwrap_or_default();
        Ok(response)
    }

    async fn estimate_gas(&self, request: TransactionRequest) -> Result<u64, ProviderError> {
        let mut state = self.lock();
        state.gas_requests.push(request);
        Ok(state.gas_estimate)
    }

    async fn fee_data(&self) -> Result<FeeData, ProviderError> {
        let state = self.lock();
        Ok(FeeData {
            gas_price: state.gas_price,
            max_fee_per_gas: state.max_fee_per_gas,
        })
    }

    async fn sign_and_send(&self, request: TransactionRequest) -> Result<B256, ProviderError> {
        let mut state = self.lock();
        if state.user_rejects {
            return Err(ProviderError::UserRejected);
        }
        if let Some(message) = &state.send_failure {
            return Err(ProviderError::Rpc(message.clone()));
        }

        state.tx_counter += 1;
        let tx_hash = keccak256(state.tx_counter.to_be_bytes());

        let contract_address = if is_creation(&request) {
            state.next_contract_address
        } else {
            None
        };
        state.sent.push(request);

        if !state.withhold_receipts {
            let success = !state.revert_receipts;
            let block_number = state.tx_counter;
            state.receipts.insert(
                tx_hash,
                TxReceipt {
                    transaction_hash: tx_hash,
                    success,
                    contract_address,
                    block_number,
                },
            );
        }
        Ok(tx_hash)
    }

    async fn get_receipt(&self, hash: B256) -> Result<Option<TxReceipt>, ProviderError> {
        Ok(self.lock().receipts.get(&hash).cloned())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        let mut state = self.lock();
        state.switch_requests.push(chain_id);
        if let Some(message) = &state.switch_failure {
            return Err(ProviderError::Rpc(message.clone()));
        }
        if state.chains_known.contains(&chain_id) {
            state.chain_id = chain_id;
            Ok(())
        } else {
            Err(ProviderError::UnknownChain(chain_id))
        }
    }

    async fn add_chain(&self, descriptor: &ChainDescriptor) -> Result<(), ProviderError> {
        let mut state = self.lock();
        if !state.accept_add_chain {
            return Err(ProviderError::Rpc("User rejected chain add".to_string()));
        }
        state.added_chains.push(descriptor.clone());
        if state.register_on_add {
            let id = descriptor.id;
            state.chains_known.push(id);
        }
        Ok(())
    }

    fn subscribe_accounts(&self) -> mpsc::UnboundedReceiver<Vec<Address>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.accounts_subscribers.lock().unwrap().push(tx);
        rx
    }

    fn subscribe_chain(&self) -> mpsc::UnboundedReceiver<u64> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.chain_subscribers.lock().unwrap().push(tx);
        rx
    }
}
