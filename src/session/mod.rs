//! Wallet session - owns the connection to one wallet provider
//!
//! At most one (account, chain, signer) triple is active per process. The
//! session is transient: rebuilt on every connect, torn down entirely on
//! disconnect or when the wallet reports an empty account list. A chain
//! change is fatal to cached state - a stale signer bound to the old chain
//! risks broadcasting on the wrong network, so the session drops everything
//! and the caller reconnects.

use std::fmt;
use std::sync::Arc;

use alloy::rpc::types::TransactionRequest;
use alloy_primitives::{Address, B256};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::infrastructure::wallet::{ProviderError, WalletProvider};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no wallet provider available")]
    ProviderUnavailable,

    #[error("connection rejected by user")]
    UserRejected,

    #[error("failed to connect wallet: {0}")]
    ConnectionFailed(String),

    #[error("wallet is not connected")]
    NotConnected,
}

/// Connected-state snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub account: Address,
    pub chain_id: u64,
}

/// Lifecycle notifications produced while draining provider events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Account list changed and the session re-connected in place
    Reconnected,
    /// Account list became empty (or reconnect failed); session torn down
    Disconnected,
    /// Wallet moved to another chain; cached state dropped, rebuild required
    ChainChanged(u64),
}

/// Transaction-signing capability bound to one account.
///
/// A `Signer` is a cheap clone of the provider handle plus the captured
/// account and chain; an invocation that is already in flight when the
/// session changes completes against its captured signer.
#[derive(Clone)]
pub struct Signer {
    provider: Arc<dyn WalletProvider>,
    account: Address,
    chain_id: u64,
}

impl Signer {
    pub fn new(provider: Arc<dyn WalletProvider>, account: Address, chain_id: u64) -> Self {
        Self {
            provider,
            account,
            chain_id,
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn provider(&self) -> &dyn WalletProvider {
        self.provider.as_ref()
    }

    /// Submit a transaction from the bound account
    pub async fn send(&self, mut request: TransactionRequest) -> Result<B256, ProviderError> {
        request.from = Some(self.account);
        self.provider.sign_and_send(request).await
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("account", &self.account)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

pub struct WalletSession {
    provider: Arc<dyn WalletProvider>,
    state: Option<SessionState>,
    accounts_rx: mpsc::UnboundedReceiver<Vec<Address>>,
    chain_rx: mpsc::UnboundedReceiver<u64>,
}

impl WalletSession {
    /// Wrap a provider and take the two change subscriptions for the
    /// lifetime of the session.
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        let accounts_rx = provider.subscribe_accounts();
        let chain_rx = provider.subscribe_chain();
        Self {
            provider,
            state: None,
            accounts_rx,
            chain_rx,
        }
    }

    /// Ask the wallet for authorization and cache account + active chain.
    pub async fn connect(&mut self) -> Result<SessionState, SessionError> {
        let accounts = self
            .provider
            .request_accounts()
            .await
            .map_err(connect_error)?;

        let account = *accounts.first().ok_or(SessionError::ProviderUnavailable)?;
        let chain_id = self.provider.chain_id().await.map_err(connect_error)?;

        let state = SessionState { account, chain_id };
        self.state = Some(state);
        info!(account = %account, chain_id, "wallet connected");
        Ok(state)
    }

    /// Clear all session state. Idempotent; no automatic reconnection is
    /// attempted afterwards.
    pub fn disconnect(&mut self) {
        if self.state.take().is_some() {
            info!("wallet disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<SessionState> {
        self.state
    }

    pub fn account(&self) -> Result<Address, SessionError> {
        self.state
            .map(|state| state.account)
            .ok_or(SessionError::NotConnected)
    }

    pub fn chain_id(&self) -> Result<u64, SessionError> {
        self.state
            .map(|state| state.chain_id)
            .ok_or(SessionError::NotConnected)
    }

    /// The signing capability for the current connection
    pub fn signer(&self) -> Result<Signer, SessionError> {
        let state = self.state.ok_or(SessionError::NotConnected)?;
        Ok(Signer::new(
            Arc::clone(&self.provider),
            state.account,
            state.chain_id,
        ))
    }

    pub fn provider(&self) -> &Arc<dyn WalletProvider> {
        &self.provider
    }

    /// Drain pending provider notifications and apply the lifecycle rules:
    /// a non-empty account list reconnects in place, an empty list
    /// disconnects, and a chain change drops all cached state.
    pub async fn process_events(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        // Only the latest account list matters when several queued up.
        let mut latest_accounts = None;
        while let Ok(accounts) = self.accounts_rx.try_recv() {
            latest_accounts = Some(accounts);
        }
        let mut latest_chain = None;
        while let Ok(chain_id) = self.chain_rx.try_recv() {
            latest_chain = Some(chain_id);
        }

        if let Some(accounts) = latest_accounts {
            if accounts.is_empty() {
                debug!("account list empty, tearing session down");
                self.disconnect();
                events.push(SessionEvent::Disconnected);
            } else {
                match self.connect().await {
                    Ok(_) => events.push(SessionEvent::Reconnected),
                    Err(err) => {
                        warn!(error = %err, "reconnect after account change failed");
                        self.disconnect();
                        events.push(SessionEvent::Disconnected);
                    }
                }
            }
        }

        if let Some(chain_id) = latest_chain {
            self.state = None;
            events.push(SessionEvent::ChainChanged(chain_id));
        }

        events
    }
}

fn connect_error(err: ProviderError) -> SessionError {
    match err {
        ProviderError::Unavailable => SessionError::ProviderUnavailable,
        ProviderError::UserRejected => SessionError::UserRejected,
        other => SessionError::ConnectionFailed(other.to_string()),
    }
}
