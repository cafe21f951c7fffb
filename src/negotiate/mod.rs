//! Chain negotiation - reconcile the wallet's active chain with a target
//!
//! State machine over {Aligned, Mismatched, Switching, Adding, Failed}.
//! A mismatch asks the wallet to switch; a wallet that does not know the
//! chain gets the full connection parameters through an add-chain handshake
//! and exactly one switch retry. Everything else fails with the provider's
//! message kept verbatim. The negotiator never proceeds silently on a chain
//! other than the target.

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::ChainRegistry;
use crate::infrastructure::wallet::{ProviderError, WalletProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Aligned,
    Mismatched,
    Switching,
    Adding,
    Failed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NegotiateError {
    /// The target chain is not in the application's catalog; no wallet
    /// request is made for it.
    #[error("chain {0} is not supported by this application")]
    UnsupportedChain(u64),

    #[error("chain switch failed: {0}")]
    SwitchFailed(String),
}

pub struct ChainNegotiator<'a> {
    provider: &'a dyn WalletProvider,
    chains: &'a ChainRegistry,
    history: Vec<NegotiationState>,
}

impl<'a> ChainNegotiator<'a> {
    pub fn new(provider: &'a dyn WalletProvider, chains: &'a ChainRegistry) -> Self {
        Self {
            provider,
            chains,
            history: Vec::new(),
        }
    }

    /// Every state entered during the last `negotiate` call, in order.
    pub fn history(&self) -> &[NegotiationState] {
        &self.history
    }

    /// Drive the wallet toward `target`. On success the wallet confirms the
    /// switch and the session is expected to be rebuilt by the chain-change
    /// notification it emits.
    pub async fn negotiate(
        &mut self,
        current_chain: u64,
        target: u64,
    ) -> Result<NegotiationState, NegotiateError> {
        self.history.clear();

        if current_chain == target {
            self.enter(NegotiationState::Aligned);
            return Ok(NegotiationState::Aligned);
        }
        self.enter(NegotiationState::Mismatched);

        let Some(descriptor) = self.chains.get(target) else {
            self.enter(NegotiationState::Failed);
            return Err(NegotiateError::UnsupportedChain(target));
        };

        self.enter(NegotiationState::Switching);
        match self.provider.switch_chain(target).await {
            Ok(()) => {
                self.enter(NegotiationState::Aligned);
                info!(target, "wallet switched chain");
                Ok(NegotiationState::Aligned)
            }
            Err(ProviderError::UnknownChain(_)) => {
                debug!(target, "wallet does not know the chain, registering it");
                self.enter(NegotiationState::Adding);
                if let Err(err) = self.provider.add_chain(descriptor).await {
                    self.enter(NegotiationState::Failed);
                    return Err(NegotiateError::SwitchFailed(verbatim(err)));
                }

                // One retry after registration; a second failure of any kind
                // terminates without looping.
                self.enter(NegotiationState::Switching);
                match self.provider.switch_chain(target).await {
                    Ok(()) => {
                        self.enter(NegotiationState::Aligned);
                        info!(target, "wallet switched chain after registration");
                        Ok(NegotiationState::Aligned)
                    }
                    Err(err) => {
                        self.enter(NegotiationState::Failed);
                        Err(NegotiateError::SwitchFailed(verbatim(err)))
                    }
                }
            }
            Err(err) => {
                self.enter(NegotiationState::Failed);
                Err(NegotiateError::SwitchFailed(verbatim(err)))
            }
        }
    }

    fn enter(&mut self, state: NegotiationState) {
        self.history.push(state);
    }
}

/// The provider's own message, not a rewording
fn verbatim(err: ProviderError) -> String {
    match err {
        ProviderError::Rpc(message) => message,
        other => other.to_string(),
    }
}
