//! Infrastructure layer - external integrations
//!
//! This layer contains:
//! - The wallet provider capability interface and its JSON-RPC binding
//! - The compiled-artifact loader

pub mod artifacts;
pub mod wallet;

pub use artifacts::{Artifact, ArtifactSet};
pub use wallet::{FeeData, ProviderError, TxReceipt, WalletProvider};
