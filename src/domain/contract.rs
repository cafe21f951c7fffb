//! Deployed-contract records and the per-deployer/per-chain store aggregate

use std::collections::BTreeMap;

use alloy_primitives::Address;
use alloy_json_abi::JsonAbi;
use serde::{Deserialize, Serialize};

/// One deployment a user made: where it lives, what it is called, and the
/// ABI needed to talk to it.
///
/// The ABI is immutable once stored; re-deploying the same logic produces a
/// new record, never an in-place update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployedContractRecord {
    pub address: Address,
    pub name: String,
    pub abi: JsonAbi,
    pub chain_id: u64,
    pub deployer: Address,
    /// Unix timestamp (seconds) of the deployment
    pub deployed_at: i64,
}

/// In-memory aggregate: deployer -> chain id -> records, most-recent-first.
///
/// Every record's embedded deployer/chain fields match its position in the
/// maps; `add` keys off the record itself so the invariant holds by
/// construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractStore {
    deployers: BTreeMap<Address, BTreeMap<u64, Vec<DeployedContractRecord>>>,
}

impl ContractStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the head of the (deployer, chain) bucket.
    ///
    /// Never deduplicates by address: detecting re-deployment to the same
    /// address (deterministic-deployment chains) is out of scope.
    pub fn add(&mut self, record: DeployedContractRecord) {
        self.deployers
            .entry(record.deployer)
            .or_default()
            .entry(record.chain_id)
            .or_default()
            .insert(0, record);
    }

    /// Remove the first record matching (deployer, chain, address).
    ///
    /// Returns whether a record was removed. Empty chain buckets and empty
    /// deployer entries are pruned so no dead keys linger.
    pub fn remove(&mut self, deployer: Address, chain_id: u64, address: Address) -> bool {
        let Some(chains) = self.deployers.get_mut(&deployer) else {
            return false;
        };
        let Some(records) = chains.get_mut(&chain_id) else {
            return false;
        };
        let Some(position) = records.iter().position(|record| record.address == address) else {
            return false;
        };

        records.remove(position);
        if records.is_empty() {
            chains.remove(&chain_id);
        }
        if chains.is_empty() {
            self.deployers.remove(&deployer);
        }
        true
    }

    /// Records for one deployer, optionally filtered to one chain.
    ///
    /// Per chain the order is most-recent-first; with the chain omitted, the
    /// deployer's chains are concatenated in chain-id order.
    pub fn list(&self, deployer: Address, chain_id: Option<u64>) -> Vec<&DeployedContractRecord> {
        let Some(chains) = self.deployers.get(&deployer) else {
            return Vec::new();
        };
        match chain_id {
            Some(chain_id) => chains
                .get(&chain_id)
                .map(|records| records.iter().collect())
                .unwrap_or_default(),
            None => chains.values().flatten().collect(),
        }
    }

    /// Look up a single record by (deployer, chain, address)
    pub fn find(
        &self,
        deployer: Address,
        chain_id: u64,
        address: Address,
    ) -> Option<&DeployedContractRecord> {
        self.deployers
            .get(&deployer)?
            .get(&chain_id)?
            .iter()
            .find(|record| record.address == address)
    }

    pub fn is_empty(&self) -> bool {
        self.deployers.is_empty()
    }

    /// Total record count across all deployers and chains
    pub fn record_count(&self) -> usize {
        self.deployers
            .values()
            .flat_map(|chains| chains.values())
            .map(Vec::len)
            .sum()
    }

    /// Deployers with at least one record
    pub fn deployers(&self) -> impl Iterator<Item = &Address> {
        self.deployers.keys()
    }
}
