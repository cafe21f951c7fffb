//! Persistent storage for deployed-contract records

mod registry;

pub use registry::{ContractRegistry, StoreError, SCHEMA_VERSION};
