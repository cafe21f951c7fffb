pub mod abi;
pub mod chain;
pub mod contract;

pub use abi::{constructor_inputs, resolve_function, FunctionKind, FunctionLookupError};
pub use chain::{ChainDescriptor, ChainRegistry};
pub use contract::{ContractStore, DeployedContractRecord};
