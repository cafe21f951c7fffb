//! ABI fragment model - classification and named-function resolution

use alloy_json_abi::{Function, JsonAbi, Param, StateMutability};
use thiserror::Error;

/// Invocation mode of a function fragment.
///
/// This is the primary dispatch key: `Read` fragments are executed as
/// state-read calls, `Write` fragments as signed transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// pure / view - no state change, result returned synchronously
    Read,
    /// nonpayable / payable - state change, requires a transaction
    Write,
}

impl FunctionKind {
    pub fn of(function: &Function) -> Self {
        match function.state_mutability {
            StateMutability::Pure | StateMutability::View => FunctionKind::Read,
            StateMutability::NonPayable | StateMutability::Payable => FunctionKind::Write,
        }
    }

    pub fn is_write(self) -> bool {
        matches!(self, FunctionKind::Write)
    }
}

/// Why a named function could not be resolved against an ABI
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FunctionLookupError {
    #[error("function '{0}' not found in contract ABI")]
    NotFound(String),

    /// Overload resolution by argument arity/type is out of scope; more than
    /// one fragment sharing the name is surfaced instead of guessed at.
    #[error("function '{name}' has {count} overloads; overloaded calls are not supported")]
    Ambiguous { name: String, count: usize },
}

/// Resolve a function fragment by name.
///
/// Exactly one fragment must carry the name; zero is `NotFound`, more than
/// one is `Ambiguous`.
pub fn resolve_function<'a>(
    abi: &'a JsonAbi,
    name: &str,
) -> Result<&'a Function, FunctionLookupError> {
    let overloads = abi
        .function(name)
        .filter(|fragments| !fragments.is_empty())
        .ok_or_else(|| FunctionLookupError::NotFound(name.to_string()))?;

    if overloads.len() > 1 {
        return Err(FunctionLookupError::Ambiguous {
            name: name.to_string(),
            count: overloads.len(),
        });
    }

    Ok(&overloads[0])
}

/// Constructor parameter list; an absent constructor implies zero arguments.
pub fn constructor_inputs(abi: &JsonAbi) -> &[Param] {
    abi.constructor
        .as_ref()
        .map(|constructor| constructor.inputs.as_slice())
        .unwrap_or_default()
}
