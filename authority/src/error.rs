use govlock_types::{Address, Selector};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{caller} may not call {selector} on the registry")]
    Unauthorized { caller: Address, selector: Selector },

    #[error("capability {target}::{selector} is burned")]
    BurnedCapability { target: Address, selector: Selector },

    #[error("registry has no function with selector {0}")]
    UnknownFunction(Selector),

    #[error("malformed registry call: {0}")]
    Codec(#[from] govlock_codec::CodecError),
}
