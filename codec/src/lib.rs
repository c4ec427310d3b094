//! Deterministic operation ids and call payloads.
//!
//! - [`abi`]: 32-byte word head/tail encoding of typed [`Token`]s
//! - [`signature`]: canonical function signatures, selectors, call payloads
//! - [`operation`]: the `(target, value, payload)` triple and its id hashing

pub mod abi;
pub mod error;
pub mod operation;
pub mod signature;

pub use abi::{decode, encode, ParamType, Token};
pub use error::CodecError;
pub use operation::{hash_operation, hash_operation_batch, OperationCall};
pub use signature::{decode_call, encode_call, split_payload, FunctionSignature};
