//! Key Module
//!
//! Derives canonical entry keys from call arguments.

mod args;
mod deriver;

pub use args::{BoundArgs, CallArgs, Param, Signature};
pub use deriver::{canonical_json, HashConfig, HashMode, KeyDeriver, KeyFn};
