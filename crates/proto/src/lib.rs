//! Wire types for the tokyo accessor protocol.
//!
//! Requests and responses are JSON objects carrying a `kind` tag and a `nonce`
//! correlation identifier. Everything kind-specific rides alongside in the same
//! object. The `"error"` kind is reserved for failure responses.

#![warn(missing_docs)]

pub mod message;
pub mod query;

pub use message::{Kind, Nonce, RemoteError, RequestMessage, ResponseMessage};
pub use query::{Params, Query, QueryValue};
