//! Channel sources for tokyo accessors.
//!
//! A [`ChannelSource`] hands out one paired [`Inbound`] response stream and
//! [`Outbound`] request sink. The accessor layer sits on top of that pair and
//! never deals with transports directly.
//!
//! * [`LocalSource`]: in-process bounded channels, with a [`LocalPeer`] acting
//!   as the backend end.
//! * [`IoSource`]: newline-delimited JSON over any async byte stream pair.

#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod io;
pub mod local;
pub mod source;

pub use error::{ChannelError, Result};
pub use io::IoSource;
pub use local::{LocalPeer, LocalSource, Responder};
pub use source::{ChannelSource, Inbound, Outbound};
