//! Correlating, caching data accessor.
//!
//! An [`Accessor`] sits on top of an already connected [`ChannelSource`] and a
//! use-case specific [`Strategy`]:
//!
//! * Query mutations become at most one request each, de-duplicated by a
//!   [`CacheKey`] per correlation identifier (nonce).
//! * Param mutations never touch the network; they re-filter cached data.
//! * Responses flow through a sequential decode → cache-write → notify
//!   pipeline, strictly in arrival order.
//! * Observers subscribe to the `data`, `pending`, `error` and `request`
//!   [`Topic`]s.
//!
//! ```ignore
//! let (source, peer) = LocalSource::pair(32);
//! let accessor = Accessor::new(&source, LocationsStrategy)?;
//! let _sub = accessor.on_data(|locations| println!("{locations:?}"));
//! accessor.set_query(Query::new()).await?;
//! ```
//!
//! [`ChannelSource`]: tokyo_channel::ChannelSource

#![warn(missing_docs)]

mod accessor;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
mod pipeline;
mod state;
pub mod strategy;

pub use accessor::Accessor;
pub use cache::{CacheKey, CacheSlots};
pub use config::{AccessorConfig, ConfigError};
pub use error::{Error, Result};
pub use events::{Dispatcher, Event, Subscription, Topic};
pub use strategy::{RequestPlan, Strategy};
