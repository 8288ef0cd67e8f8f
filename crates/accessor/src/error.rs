//! Accessor error types.

use thiserror::Error;
use tokyo_channel::ChannelError;

/// Errors surfaced synchronously to accessor callers.
///
/// Remote failures never appear here; they are recorded on the accessor and
/// announced through the `error` topic instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
	/// The strategy produced more than one request for a single mutation.
	#[error("strategy produced {count} requests; one request per mutation is supported")]
	UnsupportedMultiRequest {
		/// Number of requests the strategy produced.
		count: usize,
	},
	/// The outbound half of the channel failed.
	#[error(transparent)]
	Channel(#[from] ChannelError),
	/// A request could not be serialized into a cache key.
	#[error("failed to derive cache key: {0}")]
	CacheKey(#[from] serde_json::Error),
}

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
