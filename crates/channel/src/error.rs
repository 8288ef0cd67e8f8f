//! Channel error types.

use thiserror::Error;

/// Errors raised by channel sources and their halves.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChannelError {
	/// The other end of the channel went away.
	#[error("channel closed")]
	Closed,
	/// The source already handed out its stream pair.
	#[error("channel stream already taken")]
	AlreadyTaken,
	/// Input/output errors from the underlying byte stream.
	#[error("channel i/o: {0}")]
	Io(#[from] std::io::Error),
	/// A frame could not be encoded or decoded.
	#[error("channel codec: {0}")]
	Codec(#[from] serde_json::Error),
	/// An inbound line exceeded the frame length limit and was discarded.
	#[error("channel frame longer than {limit} bytes")]
	FrameTooLong {
		/// Limit in bytes.
		limit: usize,
	},
}

/// Result type for channel operations.
pub type Result<T, E = ChannelError> = std::result::Result<T, E>;
