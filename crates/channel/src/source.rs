//! The channel source boundary.

use tokio::sync::mpsc;
use tokyo_proto::{RequestMessage, ResponseMessage};

use crate::{ChannelError, Result};

/// Supplies the paired response stream and request sink an accessor binds to.
///
/// The pair is established once; reconnecting or swapping a live source is
/// not supported. A source may front one or several backend endpoints.
pub trait ChannelSource {
	/// Hands out the inbound/outbound pair.
	///
	/// # Errors
	///
	/// Returns [`ChannelError::AlreadyTaken`] when the pair was handed out
	/// before.
	fn stream(&self) -> Result<(Inbound, Outbound)>;
}

/// Inbound stream of responses, consumed in arrival order.
#[derive(Debug)]
pub struct Inbound {
	rx: mpsc::Receiver<ResponseMessage>,
}

impl Inbound {
	/// Wraps a raw receiver.
	#[must_use]
	pub fn new(rx: mpsc::Receiver<ResponseMessage>) -> Self {
		Self { rx }
	}

	/// Pulls the next response, or `None` once the stream ended.
	pub async fn recv(&mut self) -> Option<ResponseMessage> {
		self.rx.recv().await
	}
}

/// Outbound sink of requests.
///
/// Sending waits for capacity, so a slow consumer applies flow control to
/// writers.
#[derive(Debug, Clone)]
pub struct Outbound {
	tx: mpsc::Sender<RequestMessage>,
}

impl Outbound {
	/// Wraps a raw sender.
	#[must_use]
	pub fn new(tx: mpsc::Sender<RequestMessage>) -> Self {
		Self { tx }
	}

	/// Writes one request.
	///
	/// # Errors
	///
	/// Returns [`ChannelError::Closed`] when the receiving end is gone.
	pub async fn send(&self, msg: RequestMessage) -> Result<()> {
		self.tx.send(msg).await.map_err(|_| ChannelError::Closed)
	}

	/// Returns true once the receiving end is gone.
	#[must_use]
	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}
}
