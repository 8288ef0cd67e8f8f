//! In-process channel source.

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokyo_proto::{RequestMessage, ResponseMessage};

use crate::source::{ChannelSource, Inbound, Outbound};
use crate::{ChannelError, Result};

/// Channel source backed by bounded in-process channels.
#[derive(Debug)]
pub struct LocalSource {
	halves: Mutex<Option<(Inbound, Outbound)>>,
}

impl LocalSource {
	/// Creates a source and the backend peer answering it.
	///
	/// `capacity` bounds both directions; writers wait once it is reached.
	#[must_use]
	pub fn pair(capacity: usize) -> (Self, LocalPeer) {
		let (req_tx, req_rx) = mpsc::channel(capacity.max(1));
		let (resp_tx, resp_rx) = mpsc::channel(capacity.max(1));
		let source = Self {
			halves: Mutex::new(Some((Inbound::new(resp_rx), Outbound::new(req_tx)))),
		};
		let peer = LocalPeer {
			requests: req_rx,
			responder: Responder { tx: resp_tx },
		};
		(source, peer)
	}
}

impl ChannelSource for LocalSource {
	fn stream(&self) -> Result<(Inbound, Outbound)> {
		self.halves.lock().take().ok_or(ChannelError::AlreadyTaken)
	}
}

/// Backend end of a [`LocalSource`].
#[derive(Debug)]
pub struct LocalPeer {
	requests: mpsc::Receiver<RequestMessage>,
	responder: Responder,
}

impl LocalPeer {
	/// Waits for the next request.
	pub async fn recv_request(&mut self) -> Option<RequestMessage> {
		self.requests.recv().await
	}

	/// Returns an already written request without waiting.
	pub fn try_recv_request(&mut self) -> Option<RequestMessage> {
		match self.requests.try_recv() {
			Ok(req) => Some(req),
			Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
		}
	}

	/// Drains every request written so far.
	pub fn drain_requests(&mut self) -> Vec<RequestMessage> {
		std::iter::from_fn(|| self.try_recv_request()).collect()
	}

	/// Sends a response to the accessor side.
	///
	/// # Errors
	///
	/// Returns [`ChannelError::Closed`] when the inbound stream was dropped.
	pub async fn respond(&self, resp: ResponseMessage) -> Result<()> {
		self.responder.send(resp).await
	}

	/// Splits into the request receiver and a response handle.
	#[must_use]
	pub fn split(self) -> (mpsc::Receiver<RequestMessage>, Responder) {
		(self.requests, self.responder)
	}
}

/// Cloneable handle sending responses into a [`LocalSource`].
#[derive(Debug, Clone)]
pub struct Responder {
	tx: mpsc::Sender<ResponseMessage>,
}

impl Responder {
	/// Sends a response.
	///
	/// # Errors
	///
	/// Returns [`ChannelError::Closed`] when the inbound stream was dropped.
	pub async fn send(&self, resp: ResponseMessage) -> Result<()> {
		self.tx.send(resp).await.map_err(|_| ChannelError::Closed)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[tokio::test]
	async fn pair_round_trips_messages() {
		let (source, mut peer) = LocalSource::pair(4);
		let (mut inbound, outbound) = source.stream().unwrap();

		outbound.send(RequestMessage::new("list").with_nonce(1u64)).await.unwrap();
		let req = peer.recv_request().await.unwrap();
		assert_eq!(req.kind.to_string(), "list");

		peer.respond(ResponseMessage::ok("list", req.nonce, serde_json::json!(["x"]))).await.unwrap();
		let resp = inbound.recv().await.unwrap();
		assert_eq!(resp.payload, Some(serde_json::json!(["x"])));
	}

	#[test]
	fn stream_is_handed_out_once() {
		let (source, _peer) = LocalSource::pair(1);
		assert!(source.stream().is_ok());
		assert!(matches!(source.stream(), Err(ChannelError::AlreadyTaken)));
	}

	#[tokio::test]
	async fn send_fails_once_peer_is_gone() {
		let (source, peer) = LocalSource::pair(1);
		let (_inbound, outbound) = source.stream().unwrap();
		drop(peer);
		assert!(outbound.is_closed());
		assert!(matches!(outbound.send(RequestMessage::new("list")).await, Err(ChannelError::Closed)));
	}

	#[tokio::test]
	async fn drain_collects_pending_requests() {
		let (source, mut peer) = LocalSource::pair(4);
		let (_inbound, outbound) = source.stream().unwrap();
		outbound.send(RequestMessage::new("a")).await.unwrap();
		outbound.send(RequestMessage::new("b")).await.unwrap();
		let kinds: Vec<_> = peer.drain_requests().into_iter().map(|r| r.kind.to_string()).collect();
		assert_eq!(kinds, vec!["a", "b"]);
		assert!(peer.drain_requests().is_empty());
	}
}
