//! Channel source over an async byte stream pair.

use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tokyo_proto::{RequestMessage, ResponseMessage};
use tokyo_worker::{TaskClass, TaskGuard, TaskToken};

use crate::codec::{read_frame, write_frame};
use crate::source::{ChannelSource, Inbound, Outbound};
use crate::{ChannelError, Result};

/// Channel source framing messages as newline-delimited JSON.
///
/// Two pump tasks move frames between the byte stream and the message
/// halves. Dropping the source stops both pumps, so keep it alive for as
/// long as the accessor bound to it.
#[derive(Debug)]
pub struct IoSource {
	halves: Mutex<Option<(Inbound, Outbound)>>,
	token: TaskToken,
	_guard: TaskGuard,
}

impl IoSource {
	/// Starts the pumps for `reader`/`writer`.
	///
	/// `capacity` bounds the queued messages in each direction.
	pub fn new<R, W>(reader: R, writer: W, capacity: usize) -> Self
	where
		R: AsyncBufRead + Unpin + Send + 'static,
		W: AsyncWrite + Unpin + Send + 'static,
	{
		let token = TaskToken::new();
		let (req_tx, req_rx) = mpsc::channel(capacity.max(1));
		let (resp_tx, resp_rx) = mpsc::channel(capacity.max(1));

		tokyo_worker::spawn(TaskClass::ChannelIo, read_pump(reader, resp_tx, token.child()));
		tokyo_worker::spawn(TaskClass::ChannelIo, write_pump(writer, req_rx, token.child()));

		Self {
			halves: Mutex::new(Some((Inbound::new(resp_rx), Outbound::new(req_tx)))),
			_guard: token.guard(),
			token,
		}
	}

	/// Stops both pumps. The inbound half ends and outbound sends fail.
	pub fn close(&self) {
		self.token.cancel();
	}
}

impl ChannelSource for IoSource {
	fn stream(&self) -> Result<(Inbound, Outbound)> {
		self.halves.lock().take().ok_or(ChannelError::AlreadyTaken)
	}
}

async fn read_pump<R>(mut reader: R, tx: mpsc::Sender<ResponseMessage>, token: TaskToken)
where
	R: AsyncBufRead + Unpin,
{
	let mut buf = Vec::new();
	loop {
		let frame = tokio::select! {
			_ = token.cancelled() => break,
			frame = read_frame::<ResponseMessage, _>(&mut reader, &mut buf) => frame,
		};
		match frame {
			Ok(Some(msg)) => {
				if tx.send(msg).await.is_err() {
					tracing::debug!("channel.io.inbound_dropped");
					break;
				}
			}
			Ok(None) => {
				tracing::debug!("channel.io.eof");
				break;
			}
			Err(e @ (ChannelError::Codec(_) | ChannelError::FrameTooLong { .. })) => {
				tracing::warn!(error = %e, "channel.io.malformed");
			}
			Err(e) => {
				tracing::error!(error = %e, "channel.io.read_failed");
				break;
			}
		}
	}
}

async fn write_pump<W>(mut writer: W, mut rx: mpsc::Receiver<RequestMessage>, token: TaskToken)
where
	W: AsyncWrite + Unpin,
{
	loop {
		let msg = tokio::select! {
			_ = token.cancelled() => break,
			msg = rx.recv() => match msg {
				Some(msg) => msg,
				None => break,
			},
		};
		if let Err(e) = write_frame(&mut writer, &msg).await {
			// Dropping `rx` here makes later sends report `Closed`.
			tracing::error!(error = %e, nonce = %msg.nonce, "channel.io.write_failed");
			break;
		}
	}
}
