//! Sequential decode → cache-write → notify consumer of the inbound stream.

use std::sync::Arc;

use parking_lot::Mutex;
use tokyo_channel::Inbound;
use tokyo_proto::{RemoteError, ResponseMessage};
use tokyo_worker::TaskToken;
use tracing::{debug, trace, warn};

use crate::events::{Dispatcher, Event};
use crate::state::AccessorState;
use crate::strategy::Strategy;

/// State shared between the accessor handle and its pipeline task.
pub(crate) struct Shared<S: Strategy> {
	pub name: String,
	pub strategy: S,
	pub state: Mutex<AccessorState<S::Cache>>,
	pub events: Dispatcher<S::View>,
}

impl<S: Strategy> Shared<S> {
	/// Derives the current view from the cache.
	pub fn view(&self) -> S::View {
		let state = self.state.lock();
		self.strategy.filter(state.slots(), state.params())
	}

	/// Runs one message through all three stages.
	///
	/// Shared state is only touched after the decode await, in a single
	/// critical section, so a cancelled decode leaves no trace.
	async fn process(&self, msg: ResponseMessage) {
		if msg.is_error() {
			self.on_remote_error(msg);
			return;
		}

		let params = self.state.lock().params().clone();
		let decoded = self.strategy.handle_message(&msg, &params).await;

		// Declined messages (acks, foreign kinds) leave correlation untouched.
		let Some(value) = decoded else {
			trace!(accessor = %self.name, nonce = %msg.nonce, kind = %msg.kind, "pipeline.decode_dropped");
			return;
		};

		let notify = {
			let mut state = self.state.lock();
			state
				.apply_value(&msg.nonce, value)
				.map(|_| (self.strategy.filter(state.slots(), state.params()), state.pending()))
		};
		let Some((view, pending)) = notify else {
			debug!(accessor = %self.name, nonce = %msg.nonce, "pipeline.stale");
			return;
		};

		trace!(accessor = %self.name, nonce = %msg.nonce, pending, "pipeline.cached");
		self.events.emit(&Event::Data(view));
		self.events.emit(&Event::Pending(pending));
	}

	fn on_remote_error(&self, msg: ResponseMessage) {
		let error = msg
			.error
			.unwrap_or_else(|| RemoteError::new(format!("remote error for nonce {}", msg.nonce)));
		warn!(accessor = %self.name, nonce = %msg.nonce, error = %error, "pipeline.remote_error");

		let pending = {
			let mut state = self.state.lock();
			state.apply_error(&msg.nonce, error).map(|_| state.pending())
		};
		let Some(pending) = pending else {
			debug!(accessor = %self.name, nonce = %msg.nonce, "pipeline.stale_error");
			return;
		};

		self.events.emit(&Event::Error);
		self.events.emit(&Event::Pending(pending));
	}
}

/// Drains `inbound` until it ends or `token` is cancelled.
///
/// One message is fully processed, including an asynchronous decode, before
/// the next one is pulled.
pub(crate) async fn run<S: Strategy>(shared: Arc<Shared<S>>, mut inbound: Inbound, token: TaskToken) {
	loop {
		let msg = tokio::select! {
			biased;
			_ = token.cancelled() => break,
			msg = inbound.recv() => match msg {
				Some(msg) => msg,
				None => {
					debug!(accessor = %shared.name, "pipeline.inbound_closed");
					break;
				}
			},
		};

		tokio::select! {
			biased;
			_ = token.cancelled() => break,
			_ = shared.process(msg) => {}
		}
	}
	trace!(accessor = %shared.name, "pipeline.stopped");
}
