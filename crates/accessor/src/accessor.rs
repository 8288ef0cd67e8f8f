//! The public accessor handle.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tokyo_channel::{ChannelSource, Outbound};
use tokyo_proto::{Nonce, Params, Query, RemoteError, RequestMessage};
use tokyo_worker::{TaskClass, TaskGuard, TaskToken};
use tracing::{Instrument, debug, trace, warn};

use crate::Result;
use crate::config::AccessorConfig;
use crate::events::{Dispatcher, Event, Subscription, Topic};
use crate::pipeline::{self, Shared};
use crate::state::{AccessorState, Decision};
use crate::strategy::Strategy;

/// Turns query/params mutations into de-duplicated requests, caches decoded
/// responses and republishes changes to observers.
///
/// The accessor binds to a channel source once, at construction, and runs a
/// pipeline task draining the inbound stream until the accessor is closed or
/// dropped. It never closes the channel itself.
pub struct Accessor<S: Strategy> {
	shared: Arc<Shared<S>>,
	outbound: AsyncMutex<Outbound>,
	token: TaskToken,
	_guard: TaskGuard,
}

impl<S: Strategy> Accessor<S> {
	/// Binds `strategy` to `source` with the default configuration.
	///
	/// # Errors
	///
	/// Fails when the source cannot hand out its stream pair.
	pub fn new(source: &(impl ChannelSource + ?Sized), strategy: S) -> Result<Self> {
		Self::with_config(source, strategy, AccessorConfig::default())
	}

	/// Binds `strategy` to `source`.
	///
	/// # Errors
	///
	/// Fails when the source cannot hand out its stream pair.
	pub fn with_config(source: &(impl ChannelSource + ?Sized), strategy: S, config: AccessorConfig) -> Result<Self> {
		let (inbound, outbound) = source.stream()?;
		let shared = Arc::new(Shared {
			name: config.name,
			strategy,
			state: Mutex::new(AccessorState::new(config.discard_superseded)),
			events: Dispatcher::new(),
		});

		let token = TaskToken::new();
		let span = tracing::debug_span!("accessor.pipeline", accessor = %shared.name);
		tokyo_worker::spawn(
			TaskClass::Pipeline,
			pipeline::run(Arc::clone(&shared), inbound, token.child()).instrument(span),
		);

		Ok(Self {
			shared,
			outbound: AsyncMutex::new(outbound),
			_guard: token.guard(),
			token,
		})
	}

	/// Sets the query, sending a request when the fetch target changed.
	///
	/// Clears the recorded error first. When the request is unchanged but the
	/// query differs and data is cached, the view is re-filtered and `data`
	/// emitted without touching the network.
	///
	/// # Errors
	///
	/// - [`Error::UnsupportedMultiRequest`](crate::Error::UnsupportedMultiRequest)
	///   when the strategy produced several requests.
	/// - [`Error::Channel`](crate::Error::Channel) when the request could not be
	///   written; the dispatch is rolled back.
	pub async fn set_query(&self, query: Query) -> Result<()> {
		let outbound = self.outbound.lock().await;

		let decision = {
			let mut state = self.shared.state.lock();
			state.clear_error();
			let request = self.shared.strategy.create_request(&query, state.params()).into_single()?;
			state.evaluate_query(query.clone(), request)?
		};

		match decision {
			Decision::Dispatch { request, generation } => {
				debug!(
					accessor = %self.shared.name,
					nonce = %request.nonce,
					kind = %request.kind,
					generation,
					"accessor.dispatch"
				);
				self.shared.events.emit(&Event::Pending(true));

				let nonce = request.nonce.clone();
				if let Err(e) = outbound.send(request).await {
					warn!(accessor = %self.shared.name, nonce = %nonce, error = %e, "accessor.dispatch_failed");
					let pending = self.shared.state.lock().abandon(&nonce, generation);
					self.shared.events.emit(&Event::Pending(pending));
					return Err(e.into());
				}
				self.shared.events.emit(&Event::Request(query));
			}
			Decision::Refilter => {
				trace!(accessor = %self.shared.name, "accessor.refilter");
				self.shared.events.emit(&Event::Data(self.shared.view()));
			}
			Decision::Unchanged => {}
		}
		Ok(())
	}

	/// Sets the params. Never writes to the channel.
	///
	/// Clears the recorded error first. When data is cached and the params
	/// differ, the view is re-filtered and `data` emitted.
	///
	/// # Errors
	///
	/// Returns [`Error::UnsupportedMultiRequest`](crate::Error::UnsupportedMultiRequest)
	/// when the strategy produced several requests.
	pub fn set_params(&self, params: Params) -> Result<()> {
		let decision = {
			let mut state = self.shared.state.lock();
			state.clear_error();
			let request = self.shared.strategy.create_request(state.query(), &params).into_single()?;
			state.evaluate_params(params, request)?
		};

		if decision == Decision::Refilter {
			trace!(accessor = %self.shared.name, "accessor.refilter");
			self.shared.events.emit(&Event::Data(self.shared.view()));
		}
		Ok(())
	}

	/// Writes `message` as is, bypassing correlation and caching.
	///
	/// Shares the write lock with [`Accessor::set_query`], so writes never
	/// interleave.
	///
	/// # Errors
	///
	/// Returns [`Error::Channel`](crate::Error::Channel) when the write fails.
	pub async fn mutate(&self, message: RequestMessage) -> Result<()> {
		let outbound = self.outbound.lock().await;
		trace!(accessor = %self.shared.name, nonce = %message.nonce, kind = %message.kind, "accessor.mutate");
		outbound.send(message).await?;
		Ok(())
	}

	/// Recomputes the filtered view from the current cache.
	pub fn process_data(&self) -> S::View {
		self.shared.view()
	}

	/// Returns a copy of the value cached for `nonce`.
	pub fn cached(&self, nonce: &Nonce) -> Option<S::Cache>
	where
		S::Cache: Clone,
	{
		self.shared.state.lock().slots().get(nonce).cloned()
	}

	/// Subscribes to every event on `topic`.
	pub fn on(&self, topic: Topic, listener: impl Fn(&Event<S::View>) + Send + Sync + 'static) -> Subscription {
		self.shared.events.subscribe(topic, listener)
	}

	/// Subscribes to view changes.
	pub fn on_data(&self, listener: impl Fn(&S::View) + Send + Sync + 'static) -> Subscription {
		self.on(Topic::Data, move |event| {
			if let Event::Data(view) = event {
				listener(view);
			}
		})
	}

	/// Subscribes to pending flag announcements.
	pub fn on_pending(&self, listener: impl Fn(bool) + Send + Sync + 'static) -> Subscription {
		self.on(Topic::Pending, move |event| {
			if let Event::Pending(pending) = event {
				listener(*pending);
			}
		})
	}

	/// Subscribes to recorded errors. Read the detail from [`Accessor::error`].
	pub fn on_error(&self, listener: impl Fn() + Send + Sync + 'static) -> Subscription {
		self.on(Topic::Error, move |_| listener())
	}

	/// Subscribes to outgoing requests.
	pub fn on_request(&self, listener: impl Fn(&Query) + Send + Sync + 'static) -> Subscription {
		self.on(Topic::Request, move |event| {
			if let Event::Request(query) = event {
				listener(query);
			}
		})
	}

	/// Current query.
	pub fn query(&self) -> Query {
		self.shared.state.lock().query().clone()
	}

	/// Current params.
	pub fn params(&self) -> Params {
		self.shared.state.lock().params().clone()
	}

	/// True while a dispatched request awaits its response.
	pub fn pending(&self) -> bool {
		self.shared.state.lock().pending()
	}

	/// Last recorded remote error, cleared by the next mutation.
	pub fn error(&self) -> Option<RemoteError> {
		self.shared.state.lock().error().cloned()
	}

	/// Name from the accessor's configuration.
	pub fn name(&self) -> &str {
		&self.shared.name
	}

	/// Releases every subscription and stops the pipeline.
	///
	/// No callback starts after this returns. On a multi-threaded runtime a
	/// callback the pipeline had already entered may still be finishing. The
	/// channel itself is left open.
	pub fn close(&self) {
		debug!(accessor = %self.shared.name, "accessor.close");
		self.shared.events.close();
		self.token.cancel();
	}
}
