//! One accessor wired to an in-process filesystem backend.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use tokio::sync::mpsc;
use tokyo_accessor::{Accessor, AccessorConfig, Event, Strategy, Subscription, Topic};
use tokyo_channel::LocalSource;
use tokyo_library::serve_fs;
use tokyo_proto::{Params, Query};
use tokyo_worker::TaskClass;

const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Session<S: Strategy> {
	accessor: Accessor<S>,
	events: mpsc::UnboundedReceiver<Event<S::View>>,
	_subs: Vec<Subscription>,
}

impl<S: Strategy> Session<S> {
	pub fn open(root: &Path, config: AccessorConfig, strategy: S) -> anyhow::Result<Self> {
		let (source, peer) = LocalSource::pair(config.channel_capacity);
		tokyo_worker::spawn(TaskClass::Backend, serve_fs(root.to_path_buf(), peer));
		let accessor = Accessor::with_config(&source, strategy, config)?;

		let (tx, events) = mpsc::unbounded_channel();
		let subs = [Topic::Data, Topic::Error]
			.into_iter()
			.map(|topic| {
				let tx = tx.clone();
				accessor.on(topic, move |event| {
					let _ = tx.send(event.clone());
				})
			})
			.collect();

		Ok(Self {
			accessor,
			events,
			_subs: subs,
		})
	}

	pub fn set_params(&self, params: Params) -> anyhow::Result<()> {
		self.accessor.set_params(params)?;
		Ok(())
	}

	/// Sets `query` and returns the view once the backend answered.
	///
	/// Answers straight from the cache when the query needed no request.
	pub async fn fetch(&mut self, query: Query) -> anyhow::Result<S::View> {
		while self.events.try_recv().is_ok() {}
		self.accessor.set_query(query).await?;

		loop {
			let event = match self.events.try_recv() {
				Ok(event) => event,
				Err(_) if !self.accessor.pending() => return Ok(self.accessor.process_data()),
				Err(_) => tokio::time::timeout(REPLY_TIMEOUT, self.events.recv())
					.await
					.context("timed out waiting for the backend")?
					.context("accessor closed")?,
			};
			match event {
				Event::Data(view) => return Ok(view),
				Event::Error => match self.accessor.error() {
					Some(error) => bail!("{} failed: {error}", self.accessor.name()),
					None => bail!("{} failed", self.accessor.name()),
				},
				Event::Pending(_) | Event::Request(_) => {}
			}
		}
	}

	pub fn close(self) {
		self.accessor.close();
	}
}
