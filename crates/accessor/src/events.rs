//! Typed in-process publish/subscribe for accessor observers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokyo_proto::Query;

/// Observable topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
	/// The filtered view changed.
	Data,
	/// The pending flag was (re)announced.
	Pending,
	/// A remote error was recorded.
	Error,
	/// A request went out.
	Request,
}

impl Topic {
	const fn index(self) -> usize {
		match self {
			Self::Data => 0,
			Self::Pending => 1,
			Self::Error => 2,
			Self::Request => 3,
		}
	}

	/// Topic name as used in traces.
	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Data => "data",
			Self::Pending => "pending",
			Self::Error => "error",
			Self::Request => "request",
		}
	}
}

/// An emitted event with its topic payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Event<V> {
	/// Current filtered view.
	Data(V),
	/// Current pending flag.
	Pending(bool),
	/// An error was recorded; read it from the accessor.
	Error,
	/// The query that triggered a request.
	Request(Query),
}

impl<V> Event<V> {
	/// Returns the topic this event is delivered on.
	#[must_use]
	pub const fn topic(&self) -> Topic {
		match self {
			Self::Data(_) => Topic::Data,
			Self::Pending(_) => Topic::Pending,
			Self::Error => Topic::Error,
			Self::Request(_) => Topic::Request,
		}
	}
}

type Listener<V> = Arc<dyn Fn(&Event<V>) + Send + Sync>;

struct Registry<V> {
	next_id: u64,
	topics: [Vec<(u64, Listener<V>)>; 4],
}

/// Ordered listener lists per topic.
///
/// Emission is synchronous: listeners run on the emitting task, in
/// subscription order, with no internal lock held. Late subscribers get no
/// replay.
pub struct Dispatcher<V> {
	registry: Arc<Mutex<Registry<V>>>,
	closed: AtomicBool,
}

impl<V: 'static> Default for Dispatcher<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V: 'static> Dispatcher<V> {
	/// Creates a dispatcher with no listeners.
	#[must_use]
	pub fn new() -> Self {
		Self {
			registry: Arc::new(Mutex::new(Registry {
				next_id: 0,
				topics: std::array::from_fn(|_| Vec::new()),
			})),
			closed: AtomicBool::new(false),
		}
	}

	/// Adds `listener` to the end of `topic`'s list.
	pub fn subscribe(&self, topic: Topic, listener: impl Fn(&Event<V>) + Send + Sync + 'static) -> Subscription {
		let id = {
			let mut registry = self.registry.lock();
			let id = registry.next_id;
			registry.next_id += 1;
			registry.topics[topic.index()].push((id, Arc::new(listener)));
			id
		};

		let registry: Weak<Mutex<Registry<V>>> = Arc::downgrade(&self.registry);
		Subscription::new(move || {
			if let Some(registry) = registry.upgrade() {
				registry.lock().topics[topic.index()].retain(|(lid, _)| *lid != id);
			}
		})
	}

	/// Delivers `event` to every listener of its topic.
	///
	/// Stops between listeners once the dispatcher is closed.
	pub fn emit(&self, event: &Event<V>) {
		if self.is_closed() {
			return;
		}
		let listeners: Vec<Listener<V>> = self.registry.lock().topics[event.topic().index()]
			.iter()
			.map(|(_, listener)| Arc::clone(listener))
			.collect();
		tracing::trace!(topic = event.topic().as_str(), listeners = listeners.len(), "accessor.emit");
		for listener in listeners {
			if self.is_closed() {
				break;
			}
			listener(event);
		}
	}

	/// Returns true once [`Dispatcher::close`] was called.
	#[must_use]
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::Acquire)
	}

	/// Number of listeners currently subscribed to `topic`.
	#[must_use]
	pub fn listener_count(&self, topic: Topic) -> usize {
		self.registry.lock().topics[topic.index()].len()
	}

	/// Drops every listener and stops all further delivery.
	///
	/// A listener already running on another thread finishes its call; no
	/// listener starts after this returns.
	pub fn close(&self) {
		self.closed.store(true, Ordering::Release);
		let mut registry = self.registry.lock();
		for listeners in &mut registry.topics {
			listeners.clear();
		}
	}
}

/// Disposer for one listener.
///
/// Dropping a subscription keeps the listener registered; call
/// [`Subscription::dispose`] to remove it.
pub struct Subscription {
	dispose: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
	fn new(dispose: impl FnOnce() + Send + 'static) -> Self {
		Self {
			dispose: Mutex::new(Some(Box::new(dispose))),
		}
	}

	/// Removes the listener. Idempotent.
	pub fn dispose(&self) {
		let dispose = self.dispose.lock().take();
		if let Some(dispose) = dispose {
			dispose();
		}
	}

	/// Returns true once [`Subscription::dispose`] was called.
	#[must_use]
	pub fn is_disposed(&self) -> bool {
		self.dispose.lock().is_none()
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription").field("disposed", &self.is_disposed()).finish()
	}
}
