//! Correlation and cache bookkeeping.
//!
//! Everything here is synchronous and I/O free. The accessor takes the lock,
//! asks this module what to do, releases the lock and only then writes to the
//! channel or notifies observers.

use std::collections::{HashMap, VecDeque};

use tokyo_proto::{Nonce, Params, Query, RemoteError, RequestMessage};

use crate::cache::{CacheKey, CacheSlots};

/// What a mutation requires after evaluation.
#[derive(Debug, PartialEq)]
pub(crate) enum Decision {
	/// The fetch target changed; send `request`.
	Dispatch { request: RequestMessage, generation: u64 },
	/// Cached data is still valid but presentation inputs changed.
	Refilter,
	/// Nothing observable changed.
	Unchanged,
}

/// How an inbound response relates to the requests in flight for its slot.
///
/// Responses are matched to requests in send order per nonce: the first
/// response on a nonce answers the oldest request still in flight there.
/// Backends must answer requests sharing a nonce in the order received;
/// requests on distinct nonces may be answered in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settlement {
	/// Answers the newest request for the slot.
	Current,
	/// Answers an older request that a newer one replaced.
	Superseded,
	/// Nothing was in flight for the slot (server push).
	Unsolicited,
}

/// Per-identifier request tracking.
#[derive(Debug, Default)]
struct SlotRecord {
	/// Key of the most recently issued request.
	key: Option<CacheKey>,
	/// Generations dispatched and not yet answered, oldest first.
	in_flight: VecDeque<u64>,
	/// Last generation handed out.
	generation: u64,
}

/// Mutable accessor state, owned by the accessor behind a single lock.
#[derive(Debug)]
pub(crate) struct AccessorState<C> {
	query: Query,
	params: Params,
	error: Option<RemoteError>,
	records: HashMap<Nonce, SlotRecord>,
	slots: CacheSlots<C>,
	discard_superseded: bool,
}

impl<C> AccessorState<C> {
	pub fn new(discard_superseded: bool) -> Self {
		Self {
			query: Query::default(),
			params: Params::default(),
			error: None,
			records: HashMap::new(),
			slots: CacheSlots::default(),
			discard_superseded,
		}
	}

	pub fn query(&self) -> &Query {
		&self.query
	}

	pub fn params(&self) -> &Params {
		&self.params
	}

	pub fn error(&self) -> Option<&RemoteError> {
		self.error.as_ref()
	}

	pub fn slots(&self) -> &CacheSlots<C> {
		&self.slots
	}

	pub fn clear_error(&mut self) {
		self.error = None;
	}

	/// True while any slot has a request awaiting its response.
	pub fn pending(&self) -> bool {
		self.records.values().any(|r| !r.in_flight.is_empty())
	}

	/// Evaluates a query mutation against the request the strategy built for it.
	///
	/// The query is stored regardless of the outcome.
	pub fn evaluate_query(&mut self, query: Query, request: Option<RequestMessage>) -> serde_json::Result<Decision> {
		let key = request.as_ref().map(CacheKey::derive).transpose()?;
		let changed = self.query != query;
		self.query = query;

		let (Some(request), Some(key)) = (request, key) else {
			return Ok(Decision::Unchanged);
		};

		let record = self.records.entry(request.nonce.clone()).or_default();
		if record.key.as_ref() != Some(&key) {
			record.key = Some(key);
			record.generation += 1;
			record.in_flight.push_back(record.generation);
			let generation = record.generation;
			self.slots.clear(&request.nonce);
			return Ok(Decision::Dispatch { request, generation });
		}

		if changed && self.slots.contains(&request.nonce) {
			Ok(Decision::Refilter)
		} else {
			Ok(Decision::Unchanged)
		}
	}

	/// Evaluates a params mutation. Never dispatches.
	///
	/// When the strategy keys its request by params, the changed request is
	/// picked up by the next query mutation.
	pub fn evaluate_params(&mut self, params: Params, request: Option<RequestMessage>) -> serde_json::Result<Decision> {
		let key = request.as_ref().map(CacheKey::derive).transpose()?;
		let changed = self.params != params;
		self.params = params;

		if let (Some(request), Some(key)) = (&request, &key) {
			let stored = self.records.get(&request.nonce).and_then(|r| r.key.as_ref());
			if stored.is_some_and(|stored| stored != key) {
				tracing::debug!(nonce = %request.nonce, "accessor.params_request_deferred");
			}
		}

		if changed && !self.slots.is_empty() {
			Ok(Decision::Refilter)
		} else {
			Ok(Decision::Unchanged)
		}
	}

	/// Rolls back a dispatch whose write failed. Returns the new pending flag.
	pub fn abandon(&mut self, nonce: &Nonce, generation: u64) -> bool {
		if let Some(record) = self.records.get_mut(nonce) {
			record.in_flight.retain(|g| *g != generation);
			if record.generation == generation {
				record.key = None;
			}
		}
		self.pending()
	}

	/// Marks the oldest request in flight for `nonce` as answered.
	fn settle(&mut self, nonce: &Nonce) -> Settlement {
		let Some(record) = self.records.get_mut(nonce) else {
			return Settlement::Unsolicited;
		};
		match record.in_flight.pop_front() {
			None => Settlement::Unsolicited,
			Some(_) if !record.in_flight.is_empty() => Settlement::Superseded,
			Some(_) => Settlement::Current,
		}
	}

	fn accepts(&self, settlement: Settlement) -> bool {
		settlement != Settlement::Superseded || !self.discard_superseded
	}

	/// Applies a decoded response. Returns `None` when it was discarded as
	/// superseded, otherwise the settlement.
	pub fn apply_value(&mut self, nonce: &Nonce, value: C) -> Option<Settlement> {
		let settlement = self.settle(nonce);
		if !self.accepts(settlement) {
			return None;
		}
		self.slots.insert(nonce.clone(), value);
		Some(settlement)
	}

	/// Applies an `error` response. Returns `None` when it was discarded as
	/// superseded.
	pub fn apply_error(&mut self, nonce: &Nonce, error: RemoteError) -> Option<Settlement> {
		let settlement = self.settle(nonce);
		if !self.accepts(settlement) {
			return None;
		}
		self.error = Some(error);
		Some(settlement)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn list(nonce: u64, path: &str) -> RequestMessage {
		RequestMessage::new("list").with_nonce(nonce).with_field("path", path)
	}

	fn query(path: &str) -> Query {
		Query::new().with("path", path)
	}

	#[test]
	fn first_request_dispatches_and_sets_pending() {
		let mut state = AccessorState::<u32>::new(true);
		let decision = state.evaluate_query(query("/a"), Some(list(1, "/a"))).unwrap();
		assert_eq!(
			decision,
			Decision::Dispatch {
				request: list(1, "/a"),
				generation: 1
			}
		);
		assert!(state.pending());
	}

	#[test]
	fn equal_key_without_cache_is_unchanged() {
		let mut state = AccessorState::<u32>::new(true);
		state.evaluate_query(query("/a"), Some(list(1, "/a"))).unwrap();
		assert_eq!(state.evaluate_query(query("/a"), Some(list(1, "/a"))).unwrap(), Decision::Unchanged);
	}

	#[test]
	fn equal_key_with_cache_and_new_query_refilters() {
		let mut state = AccessorState::<u32>::new(true);
		state.evaluate_query(query("/a"), Some(list(1, "/a"))).unwrap();
		assert_eq!(state.apply_value(&Nonce::from(1u64), 7), Some(Settlement::Current));
		assert!(!state.pending());

		let other = query("/a").with("view", "grid");
		assert_eq!(state.evaluate_query(other.clone(), Some(list(1, "/a"))).unwrap(), Decision::Refilter);
		assert_eq!(state.evaluate_query(other, Some(list(1, "/a"))).unwrap(), Decision::Unchanged);
	}

	#[test]
	fn key_change_clears_slot() {
		let mut state = AccessorState::<u32>::new(true);
		state.evaluate_query(query("/a"), Some(list(0, "/a"))).unwrap();
		state.apply_value(&Nonce::default(), 1);
		let decision = state.evaluate_query(query("/b"), Some(list(0, "/b"))).unwrap();
		assert!(matches!(decision, Decision::Dispatch { generation: 2, .. }));
		assert!(state.slots().is_empty());
	}

	#[test]
	fn superseded_response_is_discarded() {
		let mut state = AccessorState::<&str>::new(true);
		let slot = Nonce::default();
		state.evaluate_query(query("/a"), Some(list(0, "/a"))).unwrap();
		state.evaluate_query(query("/b"), Some(list(0, "/b"))).unwrap();

		assert_eq!(state.apply_value(&slot, "a"), None);
		assert!(state.pending());
		assert_eq!(state.apply_value(&slot, "b"), Some(Settlement::Current));
		assert_eq!(state.slots().get(&slot), Some(&"b"));
		assert!(!state.pending());
	}

	#[test]
	fn responses_on_one_nonce_settle_in_send_order() {
		let mut state = AccessorState::<&str>::new(true);
		let slot = Nonce::default();
		state.evaluate_query(query("/a"), Some(list(0, "/a"))).unwrap();
		state.evaluate_query(query("/b"), Some(list(0, "/b"))).unwrap();

		// A backend answering "/b" first breaks the per-nonce ordering: its
		// answer settles the "/a" generation and is discarded.
		assert_eq!(state.apply_value(&slot, "b"), None);
		assert_eq!(state.apply_value(&slot, "a"), Some(Settlement::Current));
		assert_eq!(state.slots().get(&slot), Some(&"a"));
	}

	#[test]
	fn superseded_response_applies_when_discarding_is_off() {
		let mut state = AccessorState::<&str>::new(false);
		let slot = Nonce::default();
		state.evaluate_query(query("/a"), Some(list(0, "/a"))).unwrap();
		state.evaluate_query(query("/b"), Some(list(0, "/b"))).unwrap();

		assert_eq!(state.apply_value(&slot, "a"), Some(Settlement::Superseded));
		assert_eq!(state.slots().get(&slot), Some(&"a"));
	}

	#[test]
	fn unsolicited_responses_are_applied() {
		let mut state = AccessorState::<&str>::new(true);
		assert_eq!(state.apply_value(&Nonce::from(9u64), "push"), Some(Settlement::Unsolicited));
		assert_eq!(state.apply_error(&Nonce::from(3u64), RemoteError::new("boom")), Some(Settlement::Unsolicited));
		assert_eq!(state.error().map(|e| e.message.as_str()), Some("boom"));
		assert!(!state.pending());
	}

	#[test]
	fn params_never_dispatch() {
		let mut state = AccessorState::<u32>::new(true);
		state.evaluate_query(query("/a"), Some(list(1, "/a"))).unwrap();
		let params = Params::new().with("sort", "desc");
		let keyed = list(1, "/a").with_field("sort", "desc");
		assert_eq!(state.evaluate_params(params.clone(), Some(keyed)).unwrap(), Decision::Unchanged);

		state.apply_value(&Nonce::from(1u64), 5);
		assert_eq!(state.evaluate_params(Params::new(), None).unwrap(), Decision::Refilter);
		assert_eq!(state.evaluate_params(Params::new(), None).unwrap(), Decision::Unchanged);
	}

	#[test]
	fn abandon_allows_redispatch() {
		let mut state = AccessorState::<u32>::new(true);
		let Decision::Dispatch { request, generation } = state.evaluate_query(query("/a"), Some(list(1, "/a"))).unwrap()
		else {
			panic!("expected dispatch");
		};
		assert!(!state.abandon(&request.nonce, generation));
		assert!(matches!(
			state.evaluate_query(query("/a"), Some(list(1, "/a"))).unwrap(),
			Decision::Dispatch { generation: 2, .. }
		));
	}
}
