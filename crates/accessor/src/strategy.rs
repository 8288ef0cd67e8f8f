//! The per-use-case policy plugged into an accessor.

use async_trait::async_trait;
use tokyo_proto::{Params, Query, RequestMessage, ResponseMessage};

use crate::cache::CacheSlots;
use crate::{Error, Result};

/// Requests a strategy wants sent for a query/params pair.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestPlan {
	/// Nothing needs fetching for this input.
	Skip,
	/// Exactly one request.
	Single(RequestMessage),
	/// Several requests. Only a batch of at most one is accepted.
	Batch(Vec<RequestMessage>),
}

impl RequestPlan {
	/// Collapses the plan to at most one request.
	///
	/// # Errors
	///
	/// Returns [`Error::UnsupportedMultiRequest`] for a batch of two or more.
	pub fn into_single(self) -> Result<Option<RequestMessage>> {
		match self {
			Self::Skip => Ok(None),
			Self::Single(req) => Ok(Some(req)),
			Self::Batch(mut reqs) => match reqs.len() {
				0 => Ok(None),
				1 => Ok(reqs.pop()),
				count => Err(Error::UnsupportedMultiRequest { count }),
			},
		}
	}
}

impl From<RequestMessage> for RequestPlan {
	fn from(req: RequestMessage) -> Self {
		Self::Single(req)
	}
}

impl From<Option<RequestMessage>> for RequestPlan {
	fn from(req: Option<RequestMessage>) -> Self {
		req.map_or(Self::Skip, Self::Single)
	}
}

impl From<Vec<RequestMessage>> for RequestPlan {
	fn from(reqs: Vec<RequestMessage>) -> Self {
		Self::Batch(reqs)
	}
}

/// Request construction, response decoding and view derivation for one
/// use-case (locations, thumbnails, ...).
#[async_trait]
pub trait Strategy: Send + Sync + 'static {
	/// Decoded value stored per cache slot.
	type Cache: Send + 'static;
	/// Observer-facing value derived from all slots.
	type View: Clone + Send + 'static;

	/// Builds the request for `query`/`params`.
	///
	/// Must be pure: equal inputs give equal requests. The request's nonce
	/// picks the cache slot its response lands in.
	fn create_request(&self, query: &Query, params: &Params) -> RequestPlan;

	/// Decodes a successful response into a cacheable value.
	///
	/// Returning `None` drops the message without touching the cache.
	async fn handle_message(&self, response: &ResponseMessage, params: &Params) -> Option<Self::Cache>;

	/// Derives the observer-facing view.
	///
	/// Must be side-effect free; it is re-run whenever params change.
	fn filter(&self, slots: &CacheSlots<Self::Cache>, params: &Params) -> Self::View;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn batches_collapse_to_single_requests() {
		assert_eq!(RequestPlan::Batch(Vec::new()).into_single().unwrap(), None);
		let one = RequestMessage::new("list");
		assert_eq!(RequestPlan::from(vec![one.clone()]).into_single().unwrap(), Some(one));
	}

	#[test]
	fn larger_batches_are_rejected() {
		let plan = RequestPlan::from(vec![RequestMessage::new("a"), RequestMessage::new("b")]);
		assert!(matches!(plan.into_single(), Err(Error::UnsupportedMultiRequest { count: 2 })));
	}
}
