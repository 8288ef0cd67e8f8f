//! Directory listings.
//!
//! The request nonce is the listed path, so every expanded directory keeps
//! its own cache slot and going back to a listed path costs no request.

use async_trait::async_trait;
use serde::Serialize;
use tokyo_accessor::{CacheSlots, RequestPlan, Strategy};
use tokyo_proto::{Nonce, Params, Query, RequestMessage, ResponseMessage};
use tracing::warn;

use crate::kind;

/// Entries of one listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
	/// Listed path, as requested.
	pub path: String,
	/// Entry names after filtering.
	pub entries: Vec<String>,
}

/// Lists the directory named by the `path` query field.
///
/// Params:
/// - `hidden`: include dot entries (default `false`).
/// - `sort`: `"desc"` for reverse order; ascending otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryStrategy;

#[async_trait]
impl Strategy for DirectoryStrategy {
	type Cache = Vec<String>;
	type View = Vec<Listing>;

	fn create_request(&self, query: &Query, _params: &Params) -> RequestPlan {
		let Some(path) = query.get_str("path") else {
			return RequestPlan::Skip;
		};
		RequestMessage::new(kind::LIST)
			.with_nonce(path)
			.with_field("path", path)
			.into()
	}

	async fn handle_message(&self, response: &ResponseMessage, _params: &Params) -> Option<Vec<String>> {
		if !response.kind.is(kind::LIST) {
			return None;
		}
		serde_json::from_value(response.payload.clone()?)
			.map_err(|error| warn!(nonce = %response.nonce, %error, "directory.decode_failed"))
			.ok()
	}

	fn filter(&self, slots: &CacheSlots<Vec<String>>, params: &Params) -> Vec<Listing> {
		let hidden = params.get_bool("hidden").unwrap_or(false);
		let descending = params.get_str("sort") == Some("desc");

		let mut listings: Vec<Listing> = slots
			.iter()
			.map(|(nonce, entries)| {
				let mut entries: Vec<String> = entries
					.iter()
					.filter(|name| hidden || !name.starts_with('.'))
					.cloned()
					.collect();
				entries.sort();
				if descending {
					entries.reverse();
				}
				Listing {
					path: listing_path(nonce),
					entries,
				}
			})
			.collect();
		listings.sort_by(|a, b| a.path.cmp(&b.path));
		listings
	}
}

fn listing_path(nonce: &Nonce) -> String {
	match nonce {
		Nonce::Text(path) => path.clone(),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	fn slots() -> CacheSlots<Vec<String>> {
		[
			(Nonce::from("/b"), vec!["z".to_owned(), ".git".to_owned(), "a".to_owned()]),
			(Nonce::from("/"), vec!["b".to_owned(), "etc".to_owned()]),
		]
		.into_iter()
		.collect()
	}

	#[test]
	fn path_becomes_the_nonce() {
		let plan = DirectoryStrategy.create_request(&Query::new().with("path", "/b"), &Params::new());
		let RequestPlan::Single(req) = plan else {
			panic!("expected a single request, got {plan:?}");
		};
		assert_eq!(req.nonce, Nonce::from("/b"));
		assert_eq!(serde_json::to_value(&req).unwrap(), json!({ "kind": "list", "nonce": "/b", "path": "/b" }));
	}

	#[test]
	fn missing_path_skips() {
		let plan = DirectoryStrategy.create_request(&Query::new(), &Params::new());
		assert!(matches!(plan, RequestPlan::Skip));
	}

	#[tokio::test]
	async fn decodes_entry_names() {
		let resp = ResponseMessage::ok("list", "/b", json!(["a", "z"]));
		assert_eq!(
			DirectoryStrategy.handle_message(&resp, &Params::new()).await,
			Some(vec!["a".to_owned(), "z".to_owned()])
		);
	}

	#[tokio::test]
	async fn malformed_listing_is_dropped() {
		let resp = ResponseMessage::ok("list", "/b", json!({ "entries": [] }));
		assert_eq!(DirectoryStrategy.handle_message(&resp, &Params::new()).await, None);
	}

	#[test]
	fn listings_are_ordered_by_path_without_dot_entries() {
		let view = DirectoryStrategy.filter(&slots(), &Params::new());
		assert_eq!(
			view,
			vec![
				Listing {
					path: "/".to_owned(),
					entries: vec!["b".to_owned(), "etc".to_owned()],
				},
				Listing {
					path: "/b".to_owned(),
					entries: vec!["a".to_owned(), "z".to_owned()],
				},
			]
		);
	}

	#[test]
	fn hidden_and_descending_params_apply() {
		let params = Params::new().with("hidden", true).with("sort", "desc");
		let view = DirectoryStrategy.filter(&slots(), &params);
		assert_eq!(view[1].entries, vec!["z", "a", ".git"]);
	}
}
