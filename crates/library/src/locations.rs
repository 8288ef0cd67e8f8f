//! Library locations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokyo_accessor::{CacheSlots, RequestPlan, Strategy};
use tokyo_proto::{Params, Query, RequestMessage, ResponseMessage};
use tracing::warn;

use crate::kind;

/// One configured library location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
	/// Display name.
	pub name: String,
	/// Root path of the location on its host.
	pub path: String,
	/// Host serving the location, absent for the local machine.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub host: Option<String>,
}

/// Fetches the location list once and filters it locally.
///
/// Params:
/// - `search`: case-insensitive substring of the name.
/// - `sort`: `"name"` or `"path"`; backend order otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocationsStrategy;

#[async_trait]
impl Strategy for LocationsStrategy {
	type Cache = Vec<Location>;
	type View = Vec<Location>;

	fn create_request(&self, _query: &Query, _params: &Params) -> RequestPlan {
		RequestMessage::new(kind::LOCATIONS).into()
	}

	async fn handle_message(&self, response: &ResponseMessage, _params: &Params) -> Option<Vec<Location>> {
		if !response.kind.is(kind::LOCATIONS) {
			return None;
		}
		serde_json::from_value(response.payload.clone()?)
			.map_err(|error| warn!(nonce = %response.nonce, %error, "locations.decode_failed"))
			.ok()
	}

	fn filter(&self, slots: &CacheSlots<Vec<Location>>, params: &Params) -> Vec<Location> {
		let Some(locations) = slots.first() else {
			return Vec::new();
		};

		let needle = params.get_str("search").map(str::to_lowercase);
		let mut view: Vec<Location> = locations
			.iter()
			.filter(|loc| needle.as_deref().is_none_or(|n| loc.name.to_lowercase().contains(n)))
			.cloned()
			.collect();

		match params.get_str("sort") {
			Some("name") => view.sort_by(|a, b| a.name.cmp(&b.name)),
			Some("path") => view.sort_by(|a, b| a.path.cmp(&b.path)),
			_ => {}
		}
		view
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use rstest::rstest;
	use serde_json::json;
	use tokyo_proto::Nonce;

	use super::*;

	fn location(name: &str, path: &str) -> Location {
		Location {
			name: name.to_owned(),
			path: path.to_owned(),
			host: None,
		}
	}

	fn slots() -> CacheSlots<Vec<Location>> {
		[(
			Nonce::default(),
			vec![location("Photos", "/srv/photos"), location("archive", "/mnt/archive"), location("Phone", "/media/phone")],
		)]
		.into_iter()
		.collect()
	}

	fn names(view: &[Location]) -> Vec<&str> {
		view.iter().map(|l| l.name.as_str()).collect()
	}

	#[test]
	fn request_ignores_query() {
		let plan = LocationsStrategy.create_request(&Query::new().with("path", "/x"), &Params::new());
		assert!(matches!(plan, RequestPlan::Single(req) if req.kind.is("locations")));
	}

	#[tokio::test]
	async fn decodes_locations_payload() {
		let resp = ResponseMessage::ok(
			"locations",
			0u64,
			json!([{ "name": "Photos", "path": "/srv/photos" }, { "name": "nas", "path": "/", "host": "nas.local" }]),
		);
		let decoded = LocationsStrategy.handle_message(&resp, &Params::new()).await.unwrap();
		assert_eq!(decoded[1].host.as_deref(), Some("nas.local"));
		assert_eq!(decoded[0], location("Photos", "/srv/photos"));
	}

	#[tokio::test]
	async fn other_kinds_are_dropped() {
		let resp = ResponseMessage::ok("list", 0u64, json!([]));
		assert_eq!(LocationsStrategy.handle_message(&resp, &Params::new()).await, None);
	}

	#[rstest]
	#[case::unfiltered(Params::new(), vec!["Photos", "archive", "Phone"])]
	#[case::search_is_case_insensitive(Params::new().with("search", "PH"), vec!["Photos", "Phone"])]
	#[case::sort_by_name(Params::new().with("sort", "name"), vec!["Phone", "Photos", "archive"])]
	#[case::sort_by_path(Params::new().with("sort", "path"), vec!["Phone", "archive", "Photos"])]
	#[case::search_then_sort(Params::new().with("search", "ph").with("sort", "name"), vec!["Phone", "Photos"])]
	fn filters_cached_locations(#[case] params: Params, #[case] expected: Vec<&str>) {
		let view = LocationsStrategy.filter(&slots(), &params);
		assert_eq!(names(&view), expected);
	}

	#[test]
	fn empty_cache_yields_empty_view() {
		assert!(LocationsStrategy.filter(&CacheSlots::default(), &Params::new()).is_empty());
	}
}
