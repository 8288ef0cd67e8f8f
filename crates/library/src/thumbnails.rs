//! Thumbnail images.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::Value;
use tokyo_accessor::{CacheSlots, RequestPlan, Strategy};
use tokyo_proto::{Params, Query, RequestMessage, ResponseMessage};
use tokyo_worker::TaskClass;
use tracing::warn;

use crate::kind;

/// Decoded thumbnail bytes for one library item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
	/// Item id.
	pub id: String,
	/// Encoded image bytes as served.
	pub bytes: Vec<u8>,
}

#[derive(Deserialize)]
struct WireThumbnail {
	id: String,
	thumbnail: String,
}

/// Requests thumbnails for the ids in the `ids` query field.
///
/// Payload decoding runs on the blocking pool. Duplicate ids in a payload
/// collapse to the last one. The optional `ids` param narrows the view to
/// those ids without a new request.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThumbnailsStrategy;

#[async_trait]
impl Strategy for ThumbnailsStrategy {
	type Cache = Vec<Thumbnail>;
	type View = Vec<Thumbnail>;

	fn create_request(&self, query: &Query, _params: &Params) -> RequestPlan {
		let ids: Vec<Value> = query
			.get("ids")
			.and_then(|ids| ids.as_list())
			.unwrap_or_default()
			.iter()
			.filter_map(|id| id.as_str().map(Value::from))
			.collect();
		if ids.is_empty() {
			return RequestPlan::Skip;
		}
		RequestMessage::new(kind::THUMBNAILS).with_field("ids", ids).into()
	}

	async fn handle_message(&self, response: &ResponseMessage, _params: &Params) -> Option<Vec<Thumbnail>> {
		if !response.kind.is(kind::THUMBNAILS) {
			return None;
		}
		let payload = response.payload.clone()?;
		match tokyo_worker::spawn_blocking(TaskClass::Decode, move || decode(payload)).await {
			Ok(thumbs) => thumbs,
			Err(error) => {
				warn!(nonce = %response.nonce, %error, "thumbnails.decode_panicked");
				None
			}
		}
	}

	fn filter(&self, slots: &CacheSlots<Vec<Thumbnail>>, params: &Params) -> Vec<Thumbnail> {
		let wanted: Option<Vec<&str>> = params
			.get("ids")
			.and_then(Value::as_array)
			.map(|ids| ids.iter().filter_map(Value::as_str).collect());

		let by_id: BTreeMap<&str, &Thumbnail> = slots
			.values()
			.flatten()
			.filter(|thumb| wanted.as_ref().is_none_or(|ids| ids.contains(&thumb.id.as_str())))
			.map(|thumb| (thumb.id.as_str(), thumb))
			.collect();
		by_id.into_values().cloned().collect()
	}
}

fn decode(payload: Value) -> Option<Vec<Thumbnail>> {
	let wire: Vec<WireThumbnail> = serde_json::from_value(payload)
		.map_err(|error| warn!(%error, "thumbnails.decode_failed"))
		.ok()?;

	let mut by_id = BTreeMap::new();
	for WireThumbnail { id, thumbnail } in wire {
		match STANDARD.decode(thumbnail.as_bytes()) {
			Ok(bytes) => {
				by_id.insert(id.clone(), Thumbnail { id, bytes });
			}
			Err(error) => warn!(%id, %error, "thumbnails.invalid_base64"),
		}
	}
	Some(by_id.into_values().collect())
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;
	use tokyo_proto::Nonce;

	use super::*;

	fn thumb(id: &str, bytes: &[u8]) -> Thumbnail {
		Thumbnail {
			id: id.to_owned(),
			bytes: bytes.to_vec(),
		}
	}

	#[test]
	fn ids_become_the_request() {
		let query = Query::new().with("ids", vec!["b", "a"]);
		let RequestPlan::Single(req) = ThumbnailsStrategy.create_request(&query, &Params::new()) else {
			panic!("expected a single request");
		};
		assert_eq!(serde_json::to_value(&req).unwrap(), json!({ "kind": "thumbnails", "nonce": 0, "ids": ["b", "a"] }));
	}

	#[test]
	fn no_ids_skip_the_request() {
		let empty: Vec<&str> = Vec::new();
		assert!(matches!(
			ThumbnailsStrategy.create_request(&Query::new().with("ids", empty), &Params::new()),
			RequestPlan::Skip
		));
		assert!(matches!(ThumbnailsStrategy.create_request(&Query::new(), &Params::new()), RequestPlan::Skip));
	}

	#[tokio::test]
	async fn decodes_base64_thumbnails_off_the_runtime() {
		let resp = ResponseMessage::ok(
			"thumbnails",
			0u64,
			json!([
				{ "id": "2", "thumbnail": STANDARD.encode(b"png-2") },
				{ "id": "1", "thumbnail": STANDARD.encode(b"png-1") },
				{ "id": "2", "thumbnail": STANDARD.encode(b"png-2b") },
				{ "id": "3", "thumbnail": "%%%" },
			]),
		);
		let decoded = ThumbnailsStrategy.handle_message(&resp, &Params::new()).await.unwrap();
		assert_eq!(decoded, vec![thumb("1", b"png-1"), thumb("2", b"png-2b")]);
	}

	#[tokio::test]
	async fn wrong_shape_is_dropped() {
		let resp = ResponseMessage::ok("thumbnails", 0u64, json!({ "id": "1" }));
		assert_eq!(ThumbnailsStrategy.handle_message(&resp, &Params::new()).await, None);
	}

	#[test]
	fn view_is_ordered_by_id_and_narrowed_by_params() {
		let slots: CacheSlots<_> = [
			(Nonce::from(0u64), vec![thumb("b", b"1"), thumb("a", b"2")]),
			(Nonce::from(1u64), vec![thumb("c", b"3")]),
		]
		.into_iter()
		.collect();

		let all = ThumbnailsStrategy.filter(&slots, &Params::new());
		let ids: Vec<_> = all.iter().map(|t| t.id.as_str()).collect();
		assert_eq!(ids, vec!["a", "b", "c"]);

		let narrowed = ThumbnailsStrategy.filter(&slots, &Params::new().with("ids", json!(["c", "a"])));
		assert_eq!(narrowed, vec![thumb("a", b"2"), thumb("c", b"3")]);
	}
}
