//! Filesystem backend answering library requests from a local directory.

use std::io;
use std::path::{Component, Path, PathBuf};

use serde_json::{Value, json};
use tokyo_channel::LocalPeer;
use tokyo_proto::{RequestMessage, ResponseMessage};
use tracing::{debug, info, warn};

use crate::kind;

/// Serves `locations` and `list` requests rooted at `root` until the
/// accessor side goes away.
///
/// Each subdirectory of `root` is one location. `list` paths are resolved
/// against `root`; `/` is the root itself. Unknown kinds and I/O failures
/// are answered with an error response carrying the request nonce.
pub async fn serve_fs(root: impl Into<PathBuf>, peer: LocalPeer) {
	let root = root.into();
	let (mut requests, responder) = peer.split();
	info!(root = %root.display(), "backend.listening");

	while let Some(req) = requests.recv().await {
		debug!(kind = %req.kind, nonce = %req.nonce, "backend.request");
		let resp = match answer(&root, &req).await {
			Ok(payload) => ResponseMessage::ok(req.kind.clone(), req.nonce.clone(), payload),
			Err(error) => {
				warn!(kind = %req.kind, nonce = %req.nonce, %error, "backend.request_failed");
				ResponseMessage::error(req.nonce.clone(), error.to_string())
			}
		};
		if responder.send(resp).await.is_err() {
			break;
		}
	}
	info!(root = %root.display(), "backend.stopped");
}

async fn answer(root: &Path, req: &RequestMessage) -> io::Result<Value> {
	if req.kind.is(kind::LOCATIONS) {
		return locations(root).await;
	}
	if req.kind.is(kind::LIST) {
		let path = req.field("path").and_then(Value::as_str).unwrap_or("/");
		return list(&resolve(root, path)?).await;
	}
	Err(io::Error::new(io::ErrorKind::Unsupported, format!("unsupported request kind {}", req.kind)))
}

async fn locations(root: &Path) -> io::Result<Value> {
	let mut dirs = Vec::new();
	let mut entries = tokio::fs::read_dir(root).await?;
	while let Some(entry) = entries.next_entry().await? {
		if !entry.file_type().await?.is_dir() {
			continue;
		}
		let name = entry.file_name().to_string_lossy().into_owned();
		dirs.push(json!({ "name": name, "path": format!("/{name}") }));
	}
	dirs.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
	Ok(Value::Array(dirs))
}

async fn list(dir: &Path) -> io::Result<Value> {
	let mut names = Vec::new();
	let mut entries = tokio::fs::read_dir(dir).await?;
	while let Some(entry) = entries.next_entry().await? {
		names.push(entry.file_name().to_string_lossy().into_owned());
	}
	names.sort();
	Ok(json!(names))
}

/// Joins a request path onto `root`, refusing to leave it.
fn resolve(root: &Path, path: &str) -> io::Result<PathBuf> {
	let mut resolved = root.to_path_buf();
	for component in Path::new(path).components() {
		match component {
			Component::Normal(part) => resolved.push(part),
			Component::RootDir | Component::CurDir => {}
			Component::ParentDir | Component::Prefix(_) => {
				return Err(io::Error::new(io::ErrorKind::PermissionDenied, format!("path {path} escapes the library root")));
			}
		}
	}
	Ok(resolved)
}
