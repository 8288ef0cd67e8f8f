//! Request and response envelopes.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Correlation identifier linking a request to its response(s).
///
/// Each accessor owns its slice of the identifier space; the identifier also
/// addresses the cache slot a response is written into.
///
/// Any JSON integer or string is accepted. Fractional numbers are not
/// identifiers and fail to decode.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Nonce {
	/// Non-negative numeric identifier.
	Number(u64),
	/// Negative numeric identifier.
	Signed(i64),
	/// Textual identifier.
	Text(String),
}

impl Default for Nonce {
	fn default() -> Self {
		Self::Number(0)
	}
}

impl From<u64> for Nonce {
	fn from(value: u64) -> Self {
		Self::Number(value)
	}
}

impl From<i64> for Nonce {
	fn from(value: i64) -> Self {
		u64::try_from(value).map_or(Self::Signed(value), Self::Number)
	}
}

impl From<&str> for Nonce {
	fn from(value: &str) -> Self {
		Self::Text(value.to_owned())
	}
}

impl From<String> for Nonce {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl fmt::Display for Nonce {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Number(n) => write!(f, "{n}"),
			Self::Signed(n) => write!(f, "{n}"),
			Self::Text(s) => f.write_str(s),
		}
	}
}

/// Message kind tag.
///
/// Numeric codes are non-negative integers; anything else numeric fails to
/// decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Kind {
	/// Numeric kind, as used by enum-coded backends.
	Code(u64),
	/// Named kind.
	Name(String),
}

impl Kind {
	/// Reserved name of failure responses.
	pub const ERROR: &'static str = "error";

	/// Returns the reserved error kind.
	#[must_use]
	pub fn error() -> Self {
		Self::Name(Self::ERROR.to_owned())
	}

	/// Returns true for the reserved error kind.
	#[must_use]
	pub fn is_error(&self) -> bool {
		matches!(self, Self::Name(name) if name == Self::ERROR)
	}

	/// Returns true when this kind is the given name.
	#[must_use]
	pub fn is(&self, name: &str) -> bool {
		matches!(self, Self::Name(n) if n == name)
	}
}

impl From<&str> for Kind {
	fn from(value: &str) -> Self {
		Self::Name(value.to_owned())
	}
}

impl From<u64> for Kind {
	fn from(value: u64) -> Self {
		Self::Code(value)
	}
}

impl fmt::Display for Kind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Code(n) => write!(f, "{n}"),
			Self::Name(s) => f.write_str(s),
		}
	}
}

/// Error detail carried by an `error` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
	/// Human readable description from the remote end.
	pub message: String,
}

impl RemoteError {
	/// Creates a remote error with the given message.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

/// Outbound request envelope.
///
/// Kind-specific fields are flattened next to `kind` and `nonce`. Object keys
/// serialize in sorted order, so two equal requests always produce the same
/// bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
	/// Request kind.
	pub kind: Kind,
	/// Correlation identifier.
	#[serde(default)]
	pub nonce: Nonce,
	/// Kind-specific fields.
	#[serde(flatten)]
	pub fields: Map<String, Value>,
}

impl RequestMessage {
	/// Creates a request of the given kind addressed to the default nonce.
	pub fn new(kind: impl Into<Kind>) -> Self {
		Self {
			kind: kind.into(),
			nonce: Nonce::default(),
			fields: Map::new(),
		}
	}

	/// Sets the correlation identifier.
	#[must_use]
	pub fn with_nonce(mut self, nonce: impl Into<Nonce>) -> Self {
		self.nonce = nonce.into();
		self
	}

	/// Adds a kind-specific field.
	///
	/// `kind` and `nonce` are envelope keys and cannot be used as field names.
	#[must_use]
	pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		let key = key.into();
		if key != "kind" && key != "nonce" {
			self.fields.insert(key, value.into());
		}
		self
	}

	/// Returns a kind-specific field.
	#[must_use]
	pub fn field(&self, key: &str) -> Option<&Value> {
		self.fields.get(key)
	}
}

/// Inbound response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
	/// Response kind; `"error"` marks a failure.
	pub kind: Kind,
	/// Correlation identifier of the request this answers.
	#[serde(default)]
	pub nonce: Nonce,
	/// Success payload.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payload: Option<Value>,
	/// Failure detail, present on `error` responses.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<RemoteError>,
}

impl ResponseMessage {
	/// Creates a success response.
	pub fn ok(kind: impl Into<Kind>, nonce: impl Into<Nonce>, payload: impl Into<Value>) -> Self {
		Self {
			kind: kind.into(),
			nonce: nonce.into(),
			payload: Some(payload.into()),
			error: None,
		}
	}

	/// Creates an `error` response.
	pub fn error(nonce: impl Into<Nonce>, message: impl Into<String>) -> Self {
		Self {
			kind: Kind::error(),
			nonce: nonce.into(),
			payload: None,
			error: Some(RemoteError::new(message)),
		}
	}

	/// Returns true when this response takes the error path.
	#[must_use]
	pub fn is_error(&self) -> bool {
		self.kind.is_error()
	}
}
