//! Query and presentation parameter maps.
//!
//! A [`Query`] names *what* to fetch and may cause network traffic when it
//! changes. [`Params`] only shape how already-fetched data is presented.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single query field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
	/// Boolean flag.
	Bool(bool),
	/// Integer value.
	Integer(i64),
	/// Floating point value.
	Float(f64),
	/// RFC 3339 timestamp.
	Date(DateTime<Utc>),
	/// String value.
	Text(String),
	/// Array of scalars.
	List(Vec<QueryValue>),
}

impl QueryValue {
	/// Returns the string value, if this is text.
	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Text(s) => Some(s),
			_ => None,
		}
	}

	/// Returns the list items, if this is an array.
	#[must_use]
	pub fn as_list(&self) -> Option<&[QueryValue]> {
		match self {
			Self::List(items) => Some(items),
			_ => None,
		}
	}
}

impl From<bool> for QueryValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<i32> for QueryValue {
	fn from(value: i32) -> Self {
		Self::Integer(value.into())
	}
}

impl From<i64> for QueryValue {
	fn from(value: i64) -> Self {
		Self::Integer(value)
	}
}

impl From<f64> for QueryValue {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<DateTime<Utc>> for QueryValue {
	fn from(value: DateTime<Utc>) -> Self {
		Self::Date(value)
	}
}

impl From<&str> for QueryValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_owned())
	}
}

impl From<String> for QueryValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl<T: Into<QueryValue>> From<Vec<T>> for QueryValue {
	fn from(value: Vec<T>) -> Self {
		Self::List(value.into_iter().map(Into::into).collect())
	}
}

impl From<&QueryValue> for Value {
	fn from(value: &QueryValue) -> Self {
		serde_json::to_value(value).unwrap_or(Value::Null)
	}
}

/// Identifies what an accessor fetches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(BTreeMap<String, QueryValue>);

impl Query {
	/// Creates an empty query.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the query with `key` set to `value`.
	#[must_use]
	pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
		self.insert(key, value);
		self
	}

	/// Sets `key` to `value`, returning the previous value.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Option<QueryValue> {
		self.0.insert(key.into(), value.into())
	}

	/// Returns the value for `key`.
	#[must_use]
	pub fn get(&self, key: &str) -> Option<&QueryValue> {
		self.0.get(key)
	}

	/// Returns the string value for `key`.
	#[must_use]
	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.get(key).and_then(QueryValue::as_str)
	}

	/// Returns true when no fields are set.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates fields in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v))
	}
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for Query {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}

/// Shapes how fetched data is presented (filtering, sorting).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Map<String, Value>);

impl Params {
	/// Creates empty params.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the params with `key` set to `value`.
	#[must_use]
	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.insert(key, value);
		self
	}

	/// Sets `key` to `value`, returning the previous value.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		self.0.insert(key.into(), value.into())
	}

	/// Returns the value for `key`.
	#[must_use]
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	/// Returns the string value for `key`.
	#[must_use]
	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.get(key).and_then(Value::as_str)
	}

	/// Returns the boolean value for `key`.
	#[must_use]
	pub fn get_bool(&self, key: &str) -> Option<bool> {
		self.get(key).and_then(Value::as_bool)
	}

	/// Returns true when no fields are set.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<Map<String, Value>> for Params {
	fn from(value: Map<String, Value>) -> Self {
		Self(value)
	}
}
