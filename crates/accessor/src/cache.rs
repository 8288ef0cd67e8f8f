//! Cache keys and slots.

use std::collections::BTreeMap;

use tokyo_proto::{Nonce, RequestMessage};

/// Stable fingerprint of an issued request.
///
/// Two requests with the same key fetch the same thing, so a repeated
/// mutation producing an equal key never goes back to the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
	/// Derives the key from the request's canonical JSON encoding.
	///
	/// # Errors
	///
	/// Fails when a request field cannot be serialized.
	pub fn derive(req: &RequestMessage) -> Result<Self, serde_json::Error> {
		serde_json::to_string(req).map(Self)
	}
}

/// Decoded values addressed by correlation identifier.
///
/// Empty slots (never answered, or cleared by a new request in flight) are
/// absent. Iteration is in nonce order.
#[derive(Debug, Clone)]
pub struct CacheSlots<C> {
	values: BTreeMap<Nonce, C>,
}

impl<C> Default for CacheSlots<C> {
	fn default() -> Self {
		Self { values: BTreeMap::new() }
	}
}

impl<C> CacheSlots<C> {
	/// Returns the value cached for `nonce`.
	#[must_use]
	pub fn get(&self, nonce: &Nonce) -> Option<&C> {
		self.values.get(nonce)
	}

	/// Returns the value in the lowest slot. Handy for single-slot strategies.
	#[must_use]
	pub fn first(&self) -> Option<&C> {
		self.values.values().next()
	}

	/// Returns true when `nonce` holds a value.
	#[must_use]
	pub fn contains(&self, nonce: &Nonce) -> bool {
		self.values.contains_key(nonce)
	}

	/// Number of populated slots.
	#[must_use]
	pub fn len(&self) -> usize {
		self.values.len()
	}

	/// Returns true when no slot holds a value.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Iterates populated slots in nonce order.
	pub fn iter(&self) -> impl Iterator<Item = (&Nonce, &C)> {
		self.values.iter()
	}

	/// Iterates cached values in nonce order.
	pub fn values(&self) -> impl Iterator<Item = &C> {
		self.values.values()
	}

	pub(crate) fn insert(&mut self, nonce: Nonce, value: C) -> Option<C> {
		self.values.insert(nonce, value)
	}

	pub(crate) fn clear(&mut self, nonce: &Nonce) -> Option<C> {
		self.values.remove(nonce)
	}
}

impl<C> FromIterator<(Nonce, C)> for CacheSlots<C> {
	fn from_iter<I: IntoIterator<Item = (Nonce, C)>>(iter: I) -> Self {
		Self {
			values: iter.into_iter().collect(),
		}
	}
}
