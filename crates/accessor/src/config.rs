//! Accessor configuration.
//!
//! Configuration is plain TOML; every key is optional:
//!
//! ```toml
//! name = "explorer"
//! discard_superseded = true
//! channel_capacity = 32
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},
	/// Error parsing TOML syntax or values.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),
}

/// Tunables for one accessor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessorConfig {
	/// Name attached to every trace the accessor emits.
	pub name: String,
	/// Drop responses answering a request that a newer request for the same
	/// nonce replaced. When off, the last response to arrive wins.
	pub discard_superseded: bool,
	/// Queue bound for channel sources built alongside the accessor.
	pub channel_capacity: usize,
}

impl Default for AccessorConfig {
	fn default() -> Self {
		Self {
			name: "accessor".to_owned(),
			discard_superseded: true,
			channel_capacity: 32,
		}
	}
}

impl AccessorConfig {
	/// Returns the default configuration under a different name.
	#[must_use]
	pub fn named(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Self::default()
		}
	}

	/// Parses configuration from TOML text.
	///
	/// # Errors
	///
	/// Returns [`ConfigError::Toml`] for malformed input or unknown keys.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(input)?)
	}

	/// Reads and parses a TOML configuration file.
	///
	/// # Errors
	///
	/// Returns [`ConfigError::Io`] when the file cannot be read and
	/// [`ConfigError::Toml`] when it does not parse.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&input)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn empty_input_yields_defaults() {
		assert_eq!(AccessorConfig::from_toml_str("").unwrap(), AccessorConfig::default());
	}

	#[test]
	fn partial_input_overrides_fields() {
		let config = AccessorConfig::from_toml_str("name = \"explorer\"\ndiscard_superseded = false\n").unwrap();
		assert_eq!(config.name, "explorer");
		assert!(!config.discard_superseded);
		assert_eq!(config.channel_capacity, 32);
	}

	#[test]
	fn unknown_keys_are_rejected() {
		assert!(matches!(AccessorConfig::from_toml_str("bogus = 1"), Err(ConfigError::Toml(_))));
	}

	#[test]
	fn missing_file_reports_path() {
		let err = AccessorConfig::load("/nonexistent/tokyo.toml").unwrap_err();
		assert!(err.to_string().contains("/nonexistent/tokyo.toml"));
	}
}
