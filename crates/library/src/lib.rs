//! Accessor strategies for the tokyo library.
//!
//! Each strategy plugs one backend message family into a
//! [`tokyo_accessor::Accessor`]:
//!
//! * [`LocationsStrategy`]: configured library locations.
//! * [`DirectoryStrategy`]: directory listings keyed by path.
//! * [`ThumbnailsStrategy`]: base64 thumbnail payloads, decoded off the
//!   async runtime.
//!
//! [`serve_fs`] answers `locations` and `list` requests from a local
//! directory tree.

#![warn(missing_docs)]

mod backend;
pub mod directory;
pub mod locations;
pub mod thumbnails;

pub use backend::serve_fs;
pub use directory::{DirectoryStrategy, Listing};
pub use locations::{Location, LocationsStrategy};
pub use thumbnails::{Thumbnail, ThumbnailsStrategy};

/// Message kinds understood by the library backend.
pub mod kind {
	/// Lists configured locations.
	pub const LOCATIONS: &str = "locations";
	/// Lists one directory.
	pub const LIST: &str = "list";
	/// Fetches thumbnails by id.
	pub const THUMBNAILS: &str = "thumbnails";
}
