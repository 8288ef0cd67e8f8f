//! Worker primitives shared by tokyo crates.
//!
//! Every long-lived task in the workspace (accessor pipelines, channel pumps)
//! and every blocking decode goes through [`spawn`] or [`spawn_blocking`] so
//! it is tagged with a [`TaskClass`] in traces. [`TaskToken`] ties task
//! lifetimes to their owner.

mod class;
mod spawn;
mod token;

pub use class::TaskClass;
pub use spawn::{spawn, spawn_blocking};
pub use token::{TaskGuard, TaskToken};
