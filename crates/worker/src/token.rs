use tokio_util::sync::{CancellationToken, DropGuard};

/// Cancellation handle tying spawned tasks to the value that owns them.
///
/// Tasks select on [`TaskToken::cancelled`]; the owner keeps a [`TaskGuard`]
/// so that dropping the owner stops the tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskToken {
	cancel: CancellationToken,
}

impl TaskToken {
	/// Creates a fresh, uncancelled token.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns true when cancellation was requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation. Idempotent.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Resolves once cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Creates a child token cancelled together with this one.
	pub fn child(&self) -> Self {
		Self {
			cancel: self.cancel.child_token(),
		}
	}

	/// Returns a guard that cancels this token when dropped.
	pub fn guard(&self) -> TaskGuard {
		TaskGuard {
			_inner: self.cancel.clone().drop_guard(),
		}
	}
}

/// Cancels its [`TaskToken`] on drop.
#[derive(Debug)]
pub struct TaskGuard {
	_inner: DropGuard,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn guard_cancels_on_drop() {
		let token = TaskToken::new();
		let guard = token.guard();
		assert!(!token.is_cancelled());
		drop(guard);
		assert!(token.is_cancelled());
	}

	#[test]
	fn parent_cancels_child() {
		let token = TaskToken::new();
		let child = token.child();
		token.cancel();
		assert!(child.is_cancelled());
	}

	#[tokio::test]
	async fn cancelled_resolves_after_cancel() {
		let token = TaskToken::new();
		let waiter = token.clone();
		let task = tokio::spawn(async move { waiter.cancelled().await });
		token.cancel();
		task.await.unwrap();
	}
}
