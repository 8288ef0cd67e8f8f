use std::future::Future;
use std::sync::OnceLock;

use tokio::task::JoinHandle;

use crate::TaskClass;

fn runtime_handle() -> tokio::runtime::Handle {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return handle;
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(2)
			.thread_name("tokyo-worker-global")
			.build()
			.expect("failed to build tokyo-worker global tokio runtime")
	});
	runtime.handle().clone()
}

/// Spawns an async task tagged with `class`.
///
/// Uses the ambient tokio runtime when called from inside one, otherwise a
/// lazily built shared runtime.
#[allow(clippy::disallowed_methods)]
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn");
	runtime_handle().spawn(fut)
}

/// Spawns blocking work tagged with `class`.
#[allow(clippy::disallowed_methods)]
pub fn spawn_blocking<F, R>(class: TaskClass, f: F) -> JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn_blocking");
	runtime_handle().spawn_blocking(f)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn spawn_runs_on_ambient_runtime() {
		let out = spawn(TaskClass::Pipeline, async { 21 * 2 }).await.unwrap();
		assert_eq!(out, 42);
	}

	#[tokio::test]
	async fn spawn_blocking_returns_result() {
		let out = spawn_blocking(TaskClass::Decode, || "decoded".len()).await.unwrap();
		assert_eq!(out, 7);
	}

	#[test]
	fn spawn_outside_runtime_uses_global_runtime() {
		let handle = spawn(TaskClass::Backend, async { 5 });
		let out = runtime_handle().block_on(handle).unwrap();
		assert_eq!(out, 5);
	}
}
