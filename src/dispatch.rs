//! Callback-style dispatch of blocking calls.
//!
//! The client itself is synchronous. These helpers run a blocking call as one unit
//! of work and report its outcome through an error callback and a success callback.
//! Which executor runs the unit is up to the caller; [`spawn_blocking`] uses tokio's
//! blocking thread pool.

use log::debug;

use crate::error_handling::Error;

/// A unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs `work` on the current thread and routes its result to exactly one callback.
pub fn run_with_callbacks<T, W, E, S>(work: W, on_error: E, on_success: S)
where
    W: FnOnce() -> Result<T, Error>,
    E: FnOnce(Error),
    S: FnOnce(T),
{
    match work() {
        Ok(value) => on_success(value),
        Err(e) => {
            debug!("Dispatched call failed: {e}");
            on_error(e)
        }
    }
}

/// Packages `work` and its callbacks as a [`Job`] and hands it to `executor`.
///
/// ```
/// use hopline::dispatch::dispatch_with;
///
/// // Run inline on the calling thread.
/// dispatch_with(
///     |job| job(),
///     || Ok(21 * 2),
///     |e| panic!("unexpected error: {e}"),
///     |value| assert_eq!(value, 42),
/// );
/// ```
pub fn dispatch_with<X, T, W, E, S>(executor: X, work: W, on_error: E, on_success: S)
where
    X: FnOnce(Job),
    T: 'static,
    W: FnOnce() -> Result<T, Error> + Send + 'static,
    E: FnOnce(Error) + Send + 'static,
    S: FnOnce(T) + Send + 'static,
{
    executor(Box::new(move || run_with_callbacks(work, on_error, on_success)));
}

/// Runs `work` on tokio's blocking thread pool.
///
/// Must be called from within a tokio runtime. The handle completes after the
/// callback has run.
pub fn spawn_blocking<T, W, E, S>(work: W, on_error: E, on_success: S) -> tokio::task::JoinHandle<()>
where
    T: 'static,
    W: FnOnce() -> Result<T, Error> + Send + 'static,
    E: FnOnce(Error) + Send + 'static,
    S: FnOnce(T) + Send + 'static,
{
    tokio::task::spawn_blocking(move || run_with_callbacks(work, on_error, on_success))
}
