//! Test assertion helpers.
//!
//! Provides polling-based assertions for async test scenarios, such as
//! waiting for a background watcher to install a new host list.

use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Default polling interval for [`assert_eventually`].
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polls a condition until it returns true or the timeout expires.
///
/// Uses the tokio clock, so it also works under a paused runtime
/// (`#[tokio::test(start_paused = true)]`), where each poll sleep lets
/// pending timers fire.
///
/// # Returns
///
/// `true` if the condition became true before timeout, `false` otherwise.
///
/// # Example
///
/// ```no_run
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
/// use ensemble_test_utils::assert_eventually;
///
/// #[tokio::test]
/// async fn test_background_update() {
///     let installs = Arc::new(AtomicUsize::new(0));
///     let observed = installs.clone();
///
///     tokio::spawn(async move {
///         tokio::time::sleep(Duration::from_millis(50)).await;
///         installs.fetch_add(1, Ordering::SeqCst);
///     });
///
///     let result = assert_eventually(Duration::from_millis(200), || {
///         observed.load(Ordering::SeqCst) == 1
///     }).await;
///
///     assert!(result, "host list should be installed");
/// }
/// ```
pub async fn assert_eventually<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    poll_until(timeout, DEFAULT_POLL_INTERVAL, condition).await
}

/// Like [`assert_eventually`], with an explicit polling interval.
pub async fn poll_until<F>(timeout: Duration, interval: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        sleep(interval).await;
    }

    // Final check after timeout
    condition()
}
