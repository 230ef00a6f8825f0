#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing and examples in slot_pool packages.

use std::env;
use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How long a watched test may run before it is considered hung.
const TIMEOUT: Duration = Duration::from_secs(10);

/// Thread synchronization under Miri is orders of magnitude slower.
const MIRI_TIMEOUT: Duration = Duration::from_secs(60);

/// Setting this variable to "1" turns the watchdog off.
const DISABLE_VARIABLE: &str = "MUTATION_TESTING";

/// Runs a test on a separate thread and fails it if it does not finish in time.
///
/// Concurrency bugs in a pool tend to show up as hangs rather than assertion failures. Wrapping
/// threaded tests in this turns a hang into a test failure after 10 seconds (60 under Miri).
///
/// The watchdog is bypassed when the `MUTATION_TESTING` environment variable is "1", leaving it to
/// the mutation testing tool to detect hanging mutants with its own timeout.
///
/// # Panics
///
/// Panics if the test does not finish in time. A panic inside the test is resumed on the calling
/// thread with its original payload.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let sum = with_watchdog(|| 2 + 2);
/// assert_eq!(sum, 4);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if watchdog_disabled() {
        return test_fn();
    }

    let timeout = if cfg!(miri) { MIRI_TIMEOUT } else { TIMEOUT };

    // Only signals completion. The result itself travels back through `join()`.
    let (finished_tx, finished_rx) = mpsc::sync_channel::<()>(1);

    let watched = thread::Builder::new()
        .name("watched-test".to_owned())
        .spawn(move || {
            let result = test_fn();
            // Nobody is listening any more if the watchdog already gave up.
            _ = finished_tx.send(());
            result
        })
        .expect("spawning the watched test thread should succeed");

    match finished_rx.recv_timeout(timeout) {
        // A panicking test drops the sender without sending, which shows up as a disconnect.
        Ok(()) | Err(RecvTimeoutError::Disconnected) => match watched.join() {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        },
        Err(RecvTimeoutError::Timeout) => {
            panic!("watched test did not finish within {timeout:?}")
        }
    }
}

fn watchdog_disabled() -> bool {
    env::var(DISABLE_VARIABLE).is_ok_and(|value| value == "1")
}

/// Counts how many [`Tracked`] values created from it have been dropped.
///
/// Pools dispose of items by dropping them, so this is how tests observe that an item was
/// discarded rather than retained.
///
/// # Example
///
/// ```rust
/// use testing::DropCounter;
///
/// let counter = DropCounter::new();
/// let item = counter.track();
///
/// assert_eq!(counter.dropped(), 0);
/// drop(item);
/// assert_eq!(counter.dropped(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct DropCounter {
    created: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
}

impl DropCounter {
    /// Creates a counter with no tracked values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new value whose drop will be recorded by this counter.
    ///
    /// Each value gets a unique sequence number, starting from zero.
    #[must_use]
    pub fn track(&self) -> Tracked {
        let id = self.created.fetch_add(1, Ordering::Relaxed);

        Tracked {
            id,
            dropped: Arc::clone(&self.dropped),
            payload: Vec::new(),
        }
    }

    /// How many tracked values have been created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// How many tracked values have been dropped.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// How many tracked values are still alive.
    #[must_use]
    pub fn alive(&self) -> usize {
        self.created().saturating_sub(self.dropped())
    }
}

/// A test double that reports its own drop to the [`DropCounter`] that created it.
///
/// Carries a mutable payload so tests can detect state leaking between users of the same item.
#[derive(Debug)]
pub struct Tracked {
    id: usize,
    dropped: Arc<AtomicUsize>,

    /// Arbitrary scratch data for tests to mutate.
    pub payload: Vec<u32>,
}

impl Tracked {
    /// The sequence number assigned by [`DropCounter::track()`].
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}
