#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::LazyLock;
use std::time::Instant;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

struct Uptime;

impl FormatTime for Uptime {
    fn format_time(&self, w: &mut Writer<'_>) -> core::fmt::Result {
        let elapsed = START_TIME.elapsed();
        let secs = elapsed.as_secs();
        let millis = elapsed.subsec_millis();
        write!(w, "{:4}.{:03}s", secs, millis)
    }
}

/// Lazy initialization of the global tracing subscriber.
///
/// This ensures the subscriber is set up exactly once, regardless of how many
/// tests run in the same process.
static SUBSCRIBER_INIT: LazyLock<()> = LazyLock::new(|| {
    // Force start time initialization
    let _ = *START_TIME;

    let filter = std::env::var("VENEER_LOG")
        .ok()
        .and_then(|s| s.parse::<Targets>().ok())
        .unwrap_or_else(|| Targets::new().with_default(tracing::Level::TRACE));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_timer(Uptime)
                .with_target(false)
                .with_level(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .with(filter)
        .try_init()
        .ok();
});

/// Set up a tracing subscriber for tests.
///
/// Initialized exactly once per process via [`LazyLock`], so it is safe to
/// call from every test. Set `VENEER_LOG` (a [`Targets`] filter string) to
/// control verbosity.
pub fn setup() {
    #[allow(clippy::let_unit_value)]
    let _ = *SUBSCRIBER_INIT;
}

/// Shared lifetime-event tally for probe values.
///
/// Declare one as a `static`, hand it to [`Counted`] probes, and assert on
/// the totals after exercising whatever owns them.
#[derive(Debug, Default)]
pub struct Counters {
    created: AtomicUsize,
    cloned: AtomicUsize,
    dropped: AtomicUsize,
}

impl Counters {
    /// A zeroed tally.
    pub const fn new() -> Self {
        Self {
            created: AtomicUsize::new(0),
            cloned: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Probes built with [`Counted::new`].
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Probes built by cloning.
    pub fn cloned(&self) -> usize {
        self.cloned.load(Ordering::SeqCst)
    }

    /// Probes dropped so far.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Probes currently alive.
    pub fn live(&self) -> usize {
        self.created() + self.cloned() - self.dropped()
    }
}

/// A value that reports its construction, cloning, and destruction to a
/// [`Counters`].
///
/// Carries an `i64` payload so tests can also check that the right value
/// ended up in the right place.
#[derive(Debug)]
pub struct Counted {
    /// The payload.
    pub value: i64,
    counters: &'static Counters,
}

impl Counted {
    /// Build a probe and record the construction.
    pub fn new(counters: &'static Counters, value: i64) -> Self {
        counters.created.fetch_add(1, Ordering::SeqCst);
        Self { value, counters }
    }
}

impl Clone for Counted {
    fn clone(&self) -> Self {
        self.counters.cloned.fetch_add(1, Ordering::SeqCst);
        Self {
            value: self.value,
            counters: self.counters,
        }
    }
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.counters.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_tracks_clone_and_drop() {
        static COUNTERS: Counters = Counters::new();
        let a = Counted::new(&COUNTERS, 7);
        let b = a.clone();
        assert_eq!(COUNTERS.created(), 1);
        assert_eq!(COUNTERS.cloned(), 1);
        assert_eq!(COUNTERS.live(), 2);
        drop(a);
        drop(b);
        assert_eq!(COUNTERS.dropped(), 2);
        assert_eq!(COUNTERS.live(), 0);
    }
}
