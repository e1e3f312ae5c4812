use std::sync::OnceLock;
use std::time::Instant;

/// Monotonic time source shared by the controller and the decision path.
///
/// Timestamps are nanoseconds on a single process-wide monotonic anchor, the
/// userspace equivalent of the kernel's boot clock. Both sides of the device
/// record must read the same epoch.
pub trait Clock: Send + Sync {
    fn now_ns(&self) -> u64;
}

static ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Production clock: nanoseconds since the first reading in this process.
///
/// Offset by one so a live timestamp can never collide with the
/// "unauthorized" sentinel value 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        #[allow(clippy::cast_possible_truncation)] // u64 ns covers ~584 years
        let elapsed = ANCHOR.get_or_init(Instant::now).elapsed().as_nanos() as u64;
        elapsed.saturating_add(1)
    }
}
