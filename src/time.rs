use std::time::Duration;

use chrono::Utc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Current wall-clock time in milliseconds since the unix epoch.
pub fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// A repeating timer whose first tick happens one full `period` from now.
///
/// Unlike [tokio::time::interval], nothing fires immediately, matching how a page timer behaves.
pub fn timer(period: Duration) -> Interval {
    let start = Instant::now() + period;

    let mut timer = tokio::time::interval_at(start, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timer_does_not_fire_immediately() {
        let start = Instant::now();
        let mut timer = timer(Duration::from_millis(300));

        let first = timer.tick().await;
        assert_eq!(
            first - start,
            Duration::from_millis(300),
            "first tick should be one period away"
        );

        let second = timer.tick().await;
        assert_eq!(second - first, Duration::from_millis(300));
    }

    #[test]
    fn epoch_millis_is_after_2020() {
        assert!(epoch_millis() > 1_577_836_800_000);
    }
}
