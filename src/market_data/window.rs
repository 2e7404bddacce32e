// =============================================================================
// Price Window — bounded trailing window of OHLCV samples
// =============================================================================
//
// Thread-safe ring of the most recent `cap` price points, oldest first.
// Timestamps are strictly monotonic: a sample that does not advance the
// clock is dropped rather than corrupting the series.
//
// On a cold start the window backfills synthetic history around the first
// live rate so SMA-20 and RSI-14 have full coverage from the very first
// analysis run; with fewer samples the indicators degrade gracefully
// upstream.
// =============================================================================

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand::Rng;
use tracing::{debug, info};

use crate::types::PricePoint;

pub struct PriceWindow {
    points: RwLock<VecDeque<PricePoint>>,
    cap: usize,
}

impl PriceWindow {
    /// Create an empty window retaining at most `cap` samples.
    pub fn new(cap: usize) -> Self {
        Self {
            points: RwLock::new(VecDeque::with_capacity(cap)),
            cap: cap.max(1),
        }
    }

    /// Seed `days` daily samples of synthetic history ending just before
    /// `now`, random-walking backwards in time from `rate` (±0.5% per step).
    /// No-op when the window already holds data.
    pub fn backfill(&self, rate: f64, days: usize, now: DateTime<Utc>) {
        let mut points = self.points.write();
        if !points.is_empty() {
            return;
        }

        let mut rng = rand::thread_rng();
        let mut close = rate;

        let mut history: Vec<PricePoint> = (1..=days)
            .map(|back| {
                let change: f64 = rng.gen_range(-0.005..0.005);
                let open = close;
                close = (open * (1.0 + change)).max(f64::MIN_POSITIVE);
                PricePoint {
                    timestamp: now - Duration::days(back as i64),
                    open,
                    high: open.max(close) * 1.002,
                    low: open.min(close) * 0.998,
                    close,
                    volume: rng.gen_range(50_000..150_000) as f64,
                }
            })
            .collect();

        // Generated newest-to-oldest; the window stores oldest first.
        history.reverse();
        points.extend(history);

        info!(samples = points.len(), seed_rate = rate, "price window backfilled");
    }

    /// Append a live sample built around `rate`. Returns false when the
    /// timestamp does not advance past the newest stored sample.
    pub fn push_rate(&self, rate: f64, now: DateTime<Utc>) -> bool {
        let mut points = self.points.write();

        if let Some(last) = points.back() {
            if now <= last.timestamp {
                debug!(ts = %now, "non-monotonic sample dropped");
                return false;
            }
        }

        let volume = rand::thread_rng().gen_range(50_000..150_000) as f64;
        points.push_back(PricePoint {
            timestamp: now,
            open: rate,
            high: rate * 1.001,
            low: rate * 0.999,
            close: rate,
            volume,
        });

        while points.len() > self.cap {
            points.pop_front();
        }

        true
    }

    /// Closes in chronological order (oldest -> newest).
    pub fn closes(&self) -> Vec<f64> {
        self.points.read().iter().map(|p| p.close).collect()
    }

    /// The most recent sample, if any.
    pub fn latest(&self) -> Option<PricePoint> {
        self.points.read().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.read().is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn backfill_produces_full_coverage() {
        let window = PriceWindow::new(30);
        window.backfill(1.10, 30, t0());
        assert_eq!(window.len(), 30);

        let closes = window.closes();
        assert_eq!(closes.len(), 30);
        assert!(closes.iter().all(|c| *c > 0.0));
    }

    #[test]
    fn backfill_is_a_noop_when_data_exists() {
        let window = PriceWindow::new(30);
        window.push_rate(1.10, t0());
        window.backfill(1.10, 30, t0() + Duration::hours(1));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn push_trims_to_cap() {
        let window = PriceWindow::new(3);
        for i in 0..5 {
            assert!(window.push_rate(1.0 + i as f64 * 0.01, t0() + Duration::minutes(i)));
        }
        assert_eq!(window.len(), 3);
        let closes = window.closes();
        assert!((closes[0] - 1.02).abs() < 1e-12);
        assert!((closes[2] - 1.04).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_monotonic_timestamps() {
        let window = PriceWindow::new(10);
        assert!(window.push_rate(1.10, t0()));
        assert!(!window.push_rate(1.11, t0()));
        assert!(!window.push_rate(1.11, t0() - Duration::minutes(1)));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn latest_reflects_newest_sample() {
        let window = PriceWindow::new(10);
        window.push_rate(1.10, t0());
        window.push_rate(1.12, t0() + Duration::minutes(1));
        let latest = window.latest().unwrap();
        assert!((latest.close - 1.12).abs() < 1e-12);
        assert!(latest.high > latest.close && latest.low < latest.close);
    }

    #[test]
    fn backfilled_timestamps_precede_now() {
        let window = PriceWindow::new(30);
        window.backfill(1.10, 10, t0());
        let latest = window.latest().unwrap();
        assert!(latest.timestamp < t0());
        // A live push at `now` is still monotonic after backfill.
        assert!(window.push_rate(1.10, t0()));
    }
}
