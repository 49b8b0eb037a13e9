// ============================================================================
// subforge-core/src/progress.rs
// ============================================================================
//
// PROGRESS PARSING: Frame Counters and Status Lines from Converter Output
//
// Converters print free-form text. Two patterns are recognized:
// - a frame counter, e.g. "Processing frame 120/1450"
// - a status line, e.g. "Status: Loading trained data"
//
// Frame samples feed an exponentially weighted throughput estimate
// (70% previous, 30% new) used to project the remaining time. Output with
// no recognizable markers leaves progress indeterminate, never an error.

// ---- External crate imports ----
use once_cell::sync::Lazy;
use regex::Regex;

// ---- Standard library imports ----
use std::time::{Duration, Instant};

static FRAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)frame\s+(\d+)\s*/\s*(\d+)").expect("frame pattern compiles"));

static STATUS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)status:\s*(.+?)\s*$").expect("status pattern compiles"));

/// Weight kept from the previous throughput estimate.
pub const SMOOTHING_PREVIOUS_WEIGHT: f64 = 0.7;

/// Something a converter line told us.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    Frame { current: u64, total: u64 },
    Status(String),
}

/// Point-in-time view used for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub elapsed: Duration,
    /// Projected time left, if a throughput estimate exists.
    pub remaining: Option<Duration>,
    /// Completed fraction in `0.0..=1.0`, if a frame counter was seen.
    pub fraction: Option<f64>,
}

/// Smoothed frames-per-second estimate.
#[derive(Debug, Clone, Default)]
pub struct ThroughputEstimator {
    last_sample: Option<(u64, Instant)>,
    rate: Option<f64>,
}

impl ThroughputEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `frame` had been reached at `at`.
    pub fn record(&mut self, frame: u64, at: Instant) {
        if let Some((prev_frame, prev_at)) = self.last_sample {
            let secs = at.saturating_duration_since(prev_at).as_secs_f64();
            if frame > prev_frame && secs > 0.0 {
                let sample = (frame - prev_frame) as f64 / secs;
                self.rate = Some(match self.rate {
                    Some(old) => {
                        SMOOTHING_PREVIOUS_WEIGHT * old + (1.0 - SMOOTHING_PREVIOUS_WEIGHT) * sample
                    }
                    None => sample,
                });
            }
        }
        if self.last_sample.is_none_or(|(prev, _)| frame >= prev) {
            self.last_sample = Some((frame, at));
        }
    }

    /// Current smoothed rate in frames per second.
    pub fn rate(&self) -> Option<f64> {
        self.rate
    }

    /// Projects the time needed to reach `total`, measured from `now`.
    pub fn remaining(&self, total: u64, now: Instant) -> Option<Duration> {
        let rate = self.rate.filter(|r| *r > 0.0 && r.is_finite())?;
        let (frame, at) = self.last_sample?;
        let left = total.saturating_sub(frame) as f64 / rate;
        let since = now.saturating_duration_since(at).as_secs_f64();
        Some(Duration::from_secs_f64((left - since).max(0.0)))
    }
}

/// Line-oriented parser with the running estimate for one conversion.
#[derive(Debug, Clone, Default)]
pub struct ProgressParser {
    estimator: ThroughputEstimator,
    frame: Option<(u64, u64)>,
    status: Option<String>,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspects one line of converter output.
    pub fn observe_line(&mut self, line: &str, now: Instant) -> Option<ProgressUpdate> {
        if let Some(caps) = FRAME_PATTERN.captures(line) {
            let current = caps.get(1)?.as_str().parse::<u64>().ok()?;
            let total = caps.get(2)?.as_str().parse::<u64>().ok()?;
            self.estimator.record(current, now);
            self.frame = Some((current, total));
            return Some(ProgressUpdate::Frame { current, total });
        }
        if let Some(caps) = STATUS_PATTERN.captures(line) {
            let text = caps.get(1)?.as_str().to_string();
            self.status = Some(text.clone());
            return Some(ProgressUpdate::Status(text));
        }
        None
    }

    /// Latest frame counter, if any.
    pub fn frame(&self) -> Option<(u64, u64)> {
        self.frame
    }

    /// Latest status text, if any.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// True until a frame counter has been seen.
    pub fn is_indeterminate(&self) -> bool {
        self.fraction().is_none()
    }

    /// Completed fraction, if a frame counter with a non-zero total was seen.
    pub fn fraction(&self) -> Option<f64> {
        match self.frame {
            Some((current, total)) if total > 0 => Some((current as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }

    /// Builds a display snapshot for a conversion started at `started`.
    pub fn snapshot(&self, started: Instant, now: Instant) -> ProgressSnapshot {
        ProgressSnapshot {
            elapsed: now.saturating_duration_since(started),
            remaining: self
                .frame
                .and_then(|(_, total)| self.estimator.remaining(total, now)),
            fraction: self.fraction(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_frame_and_status_lines() {
        let mut parser = ProgressParser::new();
        let now = Instant::now();
        assert_eq!(
            parser.observe_line("Processing frame 12/400", now),
            Some(ProgressUpdate::Frame {
                current: 12,
                total: 400
            })
        );
        assert_eq!(
            parser.observe_line("Status: Running OCR  ", now),
            Some(ProgressUpdate::Status("Running OCR".into()))
        );
        assert_eq!(parser.observe_line("1\n00:00:01,000 --> 00:00:02,000", now), None);
        assert_eq!(parser.status(), Some("Running OCR"));
        assert_eq!(parser.frame(), Some((12, 400)));
    }

    #[test]
    fn no_markers_means_indeterminate() {
        let mut parser = ProgressParser::new();
        let start = Instant::now();
        parser.observe_line("some unrelated chatter", start);
        assert!(parser.is_indeterminate());
        let snap = parser.snapshot(start, start + Duration::from_secs(3));
        assert_eq!(snap.fraction, None);
        assert_eq!(snap.remaining, None);
        assert_eq!(snap.elapsed, Duration::from_secs(3));
    }

    #[test]
    fn throughput_is_smoothed() {
        let mut est = ThroughputEstimator::new();
        let t0 = Instant::now();
        est.record(0, t0);
        est.record(100, t0 + Duration::from_secs(1)); // 100 fps
        assert_eq!(est.rate(), Some(100.0));
        est.record(300, t0 + Duration::from_secs(2)); // 200 fps sample
        let rate = est.rate().unwrap();
        assert!((rate - 130.0).abs() < 1e-9, "got {rate}");

        let remaining = est.remaining(1600, t0 + Duration::from_secs(2)).unwrap();
        assert!((remaining.as_secs_f64() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn fraction_is_clamped() {
        let mut parser = ProgressParser::new();
        parser.observe_line("frame 12/10", Instant::now());
        assert_eq!(parser.fraction(), Some(1.0));
        parser.observe_line("frame 3/0", Instant::now());
        assert_eq!(parser.fraction(), None);
    }
}
