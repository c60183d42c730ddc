//! Snippet and play-more timings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationSecondsWithFrac, serde_as};

/// Tunable timing of snippets and local player reconciliation.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackTiming {
    /// Length of a snippet and of the local stop countdown.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub snippet_duration: Duration,
    /// Tail of the track never used as a snippet start.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub end_buffer: Duration,
    /// Local drift tolerated before a seek is issued.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub seek_tolerance: Duration,
    /// Delay between entering a playing phase and the drift check.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub settle_delay: Duration,
    /// Wait before re-reading a non-positive duration reported on ready.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub duration_retry_delay: Duration,
    /// Minimum remaining playback for "play more".
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub play_more_margin: Duration,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            snippet_duration: Duration::from_secs(10),
            end_buffer: Duration::from_secs(40),
            seek_tolerance: Duration::from_millis(1_500),
            settle_delay: Duration::from_millis(50),
            duration_retry_delay: Duration::from_millis(1_500),
            play_more_margin: Duration::from_millis(500),
        }
    }
}

impl PlaybackTiming {
    /// Largest allowed snippet start for a track of `duration` seconds.
    pub fn max_seek(&self, duration: f64) -> f64 {
        let reserved = self.snippet_duration.as_secs_f64() + self.end_buffer.as_secs_f64();
        (duration - reserved).max(0.0)
    }

    /// Snippet start for `duration`, `fraction` being a uniform sample in `[0, 1)`.
    pub fn snippet_seek_offset(&self, duration: f64, fraction: f64) -> f64 {
        self.max_seek(duration) * fraction.clamp(0.0, 1.0)
    }

    /// Whether a track of `duration` seconds can hold a snippet at all.
    pub fn fits_snippet(&self, duration: f64) -> bool {
        duration.is_finite() && duration >= self.snippet_duration.as_secs_f64()
    }

    /// "Play more" needs more than the margin left after `position`.
    pub fn can_play_more(&self, position: f64, duration: f64) -> bool {
        position.is_finite()
            && duration.is_finite()
            && position >= 0.0
            && duration > position + self.play_more_margin.as_secs_f64()
    }

    /// Whether local drift from `target` warrants a seek.
    pub fn needs_seek(&self, current: f64, target: f64) -> bool {
        (current - target).abs() > self.seek_tolerance.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_offset_stays_inside_the_allowed_window() {
        let timing = PlaybackTiming::default();
        for step in 0..100 {
            let fraction = step as f64 / 100.0;
            let offset = timing.snippet_seek_offset(180.0, fraction);
            assert!((0.0..=130.0).contains(&offset), "offset {offset} out of range");
        }
    }

    #[test]
    fn short_tracks_always_start_at_zero() {
        let timing = PlaybackTiming::default();
        assert_eq!(timing.max_seek(50.0), 0.0);
        assert_eq!(timing.snippet_seek_offset(50.0, 0.99), 0.0);
        assert_eq!(timing.snippet_seek_offset(12.0, 0.5), 0.0);
    }

    #[test]
    fn play_more_requires_remaining_margin() {
        let timing = PlaybackTiming::default();
        assert!(timing.can_play_more(10.0, 180.0));
        assert!(!timing.can_play_more(179.6, 180.0));
        assert!(!timing.can_play_more(180.0, 180.0));
        assert!(!timing.can_play_more(f64::NAN, 180.0));
    }

    #[test]
    fn drift_tolerance_is_exclusive() {
        let timing = PlaybackTiming::default();
        assert!(!timing.needs_seek(10.0, 11.5));
        assert!(timing.needs_seek(10.0, 11.6));
    }

    #[test]
    fn durations_deserialize_from_fractional_seconds() {
        let timing: PlaybackTiming =
            serde_json::from_str(r#"{ "snippet_duration": 7.5, "settle_delay": 0.1 }"#).unwrap();
        assert_eq!(timing.snippet_duration, Duration::from_millis(7_500));
        assert_eq!(timing.settle_delay, Duration::from_millis(100));
        assert_eq!(timing.end_buffer, Duration::from_secs(40));
    }
}
