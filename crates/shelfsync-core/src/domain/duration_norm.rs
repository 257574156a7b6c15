//! Progress/duration unit normalization.
//!
//! ABS occasionally reports `currentTime` in milliseconds while `duration`
//! stays in seconds. This module isolates the detection and correction so the
//! engine never does unit arithmetic on raw floats directly.

/// Fallback total duration (seconds) used when ABS reports no duration at
/// all but a non-zero progress fraction.
pub const FALLBACK_DURATION_SECONDS: f64 = 10.0 * 3600.0;

/// Normalizes a `(currentTime, totalDuration)` pair that may have
/// `currentTime` expressed in milliseconds instead of seconds.
///
/// Detection rule: if the raw ratio `currentTime / totalDuration` exceeds
/// `1.0`, and dividing `currentTime` by `1000` brings the ratio into
/// `[0.001, 1.1]`, treat `currentTime` as milliseconds.
pub fn normalize_current_time(current_time_seconds: f64, total_duration_seconds: f64) -> f64 {
    if total_duration_seconds <= 0.0 {
        return current_time_seconds;
    }
    let raw_ratio = current_time_seconds / total_duration_seconds;
    if raw_ratio > 1.0 {
        let candidate = current_time_seconds / 1000.0;
        let candidate_ratio = candidate / total_duration_seconds;
        if (0.001..=1.1).contains(&candidate_ratio) {
            return candidate;
        }
    }
    current_time_seconds
}

/// Derives `targetProgressSeconds` per the priority order: explicit
/// current-time, then progress × total duration, then progress × the
/// fallback duration. Result is clamped to `>= 1` whenever it would
/// otherwise be a non-zero fraction that rounds down to zero.
pub fn target_progress_seconds(
    current_time_seconds: f64,
    total_duration_seconds: f64,
    progress: f64,
) -> i64 {
    let normalized = normalize_current_time(current_time_seconds, total_duration_seconds);

    let raw = if normalized > 0.0 {
        normalized
    } else if total_duration_seconds > 0.0 && progress > 0.0 {
        progress * total_duration_seconds
    } else if progress > 0.0 {
        progress * FALLBACK_DURATION_SECONDS
    } else {
        0.0
    };

    let rounded = raw.round() as i64;
    if rounded == 0 && raw > 0.0 {
        1
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_normalization_when_ratio_is_sane() {
        assert_eq!(normalize_current_time(1800.0, 3600.0), 1800.0);
    }

    #[test]
    fn detects_milliseconds_quirk() {
        // 1_800_000 / 3600 = 500, clearly bogus; /1000 gives 1800/3600 = 0.5.
        assert_eq!(normalize_current_time(1_800_000.0, 3600.0), 1800.0);
    }

    #[test]
    fn leaves_plain_overflow_alone_when_rescaled_ratio_is_out_of_range() {
        // Rescaling would give a ratio > 1.1, so this is left untouched.
        let value = normalize_current_time(10_000_000.0, 10.0);
        assert_eq!(value, 10_000_000.0);
    }

    #[test]
    fn target_progress_prefers_current_time() {
        let secs = target_progress_seconds(7200.0, 28800.0, 0.25);
        assert_eq!(secs, 7200);
    }

    #[test]
    fn target_progress_falls_back_to_progress_times_duration() {
        let secs = target_progress_seconds(0.0, 28800.0, 0.5);
        assert_eq!(secs, 14400);
    }

    #[test]
    fn target_progress_falls_back_to_ten_hours_when_no_duration() {
        let secs = target_progress_seconds(0.0, 0.0, 0.5);
        assert_eq!(secs, (0.5 * FALLBACK_DURATION_SECONDS).round() as i64);
    }

    #[test]
    fn target_progress_clamps_nonzero_fraction_up_to_one_second() {
        let secs = target_progress_seconds(0.0, 1_000_000.0, 0.0000001);
        assert_eq!(secs, 1);
    }

    #[test]
    fn unit_normalization_matches_documented_scenario() {
        let normalized = normalize_current_time(1_800_000.0, 3600.0);
        assert_eq!(normalized, 1800.0);
        let progress = normalized / 3600.0;
        assert!((progress - 0.5).abs() < f64::EPSILON);
    }
}
