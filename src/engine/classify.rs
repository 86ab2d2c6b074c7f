use super::WatchState;

pub const DEFAULT_MIN_PROGRESS: f64 = 0.03;
pub const DEFAULT_COMPLETE_THRESHOLD: f64 = 0.95;

// Absorbs rounding in `duration * threshold / duration`.
const FRACTION_EPSILON: f64 = 1e-9;

/// Fractions of a duration that separate unseen, in-progress and completed views.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub min_progress: f64,
    pub complete: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_progress: DEFAULT_MIN_PROGRESS,
            complete: DEFAULT_COMPLETE_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn new(min_progress: f64, complete: f64) -> Result<Self, String> {
        if !min_progress.is_finite() || !complete.is_finite() {
            return Err("thresholds must be finite".to_string());
        }
        if min_progress < 0.0 {
            return Err(format!("minimum progress {min_progress} is negative"));
        }
        if complete > 1.0 {
            return Err(format!("completion threshold {complete} exceeds 1.0"));
        }
        if min_progress >= complete {
            return Err(format!(
                "minimum progress {min_progress} must be below completion threshold {complete}"
            ));
        }
        Ok(Self {
            min_progress,
            complete,
        })
    }

    pub fn classify(&self, position: f64, duration: f64) -> WatchState {
        classify(position, duration, self)
    }
}

/// `position / duration` clamped to `0.0..=1.0`. Zero for an unknown duration.
pub fn progress_fraction(position: f64, duration: f64) -> f64 {
    if duration.is_nan() || duration <= 0.0 || !position.is_finite() {
        return 0.0;
    }
    (position / duration).clamp(0.0, 1.0)
}

pub fn classify(position: f64, duration: f64, thresholds: &Thresholds) -> WatchState {
    let fraction = progress_fraction(position, duration);
    if fraction + FRACTION_EPSILON >= thresholds.complete {
        WatchState::Completed
    } else if fraction + FRACTION_EPSILON < thresholds.min_progress {
        WatchState::Unseen
    } else {
        WatchState::InProgress
    }
}
