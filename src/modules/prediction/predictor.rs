use std::fmt;

use tracing::debug;

use super::regression::{LinearFit, RegressionAccumulator};
use crate::modules::catalog::Event;
use crate::modules::tracking::sample::RankSample;
use crate::util::{format_estimate, DAY_MS, HOUR_MS};

/// Samples between smoothing refits.
pub(crate) const SMOOTHING_STEP: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Projection {
    pub(crate) estimate: f64,
    pub(crate) error: f64,
    pub(crate) smoothed_estimate: f64,
    pub(crate) smoothed_error: f64,
    pub(crate) fit: LinearFit,
    pub(crate) rate: f64,
}

impl Projection {
    /// Trend line in points per hour, as shown in detailed output.
    pub(crate) fn equation(&self) -> String {
        format!(
            "score = {:.2} × {:.4} × hours + {:.0}",
            self.fit.slope * HOUR_MS as f64,
            self.rate,
            self.fit.intercept
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Prediction {
    /// Less than a day of data, or too few points to fit.
    Unavailable,
    Ready(Projection),
}

impl Prediction {
    pub(crate) fn projection(&self) -> Option<&Projection> {
        match self {
            Self::Unavailable => None,
            Self::Ready(projection) => Some(projection),
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => fmt.write_str("N/A"),
            Self::Ready(p) => write!(
                fmt,
                "{} ± {}",
                format_estimate(p.estimate),
                format_estimate(p.error)
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    half_day_idx: usize,
    one_day_idx: usize,
    last_day_idx: usize,
}

impl Window {
    /// Locates the 12h and 24h marks and the start of the final aggregation
    /// day. Samples must be sorted by timestamp.
    fn locate(samples: &[RankSample], event: &Event) -> Option<Self> {
        let half_day_idx = samples
            .iter()
            .position(|s| s.timestamp - event.start_at >= DAY_MS / 2)?;
        let one_day_idx = samples
            .iter()
            .position(|s| s.timestamp - event.start_at >= DAY_MS)?;
        let last_day_idx = samples
            .iter()
            .position(|s| s.timestamp >= event.aggregate_at - DAY_MS)
            .unwrap_or(samples.len());

        if last_day_idx < half_day_idx + 2 {
            return None;
        }

        Some(Self {
            half_day_idx,
            one_day_idx,
            last_day_idx,
        })
    }

    fn points<'a>(&self, samples: &'a [RankSample]) -> &'a [RankSample] {
        &samples[self.half_day_idx..self.last_day_idx]
    }
}

fn elapsed(sample: &RankSample, event: &Event) -> f64 {
    (sample.timestamp - event.start_at) as f64
}

/// Trend line over the mid-event window, without any final-day adjustment.
pub(crate) fn fit_trend(samples: &[RankSample], event: &Event) -> Option<LinearFit> {
    let window = Window::locate(samples, event)?;
    let mut acc = RegressionAccumulator::new();
    for sample in window.points(samples) {
        acc.push(elapsed(sample, event), sample.score as f64);
    }
    acc.fit()
}

/// Trend value at `x` with the slope scaled by the final rate.
fn project(fit: &LinearFit, rate: f64, x: f64) -> f64 {
    fit.slope * rate * x + fit.intercept
}

/// Mean absolute deviation from the rate-adjusted trend, scaled up to the
/// full event length.
fn standard_error(points: &[RankSample], event: &Event, fit: &LinearFit, rate: f64) -> f64 {
    let Some(last) = points.last() else {
        return 0.0;
    };
    let last_elapsed = elapsed(last, event);
    if last_elapsed <= 0.0 {
        return 0.0;
    }

    let deviation = points
        .iter()
        .map(|s| (s.score as f64 - project(fit, rate, elapsed(s, event))).abs())
        .sum::<f64>()
        / points.len() as f64;

    deviation * (event.duration() as f64 / last_elapsed)
}

/// Projects the final score of a tier from its samples so far.
///
/// The primary estimate fits one line over the 12h mark up to the final day.
/// The smoothed estimate refits over an expanding window every
/// [`SMOOTHING_STEP`] samples past the 24h mark and averages the projections,
/// weighted by the square of the event fraction each refit had seen.
pub(crate) fn predict(samples: &[RankSample], event: &Event, final_rate: f64) -> Prediction {
    let Some(window) = Window::locate(samples, event) else {
        return Prediction::Unavailable;
    };

    let duration = event.duration() as f64;
    let mut acc = RegressionAccumulator::new();
    let mut refits: Vec<(f64, f64)> = Vec::new();

    for (idx, sample) in samples
        .iter()
        .enumerate()
        .take(window.last_day_idx)
        .skip(window.half_day_idx)
    {
        let x = elapsed(sample, event);
        acc.push(x, sample.score as f64);

        let is_refit_point =
            idx >= window.one_day_idx && (idx - window.one_day_idx) % SMOOTHING_STEP == 0;
        if is_refit_point {
            if let Some(fit) = acc.fit() {
                let weight = (x / duration).powi(2);
                refits.push((project(&fit, final_rate, duration), weight));
            }
        }
    }

    let Some(fit) = acc.fit() else {
        return Prediction::Unavailable;
    };

    let estimate = project(&fit, final_rate, duration);
    let error = standard_error(window.points(samples), event, &fit, final_rate);

    let weight_sum: f64 = refits.iter().map(|(_, w)| w).sum();
    let (smoothed_estimate, smoothed_error) = if weight_sum > 0.0 {
        let smoothed = refits.iter().map(|(p, w)| p * w).sum::<f64>() / weight_sum;
        let spread = refits
            .iter()
            .map(|(p, w)| (p - smoothed).abs() * w)
            .sum::<f64>()
            / weight_sum;
        (smoothed, spread.max(error))
    } else {
        (estimate, error)
    };

    debug!(
        event_id = event.id,
        points = acc.len(),
        refits = refits.len(),
        estimate,
        smoothed_estimate,
        "cutoff prediction"
    );

    Prediction::Ready(Projection {
        estimate,
        error,
        smoothed_estimate,
        smoothed_error,
        fit,
        rate: final_rate,
    })
}
