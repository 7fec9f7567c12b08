//! Monthly sales history and the seasonality, trend and forecast signals

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDateTime};

use super::types::SignalMap;
use crate::domain::product::ProductId;
use crate::domain::sales::SalesLine;

pub const DEFAULT_TREND_WINDOW: usize = 4;

/// Fewer points than this fall back to the last observed value.
const FORECAST_MIN_POINTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(timestamp: &NaiveDateTime) -> Self {
        Self { year: timestamp.year(), month: timestamp.month() }
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Quantity per month, oldest first.
pub type MonthlySeries = BTreeMap<YearMonth, f64>;

pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Sums quantities per product and calendar month across both channels.
pub fn monthly_totals<'a>(
    lines: impl IntoIterator<Item = &'a SalesLine>,
) -> HashMap<ProductId, MonthlySeries> {
    let mut monthly: HashMap<ProductId, MonthlySeries> = HashMap::new();
    for line in lines {
        *monthly
            .entry(line.product_id)
            .or_default()
            .entry(YearMonth::of(&line.occurred_at))
            .or_insert(0.0) += line.quantity as f64;
    }
    monthly
}

/// Logistic of the current month's z-score within the product's history.
/// A flat history maps to `logistic(1)` when the current month sold and to
/// `logistic(0)` otherwise.
pub fn seasonality(series: &MonthlySeries, current: YearMonth) -> f64 {
    if series.is_empty() {
        return 0.0;
    }

    let count = series.len() as f64;
    let mean = series.values().sum::<f64>() / count;
    let variance = series.values().map(|value| (value - mean).powi(2)).sum::<f64>() / count;
    let std_dev = variance.sqrt();
    let current_value = series.get(&current).copied().unwrap_or(0.0);

    let z = if std_dev > 0.0 {
        (current_value - mean) / std_dev
    } else if current_value > 0.0 {
        1.0
    } else {
        0.0
    };

    logistic(z)
}

/// Logistic of the newest month's growth over the average of up to
/// `window - 1` months before it.
pub fn trend(series: &MonthlySeries, window: usize) -> f64 {
    let recent: Vec<f64> = series.values().rev().take(window.max(1)).copied().collect();
    let Some((&last, previous)) = recent.split_first() else {
        return 0.0;
    };

    let previous_average = if previous.is_empty() {
        last.max(1.0)
    } else {
        previous.iter().sum::<f64>() / previous.len() as f64
    };

    let growth = if previous_average > 0.0 {
        (last - previous_average) / previous_average.max(1.0)
    } else {
        0.0
    };

    logistic(growth)
}

/// Next-month quantity from an ordinary least-squares line over the month
/// index. Short histories and degenerate fits return the last value. Never
/// negative.
pub fn forecast_next(series: &MonthlySeries) -> f64 {
    let values: Vec<f64> = series.values().copied().collect();
    let Some(&last) = values.last() else {
        return 0.0;
    };

    if values.len() < FORECAST_MIN_POINTS {
        return last.max(0.0);
    }

    let n = values.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xx, mut sum_xy) = (0.0, 0.0, 0.0, 0.0);
    for (index, y) in values.iter().enumerate() {
        let x = index as f64;
        sum_x += x;
        sum_y += y;
        sum_xx += x * x;
        sum_xy += x * y;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    let prediction = if denominator.abs() < 1e-9 {
        last
    } else {
        let slope = (n * sum_xy - sum_x * sum_y) / denominator;
        let intercept = (sum_y - slope * sum_x) / n;
        intercept + slope * n
    };

    prediction.max(0.0)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemporalSignals {
    pub season: SignalMap,
    pub trend: SignalMap,
    /// Normalized by the largest prediction.
    pub forecast: SignalMap,
}

#[derive(Debug, Clone, Copy)]
pub struct TemporalAnalytics {
    trend_window: usize,
}

impl Default for TemporalAnalytics {
    fn default() -> Self {
        Self { trend_window: DEFAULT_TREND_WINDOW }
    }
}

impl TemporalAnalytics {
    pub fn new(trend_window: usize) -> Self {
        Self { trend_window }
    }

    /// Signals for every product with history; `as_of` fixes the current month.
    pub fn score<'a>(
        &self,
        lines: impl IntoIterator<Item = &'a SalesLine>,
        as_of: NaiveDateTime,
    ) -> TemporalSignals {
        let current = YearMonth::of(&as_of);
        let monthly = monthly_totals(lines);

        let mut signals = TemporalSignals::default();
        for (product_id, series) in &monthly {
            signals.season.insert(*product_id, seasonality(series, current));
            signals.trend.insert(*product_id, trend(series, self.trend_window));
            signals.forecast.insert(*product_id, forecast_next(series));
        }
        signals.forecast.normalize_by_max();

        signals
    }
}
