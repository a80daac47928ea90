//! Compressed drift summary for dashboard consumers

use rust_decimal::Decimal;
use serde::Serialize;

use super::{AllocationAnalysis, DriftStatus};

/// Overall state reported to dashboards; `NoStrategy` when the user has no
/// active strategy to reconcile against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SummaryStatus {
    Ok,
    Warning,
    Critical,
    NoStrategy,
}

impl SummaryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStatus::Ok => "OK",
            SummaryStatus::Warning => "WARNING",
            SummaryStatus::Critical => "CRITICAL",
            SummaryStatus::NoStrategy => "NO_STRATEGY",
        }
    }
}

impl From<DriftStatus> for SummaryStatus {
    fn from(status: DriftStatus) -> Self {
        match status {
            DriftStatus::Ok => SummaryStatus::Ok,
            DriftStatus::Warning => SummaryStatus::Warning,
            DriftStatus::Critical => SummaryStatus::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriftDirection {
    Over,
    Under,
}

impl DriftDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftDirection::Over => "OVER",
            DriftDirection::Under => "UNDER",
        }
    }
}

/// An asset class whose drift has crossed the strategy threshold
#[derive(Debug, Clone, Serialize)]
pub struct CategoryDrift {
    pub name: String,
    pub drift_percent: Decimal,
    pub direction: DriftDirection,
}

/// Compressed form of the allocation analysis
#[derive(Debug, Clone, Serialize)]
pub struct DriftSummary {
    pub has_active_strategy: bool,
    pub overall_status: SummaryStatus,
    pub max_drift: Decimal,
    pub drift_threshold: Decimal,
    pub categories_over_threshold: Vec<CategoryDrift>,
}

/// Compress an analysis into the dashboard shape. A missing analysis (no
/// active strategy) reports `NO_STRATEGY` with zeroed numerics and the
/// supplied default threshold.
pub fn build_summary(
    analysis: Option<&AllocationAnalysis>,
    default_threshold: Decimal,
) -> DriftSummary {
    let Some(analysis) = analysis else {
        return DriftSummary {
            has_active_strategy: false,
            overall_status: SummaryStatus::NoStrategy,
            max_drift: Decimal::ZERO,
            drift_threshold: default_threshold,
            categories_over_threshold: Vec::new(),
        };
    };

    let categories_over_threshold = analysis
        .classes
        .iter()
        .filter(|c| c.drift_percent.abs() >= analysis.drift_threshold)
        .map(|c| CategoryDrift {
            name: c.asset_class.as_str().to_string(),
            drift_percent: c.drift_percent,
            direction: if c.drift_percent >= Decimal::ZERO {
                DriftDirection::Over
            } else {
                DriftDirection::Under
            },
        })
        .collect();

    DriftSummary {
        has_active_strategy: true,
        overall_status: analysis.overall_status.into(),
        max_drift: analysis.max_drift,
        drift_threshold: analysis.drift_threshold,
        categories_over_threshold,
    }
}
