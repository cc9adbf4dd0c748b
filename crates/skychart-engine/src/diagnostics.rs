//! Recompute diagnostics: timing and counts for each stage.
//!
//! [`ViewCalculator::recompute_with_diagnostics`](crate::ViewCalculator::recompute_with_diagnostics)
//! collects these alongside the view state. They are meant for tuning
//! thresholds and spotting slow stages, not for driving behavior.
//!
//! Time is read through the [`Clock`] trait so the crate stays free of a
//! platform clock and tests can supply a deterministic source. Durations
//! are serialized as fractional seconds (`f64`) for JSON compatibility,
//! since `std::time::Duration` does not implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Time source for stage timings.
///
/// Keeps the engine free of a platform clock; the caller supplies one.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom("duration seconds must be finite and non-negative")
        })
    }
}

/// Diagnostics collected from a single recompute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecomputeDiagnostics {
    /// Horizontal conversion, projection and visibility filter.
    pub projection: StageDiagnostics,
    /// Boundary segmentation across all regions.
    pub segmentation: StageDiagnostics,
    /// Region index build.
    pub indexing: StageDiagnostics,
    /// Connector line resolution.
    pub connectors: StageDiagnostics,
    /// Wall-clock duration of the whole recompute (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts.
    pub summary: RecomputeSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Projection and filtering.
    Projection {
        /// Objects in the catalog.
        catalog_count: usize,
        /// Objects at or above the altitude floor.
        in_view_count: usize,
        /// In-view objects that also pass the magnitude limit.
        visible_count: usize,
    },
    /// Boundary segmentation.
    Segmentation {
        /// Boundary polylines walked.
        polyline_count: usize,
        /// Boundary points examined.
        points_in: usize,
        /// Points dropped below the horizon cutoff.
        below_cutoff: usize,
        /// Segments kept.
        kept_segments: usize,
        /// Runs discarded for being too short.
        discarded_runs: usize,
    },
    /// Region index build.
    Indexing {
        /// Regions with at least one segment.
        region_count: usize,
        /// Polygons in the index.
        polygon_count: usize,
    },
    /// Connector line resolution.
    Connectors {
        /// Line pairs in the catalog.
        pairs: usize,
        /// Pairs with both endpoints in view.
        resolved: usize,
    },
}

/// High-level summary counts for a recompute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecomputeSummary {
    /// Objects in the catalog.
    pub catalog_count: usize,
    /// Objects in the id index.
    pub in_view_count: usize,
    /// Objects in the visible list.
    pub visible_count: usize,
    /// Boundary segments kept.
    pub segment_count: usize,
    /// Connector lines resolved.
    pub connector_count: usize,
}

impl RecomputeDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Recompute Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Objects: {} catalog, {} in view, {} visible",
            self.summary.catalog_count, self.summary.in_view_count, self.summary.visible_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Projection", &self.projection),
            ("Segmentation", &self.segmentation),
            ("Indexing", &self.indexing),
            ("Connectors", &self.connectors),
        ];
        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Segments: {}  |  Connector lines: {}",
            self.summary.segment_count, self.summary.connector_count,
        ));

        lines.join("\n")
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Projection {
            catalog_count,
            in_view_count,
            visible_count,
        } => format!("{catalog_count} objects -> {in_view_count} in view -> {visible_count} visible"),
        StageMetrics::Segmentation {
            polyline_count,
            points_in,
            below_cutoff,
            kept_segments,
            discarded_runs,
        } => format!(
            "{polyline_count} polylines, {points_in} pts ({below_cutoff} below cutoff), {kept_segments} kept, {discarded_runs} short",
        ),
        StageMetrics::Indexing {
            region_count,
            polygon_count,
        } => format!("{region_count} regions, {polygon_count} polygons"),
        StageMetrics::Connectors { pairs, resolved } => {
            format!("{resolved}/{pairs} pairs resolved")
        }
    }
}
