//! Boundary segmentation: split a projected region outline into continuous
//! display-safe pieces.
//!
//! A region boundary is one closed polyline in equatorial coordinates. On
//! the display it breaks apart where it dips below the horizon cutoff, where
//! consecutive points land far apart, and where it crosses the azimuth branch
//! cut. The segmenter walks the points in order and flushes the current run
//! at each break. Runs shorter than [`BoundarySegment::MIN_POINTS`] are
//! dropped.

use chrono::{DateTime, Utc};

use crate::ephemeris::Ephemeris;
use crate::region::RegionId;
use crate::transform::{Projection, azimuth_delta, equatorial_to_horizontal};
use crate::types::{BoundarySegment, EngineConfig, Equatorial, Observer, Point};

/// Break thresholds used while walking a boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentThresholds {
    /// Points strictly below this altitude break the run and are dropped.
    pub horizon_cutoff: f64,
    /// Display distance above which a new run starts.
    pub gap: f64,
    /// At or below this altitude an azimuth jump starts a new run.
    pub near_zenith_altitude: f64,
    /// Azimuth delta above which a new run starts.
    pub azimuth_jump: f64,
}

impl SegmentThresholds {
    /// Thresholds from an engine config.
    #[must_use]
    pub const fn from_config(config: &EngineConfig) -> Self {
        Self {
            horizon_cutoff: config.boundary_horizon_cutoff,
            gap: config.boundary_gap_threshold,
            near_zenith_altitude: config.near_zenith_altitude,
            azimuth_jump: config.azimuth_jump_threshold,
        }
    }
}

/// A run of consecutive boundary points between two breaks.
///
/// `start` is the index of the run's first point in the input sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    /// Index of the first point in the input boundary.
    pub start: usize,
    /// Display points of the run.
    pub points: Vec<Point>,
}

/// Counters from one segmentation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentStats {
    /// Input points examined.
    pub points_in: usize,
    /// Points dropped for being below the horizon cutoff.
    pub below_cutoff: usize,
    /// Runs kept as segments.
    pub kept: usize,
    /// Runs discarded for having fewer than three points.
    pub discarded: usize,
}

impl std::ops::AddAssign for SegmentStats {
    fn add_assign(&mut self, rhs: Self) {
        self.points_in += rhs.points_in;
        self.below_cutoff += rhs.below_cutoff;
        self.kept += rhs.kept;
        self.discarded += rhs.discarded;
    }
}

/// Walks boundary polylines for one observer.
#[derive(Debug)]
pub struct BoundarySegmenter<'a, E: ?Sized> {
    ephemeris: &'a E,
    observer: &'a Observer,
    projection: Projection,
    thresholds: SegmentThresholds,
}

impl<'a, E: Ephemeris + ?Sized> BoundarySegmenter<'a, E> {
    /// Create a segmenter.
    #[must_use]
    pub const fn new(
        ephemeris: &'a E,
        observer: &'a Observer,
        projection: Projection,
        thresholds: SegmentThresholds,
    ) -> Self {
        Self {
            ephemeris,
            observer,
            projection,
            thresholds,
        }
    }

    /// Split a boundary into kept segments for `date`.
    #[must_use]
    pub fn segment(
        &self,
        region: RegionId,
        points: &[Equatorial],
        date: DateTime<Utc>,
    ) -> Vec<BoundarySegment> {
        self.segment_with_stats(region, points, date).0
    }

    /// Like [`segment`](Self::segment), also returning counters.
    #[must_use]
    pub fn segment_with_stats(
        &self,
        region: RegionId,
        points: &[Equatorial],
        date: DateTime<Utc>,
    ) -> (Vec<BoundarySegment>, SegmentStats) {
        let (runs, mut stats) = self.segment_runs_inner(points, date);
        let segments: Vec<BoundarySegment> = runs
            .into_iter()
            .filter_map(|run| BoundarySegment::new(region, run.points))
            .collect();
        stats.kept = segments.len();
        stats.discarded -= stats.kept;
        (segments, stats)
    }

    /// Every run between breaks, including ones too short to keep.
    #[must_use]
    pub fn segment_runs(&self, points: &[Equatorial], date: DateTime<Utc>) -> Vec<Run> {
        self.segment_runs_inner(points, date).0
    }

    fn segment_runs_inner(
        &self,
        points: &[Equatorial],
        date: DateTime<Utc>,
    ) -> (Vec<Run>, SegmentStats) {
        let mut runs = Vec::new();
        let mut stats = SegmentStats {
            points_in: points.len(),
            ..SegmentStats::default()
        };
        let mut current = Run {
            start: 0,
            points: Vec::new(),
        };
        let mut previous_azimuth = 0.0;

        for (i, &eq) in points.iter().enumerate() {
            let h = equatorial_to_horizontal(self.ephemeris, date, self.observer, eq);

            if h.altitude.is_nan() || h.altitude < self.thresholds.horizon_cutoff {
                stats.below_cutoff += 1;
                flush(&mut runs, &mut current, i + 1);
                continue;
            }

            let p = self.projection.project_to_display(h.altitude, h.azimuth);

            if let Some(&last) = current.points.last() {
                let gap = last.distance(p) > self.thresholds.gap;
                let jump = h.altitude <= self.thresholds.near_zenith_altitude
                    && azimuth_delta(h.azimuth, previous_azimuth) > self.thresholds.azimuth_jump;
                if gap || jump {
                    flush(&mut runs, &mut current, i);
                }
            } else {
                current.start = i;
            }

            current.points.push(p);
            previous_azimuth = h.azimuth;
        }
        flush(&mut runs, &mut current, points.len());

        // Every run counts as discarded until the caller filters it.
        stats.discarded = runs.len();
        (runs, stats)
    }
}

/// Move the current run (if any) into `runs` and start fresh at `next_start`.
fn flush(runs: &mut Vec<Run>, current: &mut Run, next_start: usize) {
    if current.points.is_empty() {
        current.start = next_start;
    } else {
        runs.push(std::mem::replace(
            current,
            Run {
                start: next_start,
                points: Vec::new(),
            },
        ));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::region::normalize_region_id;
    use crate::test_support::{DirectEphemeris, NanEphemeris};

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn observer() -> Observer {
        Observer::new(45.0, 0.0, 0.0).unwrap()
    }

    /// Equatorial point at a given altitude/azimuth under `DirectEphemeris`.
    fn at(altitude: f64, azimuth: f64) -> Equatorial {
        Equatorial::new(azimuth / 15.0, altitude)
    }

    fn segmenter<'a>(observer: &'a Observer) -> BoundarySegmenter<'a, DirectEphemeris> {
        let config = EngineConfig::default();
        BoundarySegmenter::new(
            &DirectEphemeris,
            observer,
            Projection::from_config(&config),
            SegmentThresholds::from_config(&config),
        )
    }

    fn ori() -> RegionId {
        normalize_region_id("Ori").unwrap()
    }

    #[test]
    fn continuous_boundary_is_one_segment() {
        let obs = observer();
        let points: Vec<Equatorial> = (0..6).map(|i| at(40.0, 100.0 + f64::from(i))).collect();
        let segments = segmenter(&obs).segment(ori(), &points, date());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].len(), 6);
        assert_eq!(segments[0].region(), ori());
    }

    #[test]
    fn gap_splits_between_second_and_third_point() {
        // Points 1-2 near the zenith side, point 3 far across the display.
        let obs = observer();
        let points = [at(40.0, 100.0), at(40.0, 102.0), at(40.0, 170.0), at(40.0, 171.0)];
        let seg = segmenter(&obs);
        let runs = seg.segment_runs(&points, date());
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].start, 0);
        assert_eq!(runs[0].points.len(), 2);
        assert_eq!(runs[1].start, 2);
        assert_eq!(runs[1].points.len(), 2);

        // Both halves are too short to keep.
        let (segments, stats) = seg.segment_with_stats(ori(), &points, date());
        assert!(segments.is_empty());
        assert_eq!(stats.discarded, 2);
        assert_eq!(stats.kept, 0);
    }

    #[test]
    fn gap_with_long_halves_keeps_two_segments() {
        let obs = observer();
        let points = [
            at(40.0, 100.0),
            at(40.0, 101.0),
            at(40.0, 102.0),
            at(40.0, 170.0),
            at(40.0, 171.0),
            at(40.0, 172.0),
        ];
        let segments = segmenter(&obs).segment(ori(), &points, date());
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].len(), 3);
        assert_eq!(segments[1].len(), 3);
    }

    #[test]
    fn below_cutoff_point_breaks_and_is_dropped() {
        let obs = observer();
        let points = [
            at(5.0, 10.0),
            at(5.0, 11.0),
            at(5.0, 12.0),
            at(-20.0, 13.0),
            at(5.0, 14.0),
            at(5.0, 15.0),
            at(5.0, 16.0),
        ];
        let seg = segmenter(&obs);
        let runs = seg.segment_runs(&points, date());
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].start, 4);
        let (segments, stats) = seg.segment_with_stats(ori(), &points, date());
        assert_eq!(segments.len(), 2);
        assert_eq!(stats.below_cutoff, 1);
        assert_eq!(stats.points_in, 7);
    }

    #[test]
    fn cutoff_is_strict() {
        // Exactly at the cutoff is not a break.
        let obs = observer();
        let points = [at(-10.0, 0.0), at(-10.0, 1.0), at(-10.0, 2.0)];
        let segments = segmenter(&obs).segment(ori(), &points, date());
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn azimuth_jump_breaks_below_near_zenith_altitude() {
        // Low altitude, small display gap is impossible across a 100°
        // azimuth jump, so use a gap threshold large enough to isolate the
        // azimuth rule.
        let obs = observer();
        let config = EngineConfig {
            boundary_gap_threshold: 10_000.0,
            ..EngineConfig::default()
        };
        let seg = BoundarySegmenter::new(
            &DirectEphemeris,
            &obs,
            Projection::from_config(&config),
            SegmentThresholds::from_config(&config),
        );
        let points = [
            at(70.0, 0.0),
            at(70.0, 1.0),
            at(70.0, 2.0),
            at(70.0, 120.0),
            at(70.0, 121.0),
            at(70.0, 122.0),
        ];
        assert_eq!(seg.segment(ori(), &points, date()).len(), 2);
    }

    #[test]
    fn azimuth_jump_ignored_near_zenith() {
        // Around the pole a 180° azimuth swing is only a short hop on screen.
        let obs = observer();
        let points = [
            at(89.0, 0.0),
            at(89.5, 0.0),
            at(89.5, 180.0),
            at(89.0, 180.0),
        ];
        let segments = segmenter(&obs).segment(ori(), &points, date());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].len(), 4);
    }

    #[test]
    fn near_zenith_threshold_is_inclusive() {
        let obs = observer();
        let config = EngineConfig {
            boundary_gap_threshold: 10_000.0,
            ..EngineConfig::default()
        };
        let seg = BoundarySegmenter::new(
            &DirectEphemeris,
            &obs,
            Projection::from_config(&config),
            SegmentThresholds::from_config(&config),
        );
        // At exactly 80° the jump rule still applies.
        let points = [at(80.0, 0.0), at(80.0, 1.0), at(80.0, 150.0)];
        assert_eq!(seg.segment_runs(&points, date()).len(), 2);
    }

    #[test]
    fn empty_boundary_yields_nothing() {
        let obs = observer();
        let seg = segmenter(&obs);
        assert!(seg.segment(ori(), &[], date()).is_empty());
        assert!(seg.segment_runs(&[], date()).is_empty());
    }

    #[test]
    fn fully_below_cutoff_yields_nothing() {
        let obs = observer();
        let points: Vec<Equatorial> = (0..5).map(|i| at(-40.0, f64::from(i))).collect();
        let (segments, stats) = segmenter(&obs).segment_with_stats(ori(), &points, date());
        assert!(segments.is_empty());
        assert_eq!(stats.below_cutoff, 5);
        assert_eq!(stats.discarded, 0);
    }

    #[test]
    fn nan_altitude_breaks_like_below_cutoff() {
        let obs = observer();
        let config = EngineConfig::default();
        let seg = BoundarySegmenter::new(
            &NanEphemeris,
            &obs,
            Projection::from_config(&config),
            SegmentThresholds::from_config(&config),
        );
        let points: Vec<Equatorial> = (0..5).map(|i| at(40.0, f64::from(i))).collect();
        let (segments, stats) = seg.segment_with_stats(ori(), &points, date());
        assert!(segments.is_empty());
        assert_eq!(stats.below_cutoff, 5);
    }
}
