//! View-state recomputation.
//!
//! [`ViewCalculator::recompute`] rebuilds the whole observable state for a
//! date and magnitude limit: every catalog object is placed on the
//! display, filtered by altitude, indexed, filtered by magnitude and
//! sorted; boundaries are segmented and indexed for hit-testing; connector
//! lines are resolved against the in-view index.
//!
//! The result is an immutable [`ProjectedViewState`]. Nothing is updated
//! in place, so a state always reflects exactly one `(date, limit)` pair.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::diagnostics::{
    Clock, RecomputeDiagnostics, RecomputeSummary, StageDiagnostics, StageMetrics,
};
use crate::ephemeris::Ephemeris;
use crate::hit::RegionIndex;
use crate::region::RegionId;
use crate::segment::{BoundarySegmenter, SegmentStats, SegmentThresholds};
use crate::transform::{Projection, equatorial_to_horizontal};
use crate::types::{BoundarySegment, EngineConfig, Observer, Point, ProjectedObject};

/// Non-fatal conditions found during a recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewWarning {
    /// The catalog has no objects; the state is empty.
    EmptyCatalog,
    /// Two regions' boundaries overlap, so hit-testing in the overlap
    /// resolves to the lower region id.
    OverlappingRegions(RegionId, RegionId),
}

/// A connector line with both endpoints in view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectorLine {
    /// Region the line belongs to.
    pub region: RegionId,
    /// Endpoint ids.
    pub ids: [u32; 2],
    /// Endpoint display positions.
    pub points: [Point; 2],
}

/// Immutable result of one recompute.
#[derive(Debug, Clone)]
pub struct ProjectedViewState {
    date: DateTime<Utc>,
    magnitude_limit: f64,
    visible: Vec<ProjectedObject>,
    index: BTreeMap<u32, ProjectedObject>,
    segments: BTreeMap<RegionId, Vec<BoundarySegment>>,
    region_index: RegionIndex,
    connectors: Vec<ConnectorLine>,
    warnings: Vec<ViewWarning>,
}

impl ProjectedViewState {
    /// A state with nothing in it.
    #[must_use]
    pub fn empty(date: DateTime<Utc>, magnitude_limit: f64) -> Self {
        Self {
            date,
            magnitude_limit,
            visible: Vec::new(),
            index: BTreeMap::new(),
            segments: BTreeMap::new(),
            region_index: RegionIndex::default(),
            connectors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Date the state was computed for.
    #[must_use]
    pub const fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Magnitude limit the state was computed for.
    #[must_use]
    pub const fn magnitude_limit(&self) -> f64 {
        self.magnitude_limit
    }

    /// In-view objects passing the magnitude limit, brightest first, ties
    /// by id.
    #[must_use]
    pub fn visible(&self) -> &[ProjectedObject] {
        &self.visible
    }

    /// Any in-view object by id, including ones fainter than the limit.
    #[must_use]
    pub fn object(&self, id: u32) -> Option<&ProjectedObject> {
        self.index.get(&id)
    }

    /// All in-view objects, ordered by id.
    pub fn in_view(&self) -> impl Iterator<Item = &ProjectedObject> {
        self.index.values()
    }

    /// Number of in-view objects.
    #[must_use]
    pub fn in_view_count(&self) -> usize {
        self.index.len()
    }

    /// Kept boundary segments per region.
    #[must_use]
    pub const fn segments(&self) -> &BTreeMap<RegionId, Vec<BoundarySegment>> {
        &self.segments
    }

    /// Hit-test index over the segments.
    #[must_use]
    pub const fn region_index(&self) -> &RegionIndex {
        &self.region_index
    }

    /// Resolved connector lines.
    #[must_use]
    pub fn connectors(&self) -> &[ConnectorLine] {
        &self.connectors
    }

    /// Warnings raised while building the state.
    #[must_use]
    pub fn warnings(&self) -> &[ViewWarning] {
        &self.warnings
    }

    /// Region containing a display-space point.
    #[must_use]
    pub fn find_region_at_point(&self, point: Point) -> Option<RegionId> {
        self.region_index.find_region_at_point(point)
    }
}

/// Clock for callers that do not want timings.
struct NoClock;

impl Clock for NoClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

/// Builds [`ProjectedViewState`]s for one observer and configuration.
#[derive(Debug)]
pub struct ViewCalculator<'a, E: ?Sized> {
    ephemeris: &'a E,
    observer: &'a Observer,
    config: &'a EngineConfig,
}

impl<'a, E: Ephemeris + ?Sized> ViewCalculator<'a, E> {
    /// Create a calculator.
    #[must_use]
    pub const fn new(ephemeris: &'a E, observer: &'a Observer, config: &'a EngineConfig) -> Self {
        Self {
            ephemeris,
            observer,
            config,
        }
    }

    /// Rebuild the view state for `date` and `magnitude_limit`.
    ///
    /// Identical inputs always produce identical output, ordering included.
    /// A non-finite limit lets nothing into the visible list; the in-view
    /// index is still populated.
    #[must_use]
    pub fn recompute(
        &self,
        catalog: &Catalog,
        date: DateTime<Utc>,
        magnitude_limit: f64,
    ) -> ProjectedViewState {
        self.recompute_with_diagnostics(catalog, date, magnitude_limit, &NoClock)
            .0
    }

    /// Like [`recompute`](Self::recompute), also timing each stage.
    #[must_use]
    pub fn recompute_with_diagnostics(
        &self,
        catalog: &Catalog,
        date: DateTime<Utc>,
        magnitude_limit: f64,
        clock: &impl Clock,
    ) -> (ProjectedViewState, RecomputeDiagnostics) {
        let projection = Projection::from_config(self.config);
        let mut state = ProjectedViewState::empty(date, magnitude_limit);

        if catalog.is_empty() {
            log::warn!("recompute with an empty catalog");
            state.warnings.push(ViewWarning::EmptyCatalog);
        }
        state.warnings.extend(
            catalog
                .overlapping_regions()
                .iter()
                .map(|&(a, b)| ViewWarning::OverlappingRegions(a, b)),
        );

        let total_start = clock.now();

        // 1. Project, filter and sort objects.
        let t0 = clock.now();
        self.project_objects(catalog, projection, &mut state);
        let projection_stage = StageDiagnostics {
            duration: clock.elapsed(&t0),
            metrics: StageMetrics::Projection {
                catalog_count: catalog.len(),
                in_view_count: state.index.len(),
                visible_count: state.visible.len(),
            },
        };

        // 2. Segment boundaries.
        let t0 = clock.now();
        let stats = self.segment_boundaries(catalog, projection, date, &mut state);
        let segment_count: usize = state.segments.values().map(Vec::len).sum();
        let segmentation_stage = StageDiagnostics {
            duration: clock.elapsed(&t0),
            metrics: StageMetrics::Segmentation {
                polyline_count: catalog.boundaries().len(),
                points_in: stats.points_in,
                below_cutoff: stats.below_cutoff,
                kept_segments: stats.kept,
                discarded_runs: stats.discarded,
            },
        };

        // 3. Index regions.
        let t0 = clock.now();
        state.region_index = RegionIndex::build(&state.segments);
        let indexing_stage = StageDiagnostics {
            duration: clock.elapsed(&t0),
            metrics: StageMetrics::Indexing {
                region_count: state.region_index.region_count(),
                polygon_count: state.region_index.polygon_count(),
            },
        };

        // 4. Resolve connector lines.
        let t0 = clock.now();
        state.connectors = catalog
            .lines()
            .iter()
            .filter_map(|pair| {
                let a = state.index.get(&pair.a)?;
                let b = state.index.get(&pair.b)?;
                Some(ConnectorLine {
                    region: pair.region,
                    ids: [pair.a, pair.b],
                    points: [a.position, b.position],
                })
            })
            .collect();
        let connectors_stage = StageDiagnostics {
            duration: clock.elapsed(&t0),
            metrics: StageMetrics::Connectors {
                pairs: catalog.lines().len(),
                resolved: state.connectors.len(),
            },
        };

        log::debug!(
            "recompute {date} limit {magnitude_limit}: {} in view, {} visible, {segment_count} segments, {} connectors",
            state.index.len(),
            state.visible.len(),
            state.connectors.len(),
        );

        let diagnostics = RecomputeDiagnostics {
            projection: projection_stage,
            segmentation: segmentation_stage,
            indexing: indexing_stage,
            connectors: connectors_stage,
            total_duration: clock.elapsed(&total_start),
            summary: RecomputeSummary {
                catalog_count: catalog.len(),
                in_view_count: state.index.len(),
                visible_count: state.visible.len(),
                segment_count,
                connector_count: state.connectors.len(),
            },
        };
        (state, diagnostics)
    }

    fn project_objects(
        &self,
        catalog: &Catalog,
        projection: Projection,
        state: &mut ProjectedViewState,
    ) {
        let limit_applies = state.magnitude_limit.is_finite();
        for object in catalog.objects() {
            let h =
                equatorial_to_horizontal(self.ephemeris, state.date, self.observer, object.position);
            // NaN altitudes count as out of view.
            if h.altitude.is_nan() || h.altitude < self.config.min_altitude {
                continue;
            }
            let projected = ProjectedObject {
                id: object.id,
                display_name: object.display_name.clone(),
                magnitude: object.magnitude,
                region: object.region,
                altitude: h.altitude,
                azimuth: h.azimuth,
                position: projection.project_to_display(h.altitude, h.azimuth),
            };
            if limit_applies && projected.magnitude <= state.magnitude_limit {
                state.visible.push(projected.clone());
            }
            state.index.insert(object.id, projected);
        }

        // `+ 0.0` folds -0.0 into 0.0 so equal magnitudes tie on id.
        state.visible.sort_by(|a, b| {
            (a.magnitude + 0.0)
                .total_cmp(&(b.magnitude + 0.0))
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    fn segment_boundaries(
        &self,
        catalog: &Catalog,
        projection: Projection,
        date: DateTime<Utc>,
        state: &mut ProjectedViewState,
    ) -> SegmentStats {
        let segmenter = BoundarySegmenter::new(
            self.ephemeris,
            self.observer,
            projection,
            SegmentThresholds::from_config(self.config),
        );
        let mut total = SegmentStats::default();
        for boundary in catalog.boundaries() {
            let (segments, stats) =
                segmenter.segment_with_stats(boundary.region, &boundary.points, date);
            total += stats;
            if !segments.is_empty() {
                state
                    .segments
                    .entry(boundary.region)
                    .or_default()
                    .extend(segments);
            }
        }
        total
    }
}
