//! skychart-engine: Sky-view computation engine (sans-IO).
//!
//! Turns a star catalog, constellation boundaries and connector lines into
//! the observable state of a projected sky for one observer:
//! equatorial -> horizontal -> display projection -> visibility filter ->
//! sort -> boundary segmentation -> region index -> connector lines.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! JSON bytes or already-built values and returns structured data. It
//! logs through the `log` facade but never installs a logger; file
//! reading and logger setup live in `skychart-bench`.

pub mod camera;
pub mod catalog;
pub mod diagnostics;
pub mod engine;
pub mod ephemeris;
pub mod hit;
pub mod region;
pub mod segment;
pub mod transform;
pub mod types;
pub mod view;

pub use camera::{CameraController, CameraTransform};
pub use catalog::{Catalog, CatalogObject, RawCatalogObject};
pub use diagnostics::{Clock, RecomputeDiagnostics};
pub use engine::SkyEngine;
pub use ephemeris::{Ephemeris, MeanSiderealEphemeris};
pub use hit::{RegionIndex, point_in_polygon};
pub use region::{RegionId, normalize_region_id};
pub use segment::BoundarySegmenter;
pub use transform::Projection;
pub use types::{
    BoundarySegment, Dataset, EngineConfig, EngineError, Equatorial, Horizontal, Observer, Point,
    ProjectedObject,
};
pub use view::{ConnectorLine, ProjectedViewState, ViewCalculator, ViewWarning};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Utc};

    use crate::ephemeris::Ephemeris;
    use crate::types::{Equatorial, Horizontal, Observer};

    /// Treats declination as altitude and RA·15 as azimuth.
    ///
    /// Lets tests place points at exact horizontal coordinates.
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct DirectEphemeris;

    impl Ephemeris for DirectEphemeris {
        fn equatorial_to_horizontal(
            &self,
            _date: DateTime<Utc>,
            _observer: &Observer,
            ra_hours: f64,
            dec_degrees: f64,
        ) -> Horizontal {
            Horizontal::new(dec_degrees, ra_hours * 15.0)
        }

        fn horizontal_to_equatorial(
            &self,
            _date: DateTime<Utc>,
            _observer: &Observer,
            altitude_degrees: f64,
            azimuth_degrees: f64,
        ) -> Equatorial {
            Equatorial::new(azimuth_degrees / 15.0, altitude_degrees)
        }
    }

    /// Answers every conversion with NaN.
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct NanEphemeris;

    impl Ephemeris for NanEphemeris {
        fn equatorial_to_horizontal(
            &self,
            _date: DateTime<Utc>,
            _observer: &Observer,
            _ra_hours: f64,
            _dec_degrees: f64,
        ) -> Horizontal {
            Horizontal::new(f64::NAN, f64::NAN)
        }

        fn horizontal_to_equatorial(
            &self,
            _date: DateTime<Utc>,
            _observer: &Observer,
            _altitude_degrees: f64,
            _azimuth_degrees: f64,
        ) -> Equatorial {
            Equatorial::new(f64::NAN, f64::NAN)
        }
    }
}
