//! Shared types for the skychart sky-view engine.

use serde::{Deserialize, Serialize};

use crate::region::RegionId;

/// A 2D point in display (world) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (display units from the left edge).
    pub x: f64,
    /// Vertical position (display units from the top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Returns `true` if both coordinates are finite.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Sky-fixed equatorial coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Equatorial {
    /// Right ascension in hours, `[0, 24)`.
    pub ra_hours: f64,
    /// Declination in degrees, `[-90, 90]`.
    pub dec_degrees: f64,
}

impl Equatorial {
    /// Create a new equatorial position.
    #[must_use]
    pub const fn new(ra_hours: f64, dec_degrees: f64) -> Self {
        Self {
            ra_hours,
            dec_degrees,
        }
    }
}

/// Observer- and time-dependent horizontal coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Horizontal {
    /// Altitude above the horizon in degrees, `[-90, 90]`.
    pub altitude: f64,
    /// Azimuth in degrees from north through east, `[0, 360)`.
    pub azimuth: f64,
}

impl Horizontal {
    /// Create a new horizontal position.
    #[must_use]
    pub const fn new(altitude: f64, azimuth: f64) -> Self {
        Self { altitude, azimuth }
    }
}

/// Geographic location of the observer.
///
/// Immutable after construction; use [`Observer::new`] to get a
/// validated value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    latitude: f64,
    longitude: f64,
    elevation: f64,
}

impl Observer {
    /// Create a validated observer.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidObserver`] if any value is not finite,
    /// the latitude is outside `[-90, 90]`, or the longitude is outside
    /// `[-180, 180]`.
    pub fn new(latitude: f64, longitude: f64, elevation: f64) -> Result<Self, EngineError> {
        if !(latitude.is_finite() && longitude.is_finite() && elevation.is_finite()) {
            return Err(EngineError::InvalidObserver(format!(
                "non-finite value in ({latitude}, {longitude}, {elevation})"
            )));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(EngineError::InvalidObserver(format!(
                "latitude {latitude} outside [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(EngineError::InvalidObserver(format!(
                "longitude {longitude} outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
            elevation,
        })
    }

    /// Latitude in degrees (north positive).
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees (east positive).
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Elevation above sea level in meters.
    #[must_use]
    pub const fn elevation(&self) -> f64 {
        self.elevation
    }
}

/// A catalog object as placed on the display for one recompute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedObject {
    /// Catalog identifier (Hipparcos number).
    pub id: u32,
    /// Proper name, secondary designation, or `HIP <id>`.
    pub display_name: String,
    /// Apparent magnitude (lower is brighter).
    pub magnitude: f64,
    /// Normalized region, `None` when the raw tag is unknown.
    pub region: Option<RegionId>,
    /// Altitude in degrees at the recompute date.
    pub altitude: f64,
    /// Azimuth in degrees at the recompute date.
    pub azimuth: f64,
    /// Display position.
    pub position: Point,
}

/// A continuous, display-safe piece of a region boundary.
///
/// Always holds at least [`BoundarySegment::MIN_POINTS`] points; shorter
/// runs are discarded during segmentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundarySegment {
    region: RegionId,
    points: Vec<Point>,
}

impl BoundarySegment {
    /// Minimum number of points a kept segment carries.
    pub const MIN_POINTS: usize = 3;

    /// Wrap a run of display points, or `None` if it is too short to keep.
    #[must_use]
    pub fn new(region: RegionId, points: Vec<Point>) -> Option<Self> {
        (points.len() >= Self::MIN_POINTS).then_some(Self { region, points })
    }

    /// Region this segment belongs to.
    #[must_use]
    pub const fn region(&self) -> RegionId {
        self.region
    }

    /// Display points in walk order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; kept segments are never empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Configuration for the sky-view engine.
///
/// All parameters have defaults tuned for a 1000-unit square display.
/// Use [`EngineConfig::validate`] before handing a hand-built config to
/// the engine; [`crate::SkyEngine::new`] does so automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Display-space center of the world circle (same value on both axes).
    pub world_center: f64,

    /// Radius of the world circle. The horizon (altitude 0) lands on it.
    pub world_radius: f64,

    /// Viewport center used when clamping the camera.
    pub display_center: f64,

    /// Inclusive altitude floor in degrees for an object to be in view.
    pub min_altitude: f64,

    /// Boundary points strictly below this altitude break the boundary.
    ///
    /// Looser than `min_altitude` so boundaries stay anchored a little past
    /// the horizon.
    pub boundary_horizon_cutoff: f64,

    /// Display distance between consecutive boundary points above which the
    /// boundary is split.
    pub boundary_gap_threshold: f64,

    /// Above this altitude the azimuth-jump split is suppressed because
    /// azimuth is unstable near the zenith.
    pub near_zenith_altitude: f64,

    /// Azimuth delta in degrees (wrapped to `[0, 180]`) that splits a
    /// boundary below `near_zenith_altitude`.
    pub azimuth_jump_threshold: f64,

    /// Smallest camera scale. The whole world is visible at this scale.
    pub min_scale: f64,

    /// Largest camera scale.
    pub max_scale: f64,

    /// Exponent multiplier for wheel deltas: `factor = exp(delta * sensitivity)`.
    pub zoom_sensitivity: f64,

    /// Reject catalogs whose region boundaries overlap instead of warning.
    pub reject_overlapping_regions: bool,
}

impl EngineConfig {
    /// Default world circle center.
    pub const DEFAULT_WORLD_CENTER: f64 = 500.0;
    /// Default world circle radius.
    pub const DEFAULT_WORLD_RADIUS: f64 = 480.0;
    /// Default visibility floor in degrees.
    pub const DEFAULT_MIN_ALTITUDE: f64 = 3.0;
    /// Default boundary break altitude in degrees.
    pub const DEFAULT_BOUNDARY_HORIZON_CUTOFF: f64 = -10.0;
    /// Default boundary gap threshold in display units.
    pub const DEFAULT_BOUNDARY_GAP_THRESHOLD: f64 = 120.0;
    /// Default near-zenith altitude in degrees.
    pub const DEFAULT_NEAR_ZENITH_ALTITUDE: f64 = 80.0;
    /// Default azimuth jump threshold in degrees.
    pub const DEFAULT_AZIMUTH_JUMP_THRESHOLD: f64 = 90.0;
    /// Default minimum camera scale.
    pub const DEFAULT_MIN_SCALE: f64 = 1.0;
    /// Default maximum camera scale.
    pub const DEFAULT_MAX_SCALE: f64 = 5.0;
    /// Default wheel zoom sensitivity.
    pub const DEFAULT_ZOOM_SENSITIVITY: f64 = 0.002;

    /// Check that every field is usable.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] describing the first
    /// offending field.
    pub fn validate(&self) -> Result<(), EngineError> {
        let finite = [
            ("world_center", self.world_center),
            ("world_radius", self.world_radius),
            ("display_center", self.display_center),
            ("min_altitude", self.min_altitude),
            ("boundary_horizon_cutoff", self.boundary_horizon_cutoff),
            ("boundary_gap_threshold", self.boundary_gap_threshold),
            ("near_zenith_altitude", self.near_zenith_altitude),
            ("azimuth_jump_threshold", self.azimuth_jump_threshold),
            ("min_scale", self.min_scale),
            ("max_scale", self.max_scale),
            ("zoom_sensitivity", self.zoom_sensitivity),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "{name} must be finite, got {value}"
            )));
        }
        if self.world_radius <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "world_radius must be positive, got {}",
                self.world_radius
            )));
        }
        if self.boundary_gap_threshold <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "boundary_gap_threshold must be positive, got {}",
                self.boundary_gap_threshold
            )));
        }
        if !(self.azimuth_jump_threshold > 0.0 && self.azimuth_jump_threshold <= 180.0) {
            return Err(EngineError::InvalidConfig(format!(
                "azimuth_jump_threshold must be in (0, 180], got {}",
                self.azimuth_jump_threshold
            )));
        }
        for (name, value) in [
            ("min_altitude", self.min_altitude),
            ("boundary_horizon_cutoff", self.boundary_horizon_cutoff),
            ("near_zenith_altitude", self.near_zenith_altitude),
        ] {
            if !(-90.0..=90.0).contains(&value) {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be within [-90, 90], got {value}"
                )));
            }
        }
        if self.boundary_horizon_cutoff > self.min_altitude {
            return Err(EngineError::InvalidConfig(format!(
                "boundary_horizon_cutoff ({}) must not exceed min_altitude ({})",
                self.boundary_horizon_cutoff, self.min_altitude
            )));
        }
        if self.min_scale < 1.0 || self.min_scale > self.max_scale {
            return Err(EngineError::InvalidConfig(format!(
                "scale range [{}, {}] must satisfy 1 <= min <= max",
                self.min_scale, self.max_scale
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world_center: Self::DEFAULT_WORLD_CENTER,
            world_radius: Self::DEFAULT_WORLD_RADIUS,
            display_center: Self::DEFAULT_WORLD_CENTER,
            min_altitude: Self::DEFAULT_MIN_ALTITUDE,
            boundary_horizon_cutoff: Self::DEFAULT_BOUNDARY_HORIZON_CUTOFF,
            boundary_gap_threshold: Self::DEFAULT_BOUNDARY_GAP_THRESHOLD,
            near_zenith_altitude: Self::DEFAULT_NEAR_ZENITH_ALTITUDE,
            azimuth_jump_threshold: Self::DEFAULT_AZIMUTH_JUMP_THRESHOLD,
            min_scale: Self::DEFAULT_MIN_SCALE,
            max_scale: Self::DEFAULT_MAX_SCALE,
            zoom_sensitivity: Self::DEFAULT_ZOOM_SENSITIVITY,
            reject_overlapping_regions: false,
        }
    }
}

/// The exchange file a [`EngineError::DataFormat`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dataset {
    /// The star catalog.
    Catalog,
    /// Region boundary polylines.
    Boundaries,
    /// Connector line pairs.
    Lines,
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Catalog => "catalog",
            Self::Boundaries => "boundary",
            Self::Lines => "line",
        })
    }
}

/// Errors that can occur while starting the engine or ingesting data.
///
/// Initialization errors (`EphemerisUnavailable`, `InvalidObserver`,
/// `InvalidConfig`) are fatal. Data errors reject the whole dataset.
/// Neither kind is retried.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The ephemeris provider could not be initialized.
    #[error("ephemeris provider unavailable: {0}")]
    EphemerisUnavailable(String),

    /// Observer parameters are out of range.
    #[error("invalid observer: {0}")]
    InvalidObserver(String),

    /// Engine configuration is invalid.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// A dataset failed validation.
    #[error("malformed {dataset} data: {reason}")]
    DataFormat {
        /// Which dataset was rejected.
        dataset: Dataset,
        /// What was wrong with it.
        reason: String,
    },

    /// A dataset was not valid JSON for its schema.
    #[error("failed to parse {dataset} JSON: {source}")]
    Json {
        /// Which dataset was rejected.
        dataset: Dataset,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },
}

impl EngineError {
    /// Returns `true` for errors that prevent the engine from starting.
    #[must_use]
    pub const fn is_initialization(&self) -> bool {
        matches!(
            self,
            Self::EphemerisUnavailable(_) | Self::InvalidObserver(_) | Self::InvalidConfig(_)
        )
    }

    pub(crate) fn data(dataset: Dataset, reason: impl Into<String>) -> Self {
        Self::DataFormat {
            dataset,
            reason: reason.into(),
        }
    }
}
