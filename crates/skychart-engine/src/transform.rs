//! Coordinate transforms between equatorial, horizontal and display space.
//!
//! Display space is an azimuthal-equidistant projection centered on the
//! zenith: distance from the world center grows linearly with zenith
//! distance, so the horizon lands on the world circle. South is at the top
//! and east at the right.
//!
//! ```text
//! r = (90 - alt) / 90 * R
//! θ = (270 + az) * π / 180
//! x = C + r cos θ
//! y = C - r sin θ
//! ```

use chrono::{DateTime, Utc};

use crate::ephemeris::{Ephemeris, normalize_degrees};
use crate::types::{EngineConfig, Equatorial, Horizontal, Observer, Point};

/// Zenith-centered azimuthal-equidistant projection onto the world circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    center: f64,
    radius: f64,
}

impl Projection {
    /// Create a projection with world center `C` (both axes) and radius `R`.
    #[must_use]
    pub const fn new(center: f64, radius: f64) -> Self {
        Self { center, radius }
    }

    /// The projection described by an engine config.
    #[must_use]
    pub const fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.world_center, config.world_radius)
    }

    /// World center as a point.
    #[must_use]
    pub const fn center(&self) -> Point {
        Point::new(self.center, self.center)
    }

    /// World circle radius.
    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }

    /// Project horizontal coordinates onto the display.
    ///
    /// The zenith maps exactly to the world center whatever the azimuth.
    /// Altitudes outside `[-90, 90]` violate the provider contract and are
    /// clamped.
    #[must_use]
    pub fn project_to_display(&self, altitude: f64, azimuth: f64) -> Point {
        debug_assert!(
            (-90.0..=90.0).contains(&altitude),
            "altitude {altitude} outside [-90, 90]"
        );
        let altitude = altitude.clamp(-90.0, 90.0);
        let r = (90.0 - altitude) / 90.0 * self.radius;
        if r == 0.0 {
            return self.center();
        }
        let azimuth = if azimuth.is_finite() { azimuth } else { 0.0 };
        let theta = (270.0 + azimuth).to_radians();
        let (sin, cos) = theta.sin_cos();
        Point::new(r.mul_add(cos, self.center), (-r).mul_add(sin, self.center))
    }

    /// Exact inverse of [`project_to_display`](Self::project_to_display).
    ///
    /// Azimuth is returned in `[0, 360)`. The world center yields altitude
    /// 90 and azimuth 0.
    #[must_use]
    pub fn display_to_horizontal(&self, point: Point) -> Horizontal {
        let dx = point.x - self.center;
        let dy = self.center - point.y;
        let r = dx.hypot(dy);
        let altitude = 90.0 - r / self.radius * 90.0;
        if r == 0.0 {
            return Horizontal::new(altitude, 0.0);
        }
        let theta = dy.atan2(dx).to_degrees();
        Horizontal::new(altitude, normalize_degrees(theta - 270.0))
    }
}

/// Horizontal coordinates of an equatorial position via the provider.
#[must_use]
pub fn equatorial_to_horizontal<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    date: DateTime<Utc>,
    observer: &Observer,
    position: Equatorial,
) -> Horizontal {
    ephemeris.equatorial_to_horizontal(date, observer, position.ra_hours, position.dec_degrees)
}

/// Equatorial coordinates of a horizontal position via the provider.
#[must_use]
pub fn horizontal_to_equatorial<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    date: DateTime<Utc>,
    observer: &Observer,
    position: Horizontal,
) -> Equatorial {
    ephemeris.horizontal_to_equatorial(date, observer, position.altitude, position.azimuth)
}

/// Smallest angle between two azimuths, in `[0, 180]`.
#[must_use]
pub fn azimuth_delta(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    if d > 180.0 { 360.0 - d } else { d }
}
