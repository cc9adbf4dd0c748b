//! Ephemeris provider: equatorial ↔ horizontal conversion for a date and
//! observer.
//!
//! The engine only depends on the [`Ephemeris`] trait. The bundled
//! [`MeanSiderealEphemeris`] uses mean sidereal time and plain spherical
//! trigonometry; it ignores precession, nutation, aberration and refraction,
//! which keeps it within a fraction of a degree of a full ephemeris for
//! present-day dates.

use std::f64::consts::TAU;

use chrono::{DateTime, Utc};

use crate::types::{EngineError, Equatorial, Horizontal, Observer};

/// Time- and observer-dependent coordinate conversion.
pub trait Ephemeris {
    /// Horizontal coordinates of an equatorial position.
    fn equatorial_to_horizontal(
        &self,
        date: DateTime<Utc>,
        observer: &Observer,
        ra_hours: f64,
        dec_degrees: f64,
    ) -> Horizontal;

    /// Equatorial coordinates of a horizontal position.
    fn horizontal_to_equatorial(
        &self,
        date: DateTime<Utc>,
        observer: &Observer,
        altitude_degrees: f64,
        azimuth_degrees: f64,
    ) -> Equatorial;

    /// Readiness probe run once when the engine starts.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EphemerisUnavailable`] if the provider
    /// cannot serve conversions.
    fn check(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

impl<E: Ephemeris + ?Sized> Ephemeris for &E {
    fn equatorial_to_horizontal(
        &self,
        date: DateTime<Utc>,
        observer: &Observer,
        ra_hours: f64,
        dec_degrees: f64,
    ) -> Horizontal {
        (**self).equatorial_to_horizontal(date, observer, ra_hours, dec_degrees)
    }

    fn horizontal_to_equatorial(
        &self,
        date: DateTime<Utc>,
        observer: &Observer,
        altitude_degrees: f64,
        azimuth_degrees: f64,
    ) -> Equatorial {
        (**self).horizontal_to_equatorial(date, observer, altitude_degrees, azimuth_degrees)
    }

    fn check(&self) -> Result<(), EngineError> {
        (**self).check()
    }
}

/// Julian date of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
/// Julian date of J2000.0.
const J2000_JD: f64 = 2_451_545.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Mean-sidereal-time ephemeris.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanSiderealEphemeris;

impl MeanSiderealEphemeris {
    /// Local mean sidereal time for a date and longitude, in radians `[0, 2π)`.
    #[must_use]
    pub fn local_sidereal_time(date: DateTime<Utc>, longitude_degrees: f64) -> f64 {
        (greenwich_mean_sidereal_time(date) + longitude_degrees.to_radians()).rem_euclid(TAU)
    }
}

impl Ephemeris for MeanSiderealEphemeris {
    fn equatorial_to_horizontal(
        &self,
        date: DateTime<Utc>,
        observer: &Observer,
        ra_hours: f64,
        dec_degrees: f64,
    ) -> Horizontal {
        let lst = Self::local_sidereal_time(date, observer.longitude());
        let hour_angle = lst - (ra_hours * 15.0).to_radians();
        let dec = dec_degrees.to_radians();
        let lat = observer.latitude().to_radians();

        let sin_alt = dec
            .sin()
            .mul_add(lat.sin(), dec.cos() * lat.cos() * hour_angle.cos());
        let altitude = sin_alt.clamp(-1.0, 1.0).asin();

        // Azimuth from north through east.
        let y = -dec.cos() * hour_angle.sin();
        let x = dec
            .sin()
            .mul_add(lat.cos(), -(dec.cos() * lat.sin() * hour_angle.cos()));
        let azimuth = y.atan2(x).rem_euclid(TAU);

        Horizontal::new(altitude.to_degrees(), normalize_degrees(azimuth.to_degrees()))
    }

    fn horizontal_to_equatorial(
        &self,
        date: DateTime<Utc>,
        observer: &Observer,
        altitude_degrees: f64,
        azimuth_degrees: f64,
    ) -> Equatorial {
        let lst = Self::local_sidereal_time(date, observer.longitude());
        let alt = altitude_degrees.to_radians();
        let az = azimuth_degrees.to_radians();
        let lat = observer.latitude().to_radians();

        let sin_dec = alt
            .sin()
            .mul_add(lat.sin(), alt.cos() * lat.cos() * az.cos());
        let dec = sin_dec.clamp(-1.0, 1.0).asin();

        let y = -az.sin() * alt.cos();
        let x = alt
            .sin()
            .mul_add(lat.cos(), -(alt.cos() * lat.sin() * az.cos()));
        let hour_angle = y.atan2(x);

        let ra_hours = ((lst - hour_angle).to_degrees() / 15.0).rem_euclid(24.0);
        Equatorial::new(normalize_hours(ra_hours), dec.to_degrees())
    }
}

/// Greenwich mean sidereal time in radians `[0, 2π)` (IAU 1982 polynomial).
fn greenwich_mean_sidereal_time(date: DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let unix_seconds =
        date.timestamp() as f64 + f64::from(date.timestamp_subsec_nanos()) * 1e-9;
    let jd = unix_seconds / SECONDS_PER_DAY + UNIX_EPOCH_JD;
    let d = jd - J2000_JD;
    let t = d / 36_525.0;

    let gmst_degrees = (t * t).mul_add(
        0.000_387_933 - t / 38_710_000.0,
        360.985_647_366_29_f64.mul_add(d, 280.460_618_37),
    );
    gmst_degrees.rem_euclid(360.0).to_radians()
}

/// Fold an angle into `[0, 360)`, mapping a rounding result of exactly 360 to 0.
pub(crate) fn normalize_degrees(angle: f64) -> f64 {
    let folded = angle.rem_euclid(360.0);
    if folded >= 360.0 { 0.0 } else { folded }
}

fn normalize_hours(hours: f64) -> f64 {
    if hours >= 24.0 { 0.0 } else { hours }
}
