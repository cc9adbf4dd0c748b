//! Catalog ingestion: stars, region boundaries and connector lines.
//!
//! Three exchange files feed the engine:
//!
//! - stars: `[{"id", "p", "b", "m", "r", "d", "c"}, ...]` with RA in hours
//!   and Dec in degrees;
//! - boundaries: `{"<region key>": [[ra_hours, dec_degrees], ...], ...}`,
//!   each value one closed outline;
//! - lines: `{"<region key>": [[id_a, id_b], ...], ...}`.
//!
//! A [`Catalog`] is validated as a whole. Any malformed record rejects the
//! dataset it came from and nothing is ingested, so the engine never holds
//! a partially loaded catalog.

use std::collections::BTreeMap;

use geo::line_measures::Distance;
use geo::{BoundingRect, Closest, ClosestPoint, Contains, Euclidean, Intersects};
use serde::{Deserialize, Serialize};

use crate::region::{RegionId, normalize_region_id};
use crate::types::{Dataset, EngineConfig, EngineError, Equatorial};

/// Vertices closer than this (degrees of polar distance) to another
/// region's outline count as shared edge, not overlap.
const OVERLAP_TOLERANCE_DEGREES: f64 = 0.5;

/// One star record as it appears in the exchange file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCatalogObject {
    /// Hipparcos number.
    pub id: u32,
    /// Proper name.
    #[serde(rename = "p", default)]
    pub proper_name: Option<String>,
    /// Secondary (Bayer/Flamsteed) designation.
    #[serde(rename = "b", default)]
    pub designation: Option<String>,
    /// Apparent magnitude.
    #[serde(rename = "m")]
    pub magnitude: f64,
    /// Right ascension in hours.
    #[serde(rename = "r")]
    pub ra_hours: f64,
    /// Declination in degrees.
    #[serde(rename = "d")]
    pub dec_degrees: f64,
    /// Raw region tag.
    #[serde(rename = "c", default)]
    pub region: Option<String>,
}

/// Raw boundary file: region key to `[ra_hours, dec_degrees]` points.
pub type RawBoundaries = BTreeMap<String, Vec<Vec<f64>>>;

/// Raw line file: region key to `[id_a, id_b]` pairs.
pub type RawLines = BTreeMap<String, Vec<Vec<u32>>>;

/// A validated catalog object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogObject {
    /// Hipparcos number.
    pub id: u32,
    /// Proper name, secondary designation, or `HIP <id>`.
    pub display_name: String,
    /// Apparent magnitude.
    pub magnitude: f64,
    /// Sky position.
    pub position: Equatorial,
    /// Normalized region, `None` when the raw tag is unknown or missing.
    pub region: Option<RegionId>,
}

impl CatalogObject {
    fn from_raw(raw: RawCatalogObject) -> Self {
        let region = raw.region.as_deref().and_then(normalize_region_id);
        let display_name = non_empty(raw.proper_name)
            .or_else(|| non_empty(raw.designation))
            .unwrap_or_else(|| format!("HIP {}", raw.id));
        Self {
            id: raw.id,
            display_name,
            magnitude: raw.magnitude,
            position: Equatorial::new(raw.ra_hours, raw.dec_degrees),
            region,
        }
    }
}

fn non_empty(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty())
}

/// One closed boundary outline of a region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionBoundary {
    /// Normalized region.
    pub region: RegionId,
    /// Raw key the outline was stored under, e.g. `SER2`.
    pub key: String,
    /// Outline vertices in walk order.
    pub points: Vec<Equatorial>,
}

/// A connector line between two catalog objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectorPair {
    /// Region the line belongs to.
    pub region: RegionId,
    /// First endpoint id.
    pub a: u32,
    /// Second endpoint id.
    pub b: u32,
}

/// Immutable, validated catalog snapshot.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    objects: Vec<CatalogObject>,
    by_id: BTreeMap<u32, usize>,
    boundaries: Vec<RegionBoundary>,
    lines: Vec<ConnectorPair>,
    overlapping: Vec<(RegionId, RegionId)>,
}

impl Catalog {
    /// An empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse and validate the three exchange files.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Json`] if a file is not valid JSON for its
    /// schema, or [`EngineError::DataFormat`] if a record fails validation
    /// (see [`Catalog::from_parts`]).
    pub fn from_json(
        stars: &[u8],
        boundaries: &[u8],
        lines: &[u8],
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let stars: Vec<RawCatalogObject> =
            serde_json::from_slice(stars).map_err(|source| EngineError::Json {
                dataset: Dataset::Catalog,
                source,
            })?;
        let boundaries: RawBoundaries =
            serde_json::from_slice(boundaries).map_err(|source| EngineError::Json {
                dataset: Dataset::Boundaries,
                source,
            })?;
        let lines: RawLines = serde_json::from_slice(lines).map_err(|source| EngineError::Json {
            dataset: Dataset::Lines,
            source,
        })?;
        Self::from_parts(stars, &boundaries, &lines, config)
    }

    /// Validate already-deserialized records.
    ///
    /// Several raw boundary keys may normalize to the same region (`SER1`,
    /// `SER2`); each becomes a separate outline, ordered by raw key.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DataFormat`] naming the rejected dataset when:
    /// - a star has a non-finite number, RA outside `[0, 24)`, Dec outside
    ///   `[-90, 90]`, or an id already used by another star;
    /// - a boundary key does not name a known region, or a boundary point
    ///   is not a finite, in-range `[ra, dec]` pair;
    /// - a line key does not name a known region, a pair does not have
    ///   exactly two ids, or an id is not in the star list;
    /// - `config.reject_overlapping_regions` is set and two regions'
    ///   outlines overlap.
    pub fn from_parts(
        stars: Vec<RawCatalogObject>,
        boundaries: &RawBoundaries,
        lines: &RawLines,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let mut objects = Vec::with_capacity(stars.len());
        let mut by_id = BTreeMap::new();
        for (i, raw) in stars.into_iter().enumerate() {
            validate_star(i, &raw)?;
            if by_id.insert(raw.id, objects.len()).is_some() {
                return Err(EngineError::data(
                    Dataset::Catalog,
                    format!("duplicate star id {}", raw.id),
                ));
            }
            objects.push(CatalogObject::from_raw(raw));
        }

        let boundaries = parse_boundaries(boundaries)?;
        let lines = parse_lines(lines, &by_id)?;

        let overlapping = find_overlaps(&boundaries);
        for (a, b) in &overlapping {
            log::warn!("region boundaries overlap: {a} and {b}");
        }
        if config.reject_overlapping_regions
            && let Some((a, b)) = overlapping.first()
        {
            return Err(EngineError::data(
                Dataset::Boundaries,
                format!("regions {a} and {b} overlap"),
            ));
        }

        let unknown = objects.iter().filter(|o| o.region.is_none()).count();
        if unknown > 0 {
            log::debug!("{unknown} stars have no recognized region");
        }
        log::info!(
            "catalog loaded: {} stars, {} boundary outlines, {} line pairs",
            objects.len(),
            boundaries.len(),
            lines.len(),
        );

        Ok(Self {
            objects,
            by_id,
            boundaries,
            lines,
            overlapping,
        })
    }

    /// All objects in file order.
    #[must_use]
    pub fn objects(&self) -> &[CatalogObject] {
        &self.objects
    }

    /// Look up an object by id.
    #[must_use]
    pub fn object(&self, id: u32) -> Option<&CatalogObject> {
        self.by_id.get(&id).map(|&i| &self.objects[i])
    }

    /// Boundary outlines ordered by region, then raw key.
    #[must_use]
    pub fn boundaries(&self) -> &[RegionBoundary] {
        &self.boundaries
    }

    /// Connector pairs ordered by region, then file order.
    #[must_use]
    pub fn lines(&self) -> &[ConnectorPair] {
        &self.lines
    }

    /// Region pairs whose outlines overlap, each as `(lower, higher)`.
    #[must_use]
    pub fn overlapping_regions(&self) -> &[(RegionId, RegionId)] {
        &self.overlapping
    }

    /// Number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if the catalog has no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

fn validate_star(index: usize, raw: &RawCatalogObject) -> Result<(), EngineError> {
    let reject = |what: String| -> Result<(), EngineError> {
        Err(EngineError::data(
            Dataset::Catalog,
            format!("star {} (record {index}): {what}", raw.id),
        ))
    };
    if !(raw.magnitude.is_finite() && raw.ra_hours.is_finite() && raw.dec_degrees.is_finite()) {
        return reject("non-finite magnitude or coordinate".to_owned());
    }
    if !(0.0..24.0).contains(&raw.ra_hours) {
        return reject(format!("right ascension {} outside [0, 24)", raw.ra_hours));
    }
    if !(-90.0..=90.0).contains(&raw.dec_degrees) {
        return reject(format!("declination {} outside [-90, 90]", raw.dec_degrees));
    }
    Ok(())
}

fn parse_boundaries(raw: &RawBoundaries) -> Result<Vec<RegionBoundary>, EngineError> {
    let mut out = Vec::with_capacity(raw.len());
    for (key, points) in raw {
        let region = normalize_region_id(key).ok_or_else(|| {
            EngineError::data(Dataset::Boundaries, format!("unknown region key {key:?}"))
        })?;
        let mut outline = Vec::with_capacity(points.len());
        for (i, point) in points.iter().enumerate() {
            let &[ra, dec] = point.as_slice() else {
                return Err(EngineError::data(
                    Dataset::Boundaries,
                    format!("{key} point {i} has {} coordinates, expected 2", point.len()),
                ));
            };
            if !(ra.is_finite() && (0.0..=24.0).contains(&ra) && (-90.0..=90.0).contains(&dec)) {
                return Err(EngineError::data(
                    Dataset::Boundaries,
                    format!("{key} point {i} ({ra}, {dec}) out of range"),
                ));
            }
            // A closing vertex may be written as RA 24.
            outline.push(Equatorial::new(ra % 24.0, dec));
        }
        out.push(RegionBoundary {
            region,
            key: key.clone(),
            points: outline,
        });
    }
    // Stable: keys stay in order within a region.
    out.sort_by_key(|b| b.region);
    Ok(out)
}

fn parse_lines(
    raw: &RawLines,
    by_id: &BTreeMap<u32, usize>,
) -> Result<Vec<ConnectorPair>, EngineError> {
    let mut out = Vec::new();
    for (key, pairs) in raw {
        let region = normalize_region_id(key).ok_or_else(|| {
            EngineError::data(Dataset::Lines, format!("unknown region key {key:?}"))
        })?;
        for (i, pair) in pairs.iter().enumerate() {
            let &[a, b] = pair.as_slice() else {
                return Err(EngineError::data(
                    Dataset::Lines,
                    format!("{key} pair {i} has {} ids, expected 2", pair.len()),
                ));
            };
            if let Some(missing) = [a, b].into_iter().find(|id| !by_id.contains_key(id)) {
                return Err(EngineError::data(
                    Dataset::Lines,
                    format!("{key} pair {i} references unknown star {missing}"),
                ));
            }
            out.push(ConnectorPair { region, a, b });
        }
    }
    out.sort_by_key(|p| p.region);
    Ok(out)
}

/// Outline projected onto a polar azimuthal plane (degrees from the pole).
struct PolarOutline {
    region: RegionId,
    polygon: geo::Polygon<f64>,
    bounds: geo::Rect<f64>,
}

impl PolarOutline {
    fn new(boundary: &RegionBoundary, north: bool) -> Option<Self> {
        if boundary.points.len() < 3 {
            return None;
        }
        let coords: Vec<geo::Coord<f64>> = boundary
            .points
            .iter()
            .map(|p| polar_coord(*p, north))
            .collect();
        let polygon = geo::Polygon::new(geo::LineString::new(coords), vec![]);
        let bounds = polygon.bounding_rect()?;
        Some(Self {
            region: boundary.region,
            polygon,
            bounds,
        })
    }

    /// Whether any vertex of `self` sits clearly inside `other`.
    fn intrudes_into(&self, other: &Self) -> bool {
        self.polygon.exterior().points().any(|vertex| {
            other.polygon.contains(&vertex)
                && distance_to_outline(&other.polygon, vertex) > OVERLAP_TOLERANCE_DEGREES
        })
    }
}

fn polar_coord(p: Equatorial, north: bool) -> geo::Coord<f64> {
    let r = if north {
        90.0 - p.dec_degrees
    } else {
        90.0 + p.dec_degrees
    };
    let (sin, cos) = (p.ra_hours * 15.0).to_radians().sin_cos();
    geo::Coord {
        x: r * cos,
        y: r * sin,
    }
}

fn distance_to_outline(polygon: &geo::Polygon<f64>, point: geo::Point<f64>) -> f64 {
    match polygon.exterior().closest_point(&point) {
        Closest::Intersection(_) => 0.0,
        Closest::SinglePoint(q) => Euclidean.distance(&point, &q),
        Closest::Indeterminate => f64::INFINITY,
    }
}

fn mean_dec(boundary: &RegionBoundary) -> f64 {
    let n = boundary.points.len().max(1);
    #[allow(clippy::cast_precision_loss)]
    let mean = boundary.points.iter().map(|p| p.dec_degrees).sum::<f64>() / n as f64;
    mean
}

/// Region pairs whose outlines overlap, deduplicated and sorted.
fn find_overlaps(boundaries: &[RegionBoundary]) -> Vec<(RegionId, RegionId)> {
    let mut found = Vec::new();
    for (i, a) in boundaries.iter().enumerate() {
        for b in &boundaries[i + 1..] {
            if a.region == b.region {
                continue;
            }
            let north = mean_dec(a) + mean_dec(b) >= 0.0;
            let (Some(pa), Some(pb)) = (PolarOutline::new(a, north), PolarOutline::new(b, north))
            else {
                continue;
            };
            if !pa.bounds.intersects(&pb.bounds) {
                continue;
            }
            if pa.intrudes_into(&pb) || pb.intrudes_into(&pa) {
                found.push((pa.region.min(pb.region), pa.region.max(pb.region)));
            }
        }
    }
    found.sort_unstable();
    found.dedup();
    found
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn star(id: u32, ra: f64, dec: f64, region: &str) -> RawCatalogObject {
        RawCatalogObject {
            id,
            proper_name: None,
            designation: None,
            magnitude: 2.0,
            ra_hours: ra,
            dec_degrees: dec,
            region: Some(region.to_owned()),
        }
    }

    /// An RA/Dec box as a closed outline.
    fn square(ra0: f64, ra1: f64, dec0: f64, dec1: f64) -> Vec<Vec<f64>> {
        vec![
            vec![ra0, dec0],
            vec![ra1, dec0],
            vec![ra1, dec1],
            vec![ra0, dec1],
        ]
    }

    fn build(
        stars: Vec<RawCatalogObject>,
        boundaries: RawBoundaries,
        lines: RawLines,
    ) -> Result<Catalog, EngineError> {
        Catalog::from_parts(stars, &boundaries, &lines, &EngineConfig::default())
    }

    fn assert_rejects(result: Result<Catalog, EngineError>, dataset: Dataset) {
        assert!(
            matches!(result, Err(EngineError::DataFormat { dataset: d, .. }) if d == dataset),
            "expected {dataset} DataFormat error, got {result:?}"
        );
    }

    #[test]
    fn parses_exchange_json() {
        let stars = br#"[
            {"id": 24436, "p": "Rigel", "b": "Beta Orionis", "m": 0.18, "r": 5.24226, "d": -8.20164, "c": "Ori"},
            {"id": 27989, "p": null, "b": "Alpha Orionis", "m": 0.45, "r": 5.91953, "d": 7.40703, "c": "ORI"},
            {"id": 1, "m": 6.5, "r": 0.1, "d": 1.0, "c": "???"}
        ]"#;
        let boundaries = br#"{"ORI": [[4.7, -11.0], [6.4, -11.0], [6.4, 22.0], [4.7, 22.0]]}"#;
        let lines = br#"{"CON modern Ori": [[24436, 27989]]}"#;
        let catalog =
            Catalog::from_json(stars, boundaries, lines, &EngineConfig::default()).unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.object(24436).unwrap().display_name, "Rigel");
        assert_eq!(catalog.object(27989).unwrap().display_name, "Alpha Orionis");
        assert_eq!(catalog.object(1).unwrap().display_name, "HIP 1");
        assert!(catalog.object(1).unwrap().region.is_none());
        assert_eq!(
            catalog.object(27989).unwrap().region,
            normalize_region_id("Ori")
        );
        assert_eq!(catalog.boundaries().len(), 1);
        assert_eq!(catalog.boundaries()[0].region.as_str(), "Ori");
        assert_eq!(catalog.lines().len(), 1);
        assert!(catalog.overlapping_regions().is_empty());
    }

    #[test]
    fn blank_names_fall_through() {
        let mut raw = star(7, 1.0, 1.0, "Psc");
        raw.proper_name = Some("  ".to_owned());
        raw.designation = Some("Eta Piscium".to_owned());
        let catalog = build(vec![raw], RawBoundaries::new(), RawLines::new()).unwrap();
        assert_eq!(catalog.object(7).unwrap().display_name, "Eta Piscium");
    }

    #[test]
    fn bad_json_names_dataset() {
        let err = Catalog::from_json(b"[", b"{}", b"{}", &EngineConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Json {
                dataset: Dataset::Catalog,
                ..
            }
        ));
        let err = Catalog::from_json(b"[]", b"[]", b"{}", &EngineConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Json {
                dataset: Dataset::Boundaries,
                ..
            }
        ));
        let err =
            Catalog::from_json(b"[]", b"{}", br#"{"Ori": [[1.5, 2]]}"#, &EngineConfig::default())
                .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Json {
                dataset: Dataset::Lines,
                ..
            }
        ));
    }

    #[test]
    fn rejects_out_of_range_stars() {
        assert_rejects(
            build(vec![star(1, 24.0, 0.0, "Ori")], RawBoundaries::new(), RawLines::new()),
            Dataset::Catalog,
        );
        assert_rejects(
            build(vec![star(1, 1.0, 90.5, "Ori")], RawBoundaries::new(), RawLines::new()),
            Dataset::Catalog,
        );
        let mut nan = star(1, 1.0, 0.0, "Ori");
        nan.magnitude = f64::NAN;
        assert_rejects(
            build(vec![nan], RawBoundaries::new(), RawLines::new()),
            Dataset::Catalog,
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let stars = vec![star(5, 1.0, 0.0, "Ori"), star(5, 2.0, 0.0, "Ori")];
        assert_rejects(build(stars, RawBoundaries::new(), RawLines::new()), Dataset::Catalog);
    }

    #[test]
    fn rejects_bad_boundaries() {
        let mut unknown = RawBoundaries::new();
        unknown.insert("Nowhere".to_owned(), square(1.0, 2.0, 0.0, 10.0));
        assert_rejects(build(vec![], unknown, RawLines::new()), Dataset::Boundaries);

        let mut arity = RawBoundaries::new();
        arity.insert("Ori".to_owned(), vec![vec![1.0, 2.0], vec![1.0]]);
        assert_rejects(build(vec![], arity, RawLines::new()), Dataset::Boundaries);

        let mut range = RawBoundaries::new();
        range.insert("Ori".to_owned(), vec![vec![1.0, 95.0]]);
        assert_rejects(build(vec![], range, RawLines::new()), Dataset::Boundaries);
    }

    #[test]
    fn rejects_bad_lines() {
        let stars = vec![star(1, 1.0, 0.0, "Ori"), star(2, 1.1, 0.0, "Ori")];

        let mut unknown_id = RawLines::new();
        unknown_id.insert("Ori".to_owned(), vec![vec![1, 3]]);
        assert_rejects(
            build(stars.clone(), RawBoundaries::new(), unknown_id),
            Dataset::Lines,
        );

        let mut arity = RawLines::new();
        arity.insert("Ori".to_owned(), vec![vec![1, 2, 1]]);
        assert_rejects(build(stars.clone(), RawBoundaries::new(), arity), Dataset::Lines);

        let mut key = RawLines::new();
        key.insert("Zzz".to_owned(), vec![vec![1, 2]]);
        assert_rejects(build(stars, RawBoundaries::new(), key), Dataset::Lines);
    }

    #[test]
    fn split_region_keys_become_separate_outlines() {
        let mut boundaries = RawBoundaries::new();
        boundaries.insert("SER2".to_owned(), square(18.0, 19.0, -10.0, 5.0));
        boundaries.insert("Ori".to_owned(), square(5.0, 6.0, -10.0, 10.0));
        boundaries.insert("SER1".to_owned(), square(15.0, 16.0, 0.0, 20.0));
        let catalog = build(vec![], boundaries, RawLines::new()).unwrap();

        let keys: Vec<(&str, &str)> = catalog
            .boundaries()
            .iter()
            .map(|b| (b.region.as_str(), b.key.as_str()))
            .collect();
        assert_eq!(keys, vec![("Ori", "Ori"), ("Ser", "SER1"), ("Ser", "SER2")]);
    }

    #[test]
    fn ra_24_closing_vertex_wraps() {
        let mut boundaries = RawBoundaries::new();
        boundaries.insert("Psc".to_owned(), square(23.0, 24.0, 0.0, 10.0));
        let catalog = build(vec![], boundaries, RawLines::new()).unwrap();
        assert!(
            catalog.boundaries()[0]
                .points
                .iter()
                .all(|p| p.ra_hours < 24.0)
        );
    }

    #[test]
    fn adjacent_regions_do_not_overlap() {
        let mut boundaries = RawBoundaries::new();
        boundaries.insert("Ori".to_owned(), square(5.0, 6.0, 0.0, 10.0));
        boundaries.insert("Mon".to_owned(), square(6.0, 7.0, 0.0, 10.0));
        let catalog = build(vec![], boundaries, RawLines::new()).unwrap();
        assert!(catalog.overlapping_regions().is_empty());
    }

    #[test]
    fn overlapping_regions_are_reported() {
        let mut boundaries = RawBoundaries::new();
        boundaries.insert("Ori".to_owned(), square(5.0, 6.0, 0.0, 10.0));
        boundaries.insert("Tau".to_owned(), square(5.2, 6.5, 2.0, 8.0));
        let catalog = build(vec![], boundaries.clone(), RawLines::new()).unwrap();
        let ori = normalize_region_id("Ori").unwrap();
        let tau = normalize_region_id("Tau").unwrap();
        assert_eq!(catalog.overlapping_regions(), &[(ori, tau)]);

        let strict = EngineConfig {
            reject_overlapping_regions: true,
            ..EngineConfig::default()
        };
        let result = Catalog::from_parts(vec![], &boundaries, &RawLines::new(), &strict);
        assert_rejects(result, Dataset::Boundaries);
    }

    #[test]
    fn southern_overlap_uses_south_projection() {
        let mut boundaries = RawBoundaries::new();
        boundaries.insert("Cru".to_owned(), square(12.0, 13.0, -65.0, -55.0));
        boundaries.insert("Cen".to_owned(), square(12.3, 13.5, -62.0, -58.0));
        let catalog = build(vec![], boundaries, RawLines::new()).unwrap();
        assert_eq!(catalog.overlapping_regions().len(), 1);
    }

    #[test]
    fn empty_catalog_is_valid() {
        let catalog = Catalog::from_json(b"[]", b"{}", b"{}", &EngineConfig::default()).unwrap();
        assert!(catalog.is_empty());
        assert!(Catalog::empty().is_empty());
    }
}
