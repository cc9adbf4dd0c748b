//! Engine façade: one observer, one catalog snapshot, one camera.
//!
//! The engine publishes each recomputed state by swapping an [`Arc`].
//! Readers holding the previous `Arc` keep a consistent snapshot.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::camera::CameraController;
use crate::catalog::Catalog;
use crate::diagnostics::{Clock, RecomputeDiagnostics};
use crate::ephemeris::Ephemeris;
use crate::region::RegionId;
use crate::types::{EngineConfig, EngineError, Observer, Point, ProjectedObject};
use crate::view::{ProjectedViewState, ViewCalculator};

/// Sky-view engine for a single observer.
#[derive(Debug)]
pub struct SkyEngine<E> {
    ephemeris: E,
    observer: Observer,
    config: EngineConfig,
    catalog: Arc<Catalog>,
    state: Option<Arc<ProjectedViewState>>,
    camera: CameraController,
}

impl<E: Ephemeris> SkyEngine<E> {
    /// Start an engine with an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EphemerisUnavailable`] if the provider's
    /// readiness check fails, or [`EngineError::InvalidConfig`] if the
    /// config does not validate.
    pub fn new(
        ephemeris: E,
        observer: Observer,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        ephemeris.check()?;
        config.validate()?;
        log::debug!(
            "engine started for observer at ({}, {})",
            observer.latitude(),
            observer.longitude()
        );
        let camera = CameraController::new(&config);
        Ok(Self {
            ephemeris,
            observer,
            config,
            catalog: Arc::new(Catalog::empty()),
            state: None,
            camera,
        })
    }

    /// The observer.
    #[must_use]
    pub const fn observer(&self) -> &Observer {
        &self.observer
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current catalog snapshot.
    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    /// Swap in a new catalog. The current view state is kept until the
    /// next recompute.
    pub fn replace_catalog(&mut self, catalog: Catalog) {
        self.catalog = Arc::new(catalog);
    }

    /// Parse, validate and swap in a catalog from the three exchange files.
    ///
    /// # Errors
    ///
    /// Returns the [`Catalog::from_json`] error; the current catalog is
    /// left untouched.
    pub fn load_catalog_json(
        &mut self,
        stars: &[u8],
        boundaries: &[u8],
        lines: &[u8],
    ) -> Result<(), EngineError> {
        let catalog = Catalog::from_json(stars, boundaries, lines, &self.config)?;
        self.replace_catalog(catalog);
        Ok(())
    }

    /// Most recently published state, if any recompute has run.
    #[must_use]
    pub fn state(&self) -> Option<Arc<ProjectedViewState>> {
        self.state.clone()
    }

    /// Recompute and publish the view state.
    pub fn recompute(
        &mut self,
        date: DateTime<Utc>,
        magnitude_limit: f64,
    ) -> Arc<ProjectedViewState> {
        let state = Arc::new(
            self.calculator()
                .recompute(&self.catalog, date, magnitude_limit),
        );
        self.state = Some(Arc::clone(&state));
        state
    }

    /// Recompute and publish, also returning stage diagnostics.
    pub fn recompute_with_diagnostics(
        &mut self,
        date: DateTime<Utc>,
        magnitude_limit: f64,
        clock: &impl Clock,
    ) -> (Arc<ProjectedViewState>, RecomputeDiagnostics) {
        let (state, diagnostics) = self.calculator().recompute_with_diagnostics(
            &self.catalog,
            date,
            magnitude_limit,
            clock,
        );
        let state = Arc::new(state);
        self.state = Some(Arc::clone(&state));
        (state, diagnostics)
    }

    /// The camera.
    #[must_use]
    pub const fn camera(&self) -> &CameraController {
        &self.camera
    }

    /// The camera, for zooming and panning.
    pub const fn camera_mut(&mut self) -> &mut CameraController {
        &mut self.camera
    }

    /// Region under a screen point, through the inverse camera transform.
    #[must_use]
    pub fn region_at_screen(&self, screen: Point) -> Option<RegionId> {
        let world = self.camera.screen_to_world(screen);
        self.state.as_ref()?.find_region_at_point(world)
    }

    /// Nearest visible object within `radius` screen units of a screen
    /// point. Brighter objects win exact distance ties.
    #[must_use]
    pub fn object_at_screen(&self, screen: Point, radius: f64) -> Option<ProjectedObject> {
        let state = self.state.as_ref()?;
        let world = self.camera.screen_to_world(screen);
        let world_radius = radius / self.camera.scale();
        let limit = world_radius * world_radius;

        let mut best: Option<(f64, &ProjectedObject)> = None;
        for object in state.visible() {
            let d = object.position.distance_squared(world);
            if d <= limit && best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, object));
            }
        }
        best.map(|(_, object)| object.clone())
    }

    fn calculator(&self) -> ViewCalculator<'_, E> {
        ViewCalculator::new(&self.ephemeris, &self.observer, &self.config)
    }
}
