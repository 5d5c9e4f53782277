use crate::braille::BrailleCanvas;
use crate::error::{Error, Result};
use crate::geo::wrap_lon;
use crate::map::interaction::{self, Interaction};
use crate::map::{
    render_overlay, BasemapSet, FeatureId, FeatureRegistry, GeoJsonInput, InteractionController,
    MapSurface, PointerEvent, Restyle, Viewport,
};
use crate::panel::{ControlAction, ControlPanel, ControlSet, InfoPanel};
use glam::DVec2;
use tracing::{debug, info, warn};

/// Construction parameters of a map widget
pub struct WidgetOptions {
    pub basemaps: BasemapSet,
    pub basemap: String,
    pub center: DVec2,
    pub zoom: f64,
    pub controls: ControlSet,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            basemaps: BasemapSet::default(),
            basemap: "osm".to_string(),
            center: DVec2::new(4.553, 50.8999),
            zoom: 8.0,
            controls: ControlSet::all(),
        }
    }
}

/// One map instance: features, overlay, selection and controls
pub struct MapWidget {
    registry: FeatureRegistry,
    surface: MapSurface,
    controller: InteractionController,
    info: InfoPanel,
    panel: ControlPanel,
    /// Feature currently under the pointer
    pointer_feature: Option<FeatureId>,
    feature_count: usize,
    status: Option<String>,
}

impl MapWidget {
    pub fn new(options: WidgetOptions, width: usize, height: usize) -> Result<Self> {
        let viewport = Viewport::new(options.center.x, options.center.y, options.zoom, width, height);
        let surface = MapSurface::new(options.basemaps, &options.basemap, viewport)?;
        let panel = ControlPanel::bind(&options.controls, surface.basemaps(), surface.active_basemap());

        let mut widget = Self {
            registry: FeatureRegistry::new(),
            surface,
            controller: InteractionController::new(),
            info: InfoPanel::default(),
            panel,
            pointer_feature: None,
            feature_count: 0,
            status: None,
        };
        widget.sync_zoom();
        widget.panel.on_feature_count(0);
        Ok(widget)
    }

    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    pub fn surface(&self) -> &MapSurface {
        &self.surface
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn panel(&self) -> &ControlPanel {
        &self.panel
    }

    pub fn info(&self) -> &InfoPanel {
        &self.info
    }

    pub fn viewport(&self) -> &Viewport {
        &self.surface.viewport
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// Replace the overlay with a new document.
    ///
    /// A parse failure leaves the current overlay untouched and is reported
    /// in the status line.
    pub fn load<'a>(&mut self, input: impl Into<GeoJsonInput<'a>>) -> Result<usize> {
        let loaded = match self.registry.load(input) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(error = %e, "GeoJSON rejected");
                self.status = Some(format!("Invalid GeoJSON: {}", e));
                return Err(e);
            }
        };

        self.controller.clear();
        self.pointer_feature = None;
        self.info.clear();
        self.surface.add_overlay(loaded.layers);

        match loaded.bounds {
            Some(b) => self.surface.fit_to_bounds(Some(b)),
            None => debug!("{}, keeping the current view", Error::Bounds),
        }

        self.feature_count = loaded.count;
        self.panel.on_feature_count(loaded.count);
        self.sync_zoom();
        self.status = Some(format!("Loaded {} features", loaded.count));
        info!(count = loaded.count, "overlay replaced");
        Ok(loaded.count)
    }

    /// Surface a failed fetch without touching the map
    pub fn report_transport_error(&mut self, error: &Error) {
        warn!(error = %error, "map data fetch failed");
        self.status = Some(format!("Could not load map data: {}", error));
    }

    fn interaction(&mut self) -> Interaction<'_> {
        Interaction::new(
            &mut self.controller,
            &self.registry,
            &mut self.surface,
            &mut self.info,
        )
    }

    fn send(&mut self, id: FeatureId, event: PointerEvent) -> Vec<Restyle> {
        let restyles = interaction::dispatch(self.interaction(), id, event);
        self.sync_zoom();
        restyles
    }

    /// Pointer moved to braille pixel `(px, py)` of the map canvas
    pub fn pointer_moved(&mut self, px: i32, py: i32) {
        let (lon, lat) = self.surface.viewport.unproject(px, py);
        self.panel.on_pointer_moved(DVec2::new(wrap_lon(lon), lat));

        let under = self.surface.hit_test(&self.registry, px, py);
        if under == self.pointer_feature {
            return;
        }
        if let Some(prev) = self.pointer_feature.take() {
            self.send(prev, PointerEvent::Leave);
        }
        if let Some(id) = under {
            self.send(id, PointerEvent::Enter);
        }
        self.pointer_feature = under;
    }

    /// Pointer left the map area
    pub fn pointer_left(&mut self) {
        if let Some(prev) = self.pointer_feature.take() {
            self.send(prev, PointerEvent::Leave);
        }
    }

    /// Click at braille pixel `(px, py)`; returns the clicked feature
    pub fn click(&mut self, px: i32, py: i32) -> Option<FeatureId> {
        let id = self.surface.hit_test(&self.registry, px, py)?;
        self.send(id, PointerEvent::Click);
        Some(id)
    }

    /// Select a feature directly
    pub fn select(&mut self, id: FeatureId) -> Vec<Restyle> {
        self.send(id, PointerEvent::Click)
    }

    pub fn reset(&mut self) -> Vec<Restyle> {
        let restyles = interaction::reset(self.interaction());
        self.sync_zoom();
        restyles
    }

    /// Switch basemap; unknown names are reported and ignored
    pub fn set_basemap(&mut self, name: &str) -> bool {
        match self.surface.set_basemap(name) {
            Ok(changed) => {
                if changed {
                    self.panel.on_basemap_changed(name);
                    self.sync_zoom();
                }
                changed
            }
            Err(e) => {
                warn!(error = %e, "basemap not switched");
                self.status = Some(e.to_string());
                false
            }
        }
    }

    pub fn toggle_overlay(&mut self) -> bool {
        let visible = self.surface.toggle_overlay_visibility();
        if !visible {
            self.pointer_left();
        }
        visible
    }

    /// Run the action of a bound control key; false when no control took it
    pub fn handle_control_key(&mut self, key: char) -> bool {
        let Some(action) = self.panel.action_for_key(key) else {
            return false;
        };
        match action {
            ControlAction::SelectBasemap(name) => {
                self.set_basemap(&name);
            }
            ControlAction::Reset => {
                self.reset();
            }
            ControlAction::ToggleOverlay => {
                self.toggle_overlay();
            }
        }
        true
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.surface.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.surface.viewport.zoom_in();
        self.sync_zoom();
    }

    pub fn zoom_out(&mut self) {
        self.surface.viewport.zoom_out();
        self.sync_zoom();
    }

    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.surface.viewport.zoom_in_at(px, py);
        self.sync_zoom();
    }

    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.surface.viewport.zoom_out_at(px, py);
        self.sync_zoom();
    }

    /// Canvas size in braille pixels
    pub fn resize(&mut self, width: usize, height: usize) {
        self.surface.viewport.width = width;
        self.surface.viewport.height = height;
    }

    /// Draw the overlay; returns marker labels in character coordinates
    pub fn render(&self, canvas: &mut BrailleCanvas) -> Vec<(u16, u16, String)> {
        render_overlay(canvas, &self.surface, &self.registry)
    }

    fn sync_zoom(&mut self) {
        self.panel.on_zoom_changed(self.surface.viewport.zoom);
    }
}
