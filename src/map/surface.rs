use crate::error::{Error, Result};
use crate::geo::Bounds;
use crate::map::basemap::{BasemapSet, TileLayer};
use crate::map::feature::FeatureId;
use crate::map::geometry::{distance_to_path, point_in_polygon};
use crate::map::projection::Viewport;
use crate::map::registry::{FeatureRegistry, RenderedLayer};
use crate::map::style::Symbol;
use glam::DVec2;
use tracing::{debug, info};

/// Pointer tolerance around lines and markers, in braille pixels
const HIT_TOLERANCE: f64 = 2.0;

/// The GeoJSON overlay: layers plus their draw order
#[derive(Debug, Clone)]
struct Overlay {
    /// Indexed by feature id
    layers: Vec<RenderedLayer>,
    /// Back-to-front
    order: Vec<FeatureId>,
    visible: bool,
}

/// Owns the active basemap, the GeoJSON overlay and the viewport
pub struct MapSurface {
    basemaps: BasemapSet,
    active: String,
    overlay: Option<Overlay>,
    pub viewport: Viewport,
}

impl MapSurface {
    /// Surface with `basemap` attached; fails if the name is unknown
    pub fn new(basemaps: BasemapSet, basemap: &str, mut viewport: Viewport) -> Result<Self> {
        let layer = basemaps
            .get(basemap)
            .ok_or_else(|| Error::UnknownBasemap(basemap.to_string()))?;
        viewport.set_max_zoom(layer.max_zoom as f64);
        Ok(Self {
            active: basemap.to_string(),
            basemaps,
            overlay: None,
            viewport,
        })
    }

    pub fn basemaps(&self) -> &BasemapSet {
        &self.basemaps
    }

    pub fn active_basemap(&self) -> &str {
        &self.active
    }

    pub fn active_tile_layer(&self) -> Option<&TileLayer> {
        self.basemaps.get(&self.active)
    }

    /// Switch basemap. Returns `Ok(false)` when `name` is already active.
    /// An unknown name leaves the current basemap attached.
    pub fn set_basemap(&mut self, name: &str) -> Result<bool> {
        if name == self.active {
            return Ok(false);
        }
        let layer = self
            .basemaps
            .get(name)
            .ok_or_else(|| Error::UnknownBasemap(name.to_string()))?;

        // Single slot: the previous basemap is detached by the assignment
        self.viewport.set_max_zoom(layer.max_zoom as f64);
        self.active = name.to_string();
        info!(basemap = name, "basemap switched");
        Ok(true)
    }

    /// Attach `layers` as the overlay, replacing any existing one
    pub fn add_overlay(&mut self, layers: Vec<RenderedLayer>) {
        let order = layers.iter().map(|l| l.feature).collect();
        self.overlay = Some(Overlay {
            layers,
            order,
            visible: true,
        });
    }

    /// Detach the overlay; a no-op when none is attached
    pub fn remove_overlay(&mut self) {
        if self.overlay.take().is_some() {
            debug!("overlay removed");
        }
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn is_overlay_visible(&self) -> bool {
        self.overlay.as_ref().is_some_and(|o| o.visible)
    }

    pub fn show_overlay(&mut self) {
        if let Some(o) = self.overlay.as_mut() {
            o.visible = true;
        }
    }

    pub fn hide_overlay(&mut self) {
        if let Some(o) = self.overlay.as_mut() {
            o.visible = false;
        }
    }

    /// Flip overlay visibility and return the new state
    pub fn toggle_overlay_visibility(&mut self) -> bool {
        if self.is_overlay_visible() {
            self.hide_overlay();
        } else {
            self.show_overlay();
        }
        self.is_overlay_visible()
    }

    /// Number of layers held by the overlay, visible or not
    pub fn layer_count(&self) -> usize {
        self.overlay.as_ref().map_or(0, |o| o.layers.len())
    }

    pub fn layer(&self, id: FeatureId) -> Option<&RenderedLayer> {
        self.overlay.as_ref()?.layers.get(id.index())
    }

    pub fn symbol(&self, id: FeatureId) -> Option<&Symbol> {
        self.layer(id).map(|l| &l.symbol)
    }

    /// Replace the symbol of one layer
    pub fn set_symbol(&mut self, id: FeatureId, symbol: Symbol) {
        if let Some(layer) = self
            .overlay
            .as_mut()
            .and_then(|o| o.layers.get_mut(id.index()))
        {
            layer.symbol = symbol;
        }
    }

    /// Move a layer to the end of the draw order
    pub fn bring_to_front(&mut self, id: FeatureId) {
        if let Some(o) = self.overlay.as_mut() {
            if let Some(pos) = o.order.iter().position(|f| *f == id) {
                let f = o.order.remove(pos);
                o.order.push(f);
            }
        }
    }

    /// Visible layers, back-to-front
    pub fn visible_layers(&self) -> impl Iterator<Item = &RenderedLayer> + '_ {
        self.overlay
            .iter()
            .filter(|o| o.visible)
            .flat_map(|o| o.order.iter().filter_map(|id| o.layers.get(id.index())))
    }

    /// Fit the viewport to `region`, or show the world when there is none
    pub fn fit_to_bounds(&mut self, region: Option<Bounds>) {
        match region {
            Some(b) if b.is_valid() => self.viewport.fit_bounds(&b),
            _ => self.viewport.reset_world(),
        }
    }

    /// Center on a point and raise the zoom to at least `min_zoom`
    pub fn focus_point(&mut self, point: DVec2, min_zoom: f64) {
        self.viewport.set_center(point);
        self.viewport.set_zoom(self.viewport.zoom.max(min_zoom));
    }

    /// Topmost visible feature under the braille pixel `(px, py)`
    pub fn hit_test(&self, registry: &FeatureRegistry, px: i32, py: i32) -> Option<FeatureId> {
        let cursor = DVec2::new(px as f64, py as f64);
        let (lon, lat) = self.viewport.unproject(px, py);
        let lonlat = DVec2::new(lon, lat);

        let layers: Vec<&RenderedLayer> = self.visible_layers().collect();
        layers.into_iter().rev().find_map(|layer| {
            let feature = registry.get(layer.feature)?;
            let shape = &feature.shape;
            let project = |p: &DVec2| self.viewport.project_f(*p);

            let marker_radius = match &layer.symbol {
                Symbol::Marker { radius, .. } => marker_pixels(*radius) as f64,
                Symbol::Path(_) => 1.0,
            };
            let on_point = shape
                .points
                .iter()
                .any(|p| project(p).distance(cursor) <= marker_radius + HIT_TOLERANCE);

            let on_line = || {
                shape.lines.iter().any(|line| {
                    let projected: Vec<DVec2> = line.iter().map(project).collect();
                    distance_to_path(cursor, &projected) <= HIT_TOLERANCE
                })
            };

            let in_area = || shape.polygons.iter().any(|rings| point_in_polygon(lonlat, rings));

            (on_point || on_line() || in_area()).then_some(layer.feature)
        })
    }
}

/// Marker radius converted to braille pixels
pub fn marker_pixels(radius: f64) -> i32 {
    (radius / 4.0).round().max(1.0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::style::{default_style, highlight_style, DEFAULT_COLOR};
    use serde_json::json;

    fn surface() -> MapSurface {
        MapSurface::new(BasemapSet::default(), "osm", Viewport::world(200, 100)).unwrap()
    }

    fn layers(n: usize) -> Vec<RenderedLayer> {
        (0..n)
            .map(|i| RenderedLayer {
                feature: FeatureId(i),
                symbol: Symbol::Path(default_style(DEFAULT_COLOR)),
            })
            .collect()
    }

    #[test]
    fn test_unknown_initial_basemap() {
        let err = MapSurface::new(BasemapSet::default(), "mars", Viewport::world(10, 10)).err();
        assert_eq!(err, Some(Error::UnknownBasemap("mars".into())));
    }

    #[test]
    fn test_set_basemap() {
        let mut s = surface();
        assert_eq!(s.set_basemap("osm"), Ok(false));
        assert_eq!(s.set_basemap("topo"), Ok(true));
        assert_eq!(s.active_basemap(), "topo");
        assert_eq!(s.viewport.max_zoom, 17.0);
        assert!(s.set_basemap("mars").is_err());
        assert_eq!(s.active_basemap(), "topo");
    }

    #[test]
    fn test_basemap_switch_clamps_zoom() {
        let mut s = surface();
        s.viewport.set_zoom(19.0);
        s.set_basemap("topo").unwrap();
        assert_eq!(s.viewport.zoom, 17.0);
    }

    #[test]
    fn test_toggle_twice_restores() {
        let mut s = surface();
        s.add_overlay(layers(4));
        assert!(s.is_overlay_visible());
        assert!(!s.toggle_overlay_visibility());
        assert_eq!(s.visible_layers().count(), 0);
        assert!(s.toggle_overlay_visibility());
        assert_eq!(s.layer_count(), 4);
        assert_eq!(s.visible_layers().count(), 4);
    }

    #[test]
    fn test_overlay_ops_idempotent() {
        let mut s = surface();
        s.remove_overlay();
        s.hide_overlay();
        s.show_overlay();
        assert!(!s.toggle_overlay_visibility());
        assert_eq!(s.layer_count(), 0);

        s.add_overlay(layers(2));
        s.add_overlay(layers(2));
        assert_eq!(s.layer_count(), 2);
        s.hide_overlay();
        s.hide_overlay();
        assert!(!s.is_overlay_visible());
        s.remove_overlay();
        s.remove_overlay();
        assert!(!s.has_overlay());
    }

    #[test]
    fn test_bring_to_front() {
        let mut s = surface();
        s.add_overlay(layers(3));
        s.bring_to_front(FeatureId(0));
        let order: Vec<_> = s.visible_layers().map(|l| l.feature).collect();
        assert_eq!(order, vec![FeatureId(1), FeatureId(2), FeatureId(0)]);
    }

    #[test]
    fn test_set_symbol() {
        let mut s = surface();
        s.add_overlay(layers(2));
        s.set_symbol(FeatureId(1), Symbol::Path(highlight_style()));
        assert_eq!(s.symbol(FeatureId(1)), Some(&Symbol::Path(highlight_style())));
        // Unknown ids are ignored
        s.set_symbol(FeatureId(9), Symbol::Path(highlight_style()));
    }

    #[test]
    fn test_fit_without_region_is_world() {
        let mut s = surface();
        s.viewport.set_zoom(10.0);
        s.fit_to_bounds(None);
        assert_eq!(s.viewport.zoom, 0.0);
    }

    #[test]
    fn test_focus_point_never_lowers_zoom() {
        let mut s = surface();
        s.focus_point(DVec2::new(4.0, 50.0), 15.0);
        assert_eq!(s.viewport.zoom, 15.0);
        s.viewport.set_zoom(18.0);
        s.focus_point(DVec2::new(4.0, 50.0), 15.0);
        assert_eq!(s.viewport.zoom, 18.0);
    }

    #[test]
    fn test_hit_test() {
        let mut reg = FeatureRegistry::new();
        let loaded = reg
            .load(json!({
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "properties": {}, "geometry": {"type": "Polygon", "coordinates": [[[-5.0, -5.0], [-5.0, 5.0], [5.0, 5.0], [5.0, -5.0], [-5.0, -5.0]]]}},
                    {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}}
                ]
            }))
            .unwrap();
        let mut s = MapSurface::new(
            BasemapSet::default(),
            "osm",
            Viewport::new(0.0, 0.0, 4.0, 200, 100),
        )
        .unwrap();
        s.add_overlay(loaded.layers);

        // Marker is drawn on top of the polygon
        assert_eq!(s.hit_test(&reg, 100, 50), Some(FeatureId(1)));
        assert_eq!(s.hit_test(&reg, 110, 55), Some(FeatureId(0)));
        assert_eq!(s.hit_test(&reg, 5, 5), None);

        s.hide_overlay();
        assert_eq!(s.hit_test(&reg, 100, 50), None);
    }
}
