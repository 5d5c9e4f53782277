use crate::geo::{clamp_lat, from_mercator, to_mercator, wrap_lon, Bounds};
use glam::DVec2;

/// Lowest zoom level; the whole world spans the canvas width
pub const MIN_ZOOM: f64 = 0.0;

/// Fraction of the canvas kept free on each side when fitting bounds
const FIT_PADDING: f64 = 0.05;

/// Viewport representing the visible map area and zoom level
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (Mercator range)
    pub center_lat: f64,
    /// Zoom level; each step doubles the scale
    pub zoom: f64,
    /// Upper zoom bound imposed by the active basemap
    pub max_zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon: wrap_lon(center_lon),
            center_lat: clamp_lat(center_lat),
            zoom: zoom.max(MIN_ZOOM),
            max_zoom: f64::MAX,
            width,
            height,
        }
    }

    /// Create a world view (shows entire world)
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(0.0, 20.0, MIN_ZOOM, width, height)
    }

    /// Reset center and zoom to the world view, keeping size and zoom limit
    pub fn reset_world(&mut self) {
        self.center_lon = 0.0;
        self.center_lat = 20.0;
        self.zoom = MIN_ZOOM;
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(self.center_lon, self.center_lat)
    }

    /// Braille pixels per normalized Mercator unit
    fn scale(&self) -> f64 {
        self.width.max(1) as f64 * self.zoom.exp2()
    }

    pub fn set_max_zoom(&mut self, max_zoom: f64) {
        self.max_zoom = max_zoom.max(MIN_ZOOM);
        self.zoom = self.zoom.min(self.max_zoom);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(MIN_ZOOM, self.max_zoom);
    }

    pub fn set_center(&mut self, lonlat: DVec2) {
        self.center_lon = wrap_lon(lonlat.x);
        self.center_lat = clamp_lat(lonlat.y);
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let center = to_mercator(self.center());
        let scale = self.scale();
        let moved = DVec2::new(center.x + dx as f64 / scale, center.y + dy as f64 / scale);
        self.set_center(from_mercator(moved));
    }

    /// Zoom in by one level
    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + 1.0);
    }

    /// Zoom out by one level
    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - 1.0);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, -1.0);
    }

    /// Zoom by `delta` levels keeping the point under the pointer fixed
    fn zoom_at(&mut self, px: i32, py: i32, delta: f64) {
        let (lon, lat) = self.unproject(px, py);

        self.set_zoom(self.zoom + delta);

        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Fit the viewport so `bounds` is fully visible.
    /// Invalid bounds fall back to the world view; a zero-extent box is
    /// centered at the highest allowed zoom.
    pub fn fit_bounds(&mut self, bounds: &Bounds) {
        if !bounds.is_valid() {
            self.reset_world();
            return;
        }

        // Mercator y grows southwards: max latitude gives the smaller y
        let nw = to_mercator(DVec2::new(bounds.min.x, bounds.max.y));
        let se = to_mercator(DVec2::new(bounds.max.x, bounds.min.y));
        let span = (se - nw).abs();

        let usable = 1.0 - 2.0 * FIT_PADDING;
        let width = self.width.max(1) as f64;
        let height = self.height.max(1) as f64;

        // Largest 2^zoom for which the span fits both axes
        let fit_x = if span.x > 0.0 { usable / span.x } else { f64::INFINITY };
        let fit_y = if span.y > 0.0 {
            usable * height / (span.y * width)
        } else {
            f64::INFINITY
        };
        let zoom = fit_x.min(fit_y).log2().floor();

        self.set_zoom(if zoom.is_finite() { zoom } else { self.max_zoom });
        self.set_center(from_mercator((nw + se) * 0.5));
    }

    /// Project a geographic coordinate to fractional pixel coordinates
    pub fn project_f(&self, lonlat: DVec2) -> DVec2 {
        let m = to_mercator(lonlat);
        let c = to_mercator(self.center());
        let half = DVec2::new(self.width as f64 / 2.0, self.height as f64 / 2.0);
        (m - c) * self.scale() + half
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let c = to_mercator(self.center());
        let half = DVec2::new(self.width as f64 / 2.0, self.height as f64 / 2.0);
        let m = (DVec2::new(px as f64, py as f64) - half) / self.scale() + c;
        let ll = from_mercator(m);
        (ll.x, ll.y)
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let p = self.project_f(DVec2::new(lon, lat));
        (p.x.round() as i32, p.y.round() as i32)
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10
            && px < self.width as i32 + 10
            && py >= -10
            && py < self.height as i32 + 10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 0.0, 100, 100);
        let (x, y) = vp.project(0.0, 0.0);
        assert_eq!(x, 50);
        assert_eq!(y, 50);
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > 0.0);
        vp.pan(0, 10);
        assert!(vp.center_lat < 0.0);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let vp = Viewport::new(4.5, 50.9, 8.0, 200, 120);
        let (px, py) = vp.project(4.6, 51.0);
        let (lon, lat) = vp.unproject(px, py);
        assert!((lon - 4.6).abs() < 0.01);
        assert!((lat - 51.0).abs() < 0.01);
    }

    #[test]
    fn test_zoom_respects_max() {
        let mut vp = Viewport::world(100, 100);
        vp.set_max_zoom(2.0);
        for _ in 0..5 {
            vp.zoom_in();
        }
        assert_eq!(vp.zoom, 2.0);
        for _ in 0..5 {
            vp.zoom_out();
        }
        assert_eq!(vp.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_zoom_at_keeps_anchor() {
        let mut vp = Viewport::new(0.0, 0.0, 3.0, 200, 200);
        let before = vp.unproject(150, 60);
        vp.zoom_in_at(150, 60);
        let after = vp.unproject(150, 60);
        assert!((before.0 - after.0).abs() < 0.5);
        assert!((before.1 - after.1).abs() < 0.5);
    }

    #[test]
    fn test_fit_bounds_contains_corners() {
        let mut vp = Viewport::world(200, 100);
        vp.set_max_zoom(19.0);
        let b = Bounds {
            min: DVec2::new(-5.0, -5.0),
            max: DVec2::new(5.0, 5.0),
        };
        vp.fit_bounds(&b);
        assert!(vp.zoom > 3.0);
        for corner in [b.min, b.max] {
            let p = vp.project_f(corner);
            assert!(p.x >= 0.0 && p.x <= 200.0);
            assert!(p.y >= 0.0 && p.y <= 100.0);
        }
    }

    #[test]
    fn test_fit_invalid_bounds_is_world() {
        let mut vp = Viewport::new(30.0, 40.0, 9.0, 100, 100);
        let b = Bounds {
            min: DVec2::new(1.0, 1.0),
            max: DVec2::new(0.0, 0.0),
        };
        vp.fit_bounds(&b);
        assert_eq!(vp.zoom, MIN_ZOOM);
        assert_eq!(vp.center_lon, 0.0);
    }

    #[test]
    fn test_fit_point_goes_to_max_zoom() {
        let mut vp = Viewport::world(100, 100);
        vp.set_max_zoom(17.0);
        vp.fit_bounds(&Bounds::from_point(DVec2::new(2.0, 3.0)));
        assert_eq!(vp.zoom, 17.0);
        assert!((vp.center_lon - 2.0).abs() < 1e-9);
    }
}
