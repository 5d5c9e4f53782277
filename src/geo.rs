use glam::DVec2;
use std::f64::consts::PI;

/// Latitude limit of the Web Mercator projection
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// Wrap longitude into [-180, 180)
#[inline(always)]
pub fn wrap_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Clamp latitude to the range Web Mercator can represent
#[inline(always)]
pub fn clamp_lat(lat: f64) -> f64 {
    lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
}

/// Project lon/lat (degrees) to normalized Web Mercator coordinates in [0, 1].
/// y grows southwards.
#[inline(always)]
pub fn to_mercator(lonlat: DVec2) -> DVec2 {
    let x = (lonlat.x + 180.0) / 360.0;
    let lat_rad = clamp_lat(lonlat.y).to_radians();
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
    DVec2::new(x, y)
}

/// Inverse of [`to_mercator`]
#[inline(always)]
pub fn from_mercator(m: DVec2) -> DVec2 {
    let lon = m.x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * m.y)).sinh().atan().to_degrees();
    DVec2::new(lon, lat)
}

/// Axis-aligned geographic bounding box. `x` is longitude, `y` latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: DVec2,
    pub max: DVec2,
}

impl Bounds {
    pub fn from_point(p: DVec2) -> Self {
        Self { min: p, max: p }
    }

    /// Bounds of a set of coordinates; `None` when there are none
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a DVec2>) -> Option<Self> {
        points
            .into_iter()
            .filter(|p| p.is_finite())
            .fold(None, |acc: Option<Bounds>, p| match acc {
                Some(b) => Some(b.extend(*p)),
                None => Some(Bounds::from_point(*p)),
            })
    }

    pub fn extend(self, p: DVec2) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    pub fn union(self, other: Bounds) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Union of two optional boxes
    pub fn merge(a: Option<Bounds>, b: Option<Bounds>) -> Option<Bounds> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, None) => a,
            (None, b) => b,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min.cmple(self.max).all()
    }

    /// True when the box covers a line or an area, not a single point
    pub fn has_extent(&self) -> bool {
        self.is_valid() && (self.max.x > self.min.x || self.max.y > self.min.y)
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }
}
