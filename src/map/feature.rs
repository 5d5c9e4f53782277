use crate::geo::Bounds;
use geojson::{Geometry, JsonObject, Value};
use glam::DVec2;

/// Text shown in the info panel for a feature without properties
pub const NO_PROPERTIES: &str = "No properties";

/// Stable identity of a feature within one loaded document (its load index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub usize);

impl FeatureId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Flattened geometry of a feature, in lon/lat
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    pub points: Vec<DVec2>,
    pub lines: Vec<Vec<DVec2>>,
    /// Each polygon is a list of rings; the first ring is the exterior
    pub polygons: Vec<Vec<Vec<DVec2>>>,
}

impl Shape {
    pub fn from_geometry(geometry: &Geometry) -> Self {
        let mut shape = Shape::default();
        shape.push_value(&geometry.value);
        shape
    }

    fn push_value(&mut self, value: &Value) {
        match value {
            Value::Point(c) => self.points.extend(position(c)),
            Value::MultiPoint(cs) => self.points.extend(cs.iter().filter_map(|c| position(c))),
            Value::LineString(cs) => self.lines.push(path(cs)),
            Value::MultiLineString(lines) => self.lines.extend(lines.iter().map(|l| path(l))),
            Value::Polygon(rings) => self.polygons.push(rings.iter().map(|r| path(r)).collect()),
            Value::MultiPolygon(polygons) => {
                for rings in polygons {
                    self.polygons.push(rings.iter().map(|r| path(r)).collect());
                }
            }
            Value::GeometryCollection(geometries) => {
                for g in geometries {
                    self.push_value(&g.value);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.lines.is_empty() && self.polygons.is_empty()
    }

    /// Point-shaped: only point geometry, drawn as markers
    pub fn is_point(&self) -> bool {
        !self.points.is_empty() && self.lines.is_empty() && self.polygons.is_empty()
    }

    /// Every coordinate of the shape
    pub fn coords(&self) -> impl Iterator<Item = &DVec2> + '_ {
        self.points
            .iter()
            .chain(self.lines.iter().flatten())
            .chain(self.polygons.iter().flatten().flatten())
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.coords())
    }
}

fn position(c: &[f64]) -> Option<DVec2> {
    match c {
        [lon, lat, ..] => Some(DVec2::new(*lon, *lat)),
        _ => None,
    }
}

fn path(cs: &[Vec<f64>]) -> Vec<DVec2> {
    cs.iter().filter_map(|c| position(c)).collect()
}

/// An immutable geometry + property mapping
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub properties: Option<JsonObject>,
    pub shape: Shape,
    pub bounds: Option<Bounds>,
}

impl Feature {
    pub fn from_geojson(id: FeatureId, feature: geojson::Feature) -> Self {
        let shape = feature
            .geometry
            .as_ref()
            .map(Shape::from_geometry)
            .unwrap_or_default();
        let bounds = shape.bounds();
        Self {
            id,
            properties: feature.properties,
            shape,
            bounds,
        }
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.as_ref().and_then(|p| p.get(key))
    }

    /// Property mapping as indented JSON, or the placeholder when empty
    pub fn properties_text(&self) -> String {
        match &self.properties {
            Some(props) if !props.is_empty() => {
                serde_json::to_string_pretty(props).unwrap_or_else(|_| NO_PROPERTIES.to_string())
            }
            _ => NO_PROPERTIES.to_string(),
        }
    }

    /// Value of the `name` property, used for labels and logs
    pub fn name(&self) -> Option<&str> {
        self.property("name").and_then(|v| v.as_str())
    }
}
