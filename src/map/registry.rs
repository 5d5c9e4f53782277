use crate::error::{Error, Result};
use crate::geo::Bounds;
use crate::map::feature::{Feature, FeatureId};
use crate::map::interaction::{BindingTable, Bindings};
use crate::map::style::{resolve_style, Symbol};
use geojson::GeoJson;
use rayon::prelude::*;
use tracing::{debug, warn};

/// GeoJSON handed to the registry, serialized or already parsed
pub enum GeoJsonInput<'a> {
    Text(&'a str),
    Value(serde_json::Value),
    Parsed(GeoJson),
}

impl<'a> From<&'a str> for GeoJsonInput<'a> {
    fn from(text: &'a str) -> Self {
        GeoJsonInput::Text(text)
    }
}

impl From<serde_json::Value> for GeoJsonInput<'_> {
    fn from(value: serde_json::Value) -> Self {
        GeoJsonInput::Value(value)
    }
}

impl From<GeoJson> for GeoJsonInput<'_> {
    fn from(geojson: GeoJson) -> Self {
        GeoJsonInput::Parsed(geojson)
    }
}

impl GeoJsonInput<'_> {
    pub fn parse(self) -> Result<GeoJson> {
        match self {
            GeoJsonInput::Text(text) => {
                let mut bytes = text.as_bytes().to_vec();
                let value: serde_json::Value = simd_json::serde::from_slice(&mut bytes)?;
                Ok(GeoJson::from_json_value(value)?)
            }
            GeoJsonInput::Value(value) => Ok(GeoJson::from_json_value(value)?),
            GeoJsonInput::Parsed(geojson) => Ok(geojson),
        }
    }
}

/// A drawable bound one-to-one with a feature. Only the symbol changes
/// after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedLayer {
    pub feature: FeatureId,
    pub symbol: Symbol,
}

/// Result of loading one document
pub struct LoadedOverlay {
    pub layers: Vec<RenderedLayer>,
    pub count: usize,
    /// Union bounds when they have a spatial extent
    pub bounds: Option<Bounds>,
}

/// Owns the features of the currently loaded document
#[derive(Default)]
pub struct FeatureRegistry {
    features: Vec<Feature>,
    bindings: BindingTable,
    bounds: Option<Bounds>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `input`, replace the registry contents and build one layer per
    /// feature. On error the registry is left untouched.
    pub fn load<'a>(&mut self, input: impl Into<GeoJsonInput<'a>>) -> Result<LoadedOverlay> {
        let geojson = input.into().parse()?;

        let raw: Vec<geojson::Feature> = match geojson {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(f) => vec![f],
            GeoJson::Geometry(_) => {
                warn!("GeoJSON document is a bare geometry, no features to show");
                Vec::new()
            }
        };
        let count = raw.len();

        let features: Vec<Feature> = raw
            .into_par_iter()
            .enumerate()
            .map(|(idx, f)| Feature::from_geojson(FeatureId(idx), f))
            .collect();

        let bounds = features
            .par_iter()
            .map(|f| f.bounds)
            .reduce(|| None, Bounds::merge);

        let layers = features
            .iter()
            .map(|f| RenderedLayer {
                feature: f.id,
                symbol: resolve_style(f, None),
            })
            .collect();

        self.bindings = BindingTable::with_capacity(count);
        for f in &features {
            self.bindings.register(f.id, Bindings::feature());
        }
        self.features = features;
        self.bounds = bounds;

        let fit = match self.fit_bounds() {
            Ok(b) => Some(b),
            Err(e) => {
                debug!("skipping fit after load: {}", e);
                None
            }
        };

        debug!(count, "GeoJSON loaded");
        Ok(LoadedOverlay {
            layers,
            count,
            bounds: fit,
        })
    }

    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(id.index())
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    /// Bounds usable for fitting the viewport
    pub fn fit_bounds(&self) -> Result<Bounds> {
        match self.bounds {
            Some(b) if b.has_extent() => Ok(b),
            _ => Err(Error::Bounds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::style::{Symbol, WATER_COLOR};
    use serde_json::json;

    #[test]
    fn test_empty_collection() {
        let mut reg = FeatureRegistry::new();
        let loaded = reg
            .load(r#"{"type":"FeatureCollection","features":[]}"#)
            .unwrap();
        assert_eq!(loaded.count, 0);
        assert!(loaded.layers.is_empty());
        assert!(loaded.bounds.is_none());
        assert_eq!(reg.fit_bounds(), Err(Error::Bounds));
    }

    #[test]
    fn test_single_feature_counts_one() {
        let mut reg = FeatureRegistry::new();
        let loaded = reg
            .load(json!({
                "type": "Feature",
                "properties": {"type": "lake"},
                "geometry": {"type": "Point", "coordinates": [4.5, 50.9]}
            }))
            .unwrap();
        assert_eq!(loaded.count, 1);
        assert_eq!(loaded.layers.len(), 1);
        // A single point has no extent to fit
        assert!(loaded.bounds.is_none());
        match &loaded.layers[0].symbol {
            Symbol::Marker { style, .. } => assert_eq!(style.fill_color, WATER_COLOR),
            other => panic!("expected marker, got {:?}", other),
        }
    }

    #[test]
    fn test_collection_counts_n() {
        let mut reg = FeatureRegistry::new();
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}},
                {"type": "Feature", "properties": {}, "geometry": {"type": "LineString", "coordinates": [[1.0, 1.0], [2.0, 3.0]]}},
                {"type": "Feature", "properties": {}, "geometry": null}
            ]
        });
        let loaded = reg.load(doc).unwrap();
        assert_eq!(loaded.count, 3);
        assert_eq!(loaded.layers.len(), 3);
        let ids: Vec<_> = loaded.layers.iter().map(|l| l.feature).collect();
        assert_eq!(ids, vec![FeatureId(0), FeatureId(1), FeatureId(2)]);
        let b = loaded.bounds.unwrap();
        assert_eq!(b.min, glam::DVec2::new(0.0, 0.0));
        assert_eq!(b.max, glam::DVec2::new(2.0, 3.0));
        assert_eq!(reg.bindings().len(), 3);
    }

    #[test]
    fn test_malformed_text_is_parse_error() {
        let mut reg = FeatureRegistry::new();
        reg.load(json!({"type": "Feature", "properties": {}, "geometry": null}))
            .unwrap();

        let err = reg.load(r#"{"type": "FeatureCollection", "features": ["#).err();
        assert!(matches!(err, Some(Error::Parse(_))));
        // Previous document is kept
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_non_geojson_value_is_parse_error() {
        let mut reg = FeatureRegistry::new();
        let err = reg.load(json!({"hello": "world"})).err();
        assert!(matches!(err, Some(Error::Parse(_))));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_bare_geometry_has_no_features() {
        let mut reg = FeatureRegistry::new();
        let loaded = reg
            .load(json!({"type": "Point", "coordinates": [1.0, 1.0]}))
            .unwrap();
        assert_eq!(loaded.count, 0);
        assert!(loaded.layers.is_empty());
    }
}
