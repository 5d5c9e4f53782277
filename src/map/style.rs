//! Feature styling.
//!
//! Styles are resolved from the feature's properties and the current
//! selection only, so resolving the same inputs twice always yields equal
//! values.

use crate::map::feature::{Feature, FeatureId};

/// 24-bit color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Neutral default fill (also the stroke color of unselected features)
pub const DEFAULT_COLOR: Rgb = Rgb(0x33, 0x88, 0xff);
pub const WATER_COLOR: Rgb = Rgb(0x1f, 0x78, 0xb4);
pub const VEGETATION_COLOR: Rgb = Rgb(0x33, 0xa0, 0x2c);
pub const BUILDING_COLOR: Rgb = Rgb(0xe3, 0x1a, 0x1c);
pub const HIGHLIGHT_COLOR: Rgb = Rgb(0xff, 0x78, 0x00);
pub const HOVER_COLOR: Rgb = Rgb(0x66, 0x66, 0x66);

/// Radius of point markers
pub const MARKER_RADIUS: f64 = 8.0;

/// Properties inspected by the classifier, in order
const CLASS_KEYS: [&str; 5] = ["type", "landuse", "natural", "category", "class"];

const WATER_TERMS: [&str; 10] = [
    "water", "lake", "river", "sea", "ocean", "pond", "reservoir", "stream", "canal", "wetland",
];
const VEGETATION_TERMS: [&str; 10] = [
    "park", "forest", "wood", "grass", "garden", "meadow", "vegetation", "farmland", "scrub",
    "orchard",
];
const BUILDING_TERMS: [&str; 8] = [
    "building", "urban", "residential", "commercial", "industrial", "house", "retail", "city",
];

/// Stroke and fill attributes of a path layer
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub color: Rgb,
    pub weight: f64,
    pub opacity: f64,
    pub fill_color: Rgb,
    pub fill_opacity: f64,
    pub dash_array: Option<&'static str>,
}

/// Drawable appearance of one rendered layer
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Path(Style),
    Marker { radius: f64, style: Style },
}

impl Symbol {
    pub fn style(&self) -> &Style {
        match self {
            Symbol::Path(style) | Symbol::Marker { style, .. } => style,
        }
    }

    /// Same symbol kind with a different style
    fn with_style(&self, style: Style) -> Symbol {
        match self {
            Symbol::Path(_) => Symbol::Path(style),
            Symbol::Marker { radius, .. } => Symbol::Marker {
                radius: *radius,
                style,
            },
        }
    }
}

/// Which of the three appearances a layer currently has
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleRole {
    Default,
    Hover,
    Highlight,
}

/// Fill color for a feature based on its type-like property
pub fn classify(feature: &Feature) -> Rgb {
    let Some(value) = CLASS_KEYS
        .iter()
        .find_map(|key| feature.property(key).and_then(|v| v.as_str()))
    else {
        return DEFAULT_COLOR;
    };

    let value = value.to_lowercase();
    let matches = |terms: &[&str]| terms.iter().any(|t| value.contains(t));

    if matches(&WATER_TERMS) {
        WATER_COLOR
    } else if matches(&VEGETATION_TERMS) {
        VEGETATION_COLOR
    } else if matches(&BUILDING_TERMS) {
        BUILDING_COLOR
    } else {
        DEFAULT_COLOR
    }
}

pub fn default_style(fill: Rgb) -> Style {
    Style {
        color: fill,
        weight: 2.0,
        opacity: 1.0,
        fill_color: fill,
        fill_opacity: 0.3,
        dash_array: Some("3"),
    }
}

pub fn highlight_style() -> Style {
    Style {
        color: HIGHLIGHT_COLOR,
        weight: 5.0,
        opacity: 1.0,
        fill_color: HIGHLIGHT_COLOR,
        fill_opacity: 0.7,
        dash_array: None,
    }
}

pub fn hover_style(fill: Rgb) -> Style {
    Style {
        color: HOVER_COLOR,
        weight: 4.0,
        opacity: 1.0,
        fill_color: fill,
        fill_opacity: 0.6,
        dash_array: None,
    }
}

fn base_symbol(feature: &Feature, style: Style) -> Symbol {
    if feature.shape.is_point() {
        Symbol::Marker {
            radius: MARKER_RADIUS,
            style,
        }
    } else {
        Symbol::Path(style)
    }
}

/// Resolve the style of `feature` given the current selection
pub fn resolve_style(feature: &Feature, selected: Option<FeatureId>) -> Symbol {
    if selected == Some(feature.id) {
        base_symbol(feature, highlight_style())
    } else {
        base_symbol(feature, default_style(classify(feature)))
    }
}

/// Style for a role, independent of the selection state
pub fn symbol_for(feature: &Feature, role: StyleRole) -> Symbol {
    let symbol = resolve_style(feature, None);
    match role {
        StyleRole::Default => symbol,
        StyleRole::Hover => symbol.with_style(hover_style(classify(feature))),
        StyleRole::Highlight => symbol.with_style(highlight_style()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::feature::Feature;
    use serde_json::json;

    fn feature(id: usize, properties: serde_json::Value, geometry: serde_json::Value) -> Feature {
        let f = geojson::Feature::from_json_value(json!({
            "type": "Feature",
            "properties": properties,
            "geometry": geometry,
        }))
        .unwrap();
        Feature::from_geojson(FeatureId(id), f)
    }

    fn polygon(id: usize, properties: serde_json::Value) -> Feature {
        feature(
            id,
            properties,
            json!({"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]}),
        )
    }

    #[test]
    fn test_classifier_terms() {
        assert_eq!(classify(&polygon(0, json!({"type": "Lake"}))), WATER_COLOR);
        assert_eq!(classify(&polygon(0, json!({"type": "national_PARK"}))), VEGETATION_COLOR);
        assert_eq!(classify(&polygon(0, json!({"landuse": "residential"}))), BUILDING_COLOR);
        assert_eq!(classify(&polygon(0, json!({"type": "river"}))), WATER_COLOR);
    }

    #[test]
    fn test_classifier_default() {
        assert_eq!(classify(&polygon(0, json!(null))), DEFAULT_COLOR);
        assert_eq!(classify(&polygon(0, json!({}))), DEFAULT_COLOR);
        assert_eq!(classify(&polygon(0, json!({"type": 42}))), DEFAULT_COLOR);
        assert_eq!(classify(&polygon(0, json!({"type": "point_of_interest"}))), DEFAULT_COLOR);
        assert_eq!(classify(&polygon(0, json!({"name": "lake view"}))), DEFAULT_COLOR);
    }

    #[test]
    fn test_resolve_is_pure() {
        let f = polygon(1, json!({"type": "forest"}));
        assert_eq!(resolve_style(&f, None), resolve_style(&f, None));
        assert_eq!(resolve_style(&f, Some(FeatureId(1))), resolve_style(&f, Some(FeatureId(1))));
        assert_eq!(resolve_style(&f, Some(FeatureId(7))), resolve_style(&f, None));
    }

    #[test]
    fn test_selected_is_highlighted() {
        let f = polygon(2, json!({"type": "forest"}));
        let Symbol::Path(style) = resolve_style(&f, Some(FeatureId(2))) else {
            panic!("polygon should resolve to a path");
        };
        assert_eq!(style.color, HIGHLIGHT_COLOR);
        assert_eq!(style.dash_array, None);
        assert!(style.weight > default_style(VEGETATION_COLOR).weight);
        assert!(style.fill_opacity > default_style(VEGETATION_COLOR).fill_opacity);
    }

    #[test]
    fn test_point_resolves_to_marker() {
        let f = feature(
            0,
            json!({"type": "lake"}),
            json!({"type": "Point", "coordinates": [1.0, 2.0]}),
        );
        match resolve_style(&f, None) {
            Symbol::Marker { radius, style } => {
                assert_eq!(radius, MARKER_RADIUS);
                assert_eq!(style.fill_color, WATER_COLOR);
            }
            other => panic!("expected marker, got {:?}", other),
        }
    }

    #[test]
    fn test_roles() {
        let f = polygon(0, json!({"type": "lake"}));
        assert_eq!(symbol_for(&f, StyleRole::Default), resolve_style(&f, None));
        assert_eq!(symbol_for(&f, StyleRole::Highlight), resolve_style(&f, Some(FeatureId(0))));
        assert_eq!(symbol_for(&f, StyleRole::Hover).style().color, HOVER_COLOR);
    }

    #[test]
    fn test_hex() {
        assert_eq!(DEFAULT_COLOR.hex(), "#3388ff");
    }
}
