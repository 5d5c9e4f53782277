/// Raster tile provider descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    /// URL template with `{s}`, `{z}`, `{x}`, `{y}` placeholders
    pub url_template: String,
    pub attribution: String,
    pub max_zoom: u8,
}

impl TileLayer {
    pub fn new(url_template: &str, attribution: &str, max_zoom: u8) -> Self {
        Self {
            url_template: url_template.to_string(),
            attribution: attribution.to_string(),
            max_zoom,
        }
    }
}

/// Named basemaps, in selector order
#[derive(Debug, Clone)]
pub struct BasemapSet {
    entries: Vec<(String, TileLayer)>,
}

impl BasemapSet {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert or replace a basemap
    pub fn insert(&mut self, name: &str, layer: TileLayer) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = layer,
            None => self.entries.push((name.to_string(), layer)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TileLayer> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, l)| l)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

impl Default for BasemapSet {
    /// OpenStreetMap, Esri imagery and OpenTopoMap
    fn default() -> Self {
        let mut set = Self::new();
        set.insert(
            "osm",
            TileLayer::new(
                "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
                "© OpenStreetMap contributors",
                19,
            ),
        );
        set.insert(
            "satellite",
            TileLayer::new(
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
                "Tiles © Esri",
                19,
            ),
        );
        set.insert(
            "topo",
            TileLayer::new(
                "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
                "© OpenStreetMap contributors, SRTM | © OpenTopoMap (CC-BY-SA)",
                17,
            ),
        );
        set
    }
}
