use crate::jobs::GeoJsonSource;
use crate::map::BasemapSet;
use crate::panel::{Control, ControlSet};
use crate::widget::WidgetOptions;
use anyhow::{bail, Context, Result};
use clap::Parser;
use glam::DVec2;
use std::path::PathBuf;
use std::time::Duration;

/// Terminal chat panel with an interactive GeoJSON map
#[derive(Parser, Debug)]
#[command(name = "geochat", version, about)]
pub struct Args {
    /// Base URL of the chat/GeoJSON server
    #[arg(long, default_value = "http://localhost:4000")]
    pub server: String,

    /// Chat over a persistent WebSocket instead of HTTP (e.g. ws://localhost:4000/ws)
    #[arg(long)]
    pub ws: Option<String>,

    /// Load map data from a local GeoJSON file instead of the server
    #[arg(long)]
    pub geojson: Option<PathBuf>,

    /// Use the built-in sample document instead of fetching map data
    #[arg(long)]
    pub offline: bool,

    /// Initial basemap (osm, satellite, topo)
    #[arg(long, default_value = "osm")]
    pub basemap: String,

    /// Initial view center as "lat,lng"
    #[arg(long, default_value = "50.8999,4.553")]
    pub center: String,

    /// Initial zoom level
    #[arg(long, default_value_t = 8.0)]
    pub zoom: f64,

    /// Comma-separated controls to enable (basemap, reset, toggle, zoom, coords, count, info)
    #[arg(long, default_value = "basemap,reset,toggle,zoom,coords,count,info")]
    pub controls: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Directory for the log file
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: String,
    pub ws: Option<String>,
    pub source: GeoJsonSource,
    pub basemap: String,
    pub center: DVec2,
    pub zoom: f64,
    pub controls: ControlSet,
    pub timeout: Duration,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        let basemaps = BasemapSet::default();
        if !basemaps.contains(&args.basemap) {
            let names: Vec<_> = basemaps.names().collect();
            bail!("unknown basemap '{}', expected one of {}", args.basemap, names.join(", "));
        }

        let source = match (args.geojson, args.offline) {
            (Some(path), _) => GeoJsonSource::File(path),
            (None, true) => GeoJsonSource::Fallback,
            (None, false) => GeoJsonSource::Server,
        };

        if let Some(url) = &args.ws {
            if !url.starts_with("ws://") {
                bail!("websocket url '{}' must start with ws://", url);
            }
        }

        Ok(Self {
            server: args.server,
            ws: args.ws,
            source,
            basemap: args.basemap,
            center: parse_center(&args.center)?,
            zoom: args.zoom,
            controls: parse_controls(&args.controls)?,
            timeout: Duration::from_secs(args.timeout.max(1)),
            log_dir: args.log_dir,
        })
    }

    pub fn widget_options(&self) -> WidgetOptions {
        WidgetOptions {
            basemaps: BasemapSet::default(),
            basemap: self.basemap.clone(),
            center: self.center,
            zoom: self.zoom,
            controls: self.controls.clone(),
        }
    }
}

/// "lat,lng" into a lon/lat vector
fn parse_center(s: &str) -> Result<DVec2> {
    let (lat, lng) = s
        .split_once(',')
        .with_context(|| format!("center '{}' must be \"lat,lng\"", s))?;
    let lat: f64 = lat.trim().parse().with_context(|| format!("bad latitude in '{}'", s))?;
    let lng: f64 = lng.trim().parse().with_context(|| format!("bad longitude in '{}'", s))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        bail!("center '{}' is out of range", s);
    }
    Ok(DVec2::new(lng, lat))
}

fn parse_controls(s: &str) -> Result<ControlSet> {
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| part.parse::<Control>().map_err(anyhow::Error::msg))
        .collect()
}
