use thiserror::Error;

/// Failures raised while feeding data into the map widget.
///
/// Parse and transport errors are caught at the point where data enters the
/// widget and turned into a status or chat message. Bounds errors never reach
/// the user: the fit step is skipped instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Malformed GeoJSON input
    #[error("invalid GeoJSON: {0}")]
    Parse(String),

    /// Network or transport failure fetching a chat reply or map data
    #[error("transport failure: {0}")]
    Transport(String),

    /// No computable spatial extent
    #[error("no spatial extent to fit")]
    Bounds,

    /// Basemap name not present in the basemap set
    #[error("unknown basemap '{0}'")]
    UnknownBasemap(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<geojson::Error> for Error {
    fn from(e: geojson::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<simd_json::Error> for Error {
    fn from(e: simd_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

impl From<tungstenite::Error> for Error {
    fn from(e: tungstenite::Error) -> Self {
        Error::Transport(e.to_string())
    }
}
