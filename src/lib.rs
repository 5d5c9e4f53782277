//! Terminal chat-with-map widget.
//!
//! A chat panel backed by an HTTP endpoint next to an interactive GeoJSON
//! map: feature styling, hover and selection, basemap switching and
//! bounds fitting.

pub mod app;
pub mod braille;
pub mod chat;
pub mod config;
pub mod error;
pub mod geo;
pub mod jobs;
pub mod logging;
pub mod map;
pub mod panel;
pub mod ui;
pub mod widget;

pub use error::{Error, Result};
pub use widget::{MapWidget, WidgetOptions};
