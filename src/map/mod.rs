pub mod basemap;
pub mod feature;
mod geometry;
pub mod interaction;
mod projection;
pub mod registry;
mod renderer;
pub mod style;
pub mod surface;

pub use basemap::{BasemapSet, TileLayer};
pub use feature::{Feature, FeatureId};
pub use interaction::{InteractionController, InteractionState, PointerEvent, Restyle};
pub use projection::Viewport;
pub use registry::{FeatureRegistry, GeoJsonInput, LoadedOverlay, RenderedLayer};
pub use renderer::render_overlay;
pub use surface::MapSurface;
