mod geometry;
mod projection;
mod renderer;
mod spatial;

pub use geometry::rings_bbox;
pub use projection::{base_project, Viewport};
pub use renderer::{Country, MapLayers, MapRenderer, RingDisplay};
