mod canvas;

pub use canvas::{BrailleCanvas, ShadeLayer};
