//! Chart canvases backed by plotters.

pub mod svg;

pub use svg::{SvgCanvas, SvgChart};
