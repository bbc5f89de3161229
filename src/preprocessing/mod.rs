//! Image preprocessing before OCR
//!
//! Turns a decoded image into binarized PNG bytes for the engine.

pub mod pipeline;
pub mod steps;

pub use pipeline::{encode_png, ImageOptions, Pipeline};
pub use steps::crop::Rect;
