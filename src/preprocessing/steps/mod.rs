//! Individual preprocessing steps

pub mod crop;
pub mod grayscale;
pub mod rotate;
pub mod threshold;
