//! Typed wrapper around the `tesseract` OCR command-line engine.
//!
//! Options compile into the engine's argument vector, the engine runs as a
//! subprocess fed from a file path or piped image bytes, and its plain text,
//! box or TSV output is parsed into records.
//!
//! ```no_run
//! use tesseract_cmd::{ImageSource, Tesseract, TesseractOptions};
//!
//! let tesseract = Tesseract::from_env();
//! let options = TesseractOptions::new().with_languages(["eng", "fra"]);
//! let text = tesseract.get_text(&ImageSource::path("scan.png"), Some(&options))?;
//! # Ok::<(), tesseract_cmd::OcrError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod options;
pub mod parse;
pub mod preprocessing;
pub mod runner;
pub mod server;

pub use client::{ImageSource, Tesseract};
pub use config::{RunnerConfig, ServerConfig};
pub use error::OcrError;
pub use options::{LogLevel, OcrEngineMode, PageSegmentationMode, TesseractOptions};
pub use parse::{BoxLayout, BoxRecord, WordRecord};
pub use preprocessing::{ImageOptions, Rect};
pub use runner::{Invocation, ProcessRunner, Runner};
