//! Tesseract command-line options
//!
//! `TesseractOptions` compiles into the flag/value tokens understood by the
//! `tesseract` binary. Fields are emitted in declaration order; absent or
//! empty fields emit nothing.

use crate::error::OcrError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Engine log verbosity (`--loglevel`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    All,
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Off,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Off => "OFF",
        }
    }

    /// Parse a level name, case-insensitively
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ALL" => Some(Self::All),
            "TRACE" => Some(Self::Trace),
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARN" => Some(Self::Warn),
            "ERROR" => Some(Self::Error),
            "FATAL" => Some(Self::Fatal),
            "OFF" => Some(Self::Off),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page segmentation mode (`--psm`)
///
/// Mode 2 ("automatic page segmentation, no OSD or OCR") is not implemented
/// by the engine and has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PageSegmentationMode {
    /// Orientation and script detection only, no OCR
    OsdOnly,
    /// Automatic page segmentation with OSD
    AutoOsd,
    /// Fully automatic page segmentation without OSD (engine default)
    Auto,
    /// A single column of text of variable sizes
    SingleColumn,
    /// A single uniform block of vertically aligned text
    SingleBlockVerticalText,
    /// A single uniform block of text, e.g. a book page
    SingleBlock,
    /// A single text line, e.g. a licence plate
    SingleLine,
    SingleWord,
    /// A single word in a circle
    CircleWord,
    SingleChar,
    /// Find as much text as possible in no particular order
    SparseText,
    SparseTextOsd,
    /// A single text line, bypassing engine-specific hacks
    RawLine,
}

impl PageSegmentationMode {
    pub fn value(&self) -> u8 {
        match self {
            Self::OsdOnly => 0,
            Self::AutoOsd => 1,
            Self::Auto => 3,
            Self::SingleColumn => 4,
            Self::SingleBlockVerticalText => 5,
            Self::SingleBlock => 6,
            Self::SingleLine => 7,
            Self::SingleWord => 8,
            Self::CircleWord => 9,
            Self::SingleChar => 10,
            Self::SparseText => 11,
            Self::SparseTextOsd => 12,
            Self::RawLine => 13,
        }
    }
}

impl TryFrom<u8> for PageSegmentationMode {
    type Error = OcrError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::OsdOnly),
            1 => Ok(Self::AutoOsd),
            3 => Ok(Self::Auto),
            4 => Ok(Self::SingleColumn),
            5 => Ok(Self::SingleBlockVerticalText),
            6 => Ok(Self::SingleBlock),
            7 => Ok(Self::SingleLine),
            8 => Ok(Self::SingleWord),
            9 => Ok(Self::CircleWord),
            10 => Ok(Self::SingleChar),
            11 => Ok(Self::SparseText),
            12 => Ok(Self::SparseTextOsd),
            13 => Ok(Self::RawLine),
            2 => Err(OcrError::InvalidOption(
                "page segmentation mode 2 is not implemented by tesseract".to_string(),
            )),
            other => Err(OcrError::InvalidOption(format!(
                "unknown page segmentation mode: {}",
                other
            ))),
        }
    }
}

impl From<PageSegmentationMode> for u8 {
    fn from(mode: PageSegmentationMode) -> Self {
        mode.value()
    }
}

/// OCR engine mode (`--oem`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OcrEngineMode {
    /// Legacy engine only
    TesseractOnly,
    /// Neural net LSTM engine only
    LstmOnly,
    /// Legacy and LSTM engines
    TesseractLstmCombined,
    /// Based on what is available
    Default,
}

impl OcrEngineMode {
    pub fn value(&self) -> u8 {
        match self {
            Self::TesseractOnly => 0,
            Self::LstmOnly => 1,
            Self::TesseractLstmCombined => 2,
            Self::Default => 3,
        }
    }
}

impl TryFrom<u8> for OcrEngineMode {
    type Error = OcrError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::TesseractOnly),
            1 => Ok(Self::LstmOnly),
            2 => Ok(Self::TesseractLstmCombined),
            3 => Ok(Self::Default),
            other => Err(OcrError::InvalidOption(format!(
                "unknown OCR engine mode: {}",
                other
            ))),
        }
    }
}

impl From<OcrEngineMode> for u8 {
    fn from(mode: OcrEngineMode) -> Self {
        mode.value()
    }
}

/// Options passed to every OCR invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractOptions {
    /// Location of the tessdata directory
    pub tessdata_dir: Option<PathBuf>,
    /// Location of the user words file
    pub user_words: Option<PathBuf>,
    /// Location of the user patterns file
    pub user_patterns: Option<PathBuf>,
    /// DPI of the input image
    pub dpi: Option<u32>,
    pub log_level: Option<LogLevel>,
    /// Language codes, joined with `+` in this order
    pub languages: Vec<String>,
    /// Config variables, kept in insertion order
    pub config: Vec<(String, String)>,
    pub psm: Option<PageSegmentationMode>,
    pub oem: Option<OcrEngineMode>,
}

type Encoder = fn(&TesseractOptions) -> Option<String>;

/// (flag, encoder) pairs in field declaration order
const ARGUMENT_TABLE: [(&str, Encoder); 9] = [
    ("--tessdata-dir", |o| encode_path(o.tessdata_dir.as_deref())),
    ("--user-words", |o| encode_path(o.user_words.as_deref())),
    ("--user-patterns", |o| encode_path(o.user_patterns.as_deref())),
    ("--dpi", |o| o.dpi.filter(|dpi| *dpi > 0).map(|dpi| dpi.to_string())),
    ("--loglevel", |o| o.log_level.map(|level| level.as_str().to_string())),
    ("-l", |o| encode_languages(&o.languages)),
    ("-c", |o| encode_config(&o.config)),
    ("--psm", |o| o.psm.and_then(|mode| encode_mode(mode.value()))),
    ("--oem", |o| o.oem.and_then(|mode| encode_mode(mode.value()))),
];

/// Zero counts as unset, like a zero DPI
fn encode_mode(value: u8) -> Option<String> {
    (value != 0).then(|| value.to_string())
}

fn encode_path(path: Option<&Path>) -> Option<String> {
    path.map(|p| p.display().to_string())
        .filter(|p| !p.is_empty())
}

fn encode_languages(languages: &[String]) -> Option<String> {
    if languages.is_empty() {
        return None;
    }
    Some(languages.join("+"))
}

fn encode_config(config: &[(String, String)]) -> Option<String> {
    if config.is_empty() {
        return None;
    }
    let pairs: Vec<String> = config
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();
    Some(pairs.join(" "))
}

impl TesseractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tessdata_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.tessdata_dir = Some(path.into());
        self
    }

    pub fn with_user_words(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_words = Some(path.into());
        self
    }

    pub fn with_user_patterns(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_patterns = Some(path.into());
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = Some(dpi);
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Append a language code; blank codes are ignored
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        if !language.trim().is_empty() {
            self.languages.push(language);
        }
        self
    }

    pub fn with_languages<I, S>(self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        languages
            .into_iter()
            .fold(self, |options, language| options.with_language(language))
    }

    /// Set a config variable. An existing key keeps its position.
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.config.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.config.push((key, value)),
        }
        self
    }

    pub fn with_psm(mut self, mode: PageSegmentationMode) -> Self {
        self.psm = Some(mode);
        self
    }

    pub fn with_oem(mut self, mode: OcrEngineMode) -> Self {
        self.oem = Some(mode);
        self
    }

    /// Compile the options into command-line tokens
    pub fn arguments(&self) -> Vec<String> {
        ARGUMENT_TABLE
            .iter()
            .filter_map(|(flag, encode)| encode(self).map(|value| (*flag, value)))
            .flat_map(|(flag, value)| [flag.to_string(), value])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_compile_to_nothing() {
        assert!(TesseractOptions::default().arguments().is_empty());
    }

    #[test]
    fn test_languages_joined_in_order() {
        let options = TesseractOptions::new().with_languages(["eng", "fra"]);
        assert_eq!(options.arguments(), vec!["-l", "eng+fra"]);
    }

    #[test]
    fn test_config_joined_in_insertion_order() {
        let options = TesseractOptions::new()
            .with_config("tessedit_char_whitelist", "0123456789")
            .with_config("preserve_interword_spaces", "1");
        assert_eq!(
            options.arguments(),
            vec![
                "-c",
                "tessedit_char_whitelist=0123456789 preserve_interword_spaces=1"
            ]
        );
    }

    #[test]
    fn test_config_replaces_existing_key_in_place() {
        let options = TesseractOptions::new()
            .with_config("a", "1")
            .with_config("b", "2")
            .with_config("a", "3");
        assert_eq!(options.arguments(), vec!["-c", "a=3 b=2"]);
    }

    #[test]
    fn test_all_fields_follow_declaration_order() {
        let options = TesseractOptions::new()
            .with_oem(OcrEngineMode::LstmOnly)
            .with_psm(PageSegmentationMode::SingleLine)
            .with_config("tessedit_char_whitelist", "0123456789")
            .with_languages(["eng"])
            .with_log_level(LogLevel::Warn)
            .with_dpi(300)
            .with_user_patterns("/tmp/patterns")
            .with_user_words("/tmp/words")
            .with_tessdata_dir("/usr/share/tessdata");

        assert_eq!(
            options.arguments(),
            vec![
                "--tessdata-dir",
                "/usr/share/tessdata",
                "--user-words",
                "/tmp/words",
                "--user-patterns",
                "/tmp/patterns",
                "--dpi",
                "300",
                "--loglevel",
                "WARN",
                "-l",
                "eng",
                "-c",
                "tessedit_char_whitelist=0123456789",
                "--psm",
                "7",
                "--oem",
                "1",
            ]
        );
    }

    #[test]
    fn test_zero_dpi_and_blank_languages_are_omitted() {
        let options = TesseractOptions::new()
            .with_dpi(0)
            .with_language("")
            .with_tessdata_dir("");
        assert!(options.arguments().is_empty());
    }

    #[test]
    fn test_zero_valued_modes_are_omitted() {
        let options = TesseractOptions::new()
            .with_psm(PageSegmentationMode::OsdOnly)
            .with_oem(OcrEngineMode::TesseractOnly);
        assert!(options.arguments().is_empty());

        let options = options
            .with_psm(PageSegmentationMode::AutoOsd)
            .with_oem(OcrEngineMode::LstmOnly);
        assert_eq!(options.arguments(), vec!["--psm", "1", "--oem", "1"]);
    }

    #[test]
    fn test_psm_rejects_reserved_and_out_of_range_values() {
        assert!(PageSegmentationMode::try_from(2).is_err());
        assert!(PageSegmentationMode::try_from(14).is_err());
        assert_eq!(
            PageSegmentationMode::try_from(13).unwrap(),
            PageSegmentationMode::RawLine
        );
        for value in (0u8..=13).filter(|v| *v != 2) {
            assert_eq!(PageSegmentationMode::try_from(value).unwrap().value(), value);
        }
    }

    #[test]
    fn test_oem_round_trips_tags() {
        for value in 0u8..=3 {
            assert_eq!(OcrEngineMode::try_from(value).unwrap().value(), value);
        }
        assert!(OcrEngineMode::try_from(4).is_err());
    }

    #[test]
    fn test_log_level_from_name() {
        assert_eq!(LogLevel::from_name("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_name("OFF"), Some(LogLevel::Off));
        assert_eq!(LogLevel::from_name("verbose"), None);
    }

    #[test]
    fn test_options_deserialize_from_json() {
        let options: TesseractOptions = serde_json::from_str(
            r#"{"languages":["eng","deu"],"psm":6,"oem":3,"log_level":"ERROR"}"#,
        )
        .unwrap();
        assert_eq!(
            options.arguments(),
            vec!["--loglevel", "ERROR", "-l", "eng+deu", "--psm", "6", "--oem", "3"]
        );

        let invalid: Result<TesseractOptions, _> = serde_json::from_str(r#"{"psm":2}"#);
        assert!(invalid.is_err());
    }
}
