//! Parsers for tesseract's textual output formats
//!
//! Every format starts with one header line (a banner or column names),
//! which is dropped.

use crate::error::OcrError;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// How a box output line is split into its six fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxLayout {
    /// Legacy reading: the first six characters of the trimmed line, one
    /// character per field.
    #[default]
    Characters,
    /// Whitespace-separated fields, as the engine actually writes them
    Fields,
}

/// One recognized symbol from `makebox` output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoxRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
}

impl BoxRecord {
    /// Fill fields in order; missing values leave trailing fields absent
    fn from_values<I: Iterator<Item = String>>(mut values: I) -> Self {
        Self {
            symbol: values.next(),
            left: values.next(),
            bottom: values.next(),
            right: values.next(),
            top: values.next(),
            page: values.next(),
        }
    }
}

/// One row of `tsv` output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WordRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_num: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_num: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub par_num: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_num: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_num: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl WordRecord {
    fn from_values<'a, I: Iterator<Item = &'a str>>(values: I) -> Self {
        let mut values = values.map(str::to_string);
        Self {
            level: values.next(),
            page_num: values.next(),
            block_num: values.next(),
            par_num: values.next(),
            line_num: values.next(),
            word_num: values.next(),
            left: values.next(),
            top: values.next(),
            width: values.next(),
            height: values.next(),
            conf: values.next(),
            text: values.next(),
        }
    }
}

fn body_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().skip(1)
}

/// Parse `makebox` output into one record per line after the header
pub fn parse_boxes(text: &str, layout: BoxLayout) -> Vec<BoxRecord> {
    body_lines(text)
        .map(|line| match layout {
            BoxLayout::Characters => {
                BoxRecord::from_values(line.trim().chars().map(String::from))
            }
            BoxLayout::Fields => {
                BoxRecord::from_values(line.split_whitespace().map(str::to_string))
            }
        })
        .collect()
}

/// Parse `tsv` output into one record per line after the header
pub fn parse_words(text: &str) -> Vec<WordRecord> {
    body_lines(text)
        .map(|line| WordRecord::from_values(line.split('\t')))
        .collect()
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"tesseract (v\d+(?:\.\d+)+)").expect("version pattern is a valid regex")
    })
}

/// Extract the version (e.g. `v5.3.0`) from a `--version` banner
pub fn parse_version(text: &str) -> Result<String, OcrError> {
    version_pattern()
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|version| version.as_str().to_string())
        .ok_or(OcrError::VersionNotFound)
}

/// Language codes from `--list-langs` output
pub fn parse_languages(text: &str) -> Vec<String> {
    body_lines(text).map(str::to_string).collect()
}
