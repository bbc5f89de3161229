//! Request builders for the public OCR operations
//!
//! Each operation assembles `[INPUT, OUTPUT, ...options, directive?]`,
//! runs the engine once and shapes its output.

use crate::config::RunnerConfig;
use crate::error::OcrError;
use crate::options::TesseractOptions;
use crate::parse::{self, BoxLayout, BoxRecord, WordRecord};
use crate::preprocessing::{self, ImageOptions, Pipeline};
use crate::runner::{Invocation, ProcessRunner, Runner};
use image::DynamicImage;
use std::borrow::Cow;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Engine sentinel for reading the image from standard input
pub const STDIN_SENTINEL: &str = "stdin";
/// Engine sentinel for writing results to standard output
pub const STDOUT_SENTINEL: &str = "stdout";

/// Where the engine reads the image from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource<'a> {
    /// A file the engine opens itself
    Path(PathBuf),
    /// Encoded image bytes (PNG, JPEG, TIFF, ...) piped to stdin
    Bytes(Cow<'a, [u8]>),
}

impl<'a> ImageSource<'a> {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn bytes(bytes: &'a [u8]) -> Self {
        Self::Bytes(Cow::Borrowed(bytes))
    }

    /// Capture a reader's full contents from the start, regardless of where
    /// its position was left by earlier writes
    pub fn from_reader<R: Read + Seek>(reader: &mut R) -> Result<ImageSource<'static>, OcrError> {
        reader.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(ImageSource::Bytes(Cow::Owned(bytes)))
    }

    fn input_placeholder(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes(_) => STDIN_SENTINEL.to_string(),
        }
    }

    fn stdin(&self) -> Option<&[u8]> {
        match self {
            Self::Path(_) => None,
            Self::Bytes(bytes) => Some(&**bytes),
        }
    }
}

impl From<&Path> for ImageSource<'static> {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for ImageSource<'static> {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl<'a> From<&'a [u8]> for ImageSource<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::bytes(bytes)
    }
}

impl From<Vec<u8>> for ImageSource<'static> {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Cow::Owned(bytes))
    }
}

/// Trailing directive selecting the engine's output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Text,
    Box,
    Tsv,
}

impl OutputMode {
    fn directive(&self) -> Option<&'static str> {
        match self {
            Self::Text => None,
            Self::Box => Some("makebox"),
            Self::Tsv => Some("tsv"),
        }
    }
}

/// Client for the tesseract command-line engine
pub struct Tesseract<R: Runner = ProcessRunner> {
    runner: R,
    box_layout: BoxLayout,
}

impl Tesseract<ProcessRunner> {
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_runner(ProcessRunner::new(config))
    }

    /// Client using `TESSERACT_PATH` or `tesseract` from `PATH`
    pub fn from_env() -> Self {
        Self::new(RunnerConfig::from_env())
    }
}

impl Default for Tesseract<ProcessRunner> {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

impl<R: Runner> Tesseract<R> {
    /// Client over a custom runner
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            box_layout: BoxLayout::default(),
        }
    }

    pub fn box_layout(mut self, layout: BoxLayout) -> Self {
        self.box_layout = layout;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run the engine with raw arguments
    pub fn run(&self, arguments: &[String], input: Option<&[u8]>) -> Result<Invocation, OcrError> {
        self.runner.run(arguments, input)
    }

    fn recognize(
        &self,
        image: &ImageSource<'_>,
        options: Option<&TesseractOptions>,
        mode: OutputMode,
    ) -> Result<String, OcrError> {
        let mut arguments = vec![image.input_placeholder(), STDOUT_SENTINEL.to_string()];
        if let Some(options) = options {
            arguments.extend(options.arguments());
        }
        if let Some(directive) = mode.directive() {
            arguments.push(directive.to_string());
        }

        self.runner.run(&arguments, image.stdin())?.into_result()
    }

    /// Recognized text, exactly as the engine printed it
    pub fn get_text(
        &self,
        image: &ImageSource<'_>,
        options: Option<&TesseractOptions>,
    ) -> Result<String, OcrError> {
        let text = self.recognize(image, options, OutputMode::Text)?;
        tracing::info!("OCR text completed, text length: {}", text.len());
        Ok(text)
    }

    /// Per-symbol boxes from `makebox` output
    pub fn get_textbox(
        &self,
        image: &ImageSource<'_>,
        options: Option<&TesseractOptions>,
    ) -> Result<Vec<BoxRecord>, OcrError> {
        let text = self.recognize(image, options, OutputMode::Box)?;
        let boxes = parse::parse_boxes(&text, self.box_layout);
        tracing::info!("OCR boxes completed, {} symbols", boxes.len());
        Ok(boxes)
    }

    /// Per-token rows from `tsv` output
    pub fn get_textdata(
        &self,
        image: &ImageSource<'_>,
        options: Option<&TesseractOptions>,
    ) -> Result<Vec<WordRecord>, OcrError> {
        let text = self.recognize(image, options, OutputMode::Tsv)?;
        let words = parse::parse_words(&text);
        tracing::info!("OCR data completed, {} rows", words.len());
        Ok(words)
    }

    /// Preprocess a decoded image, then recognize its text
    pub fn get_text_from_image(
        &self,
        image: &DynamicImage,
        options: Option<&TesseractOptions>,
        image_options: &ImageOptions,
    ) -> Result<String, OcrError> {
        let processed = Pipeline::new(*image_options).process(image)?;
        let png = preprocessing::encode_png(&processed)?;
        self.get_text(&ImageSource::from(png), options)
    }

    /// Engine version, e.g. `v5.3.0`
    pub fn get_version(&self) -> Result<String, OcrError> {
        // Some engine builds print the banner on stderr, so both outcomes
        // are searched.
        let invocation = self.runner.run(&["--version".to_string()], None)?;
        parse::parse_version(invocation.text())
    }

    /// Installed language codes
    pub fn get_installed_languages(&self) -> Result<Vec<String>, OcrError> {
        let text = self
            .runner
            .run(&["--list-langs".to_string()], None)?
            .into_result()?;
        Ok(parse::parse_languages(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OcrEngineMode, PageSegmentationMode};
    use std::io::{Cursor, Write};
    use std::sync::Mutex;

    /// Records every call and replies with a canned outcome
    struct RecordingRunner {
        reply: Invocation,
        calls: Mutex<Vec<(Vec<String>, Option<Vec<u8>>)>>,
    }

    impl RecordingRunner {
        fn replying(reply: Invocation) -> Self {
            Self {
                reply,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn succeeding(stdout: &str) -> Self {
            Self::replying(Invocation::Succeeded(stdout.to_string()))
        }

        fn calls(&self) -> Vec<(Vec<String>, Option<Vec<u8>>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Runner for RecordingRunner {
        fn run(&self, arguments: &[String], input: Option<&[u8]>) -> Result<Invocation, OcrError> {
            self.calls
                .lock()
                .unwrap()
                .push((arguments.to_vec(), input.map(<[u8]>::to_vec)));
            Ok(self.reply.clone())
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_get_text_from_path_uses_path_placeholder() {
        let client = Tesseract::with_runner(RecordingRunner::succeeding("Hello World\n"));

        let text = client
            .get_text(&ImageSource::path("/tmp/scan.png"), None)
            .unwrap();

        assert_eq!(text, "Hello World\n");
        assert_eq!(
            client.runner().calls(),
            vec![(strings(&["/tmp/scan.png", "stdout"]), None)]
        );
    }

    #[test]
    fn test_get_text_from_bytes_pipes_stdin() {
        let client = Tesseract::with_runner(RecordingRunner::succeeding("text"));
        let options = TesseractOptions::new()
            .with_languages(["eng", "fra"])
            .with_psm(PageSegmentationMode::SingleBlock);

        client
            .get_text(&ImageSource::bytes(b"PNGDATA"), Some(&options))
            .unwrap();

        assert_eq!(
            client.runner().calls(),
            vec![(
                strings(&["stdin", "stdout", "-l", "eng+fra", "--psm", "6"]),
                Some(b"PNGDATA".to_vec())
            )]
        );
    }

    #[test]
    fn test_get_textbox_appends_makebox_and_parses() {
        let client = Tesseract::with_runner(RecordingRunner::succeeding("banner\nH12345\n"));
        let options = TesseractOptions::new().with_oem(OcrEngineMode::LstmOnly);

        let boxes = client
            .get_textbox(&ImageSource::path("page.tif"), Some(&options))
            .unwrap();

        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].symbol.as_deref(), Some("H"));
        assert_eq!(boxes[0].page.as_deref(), Some("5"));
        assert_eq!(
            client.runner().calls()[0].0,
            strings(&["page.tif", "stdout", "--oem", "1", "makebox"])
        );
    }

    #[test]
    fn test_get_textbox_with_field_layout() {
        let client = Tesseract::with_runner(RecordingRunner::succeeding("banner\nH 1 2 3 4 0\n"))
            .box_layout(BoxLayout::Fields);

        let boxes = client
            .get_textbox(&ImageSource::path("page.tif"), None)
            .unwrap();

        assert_eq!(boxes[0].left.as_deref(), Some("1"));
        assert_eq!(boxes[0].page.as_deref(), Some("0"));
    }

    #[test]
    fn test_box_layout_defaults_to_characters() {
        let client = Tesseract::new(RunnerConfig::new("tesseract"));
        assert_eq!(client.box_layout, BoxLayout::Characters);

        let client = client.box_layout(BoxLayout::Fields);
        assert_eq!(client.box_layout, BoxLayout::Fields);
    }

    #[test]
    fn test_get_textdata_appends_tsv_and_parses() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
                   5\t1\t0\t0\t1\t1\t10\t20\t30\t40\t96\thello\n";
        let client = Tesseract::with_runner(RecordingRunner::succeeding(tsv));

        let words = client
            .get_textdata(&ImageSource::bytes(b"img"), None)
            .unwrap();

        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text.as_deref(), Some("hello"));
        assert_eq!(words[0].conf.as_deref(), Some("96"));
        assert_eq!(
            client.runner().calls()[0].0,
            strings(&["stdin", "stdout", "tsv"])
        );
    }

    #[test]
    fn test_engine_failure_is_error_not_parsed() {
        let client = Tesseract::with_runner(RecordingRunner::replying(Invocation::Failed {
            code: Some(1),
            stderr: "Error in pixReadStream\nmore\n".to_string(),
        }));

        let result = client.get_textdata(&ImageSource::bytes(b"junk"), None);

        match result {
            Err(OcrError::EngineFailed { code, stderr }) => {
                assert_eq!(code, Some(1));
                assert!(stderr.contains("pixReadStream"));
            }
            other => panic!("expected EngineFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_reader_source_is_read_from_start() {
        let mut buffer = Cursor::new(Vec::new());
        buffer.write_all(b"image bytes").unwrap();

        let source = ImageSource::from_reader(&mut buffer).unwrap();

        assert_eq!(source, ImageSource::Bytes(Cow::Owned(b"image bytes".to_vec())));

        // Reusable after further writes
        buffer.write_all(b" more").unwrap();
        let again = ImageSource::from_reader(&mut buffer).unwrap();
        assert_eq!(again.stdin(), Some(&b"image bytes more"[..]));
    }

    #[test]
    fn test_get_version_parses_banner() {
        let client = Tesseract::with_runner(RecordingRunner::succeeding(
            "tesseract v5.3.0\n leptonica-1.82.0\n",
        ));

        assert_eq!(client.get_version().unwrap(), "v5.3.0");
        assert_eq!(client.runner().calls()[0].0, strings(&["--version"]));
    }

    #[test]
    fn test_get_version_reads_stderr_banner() {
        let client = Tesseract::with_runner(RecordingRunner::replying(Invocation::Failed {
            code: Some(1),
            stderr: "tesseract v4.1.1\n".to_string(),
        }));

        assert_eq!(client.get_version().unwrap(), "v4.1.1");
    }

    #[test]
    fn test_get_version_without_pattern_fails() {
        let client = Tesseract::with_runner(RecordingRunner::succeeding("unexpected\n"));

        assert!(matches!(client.get_version(), Err(OcrError::VersionNotFound)));
    }

    #[test]
    fn test_get_installed_languages() {
        let client = Tesseract::with_runner(RecordingRunner::succeeding(
            "List of available languages (3):\neng\nfra\ndeu\n",
        ));

        let languages = client.get_installed_languages().unwrap();

        assert_eq!(languages, vec!["eng", "fra", "deu"]);
        assert_eq!(client.runner().calls()[0].0, strings(&["--list-langs"]));
    }

    #[test]
    fn test_get_text_from_image_sends_png() {
        let client = Tesseract::with_runner(RecordingRunner::succeeding("ok"));
        let image = DynamicImage::ImageLuma8(image::GrayImage::new(6, 6));

        let text = client
            .get_text_from_image(&image, None, &ImageOptions::default())
            .unwrap();

        assert_eq!(text, "ok");
        let calls = client.runner().calls();
        assert_eq!(calls[0].0, strings(&["stdin", "stdout"]));
        let png = calls[0].1.as_ref().unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }

    #[cfg(unix)]
    #[test]
    fn test_process_client_against_fake_engine() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = crate::runner::tests::fake_engine(
            &dir,
            "if [ \"$1\" = stdin ]; then cat; else echo \"file:$1\"; fi",
        );
        let client = Tesseract::new(RunnerConfig::new(engine));

        let piped = client.get_text(&ImageSource::bytes(b"raw"), None).unwrap();
        let from_file = client
            .get_text(&ImageSource::path("/data/page.png"), None)
            .unwrap();

        assert_eq!(piped, "raw");
        assert_eq!(from_file, "file:/data/page.png\n");
    }
}
