use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Duration;
use tesseract_cmd::{
    server, BoxLayout, ImageOptions, ImageSource, LogLevel, OcrEngineMode, PageSegmentationMode,
    Rect, RunnerConfig, ServerConfig, Tesseract, TesseractOptions,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tesseract-cmd")]
#[command(about = "Run the tesseract OCR engine and parse its output")]
#[command(version)]
pub struct Args {
    /// Tesseract binary name or path
    #[arg(long, env = "TESSERACT_PATH", default_value = "tesseract", global = true)]
    pub tesseract_path: PathBuf,

    /// Kill tesseract if it runs longer than this many seconds
    #[arg(long, env = "TESSERACT_TIMEOUT_SECS", global = true)]
    pub timeout_secs: Option<u64>,

    /// Log filter (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the recognized text
    Text {
        #[command(flatten)]
        ocr: OcrArgs,

        /// Binarize (and optionally rotate/crop) the image before OCR
        #[arg(long)]
        preprocess: bool,

        /// Pixels darker than this become black when preprocessing
        #[arg(long, default_value_t = 128)]
        black_threshold: u8,

        /// Counter-clockwise rotation in degrees when preprocessing
        #[arg(long, default_value_t = 0.0)]
        rotate: f32,

        /// Crop box LEFT,UPPER,RIGHT,LOWER when preprocessing
        #[arg(long, value_parser = parse_rect)]
        crop: Option<Rect>,
    },
    /// Print per-symbol boxes as JSON
    Box {
        #[command(flatten)]
        ocr: OcrArgs,

        /// Split box lines on whitespace instead of by character
        #[arg(long)]
        whitespace_fields: bool,
    },
    /// Print per-word TSV rows as JSON
    Data {
        #[command(flatten)]
        ocr: OcrArgs,
    },
    /// Print the tesseract version
    Version,
    /// List installed languages
    Langs,
    /// Serve OCR over HTTP
    Serve(ServeArgs),
}

#[derive(ClapArgs, Debug)]
pub struct OcrArgs {
    /// Image file, or "-" to read image bytes from stdin
    pub image: String,

    /// Location of the tessdata directory
    #[arg(long)]
    pub tessdata_dir: Option<PathBuf>,

    /// Location of the user words file
    #[arg(long)]
    pub user_words: Option<PathBuf>,

    /// Location of the user patterns file
    #[arg(long)]
    pub user_patterns: Option<PathBuf>,

    /// DPI of the input image
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Engine log level (ALL, TRACE, DEBUG, INFO, WARN, ERROR, FATAL, OFF)
    #[arg(long, value_parser = parse_log_level)]
    pub loglevel: Option<LogLevel>,

    /// Language code; repeat for several (e.g. -l eng -l fra)
    #[arg(short = 'l', long = "lang")]
    pub languages: Vec<String>,

    /// Config variable KEY=VALUE; repeatable
    #[arg(short = 'c', long = "config", value_parser = parse_key_value)]
    pub config: Vec<(String, String)>,

    /// Page segmentation mode (0-13, except 2)
    #[arg(long, value_parser = parse_psm)]
    pub psm: Option<PageSegmentationMode>,

    /// OCR engine mode (0-3)
    #[arg(long, value_parser = parse_oem)]
    pub oem: Option<OcrEngineMode>,
}

impl OcrArgs {
    fn options(&self) -> TesseractOptions {
        let mut options = TesseractOptions::new().with_languages(self.languages.iter().cloned());
        options.tessdata_dir = self.tessdata_dir.clone();
        options.user_words = self.user_words.clone();
        options.user_patterns = self.user_patterns.clone();
        options.dpi = self.dpi;
        options.log_level = self.loglevel;
        options.psm = self.psm;
        options.oem = self.oem;
        self.config
            .iter()
            .fold(options, |options, (key, value)| options.with_config(key, value))
    }

    fn source(&self) -> anyhow::Result<ImageSource<'static>> {
        if self.image == "-" {
            let mut bytes = Vec::new();
            std::io::stdin()
                .read_to_end(&mut bytes)
                .context("Failed to read image from stdin")?;
            return Ok(ImageSource::from(bytes));
        }
        Ok(ImageSource::path(&self.image))
    }
}

#[derive(ClapArgs, Debug)]
pub struct ServeArgs {
    /// Host address to bind to
    #[arg(long, env = "OCR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "OCR_PORT", default_value = "9292")]
    pub port: u16,

    /// Language used when a request names none (e.g., "eng", "deu", "fra")
    #[arg(long, env = "OCR_DEFAULT_LANGUAGE", default_value = "eng")]
    pub default_language: String,

    /// Maximum file size in bytes (default: 50MB)
    #[arg(long, env = "OCR_MAX_FILE_SIZE", default_value = "52428800")]
    pub max_file_size: usize,
}

fn parse_log_level(s: &str) -> Result<LogLevel, String> {
    LogLevel::from_name(s).ok_or_else(|| format!("unknown log level: {}", s))
}

fn parse_psm(s: &str) -> Result<PageSegmentationMode, String> {
    let value: u8 = s.parse().map_err(|_| format!("not a number: {}", s))?;
    PageSegmentationMode::try_from(value).map_err(|e| e.to_string())
}

fn parse_oem(s: &str) -> Result<OcrEngineMode, String> {
    let value: u8 = s.parse().map_err(|_| format!("not a number: {}", s))?;
    OcrEngineMode::try_from(value).map_err(|e| e.to_string())
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {}", s))?;
    if key.is_empty() {
        return Err(format!("empty config key in {}", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_rect(s: &str) -> Result<Rect, String> {
    let values: Vec<u32> = s
        .split(',')
        .map(|v| v.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid crop box {}: {}", s, e))?;
    match values.as_slice() {
        [left, upper, right, lower] => Ok(Rect::new(*left, *upper, *right, *lower)),
        _ => Err(format!("expected LEFT,UPPER,RIGHT,LOWER, got {}", s)),
    }
}

fn runner_config(args: &Args) -> RunnerConfig {
    let mut config = RunnerConfig::new(&args.tesseract_path);
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    config
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = match args.command {
        Command::Serve(_) => "info",
        _ => "warn",
    };

    // Initialize tracing; stdout is reserved for OCR output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(
                args.log_level.as_deref().unwrap_or(default_filter),
            )
            .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let runner = runner_config(&args);

    match args.command {
        Command::Text {
            ocr,
            preprocess,
            black_threshold,
            rotate,
            crop,
        } => {
            let tesseract = Tesseract::new(runner);
            let options = ocr.options();
            let text = if preprocess {
                let image = match ocr.source()? {
                    ImageSource::Path(path) => image::open(&path)
                        .with_context(|| format!("Failed to load image {}", path.display()))?,
                    ImageSource::Bytes(bytes) => {
                        image::load_from_memory(&bytes).context("Failed to decode image")?
                    }
                };
                let image_options = ImageOptions {
                    black_threshold,
                    rotate_angle: rotate,
                    crop,
                };
                tesseract.get_text_from_image(&image, Some(&options), &image_options)?
            } else {
                tesseract.get_text(&ocr.source()?, Some(&options))?
            };
            print!("{}", text);
        }
        Command::Box {
            ocr,
            whitespace_fields,
        } => {
            let layout = if whitespace_fields {
                BoxLayout::Fields
            } else {
                BoxLayout::Characters
            };
            let tesseract = Tesseract::new(runner).box_layout(layout);
            let boxes = tesseract.get_textbox(&ocr.source()?, Some(&ocr.options()))?;
            print_json(&boxes)?;
        }
        Command::Data { ocr } => {
            let tesseract = Tesseract::new(runner);
            let words = tesseract.get_textdata(&ocr.source()?, Some(&ocr.options()))?;
            print_json(&words)?;
        }
        Command::Version => {
            println!("{}", Tesseract::new(runner).get_version()?);
        }
        Command::Langs => {
            for language in Tesseract::new(runner).get_installed_languages()? {
                println!("{}", language);
            }
        }
        Command::Serve(serve) => {
            let config = ServerConfig {
                host: serve.host,
                port: serve.port,
                default_language: serve.default_language,
                max_file_size: serve.max_file_size,
                runner,
            };

            tracing::info!("Starting tesseract-cmd server v{}", env!("CARGO_PKG_VERSION"));
            tracing::info!("Binding to {}:{}", config.host, config.port);

            tokio::runtime::Runtime::new()?.block_on(server::run(config))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_ocr_args_map_to_options() {
        let args = Args::parse_from([
            "tesseract-cmd",
            "data",
            "scan.png",
            "-l",
            "eng",
            "-l",
            "fra",
            "-c",
            "tessedit_char_whitelist=0123456789",
            "--psm",
            "6",
            "--dpi",
            "300",
        ]);

        let Command::Data { ocr } = args.command else {
            panic!("expected data command");
        };
        assert_eq!(
            ocr.options().arguments(),
            vec![
                "--dpi",
                "300",
                "-l",
                "eng+fra",
                "-c",
                "tessedit_char_whitelist=0123456789",
                "--psm",
                "6"
            ]
        );
    }

    #[test]
    fn test_invalid_psm_is_rejected() {
        let result = Args::try_parse_from(["tesseract-cmd", "text", "scan.png", "--psm", "2"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_rect() {
        assert_eq!(parse_rect("1, 2,30,40").unwrap(), Rect::new(1, 2, 30, 40));
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_rect("a,b,c,d").is_err());
    }

    #[test]
    fn test_parse_key_value_keeps_equals_in_value() {
        assert_eq!(
            parse_key_value("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
    }
}
