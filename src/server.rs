use crate::client::{ImageSource, Tesseract};
use crate::config::ServerConfig;
use crate::error::OcrError;
use crate::options::{OcrEngineMode, PageSegmentationMode, TesseractOptions};
use crate::parse::{BoxRecord, WordRecord};
use crate::preprocessing::{self, ImageOptions, Pipeline};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub tesseract: Arc<Tesseract>,
    pub config: Arc<ServerConfig>,
}

/// Requested output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Box,
    Tsv,
}

impl OutputFormat {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "box" | "makebox" => Some(Self::Box),
            "tsv" | "data" => Some(Self::Tsv),
            _ => None,
        }
    }
}

/// OCR response
#[derive(Serialize)]
pub struct OcrResponse {
    pub format: OutputFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boxes: Option<Vec<BoxRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<WordRecord>>,
    pub processing_time_ms: u64,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub engine_version: Option<String>,
    pub installed_languages: Vec<String>,
    pub max_file_size_bytes: usize,
    pub default_language: String,
}

/// Fields collected from an OCR multipart request
#[derive(Default)]
struct OcrRequest {
    file: Option<Bytes>,
    languages: Option<String>,
    psm: Option<String>,
    oem: Option<String>,
    dpi: Option<String>,
    format: Option<String>,
    preprocess: Option<String>,
}

/// Run the HTTP server
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let tesseract = Tesseract::new(config.runner.clone());
    let addr = format!("{}:{}", config.host, config.port);

    let state = AppState {
        tesseract: Arc::new(tesseract),
        config: Arc::new(config),
    };

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/ocr", post(handle_ocr))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run a blocking engine call on tokio's blocking pool
async fn blocking<T, F>(f: F) -> Result<T, OcrError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, OcrError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| OcrError::Io(std::io::Error::other(format!("OCR task failed: {}", e))))?
}

async fn read_multipart(mut multipart: Multipart) -> Result<OcrRequest, OcrError> {
    let mut request = OcrRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| OcrError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            request.file = Some(field.bytes().await.map_err(|e| {
                OcrError::InvalidRequest(format!("Failed to read file data: {}", e))
            })?);
            continue;
        }

        let slot = match name.as_str() {
            "languages" => &mut request.languages,
            "psm" => &mut request.psm,
            "oem" => &mut request.oem,
            "dpi" => &mut request.dpi,
            "format" => &mut request.format,
            "preprocess" => &mut request.preprocess,
            _ => continue,
        };
        *slot = Some(field.text().await.map_err(|e| {
            OcrError::InvalidRequest(format!("Invalid {} field: {}", name, e))
        })?);
    }

    Ok(request)
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, OcrError> {
    value
        .trim()
        .parse()
        .map_err(|_| OcrError::InvalidRequest(format!("{} must be a number, got '{}'", field, value)))
}

/// Build engine options from request fields
fn build_options(request: &OcrRequest, default_language: &str) -> Result<TesseractOptions, OcrError> {
    let languages: Vec<&str> = request
        .languages
        .as_deref()
        .unwrap_or(default_language)
        .split(['+', ','])
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut options = TesseractOptions::new().with_languages(languages);

    if let Some(psm) = &request.psm {
        options = options.with_psm(PageSegmentationMode::try_from(parse_number::<u8>("psm", psm)?)?);
    }
    if let Some(oem) = &request.oem {
        options = options.with_oem(OcrEngineMode::try_from(parse_number::<u8>("oem", oem)?)?);
    }
    if let Some(dpi) = &request.dpi {
        options = options.with_dpi(parse_number("dpi", dpi)?);
    }

    Ok(options)
}

fn wants_preprocessing(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_lowercase()).as_deref(),
        Some("true" | "1" | "yes")
    )
}

/// Decode, binarize and re-encode an uploaded image
fn preprocess(data: &[u8]) -> Result<Vec<u8>, OcrError> {
    let image = image::load_from_memory(data)
        .map_err(|e| OcrError::InvalidRequest(format!("Failed to decode image: {}", e)))?;
    let processed = Pipeline::new(ImageOptions::default()).process(&image)?;
    preprocessing::encode_png(&processed)
}

/// Handle OCR requests
async fn handle_ocr(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<OcrResponse>, OcrError> {
    let start = Instant::now();

    let request = read_multipart(multipart).await?;
    let options = build_options(&request, &state.config.default_language)?;
    let format = match request.format.as_deref() {
        Some(name) => OutputFormat::from_name(name)
            .ok_or_else(|| OcrError::InvalidRequest(format!("Unknown format: {}", name)))?,
        None => OutputFormat::Text,
    };
    let preprocess_image = wants_preprocessing(request.preprocess.as_deref());

    // Validate file was provided
    let data = request.file.ok_or(OcrError::MissingFile)?;

    if data.len() > state.config.max_file_size {
        return Err(OcrError::ImageTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    let tesseract = state.tesseract.clone();
    let mut response = blocking(move || {
        let data = if preprocess_image {
            preprocess(&data)?
        } else {
            data.to_vec()
        };
        let image = ImageSource::from(data);

        let mut response = OcrResponse {
            format,
            text: None,
            boxes: None,
            words: None,
            processing_time_ms: 0,
        };
        match format {
            OutputFormat::Text => response.text = Some(tesseract.get_text(&image, Some(&options))?),
            OutputFormat::Box => {
                response.boxes = Some(tesseract.get_textbox(&image, Some(&options))?)
            }
            OutputFormat::Tsv => {
                response.words = Some(tesseract.get_textdata(&image, Some(&options))?)
            }
        }
        Ok(response)
    })
    .await?;

    response.processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        "OCR ({:?}) completed in {}ms",
        format,
        response.processing_time_ms
    );

    Ok(Json(response))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    let tesseract = state.tesseract.clone();
    let (engine_version, installed_languages) = blocking(move || {
        let version = tesseract
            .get_version()
            .map_err(|e| tracing::warn!("Could not read tesseract version: {}", e))
            .ok();
        let languages = tesseract
            .get_installed_languages()
            .map_err(|e| tracing::warn!("Could not list tesseract languages: {}", e))
            .unwrap_or_default();
        Ok((version, languages))
    })
    .await
    .unwrap_or_default();

    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine_version,
        installed_languages,
        max_file_size_bytes: state.config.max_file_size,
        default_language: state.config.default_language.clone(),
    })
}
