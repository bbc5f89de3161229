use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the engine binary
pub const TESSERACT_PATH_ENV: &str = "TESSERACT_PATH";

/// Binary name used when no override is given
pub const DEFAULT_BINARY: &str = "tesseract";

/// How the engine process is launched
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Engine binary name or path
    pub binary: PathBuf,
    /// Variables added to the inherited environment
    pub env: BTreeMap<String, String>,
    /// Working directory for the engine process
    pub current_dir: Option<PathBuf>,
    /// Suppress the console window on Windows
    pub hide_window: bool,
    /// Kill the engine if it runs longer than this
    pub timeout: Option<Duration>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}

impl RunnerConfig {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            env: BTreeMap::new(),
            current_dir: None,
            hide_window: true,
            timeout: None,
        }
    }

    /// Resolve the binary from `TESSERACT_PATH`, falling back to `tesseract`
    pub fn from_env() -> Self {
        match std::env::var(TESSERACT_PATH_ENV) {
            Ok(path) if !path.is_empty() => Self::new(path),
            _ => Self::default(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn with_hide_window(mut self, hide: bool) -> Self {
        self.hide_window = hide;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Language used when a request names none
    pub default_language: String,
    pub max_file_size: usize,
    pub runner: RunnerConfig,
}
