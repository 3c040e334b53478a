// Configuration loading and parsing (playerport.toml, credentials.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `config/`, `defaults/` and `logs/`.
    pub base_dir: PathBuf,
    pub organization_id: String,
    pub backend: BackendConfig,
    pub db_path: String,
    pub import: ImportConfig,
    pub credentials: CredentialsConfig,
}

impl Config {
    /// Database path, resolved against `base_dir` when relative.
    pub fn resolved_db_path(&self) -> PathBuf {
        let path = Path::new(&self.db_path);
        if path.is_absolute() || self.db_path == ":memory:" {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

// ---------------------------------------------------------------------------
// playerport.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire playerport.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    organization: OrganizationSection,
    backend: BackendConfig,
    database: DatabaseSection,
    import: ImportConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct OrganizationSection {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    pub concurrency: usize,
    #[serde(default = "default_true")]
    pub clear_on_partial_success: bool,
    #[serde(default)]
    pub delimiter: String,
}

fn default_true() -> bool {
    true
}

impl ImportConfig {
    /// The configured delimiter byte, or `None` to auto-detect.
    pub fn delimiter_byte(&self) -> Option<u8> {
        match self.delimiter.as_str() {
            "" => None,
            "tab" | "\\t" | "\t" => Some(b'\t'),
            s => s.bytes().next(),
        }
    }
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub auth_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/playerport.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let main_path = config_dir.join("playerport.toml");
    let main_text = read_file(&main_path)?;
    let file: ConfigFile = toml::from_str(&main_text).map_err(|e| ConfigError::ParseError {
        path: main_path.clone(),
        source: e,
    })?;

    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        base_dir: base_dir.to_path_buf(),
        organization_id: file.organization.id,
        backend: file.backend,
        db_path: file.database.path,
        import: file.import,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     pass --config-dir or run from the playerport directory",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let target = config_dir.join(file_name);
        if target.exists() {
            continue;
        }
        std::fs::copy(&path, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {} to {}: {e}", path.display(), target.display()),
        })?;
        copied.push(target);
    }

    Ok(copied)
}

/// Pick the directory configuration is loaded from: an explicit directory,
/// else the working directory when it holds `config/` or `defaults/`, else
/// the per-user config directory.
pub fn resolve_base_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if cwd.join("config").exists() || cwd.join("defaults").exists() {
        return cwd;
    }
    directories::ProjectDirs::from("", "", "playerport")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or(cwd)
}

/// Resolve the base directory, copy any missing defaults, and load.
pub fn load_config(explicit_dir: Option<&Path>) -> Result<Config, ConfigError> {
    let base_dir = resolve_base_dir(explicit_dir);
    ensure_config_files(&base_dir)?;
    load_config_from(&base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.organization_id.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "organization.id".into(),
            message: "must not be empty".into(),
        });
    }

    if config.import.concurrency == 0 {
        return Err(ConfigError::ValidationError {
            field: "import.concurrency".into(),
            message: "must be > 0".into(),
        });
    }

    let delimiter = config.import.delimiter.as_str();
    if !matches!(delimiter, "" | "tab" | "\\t" | "\t") && (delimiter.len() != 1 || !delimiter.is_ascii()) {
        return Err(ConfigError::ValidationError {
            field: "import.delimiter".into(),
            message: format!("must be a single ASCII character or \"tab\", got {delimiter:?}"),
        });
    }

    if config.db_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    if config.backend.kind == BackendKind::Http {
        let url = config.backend.url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError {
                field: "backend.url".into(),
                message: format!("must be an http(s) URL when backend.kind is \"http\", got {url:?}"),
            });
        }
        if config.backend.timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                field: "backend.timeout_secs".into(),
                message: "must be > 0".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
