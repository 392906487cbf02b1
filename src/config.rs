//! # Application Configuration
//!
//! [`AppConfig`] carries everything the route table builder and the kernel read at
//! runtime: the root path prefix, the 404 view, the views directory, maintenance mode,
//! the `X-Powered-By` value and CSRF settings. Unknown keys are kept in `extra` and stay
//! reachable through dotted lookups.
//!
//! ## Sources
//!
//! A config file is parsed by extension (`.yaml`/`.yml`, `.json`, `.toml`), then
//! environment overrides are applied:
//!
//! | Variable | Field |
//! |---|---|
//! | `BRRTAPP_ROOT` | `root` |
//! | `BRRTAPP_MODE` | `mode` (`up` / `down`) |
//! | `BRRTAPP_VIEW_404` | `view_404` |
//! | `BRRTAPP_VIEWS_DIR` | `views_dir` |
//!
//! ```rust
//! use brrtapp::config::{AppConfig, ConfigAccess};
//!
//! let config: AppConfig = serde_yaml::from_str("root: /shop\nview_404: errors.404\n").unwrap();
//! assert_eq!(config.root(), "/shop");
//! assert_eq!(config.view_404(), Some("errors.404"));
//! assert!(!config.is_down());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::ConfigError;

/// Default value of the `X-Powered-By` header.
pub const DEFAULT_POWERED_BY: &str = "brrtapp";

/// Maintenance mode. `Down` answers every HTTP request with 503.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Up,
    Down,
}

impl Mode {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "down" => Mode::Down,
            _ => Mode::Up,
        }
    }
}

/// Double-submit CSRF settings used by the built-in `csrf` middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
    pub enabled: bool,
    /// Form field carrying the token
    pub field: String,
    /// Header carrying the token (checked when the field is absent)
    pub header: String,
    /// Cookie holding the expected token
    pub cookie: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            field: "_token".to_string(),
            header: "x-csrf-token".to_string(),
            cookie: "XSRF-TOKEN".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Prefix prepended to every registered path
    pub root: String,
    /// View rendered for unmatched paths when no 404 callback exists
    pub view_404: Option<String>,
    pub views_dir: Option<PathBuf>,
    /// Extension appended to view names
    pub view_extension: String,
    pub mode: Mode,
    pub powered_by: String,
    pub csrf: CsrfConfig,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: String::new(),
            view_404: None,
            views_dir: None,
            view_extension: ".html".to_string(),
            mode: Mode::Up,
            powered_by: DEFAULT_POWERED_BY.to_string(),
            csrf: CsrfConfig::default(),
            extra: Map::new(),
        }
    }
}

impl AppConfig {
    /// Load from a YAML, JSON or TOML file chosen by extension, then apply the
    /// `BRRTAPP_*` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config: AppConfig = read_document(path)?;
        config.apply_env();
        info!(
            path = %path.display(),
            root = %config.root,
            mode = ?config.mode,
            view_404 = ?config.view_404,
            "Application config loaded"
        );
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("BRRTAPP_ROOT") {
            self.root = root;
        }
        if let Some(mode) = lookup("BRRTAPP_MODE") {
            self.mode = Mode::parse(&mode);
        }
        if let Some(view) = lookup("BRRTAPP_VIEW_404") {
            self.view_404 = if view.is_empty() { None } else { Some(view) };
        }
        if let Some(dir) = lookup("BRRTAPP_VIEWS_DIR") {
            self.views_dir = Some(PathBuf::from(dir));
        }
    }
}

/// Deserialize a YAML, JSON or TOML document chosen by file extension.
pub(crate) fn read_document<T>(path: &Path) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let load_err = |message: String| ConfigError::Load {
        path: path.to_path_buf(),
        message,
    };
    let content = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    debug!(path = %path.display(), format = %ext, bytes = content.len(), "Reading document");
    match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| load_err(e.to_string())),
        "json" => serde_json::from_str(&content).map_err(|e| load_err(e.to_string())),
        "toml" => toml::from_str(&content).map_err(|e| load_err(e.to_string())),
        other => Err(load_err(format!("unsupported file extension `{other}`"))),
    }
}

/// Read access to the application configuration.
///
/// Implemented by [`AppConfig`] itself and by everything that owns one, so the builder
/// and the frozen kernel expose the same lookups.
pub trait ConfigAccess {
    fn config(&self) -> &AppConfig;

    fn root(&self) -> &str {
        &self.config().root
    }

    fn view_404(&self) -> Option<&str> {
        self.config().view_404.as_deref()
    }

    fn is_down(&self) -> bool {
        self.config().mode == Mode::Down
    }

    /// Dotted lookup (`csrf.enabled`, `mail.driver`, ...) over known and extra keys.
    fn get(&self, key: &str) -> Option<Value> {
        let doc = serde_json::to_value(self.config()).ok()?;
        key.split('.')
            .try_fold(&doc, |node, part| node.get(part))
            .filter(|v| !v.is_null())
            .cloned()
    }

    /// Like [`get`](Self::get), but an undefined key is an error.
    fn require(&self, key: &str) -> Result<Value, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }
}

impl ConfigAccess for AppConfig {
    fn config(&self) -> &AppConfig {
        self
    }
}
