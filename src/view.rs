//! View rendering for the 404 fallback and for handlers that render templates.
//!
//! View names use `.`, `@` or `#` as directory separators (`errors.404`,
//! `admin@users#index`); the configured extension is appended to the last segment.

use minijinja::Environment;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("no views directory is configured")]
    NotConfigured,
    #[error(transparent)]
    Render(#[from] minijinja::Error),
}

/// Renders a named view with a JSON context.
pub trait ViewRenderer: Send + Sync {
    fn render(&self, view: &str, context: &Value) -> Result<String, ViewError>;
}

/// Map a view name to a template path relative to the views directory.
#[must_use]
pub fn view_path(name: &str, extension: &str) -> String {
    let mut path: String = name
        .trim_start_matches(['/', '.'])
        .chars()
        .map(|c| if matches!(c, '.' | '@' | '#') { '/' } else { c })
        .collect();
    if !extension.is_empty() {
        if !extension.starts_with('.') {
            path.push('.');
        }
        path.push_str(extension);
    }
    path
}

/// `minijinja` renderer over a views directory.
pub struct MiniJinjaViews {
    env: Option<Environment<'static>>,
    extension: String,
}

impl MiniJinjaViews {
    #[must_use]
    pub fn new(dir: Option<PathBuf>, extension: impl Into<String>) -> Self {
        let env = dir.map(|dir| {
            let mut env = Environment::new();
            env.set_loader(minijinja::path_loader(dir));
            env
        });
        Self {
            env,
            extension: extension.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.views_dir.clone(), config.view_extension.clone())
    }
}

impl ViewRenderer for MiniJinjaViews {
    fn render(&self, view: &str, context: &Value) -> Result<String, ViewError> {
        let env = self.env.as_ref().ok_or(ViewError::NotConfigured)?;
        let template = view_path(view, &self.extension);
        debug!(view, template = %template, "Rendering view");
        Ok(env.get_template(&template)?.render(context)?)
    }
}
