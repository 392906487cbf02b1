//! # Hot Reload Module
//!
//! Watches a routes file and swaps a rebuilt [`Kernel`](crate::app::Kernel) into a
//! [`SharedKernel`] whenever it changes.
//!
//! ```rust,ignore
//! use brrtapp::{app::{Application, SharedKernel}, config::AppConfig, hot_reload::watch_routes};
//!
//! let config = AppConfig::load("config.yaml")?;
//! let rebuild = move |path: &std::path::Path| {
//!     let mut app = Application::new(config.clone());
//!     app.load_routes(path)?;
//!     app.build()
//! };
//! let shared = SharedKernel::new(rebuild("routes.yaml".as_ref())?);
//! let _watcher = watch_routes("routes.yaml", shared.clone(), rebuild)?;
//! ```
//!
//! A routes file that fails to load or build is logged and ignored. The previous
//! kernel keeps serving.

use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::app::{Kernel, SharedKernel};
use crate::errors::ConfigError;

/// Watch `routes_path` and rebuild `shared` with `rebuild` on every modification.
///
/// The returned watcher must be kept alive for as long as reloading is wanted.
pub fn watch_routes<P, F>(
    routes_path: P,
    shared: SharedKernel,
    rebuild: F,
) -> notify::Result<RecommendedWatcher>
where
    P: AsRef<Path>,
    F: Fn(&Path) -> Result<Kernel, ConfigError> + Send + 'static,
{
    let path: PathBuf = routes_path.as_ref().to_path_buf();
    let watch_path = path.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) => {
                match rebuild(&watch_path) {
                    Ok(kernel) => {
                        info!(
                            path = %watch_path.display(),
                            routes = kernel.routes().len(),
                            "hot-reload: routes rebuilt"
                        );
                        shared.replace(kernel);
                    }
                    Err(e) => warn!(
                        path = %watch_path.display(),
                        error = %e,
                        "hot-reload: rebuild failed, keeping previous routes"
                    ),
                }
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    info!(path = %path.display(), "hot-reload: watching routes file");
    Ok(watcher)
}
