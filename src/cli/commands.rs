use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use http::Method;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app::{Application, Invocation, Kernel, Sent};
use crate::config::AppConfig;
use crate::dispatcher::{Handler, HandlerRef};
use crate::echo::{EchoHandler, PassThrough};
use crate::server::ParsedRequest;

/// Command-line interface for brrtapp route tables
#[derive(Parser)]
#[command(name = "brrtapp", version)]
#[command(about = "Inspect and exercise brrtapp route tables", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every route of the built table
    Routes {
        /// Application config (YAML, JSON or TOML); defaults apply when omitted
        #[arg(short, long, env = "BRRTAPP_CONFIG")]
        config: Option<PathBuf>,

        /// Routes file (YAML, JSON or TOML)
        #[arg(short, long)]
        routes: PathBuf,
    },
    /// Dispatch one synthetic request and print the emitted response
    Dispatch {
        #[arg(short, long, env = "BRRTAPP_CONFIG")]
        config: Option<PathBuf>,

        #[arg(short, long)]
        routes: PathBuf,

        /// HTTP method as sent by the client
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request target, query string included
        #[arg(short, long)]
        path: String,

        /// Form field `name=value` (repeatable)
        #[arg(short = 'f', long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,

        /// Header `Name: value` (repeatable)
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// JSON request body
        #[arg(long)]
        json: Option<String>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got `{s}`"))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    s.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected `Name: value`, got `{s}`"))
}

/// Build a kernel from config + routes files with stand-ins for everything unbound.
pub fn inspection_kernel(config: Option<&Path>, routes: &Path) -> anyhow::Result<Kernel> {
    let config = match config {
        Some(path) => AppConfig::load(path)?,
        None => {
            let mut config = AppConfig::default();
            config.apply_env();
            config
        }
    };

    let mut app = Application::new(config);
    app.load_routes(routes)?;

    let echo: Arc<dyn Handler> = Arc::new(EchoHandler);
    for action in app.unresolved_actions() {
        app.action(&action, HandlerRef::Direct(Arc::clone(&echo)));
    }
    for name in app.unresolved_middleware() {
        app.bind_middleware(&name, PassThrough);
    }

    app.build().context("failed to build route table")
}

/// Run a parsed command, writing its output to `out`.
pub fn execute(cli: &Cli, out: &mut impl Write) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Routes { config, routes } => {
            let kernel = inspection_kernel(config.as_deref(), routes)?;
            for line in kernel.routes().dump_routes() {
                writeln!(out, "{line}")?;
            }
            writeln!(out, "{} routes", kernel.routes().len())?;
            Ok(())
        }
        Commands::Dispatch {
            config,
            routes,
            method,
            path,
            fields,
            headers,
            json,
        } => {
            let kernel = inspection_kernel(config.as_deref(), routes)?;
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("invalid method `{method}`"))?;

            let mut request = ParsedRequest::new(method, path);
            for (name, value) in headers {
                request = request.with_header(name, value.as_str());
            }
            for (name, value) in fields {
                request = request.with_field(name.as_str(), value.as_str());
            }
            if let Some(body) = json {
                let body = serde_json::from_str(body).context("--json is not valid JSON")?;
                request = request.with_json_body(body);
            }

            match kernel.send(Invocation::Http(request))? {
                Sent::Emitted(emitted) => writeln!(out, "{emitted}")?,
                Sent::Noop => return Err(anyhow!("nothing was dispatched")),
            }
            Ok(())
        }
    }
}

/// Parse `std::env::args` and run.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    execute(&cli, &mut io::stdout().lock())
}
