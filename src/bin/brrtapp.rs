use brrtapp::logging::{init_logging_with_config, LogConfig};

fn main() -> anyhow::Result<()> {
    // Quiet by default so command output stays readable.
    let config = LogConfig::from_lookup(|key| {
        std::env::var(key)
            .ok()
            .or_else(|| (key == "BRRTAPP_LOG_LEVEL").then(|| "warn".to_string()))
    });
    init_logging_with_config(&config)?;
    brrtapp::cli::run_cli()
}
